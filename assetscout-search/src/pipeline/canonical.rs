//! URL canonicalisation: the identity key for deduplication.
//!
//! Resolves relative and protocol-relative hrefs against the page they were
//! found on, unwraps outbound-link redirect wrappers, and normalises the
//! result so that equivalent pages (differing only in query-parameter order,
//! tracking parameters, fragments, default ports or capitalisation of the
//! host) compare as equal.

use url::Url;

/// Tracking query parameters that are stripped during normalisation.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "ref",
    "si",
    "feature",
];

/// Wrappers nest at most this deep before the candidate is dropped.
const MAX_UNWRAP_DEPTH: usize = 3;

/// An outbound-link redirect wrapper that carries the true destination in
/// a query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapperRule {
    /// Host the wrapper lives on (suffix match, so `html.duckduckgo.com`
    /// matches `duckduckgo.com`).
    pub host: &'static str,
    pub path_prefix: &'static str,
    pub param: &'static str,
}

/// Known redirect wrappers.
pub const WRAPPER_RULES: &[WrapperRule] = &[
    WrapperRule {
        host: "duckduckgo.com",
        path_prefix: "/l/",
        param: "uddg",
    },
    WrapperRule {
        host: "google.com",
        path_prefix: "/url",
        param: "q",
    },
    WrapperRule {
        host: "startpage.com",
        path_prefix: "/do/proxy",
        param: "url",
    },
];

/// Canonicalise `raw` as found on the page at `base`.
///
/// 1. Trim; absolute `http`/`https` hrefs are taken as-is, anything else is
///    resolved against `base` (so `//host/x` takes `base`'s scheme).
/// 2. If the URL is a known redirect wrapper, the decoded inner URL is
///    canonicalised instead. Two wrappers around the same destination
///    therefore collapse to one identity.
/// 3. The result is normalised: fragment and tracking parameters dropped,
///    query sorted, trailing slash trimmed.
///
/// Returns `None` for empty input, fragment-only links, non-http(s) schemes
/// and anything that does not parse. Callers drop such candidates.
///
/// # Examples
///
/// ```
/// use assetscout_search::pipeline::canonical::canonicalize;
///
/// let url = canonicalize(
///     "//duckduckgo.com/l/?uddg=https%3A%2F%2Fcreator.itch.io%2Fpack%2F&rut=abc",
///     "https://html.duckduckgo.com/html/",
/// );
/// assert_eq!(url.as_deref(), Some("https://creator.itch.io/pack"));
/// ```
pub fn canonicalize(raw: &str, base: &str) -> Option<String> {
    canonicalize_at_depth(raw, base, 0)
}

fn canonicalize_at_depth(raw: &str, base: &str, depth: usize) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }

    let resolved = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(base).ok()?.join(raw).ok()?,
        Err(_) => return None,
    };

    if !matches!(resolved.scheme(), "http" | "https") || resolved.host_str().is_none() {
        return None;
    }

    if let Some(inner) = unwrap_redirect(&resolved) {
        if depth >= MAX_UNWRAP_DEPTH {
            return None;
        }
        return canonicalize_at_depth(&inner, resolved.as_str(), depth + 1);
    }

    Some(normalize(resolved))
}

/// Returns the decoded destination if `url` is a known redirect wrapper.
fn unwrap_redirect(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    let rule = WRAPPER_RULES
        .iter()
        .find(|rule| host_matches(host, rule.host) && url.path().starts_with(rule.path_prefix))?;
    url.query_pairs()
        .find(|(key, _)| key == rule.param)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
}

/// `true` when `host` is `domain` or a subdomain of it.
pub fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Serialise a parsed URL in its deduplication form: fragment dropped,
/// tracking parameters stripped, the remaining query sorted by key, and any
/// trailing slash removed from a non-root path. `Url::parse` has already
/// lowercased the scheme and host and dropped default ports.
fn normalize(mut parsed: Url) -> String {
    parsed.set_fragment(None);

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.to_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(params);
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://html.duckduckgo.com/html/";

    #[test]
    fn absolute_url_accepted_after_trim() {
        let result = canonicalize("  https://creator.itch.io/pack  ", BASE);
        assert_eq!(result.as_deref(), Some("https://creator.itch.io/pack"));
    }

    #[test]
    fn relative_url_resolved_against_base() {
        let result = canonicalize(
            "/marketplace/en-US/product/sword",
            "https://www.unrealengine.com/marketplace/en-US/assets",
        );
        assert_eq!(
            result.as_deref(),
            Some("https://www.unrealengine.com/marketplace/en-US/product/sword")
        );
    }

    #[test]
    fn protocol_relative_takes_base_scheme() {
        let result = canonicalize("//creator.itch.io/pack", "http://mirror.test/html/");
        assert_eq!(result.as_deref(), Some("http://creator.itch.io/pack"));
    }

    #[test]
    fn ddg_wrapper_unwrapped() {
        let href = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        assert_eq!(
            canonicalize(href, BASE).as_deref(),
            Some("https://example.com/page")
        );
    }

    #[test]
    fn relative_ddg_wrapper_unwrapped() {
        let href = "/l/?uddg=https%3A%2F%2Fexample.com%2Fpage";
        assert_eq!(
            canonicalize(href, "https://duckduckgo.com/html/").as_deref(),
            Some("https://example.com/page")
        );
    }

    #[test]
    fn google_wrapper_unwrapped() {
        let href = "https://www.google.com/url?q=https://creator.itch.io/pack&sa=U";
        assert_eq!(
            canonicalize(href, BASE).as_deref(),
            Some("https://creator.itch.io/pack")
        );
    }

    #[test]
    fn different_wrappers_collapse_to_one_identity() {
        let a = canonicalize(
            "//duckduckgo.com/l/?uddg=https%3A%2F%2FCreator.itch.io%2Fpack%2F&rut=1",
            BASE,
        );
        let b = canonicalize(
            concat!(
                "https://duckduckgo.com/l/",
                "?rut=2&uddg=https%3A%2F%2Fcreator.itch.io%2Fpack%3Futm_source%3Dddg",
            ),
            BASE,
        );
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn wrapper_without_destination_is_kept_as_plain_url() {
        let result = canonicalize("https://duckduckgo.com/l/?rut=abc", BASE);
        assert_eq!(result.as_deref(), Some("https://duckduckgo.com/l?rut=abc"));
    }

    #[test]
    fn non_http_schemes_rejected() {
        assert!(canonicalize("javascript:void(0)", BASE).is_none());
        assert!(canonicalize("mailto:someone@example.com", BASE).is_none());
    }

    #[test]
    fn empty_and_fragment_only_rejected() {
        assert!(canonicalize("", BASE).is_none());
        assert!(canonicalize("   ", BASE).is_none());
        assert!(canonicalize("#top", BASE).is_none());
    }

    #[test]
    fn relative_without_usable_base_rejected() {
        assert!(canonicalize("not-a-url", "also not a url").is_none());
    }

    #[test]
    fn canonicalize_is_idempotent() {
        let inputs = [
            "https://Example.COM:443/path/?b=2&a=1&utm_source=x#frag",
            "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fa%20b%3Fq%3Dhello%2Bworld",
            "https://example.com/search?q=a%26b&lang=en",
            "/marketplace/en-US/product/blade?page=2",
            "https://example.com/",
        ];
        for input in inputs {
            let once = canonicalize(input, BASE).expect("canonicalizes");
            let twice = canonicalize(&once, BASE).expect("still canonicalizes");
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn host_matching_requires_label_boundary() {
        assert!(host_matches("itch.io", "itch.io"));
        assert!(host_matches("creator.itch.io", "itch.io"));
        assert!(!host_matches("notitch.io", "itch.io"));
    }

    #[test]
    fn host_case_and_default_port_folded() {
        let result = canonicalize("HTTPS://PixelSmith.Itch.IO:443/RPG-Icons", BASE);
        assert_eq!(result.as_deref(), Some("https://pixelsmith.itch.io/RPG-Icons"));
        let kept = canonicalize("http://docs.unrealengine.com:8080/en-US/lumen", BASE);
        assert_eq!(kept.as_deref(), Some("http://docs.unrealengine.com:8080/en-US/lumen"));
    }

    #[test]
    fn trailing_slash_trimmed_except_at_root() {
        assert_eq!(
            canonicalize("https://www.fab.com/listings/3f1c2a/", BASE).as_deref(),
            Some("https://www.fab.com/listings/3f1c2a")
        );
        assert_eq!(
            canonicalize("https://pixelsmith.itch.io/", BASE).as_deref(),
            Some("https://pixelsmith.itch.io/")
        );
    }

    #[test]
    fn tracking_params_and_fragment_dropped_and_query_sorted() {
        let result = canonicalize(
            "https://www.unrealengine.com/marketplace/en-US/product/sword\
             ?utm_source=ddg&lang=en&fbclid=x&currency=usd#reviews",
            BASE,
        );
        let expected = "https://www.unrealengine.com/marketplace/en-US/product/sword\
                        ?currency=usd&lang=en";
        assert_eq!(result.as_deref(), Some(expected));
    }
}
