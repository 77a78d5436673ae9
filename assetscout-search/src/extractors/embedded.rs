//! Embedded page-data blobs (Next.js `__NEXT_DATA__` and friends).
//!
//! Store search pages ship their listing as JSON inside a `<script>` tag.
//! The extractor walks that object graph and picks out nodes shaped like a
//! product: a title-like field, a slug-like field, and an enclosing key whose
//! name hints at products.

use scraper::Html;
use serde_json::{Map, Value};

use super::{selector, ExtractContext, SourceExtractor, SourceKind};
use crate::types::CandidateRecord;

const DATA_SCRIPT_SELECTORS: &[&str] = &[
    "script#__NEXT_DATA__",
    "script[type=\"application/json\"]",
    "script[type=\"application/ld+json\"]",
];
const TITLE_KEYS: &[&str] = &["title", "name"];
const SLUG_KEYS: &[&str] = &["slug", "urlSlug", "url_slug"];
const DESCRIPTION_KEYS: &[&str] = &["description", "summary", "shortDescription"];
const PRODUCT_KEY_HINTS: &[&str] = &["product", "asset", "offer", "listing"];
/// Guard against pathological nesting.
const MAX_DEPTH: usize = 64;

/// Extractor for pages carrying an embedded JSON data block.
pub struct EmbeddedDataExtractor;

impl SourceExtractor for EmbeddedDataExtractor {
    fn extract(&self, payload: &str, context: &ExtractContext) -> Vec<CandidateRecord> {
        let Some(blob) = find_data_blob(payload) else {
            tracing::debug!("no embedded data block found");
            return Vec::new();
        };

        let root: Value = match serde_json::from_str(&blob) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "embedded data block is not valid JSON");
                return Vec::new();
            }
        };

        let mut candidates = Vec::new();
        walk(&root, None, context, 0, &mut candidates);
        tracing::debug!(count = candidates.len(), "embedded products extracted");
        candidates
    }

    fn kind(&self) -> SourceKind {
        SourceKind::EmbeddedData
    }
}

/// Returns the text of the first non-empty data script on the page.
fn find_data_blob(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    DATA_SCRIPT_SELECTORS.iter().find_map(|css| {
        let sel = selector(css).ok()?;
        document
            .select(&sel)
            .map(|el| el.text().collect::<String>())
            .find(|text| !text.trim().is_empty())
    })
}

/// Depth-first walk. `parent_key` is the nearest enclosing object key;
/// array elements inherit the key of the array.
fn walk(
    value: &Value,
    parent_key: Option<&str>,
    context: &ExtractContext,
    depth: usize,
    out: &mut Vec<CandidateRecord>,
) {
    if depth > MAX_DEPTH {
        return;
    }
    match value {
        Value::Object(map) => {
            if let Some(candidate) = product_candidate(map, parent_key, context) {
                out.push(candidate);
                return;
            }
            for (key, child) in map {
                walk(child, Some(key.as_str()), context, depth + 1, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, parent_key, context, depth + 1, out);
            }
        }
        _ => {}
    }
}

fn product_candidate(
    map: &Map<String, Value>,
    parent_key: Option<&str>,
    context: &ExtractContext,
) -> Option<CandidateRecord> {
    let hinted = parent_key.is_some_and(|key| {
        let key = key.to_lowercase();
        PRODUCT_KEY_HINTS.iter().any(|hint| key.contains(hint))
    });
    if !hinted {
        return None;
    }

    let title = first_string(map, TITLE_KEYS)?;
    let slug = first_string(map, SLUG_KEYS)?;
    let url = product_url(&slug, context);

    let mut snippet = first_string(map, DESCRIPTION_KEYS).unwrap_or_default();
    if let Some(price) = map.get("price").and_then(render_price) {
        if !snippet.is_empty() {
            snippet.push_str(" - ");
        }
        snippet.push_str(&price);
    }

    Some(CandidateRecord::new(&title, &url, &snippet))
}

fn first_string(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| map.get(*key)?.as_str())
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

fn product_url(slug: &str, context: &ExtractContext) -> String {
    let slug = slug.trim_matches('/');
    match &context.product_url_template {
        Some(template) => template.replace("{slug}", slug),
        None => format!("/product/{slug}"),
    }
}

/// Render a price node. Accepts a number, a string, or an object carrying
/// one of those under a common key, plus an optional currency code.
fn render_price(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            let amount = n.as_f64()?;
            Some(if amount == 0.0 {
                "Free".to_owned()
            } else {
                format!("${amount:.2}")
            })
        }
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Object(map) => {
            let inner = ["formatted", "discountPrice", "amount", "value", "price"]
                .iter()
                .find_map(|key| map.get(*key))?;
            let rendered = render_price(inner)?;
            match map.get("currencyCode").and_then(Value::as_str) {
                Some(code) if !rendered.eq_ignore_ascii_case("free") && !rendered.starts_with('$') => {
                    Some(format!("{rendered} {code}"))
                }
                _ => Some(rendered),
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "https://www.unrealengine.com/marketplace/en-US/product/{slug}";

    fn ctx() -> ExtractContext {
        ExtractContext::new("https://www.unrealengine.com/marketplace/en-US/assets")
            .with_product_template(TEMPLATE)
    }

    fn page(json: &str) -> String {
        format!(
            r#"<html><head></head><body><div id="root"></div>
<script id="__NEXT_DATA__" type="application/json">{json}</script></body></html>"#
        )
    }

    #[test]
    fn extracts_products_under_hinted_keys() {
        let html = page(
            r#"{"props":{"pageProps":{"products":[
                {"title":"Sword Animset","slug":"sword-animset","description":"120 animations","price":{"formatted":"$29.99"}},
                {"title":"Free Katana","urlSlug":"free-katana","price":0}
            ]}}}"#,
        );
        let results = EmbeddedDataExtractor.extract(&html, &ctx());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Sword Animset");
        assert_eq!(
            results[0].raw_url,
            "https://www.unrealengine.com/marketplace/en-US/product/sword-animset"
        );
        assert_eq!(results[0].snippet, "120 animations - $29.99");
        assert_eq!(results[1].snippet, "Free");
    }

    #[test]
    fn ignores_slugged_nodes_without_product_hint() {
        let html = page(
            r#"{"props":{"categories":[{"title":"Animations","slug":"animations"}],
                "offers":{"elements":[{"name":"Blade Pack","slug":"blade-pack"}]}}}"#,
        );
        let results = EmbeddedDataExtractor.extract(&html, &ctx());
        // "elements" is nested under "offers" but the nearest key is "elements".
        assert!(results.is_empty());
    }

    #[test]
    fn array_elements_inherit_key_of_array() {
        let html = page(r#"{"assetList":[{"name":"Blade Pack","slug":"/blade-pack/"}]}"#);
        let results = EmbeddedDataExtractor.extract(&html, &ctx());
        assert_eq!(results.len(), 1);
        assert!(results[0].raw_url.ends_with("/product/blade-pack"));
    }

    #[test]
    fn missing_title_or_slug_skipped() {
        let html = page(r#"{"products":[{"title":"No slug"},{"slug":"no-title"}]}"#);
        assert!(EmbeddedDataExtractor.extract(&html, &ctx()).is_empty());
    }

    #[test]
    fn missing_script_returns_empty() {
        let results = EmbeddedDataExtractor.extract("<html><body>nothing</body></html>", &ctx());
        assert!(results.is_empty());
    }

    #[test]
    fn invalid_json_returns_empty() {
        let html = page(r#"{"products": [ {"title": "broken""#);
        assert!(EmbeddedDataExtractor.extract(&html, &ctx()).is_empty());
    }

    #[test]
    fn relative_url_without_template() {
        let html = page(r#"{"products":[{"title":"Blade","slug":"blade"}]}"#);
        let results =
            EmbeddedDataExtractor.extract(&html, &ExtractContext::new("https://store.test/search"));
        assert_eq!(results[0].raw_url, "/product/blade");
    }

    #[test]
    fn price_rendering() {
        assert_eq!(render_price(&serde_json::json!(0)).as_deref(), Some("Free"));
        assert_eq!(render_price(&serde_json::json!(4.5)).as_deref(), Some("$4.50"));
        assert_eq!(
            render_price(&serde_json::json!({"amount": "19.99", "currencyCode": "EUR"})).as_deref(),
            Some("19.99 EUR")
        );
        assert!(render_price(&serde_json::json!(null)).is_none());
    }
}
