//! Page classification: which store a URL belongs to, and whether it looks
//! like a single product/article page rather than a listing.
//!
//! Store membership is decided purely by hostname. Page shape is decided by
//! a per-store rule. Both live in an immutable [`StoreRules`] table so stores
//! can be added without touching the pipeline.

use url::Url;

use super::canonical::host_matches;
use crate::types::Store;

/// How a store's hostname is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRule {
    Exact(String),
    /// The domain itself or any subdomain of it.
    Suffix(String),
}

impl HostRule {
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(expected) => host == expected,
            Self::Suffix(domain) => host_matches(host, domain),
        }
    }
}

/// Store-specific "is this a product page" rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageShape {
    /// Products live below a path segment (`/product/<slug>`). Listing-style
    /// pages are rejected when any whole path segment or query key is on a
    /// denylist, so slugs such as `browser-ui-kit` are not mistaken for
    /// `/browse`.
    PathSegmented {
        product_segments: Vec<String>,
        denied_segments: Vec<String>,
        denied_query_keys: Vec<String>,
    },
    /// Each creator has a subdomain; a project is a single path segment
    /// below it.
    CreatorSubdomain {
        root_domain: String,
        /// Subdomains that belong to the store itself, not a creator.
        reserved_subdomains: Vec<String>,
        /// First path segment of the store's tag listings (`/tag/<name>`).
        tag_segment: String,
        max_depth: usize,
    },
    /// Any non-root page that is not itself a sitemap.
    Documentation,
}

impl PageShape {
    fn admits(&self, url: &Url, host: &str) -> bool {
        match self {
            Self::PathSegmented {
                product_segments,
                denied_segments,
                denied_query_keys,
            } => {
                let path = url.path().to_lowercase();
                let segments: Vec<&str> = path_segments(&path).collect();
                // A product segment only counts when a slug follows it.
                let product_like = segments
                    .windows(2)
                    .any(|pair| product_segments.iter().any(|p| p.as_str() == pair[0]));
                let listing_segment = segments
                    .iter()
                    .any(|seg| denied_segments.iter().any(|d| d.as_str() == *seg));
                let listing_query = url.query_pairs().any(|(key, _)| {
                    denied_query_keys
                        .iter()
                        .any(|k| key.eq_ignore_ascii_case(k))
                });
                product_like && !listing_segment && !listing_query
            }
            Self::CreatorSubdomain {
                root_domain,
                reserved_subdomains,
                tag_segment,
                max_depth,
            } => {
                let Some(subdomain) = host
                    .strip_suffix(root_domain.as_str())
                    .and_then(|prefix| prefix.strip_suffix('.'))
                else {
                    return false;
                };
                if subdomain.is_empty() || reserved_subdomains.iter().any(|r| r == subdomain) {
                    return false;
                }
                let path = url.path().to_lowercase();
                let mut segments = path_segments(&path).peekable();
                if segments.peek() == Some(&tag_segment.as_str()) {
                    return false;
                }
                segments.count() <= *max_depth
            }
            Self::Documentation => {
                let path = url.path();
                path != "/" && !path.is_empty() && !path.to_lowercase().ends_with(".xml")
            }
        }
    }
}

/// One store's membership and page-shape rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRule {
    pub store: Store,
    pub hosts: Vec<HostRule>,
    pub shape: PageShape,
}

/// Result of classifying one URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub store: Store,
    pub is_page_like: bool,
}

impl Classification {
    const OTHER: Self = Self {
        store: Store::Other,
        is_page_like: false,
    };
}

/// Ordered table of store rules; the first hostname match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRules {
    rules: Vec<StoreRule>,
}

impl StoreRules {
    pub fn new(rules: Vec<StoreRule>) -> Self {
        Self { rules }
    }

    /// Rules for the multi-store asset search.
    pub fn assets() -> Self {
        Self::new(vec![
            StoreRule {
                store: Store::Marketplace,
                hosts: vec![
                    HostRule::Suffix("unrealengine.com".into()),
                    HostRule::Suffix("fab.com".into()),
                ],
                shape: PageShape::PathSegmented {
                    product_segments: strings(&["product", "listings"]),
                    denied_segments: strings(&[
                        "browse",
                        "search",
                        "category",
                        "categories",
                        "tag",
                        "tags",
                        "sellers",
                        "profile",
                        "page",
                        "store",
                        "collections",
                    ]),
                    denied_query_keys: strings(&["page"]),
                },
            },
            StoreRule {
                store: Store::Itch,
                hosts: vec![HostRule::Suffix("itch.io".into())],
                shape: PageShape::CreatorSubdomain {
                    root_domain: "itch.io".into(),
                    reserved_subdomains: strings(&["www", "static", "img", "api"]),
                    tag_segment: "tag".into(),
                    max_depth: 1,
                },
            },
        ])
    }

    /// Rules for the documentation search.
    pub fn docs() -> Self {
        Self::new(vec![StoreRule {
            store: Store::Docs,
            hosts: vec![
                HostRule::Suffix("unrealengine.com".into()),
                HostRule::Suffix("epicgames.com".into()),
            ],
            shape: PageShape::Documentation,
        }])
    }

    /// Classify a canonical URL. Unparseable URLs are [`Store::Other`].
    pub fn classify(&self, url: &str) -> Classification {
        let Ok(parsed) = Url::parse(url) else {
            return Classification::OTHER;
        };
        let Some(host) = parsed.host_str().map(str::to_lowercase) else {
            return Classification::OTHER;
        };

        let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.hosts.iter().any(|h| h.matches(&host)))
        else {
            return Classification::OTHER;
        };

        Classification {
            store: rule.store,
            is_page_like: rule.shape.admits(&parsed, &host),
        }
    }
}

fn path_segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}
