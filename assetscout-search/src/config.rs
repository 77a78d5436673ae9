//! Search configuration with sensible defaults.
//!
//! [`SearchConfig`] controls which upstream endpoints are queried, timeouts,
//! caching, sitemap descent and scoring weights. The defaults point at the
//! public endpoints and are tuned for polite scraping.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::SearchError;
use crate::pipeline::scoring::ScoreWeights;

/// Upstream endpoints. All must be absolute http(s) URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Primary HTML search endpoint, queried with `GET ?q=`.
    pub web_search: String,
    /// Mirror endpoint, queried with a `POST` form `q=` when the primary
    /// attempt yields no candidates.
    pub web_search_fallback: String,
    /// Marketplace search page carrying an embedded page-data blob,
    /// queried with `GET ?keywords=`.
    pub marketplace_search: String,
    /// Template for marketplace product URLs; `{slug}` is replaced.
    pub marketplace_product_template: String,
    /// itch.io listing search page, queried with `GET ?q=`.
    pub itch_search: String,
    /// Top-level documentation sitemap (urlset or sitemap index).
    pub docs_sitemap: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            web_search: "https://duckduckgo.com/html/".into(),
            web_search_fallback: "https://html.duckduckgo.com/html/".into(),
            marketplace_search: "https://www.unrealengine.com/marketplace/en-US/assets".into(),
            marketplace_product_template:
                "https://www.unrealengine.com/marketplace/en-US/product/{slug}".into(),
            itch_search: "https://itch.io/search".into(),
            docs_sitemap: "https://dev.epicgames.com/documentation/sitemap.xml".into(),
        }
    }
}

impl Endpoints {
    fn named(&self) -> [(&'static str, &str); 6] {
        [
            ("web_search", &self.web_search),
            ("web_search_fallback", &self.web_search_fallback),
            ("marketplace_search", &self.marketplace_search),
            ("marketplace_product_template", &self.marketplace_product_template),
            ("itch_search", &self.itch_search),
            ("docs_sitemap", &self.docs_sitemap),
        ]
    }
}

/// Configuration for a search operation.
///
/// Use [`Default::default()`] for sensible defaults, or construct with
/// field overrides for custom behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum number of results returned after filtering and ranking.
    pub max_results: usize,
    /// Per-fetch timeout in seconds.
    pub timeout_seconds: u64,
    /// How long to cache final results in seconds. Set to 0 to disable caching.
    pub cache_ttl_seconds: u64,
    /// How many child sitemaps of a sitemap index are fetched.
    pub max_child_sitemaps: usize,
    /// Custom User-Agent string. If `None`, rotates through a built-in list
    /// of realistic browser User-Agents.
    pub user_agent: Option<String>,
    pub endpoints: Endpoints,
    /// Documentation relevance weights.
    pub weights: ScoreWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: 12,
            timeout_seconds: 8,
            cache_ttl_seconds: 300,
            max_child_sitemaps: 3,
            user_agent: None,
            endpoints: Endpoints::default(),
            weights: ScoreWeights::default(),
        }
    }
}

impl SearchConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - `max_results` must be greater than 0
    /// - `timeout_seconds` must be greater than 0
    /// - `max_child_sitemaps` must be greater than 0
    /// - every endpoint must be an absolute http(s) URL
    /// - the product template must contain `{slug}`
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.max_results == 0 {
            return Err(SearchError::Config(
                "max_results must be greater than 0".into(),
            ));
        }
        if self.timeout_seconds == 0 {
            return Err(SearchError::Config(
                "timeout_seconds must be greater than 0".into(),
            ));
        }
        if self.max_child_sitemaps == 0 {
            return Err(SearchError::Config(
                "max_child_sitemaps must be greater than 0".into(),
            ));
        }
        for (name, value) in self.endpoints.named() {
            let parsed = Url::parse(value)
                .map_err(|e| SearchError::Config(format!("endpoint {name} is not a URL: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(SearchError::Config(format!(
                    "endpoint {name} must use http or https"
                )));
            }
        }
        if !self.endpoints.marketplace_product_template.contains("{slug}") {
            return Err(SearchError::Config(
                "marketplace_product_template must contain {slug}".into(),
            ));
        }
        Ok(())
    }
}
