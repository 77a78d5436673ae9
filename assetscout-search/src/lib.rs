//! # assetscout-search
//!
//! Keyless discovery and ranking of Unreal Engine assets and documentation
//! pages.
//!
//! This crate finds product pages on the Unreal Engine Marketplace and
//! itch.io, and pages of the official engine documentation, by scraping
//! public search engines, store search pages and sitemaps directly. No API
//! keys and no external services are involved.
//!
//! ## Design
//!
//! - Four payload extractors (rendered results, embedded page data, sitemap
//!   XML, store listings) behind one [`extractors::SourceExtractor`] trait
//! - Canonical URLs as the dedup identity, with redirect wrappers unwrapped
//! - Store and page-shape classification from immutable rule tables
//! - Regex-inferred price and license tags
//! - Marketplace ordering for assets, relevance scoring for documentation
//! - One fallback request per web search, bounded sitemap descent, a
//!   timeout on every fetch
//! - Graceful degradation: a failing source is recorded, never fatal
//! - In-memory cache with configurable TTL
//!
//! ## Security
//!
//! - No API keys or secrets to leak
//! - No network listeners: this is a library, not a server
//! - Search queries are logged only at debug level and below

pub mod cache;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod http;
pub mod pipeline;
pub mod types;

use std::future::Future;

pub use cache::SearchMode;
pub use config::{Endpoints, SearchConfig};
pub use error::{Result, SearchError};
pub use fetch::{Fetch, FetchMethod, FetchRequest, FetchResponse};
pub use http::HttpFetcher;
pub use pipeline::scoring::{PathAdjustment, ScoreWeights};
pub use types::{
    LicenseTag, PriceFilter, PriceTag, RankedResult, SearchQuery, SearchReport, SourceOutcome,
    Store, StoreScope,
};

/// Search the Marketplace and itch.io for asset pages.
///
/// Queries every store in the query's scope concurrently, through a web
/// search (with one fallback) and the store's own search page, then
/// filters, deduplicates and sorts the admissible product pages and
/// truncates to `config.max_results`.
///
/// # Errors
///
/// Returns [`SearchError::Config`] for an invalid `config` and
/// [`SearchError::InvalidQuery`] for an invalid `query`. Individual source
/// failures are recorded in [`SearchReport::outcomes`] and do not fail the
/// search.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> assetscout_search::Result<()> {
/// use assetscout_search::{PriceFilter, SearchConfig, SearchQuery};
///
/// let query = SearchQuery::new("rpg icons")?.with_price(PriceFilter::Free);
/// let report = assetscout_search::search_assets(&query, &SearchConfig::default()).await?;
/// for result in &report.results {
///     println!("{} [{}]: {}", result.title, result.store, result.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search_assets(query: &SearchQuery, config: &SearchConfig) -> Result<SearchReport> {
    config.validate()?;
    let fetcher = HttpFetcher::new(config)?;
    search_assets_via(&fetcher, query, config).await
}

/// [`search_assets`] through a caller-supplied [`Fetch`], so one HTTP
/// client can serve many searches.
///
/// # Errors
///
/// Same as [`search_assets`].
pub async fn search_assets_via<F: Fetch>(
    fetcher: &F,
    query: &SearchQuery,
    config: &SearchConfig,
) -> Result<SearchReport> {
    config.validate()?;
    query.validate()?;
    cached(SearchMode::Assets, query, config, || {
        pipeline::search::search_assets_with(fetcher, query, config)
    })
    .await
}

/// Search the official documentation sitemap.
///
/// Results carry a relevance score; pages that do not mention any query
/// term are left out.
///
/// # Errors
///
/// Same as [`search_assets`], plus [`SearchError::Pipeline`] when the
/// configured weights yield a non-finite score.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> assetscout_search::Result<()> {
/// use assetscout_search::{SearchConfig, SearchQuery};
///
/// let query = SearchQuery::new("blueprint basics")?;
/// let report = assetscout_search::search_docs(&query, &SearchConfig::default()).await?;
/// for result in &report.results {
///     println!("{:.1} {}", result.score.unwrap_or_default(), result.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn search_docs(query: &SearchQuery, config: &SearchConfig) -> Result<SearchReport> {
    config.validate()?;
    let fetcher = HttpFetcher::new(config)?;
    search_docs_via(&fetcher, query, config).await
}

/// [`search_docs`] through a caller-supplied [`Fetch`].
///
/// # Errors
///
/// Same as [`search_docs`].
pub async fn search_docs_via<F: Fetch>(
    fetcher: &F,
    query: &SearchQuery,
    config: &SearchConfig,
) -> Result<SearchReport> {
    config.validate()?;
    query.validate()?;
    cached(SearchMode::Docs, query, config, || {
        pipeline::search::search_docs_with(fetcher, query, config)
    })
    .await
}

/// Serve from the result cache, or run the pipeline and remember its
/// results. A run where sources failed and nothing was found is not cached.
async fn cached<Run, Fut>(
    mode: SearchMode,
    query: &SearchQuery,
    config: &SearchConfig,
    run: Run,
) -> Result<SearchReport>
where
    Run: FnOnce() -> Fut,
    Fut: Future<Output = Result<SearchReport>>,
{
    let ttl = config.cache_ttl_seconds;
    if ttl == 0 {
        return run().await;
    }

    let key = cache::CacheKey::new(mode, query, config);
    if let Some(results) = cache::get(&key, ttl).await {
        tracing::debug!(?mode, count = results.len(), "serving cached results");
        return Ok(SearchReport {
            results,
            outcomes: Vec::new(),
            cached: true,
        });
    }

    let report = run().await?;
    let failed_empty = report.results.is_empty() && report.degraded_sources().next().is_some();
    if !failed_empty {
        cache::insert(key, report.results.clone(), ttl).await;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockFetcher;
    use crate::pipeline::test_support::{test_config, urlset, SITEMAP};

    #[tokio::test]
    async fn search_validates_config_zero_max_results() {
        let config = SearchConfig {
            max_results: 0,
            ..Default::default()
        };
        let query = SearchQuery::new("swords").expect("valid");
        let result = search_assets(&query, &config).await;
        assert!(result.unwrap_err().to_string().contains("max_results"));
    }

    #[tokio::test]
    async fn search_validates_config_zero_timeout() {
        let config = SearchConfig {
            timeout_seconds: 0,
            ..Default::default()
        };
        let query = SearchQuery::new("swords").expect("valid");
        let result = search_docs(&query, &config).await;
        assert!(result.unwrap_err().to_string().contains("timeout"));
    }

    #[tokio::test]
    async fn cached_results_skip_upstream() {
        let fetcher = MockFetcher::new().route(
            FetchMethod::Get,
            SITEMAP,
            200,
            &urlset(&["https://dev.epicgames.com/documentation/en-us/unreal-engine/cache-probe-page"]),
        );
        let config = SearchConfig {
            cache_ttl_seconds: 600,
            ..test_config()
        };
        let query = SearchQuery::new("cache probe").expect("valid");

        let first = search_docs_via(&fetcher, &query, &config).await.expect("first");
        assert!(!first.cached);
        assert_eq!(first.results.len(), 1);

        let second = search_docs_via(&fetcher, &query, &config).await.expect("second");
        assert!(second.cached);
        assert_eq!(second.results, first.results);
        assert_eq!(fetcher.calls_to(SITEMAP), 1);
    }

    #[tokio::test]
    async fn failed_empty_run_not_cached() {
        let fetcher = MockFetcher::new();
        let config = SearchConfig {
            cache_ttl_seconds: 600,
            ..test_config()
        };
        let query = SearchQuery::new("uncached failure probe").expect("valid");

        let first = search_docs_via(&fetcher, &query, &config).await.expect("first");
        assert!(first.results.is_empty());
        assert_eq!(first.degraded_sources().count(), 1);

        let second = search_docs_via(&fetcher, &query, &config).await.expect("second");
        assert!(!second.cached);
        assert_eq!(fetcher.calls_to(SITEMAP), 2);
    }

    #[tokio::test]
    async fn zero_ttl_disables_cache() {
        let fetcher = MockFetcher::new();
        let config = test_config();
        let query = SearchQuery::new("no cache probe").expect("valid");

        search_docs_via(&fetcher, &query, &config).await.expect("first");
        let second = search_docs_via(&fetcher, &query, &config).await.expect("second");
        assert!(!second.cached);
    }
}
