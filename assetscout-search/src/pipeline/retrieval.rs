//! Retrieval strategy: which upstream requests a query becomes, and the
//! policies around them.
//!
//! - A web search tries the primary endpoint (`GET ?q=`) and, only if that
//!   produced no candidates, the mirror endpoint once (`POST q=`).
//! - A store page is a single `GET`; there is no fallback.
//! - A sitemap index is descended one level, into at most
//!   `max_child_sitemaps` children.
//!
//! Every fetch is bounded by `timeout_seconds`. Failures become
//! [`SourceOutcome::Degraded`]; nothing here returns an error.

use std::time::Duration;

use futures::future::join_all;

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::extractors::sitemap::{parse_sitemap, sitemap_root, SitemapRoot};
use crate::extractors::{
    EmbeddedDataExtractor, ExtractContext, RenderedResultsExtractor, SitemapExtractor,
    SourceExtractor, StoreListingExtractor,
};
use crate::fetch::{Fetch, FetchRequest};
use crate::types::{CandidateRecord, SearchQuery, SourceOutcome, Store};

/// One independent piece of upstream work for an asset query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    /// Web search scoped to a store's site.
    Web { store: Store, site: &'static str },
    /// The store's own search page.
    StorePage(Store),
}

impl Unit {
    fn for_store(store: Store) -> Vec<Self> {
        let site = match store {
            Store::Marketplace => "unrealengine.com/marketplace",
            Store::Itch => "itch.io",
            Store::Docs | Store::Other => return Vec::new(),
        };
        vec![Self::Web { store, site }, Self::StorePage(store)]
    }
}

/// Issues upstream requests through an injected [`Fetch`].
pub struct Retriever<'a, F> {
    fetcher: &'a F,
    config: &'a SearchConfig,
}

impl<'a, F: Fetch> Retriever<'a, F> {
    pub fn new(fetcher: &'a F, config: &'a SearchConfig) -> Self {
        Self { fetcher, config }
    }

    /// Run every retrieval unit for an asset query concurrently.
    ///
    /// Outcomes come back in a fixed order: per store in scope (primary
    /// store first), the web search and then the store page.
    pub async fn assets(&self, query: &SearchQuery) -> Vec<SourceOutcome> {
        let units: Vec<Unit> = query
            .only
            .stores()
            .iter()
            .flat_map(|store| Unit::for_store(*store))
            .collect();

        join_all(units.into_iter().map(|unit| self.run_unit(unit, query))).await
    }

    async fn run_unit(&self, unit: Unit, query: &SearchQuery) -> SourceOutcome {
        match unit {
            Unit::Web { store, site } => {
                self.web_search(&format!("web:{store}"), &query.site_query(site))
                    .await
            }
            Unit::StorePage(store) => self.store_page(store, &query.full_text()).await,
        }
    }

    /// Primary-then-fallback web search.
    pub async fn web_search(&self, source: &str, text: &str) -> SourceOutcome {
        let endpoints = &self.config.endpoints;

        let primary = FetchRequest::get(&endpoints.web_search).param("q", text);
        match self.fetch_text(primary).await {
            Ok(body) => {
                let candidates = extract(
                    &RenderedResultsExtractor,
                    &body,
                    &ExtractContext::new(&endpoints.web_search),
                );
                if !candidates.is_empty() {
                    return collected(source, &endpoints.web_search, candidates, false);
                }
                tracing::debug!(source, "primary search returned nothing, trying fallback");
            }
            Err(err) => {
                tracing::debug!(source, error = %err, "primary search failed, trying fallback");
            }
        }

        let fallback = FetchRequest::post(&endpoints.web_search_fallback).param("q", text);
        match self.fetch_text(fallback).await {
            Ok(body) => {
                let candidates = extract(
                    &RenderedResultsExtractor,
                    &body,
                    &ExtractContext::new(&endpoints.web_search_fallback),
                );
                collected(source, &endpoints.web_search_fallback, candidates, true)
            }
            Err(error) => degraded(source, error),
        }
    }

    /// Single request to a store's own search page.
    pub async fn store_page(&self, store: Store, text: &str) -> SourceOutcome {
        let endpoints = &self.config.endpoints;
        let source = format!("store:{store}");

        let (url, param, context) = match store {
            Store::Marketplace => (
                &endpoints.marketplace_search,
                "keywords",
                ExtractContext::new(&endpoints.marketplace_search)
                    .with_product_template(&endpoints.marketplace_product_template),
            ),
            Store::Itch => (
                &endpoints.itch_search,
                "q",
                ExtractContext::new(&endpoints.itch_search),
            ),
            Store::Docs | Store::Other => {
                return degraded(
                    &source,
                    SearchError::Pipeline(format!("{store} has no store search page")),
                );
            }
        };

        match self.fetch_text(FetchRequest::get(url).param(param, text)).await {
            Ok(body) => {
                let candidates = match store {
                    Store::Marketplace => extract(&EmbeddedDataExtractor, &body, &context),
                    _ => extract(&StoreListingExtractor, &body, &context),
                };
                collected(&source, url, candidates, false)
            }
            Err(error) => degraded(&source, error),
        }
    }

    /// Fetch the documentation sitemap, descending one level into an index.
    ///
    /// A urlset yields one outcome. An index yields one outcome per fetched
    /// child, in index order; children past `max_child_sitemaps` are never
    /// requested.
    pub async fn sitemap(&self) -> Vec<SourceOutcome> {
        let root = &self.config.endpoints.docs_sitemap;

        let (body, kind) = match self.fetch_sitemap(root).await {
            Ok(fetched) => fetched,
            Err(error) => return vec![degraded("sitemap", error)],
        };

        match kind {
            SitemapRoot::UrlSet => {
                vec![collected("sitemap", root, urlset_pages(&body, root), false)]
            }
            SitemapRoot::Index => {
                let children = match parse_sitemap(&body) {
                    Ok(document) => document.locations().to_vec(),
                    Err(error) => return vec![degraded("sitemap", error)],
                };
                let limit = self.config.max_child_sitemaps;
                if children.len() > limit {
                    tracing::debug!(
                        total = children.len(),
                        limit,
                        "sitemap index truncated"
                    );
                }
                let fetches = children
                    .iter()
                    .take(limit)
                    .enumerate()
                    .map(|(i, child)| self.child_sitemap(i + 1, child));
                join_all(fetches).await
            }
        }
    }

    async fn child_sitemap(&self, position: usize, url: &str) -> SourceOutcome {
        let source = format!("sitemap:{position}");
        match self.fetch_sitemap(url).await {
            Ok((body, SitemapRoot::UrlSet)) => {
                collected(&source, url, urlset_pages(&body, url), false)
            }
            Ok((_, SitemapRoot::Index)) => {
                tracing::debug!(source = %source, "nested sitemap index not descended");
                collected(&source, url, Vec::new(), false)
            }
            Err(error) => degraded(&source, error),
        }
    }

    /// Fetch a sitemap and tell an index from a urlset.
    async fn fetch_sitemap(&self, url: &str) -> Result<(String, SitemapRoot), SearchError> {
        let body = self.fetch_text(FetchRequest::get(url)).await?;
        let kind = sitemap_root(&body)?;
        Ok((body, kind))
    }

    /// One bounded fetch. Non-2xx answers are errors here.
    async fn fetch_text(&self, request: FetchRequest) -> Result<String, SearchError> {
        let seconds = self.config.timeout_seconds;
        let response = tokio::time::timeout(
            Duration::from_secs(seconds),
            self.fetcher.fetch(&request),
        )
        .await
        .map_err(|_| SearchError::Timeout(format!("{} exceeded {seconds}s", request.url)))??;
        response.into_text(&request.url)
    }
}

fn extract(
    extractor: &impl SourceExtractor,
    body: &str,
    context: &ExtractContext,
) -> Vec<CandidateRecord> {
    let candidates = extractor.extract(body, context);
    tracing::trace!(
        kind = extractor.kind().name(),
        count = candidates.len(),
        base = %context.base_url,
        "payload extracted"
    );
    candidates
}

fn urlset_pages(body: &str, url: &str) -> Vec<CandidateRecord> {
    extract(&SitemapExtractor, body, &ExtractContext::new(url))
}

fn collected(
    source: &str,
    base_url: &str,
    candidates: Vec<CandidateRecord>,
    used_fallback: bool,
) -> SourceOutcome {
    SourceOutcome::Collected {
        source: source.to_owned(),
        base_url: base_url.to_owned(),
        candidates,
        used_fallback,
    }
}

fn degraded(source: &str, error: SearchError) -> SourceOutcome {
    SourceOutcome::Degraded {
        source: source.to_owned(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockFetcher;
    use crate::fetch::FetchMethod;
    use crate::pipeline::test_support::{
        results_page, sitemap_index, test_config, urlset, ITCH, MARKET, MIRROR, SITEMAP, WEB,
    };
    use crate::types::StoreScope;

    const EMPTY_PAGE: &str = "<html><body><p>No results.</p></body></html>";

    fn one_result() -> String {
        results_page(&[(
            "RPG Icons",
            "https://pixelsmith.itch.io/rpg-icons",
            "Free icon pack",
        )])
    }

    fn assert_collected(outcome: &SourceOutcome, expected: usize, fallback: bool) {
        match outcome {
            SourceOutcome::Collected {
                candidates,
                used_fallback,
                ..
            } => {
                assert_eq!(candidates.len(), expected, "{outcome:?}");
                assert_eq!(*used_fallback, fallback, "{outcome:?}");
            }
            SourceOutcome::Degraded { .. } => panic!("expected collected, got {outcome:?}"),
        }
    }

    #[tokio::test]
    async fn primary_hit_skips_fallback() {
        let fetcher = MockFetcher::new().route(FetchMethod::Get, WEB, 200, &one_result());
        let config = test_config();
        let outcome = Retriever::new(&fetcher, &config)
            .web_search("web:itch", "site:itch.io rpg icons")
            .await;

        assert_collected(&outcome, 1, false);
        assert_eq!(fetcher.calls_to(MIRROR), 0);

        let calls = fetcher.calls();
        assert_eq!(calls[0].method, FetchMethod::Get);
        assert_eq!(
            calls[0].params,
            vec![("q".to_owned(), "site:itch.io rpg icons".to_owned())]
        );
    }

    #[tokio::test]
    async fn empty_primary_triggers_single_post_fallback() {
        let fetcher = MockFetcher::new()
            .route(FetchMethod::Get, WEB, 200, EMPTY_PAGE)
            .route(FetchMethod::Post, MIRROR, 200, &one_result());
        let config = test_config();
        let outcome = Retriever::new(&fetcher, &config)
            .web_search("web:itch", "rpg icons")
            .await;

        assert_collected(&outcome, 1, true);
        let fallback_calls: Vec<_> = fetcher
            .calls()
            .into_iter()
            .filter(|c| c.url == MIRROR)
            .collect();
        assert_eq!(fallback_calls.len(), 1);
        assert_eq!(fallback_calls[0].method, FetchMethod::Post);
        assert_eq!(
            fallback_calls[0].params,
            vec![("q".to_owned(), "rpg icons".to_owned())]
        );
    }

    #[tokio::test]
    async fn failed_primary_triggers_fallback() {
        let fetcher = MockFetcher::new()
            .fail(FetchMethod::Get, WEB, SearchError::Http("connection reset".into()))
            .route(FetchMethod::Post, MIRROR, 200, &one_result());
        let config = test_config();
        let outcome = Retriever::new(&fetcher, &config)
            .web_search("web:itch", "rpg icons")
            .await;
        assert_collected(&outcome, 1, true);
    }

    #[tokio::test]
    async fn empty_twice_is_collected_with_nothing() {
        let fetcher = MockFetcher::new()
            .route(FetchMethod::Get, WEB, 200, EMPTY_PAGE)
            .route(FetchMethod::Post, MIRROR, 200, EMPTY_PAGE);
        let config = test_config();
        let outcome = Retriever::new(&fetcher, &config)
            .web_search("web:itch", "zzzz")
            .await;

        assert_collected(&outcome, 0, true);
        assert_eq!(fetcher.calls_to(WEB), 1);
        assert_eq!(fetcher.calls_to(MIRROR), 1);
    }

    #[tokio::test]
    async fn failed_fallback_degrades_source() {
        // Neither endpoint is routed: both answer 404.
        let fetcher = MockFetcher::new();
        let config = test_config();
        let outcome = Retriever::new(&fetcher, &config)
            .web_search("web:itch", "rpg icons")
            .await;

        assert!(outcome.is_degraded());
        assert_eq!(outcome.source(), "web:itch");
        assert_eq!(fetcher.calls().len(), 2);
    }

    #[tokio::test]
    async fn marketplace_store_page_uses_embedded_data_and_template() {
        let page = r#"<html><body><script id="__NEXT_DATA__" type="application/json">
{"props":{"pageProps":{"products":[
  {"title":"Sword Animset","slug":"sword-animset","price":{"formatted":"$29.99"}}
]}}}
</script></body></html>"#;
        let fetcher = MockFetcher::new().route(FetchMethod::Get, MARKET, 200, page);
        let config = test_config();
        let outcome = Retriever::new(&fetcher, &config)
            .store_page(Store::Marketplace, "sword animations")
            .await;

        let SourceOutcome::Collected { candidates, .. } = &outcome else {
            panic!("expected collected, got {outcome:?}");
        };
        assert_eq!(
            candidates[0].raw_url,
            "https://www.unrealengine.com/marketplace/en-US/product/sword-animset"
        );
        assert_eq!(
            fetcher.calls()[0].params,
            vec![("keywords".to_owned(), "sword animations".to_owned())]
        );
    }

    #[tokio::test]
    async fn store_page_has_no_fallback() {
        let fetcher = MockFetcher::new().route(FetchMethod::Get, ITCH, 503, "");
        let config = test_config();
        let outcome = Retriever::new(&fetcher, &config)
            .store_page(Store::Itch, "icons")
            .await;

        assert!(outcome.is_degraded());
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let fetcher = MockFetcher::new()
            .route(FetchMethod::Get, ITCH, 200, "<html></html>")
            .delay(ITCH, Duration::from_secs(3));
        let config = test_config();
        let outcome = Retriever::new(&fetcher, &config)
            .store_page(Store::Itch, "icons")
            .await;

        match outcome {
            SourceOutcome::Degraded { error, .. } => {
                assert!(matches!(error, SearchError::Timeout(_)), "{error:?}");
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn asset_units_run_in_fixed_order() {
        let fetcher = MockFetcher::new();
        let config = test_config();
        let query = SearchQuery::new("rpg icons").expect("valid");
        let outcomes = Retriever::new(&fetcher, &config).assets(&query).await;

        let sources: Vec<_> = outcomes.iter().map(SourceOutcome::source).collect();
        assert_eq!(
            sources,
            ["web:marketplace", "store:marketplace", "web:itch", "store:itch"]
        );

        let scoped = query.with_scope(StoreScope::Itch);
        let outcomes = Retriever::new(&fetcher, &config).assets(&scoped).await;
        let sources: Vec<_> = outcomes.iter().map(SourceOutcome::source).collect();
        assert_eq!(sources, ["web:itch", "store:itch"]);
    }

    #[tokio::test]
    async fn sitemap_urlset_is_one_outcome() {
        let fetcher = MockFetcher::new().route(
            FetchMethod::Get,
            SITEMAP,
            200,
            &urlset(&[
                "https://dev.epicgames.com/documentation/a",
                "https://dev.epicgames.com/documentation/b",
            ]),
        );
        let config = test_config();
        let outcomes = Retriever::new(&fetcher, &config).sitemap().await;
        assert_eq!(outcomes.len(), 1);
        assert_collected(&outcomes[0], 2, false);
    }

    #[tokio::test]
    async fn sitemap_index_fetches_at_most_three_children() {
        let children: Vec<String> = (1..=5)
            .map(|i| format!("https://docs.test/sitemap-{i}.xml"))
            .collect();
        let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

        let mut fetcher =
            MockFetcher::new().route(FetchMethod::Get, SITEMAP, 200, &sitemap_index(&child_refs));
        for (i, child) in children.iter().enumerate() {
            let page = format!("https://dev.epicgames.com/documentation/page-{}", i + 1);
            fetcher = fetcher.route(FetchMethod::Get, child, 200, &urlset(&[page.as_str()]));
        }

        let config = test_config();
        let outcomes = Retriever::new(&fetcher, &config).sitemap().await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes.iter().map(SourceOutcome::source).collect::<Vec<_>>(),
            ["sitemap:1", "sitemap:2", "sitemap:3"]
        );
        assert_eq!(fetcher.calls_to(&children[3]), 0);
        assert_eq!(fetcher.calls_to(&children[4]), 0);
    }

    #[tokio::test]
    async fn failed_child_is_skipped_and_recorded() {
        let fetcher = MockFetcher::new()
            .route(
                FetchMethod::Get,
                SITEMAP,
                200,
                &sitemap_index(&["https://docs.test/a.xml", "https://docs.test/b.xml"]),
            )
            .route(FetchMethod::Get, "https://docs.test/a.xml", 500, "")
            .route(
                FetchMethod::Get,
                "https://docs.test/b.xml",
                200,
                &urlset(&["https://dev.epicgames.com/documentation/b"]),
            );
        let config = test_config();
        let outcomes = Retriever::new(&fetcher, &config).sitemap().await;

        assert!(outcomes[0].is_degraded());
        assert_collected(&outcomes[1], 1, false);
    }

    #[tokio::test]
    async fn nested_index_not_descended() {
        let fetcher = MockFetcher::new()
            .route(
                FetchMethod::Get,
                SITEMAP,
                200,
                &sitemap_index(&["https://docs.test/nested.xml"]),
            )
            .route(
                FetchMethod::Get,
                "https://docs.test/nested.xml",
                200,
                &sitemap_index(&["https://docs.test/deep.xml"]),
            );
        let config = test_config();
        let outcomes = Retriever::new(&fetcher, &config).sitemap().await;

        assert_collected(&outcomes[0], 0, false);
        assert_eq!(fetcher.calls_to("https://docs.test/deep.xml"), 0);
    }

    #[tokio::test]
    async fn malformed_root_sitemap_degrades() {
        let fetcher = MockFetcher::new().route(FetchMethod::Get, SITEMAP, 200, "<html>nope</html>");
        let config = test_config();
        let outcomes = Retriever::new(&fetcher, &config).sitemap().await;
        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            SourceOutcome::Degraded { error, .. } => {
                assert!(matches!(error, SearchError::Parse(_)));
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn self_closing_empty_sitemap_is_collected() {
        let fetcher = MockFetcher::new().route(
            FetchMethod::Get,
            SITEMAP,
            200,
            r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"/>"#,
        );
        let config = test_config();
        let outcomes = Retriever::new(&fetcher, &config).sitemap().await;
        assert_eq!(outcomes.len(), 1);
        assert_collected(&outcomes[0], 0, false);
    }

    #[tokio::test]
    async fn self_closing_empty_index_fetches_nothing_more() {
        let fetcher = MockFetcher::new().route(
            FetchMethod::Get,
            SITEMAP,
            200,
            r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9"/>"#,
        );
        let config = test_config();
        let outcomes = Retriever::new(&fetcher, &config).sitemap().await;
        assert!(outcomes.is_empty());
        assert_eq!(fetcher.calls().len(), 1);
    }
}
