//! HTTP API over the search pipeline.
//!
//! - `GET /api/assets?q=&only=&price=&license=&kind=` ranks store product pages
//! - `GET /api/docs?q=&kind=` ranks documentation pages by relevance
//! - `GET /health`
//!
//! Successful searches are cacheable by shared caches; errors are not.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use assetscout_search::{
    HttpFetcher, LicenseTag, PriceTag, RankedResult, SearchError, SearchQuery, SearchReport, Store,
};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::ServiceConfig;
use crate::error::{ApiError, Result, ServiceError};

/// Shared handler state: one HTTP client for every upstream request.
#[derive(Clone)]
pub struct AppState {
    fetcher: HttpFetcher,
    config: Arc<ServiceConfig>,
}

impl AppState {
    /// Validate `config` and build the shared HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid `[search]` section or when the HTTP
    /// client cannot be built.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.search)?;
        Ok(Self {
            fetcher,
            config: Arc::new(config),
        })
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/assets", get(search_assets))
        .route("/api/docs", get(search_docs))
        .with_state(state)
}

/// Raw query-string options. Everything is optional here so that a missing
/// `q` is reported as a search error rather than an extractor rejection.
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    only: Option<String>,
    price: Option<String>,
    license: Option<String>,
    kind: Option<String>,
}

impl SearchParams {
    fn text(&self) -> std::result::Result<&str, SearchError> {
        self.q
            .as_deref()
            .ok_or_else(|| SearchError::InvalidQuery("q is required".into()))
    }

    fn asset_query(&self) -> std::result::Result<SearchQuery, SearchError> {
        let query = SearchQuery::new(self.text()?)?
            .with_scope(self.only.as_deref().unwrap_or_default().parse()?)
            .with_price(self.price.as_deref().unwrap_or_default().parse()?)
            .with_license(self.license.as_deref().unwrap_or_default())
            .with_kind(self.kind.as_deref().unwrap_or_default());
        Ok(query)
    }

    /// Documentation search has no stores, prices or licenses; those
    /// options are ignored.
    fn docs_query(&self) -> std::result::Result<SearchQuery, SearchError> {
        Ok(SearchQuery::new(self.text()?)?.with_kind(self.kind.as_deref().unwrap_or_default()))
    }
}

/// Successful response body.
#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    count: usize,
    results: Vec<ResultView>,
}

/// One result as the API presents it. Unknown tags and empty snippets are
/// omitted rather than sent as empty strings.
#[derive(Debug, Serialize)]
struct ResultView {
    title: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

impl From<RankedResult> for ResultView {
    fn from(result: RankedResult) -> Self {
        Self {
            store: (result.store != Store::Other).then(|| result.store.slug()),
            price: PriceTag::inferred_label(&result.price),
            license: LicenseTag::inferred_label(&result.license),
            snippet: (!result.snippet.is_empty()).then_some(result.snippet),
            score: result.score,
            title: result.title,
            url: result.url,
        }
    }
}

fn success(query: &SearchQuery, report: SearchReport, max_age: u64, swr: u64) -> Response {
    let results: Vec<ResultView> = report.results.into_iter().map(ResultView::from).collect();
    let body = SearchResponse {
        query: query.text.clone(),
        count: results.len(),
        results,
    };
    let cache_control = format!("public, s-maxage={max_age}, stale-while-revalidate={swr}");
    (
        StatusCode::OK,
        [(header::CACHE_CONTROL, cache_control)],
        Json(body),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn search_assets(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Response, ApiError> {
    let query = params.asset_query()?;
    tracing::debug!(
        q = %query.full_text(),
        only = query.only.name(),
        price = query.price.name(),
        license = ?query.license,
        "asset search"
    );

    let report =
        assetscout_search::search_assets_via(&state.fetcher, &query, &state.config.search).await?;
    tracing::debug!(
        count = report.results.len(),
        cached = report.cached,
        "asset search complete"
    );

    let cache = &state.config.cache;
    Ok(success(&query, report, cache.assets_max_age, cache.assets_swr))
}

async fn search_docs(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Response, ApiError> {
    let query = params.docs_query()?;
    tracing::debug!(q = %query.full_text(), "docs search");

    let report =
        assetscout_search::search_docs_via(&state.fetcher, &query, &state.config.search).await?;
    tracing::debug!(
        count = report.results.len(),
        cached = report.cached,
        "docs search complete"
    );

    let cache = &state.config.cache;
    Ok(success(&query, report, cache.docs_max_age, cache.docs_swr))
}

/// Bind the configured address.
async fn bind(config: &ServiceConfig) -> Result<(TcpListener, SocketAddr)> {
    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| ServiceError::Config(format!("bind {bind_addr} failed: {e}")))?;
    let addr = listener.local_addr()?;
    Ok((listener, addr))
}

/// Serve the API until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error for an invalid config, a failed bind, or a server
/// failure.
pub async fn run<S>(config: ServiceConfig, shutdown: S) -> Result<()>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (listener, addr) = bind(&config).await?;
    let app = router(AppState::new(config)?);

    tracing::info!("assetscout listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// The API served from a background task.
///
/// Binds to `{server.host}:{server.port}` (use port `0` for auto-assign).
pub struct SearchServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl SearchServer {
    /// Start serving in a background tokio task.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid config or a failed bind.
    pub async fn start(config: ServiceConfig) -> Result<Self> {
        let (listener, addr) = bind(&config).await?;
        let app = router(AppState::new(config)?);

        tracing::info!("assetscout listening on http://{addr}");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for SearchServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
