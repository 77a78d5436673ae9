//! The raw fetch capability the pipeline is built on.
//!
//! The pipeline never talks to the network directly: it hands a
//! [`FetchRequest`] to an injected [`Fetch`] implementation and reads back a
//! status plus text body. [`crate::http::HttpFetcher`] is the production
//! implementation; tests substitute their own.

use crate::error::SearchError;

/// HTTP method of a fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMethod {
    /// Parameters go in the query string.
    Get,
    /// Parameters go in a URL-encoded form body.
    Post,
}

/// A single upstream request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: FetchMethod,
    pub url: String,
    /// Query-string parameters (GET) or form fields (POST).
    pub params: Vec<(String, String)>,
}

impl FetchRequest {
    /// A GET request without parameters.
    pub fn get(url: &str) -> Self {
        Self {
            method: FetchMethod::Get,
            url: url.to_owned(),
            params: Vec::new(),
        }
    }

    /// A POST request with an empty form.
    pub fn post(url: &str) -> Self {
        Self {
            method: FetchMethod::Post,
            url: url.to_owned(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.params.push((key.to_owned(), value.to_owned()));
        self
    }
}

/// Status and body of an upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body, or [`SearchError::Http`] for a non-2xx status.
    pub fn into_text(self, url: &str) -> Result<String, SearchError> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(SearchError::Http(format!(
                "{url} answered with status {}",
                self.status
            )))
        }
    }
}

/// A pluggable raw fetch capability.
///
/// Implementations perform one request and report its status and body. They
/// must not retry; the retrieval strategy owns the single-fallback policy.
/// All implementations must be `Send + Sync` for concurrent retrieval.
pub trait Fetch: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Http`] when the request could not be completed.
    /// A non-2xx answer is *not* an error at this level.
    fn fetch(
        &self,
        request: &FetchRequest,
    ) -> impl std::future::Future<Output = Result<FetchResponse, SearchError>> + Send;
}
