//! Error types for the assetscout-search crate.
//!
//! Per-source failures ([`SearchError::Http`], [`SearchError::Timeout`],
//! [`SearchError::Parse`]) are recovered inside the pipeline and only ever
//! surface through [`crate::types::SourceOutcome::Degraded`]. The remaining
//! variants reach the caller.

/// Errors that can occur while discovering and ranking pages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    /// The caller's query is missing, too short, or carries an unknown option.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// A fetch did not complete within the configured bound.
    #[error("fetch timed out: {0}")]
    Timeout(String),

    /// An upstream request failed or answered with a non-2xx status.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An upstream payload (HTML, XML, JSON) could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// Unexpected fault while aggregating or building the response.
    #[error("pipeline failure: {0}")]
    Pipeline(String),

    /// Invalid search configuration.
    #[error("config error: {0}")]
    Config(String),
}

impl SearchError {
    /// Returns `true` for errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }

    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidQuery(_) => "InvalidQuery",
            Self::Timeout(_) | Self::Http(_) => "UpstreamFetchFailure",
            Self::Parse(_) => "ParseFailure",
            Self::Pipeline(_) | Self::Config(_) => "PipelineFailure",
        }
    }
}

/// Convenience type alias for assetscout-search results.
pub type Result<T> = std::result::Result<T, SearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_query() {
        let err = SearchError::InvalidQuery("q must be at least 2 characters".into());
        assert_eq!(
            err.to_string(),
            "invalid query: q must be at least 2 characters"
        );
    }

    #[test]
    fn display_timeout() {
        let err = SearchError::Timeout("exceeded 8s limit".into());
        assert_eq!(err.to_string(), "fetch timed out: exceeded 8s limit");
    }

    #[test]
    fn display_http() {
        let err = SearchError::Http("status 503".into());
        assert_eq!(err.to_string(), "HTTP error: status 503");
    }

    #[test]
    fn display_parse() {
        let err = SearchError::Parse("unexpected end of XML".into());
        assert_eq!(err.to_string(), "parse error: unexpected end of XML");
    }

    #[test]
    fn display_pipeline() {
        let err = SearchError::Pipeline("score was NaN".into());
        assert_eq!(err.to_string(), "pipeline failure: score was NaN");
    }

    #[test]
    fn only_invalid_query_is_client_error() {
        assert!(SearchError::InvalidQuery("x".into()).is_client_error());
        assert!(!SearchError::Http("x".into()).is_client_error());
        assert!(!SearchError::Pipeline("x".into()).is_client_error());
        assert!(!SearchError::Config("x".into()).is_client_error());
    }

    #[test]
    fn kinds_follow_the_taxonomy() {
        assert_eq!(SearchError::Timeout("t".into()).kind(), "UpstreamFetchFailure");
        assert_eq!(SearchError::Http("h".into()).kind(), "UpstreamFetchFailure");
        assert_eq!(SearchError::Parse("p".into()).kind(), "ParseFailure");
        assert_eq!(SearchError::Config("c".into()).kind(), "PipelineFailure");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SearchError>();
    }
}
