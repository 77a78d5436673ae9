//! assetscout: an HTTP service for keyless Unreal Engine asset and
//! documentation search.
//!
//! The search pipeline itself lives in the `assetscout-search` crate. This
//! crate wraps it in an axum API:
//!
//! - **config**: TOML service configuration (listener, search, cache headers)
//! - **server**: routes, query-option parsing and the response shape
//! - **error**: service errors and their HTTP mapping

pub mod config;
pub mod error;
pub mod server;

pub use config::ServiceConfig;
pub use error::{ApiError, Result, ServiceError};
pub use server::{AppState, SearchServer, router};
