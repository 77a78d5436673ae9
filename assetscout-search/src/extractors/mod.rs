//! Source extractors: one raw payload in, candidate records out.
//!
//! Each module provides a struct implementing [`SourceExtractor`] for one
//! payload kind. Extractors never fail the pipeline: missing structure,
//! malformed markup or unparseable data all yield an empty sequence.

pub mod embedded;
pub mod listing;
pub mod rendered;
pub mod sitemap;

pub use embedded::EmbeddedDataExtractor;
pub use listing::StoreListingExtractor;
pub use rendered::RenderedResultsExtractor;
pub use sitemap::SitemapExtractor;

use scraper::Selector;

use crate::error::SearchError;
use crate::types::CandidateRecord;

/// The payload kinds the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// A rendered search-engine results page.
    RenderedResults,
    /// A page carrying an embedded JSON page-data blob.
    EmbeddedData,
    /// A sitemap XML document.
    Sitemap,
    /// A store's own listing page with fixed-shape cells.
    StoreListing,
}

impl SourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RenderedResults => "rendered-results",
            Self::EmbeddedData => "embedded-data",
            Self::Sitemap => "sitemap",
            Self::StoreListing => "store-listing",
        }
    }
}

/// Per-payload context handed to an extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractContext {
    /// URL the payload was fetched from.
    pub base_url: String,
    /// Template for synthesising product URLs from slugs; `{slug}` is replaced.
    pub product_url_template: Option<String>,
}

impl ExtractContext {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_owned(),
            product_url_template: None,
        }
    }

    pub fn with_product_template(mut self, template: &str) -> Self {
        self.product_url_template = Some(template.to_owned());
        self
    }
}

/// A pluggable payload extractor.
///
/// Implementors turn one raw payload into candidate records in document
/// order. They do not canonicalise, classify or filter; later pipeline
/// stages own that.
pub trait SourceExtractor: Send + Sync {
    /// Extract candidates. Never fails; returns an empty sequence when the
    /// expected structure is absent.
    fn extract(&self, payload: &str, context: &ExtractContext) -> Vec<CandidateRecord>;

    /// Which [`SourceKind`] this implementation handles.
    fn kind(&self) -> SourceKind;
}

/// Parse a static CSS selector.
pub(crate) fn selector(css: &str) -> Result<Selector, SearchError> {
    Selector::parse(css).map_err(|e| SearchError::Parse(format!("invalid selector {css}: {e:?}")))
}
