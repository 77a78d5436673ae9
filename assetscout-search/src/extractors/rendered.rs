//! Rendered search-results pages (DuckDuckGo HTML and compatible mirrors).
//!
//! The primary pattern reads organic result links; if it finds nothing the
//! extractor falls back to any link inside a known results container, which
//! survives most markup reshuffles of the result blocks themselves.

use scraper::{ElementRef, Html};

use super::{selector, ExtractContext, SourceExtractor, SourceKind};
use crate::error::SearchError;
use crate::types::CandidateRecord;

/// Organic result blocks, ads excluded.
const RESULT_SELECTOR: &str =
    ".result.results_links.results_links_deep:not(.result--ad), .web-result:not(.result--ad)";
const TITLE_SELECTOR: &str = ".result__a";
const SNIPPET_SELECTOR: &str = ".result__snippet";
/// Loose fallback: any link inside a known results container.
const CONTAINER_LINK_SELECTOR: &str =
    "#links a[href], .results a[href], .serp__results a[href], #b_results a[href]";

/// Extractor for rendered search-engine result pages.
pub struct RenderedResultsExtractor;

impl SourceExtractor for RenderedResultsExtractor {
    fn extract(&self, payload: &str, _context: &ExtractContext) -> Vec<CandidateRecord> {
        match parse_rendered_results(payload) {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::debug!(error = %err, "rendered results not extractable");
                Vec::new()
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::RenderedResults
    }
}

/// Parse a results page into candidates, in document order.
///
/// Extracted as a separate function for testability with mock HTML.
pub(crate) fn parse_rendered_results(html: &str) -> Result<Vec<CandidateRecord>, SearchError> {
    let document = Html::parse_document(html);

    let primary = parse_primary(&document)?;
    if !primary.is_empty() {
        tracing::debug!(count = primary.len(), "rendered results parsed");
        return Ok(primary);
    }

    let fallback = parse_container_links(&document)?;
    tracing::debug!(count = fallback.len(), "rendered results parsed via container fallback");
    Ok(fallback)
}

fn parse_primary(document: &Html) -> Result<Vec<CandidateRecord>, SearchError> {
    let result_sel = selector(RESULT_SELECTOR)?;
    let title_sel = selector(TITLE_SELECTOR)?;
    let snippet_sel = selector(SNIPPET_SELECTOR)?;

    let mut candidates = Vec::new();

    for element in document.select(&result_sel) {
        let Some(title_el) = element.select(&title_sel).next() else {
            continue;
        };

        let title = text_of(title_el);
        if title.is_empty() {
            continue;
        }

        let Some(href) = title_el.value().attr("href") else {
            continue;
        };

        let snippet = element
            .select(&snippet_sel)
            .next()
            .map(text_of)
            .unwrap_or_default();

        candidates.push(CandidateRecord::new(&title, href, &snippet));
    }

    Ok(candidates)
}

fn parse_container_links(document: &Html) -> Result<Vec<CandidateRecord>, SearchError> {
    let link_sel = selector(CONTAINER_LINK_SELECTOR)?;

    let candidates = document
        .select(&link_sel)
        .filter_map(|link| {
            let href = link.value().attr("href")?;
            let title = text_of(link);
            (!title.is_empty()).then(|| CandidateRecord::new(&title, href, ""))
        })
        .collect();

    Ok(candidates)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
