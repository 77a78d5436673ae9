//! Store-listing pages (itch.io search and browse grids).
//!
//! Listings are fixed-shape cells; title, link, price and blurb are read
//! from sibling fields within each cell. The price text is folded into the
//! snippet so the attribute tagger sees it.

use scraper::{ElementRef, Html};

use super::{selector, ExtractContext, SourceExtractor, SourceKind};
use crate::error::SearchError;
use crate::types::CandidateRecord;

const CELL_SELECTOR: &str = ".game_cell";
const TITLE_SELECTOR: &str = ".game_title a.title, .game_title a";
const PRICE_SELECTOR: &str = ".price_value";
/// Cells without a price value may still carry a sale badge such as `Free`.
const SALE_TAG_SELECTOR: &str = ".sale_tag";
const TEXT_SELECTOR: &str = ".game_text";

/// Extractor for a store's own listing grid.
pub struct StoreListingExtractor;

impl SourceExtractor for StoreListingExtractor {
    fn extract(&self, payload: &str, _context: &ExtractContext) -> Vec<CandidateRecord> {
        match parse_listing_html(payload) {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::debug!(error = %err, "store listing not extractable");
                Vec::new()
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::StoreListing
    }
}

/// Parse listing cells into candidates.
///
/// Extracted as a separate function for testability with mock HTML.
pub(crate) fn parse_listing_html(html: &str) -> Result<Vec<CandidateRecord>, SearchError> {
    let document = Html::parse_document(html);

    let cell_sel = selector(CELL_SELECTOR)?;
    let title_sel = selector(TITLE_SELECTOR)?;
    let price_sel = selector(PRICE_SELECTOR)?;
    let sale_sel = selector(SALE_TAG_SELECTOR)?;
    let text_sel = selector(TEXT_SELECTOR)?;

    let mut candidates = Vec::new();

    for cell in document.select(&cell_sel) {
        let Some(title_el) = cell.select(&title_sel).next() else {
            continue;
        };

        let title = text_of(title_el);
        if title.is_empty() {
            continue;
        }

        let href = match title_el.value().attr("href") {
            Some(h) if !h.trim().is_empty() => h,
            _ => continue,
        };

        let blurb = cell.select(&text_sel).next().map(text_of).unwrap_or_default();
        let price = cell
            .select(&price_sel)
            .chain(cell.select(&sale_sel))
            .map(text_of)
            .find(|text| !text.is_empty())
            .unwrap_or_default();

        let snippet = match (blurb.is_empty(), price.is_empty()) {
            (_, true) => blurb,
            (true, false) => price,
            (false, false) => format!("{blurb} - {price}"),
        };

        candidates.push(CandidateRecord::new(&title, href, &snippet));
    }

    tracing::debug!(count = candidates.len(), "store listing parsed");
    Ok(candidates)
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
