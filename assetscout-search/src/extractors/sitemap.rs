//! Sitemap XML: either a sitemap index or a urlset.
//!
//! Only `<loc>` values matter. Everything else (`lastmod`, `priority`,
//! image extensions) is ignored.

use quick_xml::events::Event;
use quick_xml::Reader;
use url::Url;

use super::{ExtractContext, SourceExtractor, SourceKind};
use crate::error::SearchError;
use crate::types::CandidateRecord;

/// A parsed sitemap document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// `<sitemapindex>`: locations of child sitemaps, in document order.
    Index(Vec<String>),
    /// `<urlset>`: page locations, in document order.
    UrlSet(Vec<String>),
}

impl SitemapDocument {
    pub fn locations(&self) -> &[String] {
        match self {
            Self::Index(locs) | Self::UrlSet(locs) => locs,
        }
    }
}

/// Which of the two sitemap shapes a document is, read from its root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapRoot {
    Index,
    UrlSet,
}

impl SitemapRoot {
    fn from_local_name(name: &[u8]) -> Result<Self, SearchError> {
        match name {
            b"sitemapindex" => Ok(Self::Index),
            b"urlset" => Ok(Self::UrlSet),
            other => Err(SearchError::Parse(format!(
                "unexpected sitemap root element <{}>",
                String::from_utf8_lossy(other)
            ))),
        }
    }
}

/// Read only as far as the root element.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the document has no root element, the
/// XML before it is malformed, or the root is neither `urlset` nor
/// `sitemapindex`.
pub fn sitemap_root(xml: &str) -> Result<SitemapRoot, SearchError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                return SitemapRoot::from_local_name(e.local_name().as_ref());
            }
            Ok(Event::Eof) => return Err(SearchError::Parse("empty sitemap document".into())),
            Err(e) => return Err(xml_error(&reader, &e)),
            _ => {}
        }
        buf.clear();
    }
}

/// Parse a sitemap XML string.
///
/// A self-closing root (`<urlset/>`) is a valid, empty document.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the XML is malformed or the root
/// element is neither `urlset` nor `sitemapindex`.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SearchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut root: Option<SitemapRoot> = None;
    let mut in_loc = false;
    let mut current_loc = String::new();
    let mut locations = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if root.is_none() {
                    root = Some(SitemapRoot::from_local_name(e.local_name().as_ref())?);
                } else if e.local_name().as_ref() == b"loc" {
                    in_loc = true;
                    current_loc.clear();
                }
            }
            Ok(Event::Empty(e)) if root.is_none() => {
                root = Some(SitemapRoot::from_local_name(e.local_name().as_ref())?);
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"loc" && in_loc {
                    let loc = current_loc.trim();
                    if !loc.is_empty() {
                        locations.push(loc.to_owned());
                    }
                    in_loc = false;
                }
            }
            Ok(Event::Text(e)) if in_loc => {
                let text = e
                    .unescape()
                    .map_err(|err| SearchError::Parse(format!("bad sitemap text: {err}")))?;
                current_loc.push_str(&text);
            }
            Ok(Event::CData(e)) if in_loc => {
                current_loc.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(&reader, &e)),
            _ => {}
        }
        buf.clear();
    }

    match root {
        Some(SitemapRoot::Index) => Ok(SitemapDocument::Index(locations)),
        Some(SitemapRoot::UrlSet) => Ok(SitemapDocument::UrlSet(locations)),
        None => Err(SearchError::Parse("empty sitemap document".into())),
    }
}

fn xml_error(reader: &Reader<&[u8]>, err: &quick_xml::Error) -> SearchError {
    SearchError::Parse(format!(
        "sitemap XML error at {}: {err}",
        reader.buffer_position()
    ))
}

/// Extractor for urlset sitemaps. Index documents yield nothing here; the
/// retrieval strategy descends into them.
pub struct SitemapExtractor;

impl SourceExtractor for SitemapExtractor {
    fn extract(&self, payload: &str, _context: &ExtractContext) -> Vec<CandidateRecord> {
        match parse_sitemap(payload) {
            Ok(SitemapDocument::UrlSet(locs)) => page_candidates(&locs),
            Ok(SitemapDocument::Index(_)) => Vec::new(),
            Err(err) => {
                tracing::debug!(error = %err, "sitemap not extractable");
                Vec::new()
            }
        }
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Sitemap
    }
}

/// File extensions dropped when humanising a page name.
const PAGE_EXTENSIONS: &[&str] = &["html", "htm", "php", "asp", "aspx", "md"];

/// One candidate per page location, titled from its path.
pub fn page_candidates(locations: &[String]) -> Vec<CandidateRecord> {
    locations
        .iter()
        .map(|loc| CandidateRecord::new(&title_from_url(loc), loc, ""))
        .collect()
}

/// Humanise the last path segment: `blueprint-basics.html` → `Blueprint Basics`.
pub fn title_from_url(loc: &str) -> String {
    let segment = Url::parse(loc)
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .filter(|s| !s.is_empty())
                .last()
                .map(str::to_owned)
        })
        .unwrap_or_default();

    let stem = segment
        .rsplit_once('.')
        .filter(|(_, ext)| {
            PAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .map_or(segment.as_str(), |(stem, _ext)| stem);

    stem.split(['-', '_', '+'])
        .filter(|word| !word.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
