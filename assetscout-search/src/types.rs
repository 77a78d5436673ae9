//! Core record types flowing through the pipeline, plus query options.
//!
//! Each stage builds a new, more refined record from the previous one:
//! [`CandidateRecord`] → [`ResolvedRecord`] → [`ClassifiedRecord`] →
//! [`AnnotatedRecord`] → [`RankedResult`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Minimum number of characters (after trimming) a query must carry.
pub const MIN_QUERY_CHARS: usize = 2;

/// One discovered page, exactly as a source extractor found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    /// Link or listing title. May be empty.
    pub title: String,
    /// The href as found in the payload: relative, redirect-wrapped or absolute.
    pub raw_url: String,
    /// Free text near the link. May be empty.
    pub snippet: String,
}

impl CandidateRecord {
    /// Build a candidate, trimming surrounding whitespace from every field.
    pub fn new(title: &str, raw_url: &str, snippet: &str) -> Self {
        Self {
            title: collapse_whitespace(title),
            raw_url: raw_url.trim().to_owned(),
            snippet: collapse_whitespace(snippet),
        }
    }
}

/// A candidate whose URL has been canonicalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRecord {
    pub candidate: CandidateRecord,
    /// Absolute, normalised URL. Identity key for deduplication.
    pub canonical_url: String,
}

/// A resolved record labelled with its store and page shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub resolved: ResolvedRecord,
    pub store: Store,
    pub is_page_like: bool,
}

impl ClassifiedRecord {
    /// Only records from a known store that look like a single product or
    /// article page may reach the ranker.
    pub fn is_admissible(&self) -> bool {
        self.store != Store::Other && self.is_page_like
    }
}

/// A classified record annotated with inferred attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedRecord {
    pub classified: ClassifiedRecord,
    pub price: PriceTag,
    pub license: LicenseTag,
}

impl AnnotatedRecord {
    pub fn title(&self) -> &str {
        &self.classified.resolved.candidate.title
    }

    pub fn snippet(&self) -> &str {
        &self.classified.resolved.candidate.snippet
    }

    pub fn canonical_url(&self) -> &str {
        &self.classified.resolved.canonical_url
    }

    pub fn store(&self) -> Store {
        self.classified.store
    }
}

/// A final, ordered result handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub title: String,
    /// Canonical absolute URL, never a redirect wrapper.
    pub url: String,
    pub snippet: String,
    pub store: Store,
    pub price: PriceTag,
    pub license: LicenseTag,
    /// Relevance score (documentation mode only).
    pub score: Option<f64>,
}

impl RankedResult {
    pub fn from_annotated(record: AnnotatedRecord, score: Option<f64>) -> Self {
        let AnnotatedRecord {
            classified,
            price,
            license,
        } = record;
        let store = classified.store;
        let ResolvedRecord {
            candidate,
            canonical_url,
        } = classified.resolved;
        Self {
            title: candidate.title,
            url: canonical_url,
            snippet: candidate.snippet,
            store,
            price,
            license,
            score,
        }
    }
}

/// Logical stores (and the documentation site) a page can belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Store {
    /// Unreal Engine Marketplace and Fab: path-segmented product pages.
    Marketplace,
    /// itch.io: one subdomain per creator.
    Itch,
    /// Official engine documentation (documentation mode only).
    Docs,
    /// Anything else. Never reaches the ranker.
    Other,
}

impl Store {
    /// Short lowercase identifier used in query options and API output.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::Marketplace => "marketplace",
            Self::Itch => "itch",
            Self::Docs => "docs",
            Self::Other => "other",
        }
    }

    /// Sort rank in marketplace ordering: primary store first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Marketplace => 0,
            Self::Itch => 1,
            Self::Docs | Self::Other => 2,
        }
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Inferred price tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTag {
    Free,
    Paid,
    Unknown,
}

impl PriceTag {
    /// User-facing label, marked as inferred. `None` for [`PriceTag::Unknown`].
    pub fn inferred_label(&self) -> Option<String> {
        match self {
            Self::Free => Some("free (inferred)".to_owned()),
            Self::Paid => Some("paid (inferred)".to_owned()),
            Self::Unknown => None,
        }
    }

    /// Free sorts before everything else.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Free => 0,
            Self::Paid | Self::Unknown => 1,
        }
    }
}

/// Inferred license tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseTag {
    Cc0,
    Mit,
    Gpl,
    CommercialUse,
    Unknown,
}

impl LicenseTag {
    /// Display name, empty for [`LicenseTag::Unknown`].
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cc0 => "CC0",
            Self::Mit => "MIT",
            Self::Gpl => "GPL",
            Self::CommercialUse => "Commercial use",
            Self::Unknown => "",
        }
    }

    /// User-facing label, marked as inferred. `None` for [`LicenseTag::Unknown`].
    pub fn inferred_label(&self) -> Option<String> {
        match self {
            Self::Unknown => None,
            known => Some(format!("{} (inferred)", known.name())),
        }
    }

    /// Case-insensitive substring match against the tag's name.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name().to_lowercase().contains(&needle)
    }
}

/// Which stores a query is restricted to (`only` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreScope {
    #[default]
    All,
    Marketplace,
    Itch,
}

impl StoreScope {
    pub fn admits(&self, store: Store) -> bool {
        match self {
            Self::All => true,
            Self::Marketplace => store == Store::Marketplace,
            Self::Itch => store == Store::Itch,
        }
    }

    /// Stores to query for this scope, in primary-first order.
    pub fn stores(&self) -> &'static [Store] {
        match self {
            Self::All => &[Store::Marketplace, Store::Itch],
            Self::Marketplace => &[Store::Marketplace],
            Self::Itch => &[Store::Itch],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Marketplace => "marketplace",
            Self::Itch => "itch",
        }
    }
}

impl FromStr for StoreScope {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "marketplace" | "fab" | "unreal" => Ok(Self::Marketplace),
            "itch" | "itch.io" | "itchio" => Ok(Self::Itch),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown store scope '{other}' (expected all, marketplace or itch)"
            ))),
        }
    }
}

/// Price filter (`price` option).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceFilter {
    #[default]
    Any,
    Free,
    Paid,
}

impl PriceFilter {
    /// `free` keeps only Free-tagged records; `paid` keeps everything else.
    pub fn admits(&self, price: PriceTag) -> bool {
        match self {
            Self::Any => true,
            Self::Free => price == PriceTag::Free,
            Self::Paid => price != PriceTag::Free,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }
}

impl FromStr for PriceFilter {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "any" => Ok(Self::Any),
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown price filter '{other}' (expected free, paid or any)"
            ))),
        }
    }
}

/// A user search: terms plus scoped options. Never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SearchQuery {
    pub text: String,
    /// Extra keyword appended to the terms (e.g. `"animation"`).
    pub kind: Option<String>,
    pub only: StoreScope,
    pub price: PriceFilter,
    /// Case-insensitive license substring filter.
    pub license: Option<String>,
}

impl SearchQuery {
    /// Build a query with default options.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] if the trimmed text is shorter
    /// than [`MIN_QUERY_CHARS`].
    pub fn new(text: &str) -> Result<Self, SearchError> {
        let query = Self {
            text: text.trim().to_owned(),
            kind: None,
            only: StoreScope::All,
            price: PriceFilter::Any,
            license: None,
        };
        query.validate()?;
        Ok(query)
    }

    pub fn with_kind(mut self, kind: &str) -> Self {
        let kind = kind.trim();
        self.kind = (!kind.is_empty()).then(|| kind.to_owned());
        self
    }

    pub fn with_scope(mut self, only: StoreScope) -> Self {
        self.only = only;
        self
    }

    pub fn with_price(mut self, price: PriceFilter) -> Self {
        self.price = price;
        self
    }

    pub fn with_license(mut self, license: &str) -> Self {
        let license = license.trim();
        self.license = (!license.is_empty()).then(|| license.to_owned());
        self
    }

    /// Checks the text length invariant.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::InvalidQuery`] when `text` is too short.
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.text.trim().chars().count() < MIN_QUERY_CHARS {
            return Err(SearchError::InvalidQuery(format!(
                "q must be at least {MIN_QUERY_CHARS} characters"
            )));
        }
        Ok(())
    }

    /// The text plus `kind`, as one search string.
    pub fn full_text(&self) -> String {
        match &self.kind {
            Some(kind) => format!("{} {kind}", self.text),
            None => self.text.clone(),
        }
    }

    /// Lowercased, whitespace-split terms of the text and kind.
    pub fn terms(&self) -> Vec<String> {
        self.full_text()
            .split_whitespace()
            .map(str::to_lowercase)
            .collect()
    }

    /// Web search string scoped to a site.
    pub fn site_query(&self, site: &str) -> String {
        format!("site:{site} {}", self.full_text())
    }
}

/// Where a batch of candidates came from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    /// The source answered and its payload was extracted.
    Collected {
        /// Human-readable source label, e.g. `"web:itch"`.
        source: String,
        /// URL of the page the candidates were extracted from; relative
        /// hrefs resolve against it.
        base_url: String,
        candidates: Vec<CandidateRecord>,
        /// `true` when the primary attempt produced nothing and the fallback
        /// endpoint supplied these candidates.
        used_fallback: bool,
    },
    /// The source failed. Recorded, never fatal.
    Degraded { source: String, error: SearchError },
}

impl SourceOutcome {
    pub fn source(&self) -> &str {
        match self {
            Self::Collected { source, .. } | Self::Degraded { source, .. } => source,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn candidate_count(&self) -> usize {
        match self {
            Self::Collected { candidates, .. } => candidates.len(),
            Self::Degraded { .. } => 0,
        }
    }
}

/// Final results together with the per-source outcomes that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReport {
    pub results: Vec<RankedResult>,
    pub outcomes: Vec<SourceOutcome>,
    /// `true` when the results came from the in-memory cache.
    pub cached: bool,
}

impl SearchReport {
    pub fn degraded_sources(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.is_degraded())
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
