//! Merge, filter, dedup, rank and truncate annotated records.
//!
//! The step order is fixed: store filter, price filter, license filter,
//! dedup, sort, truncate. Filtering before dedup means a filtered-out first
//! occurrence cannot shadow an admissible later one.

use std::cmp::Ordering;

use super::dedup::deduplicate;
use super::scoring::{relevance_score, ScoreWeights};
use crate::error::SearchError;
use crate::types::{AnnotatedRecord, PriceFilter, RankedResult, SearchQuery, StoreScope};

/// Post-classification filters taken from the query options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub only: StoreScope,
    pub price: PriceFilter,
    pub license: Option<String>,
}

impl Filters {
    pub fn from_query(query: &SearchQuery) -> Self {
        Self {
            only: query.only,
            price: query.price,
            license: query.license.clone(),
        }
    }

    fn admits(&self, record: &AnnotatedRecord) -> bool {
        self.only.admits(record.store())
            && self.price.admits(record.price)
            && self
                .license
                .as_deref()
                .map_or(true, |needle| record.license.matches(needle))
    }
}

/// How surviving records are ordered.
#[derive(Debug, Clone, Copy)]
pub enum RankOrder<'a> {
    /// Store rank, then free before the rest, then title. No scores.
    Marketplace,
    /// Descending relevance score; ties keep discovery order. Records that
    /// score zero or below are dropped.
    Relevance {
        terms: &'a [String],
        weights: &'a ScoreWeights,
    },
}

/// Run the aggregation steps over records in discovery order.
///
/// # Errors
///
/// Returns [`SearchError::Pipeline`] if a relevance score is not a finite
/// number, which only misconfigured weights can cause.
pub fn aggregate(
    records: Vec<AnnotatedRecord>,
    filters: &Filters,
    order: RankOrder<'_>,
    max_results: usize,
) -> Result<Vec<RankedResult>, SearchError> {
    let total = records.len();
    let filtered: Vec<AnnotatedRecord> =
        records.into_iter().filter(|r| filters.admits(r)).collect();
    let after_filter = filtered.len();
    let unique = deduplicate(filtered);

    tracing::debug!(
        total,
        after_filter,
        unique = unique.len(),
        "aggregating records"
    );

    let mut ranked = match order {
        RankOrder::Marketplace => rank_marketplace(unique),
        RankOrder::Relevance { terms, weights } => rank_relevance(unique, terms, weights)?,
    };
    ranked.truncate(max_results);
    Ok(ranked)
}

fn rank_marketplace(mut records: Vec<AnnotatedRecord>) -> Vec<RankedResult> {
    // Stable, so equal keys keep discovery order.
    records.sort_by_cached_key(|r| {
        (
            r.store().rank(),
            r.price.rank(),
            r.title().to_lowercase(),
        )
    });
    records
        .into_iter()
        .map(|r| RankedResult::from_annotated(r, None))
        .collect()
}

fn rank_relevance(
    records: Vec<AnnotatedRecord>,
    terms: &[String],
    weights: &ScoreWeights,
) -> Result<Vec<RankedResult>, SearchError> {
    let mut scored: Vec<(f64, AnnotatedRecord)> = Vec::with_capacity(records.len());
    for record in records {
        let score = relevance_score(record.title(), record.canonical_url(), terms, weights);
        if !score.is_finite() {
            return Err(SearchError::Pipeline(format!(
                "relevance score for {} is not finite",
                record.canonical_url()
            )));
        }
        if score > 0.0 {
            scored.push((score, record));
        }
    }

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    Ok(scored
        .into_iter()
        .map(|(score, r)| RankedResult::from_annotated(r, Some(score)))
        .collect())
}
