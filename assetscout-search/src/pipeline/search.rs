//! Query orchestration: retrieval fan-out, then the synchronous stages.
//!
//! # Pipeline
//!
//! 1. Retrieve every source for the mode concurrently
//! 2. Log degraded sources at warn level; keep collected candidates in
//!    source order
//! 3. Canonicalise each candidate against the page it came from
//! 4. Classify and drop anything that is not an admissible page
//! 5. Tag price and license
//! 6. Filter, dedup, rank and truncate

use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::fetch::Fetch;
use crate::types::{
    AnnotatedRecord, ClassifiedRecord, ResolvedRecord, SearchQuery, SearchReport, SourceOutcome,
};

use super::aggregate::{aggregate, Filters, RankOrder};
use super::canonical::canonicalize;
use super::classify::StoreRules;
use super::retrieval::Retriever;
use super::tagger::AttributeTagger;

/// Multi-store asset search through `fetcher`.
///
/// Results are in marketplace order and carry no score.
///
/// # Errors
///
/// Returns [`SearchError::InvalidQuery`] for a query that fails validation
/// and [`SearchError::Config`] if the tag rules do not compile. Source
/// failures never surface here; see [`SearchReport::outcomes`].
pub async fn search_assets_with<F: Fetch>(
    fetcher: &F,
    query: &SearchQuery,
    config: &SearchConfig,
) -> Result<SearchReport, SearchError> {
    query.validate()?;
    let tagger = AttributeTagger::new()?;
    tracing::debug!(query = %query.full_text(), scope = query.only.name(), "asset search");

    let outcomes = Retriever::new(fetcher, config).assets(query).await;
    log_retrieval(&outcomes);
    let records = annotate(&outcomes, &StoreRules::assets(), &tagger);
    let results = aggregate(
        records,
        &Filters::from_query(query),
        RankOrder::Marketplace,
        config.max_results,
    )?;

    Ok(SearchReport {
        results,
        outcomes,
        cached: false,
    })
}

/// Documentation search over the configured sitemap.
///
/// Results carry a relevance score and are sorted by it. Store, price and
/// license options of `query` do not apply to documentation pages.
///
/// # Errors
///
/// Same as [`search_assets_with`], plus [`SearchError::Pipeline`] when the
/// configured weights produce a non-finite score.
pub async fn search_docs_with<F: Fetch>(
    fetcher: &F,
    query: &SearchQuery,
    config: &SearchConfig,
) -> Result<SearchReport, SearchError> {
    query.validate()?;
    let tagger = AttributeTagger::new()?;
    tracing::debug!(query = %query.full_text(), "docs search");

    let outcomes = Retriever::new(fetcher, config).sitemap().await;
    log_retrieval(&outcomes);
    let records = annotate(&outcomes, &StoreRules::docs(), &tagger);
    let terms = query.terms();
    let order = RankOrder::Relevance {
        terms: &terms,
        weights: &config.weights,
    };
    let results = aggregate(records, &Filters::default(), order, config.max_results)?;

    Ok(SearchReport {
        results,
        outcomes,
        cached: false,
    })
}

fn log_retrieval(outcomes: &[SourceOutcome]) {
    tracing::debug!(
        sources = outcomes.len(),
        degraded = outcomes.iter().filter(|o| o.is_degraded()).count(),
        candidates = outcomes.iter().map(SourceOutcome::candidate_count).sum::<usize>(),
        "retrieval complete"
    );
}

/// Canonicalise, classify and tag every collected candidate, in source
/// order then document order.
fn annotate(
    outcomes: &[SourceOutcome],
    rules: &StoreRules,
    tagger: &AttributeTagger,
) -> Vec<AnnotatedRecord> {
    let mut records = Vec::new();

    for outcome in outcomes {
        let (source, base_url, candidates) = match outcome {
            SourceOutcome::Collected {
                source,
                base_url,
                candidates,
                used_fallback,
            } => {
                tracing::debug!(
                    source = %source,
                    count = candidates.len(),
                    used_fallback,
                    "source collected"
                );
                (source, base_url, candidates)
            }
            SourceOutcome::Degraded { source, error } => {
                tracing::warn!(source = %source, error = %error, "source degraded");
                continue;
            }
        };

        let before = records.len();
        for candidate in candidates {
            let Some(canonical_url) = canonicalize(&candidate.raw_url, base_url) else {
                tracing::trace!(raw = %candidate.raw_url, "dropping uncanonicalisable link");
                continue;
            };

            let classification = rules.classify(&canonical_url);
            let classified = ClassifiedRecord {
                resolved: ResolvedRecord {
                    candidate: candidate.clone(),
                    canonical_url,
                },
                store: classification.store,
                is_page_like: classification.is_page_like,
            };
            if !classified.is_admissible() {
                continue;
            }

            let (price, license) = tagger.tag(&candidate.title, &candidate.snippet);
            records.push(AnnotatedRecord {
                classified,
                price,
                license,
            });
        }
        tracing::trace!(
            source = %source,
            admitted = records.len() - before,
            "candidates classified"
        );
    }

    records
}
