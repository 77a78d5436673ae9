//! Result deduplication by canonical URL.
//!
//! Unlike a score-merging dedup, ranking here happens after dedup, so the
//! first occurrence of a canonical URL wins and discovery order is kept.
//! Discovery order is what docs relevance uses to break ties.

use std::collections::HashSet;

use crate::types::AnnotatedRecord;

/// Drop every record whose canonical URL was already seen.
pub fn deduplicate(records: Vec<AnnotatedRecord>) -> Vec<AnnotatedRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|record| seen.insert(record.canonical_url().to_owned()))
        .collect()
}
