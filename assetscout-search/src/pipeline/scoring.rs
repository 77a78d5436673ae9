//! Documentation relevance scoring.
//!
//! Assigns scores based on:
//! - Query-term hits in the title and URL
//! - A bonus for domain keywords among the hit terms
//! - Path adjustments that lift authoritative documentation above forum and
//!   storefront pages
//!
//! Formula: `score = Σ(term_weight + keyword_bonus?) + Σ(path deltas)`.
//! Path deltas only apply when at least one term hit, so a page that does
//! not mention the query is never promoted by its location alone.

use serde::{Deserialize, Serialize};

/// A signed score adjustment for URLs containing `pattern`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathAdjustment {
    /// Case-insensitive substring of the canonical URL.
    pub pattern: String,
    pub delta: f64,
}

impl PathAdjustment {
    pub fn new(pattern: &str, delta: f64) -> Self {
        Self {
            pattern: pattern.to_owned(),
            delta,
        }
    }
}

/// Relevance weights. Only their relative order is meaningful.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Added per query term found in `title + url`.
    pub term_weight: f64,
    /// Added on top of `term_weight` when the found term is a keyword.
    pub keyword_bonus: f64,
    pub keywords: Vec<String>,
    pub adjustments: Vec<PathAdjustment>,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            term_weight: 2.0,
            keyword_bonus: 1.0,
            keywords: vec!["blueprint".into(), "blueprints".into()],
            adjustments: vec![
                PathAdjustment::new("dev.epicgames.com/documentation", 3.0),
                PathAdjustment::new("docs.unrealengine.com", 2.0),
                PathAdjustment::new("forums.unrealengine.com", -3.0),
                PathAdjustment::new("/marketplace/", -2.0),
            ],
        }
    }
}

/// Score one page against the query terms.
///
/// `terms` are expected lowercased; duplicates count once.
pub fn relevance_score(title: &str, url: &str, terms: &[String], weights: &ScoreWeights) -> f64 {
    let haystack = format!("{title} {url}").to_lowercase();

    let mut seen: Vec<&str> = Vec::with_capacity(terms.len());
    let mut score = 0.0;
    for term in terms {
        let term = term.as_str();
        if term.is_empty() || seen.contains(&term) {
            continue;
        }
        seen.push(term);
        if haystack.contains(term) {
            score += weights.term_weight;
            if weights.keywords.iter().any(|k| k.eq_ignore_ascii_case(term)) {
                score += weights.keyword_bonus;
            }
        }
    }

    // Location only re-orders pages that matched the query.
    if score <= 0.0 {
        return score;
    }

    let url = url.to_lowercase();
    score
        + weights
            .adjustments
            .iter()
            .filter(|adj| url.contains(&adj.pattern.to_lowercase()))
            .map(|adj| adj.delta)
            .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(text: &str) -> Vec<String> {
        text.split_whitespace().map(str::to_lowercase).collect()
    }

    const OFFICIAL: &str =
        "https://dev.epicgames.com/documentation/en-us/unreal-engine/blueprint-basics";
    const LEGACY: &str = "https://docs.unrealengine.com/4.27/en-us/blueprints/basics";
    const FORUM: &str = "https://forums.unrealengine.com/t/blueprint-basics-help/123";
    const STOREFRONT: &str =
        "https://www.unrealengine.com/marketplace/en-US/product/blueprint-basics-kit";

    #[test]
    fn term_and_keyword_weights() {
        let w = ScoreWeights::default();
        // "basics" in title+url: 2. No path adjustment on this host.
        let score = relevance_score("Basics", "https://other.test/x", &terms("basics"), &w);
        assert!((score - 2.0).abs() < f64::EPSILON);

        // "blueprint" is a keyword: 2 + 1.
        let score = relevance_score("Blueprint", "https://other.test/x", &terms("blueprint"), &w);
        assert!((score - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn authoritative_docs_outrank_forum_and_storefront() {
        let w = ScoreWeights::default();
        let q = terms("blueprint basics");
        let official = relevance_score("Blueprint Basics", OFFICIAL, &q, &w);
        let legacy = relevance_score("Blueprint Basics", LEGACY, &q, &w);
        let forum = relevance_score("Blueprint Basics Help", FORUM, &q, &w);
        let store = relevance_score("Blueprint Basics Kit", STOREFRONT, &q, &w);

        assert!(official > legacy);
        assert!(legacy > forum);
        assert!(official > store);
        assert!(forum > 0.0);
    }

    #[test]
    fn no_hits_means_no_adjustment() {
        let w = ScoreWeights::default();
        let url = OFFICIAL.replace("blueprint-basics", "niagara");
        let score = relevance_score("Niagara Overview", &url, &terms("landscape"), &w);
        assert!(score.abs() < f64::EPSILON);
    }

    #[test]
    fn path_adjustments_skip_pages_without_a_term_hit() {
        let w = ScoreWeights::default();
        let forum = "https://forums.unrealengine.com/t/niagara-help/42";
        let official = relevance_score("Niagara Overview", OFFICIAL, &terms("landscape"), &w);
        let penalised = relevance_score("Niagara help", forum, &terms("landscape"), &w);
        assert!(official.abs() < f64::EPSILON);
        assert!(penalised.abs() < f64::EPSILON);
    }

    #[test]
    fn penalties_can_push_below_zero() {
        let w = ScoreWeights::default();
        let url = "https://forums.unrealengine.com/t/thread";
        let score = relevance_score("Thread", url, &terms("thread"), &w);
        assert!(score < 0.0);
    }

    #[test]
    fn duplicate_terms_count_once() {
        let w = ScoreWeights::default();
        let once = relevance_score("Basics", "https://other.test/", &terms("basics"), &w);
        let twice = relevance_score("Basics", "https://other.test/", &terms("basics basics"), &w);
        assert!((once - twice).abs() < f64::EPSILON);
    }

    #[test]
    fn weights_deserialize_with_defaults() {
        let w: ScoreWeights = serde_json::from_str(r#"{"term_weight": 5.0}"#).expect("deserialize");
        assert!((w.term_weight - 5.0).abs() < f64::EPSILON);
        assert_eq!(w.keywords, ScoreWeights::default().keywords);
        assert_eq!(w.adjustments.len(), 4);
    }
}
