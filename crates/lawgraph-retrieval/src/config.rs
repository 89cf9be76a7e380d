//! Retrieval tuning and target keyword detection.

use serde::{Deserialize, Serialize};

/// Knobs for one controller. Missing fields in a config file take defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Evidence set size after zero-hop retrieval.
    pub k: usize,
    /// Upper bound on references fetched in the expansion round.
    pub max_ref_expand: usize,
    /// Hop budget of the reference-tracking mode.
    pub max_hops: usize,
    /// Floor for the per-query `k` of zero-hop seed searches.
    pub min_per_query_k: usize,
    /// Evidence chunks shown to the answerability judge.
    pub evidence_excerpts: usize,
    pub excerpt_chars: usize,
    /// Length of the citing-chunk preview attached to each candidate.
    pub preview_chars: usize,
    /// Chunks taken from a law when a citation names the law only.
    pub whole_law_k: usize,
    /// Appended to the query for backfill searches, in order.
    pub backfill_suffixes: Vec<String>,
    /// Building-use taxonomy terms reported per query.
    pub appendix_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: 5,
            max_ref_expand: 4,
            max_hops: 3,
            min_per_query_k: 4,
            evidence_excerpts: 5,
            excerpt_chars: 280,
            preview_chars: 900,
            whole_law_k: 2,
            backfill_suffixes: vec!["건축법".into(), "건축법 시행령".into()],
            appendix_top_k: 3,
        }
    }
}

/// Target keyword → trigger terms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetLexicon {
    pub targets: Vec<(String, Vec<String>)>,
    /// Returned when no target fires.
    pub generic: String,
}

impl Default for TargetLexicon {
    fn default() -> Self {
        let entry = |target: &str, terms: &[&str]| {
            (
                target.to_string(),
                terms.iter().map(|t| t.to_string()).collect(),
            )
        };
        Self {
            targets: vec![
                entry("건축선", &["건축선", "도로경계", "후퇴선"]),
                entry("건폐율", &["건폐율", "건축면적"]),
                entry("용적률", &["용적률", "연면적"]),
                entry("주차", &["주차", "주차대수", "주차장"]),
            ],
            generic: lawgraph_ai::judge::GENERIC_TARGET.into(),
        }
    }
}

impl TargetLexicon {
    /// Targets whose trigger terms occur in `query`, in lexicon order, or
    /// the generic target alone.
    pub fn detect(&self, query: &str) -> Vec<String> {
        let found: Vec<String> = self
            .targets
            .iter()
            .filter(|(_, terms)| terms.iter().any(|t| query.contains(t.as_str())))
            .map(|(target, _)| target.clone())
            .collect();
        if found.is_empty() {
            vec![self.generic.clone()]
        } else {
            found
        }
    }
}
