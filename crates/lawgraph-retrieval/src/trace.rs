//! Per-query diagnostic record.

use serde::{Deserialize, Serialize};

/// One follow decision, in candidate rank order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCheck {
    pub ref_key: String,
    pub follow: bool,
    pub priority: u8,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalTrace {
    pub precheck_answerable: bool,
    pub precheck_reason: String,
    pub candidates_total: usize,
    pub candidates_followed: usize,
    pub expanded_ref_count: usize,
    pub follow_checks: Vec<FollowCheck>,
    /// `skip_ref: <reason>`, `no_ref_candidates`,
    /// `no_followed_ref_candidates` or `expanded_ref_count=<n>`.
    pub expand_reason: String,
    pub base_contexts_count: usize,
    pub final_contexts_count: usize,
}
