//! Retrieval over the statute reference graph: zero-hop search, an
//! answerability check, and a single bounded round of reference expansion.

mod error;
pub use error::RetrievalError;

pub mod candidate;
pub mod config;
pub mod controller;
pub mod evidence;
pub mod graph;
pub mod trace;
pub mod tracker;

pub use candidate::{CandidateSource, RefCandidate};
pub use config::{RetrievalConfig, TargetLexicon};
pub use controller::{ResolveResult, RetrievalController};
pub use evidence::Citation;
pub use graph::ReferenceGraph;
pub use trace::{FollowCheck, RetrievalTrace};
pub use tracker::{ReferenceTracker, TrackResult};

/// Collapse runs of whitespace to one space and trim.
pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First `max_chars` characters of the whitespace-normalised text.
pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    normalize_ws(s).chars().take(max_chars).collect()
}
