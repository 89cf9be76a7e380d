//! Reference candidates: citations in the evidence set that could be
//! followed to fetch more articles.

use std::collections::HashSet;
use std::sync::LazyLock;

use lawgraph_ai::CandidateView;
use lawgraph_core::{ArticleNo, LawCatalog, Reference};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::graph::ReferenceGraph;
use crate::preview;

/// A bare "법" citing the primary act.
static BARE_ACT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b법\b|법\s*제\d+").expect("bare act pattern"));

/// Placeholder article in the ref key of a whole-law candidate.
pub const WHOLE_LAW: &str = "__law__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateSource {
    Internal,
    External,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefCandidate {
    /// Target law id, zero-padded.
    pub law_id: String,
    /// Target article, or empty for a whole-law citation.
    pub article: String,
    pub source: CandidateSource,
    /// Chunk key of the citing passage.
    pub source_key: String,
    /// Preview of the citing passage.
    pub preview: String,
    pub raw: String,
    pub law_name: String,
}

impl RefCandidate {
    pub fn is_whole_law(&self) -> bool {
        self.article.is_empty()
    }

    /// `<law_id>:<article>`, or `<law_id>:__law__` for whole-law candidates.
    pub fn ref_key(&self) -> String {
        let article: &str = if self.is_whole_law() {
            WHOLE_LAW
        } else {
            &self.article
        };
        format!("{}:{}", self.law_id, article)
    }

    pub fn view<'a>(&'a self, ref_key: &'a str) -> CandidateView<'a> {
        CandidateView {
            ref_key,
            raw: &self.raw,
            preview: &self.preview,
        }
    }
}

/// Target law id of an external citation, or `None` when it cannot be
/// determined.
///
/// Tried in order: catalog lookup of the cited name, a decree token in the
/// citation, a bare "법", "이 법" (the citing law itself).
pub fn resolve_external_law_id(
    reference: &Reference,
    source_law_id: &str,
    catalog: &LawCatalog,
) -> Option<String> {
    if let Some(id) = reference.law_name().and_then(|n| catalog.id_for_name(n)) {
        return Some(id.to_string());
    }
    let raw = reference.raw.as_str();
    if raw.contains("대통령령") || raw.contains("시행령") {
        return Some(catalog.primary_decree_id().to_string());
    }
    if BARE_ACT_RE.is_match(raw) {
        return Some(catalog.primary_act_id().to_string());
    }
    if raw.contains("이 법") {
        return Some(source_law_id.to_string());
    }
    None
}

/// Candidates from every internal and external reference in the graph.
///
/// Duplicates by (law, article, source chunk, kind) are dropped. The result
/// is stably sorted: specific articles before whole-law citations, internal
/// before external.
pub fn extract_candidates(
    graph: &ReferenceGraph,
    catalog: &LawCatalog,
    preview_chars: usize,
) -> Vec<RefCandidate> {
    let mut out = Vec::new();
    let mut seen: HashSet<(String, String, String, CandidateSource)> = HashSet::new();

    for passage in graph.passages() {
        let meta = &passage.meta;
        let source_key = passage.chunk_key();
        let source_law_id = meta.padded_law_id();
        let source_preview = preview(&passage.content, preview_chars);

        let internal = meta
            .internal_refs
            .iter()
            .map(|r| (r, Some(source_law_id.clone()), CandidateSource::Internal));
        let external = meta.external_refs.iter().map(|r| {
            (
                r,
                resolve_external_law_id(r, &source_law_id, catalog),
                CandidateSource::External,
            )
        });

        for (reference, law_id, source) in internal.chain(external) {
            let Some(law_id) = law_id else {
                continue;
            };
            let article = strict_article(&reference.article);
            if !seen.insert((law_id.clone(), article.clone(), source_key.clone(), source)) {
                continue;
            }
            let law_name = match source {
                CandidateSource::Internal => meta.law_name.clone(),
                CandidateSource::External => reference.law_name().unwrap_or_default().to_string(),
            };
            out.push(RefCandidate {
                law_id,
                article,
                source,
                source_key: source_key.clone(),
                preview: source_preview.clone(),
                raw: reference.raw.clone(),
                law_name,
            });
        }
    }

    out.sort_by_key(|c| (c.is_whole_law(), c.source != CandidateSource::Internal));
    out
}

/// Canonical "N" or "N의M", or empty for a whole-law citation.
fn strict_article(article: &str) -> String {
    ArticleNo::parse(article)
        .map(|a| a.to_string())
        .unwrap_or_default()
}
