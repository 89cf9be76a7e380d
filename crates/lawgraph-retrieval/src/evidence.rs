//! Evidence assembler: citation records for the generation step.

use lawgraph_core::article::{section_label, sub_or_zero};
use lawgraph_core::{Passage, Reference};
use serde::{Deserialize, Serialize};

use crate::preview;

/// Characters of normalised text in [`Citation::content_preview`].
pub const CONTENT_PREVIEW_CHARS: usize = 320;

/// Display name used when a passage carries no law name.
const FALLBACK_DOCUMENT_NAME: &str = "법령";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub chunk_key: String,
    pub document_name: String,
    /// "제46조 건축선의 지정", "제2조의1 정의".
    pub section: String,
    pub law_id: String,
    pub law_name: String,
    pub article_num: String,
    pub article_sub: String,
    pub article_title: String,
    pub content_preview: String,
    pub full_text: String,
    pub internal_refs: Vec<Reference>,
    pub external_refs: Vec<Reference>,
}

impl Citation {
    pub fn from_passage(passage: &Passage) -> Self {
        let meta = &passage.meta;
        let document_name = if meta.law_name.is_empty() {
            FALLBACK_DOCUMENT_NAME.to_string()
        } else {
            meta.law_name.clone()
        };
        Self {
            chunk_key: passage.chunk_key(),
            document_name,
            section: section_label(
                &meta.article_num,
                meta.article_sub.as_deref(),
                &meta.article_title,
            ),
            law_id: meta.law_id.clone(),
            law_name: meta.law_name.clone(),
            article_num: meta.article_num.clone(),
            article_sub: sub_or_zero(meta.article_sub.as_deref()).to_string(),
            article_title: meta.article_title.clone(),
            content_preview: preview(&passage.content, CONTENT_PREVIEW_CHARS),
            full_text: passage.content.clone(),
            internal_refs: meta.internal_refs.clone(),
            external_refs: meta.external_refs.clone(),
        }
    }
}

/// One citation per passage, in evidence order.
pub fn assemble_citations(passages: &[Passage]) -> Vec<Citation> {
    passages.iter().map(Citation::from_passage).collect()
}
