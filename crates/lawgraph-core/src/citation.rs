//! Citation parser: typed references from article text.
//!
//! Two passes over each article:
//!
//! 1. Quoted external citations ("「법령명」 제N조제M항제K호") are matched on
//!    the full text. Their spans are then excised.
//! 2. Internal citations ("제N조...") are scanned on the excised text only.
//!    External spans are excised before internal scanning; reordering the
//!    passes double-counts every external citation as an internal one.
//!
//! Parent citations ("법 제N조") are scanned on the full text, and only for
//! implementing decrees. A pattern that does not fire is absence of a
//! citation, never an error.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

use crate::catalog::LawCatalog;
use crate::model::{ArticleChunk, LawCategory, RefTarget, Reference};

static EXTERNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"「(?<law>[^」]+)」\s*제(?<art>\d+(?:의\d+)?)조(?:의(?<branch>\d+))?(?:\s*제(?<para>\d+)항)?(?:\s*제(?<ho>\d+)호)?",
    )
    .expect("external citation pattern")
});

static INTERNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"제(?<art>\d+(?:의\d+)?)조(?:의(?<branch>\d+))?(?:제(?<para>\d+)항)?(?:제(?<ho>\d+)호)?(?:제(?<mok>[가-힣A-Za-z0-9]+)목)?",
    )
    .expect("internal citation pattern")
});

static PARENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"법\s*제(?<art>\d+(?:의\d+)?)조(?:의(?<branch>\d+))?(?:제(?<para>\d+)항)?(?:제(?<ho>\d+)호)?",
    )
    .expect("parent citation pattern")
});

/// The three reference lists of one article, each deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitationSet {
    pub internal: Vec<Reference>,
    pub external: Vec<Reference>,
    pub parent: Vec<Reference>,
}

/// Parse all citations in `text`.
///
/// `law_name` is the citing law; an external citation naming it is a
/// self-reference and is dropped. `parent_act` is the name parent citations
/// resolve to and is only used when `category` is [`LawCategory::Decree`].
pub fn parse_citations(
    text: &str,
    law_name: &str,
    category: LawCategory,
    parent_act: &str,
) -> CitationSet {
    let mut external = Vec::new();
    for caps in EXTERNAL_RE.captures_iter(text) {
        let cited = caps["law"].trim();
        if cited == law_name.trim() {
            continue;
        }
        external.push(reference(
            RefTarget::External {
                law_name: cited.to_string(),
            },
            &caps,
        ));
    }

    let excised = EXTERNAL_RE.replace_all(text, "");
    let internal = INTERNAL_RE
        .captures_iter(&excised)
        .map(|caps| reference(RefTarget::Internal, &caps))
        .collect();

    let mut parent = Vec::new();
    if category == LawCategory::Decree {
        let mut start = 0;
        while let Some(caps) = PARENT_RE.captures_at(text, start) {
            let Some(m) = caps.get(0) else { break };
            if preceded_by_hangul(text, m.start()) {
                start = m.start() + '법'.len_utf8();
                continue;
            }
            parent.push(reference(
                RefTarget::Parent {
                    law_name: parent_act.to_string(),
                },
                &caps,
            ));
            start = m.end();
        }
    }

    CitationSet {
        internal: dedup_refs(internal),
        external: dedup_refs(external),
        parent: dedup_refs(parent),
    }
}

/// Fill the three reference lists of every chunk.
pub fn extract_references(chunks: &mut [ArticleChunk], catalog: &LawCatalog) {
    for chunk in chunks.iter_mut() {
        let parent_act = catalog.parent_act_of(&chunk.law_name);
        let set = parse_citations(
            &chunk.content,
            &chunk.law_name,
            chunk.law_category,
            &parent_act,
        );
        debug!(
            law = %chunk.law_name,
            article = %chunk.article_num,
            internal = set.internal.len(),
            external = set.external.len(),
            parent = set.parent.len(),
            "extracted references"
        );
        chunk.internal_refs = set.internal;
        chunk.external_refs = set.external;
        chunk.parent_refs = set.parent;
    }
}

/// Remove repeated references, keeping the first occurrence of each identity.
pub fn dedup_refs(refs: Vec<Reference>) -> Vec<Reference> {
    let mut out: Vec<Reference> = Vec::with_capacity(refs.len());
    for r in refs {
        if !out.iter().any(|o| o.identity() == r.identity()) {
            out.push(r);
        }
    }
    out
}

fn reference(target: RefTarget, caps: &Captures<'_>) -> Reference {
    let art = &caps["art"];
    let article = match caps.name("branch") {
        Some(b) if !art.contains('의') => format!("{art}의{}", b.as_str()),
        _ => art.to_string(),
    };
    let group = |name: &str| caps.name(name).map(|m| m.as_str().to_string());
    Reference {
        target,
        article,
        paragraph: group("para"),
        item: group("ho").or_else(|| group("mok")),
        raw: caps[0].to_string(),
    }
}

fn preceded_by_hangul(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .next_back()
        .is_some_and(|c| ('가'..='힣').contains(&c))
}
