//! Statute data model shared by ingestion and retrieval.

use serde::{Deserialize, Serialize};

use crate::abbrev::AbbreviationMap;
use crate::article;

/// Category of a statute, derived from its name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LawCategory {
    /// Primary act (법률).
    #[default]
    Act,
    /// Implementing decree (시행령).
    Decree,
    /// Implementing rule (시행규칙).
    Rule,
}

impl LawCategory {
    pub fn from_law_name(law_name: &str) -> Self {
        if law_name.contains("시행규칙") {
            Self::Rule
        } else if law_name.contains("시행령") {
            Self::Decree
        } else {
            Self::Act
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Act => "act",
            Self::Decree => "decree",
            Self::Rule => "rule",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "act" => Some(Self::Act),
            "decree" => Some(Self::Decree),
            "rule" => Some(Self::Rule),
            _ => None,
        }
    }
}

/// Kind of a citation, without its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Internal,
    External,
    Parent,
}

impl RefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::External => "external",
            Self::Parent => "parent",
        }
    }
}

/// Target law of a citation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ref_type", rename_all = "lowercase")]
pub enum RefTarget {
    /// Another article of the citing chunk's own law.
    Internal,
    /// An article of a different, explicitly named law.
    External { law_name: String },
    /// An article of the parent act, cited from a decree as "법 제N조".
    Parent { law_name: String },
}

/// A single citation occurrence. Created during parsing, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(flatten)]
    pub target: RefTarget,
    /// Article number, possibly with a branch suffix ("2의1").
    pub article: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<String>,
    /// 호 number, or the 목 marker when no 호 is cited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    /// Matched citation text, kept for audit and relevance judgment.
    #[serde(default)]
    pub raw: String,
}

/// Identity of a reference within one chunk's reference list.
pub type RefIdentity<'a> = (
    RefKind,
    Option<&'a str>,
    &'a str,
    Option<&'a str>,
    Option<&'a str>,
);

impl Reference {
    pub fn kind(&self) -> RefKind {
        match self.target {
            RefTarget::Internal => RefKind::Internal,
            RefTarget::External { .. } => RefKind::External,
            RefTarget::Parent { .. } => RefKind::Parent,
        }
    }

    /// Named target law; `None` for internal references.
    pub fn law_name(&self) -> Option<&str> {
        match &self.target {
            RefTarget::Internal => None,
            RefTarget::External { law_name } | RefTarget::Parent { law_name } => Some(law_name),
        }
    }

    pub fn identity(&self) -> RefIdentity<'_> {
        (
            self.kind(),
            self.law_name(),
            &self.article,
            self.paragraph.as_deref(),
            self.item.as_deref(),
        )
    }
}

/// Lowest level of an article: 목.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub num: String,
    pub content: String,
}

/// Middle level of an article: 호.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubItem {
    pub num: String,
    pub content: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

/// Top level of an article: 항.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub num: String,
    pub content: String,
    #[serde(default)]
    pub subs: Vec<SubItem>,
}

/// One statute article.
///
/// `content_resolved` is always derived from `content` and `abbreviations`
/// by [`crate::abbrev::resolve_chunk`]; it is never edited by hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleChunk {
    pub law_name: String,
    pub law_id: String,
    pub law_category: LawCategory,
    pub article_num: String,
    #[serde(default)]
    pub article_sub: Option<String>,
    pub article_title: String,
    /// Flat concatenated body text as published.
    pub content: String,
    #[serde(default)]
    pub content_resolved: String,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
    #[serde(default)]
    pub internal_refs: Vec<Reference>,
    #[serde(default)]
    pub external_refs: Vec<Reference>,
    #[serde(default)]
    pub parent_refs: Vec<Reference>,
    #[serde(default)]
    pub abbreviations: AbbreviationMap,
    #[serde(default)]
    pub effective_date: String,
    #[serde(default)]
    pub change_type: String,
}

impl ArticleChunk {
    /// Build a chunk with its category derived from the law name.
    pub fn new(
        law_name: impl Into<String>,
        law_id: impl Into<String>,
        article_num: impl Into<String>,
        article_title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let law_name = law_name.into();
        Self {
            law_category: LawCategory::from_law_name(&law_name),
            law_name,
            law_id: law_id.into(),
            article_num: article_num.into(),
            article_title: article_title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Composite evidence key (`001823:46:0`).
    pub fn chunk_key(&self) -> String {
        article::chunk_key(&self.law_id, &self.article_num, self.article_sub.as_deref())
    }

    /// Key of this chunk's abbreviation map (`1823:46`).
    pub fn abbr_key(&self) -> String {
        article::abbr_key(&self.law_id, &self.article_num)
    }

    /// Text handed to the index: resolved text when available.
    pub fn indexed_text(&self) -> &str {
        if self.content_resolved.is_empty() {
            &self.content
        } else {
            &self.content_resolved
        }
    }

    pub fn meta(&self) -> ChunkMeta {
        ChunkMeta {
            law_id: self.law_id.clone(),
            law_name: self.law_name.clone(),
            law_category: self.law_category,
            article_num: self.article_num.clone(),
            article_sub: self.article_sub.clone(),
            article_title: self.article_title.clone(),
            internal_refs: self.internal_refs.clone(),
            external_refs: self.external_refs.clone(),
            parent_refs: self.parent_refs.clone(),
        }
    }

    pub fn to_passage(&self) -> Passage {
        Passage {
            content: self.indexed_text().to_string(),
            meta: self.meta(),
        }
    }
}

/// Metadata carried alongside each indexed chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub law_id: String,
    pub law_name: String,
    #[serde(default)]
    pub law_category: LawCategory,
    pub article_num: String,
    #[serde(default)]
    pub article_sub: Option<String>,
    #[serde(default)]
    pub article_title: String,
    #[serde(default)]
    pub internal_refs: Vec<Reference>,
    #[serde(default)]
    pub external_refs: Vec<Reference>,
    #[serde(default)]
    pub parent_refs: Vec<Reference>,
}

impl ChunkMeta {
    pub fn chunk_key(&self) -> String {
        article::chunk_key(&self.law_id, &self.article_num, self.article_sub.as_deref())
    }

    /// "46", or "2의1" for a branch article.
    pub fn article_label(&self) -> String {
        article::article_label(&self.article_num, self.article_sub.as_deref())
    }

    pub fn padded_law_id(&self) -> String {
        article::pad_law_id(&self.law_id)
    }
}

/// A chunk as returned by the index: text plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub content: String,
    pub meta: ChunkMeta,
}

impl Passage {
    pub fn chunk_key(&self) -> String {
        self.meta.chunk_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn internal(article: &str) -> Reference {
        Reference {
            target: RefTarget::Internal,
            article: article.into(),
            paragraph: Some("1".into()),
            item: None,
            raw: format!("제{article}조제1항"),
        }
    }

    #[test]
    fn category_from_name() {
        assert_eq!(LawCategory::from_law_name("건축법"), LawCategory::Act);
        assert_eq!(
            LawCategory::from_law_name("건축법 시행령"),
            LawCategory::Decree
        );
        assert_eq!(
            LawCategory::from_law_name("건축법 시행규칙"),
            LawCategory::Rule
        );
        assert_eq!(LawCategory::parse("decree"), Some(LawCategory::Decree));
        assert_eq!(LawCategory::parse("unknown"), None);
    }

    #[test]
    fn reference_serializes_with_kind_tag() {
        let json = serde_json::to_value(internal("2")).unwrap();
        assert_eq!(json["ref_type"], "internal");
        assert_eq!(json["article"], "2");
        assert!(json.get("law_name").is_none());
        assert!(json.get("item").is_none());

        let ext = Reference {
            target: RefTarget::External {
                law_name: "주차장법".into(),
            },
            article: "19".into(),
            paragraph: None,
            item: None,
            raw: "「주차장법」 제19조".into(),
        };
        let json = serde_json::to_value(&ext).unwrap();
        assert_eq!(json["ref_type"], "external");
        assert_eq!(json["law_name"], "주차장법");
    }

    #[test]
    fn reference_parses_from_payload() {
        let r: Reference = serde_json::from_str(
            r#"{"ref_type":"parent","law_name":"건축법","article":"46","paragraph":"1","raw":"법 제46조제1항"}"#,
        )
        .unwrap();
        assert_eq!(r.kind(), RefKind::Parent);
        assert_eq!(r.law_name(), Some("건축법"));
        assert_eq!(r.paragraph.as_deref(), Some("1"));
        assert_eq!(r.item, None);
    }

    #[test]
    fn identity_ignores_raw_text() {
        let a = internal("2");
        let mut b = internal("2");
        b.raw = "제2조 제1항".into();
        assert_eq!(a.identity(), b.identity());
        assert_ne!(a.identity(), internal("3").identity());
    }

    #[test]
    fn chunk_keys_and_passage() {
        let mut chunk = ArticleChunk::new("건축법", "1823", "46", "건축선의 지정", "원문");
        assert_eq!(chunk.law_category, LawCategory::Act);
        assert_eq!(chunk.chunk_key(), "001823:46:0");
        assert_eq!(chunk.abbr_key(), "1823:46");
        assert_eq!(chunk.to_passage().content, "원문");

        chunk.content_resolved = "치환문".into();
        chunk.article_sub = Some("2".into());
        let passage = chunk.to_passage();
        assert_eq!(passage.content, "치환문");
        assert_eq!(passage.chunk_key(), "001823:46:2");
        assert_eq!(passage.meta.padded_law_id(), "001823");
    }
}
