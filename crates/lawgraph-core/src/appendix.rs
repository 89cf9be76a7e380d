//! Building-use taxonomy of 건축법 시행령 [별표 1].
//!
//! Terms are loaded from a JSON document (`appendix1_terms.json`) and looked
//! up in three tiers: the query inside a category or subcategory name, then
//! an alias match in either direction, then token Jaccard similarity over
//! all term text. Results are unique by (category, subcategory).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoreError;

pub const APPENDIX_FILE: &str = "appendix1_terms.json";
pub const SOURCE_CLAUSE: &str = "건축법 시행령 [별표 1]";
pub const DEFAULT_TOP_K: usize = 5;

/// Optional list marker ("1.", "가.", "-") before a line body.
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.|[가-힣]\.|-)?\s*(.+)$").expect("bullet pattern"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppendixTerm {
    pub category: String,
    pub subcategory: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub source_clause: String,
}

impl AppendixTerm {
    fn key(&self) -> (&str, &str) {
        (&self.category, &self.subcategory)
    }
}

/// On-disk form of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppendixDocument {
    pub source: String,
    pub version: String,
    pub terms: Vec<AppendixTerm>,
}

impl Default for AppendixDocument {
    fn default() -> Self {
        Self {
            source: SOURCE_CLAUSE.into(),
            version: "mvp".into(),
            terms: seed_terms(),
        }
    }
}

impl AppendixDocument {
    /// Seed terms followed by `parsed` terms whose (category, subcategory)
    /// the seed does not already cover.
    pub fn with_parsed(parsed: Vec<AppendixTerm>) -> Self {
        let mut doc = Self::default();
        let mut seen: HashSet<(String, String)> = doc
            .terms
            .iter()
            .map(|t| (t.category.clone(), t.subcategory.clone()))
            .collect();
        for term in parsed {
            if seen.insert((term.category.clone(), term.subcategory.clone())) {
                doc.terms.push(term);
            }
        }
        doc
    }
}

fn seed_terms() -> Vec<AppendixTerm> {
    let term = |category: &str, subcategory: &str, aliases: &[&str], description: &str| AppendixTerm {
        category: category.into(),
        subcategory: subcategory.into(),
        aliases: aliases.iter().map(|a| a.to_string()).collect(),
        description: description.into(),
        source_clause: SOURCE_CLAUSE.into(),
    };
    vec![
        term(
            "문화 및 집회시설",
            "공연장",
            &["문화시설", "집회시설", "공연시설"],
            "공연, 집회, 관람 등 다중 이용 목적의 시설군.",
        ),
        term(
            "문화 및 집회시설",
            "집회장",
            &["전시장", "회의장"],
            "회의, 전시, 행사 등 집회 기능 중심 시설.",
        ),
        term(
            "주거시설",
            "공동주택",
            &["아파트", "연립주택", "다세대주택"],
            "다수 세대의 주거를 위한 건축물.",
        ),
        term(
            "업무시설",
            "일반업무시설",
            &["사무소", "오피스"],
            "사무 및 업무 수행 목적의 시설.",
        ),
    ]
}

/// Terms from the extracted text of the appendix table.
///
/// A short line naming a 시설 opens a category; every following line of at
/// least three characters becomes a term of it. Lines before the first
/// category are ignored.
pub fn extract_terms_from_text(text: &str) -> Vec<AppendixTerm> {
    let mut terms = Vec::new();
    let mut category = String::new();
    for raw in text.lines() {
        let line = raw.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        if line.contains("시설") && line.chars().count() < 40 && !line.starts_with('-') {
            category = line;
            continue;
        }
        let Some(caps) = BULLET_RE.captures(&line) else {
            continue;
        };
        let body = caps[1].to_string();
        if body.chars().count() < 3 || category.is_empty() {
            continue;
        }
        terms.push(AppendixTerm {
            category: category.clone(),
            subcategory: body.chars().take(50).collect(),
            aliases: Vec::new(),
            description: body,
            source_clause: SOURCE_CLAUSE.into(),
        });
    }
    terms
}

#[derive(Debug, Clone, Default)]
pub struct AppendixIndex {
    terms: Vec<AppendixTerm>,
}

impl AppendixIndex {
    pub fn new(terms: Vec<AppendixTerm>) -> Self {
        Self { terms }
    }

    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let doc: AppendixDocument = serde_json::from_str(json)?;
        Ok(Self::new(doc.terms))
    }

    /// The built-in seed taxonomy.
    pub fn seed() -> Self {
        Self::new(seed_terms())
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Up to `top_k` terms: name matches, then alias matches, then fuzzy
    /// matches by decreasing Jaccard score.
    pub fn lookup(&self, query: &str, top_k: usize) -> Vec<&AppendixTerm> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        let query_tokens = tokenize(&query);

        let mut exact = Vec::new();
        let mut alias = Vec::new();
        let mut fuzzy: Vec<(f64, &AppendixTerm)> = Vec::new();
        for term in &self.terms {
            if term.category.to_lowercase().contains(&query)
                || term.subcategory.to_lowercase().contains(&query)
            {
                exact.push(term);
                continue;
            }
            if term.aliases.iter().any(|a| {
                let a = a.to_lowercase();
                a.contains(&query) || query.contains(&a)
            }) {
                alias.push(term);
                continue;
            }
            let text = format!(
                "{} {} {} {}",
                term.category,
                term.subcategory,
                term.aliases.join(" "),
                term.description
            );
            let doc_tokens = tokenize(&text);
            let union = query_tokens.union(&doc_tokens).count();
            let shared = query_tokens.intersection(&doc_tokens).count();
            if shared > 0 {
                fuzzy.push((shared as f64 / union as f64, term));
            }
        }
        fuzzy.sort_by(|a, b| b.0.total_cmp(&a.0));

        let mut seen = HashSet::new();
        exact
            .into_iter()
            .chain(alias)
            .chain(fuzzy.into_iter().map(|(_, t)| t))
            .filter(|t| seen.insert(t.key()))
            .take(top_k)
            .collect()
    }
}

/// Lowercased runs of ASCII alphanumerics and Hangul syllables.
fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_ascii_alphanumeric() || ('가'..='힣').contains(&c)))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories<'a>(terms: &[&'a AppendixTerm]) -> Vec<(&'a str, &'a str)> {
        terms.iter().map(|t| t.key()).collect()
    }

    #[test]
    fn name_match_comes_first() {
        let index = AppendixIndex::seed();
        let hits = index.lookup("문화 및 집회시설", DEFAULT_TOP_K);
        assert_eq!(
            categories(&hits),
            vec![("문화 및 집회시설", "공연장"), ("문화 및 집회시설", "집회장")]
        );
    }

    #[test]
    fn alias_match_in_either_direction() {
        let index = AppendixIndex::seed();
        assert_eq!(
            categories(&index.lookup("아파트", DEFAULT_TOP_K)),
            vec![("주거시설", "공동주택")]
        );
        assert_eq!(
            categories(&index.lookup("대형 오피스 빌딩", DEFAULT_TOP_K)),
            vec![("업무시설", "일반업무시설")]
        );
    }

    #[test]
    fn fuzzy_match_by_shared_tokens() {
        let index = AppendixIndex::seed();
        assert_eq!(
            categories(&index.lookup("사무 업무", DEFAULT_TOP_K)),
            vec![("업무시설", "일반업무시설")]
        );
        assert!(index.lookup("주차장 설치", DEFAULT_TOP_K).is_empty());
        assert!(index.lookup("  ", DEFAULT_TOP_K).is_empty());
    }

    #[test]
    fn results_are_unique_and_bounded() {
        let mut terms = seed_terms();
        terms.push(terms[0].clone());
        let index = AppendixIndex::new(terms);
        let hits = index.lookup("시설", DEFAULT_TOP_K);
        assert_eq!(hits.len(), 4);
        assert_eq!(index.lookup("시설", 3).len(), 3);
    }

    #[test]
    fn loads_document_json() {
        let index = AppendixIndex::from_json(
            r#"{
                "source": "건축법 시행령 [별표 1]",
                "terms": [{
                    "category": "문화 및 집회시설",
                    "subcategory": "공연장",
                    "aliases": ["문화시설"],
                    "description": "공연 목적 시설",
                    "source_clause": "건축법 시행령 [별표 1]"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(index.len(), 1);
        let hits = index.lookup("문화 및 집회시설", DEFAULT_TOP_K);
        assert_eq!(hits[0].category, "문화 및 집회시설");
    }

    #[test]
    fn terms_from_table_text() {
        let text = "용도별 건축물의 종류\n주거시설\n1. 단독주택\n가.  다가구주택\n업무시설\n- 오피스텔\n나. 차";
        let terms = extract_terms_from_text(text);
        let keys: Vec<(&str, &str)> = terms.iter().map(AppendixTerm::key).collect();
        assert_eq!(
            keys,
            vec![
                ("주거시설", "단독주택"),
                ("주거시설", "다가구주택"),
                ("업무시설", "오피스텔"),
            ]
        );
        assert_eq!(terms[1].description, "다가구주택");
    }

    #[test]
    fn parsed_terms_do_not_override_seed() {
        let parsed = vec![
            AppendixTerm {
                category: "주거시설".into(),
                subcategory: "공동주택".into(),
                ..Default::default()
            },
            AppendixTerm {
                category: "주거시설".into(),
                subcategory: "단독주택".into(),
                ..Default::default()
            },
        ];
        let doc = AppendixDocument::with_parsed(parsed);
        assert_eq!(doc.terms.len(), 5);
        let shared = doc
            .terms
            .iter()
            .find(|t| t.subcategory == "공동주택")
            .unwrap();
        assert!(!shared.aliases.is_empty());
    }
}
