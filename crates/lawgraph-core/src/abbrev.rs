//! Abbreviation resolver.
//!
//! Statutes define short forms with the idiom `X(이하 "Y"라 한다)`. This module
//! extracts those definitions at a chosen scope (whole law or single
//! article), scores competing expansions, merges maps across scopes, and
//! rewrites article text with every short form expanded.
//!
//! Expansions stay anchored to their legal basis: a long form that starts
//! with an article citation ("제4조에 따른 건축위원회") is rewritten as
//! "<law> 제4조에 따른 건축위원회", and the quality score rewards expansions
//! that carry an explicit article reference.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::model::ArticleChunk;

/// Definition idioms, tried in order. All candidates are scored; the best
/// expansion per short form wins.
static DEFINITION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // 「건축위원회」(이하 "위원회"라 한다)
        r#"「([^」]+)」\s*[(（]이하\s*["“]([^"”]+)["”]\s*(?:이라|라)\s*한다[)）]"#,
        // 제4조에 따른 건축위원회(이하 "위원회"라 한다)
        r#"([^()（）\n]{2,}?)\s*[(（]이하\s*["“]([^"”]+)["”]\s*(?:이라|라)\s*한다[)）]"#,
        // 건축위원회를 이하 "위원회"
        r#"([^,\n]{2,}?)을?\s*이하\s*["“]([^"”]+)["”]"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("abbreviation definition pattern"))
    .collect()
});

/// "<article-ref><connective><subject>" at the start of a long form.
static ARTICLE_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(제\d+(?:의\d+)?조(?:의\d+)?(?:제\d+항)?(?:제\d+호)?)(?:에\s*따른|에\s*따라|의)?\s*(.+)",
    )
    .expect("article reference pattern")
});

/// Particles that may follow a short form of one or two characters.
const PARTICLES: &[&str] = &[
    "제", "의", "에", "을", "를", "이", "가", "은", "는", "과", "와", "으로",
];

const LONG_FORM_TRIM: &[char] = &[
    ' ', '\t', '\n', '\r', '.', ',', ';', ':', '[', ']', '(', ')', '（', '）', '「', '」',
];

const SUBJECT_TRIM: &[char] = &[' ', '\t', '\n', '\r', '.', ',', ';', ':'];

/// Granularity at which abbreviation maps are built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbbrevScope {
    /// One map per law, extracted from the law's concatenated text.
    #[default]
    Law,
    /// One map per article; law maps are aggregated from them.
    Chunk,
}

/// Short form → expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AbbreviationMap {
    entries: BTreeMap<String, String>,
}

impl AbbreviationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clean a raw map: trim both sides, drop empty entries, anchor
    /// expansions to `law_name`.
    pub fn sanitized<'a>(
        law_name: &str,
        raw: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        let mut map = Self::new();
        for (short, long) in raw {
            let (short, long) = (short.trim(), long.trim());
            if short.is_empty() || long.is_empty() {
                continue;
            }
            let expansion = normalize_expansion(long, law_name);
            if !expansion.is_empty() {
                map.entries.insert(short.to_string(), expansion);
            }
        }
        map
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, short: &str) -> Option<&str> {
        self.entries.get(short).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Insert unless an existing expansion scores at least as high.
    ///
    /// Returns whether the map changed. Empty entries are ignored.
    pub fn insert_scored(&mut self, short: &str, expansion: &str) -> bool {
        let (short, expansion) = (short.trim(), expansion.trim());
        if short.is_empty() || expansion.is_empty() {
            return false;
        }
        if let Some(existing) = self.entries.get(short)
            && quality_score(expansion) <= quality_score(existing)
        {
            return false;
        }
        self.entries
            .insert(short.to_string(), expansion.to_string());
        true
    }

    /// Merge `other` into `self`; per key the higher-scoring expansion wins
    /// and the existing entry wins ties.
    pub fn merge(&mut self, other: &AbbreviationMap) {
        for (short, expansion) in other.iter() {
            self.insert_scored(short, expansion);
        }
    }

    /// Entries of `self`, plus entries of `fallback` for keys `self` lacks.
    pub fn with_fallback(&self, fallback: &AbbreviationMap) -> AbbreviationMap {
        let mut out = self.clone();
        for (short, expansion) in fallback.iter() {
            out.entries
                .entry(short.to_string())
                .or_insert_with(|| expansion.to_string());
        }
        out
    }

    /// Rewrite `text` with every short form expanded.
    ///
    /// Longest short forms go first. Short forms of one or two characters
    /// are only replaced at a word boundary: not preceded by a Hangul
    /// letter or ASCII alphanumeric, and followed by whitespace, a common
    /// particle, or the end of the text. Longer forms are replaced literally.
    pub fn apply(&self, text: &str) -> String {
        let mut pairs: Vec<(&str, &str)> = self.iter().collect();
        pairs.sort_by_key(|(short, _)| std::cmp::Reverse(short.chars().count()));

        let mut out = text.to_string();
        for (short, full) in pairs {
            if short.is_empty() {
                continue;
            }
            out = if short.chars().count() <= 2 {
                replace_at_boundaries(&out, short, full)
            } else {
                out.replace(short, full)
            };
        }
        out
    }
}

/// Quality of an expansion: `min(chars, 120)`, +50 when it starts with an
/// article citation, +20 when it contains both "제" and "조".
pub fn quality_score(expansion: &str) -> usize {
    let mut score = expansion.chars().count().min(120);
    if ARTICLE_REF_RE.is_match(expansion) {
        score += 50;
    }
    if expansion.contains('제') && expansion.contains('조') {
        score += 20;
    }
    score
}

/// Collapse whitespace, trim brackets and punctuation, and rewrite
/// "<article-ref><connective><subject>" as "<law> <article-ref>에 따른 <subject>".
pub fn normalize_expansion(long: &str, law_name: &str) -> String {
    let collapsed = long.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = collapsed.trim_matches(LONG_FORM_TRIM);
    let Some(caps) = ARTICLE_REF_RE.captures(text) else {
        return text.to_string();
    };
    let article_ref = caps[1].trim();
    let subject = caps[2].trim_matches(SUBJECT_TRIM);
    if subject.is_empty() {
        return text.to_string();
    }
    format!("{law_name} {article_ref}에 따른 {subject}")
}

/// Extract every abbreviation definition in `text`.
pub fn extract_definitions(text: &str, law_name: &str) -> AbbreviationMap {
    let mut map = AbbreviationMap::new();
    for pattern in DEFINITION_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let long = normalize_expansion(caps[1].trim(), law_name);
            map.insert_scored(&caps[2], &long);
        }
    }
    map
}

/// One map per law, each built from the law's concatenated article text.
pub fn extract_by_law(chunks: &[ArticleChunk]) -> BTreeMap<String, AbbreviationMap> {
    let mut texts: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for chunk in chunks {
        texts
            .entry(chunk.law_name.as_str())
            .or_default()
            .push(chunk.content.as_str());
    }

    texts
        .into_iter()
        .map(|(law_name, parts)| {
            let map = extract_definitions(&parts.join("\n"), law_name);
            debug!(law = law_name, abbreviations = map.len(), "extracted law abbreviations");
            (law_name.to_string(), map)
        })
        .collect()
}

/// One map per article that defines at least one abbreviation, keyed by
/// `<law_id>:<article_num>`.
pub fn extract_by_chunk(chunks: &[ArticleChunk]) -> BTreeMap<String, AbbreviationMap> {
    chunks
        .iter()
        .filter_map(|chunk| {
            let map = extract_definitions(&chunk.content, &chunk.law_name);
            (!map.is_empty()).then(|| (chunk.abbr_key(), map))
        })
        .collect()
}

/// Merge chunk-scope maps into law-scope maps by score.
pub fn aggregate_by_law(
    chunks: &[ArticleChunk],
    chunk_maps: &BTreeMap<String, AbbreviationMap>,
) -> BTreeMap<String, AbbreviationMap> {
    let index: HashMap<String, &str> = chunks
        .iter()
        .map(|c| (c.abbr_key(), c.law_name.as_str()))
        .collect();

    let mut by_law: BTreeMap<String, AbbreviationMap> = BTreeMap::new();
    for (key, map) in chunk_maps {
        let Some(law_name) = index.get(key) else {
            continue;
        };
        by_law.entry(law_name.to_string()).or_default().merge(map);
    }
    by_law
}

/// Attach `map` to the chunk and derive `content_resolved` from `content`.
pub fn resolve_chunk(chunk: &mut ArticleChunk, map: AbbreviationMap) {
    chunk.content_resolved = map.apply(&chunk.content);
    chunk.abbreviations = map;
}

/// Resolve every chunk with its own law's map.
pub fn resolve_by_law(chunks: &mut [ArticleChunk], law_maps: &BTreeMap<String, AbbreviationMap>) {
    for chunk in chunks.iter_mut() {
        let map = law_maps.get(&chunk.law_name).cloned().unwrap_or_default();
        resolve_chunk(chunk, map);
    }
}

/// Resolve every chunk with its own chunk map, falling back to its law's
/// map for short forms the chunk does not define.
pub fn resolve_by_chunk(
    chunks: &mut [ArticleChunk],
    chunk_maps: &BTreeMap<String, AbbreviationMap>,
    law_maps: Option<&BTreeMap<String, AbbreviationMap>>,
) {
    for chunk in chunks.iter_mut() {
        let own = chunk_maps
            .get(&chunk.abbr_key())
            .map(|m| AbbreviationMap::sanitized(&chunk.law_name, m.iter()))
            .unwrap_or_default();
        let map = match law_maps.and_then(|maps| maps.get(&chunk.law_name)) {
            Some(law_map) => own.with_fallback(law_map),
            None => own,
        };
        resolve_chunk(chunk, map);
    }
}

/// Maps produced by one resolution run.
#[derive(Debug, Clone, Default)]
pub struct ScopedMaps {
    pub by_law: BTreeMap<String, AbbreviationMap>,
    /// Present for [`AbbrevScope::Chunk`] runs.
    pub by_chunk: Option<BTreeMap<String, AbbreviationMap>>,
}

/// Extract definitions at `scope` and resolve every chunk.
pub fn build_and_resolve(chunks: &mut [ArticleChunk], scope: AbbrevScope) -> ScopedMaps {
    let maps = match scope {
        AbbrevScope::Law => {
            let by_law = extract_by_law(chunks);
            resolve_by_law(chunks, &by_law);
            ScopedMaps {
                by_law,
                by_chunk: None,
            }
        }
        AbbrevScope::Chunk => {
            let by_chunk = extract_by_chunk(chunks);
            let by_law = aggregate_by_law(chunks, &by_chunk);
            resolve_by_chunk(chunks, &by_chunk, Some(&by_law));
            ScopedMaps {
                by_law,
                by_chunk: Some(by_chunk),
            }
        }
    };
    info!(
        ?scope,
        laws = maps.by_law.len(),
        abbreviations = maps.by_law.values().map(AbbreviationMap::len).sum::<usize>(),
        "resolved abbreviations"
    );
    maps
}

fn replace_at_boundaries(text: &str, short: &str, full: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut pos = 0;
    while let Some(offset) = text[pos..].find(short) {
        let start = pos + offset;
        let end = start + short.len();
        if boundary_before(text, start) && boundary_after(&text[end..]) {
            out.push_str(&text[copied..start]);
            out.push_str(full);
            copied = end;
            pos = end;
        } else {
            pos = start + text[start..].chars().next().map_or(1, char::len_utf8);
        }
    }
    out.push_str(&text[copied..]);
    out
}

fn boundary_before(text: &str, pos: usize) -> bool {
    match text[..pos].chars().next_back() {
        Some(c) => !(('가'..='힣').contains(&c) || c.is_ascii_alphanumeric()),
        None => true,
    }
}

fn boundary_after(rest: &str) -> bool {
    rest.is_empty()
        || rest.starts_with(char::is_whitespace)
        || PARTICLES.iter().any(|p| rest.starts_with(p))
}
