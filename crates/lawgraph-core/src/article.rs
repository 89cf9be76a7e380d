//! Article numbering and chunk identity for Korean statutes.
//!
//! Articles are cited as "제N조". An article inserted by amendment between
//! N and N+1 takes a branch number, cited "제N조의M" and stored as "N의M".
//!
//! # Keys
//!
//! - Composite chunk key: `<law_id zero-padded to 6>:<article_num>:<article_sub or "0">`.
//!   Identity of an evidence record during retrieval.
//! - Abbreviation key: `<law_id>:<article_num>`. Identity of a chunk-scope
//!   abbreviation map in the persisted artifacts.

use std::fmt;

/// A strictly parsed article number: "2" or "2의1".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArticleNo {
    pub main: u32,
    pub branch: Option<u32>,
}

impl ArticleNo {
    /// Parse `N` or `N의M` (ASCII digits only, surrounding whitespace ignored).
    ///
    /// Anything else, including empty input and numerals that overflow,
    /// yields `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let (main, branch) = match s.split_once('의') {
            Some((main, branch)) => (main, Some(branch)),
            None => (s, None),
        };
        let main = parse_digits(main)?;
        let branch = match branch {
            Some(b) => Some(parse_digits(b)?),
            None => None,
        };
        Some(Self { main, branch })
    }

    /// Citation form as it appears in statute text: "제2조", "제2조의1".
    pub fn label(&self) -> String {
        match self.branch {
            Some(b) => format!("제{}조의{}", self.main, b),
            None => format!("제{}조", self.main),
        }
    }
}

impl fmt::Display for ArticleNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.branch {
            Some(b) => write!(f, "{}의{}", self.main, b),
            None => write!(f, "{}", self.main),
        }
    }
}

fn parse_digits(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Left-pad a law id with zeros to six characters ("1823" → "001823").
pub fn pad_law_id(law_id: &str) -> String {
    format!("{:0>6}", law_id.trim())
}

/// Branch suffix normalised for keys: absent or empty becomes "0".
pub fn sub_or_zero(article_sub: Option<&str>) -> &str {
    match article_sub {
        Some(s) if !s.trim().is_empty() => s.trim(),
        _ => "0",
    }
}

/// Composite evidence key: `001823:46:0`.
pub fn chunk_key(law_id: &str, article_num: &str, article_sub: Option<&str>) -> String {
    format!(
        "{}:{}:{}",
        pad_law_id(law_id),
        article_num,
        sub_or_zero(article_sub)
    )
}

/// Key of a chunk-scope abbreviation map: `1823:46`.
pub fn abbr_key(law_id: &str, article_num: &str) -> String {
    format!("{law_id}:{article_num}")
}

/// The one article label a chunk answers to: "2" for the main article,
/// "2의1" for a branch. A branch never answers to its main article's label.
pub fn article_label(article_num: &str, article_sub: Option<&str>) -> String {
    match sub_or_zero(article_sub) {
        "0" => article_num.trim().to_string(),
        sub => format!("{}의{}", article_num.trim(), sub),
    }
}

/// Human-readable section label: "제46조 건축선의 지정", "제2조의1 정의".
pub fn section_label(article_num: &str, article_sub: Option<&str>, title: &str) -> String {
    let sub = match sub_or_zero(article_sub) {
        "0" => String::new(),
        s => format!("의{s}"),
    };
    format!("제{article_num}조{sub} {title}").trim().to_string()
}
