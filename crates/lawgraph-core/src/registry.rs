//! Parse national law registry documents into article chunks.
//!
//! A registry document looks like:
//!
//! ```json
//! {"법령": {
//!     "기본정보": {"법령명_한글": "건축법", "법령ID": "001823"},
//!     "조문": {"조문단위": [{"조문여부": "조문", "조문번호": "46", ...}]}
//! }}
//! ```
//!
//! Any level below `조문단위` may be a single object or a list. Only units
//! flagged `조문` become chunks; chapter headings are skipped.

use serde_json::Value;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{ArticleChunk, Item, Paragraph, SubItem};

const CIRCLED: [&str; 15] = [
    "①", "②", "③", "④", "⑤", "⑥", "⑦", "⑧", "⑨", "⑩", "⑪", "⑫", "⑬", "⑭", "⑮",
];

/// Parse a registry document from its JSON text.
pub fn parse_law_json(json: &str) -> Result<Vec<ArticleChunk>, CoreError> {
    let doc: Value = serde_json::from_str(json)?;
    parse_law_document(&doc)
}

/// Parse every article of a registry document.
pub fn parse_law_document(doc: &Value) -> Result<Vec<ArticleChunk>, CoreError> {
    let law = doc.get("법령").ok_or(CoreError::MissingField("법령"))?;
    let info = law
        .get("기본정보")
        .ok_or(CoreError::MissingField("법령.기본정보"))?;
    let law_name = match info.get("법령명_한글") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(Value::String(_)) | None => return Err(CoreError::MissingField("법령명_한글")),
        Some(_) => return Err(CoreError::InvalidField { field: "법령명_한글" }),
    };
    let law_id = scalar_text(info.get("법령ID"));
    if law_id.is_empty() {
        return Err(CoreError::MissingField("법령ID"));
    }

    let units = law.get("조문").and_then(|a| a.get("조문단위"));
    let chunks: Vec<ArticleChunk> = as_list(units)
        .into_iter()
        .filter_map(|unit| parse_article(unit, &law_name, &law_id))
        .collect();

    debug!(law = %law_name, law_id = %law_id, articles = chunks.len(), "parsed registry document");
    Ok(chunks)
}

fn parse_article(unit: &Value, law_name: &str, law_id: &str) -> Option<ArticleChunk> {
    if unit.get("조문여부").and_then(Value::as_str) != Some("조문") {
        return None;
    }

    let header = scalar_text(unit.get("조문내용"));
    let mut parts: Vec<String> = vec![header];
    let mut paragraphs = Vec::new();

    for para in as_list(unit.get("항")) {
        let content = scalar_text(para.get("항내용"));
        parts.push(content.clone());

        let mut subs = Vec::new();
        for sub in as_list(para.get("호")) {
            let sub_content = scalar_text(sub.get("호내용"));
            parts.push(sub_content.clone());

            let items = as_list(sub.get("목"))
                .into_iter()
                .map(|item| {
                    let content = scalar_text(item.get("목내용"));
                    parts.push(content.clone());
                    Item {
                        num: number_text(item.get("목번호")),
                        content,
                    }
                })
                .collect();

            subs.push(SubItem {
                num: number_text(sub.get("호번호")),
                content: sub_content,
                items,
            });
        }

        paragraphs.push(Paragraph {
            num: paragraph_number(&scalar_text(para.get("항번호"))),
            content,
            subs,
        });
    }

    let branch = scalar_text(unit.get("조문가지번호"));
    let mut chunk = ArticleChunk::new(
        law_name,
        law_id,
        scalar_text(unit.get("조문번호")),
        scalar_text(unit.get("조문제목")),
        parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    );
    chunk.article_sub = (!branch.is_empty()).then_some(branch);
    chunk.paragraphs = paragraphs;
    chunk.effective_date = scalar_text(unit.get("조문시행일자"));
    chunk.change_type = scalar_text(unit.get("조문제개정유형"));
    Some(chunk)
}

/// Circled paragraph numerals ("①") become digits; anything else is kept.
pub fn paragraph_number(raw: &str) -> String {
    let raw = raw.trim();
    CIRCLED
        .iter()
        .position(|c| *c == raw)
        .map(|i| (i + 1).to_string())
        .unwrap_or_else(|| raw.to_string())
}

fn number_text(value: Option<&Value>) -> String {
    scalar_text(value).trim_end_matches('.').to_string()
}

fn scalar_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn as_list(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(obj @ Value::Object(_)) => vec![obj],
        _ => Vec::new(),
    }
}
