//! Per-article abbreviation extraction with a chat model.
//!
//! The model sees one article at a time and answers with a JSON object of
//! short form → expansion. Replies are sanitised exactly like pattern-based
//! extraction, so both sources can be merged by score.

use std::collections::BTreeMap;

use lawgraph_core::{AbbreviationMap, ArticleChunk};
use serde_json::Value;
use tracing::{debug, info};

use crate::AiError;
use crate::chat::ChatClient;
use crate::json::strip_code_fence;

/// Article text beyond this many characters is not sent to the model.
pub const MAX_CHARS_PER_CHUNK: usize = 5000;

pub fn chunk_prompt(chunk: &ArticleChunk, max_chars: usize) -> String {
    let text: String = chunk.content.chars().take(max_chars).collect();
    format!(
        "다음 단일 조문에서 정의된 축약어만 JSON으로 추출하라.\n\
         반드시 축약어 키와 확장명 값만 포함하고, 모르면 빈 JSON을 반환하라.\n\
         규칙:\n\
         1) 축약어 패턴은 보통 '(이하 \"X\"이라 한다)'\n\
         2) 값은 가능한 완전한 명칭으로 작성\n\
         3) 출력은 JSON 객체만\n\
         예시: {{\"위원회\": \"건축법 제4조에 따른 건축위원회\"}}\n\n\
         법령명: {}\n\
         조문: 제{}조\n\
         제목: {}\n\
         본문:\n{}",
        chunk.law_name, chunk.article_num, chunk.article_title, text
    )
}

/// Short form → expansion pairs from a model reply.
///
/// Accepts a flat object or one wrapped as `{"abbreviations": {...}}`.
/// Non-string entries are skipped; anything unparseable yields an empty map.
pub fn parse_abbreviation_reply(text: &str) -> BTreeMap<String, String> {
    let Ok(value) = serde_json::from_str::<Value>(strip_code_fence(text)) else {
        return BTreeMap::new();
    };
    let object = match value {
        Value::Object(mut map) => match map.remove("abbreviations") {
            Some(Value::Object(inner)) => inner,
            Some(other) => {
                map.insert("abbreviations".into(), other);
                map
            }
            None => map,
        },
        _ => return BTreeMap::new(),
    };
    object
        .into_iter()
        .filter_map(|(k, v)| match v {
            Value::String(s) => Some((k, s)),
            _ => None,
        })
        .collect()
}

/// Ask the model for each chunk's abbreviations, keyed by
/// `<law_id>:<article_num>`. Chunks with no abbreviations are omitted.
///
/// Requests run one at a time; a transport failure aborts the run.
pub async fn extract_by_chunk_llm(
    client: &dyn ChatClient,
    chunks: &[ArticleChunk],
    max_chars: usize,
) -> Result<BTreeMap<String, AbbreviationMap>, AiError> {
    let mut maps = BTreeMap::new();
    for chunk in chunks {
        let reply = client.complete(&chunk_prompt(chunk, max_chars)).await?;
        let raw = parse_abbreviation_reply(&reply);
        let map = AbbreviationMap::sanitized(
            &chunk.law_name,
            raw.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        );
        debug!(key = %chunk.abbr_key(), abbreviations = map.len(), "llm chunk abbreviations");
        if !map.is_empty() {
            maps.insert(chunk.abbr_key(), map);
        }
    }
    info!(chunks = chunks.len(), with_abbreviations = maps.len(), "llm abbreviation extraction complete");
    Ok(maps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedChat {
        replies: Mutex<Vec<&'static str>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedChat {
        fn new(replies: &[&'static str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().copied().collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatClient for ScriptedChat {
        async fn complete(&self, prompt: &str) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop()
                .map(str::to_string)
                .ok_or(AiError::EmptyResponse)
        }
    }

    #[test]
    fn reply_shapes() {
        let flat = parse_abbreviation_reply(r#"{"위원회": "건축위원회", "n": 3}"#);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat["위원회"], "건축위원회");

        let wrapped =
            parse_abbreviation_reply("```json\n{\"abbreviations\": {\"법\": \"건축법\"}}\n```");
        assert_eq!(wrapped["법"], "건축법");

        assert!(parse_abbreviation_reply("없음").is_empty());
        assert!(parse_abbreviation_reply("[]").is_empty());
    }

    #[test]
    fn prompt_truncates_article_text() {
        let chunk = ArticleChunk::new("건축법", "1823", "4", "건축위원회", "가".repeat(6000));
        let prompt = chunk_prompt(&chunk, MAX_CHARS_PER_CHUNK);
        assert!(prompt.contains("법령명: 건축법"));
        assert!(prompt.contains("조문: 제4조"));
        assert!(prompt.ends_with(&"가".repeat(MAX_CHARS_PER_CHUNK)));
        assert!(!prompt.contains(&"가".repeat(MAX_CHARS_PER_CHUNK + 1)));
    }

    #[tokio::test]
    async fn extraction_sanitises_and_keys_by_chunk() {
        let chat = ScriptedChat::new(&[
            r#"{"위원회": "제4조에 따른 건축위원회", "": "x"}"#,
            "모름",
        ]);
        let chunks = vec![
            ArticleChunk::new("건축법", "1823", "4", "건축위원회", "본문"),
            ArticleChunk::new("건축법", "1823", "5", "기타", "본문"),
        ];

        let maps = extract_by_chunk_llm(&chat, &chunks, MAX_CHARS_PER_CHUNK)
            .await
            .unwrap();
        assert_eq!(maps.len(), 1);
        assert_eq!(
            maps["1823:4"].get("위원회"),
            Some("건축법 제4조에 따른 건축위원회")
        );
        assert_eq!(chat.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn transport_failure_aborts() {
        let chat = ScriptedChat::new(&[]);
        let chunks = vec![ArticleChunk::new("건축법", "1823", "4", "t", "본문")];
        assert!(
            extract_by_chunk_llm(&chat, &chunks, MAX_CHARS_PER_CHUNK)
                .await
                .is_err()
        );
    }
}
