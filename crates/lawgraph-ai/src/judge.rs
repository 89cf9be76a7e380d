//! Relevance judgment capability.
//!
//! Retrieval asks two questions: can the current evidence answer the query
//! without following references, and is a given reference worth following.
//! Both answers are infallible: transport failures and unparseable model
//! output degrade to "not answerable" and "do not follow".

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::chat::ChatClient;
use crate::json::parse_json_object;

pub const HEURISTIC_REASON: &str = "heuristic";
pub const FOLLOW_HEURISTIC_REASON: &str = "heuristic_without_ref_content";
pub const PARSE_FALLBACK_REASON: &str = "parse-fallback";
pub const GENERIC_TARGET: &str = "일반";

const MAX_PRIORITY: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answerability {
    pub answerable: bool,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowDecision {
    pub follow: bool,
    /// 0 (lowest) to 2.
    pub priority: u8,
    pub reason: String,
}

impl FollowDecision {
    fn declined(reason: &str) -> Self {
        Self {
            follow: false,
            priority: 0,
            reason: reason.to_string(),
        }
    }
}

/// One evidence chunk as shown to the answerability judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceExcerpt {
    pub law_name: String,
    pub article_num: String,
    pub article_title: String,
    /// Whitespace-normalised, truncated chunk text.
    pub excerpt: String,
}

/// A reference candidate as shown to the follow judge. The referenced
/// article's own text is never included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateView<'a> {
    /// `<law_id>:<article>` or `<law_id>:__law__`.
    pub ref_key: &'a str,
    pub raw: &'a str,
    /// Preview of the citing chunk.
    pub preview: &'a str,
}

#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge_answerable(
        &self,
        query: &str,
        targets: &[String],
        evidence: &[EvidenceExcerpt],
    ) -> Answerability;

    async fn judge_follow(
        &self,
        query: &str,
        targets: &[String],
        candidate: &CandidateView<'_>,
    ) -> FollowDecision;
}

// ── Heuristic ──

/// Judge used when no model is configured.
///
/// Answerable when there are at least `min_evidence` excerpts and a specific
/// target keyword occurs in them. Follow when the reference has raw text and
/// the citing chunk mentions a specific target.
#[derive(Debug, Clone)]
pub struct HeuristicJudge {
    pub min_evidence: usize,
    pub generic_target: String,
}

impl Default for HeuristicJudge {
    fn default() -> Self {
        Self {
            min_evidence: 3,
            generic_target: GENERIC_TARGET.into(),
        }
    }
}

impl HeuristicJudge {
    fn mentions_target(&self, text: &str, targets: &[String]) -> bool {
        targets
            .iter()
            .filter(|t| **t != self.generic_target)
            .any(|t| text.contains(t.as_str()))
    }
}

#[async_trait]
impl Judge for HeuristicJudge {
    async fn judge_answerable(
        &self,
        _query: &str,
        targets: &[String],
        evidence: &[EvidenceExcerpt],
    ) -> Answerability {
        let merged = evidence
            .iter()
            .map(|e| e.excerpt.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        Answerability {
            answerable: evidence.len() >= self.min_evidence
                && self.mentions_target(&merged, targets),
            reason: HEURISTIC_REASON.into(),
        }
    }

    async fn judge_follow(
        &self,
        _query: &str,
        targets: &[String],
        candidate: &CandidateView<'_>,
    ) -> FollowDecision {
        let follow =
            !candidate.raw.is_empty() && self.mentions_target(candidate.preview, targets);
        FollowDecision {
            follow,
            priority: if follow { MAX_PRIORITY } else { 0 },
            reason: FOLLOW_HEURISTIC_REASON.into(),
        }
    }
}

// ── LLM ──

/// Judge backed by a chat model that answers in JSON.
pub struct LlmJudge {
    client: Arc<dyn ChatClient>,
}

impl LlmJudge {
    pub fn new(client: Arc<dyn ChatClient>) -> Self {
        Self { client }
    }
}

pub fn answerable_prompt(query: &str, targets: &[String], evidence: &[EvidenceExcerpt]) -> String {
    format!(
        "너는 법률 QA의 ref 필요성 판단기다.\n\
         중요: ref 내용을 미리 보지 말고, 현재 컨텍스트만으로 답변 가능한지 판단한다.\n\
         기준:\n\
         - 현재 컨텍스트만으로 질문의 판단/계산이 가능하면 answerable=true\n\
         - 조문 이해를 위해 참조 법령/조항 해석이 필수면 answerable=false\n\
         출력은 JSON만:\n\
         {{\"answerable\": true/false, \"reason\": \"...\"}}\n\n\
         query: {query}\n\
         targets: {}\n\
         current_contexts: {}\n",
        serde_json::to_string(targets).unwrap_or_default(),
        serde_json::to_string(evidence).unwrap_or_default(),
    )
}

pub fn follow_prompt(query: &str, targets: &[String], candidate: &CandidateView<'_>) -> String {
    format!(
        "너는 법률 참조 추적 판단기다.\n\
         중요: ref 조문 본문은 아직 읽지 않는다. 현재 chunk 맥락만으로 판단한다.\n\
         출력은 JSON만:\n\
         {{\"follow\": true/false, \"priority\": 0|1|2, \"reason\": \"...\"}}\n\n\
         query: {query}\n\
         targets: {}\n\
         current_chunk_preview: {}\n\
         raw_ref: {}\n\
         ref_key: {}\n",
        serde_json::to_string(targets).unwrap_or_default(),
        candidate.preview,
        candidate.raw,
        candidate.ref_key,
    )
}

/// Interpret an answerability reply. Unparseable replies are not answerable.
pub fn parse_answerable(text: &str) -> Answerability {
    let Some(map) = parse_json_object(text) else {
        return Answerability {
            answerable: false,
            reason: PARSE_FALLBACK_REASON.into(),
        };
    };
    let reason = match map.get("reason").and_then(Value::as_str).map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => truncate(text.trim(), 200),
    };
    Answerability {
        answerable: map.get("answerable").is_some_and(truthy),
        reason,
    }
}

/// Interpret a follow reply. Priority is clamped to 0..=2; a non-integer
/// priority counts as 0. Unparseable replies decline.
pub fn parse_follow(text: &str) -> FollowDecision {
    let Some(map) = parse_json_object(text) else {
        return FollowDecision::declined(PARSE_FALLBACK_REASON);
    };
    let follow = map
        .get("follow")
        .or_else(|| map.get("expand"))
        .is_some_and(truthy);
    let priority = match map.get("priority") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().unwrap_or(0)
        }
        _ => 0,
    };
    let reason = match map.get("reason").and_then(Value::as_str).map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => truncate(text.trim(), 160),
    };
    FollowDecision {
        follow,
        priority: priority.min(MAX_PRIORITY as u64) as u8,
        reason: format!("precheck_without_ref_content: {reason}"),
    }
}

#[async_trait]
impl Judge for LlmJudge {
    async fn judge_answerable(
        &self,
        query: &str,
        targets: &[String],
        evidence: &[EvidenceExcerpt],
    ) -> Answerability {
        let prompt = answerable_prompt(query, targets, evidence);
        match self.client.complete(&prompt).await {
            Ok(text) => {
                let verdict = parse_answerable(&text);
                debug!(answerable = verdict.answerable, reason = %verdict.reason, "answerability judged");
                verdict
            }
            Err(e) => {
                warn!(error = %e, "answerability judge unavailable, assuming not answerable");
                Answerability {
                    answerable: false,
                    reason: PARSE_FALLBACK_REASON.into(),
                }
            }
        }
    }

    async fn judge_follow(
        &self,
        query: &str,
        targets: &[String],
        candidate: &CandidateView<'_>,
    ) -> FollowDecision {
        let prompt = follow_prompt(query, targets, candidate);
        match self.client.complete(&prompt).await {
            Ok(text) => parse_follow(&text),
            Err(e) => {
                warn!(ref_key = candidate.ref_key, error = %e, "follow judge unavailable, declining");
                FollowDecision::declined(PARSE_FALLBACK_REASON)
            }
        }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Null => false,
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AiError;

    struct FixedChat(&'static str);

    #[async_trait]
    impl ChatClient for FixedChat {
        async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
            Ok(self.0.to_string())
        }
    }

    struct DownChat;

    #[async_trait]
    impl ChatClient for DownChat {
        async fn complete(&self, _prompt: &str) -> Result<String, AiError> {
            Err(AiError::EmptyResponse)
        }
    }

    fn excerpt(text: &str) -> EvidenceExcerpt {
        EvidenceExcerpt {
            law_name: "건축법".into(),
            article_num: "46".into(),
            article_title: "건축선의 지정".into(),
            excerpt: text.into(),
        }
    }

    fn targets(ts: &[&str]) -> Vec<String> {
        ts.iter().map(|t| t.to_string()).collect()
    }

    const CANDIDATE: CandidateView<'static> = CandidateView {
        ref_key: "001823:46",
        raw: "제46조",
        preview: "건축선은 제46조에 따른다",
    };

    #[tokio::test]
    async fn heuristic_answerable_needs_three_excerpts_and_target() {
        let judge = HeuristicJudge::default();
        let ev = vec![excerpt("건축선 지정"), excerpt("도로"), excerpt("대지")];
        let v = judge.judge_answerable("q", &targets(&["건축선"]), &ev).await;
        assert!(v.answerable);
        assert_eq!(v.reason, "heuristic");

        let v = judge.judge_answerable("q", &targets(&["건축선"]), &ev[..2]).await;
        assert!(!v.answerable);

        let v = judge.judge_answerable("q", &targets(&["일반"]), &ev).await;
        assert!(!v.answerable);
    }

    #[tokio::test]
    async fn heuristic_follow() {
        let judge = HeuristicJudge::default();
        let d = judge.judge_follow("q", &targets(&["건축선"]), &CANDIDATE).await;
        assert_eq!((d.follow, d.priority), (true, 2));
        assert_eq!(d.reason, "heuristic_without_ref_content");

        let d = judge.judge_follow("q", &targets(&["용적률"]), &CANDIDATE).await;
        assert_eq!((d.follow, d.priority), (false, 0));

        let no_raw = CandidateView { raw: "", ..CANDIDATE };
        let d = judge.judge_follow("q", &targets(&["건축선"]), &no_raw).await;
        assert!(!d.follow);
    }

    #[tokio::test]
    async fn llm_answerable_parses_fenced_json() {
        let judge = LlmJudge::new(Arc::new(FixedChat(
            "```json\n{\"answerable\": true, \"reason\": \"충분\"}\n```",
        )));
        let v = judge.judge_answerable("q", &targets(&["건축선"]), &[]).await;
        assert!(v.answerable);
        assert_eq!(v.reason, "충분");
    }

    #[tokio::test]
    async fn llm_garbage_degrades_to_safe_defaults() {
        let judge = LlmJudge::new(Arc::new(FixedChat("모르겠습니다")));
        let v = judge.judge_answerable("q", &[], &[]).await;
        assert_eq!(
            v,
            Answerability {
                answerable: false,
                reason: "parse-fallback".into()
            }
        );
        let d = judge.judge_follow("q", &[], &CANDIDATE).await;
        assert_eq!((d.follow, d.priority), (false, 0));
        assert_eq!(d.reason, "parse-fallback");
    }

    #[tokio::test]
    async fn llm_transport_error_degrades() {
        let judge = LlmJudge::new(Arc::new(DownChat));
        assert!(!judge.judge_answerable("q", &[], &[]).await.answerable);
        assert!(!judge.judge_follow("q", &[], &CANDIDATE).await.follow);
    }

    #[test]
    fn follow_priority_clamped() {
        let d = parse_follow(r#"{"follow": true, "priority": 7, "reason": "필요"}"#);
        assert_eq!(d.priority, 2);
        assert_eq!(d.reason, "precheck_without_ref_content: 필요");

        assert_eq!(parse_follow(r#"{"follow": true, "priority": "1"}"#).priority, 1);
        assert_eq!(parse_follow(r#"{"follow": true, "priority": "high"}"#).priority, 0);
        assert_eq!(parse_follow(r#"{"follow": true, "priority": -1}"#).priority, 0);
        assert!(parse_follow(r#"{"expand": true}"#).follow);
    }

    #[test]
    fn answerable_reason_falls_back_to_text() {
        let v = parse_answerable(r#"{"answerable": false}"#);
        assert_eq!(v.reason, r#"{"answerable": false}"#);
    }

    #[test]
    fn prompts_carry_inputs() {
        let p = follow_prompt("건축선 질문", &targets(&["건축선"]), &CANDIDATE);
        assert!(p.contains("query: 건축선 질문"));
        assert!(p.contains("ref_key: 001823:46"));
        assert!(p.contains(r#"{"follow": true/false"#));

        let p = answerable_prompt("q", &targets(&["건축선"]), &[excerpt("본문")]);
        assert!(p.contains(r#"targets: ["건축선"]"#));
        assert!(p.contains("\"excerpt\":\"본문\""));
    }
}
