//! AI layer: chat completion client, relevance judges, and LLM-assisted
//! abbreviation extraction.

mod error;
pub use error::AiError;

pub mod abbrev;
pub mod chat;
pub mod json;
pub mod judge;

pub use chat::{ChatClient, ChatConfig, HttpChatClient};
pub use judge::{
    Answerability, CandidateView, EvidenceExcerpt, FollowDecision, HeuristicJudge, Judge, LlmJudge,
};
