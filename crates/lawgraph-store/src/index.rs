//! Chunk index capability and an in-memory lexical implementation.
//!
//! The retrieval controller only sees [`ChunkIndex`]. Production deployments
//! put a vector store behind it; [`MemoryIndex`] serves local chunk tables
//! and tests with character-bigram overlap scoring.

use std::collections::HashSet;

use async_trait::async_trait;
use lawgraph_core::{ArticleChunk, Passage, pad_law_id};
use tracing::debug;

use crate::StoreError;

/// Maximum passages returned by an exact lookup.
pub const EXACT_LOOKUP_LIMIT: usize = 5;

/// Search capability consumed by retrieval.
///
/// Implementations own their retry and backoff policy; callers do not retry.
#[async_trait]
pub trait ChunkIndex: Send + Sync {
    /// Up to `k` passages ordered by decreasing relevance to `query`.
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, StoreError>;

    /// Passages of `article` ("46" or "2의1") in the law `law_id`.
    async fn exact_lookup(&self, law_id: &str, article: &str) -> Result<Vec<Passage>, StoreError>;

    /// Decree passages whose parent references cite `article` of `law_name`.
    async fn children_of(
        &self,
        _law_name: &str,
        _article: &str,
    ) -> Result<Vec<Passage>, StoreError> {
        Ok(Vec::new())
    }
}

/// In-memory index over a fixed set of passages.
///
/// Similarity is the number of distinct query character bigrams found in
/// the passage (title and text). Passages sharing no bigram with the query
/// are never returned. Ties keep insertion order.
pub struct MemoryIndex {
    passages: Vec<Passage>,
    grams: Vec<HashSet<String>>,
}

impl MemoryIndex {
    pub fn new(passages: Vec<Passage>) -> Self {
        let grams = passages
            .iter()
            .map(|p| bigrams(&format!("{} {}", p.meta.article_title, p.content)))
            .collect();
        Self { passages, grams }
    }

    pub fn from_chunks(chunks: &[ArticleChunk]) -> Self {
        Self::new(chunks.iter().map(ArticleChunk::to_passage).collect())
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn score(&self, idx: usize, query: &HashSet<String>) -> usize {
        query.iter().filter(|g| self.grams[idx].contains(*g)).count()
    }
}

#[async_trait]
impl ChunkIndex for MemoryIndex {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, StoreError> {
        let query_grams = bigrams(query);
        let mut scored: Vec<(usize, usize)> = (0..self.passages.len())
            .map(|i| (i, self.score(i, &query_grams)))
            .filter(|(_, score)| *score > 0)
            .collect();
        scored.sort_by_key(|(_, score)| std::cmp::Reverse(*score));

        let hits: Vec<Passage> = scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.passages[i].clone())
            .collect();
        debug!(query, k, hits = hits.len(), "memory similarity search");
        Ok(hits)
    }

    async fn exact_lookup(&self, law_id: &str, article: &str) -> Result<Vec<Passage>, StoreError> {
        let law_id = pad_law_id(law_id);
        let article = article.trim();
        Ok(self
            .passages
            .iter()
            .filter(|p| p.meta.padded_law_id() == law_id && p.meta.article_label() == article)
            .take(EXACT_LOOKUP_LIMIT)
            .cloned()
            .collect())
    }

    async fn children_of(&self, law_name: &str, article: &str) -> Result<Vec<Passage>, StoreError> {
        Ok(self
            .passages
            .iter()
            .filter(|p| {
                p.meta
                    .parent_refs
                    .iter()
                    .any(|r| r.law_name() == Some(law_name) && r.article == article)
            })
            .cloned()
            .collect())
    }
}

/// Character bigrams of every alphanumeric run, lowercased. Single-character
/// runs contribute themselves.
fn bigrams(text: &str) -> HashSet<String> {
    let mut out = HashSet::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let chars: Vec<char> = token.to_lowercase().chars().collect();
        if chars.len() == 1 {
            out.insert(chars[0].to_string());
        }
        for pair in chars.windows(2) {
            out.insert(pair.iter().collect());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawgraph_core::{RefTarget, Reference};

    fn chunks() -> Vec<ArticleChunk> {
        let mut decree = ArticleChunk::new(
            "건축법 시행령",
            "2118",
            "31",
            "건축선",
            "법 제46조제1항에 따른 건축선의 지정은 다음과 같다.",
        );
        decree.parent_refs = vec![Reference {
            target: RefTarget::Parent {
                law_name: "건축법".into(),
            },
            article: "46".into(),
            paragraph: Some("1".into()),
            item: None,
            raw: "법 제46조제1항".into(),
        }];
        let mut branch = ArticleChunk::new("건축법", "1823", "2", "정의", "용어의 뜻은 다음과 같다.");
        branch.article_sub = Some("1".into());
        vec![
            ArticleChunk::new("건축법", "1823", "46", "건축선의 지정", "도로와 접한 부분에 건축선을 정한다."),
            ArticleChunk::new("건축법", "1823", "55", "건축물의 건폐율", "대지면적에 대한 건축면적의 비율"),
            decree,
            branch,
        ]
    }

    #[tokio::test]
    async fn similarity_orders_by_overlap() {
        let index = MemoryIndex::from_chunks(&chunks());
        let hits = index.similarity_search("건폐율 한도", 3).await.unwrap();
        assert_eq!(hits[0].meta.article_num, "55");

        let hits = index.similarity_search("건축선 지정", 10).await.unwrap();
        assert_eq!(hits[0].meta.article_num, "46");
        assert!(hits.iter().all(|h| h.meta.article_num != "2"));
    }

    #[tokio::test]
    async fn similarity_respects_k_and_skips_unrelated() {
        let index = MemoryIndex::from_chunks(&chunks());
        assert_eq!(index.similarity_search("건축", 2).await.unwrap().len(), 2);
        assert!(index.similarity_search("주차장", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn similarity_is_deterministic() {
        let index = MemoryIndex::from_chunks(&chunks());
        let a = index.similarity_search("건축선 건폐율", 4).await.unwrap();
        let b = index.similarity_search("건축선 건폐율", 4).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn exact_lookup_pads_law_id_and_matches_branch() {
        let index = MemoryIndex::from_chunks(&chunks());
        let hits = index.exact_lookup("001823", "46").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_key(), "001823:46:0");

        let hits = index.exact_lookup("1823", "2의1").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_key(), "001823:2:1");
        assert!(index.exact_lookup("1823", "2").await.unwrap().is_empty());

        assert!(index.exact_lookup("2118", "46").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn children_follow_parent_refs() {
        let index = MemoryIndex::from_chunks(&chunks());
        let kids = index.children_of("건축법", "46").await.unwrap();
        assert_eq!(kids.len(), 1);
        assert_eq!(kids[0].meta.law_name, "건축법 시행령");
        assert!(index.children_of("건축법", "55").await.unwrap().is_empty());
    }

    #[test]
    fn bigram_tokens() {
        let grams = bigrams("건축선, A");
        assert!(grams.contains("건축"));
        assert!(grams.contains("축선"));
        assert!(grams.contains("a"));
        assert_eq!(grams.len(), 3);
    }
}
