//! Multi-hop reference tracking.
//!
//! A breadth-first walk over the references of retrieved passages, one
//! reference fetched per hop. Internal references resolve within the citing
//! law; parent references pull the decree articles that implement the cited
//! act article. External references are not walked.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use lawgraph_core::{Passage, RefKind, Reference};
use lawgraph_store::{ChunkIndex, StoreError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::graph::ReferenceGraph;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrackResult {
    /// Retrieved passages followed by every passage fetched while tracking.
    pub context: Vec<Passage>,
    /// References that produced at least one passage, in resolution order.
    pub resolved: Vec<Reference>,
    pub hops: usize,
    /// References still queued when the hop budget ran out.
    pub pending: Vec<Reference>,
}

struct QueuedRef {
    reference: Reference,
    /// Padded id of the law whose article carries the reference.
    source_law_id: String,
}

impl QueuedRef {
    fn key(&self) -> String {
        match self.reference.law_name() {
            Some(law_name) if self.reference.kind() == RefKind::Parent => {
                format!("parent:{}:{}", law_name, self.reference.article)
            }
            _ => format!("{}:{}", self.source_law_id, self.reference.article),
        }
    }
}

pub struct ReferenceTracker {
    index: Arc<dyn ChunkIndex>,
    max_hops: usize,
}

impl ReferenceTracker {
    pub fn new(index: Arc<dyn ChunkIndex>, max_hops: usize) -> Self {
        Self { index, max_hops }
    }

    /// Follow references out of `retrieved` for at most `max_hops` fetches.
    ///
    /// A reference is queued at most once per call. Every hop consumes one
    /// queued reference whether or not it yields passages.
    pub async fn track(&self, retrieved: Vec<Passage>) -> TrackResult {
        let mut graph = ReferenceGraph::from_passages(retrieved);
        let mut queue = VecDeque::new();
        let mut seen = HashSet::new();
        for passage in graph.passages() {
            enqueue_refs(passage, &mut queue, &mut seen);
        }

        let mut resolved = Vec::new();
        let mut hops = 0;
        while hops < self.max_hops {
            let Some(current) = queue.pop_front() else {
                break;
            };
            hops += 1;

            let docs = self.fetch(&current).await;
            debug!(hop = hops, key = %current.key(), fetched = docs.len(), "tracked reference");
            if docs.is_empty() {
                continue;
            }
            for passage in docs {
                if graph.insert(passage.clone()) {
                    enqueue_refs(&passage, &mut queue, &mut seen);
                }
            }
            resolved.push(current.reference);
        }

        info!(
            hops,
            resolved = resolved.len(),
            pending = queue.len(),
            contexts = graph.len(),
            "reference tracking complete"
        );
        TrackResult {
            context: graph.into_passages(),
            resolved,
            hops,
            pending: queue.into_iter().map(|q| q.reference).collect(),
        }
    }

    async fn fetch(&self, queued: &QueuedRef) -> Vec<Passage> {
        let reference = &queued.reference;
        let result: Result<Vec<Passage>, StoreError> = match reference.kind() {
            RefKind::Internal => {
                self.index
                    .exact_lookup(&queued.source_law_id, &reference.article)
                    .await
            }
            RefKind::Parent => match reference.law_name() {
                Some(law_name) => self.index.children_of(law_name, &reference.article).await,
                None => Ok(Vec::new()),
            },
            RefKind::External => Ok(Vec::new()),
        };
        result.unwrap_or_else(|e| {
            warn!(key = %queued.key(), error = %e, "reference lookup failed");
            Vec::new()
        })
    }
}

fn enqueue_refs(passage: &Passage, queue: &mut VecDeque<QueuedRef>, seen: &mut HashSet<String>) {
    let source_law_id = passage.meta.padded_law_id();
    for reference in passage.meta.internal_refs.iter().chain(&passage.meta.parent_refs) {
        let queued = QueuedRef {
            reference: reference.clone(),
            source_law_id: source_law_id.clone(),
        };
        if seen.insert(queued.key()) {
            queue.push_back(queued);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use lawgraph_core::{ArticleChunk, LawCatalog, extract_references};
    use lawgraph_store::MemoryIndex;
    use std::sync::Mutex;

    struct DownIndex;

    /// Records every exact lookup it serves.
    struct RecordingIndex {
        inner: MemoryIndex,
        lookups: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChunkIndex for RecordingIndex {
        async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Passage>, StoreError> {
            self.inner.similarity_search(query, k).await
        }

        async fn exact_lookup(&self, law_id: &str, article: &str) -> Result<Vec<Passage>, StoreError> {
            self.lookups.lock().unwrap().push(article.to_string());
            self.inner.exact_lookup(law_id, article).await
        }
    }

    #[async_trait]
    impl ChunkIndex for DownIndex {
        async fn similarity_search(&self, _query: &str, _k: usize) -> Result<Vec<Passage>, StoreError> {
            Err(StoreError::Other("index offline".into()))
        }

        async fn exact_lookup(&self, _law_id: &str, _article: &str) -> Result<Vec<Passage>, StoreError> {
            Err(StoreError::Other("index offline".into()))
        }
    }

    fn chunks() -> Vec<ArticleChunk> {
        let mut chunks = vec![
            ArticleChunk::new("건축법", "1823", "44", "대지와 도로의 관계", "제46조에 따른 건축선을 확보한다."),
            ArticleChunk::new("건축법", "1823", "46", "건축선의 지정", "건축선은 제47조의 제한을 받는다."),
            ArticleChunk::new("건축법", "1823", "47", "건축선에 따른 건축제한", "담장은 건축선을 넘지 못한다."),
            ArticleChunk::new(
                "건축법 시행령",
                "2118",
                "31",
                "건축선",
                "법 제46조제1항에 따라 도로 중심선으로부터 후퇴한 선으로 한다.",
            ),
        ];
        extract_references(&mut chunks, &LawCatalog::default());
        chunks
    }

    fn passage(chunks: &[ArticleChunk], article: &str) -> Passage {
        chunks
            .iter()
            .find(|c| c.article_num == article && c.law_id == "1823")
            .unwrap()
            .to_passage()
    }

    fn keys(result: &TrackResult) -> Vec<String> {
        result.context.iter().map(Passage::chunk_key).collect()
    }

    #[tokio::test]
    async fn follows_internal_chain_within_budget() {
        let chunks = chunks();
        let tracker = ReferenceTracker::new(Arc::new(MemoryIndex::from_chunks(&chunks)), 3);

        let result = tracker.track(vec![passage(&chunks, "44")]).await;
        assert_eq!(
            keys(&result),
            vec!["001823:44:0", "001823:46:0", "001823:47:0"]
        );
        let articles: Vec<&str> = result.resolved.iter().map(|r| r.article.as_str()).collect();
        assert_eq!(articles, vec!["46", "47"]);
        assert_eq!(result.hops, 2);
        assert!(result.pending.is_empty());
    }

    #[tokio::test]
    async fn hop_budget_leaves_pending() {
        let chunks = chunks();
        let tracker = ReferenceTracker::new(Arc::new(MemoryIndex::from_chunks(&chunks)), 1);

        let result = tracker.track(vec![passage(&chunks, "44")]).await;
        assert_eq!(result.hops, 1);
        assert_eq!(result.context.len(), 2);
        assert_eq!(result.pending.len(), 1);
        assert_eq!(result.pending[0].article, "47");
    }

    #[tokio::test]
    async fn parent_refs_pull_implementing_articles() {
        let chunks = chunks();
        let decree = chunks
            .iter()
            .find(|c| c.law_id == "2118")
            .unwrap()
            .to_passage();
        assert_eq!(decree.meta.parent_refs.len(), 1);

        let mut carrier = ArticleChunk::new("건축법 시행령", "2118", "30", "준용", "본문");
        carrier.parent_refs = decree.meta.parent_refs.clone();
        let tracker = ReferenceTracker::new(Arc::new(MemoryIndex::from_chunks(&chunks)), 5);

        let result = tracker.track(vec![carrier.to_passage()]).await;
        assert!(keys(&result).contains(&"002118:31:0".to_string()));
        assert_eq!(result.resolved[0].article, "46");
    }

    #[tokio::test]
    async fn lookup_failures_consume_hops() {
        let chunks = chunks();
        let tracker = ReferenceTracker::new(Arc::new(DownIndex), 3);

        let result = tracker.track(vec![passage(&chunks, "44")]).await;
        assert_eq!(result.hops, 1);
        assert!(result.resolved.is_empty());
        assert_eq!(result.context.len(), 1);
    }

    #[tokio::test]
    async fn mutual_citations_are_each_fetched_once() {
        let mut chunks = vec![
            ArticleChunk::new("건축법", "1823", "46", "건축선의 지정", "제47조에 따른 제한을 받는다."),
            ArticleChunk::new("건축법", "1823", "47", "건축선에 따른 건축제한", "건축선은 제46조에 따른다."),
        ];
        extract_references(&mut chunks, &LawCatalog::default());
        let index = Arc::new(RecordingIndex {
            inner: MemoryIndex::from_chunks(&chunks),
            lookups: Mutex::new(Vec::new()),
        });
        let tracker = ReferenceTracker::new(index.clone(), 10);

        let result = tracker.track(vec![chunks[0].to_passage()]).await;

        assert_eq!(*index.lookups.lock().unwrap(), vec!["47", "46"]);
        assert_eq!(result.hops, 2);
        assert!(result.pending.is_empty());
        assert_eq!(keys(&result), vec!["001823:46:0", "001823:47:0"]);
    }

    #[tokio::test]
    async fn zero_budget_does_nothing() {
        let chunks = chunks();
        let tracker = ReferenceTracker::new(Arc::new(MemoryIndex::from_chunks(&chunks)), 0);
        let result = tracker.track(vec![passage(&chunks, "44")]).await;
        assert_eq!(result.hops, 0);
        assert_eq!(result.pending.len(), 1);
    }
}
