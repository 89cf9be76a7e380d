//! Query-scoped reference graph.
//!
//! Nodes are evidence passages keyed by composite chunk key, kept in
//! insertion order. Edges are the references each passage carries. The
//! graph answers "is this article already in evidence" by (law, article)
//! and "what does this chunk cite" by source key.

use std::collections::HashMap;

use lawgraph_core::{Passage, Reference, pad_law_id};

#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    nodes: Vec<Passage>,
    by_key: HashMap<String, usize>,
    by_article: HashMap<(String, String), Vec<usize>>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_passages(passages: impl IntoIterator<Item = Passage>) -> Self {
        let mut graph = Self::new();
        for p in passages {
            graph.insert(p);
        }
        graph
    }

    /// Add a passage unless its chunk key is already present.
    pub fn insert(&mut self, passage: Passage) -> bool {
        let key = passage.chunk_key();
        if self.by_key.contains_key(&key) {
            return false;
        }
        let idx = self.nodes.len();
        self.by_article
            .entry((passage.meta.padded_law_id(), passage.meta.article_label()))
            .or_default()
            .push(idx);
        self.by_key.insert(key, idx);
        self.nodes.push(passage);
        true
    }

    pub fn contains(&self, chunk_key: &str) -> bool {
        self.by_key.contains_key(chunk_key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn passages(&self) -> &[Passage] {
        &self.nodes
    }

    pub fn into_passages(self) -> Vec<Passage> {
        self.nodes
    }

    pub fn get(&self, chunk_key: &str) -> Option<&Passage> {
        self.by_key.get(chunk_key).map(|&i| &self.nodes[i])
    }

    /// Passages of `article` ("46" or "2의1") in `law_id`. "2" does not
    /// match the branch articles 2의N.
    pub fn lookup(&self, law_id: &str, article: &str) -> Vec<&Passage> {
        self.by_article
            .get(&(pad_law_id(law_id), article.trim().to_string()))
            .map(|idxs| idxs.iter().map(|&i| &self.nodes[i]).collect())
            .unwrap_or_default()
    }

    /// Every reference carried by the chunk, internal first, then external,
    /// then parent.
    pub fn edges(&self, chunk_key: &str) -> Vec<&Reference> {
        self.get(chunk_key)
            .map(|p| {
                p.meta
                    .internal_refs
                    .iter()
                    .chain(&p.meta.external_refs)
                    .chain(&p.meta.parent_refs)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawgraph_core::{ArticleChunk, RefTarget};

    fn passage(law_id: &str, article: &str, sub: Option<&str>) -> Passage {
        let mut chunk = ArticleChunk::new("건축법", law_id, article, "t", "본문");
        chunk.article_sub = sub.map(str::to_string);
        chunk.internal_refs = vec![Reference {
            target: RefTarget::Internal,
            article: "2".into(),
            paragraph: None,
            item: None,
            raw: "제2조".into(),
        }];
        chunk.to_passage()
    }

    #[test]
    fn insert_dedups_by_chunk_key() {
        let mut graph = ReferenceGraph::new();
        assert!(graph.insert(passage("1823", "46", None)));
        assert!(!graph.insert(passage("001823", "46", Some("0"))));
        assert!(graph.insert(passage("1823", "46", Some("2"))));
        assert_eq!(graph.len(), 2);
        assert!(graph.contains("001823:46:2"));
    }

    #[test]
    fn lookup_by_law_and_article() {
        let graph = ReferenceGraph::from_passages([
            passage("1823", "46", None),
            passage("1823", "2", Some("1")),
        ]);
        assert_eq!(graph.lookup("001823", "46").len(), 1);
        assert_eq!(graph.lookup("1823", "2의1").len(), 1);
        assert!(graph.lookup("1823", "2").is_empty());
        assert!(graph.lookup("2118", "46").is_empty());
    }

    #[test]
    fn edges_by_source_chunk() {
        let graph = ReferenceGraph::from_passages([passage("1823", "46", None)]);
        let edges = graph.edges("001823:46:0");
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].article, "2");
        assert!(graph.edges("missing").is_empty());
    }
}
