//! Retrieval controller.
//!
//! Per query: zero-hop search, answerability check, then at most one round
//! of reference expansion.
//!
//! ```text
//! ZERO_HOP -> ANSWERABILITY_CHECK -> DONE
//!                                 -> EXPANDING -> DONE
//! ```
//!
//! All state is query-scoped. Seed searches and follow checks run
//! concurrently, but results are consumed in input order so the evidence set
//! and trace do not depend on completion order.

use std::cmp::Reverse;
use std::sync::Arc;

use futures::future::join_all;
use lawgraph_ai::{EvidenceExcerpt, Judge};
use lawgraph_core::{AppendixIndex, AppendixTerm, LawCatalog, Passage, pad_law_id};
use lawgraph_store::{ChunkIndex, StoreError};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::candidate::{RefCandidate, extract_candidates};
use crate::config::{RetrievalConfig, TargetLexicon};
use crate::evidence::{Citation, assemble_citations};
use crate::graph::ReferenceGraph;
use crate::trace::{FollowCheck, RetrievalTrace};
use crate::{RetrievalError, preview};

/// Outcome of one query.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveResult {
    pub targets: Vec<String>,
    /// Deduplicated by chunk key, zero-hop passages first.
    pub evidence: Vec<Passage>,
    pub citations: Vec<Citation>,
    /// Building-use categories matching the targets; empty without a taxonomy.
    pub appendix_terms: Vec<AppendixTerm>,
    pub trace: RetrievalTrace,
}

pub struct RetrievalController {
    index: Arc<dyn ChunkIndex>,
    judge: Arc<dyn Judge>,
    catalog: LawCatalog,
    lexicon: TargetLexicon,
    appendix: Option<AppendixIndex>,
    config: RetrievalConfig,
}

impl RetrievalController {
    pub fn new(index: Arc<dyn ChunkIndex>, judge: Arc<dyn Judge>) -> Self {
        Self {
            index,
            judge,
            catalog: LawCatalog::default(),
            lexicon: TargetLexicon::default(),
            appendix: None,
            config: RetrievalConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: LawCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_lexicon(mut self, lexicon: TargetLexicon) -> Self {
        self.lexicon = lexicon;
        self
    }

    pub fn with_appendix(mut self, appendix: AppendixIndex) -> Self {
        self.appendix = Some(appendix);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn detect_targets(&self, query: &str) -> Vec<String> {
        self.lexicon.detect(query)
    }

    /// Resolve with detected targets and the configured `k`.
    pub async fn ask(&self, query: &str) -> Result<ResolveResult, RetrievalError> {
        let targets = self.detect_targets(query);
        self.resolve(query, &targets, self.config.k).await
    }

    /// Build the evidence set for `query`.
    ///
    /// An empty `targets` slice means "detect from the query". Only a failed
    /// zero-hop search is an error; judge and expansion failures degrade.
    pub async fn resolve(
        &self,
        query: &str,
        targets: &[String],
        k: usize,
    ) -> Result<ResolveResult, RetrievalError> {
        let targets = if targets.is_empty() {
            self.detect_targets(query)
        } else {
            targets.to_vec()
        };

        let base = self.retrieve_zero_hop(query, &targets, k).await?;
        info!(query, ?targets, contexts = base.len(), "zero-hop retrieval complete");

        let mut trace = RetrievalTrace {
            base_contexts_count: base.len(),
            ..Default::default()
        };
        let mut graph = ReferenceGraph::from_passages(base);

        let verdict = self
            .judge
            .judge_answerable(query, &targets, &self.excerpts(graph.passages()))
            .await;
        trace.precheck_answerable = verdict.answerable;
        trace.precheck_reason = verdict.reason.clone();

        trace.expand_reason = if verdict.answerable {
            format!("skip_ref: {}", verdict.reason)
        } else {
            self.expand(query, &targets, &mut graph, &mut trace).await
        };
        trace.final_contexts_count = graph.len();

        info!(
            expand_reason = %trace.expand_reason,
            expanded = trace.expanded_ref_count,
            contexts = trace.final_contexts_count,
            "resolve complete"
        );

        let evidence = graph.into_passages();
        let citations = assemble_citations(&evidence);
        let appendix_terms = self.appendix_terms(&targets);
        Ok(ResolveResult {
            targets,
            evidence,
            citations,
            appendix_terms,
            trace,
        })
    }

    fn appendix_terms(&self, targets: &[String]) -> Vec<AppendixTerm> {
        let Some(appendix) = &self.appendix else {
            return Vec::new();
        };
        appendix
            .lookup(&targets.join(" "), self.config.appendix_top_k)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Seed searches for the query, each target, and "<query> <target>",
    /// merged by chunk key; backfilled when short of `k`; truncated to `k`.
    pub async fn retrieve_zero_hop(
        &self,
        query: &str,
        targets: &[String],
        k: usize,
    ) -> Result<Vec<Passage>, StoreError> {
        let per_query_k = k.max(self.config.min_per_query_k);
        let mut queries = vec![query.to_string()];
        for target in targets {
            queries.push(target.clone());
            queries.push(format!("{query} {target}"));
        }

        let results = join_all(
            queries
                .iter()
                .map(|q| self.index.similarity_search(q, per_query_k)),
        )
        .await;

        let mut merged = ReferenceGraph::new();
        for hits in results {
            for passage in hits? {
                merged.insert(passage);
            }
        }

        if merged.len() < k {
            let backfill_k = (k * 2).max(8);
            for suffix in &self.config.backfill_suffixes {
                if merged.len() >= k {
                    break;
                }
                let q = format!("{query} {suffix}");
                let hits = self.index.similarity_search(&q, backfill_k).await?;
                debug!(query = %q, hits = hits.len(), "backfill search");
                for passage in hits {
                    merged.insert(passage);
                }
            }
        }

        let mut out = merged.into_passages();
        out.truncate(k);
        Ok(out)
    }

    fn excerpts(&self, passages: &[Passage]) -> Vec<EvidenceExcerpt> {
        passages
            .iter()
            .take(self.config.evidence_excerpts)
            .map(|p| EvidenceExcerpt {
                law_name: p.meta.law_name.clone(),
                article_num: p.meta.article_num.clone(),
                article_title: p.meta.article_title.clone(),
                excerpt: preview(&p.content, self.config.excerpt_chars),
            })
            .collect()
    }

    /// Rank, judge and fetch reference candidates. Returns the expand reason.
    async fn expand(
        &self,
        query: &str,
        targets: &[String],
        graph: &mut ReferenceGraph,
        trace: &mut RetrievalTrace,
    ) -> String {
        let candidates = extract_candidates(graph, &self.catalog, self.config.preview_chars);
        trace.candidates_total = candidates.len();
        if candidates.is_empty() {
            return "no_ref_candidates".into();
        }

        let keys: Vec<String> = candidates.iter().map(RefCandidate::ref_key).collect();
        let views: Vec<_> = candidates
            .iter()
            .zip(&keys)
            .map(|(c, key)| c.view(key))
            .collect();
        let decisions = join_all(
            views
                .iter()
                .map(|view| self.judge.judge_follow(query, targets, view)),
        )
        .await;

        let mut followed: Vec<(&RefCandidate, u8)> = Vec::new();
        for ((candidate, key), decision) in candidates.iter().zip(&keys).zip(decisions) {
            debug!(
                ref_key = %key,
                follow = decision.follow,
                priority = decision.priority,
                "follow check"
            );
            if decision.follow {
                followed.push((candidate, decision.priority));
            }
            trace.follow_checks.push(FollowCheck {
                ref_key: key.clone(),
                follow: decision.follow,
                priority: decision.priority,
                reason: decision.reason,
            });
        }
        trace.candidates_followed = followed.len();
        if followed.is_empty() {
            return "no_followed_ref_candidates".into();
        }

        followed.sort_by_key(|(_, priority)| Reverse(*priority));

        let mut used = 0;
        for (candidate, _) in followed {
            if used >= self.config.max_ref_expand {
                break;
            }
            if !candidate.is_whole_law()
                && !graph.lookup(&candidate.law_id, &candidate.article).is_empty()
            {
                debug!(ref_key = %candidate.ref_key(), "reference already in evidence");
                continue;
            }

            let docs = match self.fetch(query, targets, candidate).await {
                Ok(docs) => docs,
                Err(e) => {
                    warn!(ref_key = %candidate.ref_key(), error = %e, "reference fetch failed, skipping");
                    continue;
                }
            };
            if docs.is_empty() {
                continue;
            }
            let mut added = 0;
            for passage in docs {
                if graph.insert(passage) {
                    added += 1;
                }
            }
            debug!(ref_key = %candidate.ref_key(), added, "expanded reference");
            used += 1;
        }

        trace.expanded_ref_count = used;
        format!("expanded_ref_count={used}")
    }

    async fn fetch(
        &self,
        query: &str,
        targets: &[String],
        candidate: &RefCandidate,
    ) -> Result<Vec<Passage>, StoreError> {
        if candidate.is_whole_law() {
            self.search_within_law(query, targets, &candidate.law_id)
                .await
        } else {
            self.index
                .exact_lookup(&candidate.law_id, &candidate.article)
                .await
        }
    }

    /// Up to `whole_law_k` passages of `law_id` relevant to the query.
    async fn search_within_law(
        &self,
        query: &str,
        targets: &[String],
        law_id: &str,
    ) -> Result<Vec<Passage>, StoreError> {
        let limit = self.config.whole_law_k;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let search_k = (limit * 3).max(6);
        let law_id = pad_law_id(law_id);

        let mut queries = vec![query.to_string()];
        queries.extend(targets.iter().cloned());
        queries.push(format!("{query} {}", targets.join(" ")));

        let mut found = ReferenceGraph::new();
        'queries: for q in &queries {
            for passage in self.index.similarity_search(q, search_k).await? {
                if passage.meta.padded_law_id() != law_id {
                    continue;
                }
                found.insert(passage);
                if found.len() >= limit {
                    break 'queries;
                }
            }
        }
        Ok(found.into_passages())
    }
}
