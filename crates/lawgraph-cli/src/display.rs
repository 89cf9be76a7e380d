//! Plain-text rendering of retrieval results.

use lawgraph_core::{AppendixTerm, ArticleNo, Reference};
use lawgraph_retrieval::{Citation, ResolveResult, RetrievalTrace, TrackResult};

// ── Public API ──

/// Print the evidence of one query followed by its trace.
pub fn print_resolve(query: &str, result: &ResolveResult) {
    println!("=== {query} ===");
    println!("targets: {}", result.targets.join(", "));
    println!();

    print_citations(&result.citations);
    print_appendix(&result.appendix_terms);
    print_trace(&result.trace);
}

pub fn print_tracked(tracked: &TrackResult) {
    println!("Reference Tracking");
    field("hops", tracked.hops);
    field("contexts", tracked.context.len());
    field("resolved", ref_list(tracked.resolved.iter()));
    field("pending", ref_list(tracked.pending.iter()));
    println!();
}

// ── Sections ──

fn print_citations(citations: &[Citation]) {
    println!("Evidence");
    if citations.is_empty() {
        println!("  (none)");
    }
    for (i, citation) in citations.iter().enumerate() {
        println!("  [{}] {} {}", i + 1, citation.document_name, citation.section);
        println!("      {}", citation.content_preview);
        let refs = ref_list(citation.internal_refs.iter().chain(&citation.external_refs));
        if !refs.is_empty() {
            println!("      refs: {refs}");
        }
    }
    println!();
}

fn print_appendix(terms: &[AppendixTerm]) {
    if terms.is_empty() {
        return;
    }
    println!("Building Uses");
    for term in terms {
        println!("  {} > {}", term.category, term.subcategory);
        if !term.description.is_empty() {
            println!("      {}", shorten(&term.description, 120));
        }
    }
    println!();
}

fn print_trace(trace: &RetrievalTrace) {
    println!("Trace");
    field("precheck_answerable", trace.precheck_answerable);
    field("precheck_reason", &trace.precheck_reason);
    field("candidates_total", trace.candidates_total);
    field("candidates_followed", trace.candidates_followed);
    field("expanded_ref_count", trace.expanded_ref_count);
    field("expand_reason", &trace.expand_reason);
    field("base_contexts_count", trace.base_contexts_count);
    field("final_contexts_count", trace.final_contexts_count);

    if !trace.follow_checks.is_empty() {
        println!("  follow_checks");
        for check in &trace.follow_checks {
            let decision = if check.follow { "follow" } else { "skip" };
            println!(
                "    {:<18} {:<6} p={} {}",
                check.ref_key, decision, check.priority, check.reason
            );
        }
    }
    println!();
}

// ── Formatting ──

fn field(name: &str, value: impl std::fmt::Display) {
    println!("  {:<22} {}", name, value);
}

fn shorten(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// "제47조, 건축법 시행령 제31조". Non-numeric articles print as stored.
fn ref_list<'a>(refs: impl Iterator<Item = &'a Reference>) -> String {
    refs.map(|r| {
        let article = ArticleNo::parse(&r.article)
            .map(|a| a.label())
            .unwrap_or_else(|| r.article.clone());
        match r.law_name() {
            Some(law) if !law.is_empty() => format!("{law} {article}"),
            _ => article,
        }
    })
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lawgraph_core::RefTarget;

    #[test]
    fn ref_list_names_external_laws() {
        let refs = [
            Reference {
                target: RefTarget::Internal,
                article: "47".into(),
                paragraph: None,
                item: None,
                raw: "제47조".into(),
            },
            Reference {
                target: RefTarget::External {
                    law_name: "건축법 시행령".into(),
                },
                article: "31".into(),
                paragraph: Some("1".into()),
                item: None,
                raw: "「건축법 시행령」 제31조제1항".into(),
            },
        ];
        assert_eq!(ref_list(refs.iter()), "제47조, 건축법 시행령 제31조");

        let branch = Reference {
            article: "2의1".into(),
            ..refs[0].clone()
        };
        let whole_law = Reference {
            article: "별표".into(),
            ..refs[1].clone()
        };
        assert_eq!(
            ref_list([branch, whole_law].iter()),
            "제2조의1, 건축법 시행령 별표"
        );
        assert_eq!(ref_list(std::iter::empty()), "");
    }

    #[test]
    fn shorten_counts_characters() {
        assert_eq!(shorten("건축선의 지정", 3), "건축선...");
        assert_eq!(shorten("건축선", 3), "건축선");
    }
}
