use std::fmt::Write;

use serde::Serialize;

use crate::{
    embedder::Embedder,
    engine::{EnrichedCandidate, ResumeSearchEngine, enrich},
    error::Result,
    field::ResumeField,
    ranking::TopK,
    resume::ResumeRecord,
    text_util::single_line,
    vector_store::{StoreOracle, VectorStore},
    weights::FieldWeights,
};

/// Parameters for a resume search.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub query: String,
    pub count: TopK,
    /// Attach the full stored resume to every result.
    pub full: bool,
}

/// Execute a search against the local vector store.
pub fn execute_search(
    params: &SearchParams,
    store: &VectorStore,
    embedder: &dyn Embedder,
    weights: FieldWeights,
) -> Result<Vec<EnrichedCandidate>> {
    let engine = ResumeSearchEngine::new(StoreOracle::new(store, embedder), weights)?;
    let ranked = engine.search(&params.query, params.count)?;

    Ok(if params.full {
        enrich(ranked, store)
    } else {
        ranked.into_iter().map(EnrichedCandidate::from).collect()
    })
}

/// Format results for a terminal, one block per candidate.
pub fn format_human(results: &[EnrichedCandidate], weights: &FieldWeights) -> String {
    let mut out = String::new();
    if results.is_empty() {
        out.push_str("No results found.\n");
        return out;
    }

    for (i, r) in results.iter().enumerate() {
        let c = &r.candidate;
        let _ = writeln!(
            out,
            "{:>3}. {} [{:.3}] {}/{} fields #{}",
            i + 1,
            c.name,
            c.total_score,
            c.fields_matched,
            ResumeField::ALL.len(),
            c.candidate_id
        );

        let mut fields: Vec<_> = c.field_scores.iter().collect();
        fields.sort_by(|a, b| b.1.total_cmp(a.1).then(a.0.cmp(b.0)));
        for (&field, &score) in fields {
            let excerpt = c
                .field_excerpts
                .get(&field)
                .map(|e| single_line(e))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "     {:<16} {:.3} x {:.2} = {:.3}  {}",
                field.as_str(),
                score,
                weights.get(field),
                c.contribution(field, weights),
                excerpt
            );
        }

        if let Some(record) = &r.record {
            for (field, text) in record.embeddable_fields() {
                let _ = writeln!(out, "     {}: {}", field.label(), single_line(text));
            }
        }
        if let Some(warning) = &r.warning {
            let _ = writeln!(out, "     (warning: {warning})");
        }
    }
    let _ = write!(out, "\n{} result(s)\n", results.len());
    out
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    query: &'a str,
    result_count: usize,
    weights: &'a FieldWeights,
    results: &'a [EnrichedCandidate],
}

/// Format results as a JSON document.
pub fn format_json(
    results: &[EnrichedCandidate],
    query: &str,
    weights: &FieldWeights,
) -> Result<String> {
    Ok(serde_json::to_string_pretty(&SearchOutput {
        query,
        result_count: results.len(),
        weights,
        results,
    })?)
}

/// Format one stored resume for a terminal.
pub fn format_record(record: &ResumeRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} #{}", record.display_name(), record.id);
    if let Some(confidence) = record.confidence_score {
        let _ = writeln!(out, "confidence: {confidence:.2}");
    }
    for (kind, url) in &record.links {
        if let Some(url) = url {
            let _ = writeln!(out, "{kind}: {url}");
        }
    }
    for (field, text) in record.embeddable_fields() {
        let _ = write!(out, "\n{}\n{}\n", field.label(), text.trim());
    }
    out
}
