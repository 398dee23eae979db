use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    embedder::Embedder,
    error::{Error, Result},
    field::ResumeField,
    resume::{ResumeRecord, parse_jsonl},
    vector_store::VectorStore,
};

/// Totals for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub processed: usize,
    pub successful: usize,
    pub failed: usize,
    pub total_embeddings: usize,
}

/// Embed every non-blank field of a record, fields in parallel.
fn embed_record(
    record: &ResumeRecord,
    embedder: &dyn Embedder,
) -> Result<Vec<(ResumeField, Vec<f32>)>> {
    let fields: Vec<_> = record.embeddable_fields().collect();
    fields
        .par_iter()
        .map(|&(field, text)| Ok((field, embedder.embed(text)?)))
        .collect()
}

/// Embed and store one resume. Returns the number of field vectors written.
pub fn ingest_record(
    record: &ResumeRecord,
    store: &VectorStore,
    embedder: &dyn Embedder,
) -> Result<usize> {
    let vectors = embed_record(record, embedder)?;
    if vectors.is_empty() {
        return Err(Error::Embedding(format!(
            "resume '{}' has no non-empty fields",
            record.id
        )));
    }
    store.store_resume(record, &vectors)
}

/// Ingest JSON-lines resume records from a string.
///
/// Bad lines and resumes that fail to embed are counted and logged; they
/// never abort the run.
pub fn ingest_str(
    contents: &str,
    store: &VectorStore,
    embedder: &dyn Embedder,
) -> IngestStats {
    let mut stats = IngestStats::default();

    for (line, parsed) in parse_jsonl(contents) {
        stats.processed += 1;
        let outcome = parsed.and_then(|record| {
            let stored = ingest_record(&record, store, embedder)?;
            Ok((record, stored))
        });
        match outcome {
            Ok((record, stored)) => {
                tracing::debug!(
                    line,
                    resume = %record.id,
                    fields = stored,
                    "stored resume"
                );
                stats.successful += 1;
                stats.total_embeddings += stored;
            }
            Err(e) => {
                tracing::warn!(line, error = %e, "skipping resume");
                stats.failed += 1;
            }
        }
    }

    tracing::info!(
        processed = stats.processed,
        successful = stats.successful,
        failed = stats.failed,
        embeddings = stats.total_embeddings,
        "ingestion complete"
    );
    stats
}

/// Ingest a JSON-lines file of resume records into `store`.
pub fn ingest_jsonl(
    path: &Path,
    store: &VectorStore,
    embedder: &dyn Embedder,
) -> Result<IngestStats> {
    let contents = std::fs::read_to_string(path)?;
    Ok(ingest_str(&contents, store, embedder))
}
