use std::{collections::BTreeMap, path::Path};

use rayon::prelude::*;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};

use crate::{
    aggregate::FieldMatch,
    embedder::Embedder,
    error::{Error, Result},
    field::ResumeField,
    oracle::{ResumeStore, SimilarityOracle},
    resume::ResumeRecord,
    scoring::cosine_distance,
};

const FIELD_VECTORS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("field_vectors");
const FIELD_ENTRIES: TableDefinition<&str, &str> =
    TableDefinition::new("field_entries");

/// Header size: 4 bytes dimension.
const HEADER_SIZE: usize = 4;

/// Metadata stored next to each field vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub resume_id: String,
    pub name: String,
    pub field: ResumeField,
    pub content: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    #[serde(default)]
    pub processing_timestamp: Option<String>,
    #[serde(default)]
    pub links: BTreeMap<String, Option<String>>,
}

impl FieldEntry {
    fn from_record(record: &ResumeRecord, field: ResumeField) -> Self {
        Self {
            resume_id: record.id.clone(),
            name: record.display_name().to_string(),
            field,
            content: record.field(field).to_string(),
            confidence_score: record.confidence_score,
            processing_timestamp: record.processing_timestamp.clone(),
            links: record.links.clone(),
        }
    }
}

/// Counts describing what a store holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total_embeddings: usize,
    pub unique_resumes: usize,
    pub field_distribution: BTreeMap<ResumeField, usize>,
}

pub fn entry_key(resume_id: &str, field: ResumeField) -> String {
    format!("{resume_id}_{field}")
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes =
        Vec::with_capacity(HEADER_SIZE + std::mem::size_of_val(vector));
    bytes.extend_from_slice(&(vector.len() as u32).to_le_bytes());
    bytes.extend_from_slice(bytemuck::cast_slice(vector));
    bytes
}

/// Decode a stored vector; `None` if the bytes are malformed.
fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    let header: [u8; HEADER_SIZE] =
        bytes.get(..HEADER_SIZE)?.try_into().ok()?;
    let dimension = u32::from_le_bytes(header) as usize;
    let body = &bytes[HEADER_SIZE..];
    if body.len() != dimension * 4 {
        return None;
    }
    // Values may not be 4-byte aligned inside the page.
    Some(
        body.chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect(),
    )
}

/// Per-field resume embeddings keyed by `"{resume_id}_{field}"`.
///
/// Binary format per vector:
/// - 4 bytes: dimension D (u32 LE)
/// - D * 4 bytes: f32 LE values
pub struct VectorStore {
    db: Database,
}

impl VectorStore {
    /// Open or create a vector store at the given path.
    ///
    /// # Examples
    ///
    /// ```
    /// # let tmp = tempfile::tempdir().unwrap();
    /// use cvsearch::VectorStore;
    ///
    /// let store = VectorStore::open(&tmp.path().join("vectors.redb")).unwrap();
    /// assert_eq!(store.stats().unwrap().total_embeddings, 0);
    /// ```
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path)?;

        let txn = db.begin_write()?;
        txn.open_table(FIELD_VECTORS)?;
        txn.open_table(FIELD_ENTRIES)?;
        txn.commit()?;

        Ok(Self { db })
    }

    /// Store one field's vector and metadata.
    pub fn store_field(
        &self,
        entry: &FieldEntry,
        vector: &[f32],
    ) -> Result<()> {
        let key = entry_key(&entry.resume_id, entry.field);
        let json = serde_json::to_string(entry)?;

        let txn = self.db.begin_write()?;
        {
            let mut vectors = txn.open_table(FIELD_VECTORS)?;
            let mut entries = txn.open_table(FIELD_ENTRIES)?;
            vectors.insert(key.as_str(), encode_vector(vector).as_slice())?;
            entries.insert(key.as_str(), json.as_str())?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Store every embedded field of a resume in a single transaction.
    ///
    /// Fields of the resume missing from `vectors` are removed, so a
    /// re-ingested resume never keeps stale fields.
    pub fn store_resume(
        &self,
        record: &ResumeRecord,
        vectors: &[(ResumeField, Vec<f32>)],
    ) -> Result<usize> {
        let txn = self.db.begin_write()?;
        {
            let mut vector_table = txn.open_table(FIELD_VECTORS)?;
            let mut entry_table = txn.open_table(FIELD_ENTRIES)?;

            for field in ResumeField::ALL {
                let key = entry_key(&record.id, field);
                vector_table.remove(key.as_str())?;
                entry_table.remove(key.as_str())?;
            }

            for (field, vector) in vectors {
                let key = entry_key(&record.id, *field);
                let entry = FieldEntry::from_record(record, *field);
                let json = serde_json::to_string(&entry)?;
                let bytes = encode_vector(vector);
                vector_table.insert(key.as_str(), bytes.as_slice())?;
                entry_table.insert(key.as_str(), json.as_str())?;
            }
        }
        txn.commit()?;
        Ok(vectors.len())
    }

    /// Remove every field of a resume. Returns how many entries were removed.
    pub fn remove_resume(&self, resume_id: &str) -> Result<usize> {
        let txn = self.db.begin_write()?;
        let removed = {
            let mut vectors = txn.open_table(FIELD_VECTORS)?;
            let mut entries = txn.open_table(FIELD_ENTRIES)?;
            let mut removed = 0;
            for field in ResumeField::ALL {
                let key = entry_key(resume_id, field);
                vectors.remove(key.as_str())?;
                if entries.remove(key.as_str())?.is_some() {
                    removed += 1;
                }
            }
            removed
        };
        txn.commit()?;
        Ok(removed)
    }

    /// Drop all stored vectors and entries.
    pub fn reset(&self) -> Result<()> {
        let txn = self.db.begin_write()?;
        txn.delete_table(FIELD_VECTORS)?;
        txn.delete_table(FIELD_ENTRIES)?;
        txn.open_table(FIELD_VECTORS)?;
        txn.open_table(FIELD_ENTRIES)?;
        txn.commit()?;
        Ok(())
    }

    fn read_entries(
        table: &impl ReadableTable<&'static str, &'static str>,
        field: Option<ResumeField>,
    ) -> Result<Vec<(String, FieldEntry)>> {
        let suffix = field.map(|f| format!("_{f}"));
        let mut result = Vec::new();
        for item in table.iter()? {
            let (k, v) = item?;
            let key = k.value();
            if let Some(suffix) = &suffix
                && !key.ends_with(suffix.as_str())
            {
                continue;
            }
            let entry: FieldEntry = serde_json::from_str(v.value())?;
            if field.is_none_or(|f| entry.field == f) {
                result.push((key.to_string(), entry));
            }
        }
        Ok(result)
    }

    /// All entries for one field, in key order.
    pub fn entries_for_field(
        &self,
        field: ResumeField,
    ) -> Result<Vec<FieldEntry>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FIELD_ENTRIES)?;
        Ok(Self::read_entries(&table, Some(field))?
            .into_iter()
            .map(|(_, entry)| entry)
            .collect())
    }

    /// Rebuild a resume from its stored field entries.
    pub fn get_resume(&self, resume_id: &str) -> Result<Option<ResumeRecord>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FIELD_ENTRIES)?;

        let mut record: Option<ResumeRecord> = None;
        for field in ResumeField::ALL {
            let key = entry_key(resume_id, field);
            let Some(guard) = table.get(key.as_str())? else {
                continue;
            };
            let entry: FieldEntry = serde_json::from_str(guard.value())?;
            let record = record.get_or_insert_with(|| ResumeRecord {
                id: entry.resume_id.clone(),
                name: Some(entry.name.clone()),
                links: entry.links.clone(),
                confidence_score: entry.confidence_score,
                processing_timestamp: entry.processing_timestamp.clone(),
                ..Default::default()
            });
            record.set_field(field, entry.content);
        }
        Ok(record)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(FIELD_ENTRIES)?;

        let mut stats = StoreStats::default();
        let mut resumes = std::collections::BTreeSet::new();
        for (_, entry) in Self::read_entries(&table, None)? {
            stats.total_embeddings += 1;
            *stats.field_distribution.entry(entry.field).or_default() += 1;
            resumes.insert(entry.resume_id);
        }
        stats.unique_resumes = resumes.len();
        Ok(stats)
    }

    /// The `n` entries of `field` closest to `query` by cosine distance.
    ///
    /// Ties are broken by entry key. Vectors whose dimension differs from
    /// the query's are skipped.
    pub fn nearest(
        &self,
        field: ResumeField,
        query: &[f32],
        n: usize,
    ) -> Result<Vec<FieldMatch>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let txn = self.db.begin_read()?;
        let entries = txn.open_table(FIELD_ENTRIES)?;
        let vectors = txn.open_table(FIELD_VECTORS)?;

        let mut candidates = Vec::new();
        for (key, entry) in Self::read_entries(&entries, Some(field))? {
            let Some(guard) = vectors.get(key.as_str())? else {
                tracing::warn!(key = %key, "entry has no stored vector");
                continue;
            };
            match decode_vector(guard.value()) {
                Some(vector) if vector.len() == query.len() => {
                    candidates.push((key, entry, vector));
                }
                Some(vector) => tracing::warn!(
                    key = %key,
                    stored = vector.len(),
                    query = query.len(),
                    "skipping vector with mismatched dimension"
                ),
                None => tracing::warn!(key = %key, "skipping malformed vector"),
            }
        }

        let mut scored: Vec<(f64, String, FieldEntry)> = candidates
            .into_par_iter()
            .map(|(key, entry, vector)| {
                (cosine_distance(query, &vector) as f64, key, entry)
            })
            .collect();

        scored.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        scored.truncate(n);

        Ok(scored
            .into_iter()
            .map(|(distance, _, entry)| FieldMatch {
                candidate_id: entry.resume_id,
                name: entry.name,
                field: entry.field,
                content: entry.content,
                distance,
            })
            .collect())
    }
}

impl ResumeStore for VectorStore {
    fn get_full_record(&self, candidate_id: &str) -> Result<Option<ResumeRecord>> {
        self.get_resume(candidate_id)
    }
}

impl std::fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorStore").finish_non_exhaustive()
    }
}

/// Answers field queries by embedding the query text and scanning the store.
pub struct StoreOracle<'a> {
    store: &'a VectorStore,
    embedder: &'a dyn Embedder,
}

impl<'a> StoreOracle<'a> {
    pub fn new(store: &'a VectorStore, embedder: &'a dyn Embedder) -> Self {
        Self { store, embedder }
    }
}

impl SimilarityOracle for StoreOracle<'_> {
    fn query(
        &self,
        query_text: &str,
        n_results: usize,
        field: ResumeField,
    ) -> Result<Vec<FieldMatch>> {
        let query = self
            .embedder
            .embed(query_text)
            .map_err(|e| Error::Embedding(e.to_string()))?;
        self.store.nearest(field, &query, n_results)
    }
}
