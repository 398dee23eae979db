use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;

use crate::{
    aggregate::{self, CandidateScore, FieldResults},
    error::{Error, Result},
    field::ResumeField,
    oracle::{ResumeStore, SimilarityOracle},
    ranking::{self, TopK},
    resume::ResumeRecord,
    weights::FieldWeights,
};

/// Matches requested from the oracle for each field. High enough that a
/// candidate's best match in a field is rarely cut before aggregation.
pub const DEFAULT_PER_FIELD_CAP: usize = 40;

/// Multi-field weighted resume search.
///
/// Every search queries the oracle once per field, merges the per-field
/// matches into one record per candidate and ranks candidates by their
/// weighted total. Nothing is cached between searches.
#[derive(Debug, Clone)]
pub struct ResumeSearchEngine<O> {
    oracle: O,
    weights: FieldWeights,
    per_field_cap: usize,
}

impl<O: SimilarityOracle> ResumeSearchEngine<O> {
    pub fn new(oracle: O, weights: FieldWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self {
            oracle,
            weights,
            per_field_cap: DEFAULT_PER_FIELD_CAP,
        })
    }

    pub fn with_per_field_cap(mut self, cap: usize) -> Self {
        self.per_field_cap = cap;
        self
    }

    pub fn weights(&self) -> &FieldWeights {
        &self.weights
    }

    pub fn per_field_cap(&self) -> usize {
        self.per_field_cap
    }

    /// Run one oracle query per field in parallel.
    ///
    /// Fails if any field fails; the reported field is the first failing
    /// one in configured order.
    pub fn fetch(&self, query: &str) -> Result<FieldResults> {
        let outcomes: Vec<(ResumeField, Result<_>)> = ResumeField::ALL
            .par_iter()
            .map(|&field| {
                let matches = self.oracle.query(query, self.per_field_cap, field);
                (field, matches)
            })
            .collect();

        let mut results = BTreeMap::new();
        for (field, outcome) in outcomes {
            let matches = outcome.map_err(|e| match e {
                Error::OracleQuery { .. } => e,
                other => Error::OracleQuery {
                    field,
                    message: other.to_string(),
                },
            })?;
            tracing::debug!(%field, matches = matches.len(), "field query done");
            results.insert(field, matches);
        }
        Ok(results)
    }

    /// Search every field for `query` and return the best `k` candidates.
    pub fn search(&self, query: &str, k: TopK) -> Result<Vec<CandidateScore>> {
        let results = self.fetch(query)?;
        let candidates = aggregate::aggregate(&results, &self.weights);
        let ranked = ranking::rank(&candidates, k);

        tracing::info!(
            query,
            candidates = candidates.len(),
            returned = ranked.len(),
            "search complete"
        );
        Ok(ranked)
    }
}

/// A ranked candidate decorated with its full resume for display.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedCandidate {
    #[serde(flatten)]
    pub candidate: CandidateScore,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<ResumeRecord>,
    /// Set when the full record could not be fetched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<CandidateScore> for EnrichedCandidate {
    fn from(candidate: CandidateScore) -> Self {
        Self {
            candidate,
            record: None,
            warning: None,
        }
    }
}

/// Attach full records to ranked candidates.
///
/// Lookup failures never drop a candidate: the entry keeps its scores and
/// carries a warning instead.
pub fn enrich<S: ResumeStore + ?Sized>(
    ranked: Vec<CandidateScore>,
    store: &S,
) -> Vec<EnrichedCandidate> {
    ranked
        .into_iter()
        .map(|candidate| {
            let (record, warning) = match store.get_full_record(&candidate.candidate_id)
            {
                Ok(Some(record)) => (Some(record), None),
                Ok(None) => (None, Some("full record not found".to_string())),
                Err(e) => {
                    tracing::warn!(
                        candidate = %candidate.candidate_id,
                        error = %e,
                        "failed to load full record"
                    );
                    (None, Some(e.to_string()))
                }
            };
            EnrichedCandidate {
                candidate,
                record,
                warning,
            }
        })
        .collect()
}
