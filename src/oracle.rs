//! Collaborators the retrieval engine depends on.

use crate::{
    aggregate::FieldMatch,
    error::Result,
    field::ResumeField,
    resume::ResumeRecord,
};

/// Nearest-neighbour search over one resume field.
///
/// Implementations return at most `n_results` matches for `field`, ordered
/// by their own notion of relevance (ascending distance is expected but not
/// relied upon). An empty list is a valid answer.
pub trait SimilarityOracle: Send + Sync {
    fn query(
        &self,
        query_text: &str,
        n_results: usize,
        field: ResumeField,
    ) -> Result<Vec<FieldMatch>>;
}

/// Full-record lookup used to decorate ranked results for display.
pub trait ResumeStore {
    fn get_full_record(&self, candidate_id: &str) -> Result<Option<ResumeRecord>>;
}

impl<T: SimilarityOracle + ?Sized> SimilarityOracle for &T {
    fn query(
        &self,
        query_text: &str,
        n_results: usize,
        field: ResumeField,
    ) -> Result<Vec<FieldMatch>> {
        (**self).query(query_text, n_results, field)
    }
}
