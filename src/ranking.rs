use std::{cmp::Ordering, collections::BTreeMap};

use crate::{
    aggregate::CandidateScore,
    error::{Error, Result},
};

/// Number of candidates to return from a search.
///
/// Requests arrive as signed integers (CLI flags, MCP arguments); a
/// negative count is rejected rather than clamped.
///
/// # Examples
///
/// ```
/// use cvsearch::TopK;
///
/// assert_eq!(TopK::try_from(3i64).unwrap().get(), 3);
/// assert!(TopK::try_from(-1i64).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TopK(usize);

impl TopK {
    pub const DEFAULT: TopK = TopK(5);

    pub const fn new(k: usize) -> Self {
        Self(k)
    }

    pub const fn get(self) -> usize {
        self.0
    }
}

impl Default for TopK {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for TopK {
    type Error = Error;

    fn try_from(k: i64) -> Result<Self> {
        usize::try_from(k).map(TopK).map_err(|_| Error::InvalidTopK(k))
    }
}

/// Order two candidates: higher total first, then `candidate_id` ascending.
pub fn compare(a: &CandidateScore, b: &CandidateScore) -> Ordering {
    b.total_score
        .total_cmp(&a.total_score)
        .then_with(|| a.candidate_id.cmp(&b.candidate_id))
}

/// Return the best `k` candidates in descending score order.
///
/// Ties on `total_score` are broken by `candidate_id` so the output never
/// depends on map iteration order.
pub fn rank(
    records: &BTreeMap<String, CandidateScore>,
    k: TopK,
) -> Vec<CandidateScore> {
    if k.get() == 0 || records.is_empty() {
        return Vec::new();
    }

    let mut ranked: Vec<&CandidateScore> = records.values().collect();
    ranked.sort_by(|a, b| compare(a, b));
    ranked.into_iter().take(k.get()).cloned().collect()
}
