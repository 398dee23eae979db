use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    field::ResumeField,
    scoring::similarity,
    text_util::{EXCERPT_CHARS, excerpt},
    weights::FieldWeights,
};

/// One nearest-neighbour hit for a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMatch {
    pub candidate_id: String,
    /// Display name; never used for identity.
    pub name: String,
    pub field: ResumeField,
    pub content: String,
    /// Cosine distance in `[0, 2]`, lower is closer.
    pub distance: f64,
}

/// Per-field result lists for one query, iterated in configured field order.
pub type FieldResults = BTreeMap<ResumeField, Vec<FieldMatch>>;

/// A candidate's merged scores across every field it matched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub candidate_id: String,
    pub name: String,
    /// Best similarity seen per field, in `[0, 1]`.
    pub field_scores: BTreeMap<ResumeField, f64>,
    /// Excerpt of the content that produced each best similarity.
    pub field_excerpts: BTreeMap<ResumeField, String>,
    pub total_score: f64,
    pub fields_matched: usize,
}

impl CandidateScore {
    fn new(candidate_id: &str, name: &str) -> Self {
        Self {
            candidate_id: candidate_id.to_string(),
            name: name.to_string(),
            field_scores: BTreeMap::new(),
            field_excerpts: BTreeMap::new(),
            total_score: 0.0,
            fields_matched: 0,
        }
    }

    /// Record a match, keeping it only if it beats the stored one.
    fn observe(&mut self, field: ResumeField, sim: f64, content: &str) {
        let better = self
            .field_scores
            .get(&field)
            .is_none_or(|&current| sim > current);
        if better {
            self.field_scores.insert(field, sim);
            self.field_excerpts
                .insert(field, excerpt(content, EXCERPT_CHARS));
        }
    }

    fn finalize(&mut self, weights: &FieldWeights) {
        self.total_score = self
            .field_scores
            .iter()
            .map(|(&field, &score)| score * weights.get(field))
            .sum();
        self.fields_matched = self.field_scores.len();
    }

    /// Weighted contribution of one field to the total.
    pub fn contribution(&self, field: ResumeField, weights: &FieldWeights) -> f64 {
        self.field_scores
            .get(&field)
            .map_or(0.0, |score| score * weights.get(field))
    }
}

/// Merge per-field matches into one record per candidate.
///
/// Each match is scored under the field of the list it was returned in.
/// Candidates are created on first sighting, so a candidate with no match
/// in any field never appears.
pub fn aggregate(
    results: &FieldResults,
    weights: &FieldWeights,
) -> BTreeMap<String, CandidateScore> {
    let mut candidates: BTreeMap<String, CandidateScore> = BTreeMap::new();

    for (&field, matches) in results {
        for m in matches {
            let sim = similarity(m.distance);
            candidates
                .entry(m.candidate_id.clone())
                .or_insert_with(|| CandidateScore::new(&m.candidate_id, &m.name))
                .observe(field, sim, &m.content);
        }
    }

    for candidate in candidates.values_mut() {
        candidate.finalize(weights);
        tracing::trace!(
            candidate = %candidate.candidate_id,
            total = candidate.total_score,
            fields = candidate.fields_matched,
            "aggregated candidate"
        );
    }

    candidates
}

#[cfg(test)]
pub(crate) mod tests {
    use proptest::prelude::*;

    use super::*;

    pub(crate) fn hit(
        id: &str,
        field: ResumeField,
        distance: f64,
        content: &str,
    ) -> FieldMatch {
        FieldMatch {
            candidate_id: id.to_string(),
            name: format!("Candidate {id}"),
            field,
            content: content.to_string(),
            distance,
        }
    }

    #[test]
    fn weighted_total_for_two_fields() {
        let mut results = FieldResults::new();
        results.insert(
            ResumeField::Skills,
            vec![hit("x", ResumeField::Skills, 0.2, "Rust, Python")],
        );
        results.insert(
            ResumeField::Summary,
            vec![hit("x", ResumeField::Summary, 0.4, "Backend engineer")],
        );

        let candidates = aggregate(&results, &FieldWeights::default());
        let x = &candidates["x"];

        assert_eq!(x.fields_matched, 2);
        assert!((x.total_score - 0.51).abs() < 1e-9);
        assert!((x.field_scores[&ResumeField::Skills] - 0.9).abs() < 1e-9);
        assert!((x.field_scores[&ResumeField::Summary] - 0.8).abs() < 1e-9);
    }

    #[test]
    fn keeps_best_match_per_field() {
        let mut results = FieldResults::new();
        results.insert(
            ResumeField::Skills,
            vec![
                hit("x", ResumeField::Skills, 1.0, "worse"),
                hit("x", ResumeField::Skills, 0.2, "better"),
                hit("x", ResumeField::Skills, 0.6, "middle"),
            ],
        );

        let candidates = aggregate(&results, &FieldWeights::default());
        let x = &candidates["x"];

        assert!((x.field_scores[&ResumeField::Skills] - 0.9).abs() < 1e-9);
        assert_eq!(x.field_excerpts[&ResumeField::Skills], "better");
        assert_eq!(x.fields_matched, 1);
    }

    #[test]
    fn equal_similarity_keeps_first_seen() {
        let mut results = FieldResults::new();
        results.insert(
            ResumeField::Education,
            vec![
                hit("x", ResumeField::Education, 0.5, "first"),
                hit("x", ResumeField::Education, 0.5, "second"),
            ],
        );

        let candidates = aggregate(&results, &FieldWeights::default());
        assert_eq!(
            candidates["x"].field_excerpts[&ResumeField::Education],
            "first"
        );
    }

    #[test]
    fn empty_field_creates_no_candidates() {
        let mut results = FieldResults::new();
        results.insert(ResumeField::Summary, Vec::new());
        results.insert(ResumeField::Skills, Vec::new());

        assert!(aggregate(&results, &FieldWeights::default()).is_empty());
    }

    #[test]
    fn name_comes_from_first_sighting() {
        let mut results = FieldResults::new();
        let mut renamed = hit("x", ResumeField::Skills, 0.1, "Go");
        renamed.name = "Later Name".to_string();
        results.insert(
            ResumeField::Summary,
            vec![hit("x", ResumeField::Summary, 0.3, "SRE")],
        );
        results.insert(ResumeField::Skills, vec![renamed]);

        let candidates = aggregate(&results, &FieldWeights::default());
        assert_eq!(candidates["x"].name, "Candidate x");
        assert_eq!(candidates["x"].fields_matched, 2);
    }

    #[test]
    fn long_content_is_excerpted() {
        let long = "k".repeat(400);
        let mut results = FieldResults::new();
        results.insert(
            ResumeField::WorkHistory,
            vec![hit("x", ResumeField::WorkHistory, 0.0, &long)],
        );

        let candidates = aggregate(&results, &FieldWeights::default());
        let excerpt = &candidates["x"].field_excerpts[&ResumeField::WorkHistory];
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS + 3);
    }

    #[test]
    fn contribution_of_unmatched_field_is_zero() {
        let mut results = FieldResults::new();
        results.insert(
            ResumeField::Skills,
            vec![hit("x", ResumeField::Skills, 0.0, "C++")],
        );
        let weights = FieldWeights::default();
        let candidates = aggregate(&results, &weights);

        assert_eq!(candidates["x"].contribution(ResumeField::Education, &weights), 0.0);
        assert!(
            (candidates["x"].contribution(ResumeField::Skills, &weights) - 0.30).abs()
                < 1e-9
        );
    }

    fn arb_results() -> impl Strategy<Value = FieldResults> {
        let one_field = prop::collection::vec(
            (0u8..6, 0.0f64..3.0).prop_map(|(id, d)| (format!("c{id}"), d)),
            0..8,
        );
        prop::collection::vec(one_field, ResumeField::ALL.len()).prop_map(
            |lists| {
                ResumeField::ALL
                    .into_iter()
                    .zip(lists)
                    .map(|(field, hits)| {
                        let matches = hits
                            .into_iter()
                            .map(|(id, d)| hit(&id, field, d, "text"))
                            .collect();
                        (field, matches)
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn total_is_weighted_sum_and_bounded(results in arb_results()) {
            let weights = FieldWeights::default();
            let candidates = aggregate(&results, &weights);

            for c in candidates.values() {
                let expected: f64 = c
                    .field_scores
                    .iter()
                    .map(|(&f, &s)| s * weights.get(f))
                    .sum();
                prop_assert!((c.total_score - expected).abs() < 1e-12);
                prop_assert!(c.total_score <= weights.sum() + 1e-12);
                prop_assert!(c.fields_matched >= 1);
                prop_assert!(c.fields_matched <= ResumeField::ALL.len());
                prop_assert_eq!(c.fields_matched, c.field_scores.len());
            }
        }

        #[test]
        fn every_candidate_was_returned_by_some_field(results in arb_results()) {
            let candidates = aggregate(&results, &FieldWeights::default());
            for id in candidates.keys() {
                prop_assert!(
                    results.values().flatten().any(|m| &m.candidate_id == id)
                );
            }
        }
    }
}
