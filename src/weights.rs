use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    field::ResumeField,
};

/// Relative importance of each resume field in the combined score.
///
/// Weights do not have to sum to 1; a candidate's total score is bounded by
/// [`FieldWeights::sum`]. The default table sums to 1.0.
///
/// # Examples
///
/// ```
/// use cvsearch::{FieldWeights, ResumeField};
///
/// let weights = FieldWeights::default();
/// assert_eq!(weights.get(ResumeField::Skills), 0.30);
/// assert!((weights.sum() - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldWeights {
    pub summary: f64,
    pub skills: f64,
    pub work_history: f64,
    pub project_history: f64,
    pub education: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            summary: 0.30,
            skills: 0.30,
            work_history: 0.25,
            project_history: 0.10,
            education: 0.05,
        }
    }
}

impl FieldWeights {
    pub fn get(&self, field: ResumeField) -> f64 {
        match field {
            ResumeField::Summary => self.summary,
            ResumeField::Skills => self.skills,
            ResumeField::WorkHistory => self.work_history,
            ResumeField::ProjectHistory => self.project_history,
            ResumeField::Education => self.education,
        }
    }

    /// Return a copy with one weight replaced, rejecting negative or
    /// non-finite values.
    pub fn with(mut self, field: ResumeField, value: f64) -> Result<Self> {
        check_weight(field, value)?;
        let slot = match field {
            ResumeField::Summary => &mut self.summary,
            ResumeField::Skills => &mut self.skills,
            ResumeField::WorkHistory => &mut self.work_history,
            ResumeField::ProjectHistory => &mut self.project_history,
            ResumeField::Education => &mut self.education,
        };
        *slot = value;
        Ok(self)
    }

    /// Upper bound of any candidate's total score.
    pub fn sum(&self) -> f64 {
        ResumeField::ALL.iter().map(|&f| self.get(f)).sum()
    }

    pub fn validate(&self) -> Result<()> {
        for field in ResumeField::ALL {
            check_weight(field, self.get(field))?;
        }
        Ok(())
    }

    /// Parse a JSON object keyed by field name. Missing fields keep their
    /// default weight; unknown keys are an error.
    pub fn from_json(json: &str) -> Result<Self> {
        let weights: FieldWeights = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid field weights: {e}")))?;
        weights.validate()?;
        Ok(weights)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read weights file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn check_weight(field: ResumeField, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidWeight { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_sum_to_one() {
        assert!((FieldWeights::default().sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let weights = FieldWeights::from_json(r#"{"skills": 0.5}"#).unwrap();
        assert_eq!(weights.skills, 0.5);
        assert_eq!(weights.summary, 0.30);
        assert_eq!(weights.education, 0.05);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = FieldWeights::from_json(r#"{"hobbies": 0.5}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = FieldWeights::from_json(r#"{"education": -0.1}"#).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidWeight {
                field: ResumeField::Education,
                ..
            }
        ));
    }

    #[test]
    fn with_replaces_single_weight() {
        let weights = FieldWeights::default()
            .with(ResumeField::WorkHistory, 1.0)
            .unwrap();
        assert_eq!(weights.work_history, 1.0);
        assert_eq!(weights.skills, 0.30);
        assert!(
            FieldWeights::default()
                .with(ResumeField::Skills, f64::NAN)
                .is_err()
        );
    }

    #[test]
    fn json_roundtrip() {
        let weights = FieldWeights::default()
            .with(ResumeField::Summary, 0.7)
            .unwrap();
        let restored = FieldWeights::from_json(&weights.to_json().unwrap()).unwrap();
        assert_eq!(weights, restored);
    }

    #[test]
    fn load_from_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("weights.json");
        std::fs::write(&path, r#"{"summary": 1.0, "skills": 0.0}"#).unwrap();

        let weights = FieldWeights::load(&path).unwrap();
        assert_eq!(weights.summary, 1.0);
        assert_eq!(weights.skills, 0.0);

        assert!(FieldWeights::load(&tmp.path().join("missing.json")).is_err());
    }
}
