use std::{
    collections::BTreeMap,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

use crate::{
    error::{Error, Result},
    field::ResumeField,
};

/// A structured resume as produced by field extraction.
///
/// This is the shape of one line in the JSONL files accepted by
/// `cvsearch ingest`. Only `id` and the five searchable fields matter for
/// retrieval; the rest is carried through for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeRecord {
    pub id: String,
    pub name: Option<String>,
    pub summary: String,
    pub skills: String,
    pub work_history: String,
    pub project_history: String,
    pub education: String,
    /// Professional links by kind (linkedin, github, personal_website, email).
    pub links: BTreeMap<String, Option<String>>,
    pub confidence_score: Option<f64>,
    pub processing_timestamp: Option<String>,
}

impl ResumeRecord {
    pub fn field(&self, field: ResumeField) -> &str {
        match field {
            ResumeField::Summary => &self.summary,
            ResumeField::Skills => &self.skills,
            ResumeField::WorkHistory => &self.work_history,
            ResumeField::ProjectHistory => &self.project_history,
            ResumeField::Education => &self.education,
        }
    }

    pub fn set_field(&mut self, field: ResumeField, value: String) {
        let slot = match field {
            ResumeField::Summary => &mut self.summary,
            ResumeField::Skills => &mut self.skills,
            ResumeField::WorkHistory => &mut self.work_history,
            ResumeField::ProjectHistory => &mut self.project_history,
            ResumeField::Education => &mut self.education,
        };
        *slot = value;
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown")
    }

    /// Fields with non-blank content, in configured order.
    pub fn embeddable_fields(&self) -> impl Iterator<Item = (ResumeField, &str)> {
        ResumeField::ALL
            .into_iter()
            .map(|f| (f, self.field(f)))
            .filter(|(_, text)| !text.trim().is_empty())
    }

    /// Parse one JSONL line. A blank `id` is replaced by a stable id derived
    /// from the record's content.
    pub fn from_json_line(line: &str) -> Result<Self> {
        let mut record: ResumeRecord = serde_json::from_str(line)?;
        record.id = record.id.trim().to_string();
        if record.id.is_empty() {
            record.id = record.content_id();
        }
        Ok(record)
    }

    fn content_id(&self) -> String {
        let mut hasher = SipHasher13::new_with_keys(0, 0);
        self.name.hash(&mut hasher);
        for field in ResumeField::ALL {
            self.field(field).hash(&mut hasher);
        }
        format!("resume-{:016x}", hasher.finish())
    }
}

/// Read every record from a JSONL string, returning per-line outcomes.
///
/// Blank lines are skipped. Line numbers are 1-indexed.
pub fn parse_jsonl(contents: &str) -> Vec<(usize, Result<ResumeRecord>)> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let parsed = ResumeRecord::from_json_line(line.trim()).map_err(|e| {
                Error::Config(format!("line {}: {e}", idx + 1))
            });
            (idx + 1, parsed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = r#"{"id":"r1","name":"Ada Lovelace","summary":"Mathematician and writer.","skills":"Analysis, notes","work_history":"Analytical Engine (1843)","project_history":"Bernoulli numbers program","education":"Private tutoring","links":{"github":null}}"#;

    #[test]
    fn parses_full_line() {
        let record = ResumeRecord::from_json_line(LINE).unwrap();
        assert_eq!(record.id, "r1");
        assert_eq!(record.display_name(), "Ada Lovelace");
        assert_eq!(record.field(ResumeField::Skills), "Analysis, notes");
        assert_eq!(record.links.get("github"), Some(&None));
    }

    #[test]
    fn missing_id_gets_stable_generated_id() {
        let line = r#"{"summary":"Data engineer","skills":"Spark"}"#;
        let a = ResumeRecord::from_json_line(line).unwrap();
        let b = ResumeRecord::from_json_line(line).unwrap();
        assert!(a.id.starts_with("resume-"));
        assert_eq!(a.id, b.id);

        let other = ResumeRecord::from_json_line(r#"{"summary":"Designer"}"#).unwrap();
        assert_ne!(a.id, other.id);
    }

    #[test]
    fn embeddable_fields_skip_blank_content() {
        let record = ResumeRecord {
            id: "r".into(),
            summary: "Engineer".into(),
            skills: "   ".into(),
            education: "BSc".into(),
            ..Default::default()
        };
        let fields: Vec<_> = record.embeddable_fields().map(|(f, _)| f).collect();
        assert_eq!(fields, [ResumeField::Summary, ResumeField::Education]);
    }

    #[test]
    fn parse_jsonl_reports_bad_lines() {
        let contents = format!("{LINE}\n\nnot json\n");
        let parsed = parse_jsonl(&contents);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].0, 1);
        assert!(parsed[0].1.is_ok());
        assert_eq!(parsed[1].0, 3);
        assert!(parsed[1].1.is_err());
    }

    #[test]
    fn set_field_roundtrip() {
        let mut record = ResumeRecord::default();
        record.set_field(ResumeField::ProjectHistory, "Compiler".into());
        assert_eq!(record.field(ResumeField::ProjectHistory), "Compiler");
        assert_eq!(record.display_name(), "Unknown");
    }
}
