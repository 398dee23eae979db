use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One independently embedded section of a resume.
///
/// The declaration order is the configured field order: searches query the
/// fields in this order and aggregation walks them in this order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ResumeField {
    Summary,
    Skills,
    WorkHistory,
    ProjectHistory,
    Education,
}

impl ResumeField {
    /// Every field, in configured order.
    pub const ALL: [ResumeField; 5] = [
        ResumeField::Summary,
        ResumeField::Skills,
        ResumeField::WorkHistory,
        ResumeField::ProjectHistory,
        ResumeField::Education,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResumeField::Summary => "summary",
            ResumeField::Skills => "skills",
            ResumeField::WorkHistory => "work_history",
            ResumeField::ProjectHistory => "project_history",
            ResumeField::Education => "education",
        }
    }

    /// Title-cased label for terminal output ("Work History").
    pub fn label(self) -> &'static str {
        match self {
            ResumeField::Summary => "Summary",
            ResumeField::Skills => "Skills",
            ResumeField::WorkHistory => "Work History",
            ResumeField::ProjectHistory => "Project History",
            ResumeField::Education => "Education",
        }
    }
}

impl fmt::Display for ResumeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResumeField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ResumeField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| Error::NotFound {
                kind: "resume field",
                name: s.to_string(),
            })
    }
}
