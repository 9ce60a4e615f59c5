//! Job records: the raw per-source shape and the canonical schema.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HuntError;

/// Placeholder for any field a source did not provide.
pub const NOT_SPECIFIED: &str = "Not specified";
/// Placeholder for a missing apply link.
pub const NOT_AVAILABLE: &str = "N/A";
pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Values that count as "the source did not really say".
const SENTINELS: &[&str] = &[NOT_SPECIFIED, "Not Specified", NOT_AVAILABLE];

/// Returns true if a field value is empty or one of the unspecified sentinels.
#[must_use]
pub fn is_unspecified(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || SENTINELS.contains(&trimmed)
}

/// One of the external job sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SourceKind {
    #[serde(rename = "Indeed")]
    Indeed,
    #[serde(rename = "LinkedIn")]
    LinkedIn,
    #[serde(rename = "Rozee.pk")]
    Rozee,
}

impl SourceKind {
    pub const ALL: [Self; 3] = [Self::Indeed, Self::LinkedIn, Self::Rozee];

    /// Display name used in records and prompts.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Indeed => "Indeed",
            Self::LinkedIn => "LinkedIn",
            Self::Rozee => "Rozee.pk",
        }
    }

    /// Short lowercase key used in configuration.
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Indeed => "indeed",
            Self::LinkedIn => "linkedin",
            Self::Rozee => "rozee",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for SourceKind {
    type Err = HuntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "indeed" => Ok(Self::Indeed),
            "linkedin" => Ok(Self::LinkedIn),
            "rozee" | "rozee.pk" => Ok(Self::Rozee),
            other => Err(HuntError::Config(format!(
                "unknown job source {other} (expected indeed|linkedin|rozee)"
            ))),
        }
    }
}

/// A posting exactly as one source delivered it.
///
/// Only that source's normalizer interprets the field names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRecord(Map<String, Value>);

impl RawRecord {
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Build a record from a JSON value; anything but an object is rejected.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Text value of a field.
    ///
    /// Null, blank strings and the literal `nan` are treated as absent.
    /// Numbers and booleans are rendered; arrays of scalars are joined with
    /// `", "`.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<String> {
        let rendered = match self.0.get(key)? {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.trim().to_string()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            Value::Null | Value::Object(_) => return None,
        };
        if rendered.is_empty() || rendered.eq_ignore_ascii_case("nan") {
            None
        } else {
            Some(rendered)
        }
    }

    /// Numeric value of a field, accepting numeric strings.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        let value = match self.0.get(key)? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The canonical job record every source is mapped into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_title: String,
    pub company: String,
    pub experience: String,
    #[serde(rename = "jobNature")]
    pub job_nature: String,
    pub location: String,
    pub salary: String,
    pub apply_link: String,
    pub source: SourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Source-specific fields carried through for prompts and display.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extras: BTreeMap<String, String>,
}

impl JobRecord {
    #[must_use]
    pub fn extra(&self, key: &str) -> &str {
        self.extras.get(key).map_or("", String::as_str)
    }

    /// Text to match skills against: the description, or the full details
    /// block for sources that only provide that.
    #[must_use]
    pub fn searchable_text(&self) -> &str {
        match self.description.as_deref() {
            Some(text) if !text.trim().is_empty() => text,
            _ => self.extra("full_details"),
        }
    }

    /// Key used to drop the same posting arriving through two sources.
    /// `None` when title, company or location is a placeholder filled in
    /// during normalization (`fallback_location` is the one used there).
    #[must_use]
    pub fn dedup_key(&self, fallback_location: &str) -> Option<String> {
        if self.job_title == UNKNOWN_TITLE
            || self.company == UNKNOWN_COMPANY
            || self.location.trim().eq_ignore_ascii_case(fallback_location.trim())
        {
            return None;
        }
        let key = [&self.job_title, &self.company, &self.location]
            .iter()
            .map(|part| {
                part.split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase()
            })
            .collect::<Vec<_>>()
            .join("|");
        Some(key)
    }
}

/// A job after relevance scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredJobRecord {
    #[serde(flatten)]
    pub job: JobRecord,
    pub basic_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_score: Option<f64>,
    #[serde(skip)]
    pub included: bool,
}

impl ScoredJobRecord {
    /// Final relevance score (always set once scored).
    #[must_use]
    pub fn score(&self) -> f64 {
        self.job.relevance_score.unwrap_or(self.basic_score)
    }
}
