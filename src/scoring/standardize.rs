//! Filling unspecified canonical fields of kept jobs via the oracle.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::oracle::SemanticOracle;
use super::prompt::fill_prompt;
use crate::core::{JobRecord, NOT_SPECIFIED, is_unspecified};

/// Canonical fields eligible for filling, by their wire names.
pub const FILLABLE_FIELDS: [&str; 7] = [
    "job_title",
    "company",
    "experience",
    "jobNature",
    "location",
    "salary",
    "apply_link",
];

fn field_mut<'a>(job: &'a mut JobRecord, key: &str) -> Option<&'a mut String> {
    match key {
        "job_title" => Some(&mut job.job_title),
        "company" => Some(&mut job.company),
        "experience" => Some(&mut job.experience),
        "jobNature" | "job_nature" => Some(&mut job.job_nature),
        "location" => Some(&mut job.location),
        "salary" => Some(&mut job.salary),
        "apply_link" => Some(&mut job.apply_link),
        _ => None,
    }
}

fn field<'a>(job: &'a JobRecord, key: &str) -> &'a str {
    match key {
        "job_title" => &job.job_title,
        "company" => &job.company,
        "experience" => &job.experience,
        "jobNature" => &job.job_nature,
        "location" => &job.location,
        "salary" => &job.salary,
        "apply_link" => &job.apply_link,
        _ => "",
    }
}

/// Fillable fields that are blank or hold a sentinel.
#[must_use]
pub fn missing_fields(job: &JobRecord) -> Vec<&'static str> {
    FILLABLE_FIELDS
        .into_iter()
        .filter(|key| is_unspecified(field(job, key)))
        .collect()
}

/// Write oracle-supplied values into `job`.
///
/// Only keys in `missing` are applied; `jobNature` may also arrive as
/// `job_nature`.
pub fn apply_fills(job: &mut JobRecord, missing: &[&str], filled: &Map<String, Value>) {
    for (key, value) in filled {
        let canonical = if key == "job_nature" { "jobNature" } else { key.as_str() };
        if !missing.contains(&canonical) {
            continue;
        }
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        if let Some(slot) = field_mut(job, canonical) {
            *slot = if text.is_empty() {
                NOT_SPECIFIED.to_string()
            } else {
                text
            };
        }
    }
}

fn mark_unspecified(job: &mut JobRecord, missing: &[&str]) {
    for key in missing {
        if let Some(slot) = field_mut(job, key) {
            *slot = NOT_SPECIFIED.to_string();
        }
    }
}

/// Ask the oracle once for every missing field of `job`.
///
/// On any oracle failure each missing field becomes `Not specified`.
/// Returns whether an oracle call was made.
pub async fn standardize(job: &mut JobRecord, oracle: &dyn SemanticOracle) -> bool {
    let missing = missing_fields(job);
    if missing.is_empty() {
        return false;
    }
    debug!(target: "scoring", title = %job.job_title, ?missing, "filling missing fields");

    match oracle.fill_missing_fields(&fill_prompt(job, &missing)).await {
        Ok(filled) => apply_fills(job, &missing, &filled),
        Err(err) => {
            warn!(target: "scoring", title = %job.job_title, error = %err, "field fill failed");
            mark_unspecified(job, &missing);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::json;

    use super::*;
    use crate::core::SourceKind;
    use crate::test_utils::fixtures::StubOracle;

    fn sparse_job() -> JobRecord {
        JobRecord {
            job_title: "Rust Developer".to_string(),
            company: "Acme".to_string(),
            experience: "Not specified".to_string(),
            job_nature: "Remote".to_string(),
            location: "Lahore".to_string(),
            salary: "N/A".to_string(),
            apply_link: String::new(),
            source: SourceKind::Rozee,
            relevance_score: Some(0.8),
            posted_date: None,
            description: None,
            extras: BTreeMap::new(),
        }
    }

    #[test]
    fn detects_blank_and_sentinel_fields() {
        assert_eq!(missing_fields(&sparse_job()), ["experience", "salary", "apply_link"]);
    }

    #[test]
    fn applies_only_requested_fields() {
        let mut job = sparse_job();
        let filled = json!({
            "salary": "PKR 120,000 per month",
            "company": "Someone Else",
            "job_nature": "Hybrid",
            "experience": ""
        });
        let missing = ["salary", "experience"];
        apply_fills(&mut job, &missing, filled.as_object().unwrap());

        assert_eq!(job.salary, "PKR 120,000 per month");
        assert_eq!(job.company, "Acme");
        assert_eq!(job.job_nature, "Remote");
        assert_eq!(job.experience, "Not specified");
    }

    #[tokio::test]
    async fn oracle_answer_fills_fields() {
        let oracle = StubOracle::new().with_fill(r#"```json
{"experience": "3 years", "salary": "Not specified", "apply_link": "https://rozee.example/9"}
```"#);
        let mut job = sparse_job();
        assert!(standardize(&mut job, &oracle).await);

        assert_eq!(job.experience, "3 years");
        assert_eq!(job.salary, "Not specified");
        assert_eq!(job.apply_link, "https://rozee.example/9");
        assert_eq!(oracle.calls(), 1);
    }

    #[tokio::test]
    async fn unparsable_answer_marks_fields_unspecified() {
        let oracle = StubOracle::new().with_fill("I could not find these.");
        let mut job = sparse_job();
        standardize(&mut job, &oracle).await;

        assert_eq!(job.experience, NOT_SPECIFIED);
        assert_eq!(job.salary, NOT_SPECIFIED);
        assert_eq!(job.apply_link, NOT_SPECIFIED);
    }

    #[tokio::test]
    async fn complete_job_skips_the_oracle() {
        let oracle = StubOracle::new();
        let mut job = sparse_job();
        job.experience = "2 years".to_string();
        job.salary = "USD 1".to_string();
        job.apply_link = "https://x".to_string();
        assert!(!standardize(&mut job, &oracle).await);
        assert_eq!(oracle.calls(), 0);
    }
}
