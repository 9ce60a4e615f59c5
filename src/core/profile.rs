//! Search profiles and their cache fingerprint.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{HuntError, Result};

/// Search request as it arrives from a caller (CLI flags or JSON).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub position: String,
    #[serde(default)]
    pub experience: String,
    #[serde(default)]
    pub salary: String,
    #[serde(rename = "jobNature", alias = "job_nature")]
    pub job_nature: String,
    pub location: String,
    /// Comma-delimited skill tokens.
    #[serde(default)]
    pub skills: String,
}

/// A validated, immutable search profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchProfile {
    position: String,
    experience: String,
    salary: String,
    job_nature: String,
    location: String,
    skills: Vec<String>,
}

impl SearchProfile {
    /// Validate a request and qualify its location with `default_country`
    /// when it carries no country suffix.
    pub fn from_request(request: SearchRequest, default_country: &str) -> Result<Self> {
        let position = required("position", &request.position)?;
        let job_nature = required("jobNature", &request.job_nature)?;
        let location = required("location", &request.location)?;

        let location = if location.contains(',') || default_country.trim().is_empty() {
            location
        } else {
            format!("{location}, {}", default_country.trim())
        };

        Ok(Self {
            position,
            experience: request.experience.trim().to_string(),
            salary: request.salary.trim().to_string(),
            job_nature,
            location,
            skills: parse_skills(&request.skills),
        })
    }

    #[must_use]
    pub fn position(&self) -> &str {
        &self.position
    }

    #[must_use]
    pub fn experience(&self) -> &str {
        &self.experience
    }

    #[must_use]
    pub fn salary(&self) -> &str {
        &self.salary
    }

    #[must_use]
    pub fn job_nature(&self) -> &str {
        &self.job_nature
    }

    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    #[must_use]
    pub fn skills(&self) -> &[String] {
        &self.skills
    }

    /// City part of the location (text before the first comma).
    #[must_use]
    pub fn city(&self) -> &str {
        self.location.split(',').next().unwrap_or("").trim()
    }

    /// Country part of the location (text after the last comma).
    #[must_use]
    pub fn country(&self) -> &str {
        self.location
            .rsplit(',')
            .next()
            .unwrap_or(&self.location)
            .trim()
    }

    /// Cache key over position, location and job nature.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.position, &self.location, &self.job_nature)
    }
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(HuntError::ValidationFailed(format!(
            "{field} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_skills(raw: &str) -> Vec<String> {
    let mut skills: Vec<String> = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !skills.iter().any(|s| s.eq_ignore_ascii_case(token)) {
            skills.push(token.to_string());
        }
    }
    skills
}

/// Deterministic cache key for a search.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    #[must_use]
    pub fn of(position: &str, location: &str, job_nature: &str) -> Self {
        let mut hasher = Sha256::new();
        for part in [position, location, job_nature] {
            hasher.update(part.trim().to_lowercase().as_bytes());
            hasher.update([0x1f]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for logs.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
