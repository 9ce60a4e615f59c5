//! Stage 1: cheap keyword relevance.
//!
//! Points are kept in whole hundredths so the sum never drifts.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::core::{JobRecord, SearchProfile};

static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("leading number pattern"));

const TITLE_POINTS: u32 = 30;
const LOCATION_POINTS: u32 = 10;
const NATURE_POINTS: u32 = 10;
const EXPERIENCE_POINTS: u32 = 10;
const POINTS_PER_SKILL: u32 = 5;
const MAX_SKILL_POINTS: u32 = 40;
const MAX_POINTS: u32 = 100;

/// Which stage 1 checks matched, for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BasicMatch {
    pub title: bool,
    pub location: bool,
    pub job_nature: bool,
    pub experience: bool,
    pub skills: u32,
}

impl BasicMatch {
    /// Total in hundredths, capped at 100.
    #[must_use]
    pub fn points(&self) -> u32 {
        let mut points = 0;
        if self.title {
            points += TITLE_POINTS;
        }
        if self.location {
            points += LOCATION_POINTS;
        }
        if self.job_nature {
            points += NATURE_POINTS;
        }
        if self.experience {
            points += EXPERIENCE_POINTS;
        }
        points += self.skills.saturating_mul(POINTS_PER_SKILL).min(MAX_SKILL_POINTS);
        points.min(MAX_POINTS)
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        f64::from(self.points()) / 100.0
    }
}

/// Evaluate every stage 1 check of `job` against `profile`.
#[must_use]
pub fn match_job(job: &JobRecord, profile: &SearchProfile) -> BasicMatch {
    let text = job.searchable_text().to_lowercase();
    let skills = profile
        .skills()
        .iter()
        .filter(|skill| text.contains(&skill.to_lowercase()))
        .count();

    BasicMatch {
        title: contains_ci(&job.job_title, profile.position()),
        location: contains_ci(&job.location, profile.city()),
        job_nature: contains_ci(&job.job_nature, profile.job_nature()),
        experience: experience_close(&job.experience, profile.experience()),
        skills: u32::try_from(skills).unwrap_or(u32::MAX),
    }
}

/// Stage 1 score in `[0, 1]`.
#[must_use]
pub fn basic_score(job: &JobRecord, profile: &SearchProfile) -> f64 {
    let matched = match_job(job, profile);
    debug!(
        target: "scoring",
        title = %job.job_title,
        title_match = matched.title,
        location_match = matched.location,
        nature_match = matched.job_nature,
        experience_match = matched.experience,
        skills = matched.skills,
        score = matched.score(),
        "basic relevance"
    );
    matched.score()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Leading integers of both strings differ by at most one year.
fn experience_close(job_experience: &str, wanted: &str) -> bool {
    match (leading_number(job_experience), leading_number(wanted)) {
        (Some(job), Some(wanted)) => job.abs_diff(wanted) <= 1,
        _ => false,
    }
}

fn leading_number(text: &str) -> Option<u64> {
    LEADING_NUMBER.find(text)?.as_str().parse().ok()
}
