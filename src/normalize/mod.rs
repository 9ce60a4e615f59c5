//! Mapping raw source records into the canonical [`JobRecord`] schema.
//!
//! Each source has its own field names; only the mapping for that source
//! reads them. Everything here is pure.

pub mod fields;

use std::collections::BTreeMap;

use tracing::debug;

pub use fields::{canonical_job_nature, extract_experience, format_posted_date, format_salary};

use crate::core::{
    JobRecord, NOT_AVAILABLE, NOT_SPECIFIED, RawRecord, SearchProfile, SourceKind, UNKNOWN_COMPANY,
    UNKNOWN_TITLE,
};

const INDEED_EXTRAS: &[&str] = &[
    "company_industry",
    "company_description",
    "company_rating",
    "company_reviews",
    "job_type",
    "benefits",
    "qualifications",
    "responsibilities",
];

const LINKEDIN_EXTRAS: &[&str] = &[
    "company_industry",
    "job_function",
    "employment_type",
    "industry",
    "applicants",
    "company_size",
];

const ROZEE_EXTRAS: &[&str] = &[
    "full_details",
    "description_snippet",
    "industry",
    "functional_area",
    "total_positions",
    "job_shift",
    "job_type",
    "gender",
    "minimum_education",
    "career_level",
    "apply_before",
    "posting_date",
    "apply_button_present",
];

/// Map one raw record from `kind` into the canonical schema.
#[must_use]
pub fn normalize(kind: SourceKind, raw: &RawRecord, profile: &SearchProfile) -> JobRecord {
    let job = match kind {
        SourceKind::Indeed => normalize_indeed(raw, profile),
        SourceKind::LinkedIn => normalize_linkedin(raw, profile),
        SourceKind::Rozee => normalize_rozee(raw, profile),
    };
    debug!(
        target: "normalize",
        source = %kind,
        title = %job.job_title,
        fields = raw.len(),
        "normalized record"
    );
    job
}

/// Normalize a whole batch from one source, preserving order.
#[must_use]
pub fn normalize_all(kind: SourceKind, raws: &[RawRecord], profile: &SearchProfile) -> Vec<JobRecord> {
    raws.iter().map(|raw| normalize(kind, raw, profile)).collect()
}

fn normalize_indeed(raw: &RawRecord, profile: &SearchProfile) -> JobRecord {
    let description = raw.text("description");
    let experience = extract_experience(description.as_deref().unwrap_or_default());
    scraper_record(SourceKind::Indeed, raw, profile, experience, description, INDEED_EXTRAS)
}

fn normalize_linkedin(raw: &RawRecord, profile: &SearchProfile) -> JobRecord {
    let description = raw.text("description");
    let experience = raw
        .text("job_level")
        .unwrap_or_else(|| extract_experience(description.as_deref().unwrap_or_default()));
    let mut job = scraper_record(
        SourceKind::LinkedIn,
        raw,
        profile,
        experience,
        description,
        LINKEDIN_EXTRAS,
    );
    if let Some(level) = raw.text("job_level") {
        job.extras.insert("seniority_level".to_string(), level);
    }
    job
}

/// Shared shape of the scraper-service sources.
fn scraper_record(
    kind: SourceKind,
    raw: &RawRecord,
    profile: &SearchProfile,
    experience: String,
    description: Option<String>,
    extras: &[&str],
) -> JobRecord {
    JobRecord {
        job_title: raw.text("title").unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        company: raw.text("company").unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
        experience,
        job_nature: canonical_job_nature(raw.text("job_type").as_deref(), profile.job_nature()),
        location: raw
            .text("location")
            .unwrap_or_else(|| profile.location().to_string()),
        salary: format_salary(raw),
        apply_link: raw.text("job_url").unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        source: kind,
        relevance_score: None,
        posted_date: format_posted_date(raw, "date_posted"),
        description,
        extras: collect_extras(raw, extras),
    }
}

fn normalize_rozee(raw: &RawRecord, profile: &SearchProfile) -> JobRecord {
    let full_details = raw.text("full_details");
    let experience = raw.text("experience").unwrap_or_else(|| {
        full_details
            .as_deref()
            .or(raw.text("description_snippet").as_deref())
            .map_or_else(|| NOT_SPECIFIED.to_string(), extract_experience)
    });

    JobRecord {
        job_title: raw.text("job_title").unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
        company: raw
            .text("company")
            .map(|company| company.trim_end_matches(',').trim().to_string())
            .filter(|company| !company.is_empty() && company != NOT_AVAILABLE)
            .unwrap_or_else(|| UNKNOWN_COMPANY.to_string()),
        experience,
        job_nature: canonical_job_nature(raw.text("job_type").as_deref(), profile.job_nature()),
        location: raw
            .text("location")
            .map(|location| location.trim_start_matches([',', ' ']).to_string())
            .filter(|location| !location.is_empty())
            .unwrap_or_else(|| profile.location().to_string()),
        salary: raw.text("salary").unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        apply_link: raw
            .text("apply_link")
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        source: SourceKind::Rozee,
        relevance_score: None,
        posted_date: format_posted_date(raw, "posting_date"),
        description: raw.text("description"),
        extras: collect_extras(raw, ROZEE_EXTRAS),
    }
}

fn collect_extras(raw: &RawRecord, keys: &[&str]) -> BTreeMap<String, String> {
    keys.iter()
        .filter_map(|key| raw.text(key).map(|value| ((*key).to_string(), value)))
        .collect()
}
