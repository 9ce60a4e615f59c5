//! Prompt text sent to the semantic oracle.

use std::fmt::Write as _;

use serde_json::{Map, Value};

use crate::core::{JobRecord, SearchProfile, SourceKind};

/// Probe used by `jobhunt check`.
pub const HEALTH_PROMPT: &str = "What is 2+2? Answer with just the number.";
pub const HEALTH_EXPECTED: &str = "4";

const ASPECTS: &str = "\
Please analyze the following aspects:
1. Position match (title and responsibilities)
2. Experience level compatibility
3. Location match
4. Skills match
5. Job nature alignment
6. Salary expectations
7. Education and career level fit
8. Overall suitability

Output only a number between 0.0 and 1.0 representing the overall relevance score.
";

/// Relevance prompt for one job, with the extra block for its source.
#[must_use]
pub fn relevance_prompt(job: &JobRecord, profile: &SearchProfile) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(
        "Analyze how relevant this job is to the candidate's criteria. \
         Consider all aspects of the job and candidate's requirements.\n\
         Score from 0.0 (not relevant) to 1.0 (perfect match).\n\n",
    );

    prompt.push_str("CANDIDATE CRITERIA:\n");
    line(&mut prompt, "Position", profile.position());
    line(&mut prompt, "Experience", profile.experience());
    line(&mut prompt, "Salary", profile.salary());
    line(&mut prompt, "Job Nature", profile.job_nature());
    line(&mut prompt, "Location", profile.location());
    line(&mut prompt, "Skills", &profile.skills().join(", "));

    prompt.push_str("\nJOB DETAILS:\n");
    line(&mut prompt, "Title", &job.job_title);
    line(&mut prompt, "Company", &job.company);
    line(&mut prompt, "Location", &job.location);
    line(&mut prompt, "Salary", &job.salary);
    line(&mut prompt, "Experience Required", &job.experience);
    line(&mut prompt, "Job Nature", &job.job_nature);
    line(&mut prompt, "Source", job.source.display_name());
    if let Some(description) = job.description.as_deref() {
        line(&mut prompt, "Description", description);
    }

    let _ = writeln!(prompt, "\nADDITIONAL DETAILS ({}):", job.source.display_name());
    match job.source {
        SourceKind::Indeed => indeed_details(&mut prompt, job),
        SourceKind::LinkedIn => linkedin_details(&mut prompt, job),
        SourceKind::Rozee => rozee_details(&mut prompt, job),
    }

    prompt.push('\n');
    prompt.push_str(ASPECTS);
    prompt
}

fn indeed_details(prompt: &mut String, job: &JobRecord) {
    line(prompt, "Job Type", job.extra("job_type"));
    line(prompt, "Posted Date", job.posted_date.as_deref().unwrap_or_default());
    line(prompt, "Company Rating", job.extra("company_rating"));
    line(prompt, "Company Reviews", job.extra("company_reviews"));
    line(prompt, "Benefits", job.extra("benefits"));
    line(prompt, "Qualifications", job.extra("qualifications"));
    line(prompt, "Responsibilities", job.extra("responsibilities"));
}

fn linkedin_details(prompt: &mut String, job: &JobRecord) {
    line(prompt, "Employment Type", job.extra("employment_type"));
    line(prompt, "Seniority Level", job.extra("seniority_level"));
    line(prompt, "Industry", job.extra("industry"));
    line(prompt, "Job Function", job.extra("job_function"));
    line(prompt, "Posted Date", job.posted_date.as_deref().unwrap_or_default());
    line(prompt, "Applicants", job.extra("applicants"));
    line(prompt, "Company Size", job.extra("company_size"));
    line(prompt, "Company Industry", job.extra("company_industry"));
}

fn rozee_details(prompt: &mut String, job: &JobRecord) {
    line(prompt, "Industry", job.extra("industry"));
    line(prompt, "Functional Area", job.extra("functional_area"));
    line(prompt, "Total Positions", job.extra("total_positions"));
    line(prompt, "Job Shift", job.extra("job_shift"));
    line(prompt, "Job Type", job.extra("job_type"));
    line(prompt, "Gender", job.extra("gender"));
    line(prompt, "Minimum Education", job.extra("minimum_education"));
    line(prompt, "Career Level", job.extra("career_level"));
    line(prompt, "Experience", &job.experience);
    line(prompt, "Apply Before", job.extra("apply_before"));
    line(prompt, "Posted Date", job.extra("posting_date"));
    line(prompt, "Full Details", job.extra("full_details"));
}

fn line(prompt: &mut String, label: &str, value: &str) {
    let _ = writeln!(prompt, "- {label}: {value}");
}

/// Prompt asking the oracle to supply `missing` canonical fields as JSON.
#[must_use]
pub fn fill_prompt(job: &JobRecord, missing: &[&str]) -> String {
    let mut details = Map::new();
    details.insert("title".to_string(), Value::from(job.job_title.as_str()));
    details.insert("company".to_string(), Value::from(job.company.as_str()));
    details.insert(
        "description".to_string(),
        Value::from(job.description.as_deref().unwrap_or_default()),
    );
    details.insert("source".to_string(), Value::from(job.source.display_name()));
    details.insert("location".to_string(), Value::from(job.location.as_str()));
    details.insert("salary".to_string(), Value::from(job.salary.as_str()));
    details.insert("experience".to_string(), Value::from(job.experience.as_str()));
    details.insert("apply_link".to_string(), Value::from(job.apply_link.as_str()));
    if let Some(posted) = job.posted_date.as_deref() {
        details.insert("posted_date".to_string(), Value::from(posted));
    }
    for (key, value) in &job.extras {
        details
            .entry(key.clone())
            .or_insert_with(|| Value::from(value.as_str()));
    }
    let details = serde_json::to_string_pretty(&Value::Object(details)).unwrap_or_default();

    format!(
        "Based on the following job details, fill in the missing fields: {fields}.\n\
         Only output the missing fields in JSON format.\n\n\
         Job Details:\n{details}\n\n\
         For each missing field, provide the most accurate information based on the available details.\n\
         If information cannot be determined, use \"Not specified\".\n\n\
         Guidelines for each field:\n\
         - job_title: Extract from title or description if missing\n\
         - company: Extract from company name or description\n\
         - experience: Look for phrases like \"X years experience\" or \"entry level\"\n\
         - jobNature: Look for terms like \"onsite\", \"remote\", \"hybrid\"\n\
         - location: Extract from location field or description\n\
         - salary: Look for salary ranges or compensation information\n\
         - apply_link: Use the job URL if available\n\n\
         Output format should be a JSON object with only the missing fields.\n\
         Do not include any markdown formatting or code blocks.\n",
        fields = missing.join(", "),
    )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::test_utils::fixtures::sample_profile;

    fn job(source: SourceKind) -> JobRecord {
        let mut extras = BTreeMap::new();
        extras.insert("company_rating".to_string(), "4.1".to_string());
        extras.insert("seniority_level".to_string(), "Associate".to_string());
        extras.insert("functional_area".to_string(), "Software".to_string());
        JobRecord {
            job_title: "Rust Developer".to_string(),
            company: "Acme".to_string(),
            experience: "3 years of experience".to_string(),
            job_nature: "Remote".to_string(),
            location: "Lahore".to_string(),
            salary: "Not specified".to_string(),
            apply_link: "N/A".to_string(),
            source,
            relevance_score: None,
            posted_date: Some("2025-03-14".to_string()),
            description: Some("Build services".to_string()),
            extras,
        }
    }

    #[test]
    fn each_source_gets_its_own_block() {
        let profile = sample_profile();

        let indeed = relevance_prompt(&job(SourceKind::Indeed), &profile);
        assert!(indeed.contains("ADDITIONAL DETAILS (Indeed):"));
        assert!(indeed.contains("- Company Rating: 4.1"));
        assert!(!indeed.contains("Seniority Level"));

        let linkedin = relevance_prompt(&job(SourceKind::LinkedIn), &profile);
        assert!(linkedin.contains("ADDITIONAL DETAILS (LinkedIn):"));
        assert!(linkedin.contains("- Seniority Level: Associate"));

        let rozee = relevance_prompt(&job(SourceKind::Rozee), &profile);
        assert!(rozee.contains("ADDITIONAL DETAILS (Rozee.pk):"));
        assert!(rozee.contains("- Functional Area: Software"));
        assert!(rozee.contains("- Full Details: "));
    }

    #[test]
    fn relevance_prompt_carries_profile_and_instruction() {
        let prompt = relevance_prompt(&job(SourceKind::Indeed), &sample_profile());
        assert!(prompt.contains(&format!("- Position: {}", sample_profile().position())));
        assert!(prompt.contains("- Title: Rust Developer"));
        assert!(prompt.ends_with("representing the overall relevance score.\n"));
    }

    #[test]
    fn fill_prompt_lists_missing_fields() {
        let prompt = fill_prompt(&job(SourceKind::Indeed), &["salary", "apply_link"]);
        assert!(prompt.contains("fill in the missing fields: salary, apply_link."));
        assert!(prompt.contains("\"company_rating\": \"4.1\""));
        assert!(prompt.contains("\"title\": \"Rust Developer\""));
    }
}
