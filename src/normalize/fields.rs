//! Field-level normalization shared by all sources.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::core::{NOT_SPECIFIED, RawRecord};
use crate::utils::{group_thousands, title_case};

/// Phrases that introduce an experience requirement, checked in order.
const EXPERIENCE_PHRASES: &[&str] = &[
    "years of experience",
    "years experience",
    "year experience",
    "yrs experience",
    "year of experience",
    "yrs of experience",
];

const NUMBER_WORDS: &[&str] = &[
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

/// How far before a phrase to look for its number, in bytes.
const EXPERIENCE_LOOKBEHIND: usize = 20;

/// Render salary from `min_amount`/`max_amount`/`currency`/`interval`.
///
/// Both amounts must be present; currency defaults to `USD` and interval to
/// `yearly`.
#[must_use]
pub fn format_salary(raw: &RawRecord) -> String {
    let (Some(min), Some(max)) = (raw.number("min_amount"), raw.number("max_amount")) else {
        return NOT_SPECIFIED.to_string();
    };
    let currency = raw.text("currency").unwrap_or_else(|| "USD".to_string());
    let interval = raw.text("interval").unwrap_or_else(|| "yearly".to_string());

    if (min - max).abs() < f64::EPSILON {
        format!("{currency} {} per {interval}", group_thousands(min))
    } else {
        format!(
            "{currency} {} - {} per {interval}",
            group_thousands(min),
            group_thousands(max)
        )
    }
}

/// Canonical job nature: the source's value title-cased, or the profile's
/// requested nature when the source says nothing.
#[must_use]
pub fn canonical_job_nature(source_value: Option<&str>, requested: &str) -> String {
    match source_value.map(str::trim) {
        Some(value) if !value.is_empty() => title_case(value),
        _ => requested.to_string(),
    }
}

/// Pull an experience requirement such as `5 years of experience` out of
/// free text. Returns [`NOT_SPECIFIED`] when nothing matches.
#[must_use]
pub fn extract_experience(description: &str) -> String {
    let text = description.to_lowercase();

    for phrase in EXPERIENCE_PHRASES {
        let Some(pos) = text.find(phrase) else {
            continue;
        };
        let mut start = pos.saturating_sub(EXPERIENCE_LOOKBEHIND);
        while !text.is_char_boundary(start) {
            start += 1;
        }

        for word in text[start..pos].split_whitespace().rev() {
            let word = word.trim_end_matches(|c: char| c == '+' || c == '-');
            let is_number = !word.is_empty() && word.chars().all(|c| c.is_ascii_digit());
            if is_number || NUMBER_WORDS.contains(&word) {
                return format!("{word} {phrase}");
            }
        }
    }

    NOT_SPECIFIED.to_string()
}

/// Format a posting date as `YYYY-MM-DD`.
///
/// Accepts RFC 3339 timestamps, plain dates, `YYYY-MM-DD HH:MM:SS` and epoch
/// milliseconds. Unrecognized text is passed through unchanged.
#[must_use]
pub fn format_posted_date(raw: &RawRecord, key: &str) -> Option<String> {
    if let Some(millis) = raw.get(key).and_then(serde_json::Value::as_i64) {
        return DateTime::from_timestamp_millis(millis).map(|dt| dt.format("%Y-%m-%d").to_string());
    }

    let text = raw.text(key)?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.format("%Y-%m-%d").to_string());
    }
    if let Ok(date) = NaiveDate::parse_from_str(&text, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    Some(text)
}
