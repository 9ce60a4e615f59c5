//! Terminal rendering of a search response.

use console::style;

use crate::cli::output::HumanLayout;
use crate::core::ScoredJobRecord;
use crate::pipeline::SearchResponse;
use crate::utils::truncate_string;

const LINK_WIDTH: usize = 96;

/// Render up to `limit` jobs plus a summary footer.
#[must_use]
pub fn render_search(response: &SearchResponse, limit: Option<usize>) -> HumanLayout {
    let mut layout = HumanLayout::new();
    let shown = limit.unwrap_or(usize::MAX).min(response.relevant_jobs.len());

    if response.relevant_jobs.is_empty() {
        layout.push_line(style("No relevant jobs found.").yellow().to_string());
    } else {
        layout.title(&format!(
            "{} relevant job{}",
            response.total_jobs_found,
            if response.total_jobs_found == 1 { "" } else { "s" }
        ));
        for (rank, record) in response.relevant_jobs.iter().take(shown).enumerate() {
            render_job(&mut layout, rank + 1, record);
            layout.blank();
        }
        if shown < response.relevant_jobs.len() {
            layout.push_line(
                style(format!(
                    "... {} more (raise --limit to see them)",
                    response.relevant_jobs.len() - shown
                ))
                .dim()
                .to_string(),
            );
        }
    }

    if let Some(stats) = &response.stats {
        for outcome in stats.sources.iter().filter(|o| o.failed()) {
            layout.warning(&format!(
                "{} failed after {} attempt(s): {}",
                outcome.source,
                outcome.attempts,
                outcome.last_error.as_deref().unwrap_or("unknown error")
            ));
        }
        layout.push_line(
            style(format!(
                "fetched {} · duplicates {} · kept {} · oracle calls {}",
                stats.total_fetched, stats.duplicates_removed, stats.kept, stats.oracle_calls
            ))
            .dim()
            .to_string(),
        );
    }
    if response.from_cache {
        layout.push_line(
            style(format!(
                "served from cache (searched {})",
                response.search_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ))
            .dim()
            .to_string(),
        );
    }
    layout
}

fn render_job(layout: &mut HumanLayout, rank: usize, record: &ScoredJobRecord) {
    let job = &record.job;
    layout.push_line(format!(
        "{:>2}. {} {}",
        rank,
        style(format!("[{:.2}]", record.score())).green(),
        style(&job.job_title).bold()
    ));
    layout.kv("Company", &job.company);
    layout.kv("Location", &job.location);
    layout.kv("Nature", &job.job_nature);
    layout.kv("Experience", &job.experience);
    layout.kv("Salary", &job.salary);
    layout.kv("Source", job.source.display_name());
    if let Some(posted) = job.posted_date.as_deref() {
        layout.kv("Posted", posted);
    }
    layout.kv("Apply", &truncate_string(&job.apply_link, LINK_WIDTH));
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::core::Fingerprint;
    use crate::pipeline::PipelineStats;
    use crate::test_utils::fixtures::scored_records;

    fn response(count: usize) -> SearchResponse {
        SearchResponse {
            relevant_jobs: scored_records(count),
            total_jobs_found: count,
            search_timestamp: Utc::now(),
            from_cache: false,
            fingerprint: Fingerprint::of("a", "b", "c"),
            stats: Some(PipelineStats::default()),
        }
    }

    #[test]
    fn limit_truncates_listing() {
        let out = render_search(&response(5), Some(2)).build();
        assert!(out.contains("Rust Developer 0"));
        assert!(out.contains("Rust Developer 1"));
        assert!(!out.contains("Rust Developer 2"));
        assert!(out.contains("3 more"));
    }

    #[test]
    fn empty_response_says_so() {
        let out = render_search(&response(0), None).build();
        assert!(out.contains("No relevant jobs found."));
    }
}
