//! jobhunt search - Fetch, score and rank postings for one profile

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use crate::app::AppContext;
use crate::cli::formatters::render_search;
use crate::cli::output::{OutputMode, emit_human, emit_robot, robot_ok, robot_partial};
use crate::core::SearchRequest;
use crate::error::Result;
use crate::pipeline::SearchResponse;

#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Job title to search for
    #[arg(long)]
    pub position: Option<String>,

    /// Experience, e.g. "3 years"
    #[arg(long)]
    pub experience: Option<String>,

    /// Expected salary (free text)
    #[arg(long)]
    pub salary: Option<String>,

    /// Remote, Onsite, Hybrid, Full-time, ...
    #[arg(long)]
    pub job_nature: Option<String>,

    /// City, optionally with country ("Lahore" or "Lahore, Pakistan")
    #[arg(long)]
    pub location: Option<String>,

    /// Comma-separated skills
    #[arg(long)]
    pub skills: Option<String>,

    /// Read the request as JSON from a file, or `-` for stdin
    #[arg(long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Show at most this many jobs
    #[arg(long, short)]
    pub limit: Option<usize>,
}

impl SearchArgs {
    /// Build the request: JSON input first, then flags on top.
    pub fn to_request(&self) -> Result<SearchRequest> {
        let mut request = match &self.input {
            Some(path) => read_request(path)?,
            None => SearchRequest::default(),
        };
        let overrides = [
            (&mut request.position, &self.position),
            (&mut request.experience, &self.experience),
            (&mut request.salary, &self.salary),
            (&mut request.job_nature, &self.job_nature),
            (&mut request.location, &self.location),
            (&mut request.skills, &self.skills),
        ];
        for (field, value) in overrides {
            if let Some(value) = value {
                field.clone_from(value);
            }
        }
        Ok(request)
    }
}

fn read_request(path: &Path) -> Result<SearchRequest> {
    let raw = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&raw)?)
}

pub async fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let request = args.to_request()?;
    let aggregator = ctx.aggregator()?;
    aggregator.start();
    let result = aggregator.search_request(request).await;
    aggregator.shutdown();
    let response = result?;

    debug!(
        target: "pipeline",
        jobs = response.total_jobs_found,
        from_cache = response.from_cache,
        "search finished"
    );

    match ctx.output_mode {
        OutputMode::Human => {
            emit_human(render_search(&response, args.limit));
            Ok(())
        }
        OutputMode::Robot => emit_search_robot(response, args.limit),
    }
}

fn emit_search_robot(mut response: SearchResponse, limit: Option<usize>) -> Result<()> {
    if let Some(limit) = limit {
        response.relevant_jobs.truncate(limit);
    }
    let (failed, total) = response.stats.as_ref().map_or_else(
        || (Vec::new(), 0),
        |stats| (stats.failed_sources(), stats.sources.len()),
    );
    if failed.is_empty() {
        emit_robot(&robot_ok(response))
    } else {
        let warnings = failed
            .iter()
            .map(|source| format!("{source} returned no results after retries"))
            .collect();
        let failed_count = failed.len();
        emit_robot(&robot_partial(response, total - failed_count, failed_count).with_warnings(warnings))
    }
}
