//! jobhunt check - Verify the oracle answers and list source endpoints

use clap::Args;
use serde::Serialize;
use tracing::{debug, warn};

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, OutputMode, emit_human, emit_robot, robot_ok};
use crate::config::OracleConfig;
use crate::core::SourceKind;
use crate::error::{HuntError, OracleError, Result};
use crate::scoring::build_oracle;
use crate::scoring::prompt::{HEALTH_EXPECTED, HEALTH_PROMPT};

#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Only list sources; do not call the oracle
    #[arg(long)]
    pub skip_oracle: bool,
}

#[derive(Debug, Serialize)]
struct CheckOutput {
    sources: Vec<SourceCheck>,
    #[serde(skip_serializing_if = "Option::is_none")]
    oracle: Option<OracleCheck>,
}

#[derive(Debug, Serialize)]
struct SourceCheck {
    source: SourceKind,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct OracleCheck {
    model: String,
    api_key_env: String,
    key_present: bool,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip)]
    failure: Option<OracleError>,
}

pub async fn run(ctx: &AppContext, args: &CheckArgs) -> Result<()> {
    let sources = ctx
        .config
        .sources
        .enabled_kinds()?
        .into_iter()
        .map(|kind| SourceCheck {
            source: kind,
            endpoint: ctx.config.sources.endpoint(kind).to_string(),
        })
        .collect();

    let oracle = if args.skip_oracle {
        None
    } else {
        Some(probe_oracle(&ctx.config.oracle).await?)
    };
    let failed = oracle.as_ref().is_some_and(|check| !check.ok);
    let output = CheckOutput { sources, oracle };

    match ctx.output_mode {
        OutputMode::Robot if failed => {}
        OutputMode::Robot => emit_robot(&robot_ok(&output))?,
        OutputMode::Human => emit_human(render(&output)),
    }

    match output.oracle.and_then(|check| check.failure) {
        Some(failure) => Err(HuntError::Oracle(failure)),
        None => Ok(()),
    }
}

async fn probe_oracle(config: &OracleConfig) -> Result<OracleCheck> {
    let oracle = build_oracle(config)?;
    debug!(target: "scoring", model = %config.model, "probing oracle");
    let (answer, failure) = match oracle.complete(HEALTH_PROMPT).await {
        Ok(answer) => {
            let answer = answer.trim().to_string();
            let failure = (answer != HEALTH_EXPECTED).then(|| {
                OracleError::Malformed(format!("expected {HEALTH_EXPECTED:?}, got {answer:?}"))
            });
            (Some(answer), failure)
        }
        Err(err) => (None, Some(err)),
    };
    if let Some(err) = &failure {
        warn!(target: "scoring", error = %err, "oracle health check failed");
    }
    Ok(OracleCheck {
        model: config.model.clone(),
        api_key_env: config.api_key_env.clone(),
        key_present: config.api_key().is_some(),
        ok: failure.is_none(),
        answer,
        error: failure.as_ref().map(ToString::to_string),
        failure,
    })
}

fn render(output: &CheckOutput) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title("jobhunt check");
    layout.section("Sources");
    for check in &output.sources {
        layout.kv(check.source.display_name(), &check.endpoint);
    }
    if let Some(oracle) = &output.oracle {
        layout.blank().section("Oracle");
        layout.kv("Model", &oracle.model);
        layout.kv(
            "API key",
            &format!(
                "{} ({})",
                oracle.api_key_env,
                if oracle.key_present { "set" } else { "not set" }
            ),
        );
        layout.kv("Status", if oracle.ok { "ok" } else { "failed" });
        if let Some(error) = &oracle.error {
            layout.warning(error);
        }
    }
    layout
}
