//! jobhunt config - Show the effective configuration

use clap::Args;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{HumanLayout, OutputMode, emit_human, emit_robot, robot_ok};
use crate::config::Config;
use crate::error::{HuntError, Result};

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Print the config file locations instead of the values
    #[arg(long)]
    pub paths: bool,
}

#[derive(Debug, Serialize)]
struct ConfigPaths {
    explicit: Option<String>,
    global: Option<String>,
    project: String,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    if args.paths {
        let paths = ConfigPaths {
            explicit: ctx.config_path.as_ref().map(|p| p.display().to_string()),
            global: Config::global_path().map(|p| p.display().to_string()),
            project: Config::project_path().display().to_string(),
        };
        return match ctx.output_mode {
            OutputMode::Robot => emit_robot(&robot_ok(paths)),
            OutputMode::Human => {
                emit_human(render_paths(&paths));
                Ok(())
            }
        };
    }

    match ctx.output_mode {
        OutputMode::Robot => emit_robot(&robot_ok(&ctx.config)),
        OutputMode::Human => {
            println!("{}", to_toml(&ctx.config)?);
            Ok(())
        }
    }
}

fn to_toml(config: &Config) -> Result<String> {
    toml::to_string_pretty(config)
        .map_err(|err| HuntError::Config(format!("render config: {err}")))
}

fn render_paths(paths: &ConfigPaths) -> HumanLayout {
    let mut layout = HumanLayout::new();
    layout.title("Config files");
    if let Some(explicit) = &paths.explicit {
        layout.kv("explicit", explicit);
    }
    layout.kv("global", paths.global.as_deref().unwrap_or("(no config dir)"));
    layout.kv("project", &paths.project);
    layout
}
