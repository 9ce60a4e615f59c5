use std::path::PathBuf;

use crate::cli::{Cli, OutputMode};
use crate::config::Config;
use crate::error::Result;
use crate::pipeline::Aggregator;

pub struct AppContext {
    /// Explicit config path from `--config` / `JOBHUNT_CONFIG`, if any.
    pub config_path: Option<PathBuf>,
    pub config: Config,
    pub output_mode: OutputMode,
    pub verbosity: u8,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;
        Ok(Self {
            config_path: cli.config.clone(),
            config,
            output_mode: cli.output_mode(),
            verbosity: cli.verbose,
        })
    }

    /// Build the search service for this invocation.
    pub fn aggregator(&self) -> Result<Aggregator> {
        Aggregator::from_config(&self.config)
    }
}
