use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::SourceKind;
use crate::error::{HuntError, Result};

const PROJECT_CONFIG_FILE: &str = "jobhunt.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("JOBHUNT_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                HuntError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&Self::project_path())? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a full config from TOML text, applying defaults for omitted keys.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let patch: ConfigPatch =
            toml::from_str(raw).map_err(|err| HuntError::Config(format!("parse config: {err}")))?;
        let mut config = Self::default();
        config.merge_patch(patch);
        config.validate()?;
        Ok(config)
    }

    /// `<config_dir>/jobhunt/config.toml`, if the platform has a config dir.
    #[must_use]
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("jobhunt").join("config.toml"))
    }

    /// Project-local config file name, resolved against the working directory.
    #[must_use]
    pub fn project_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(path) = Self::global_path() else {
            return Ok(None);
        };
        Self::load_patch(&path)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| HuntError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| HuntError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.sources {
            self.sources.merge(patch);
        }
        if let Some(patch) = patch.retry {
            self.retry.merge(patch);
        }
        if let Some(patch) = patch.scoring {
            self.scoring.merge(patch);
        }
        if let Some(patch) = patch.oracle {
            self.oracle.merge(patch);
        }
        if let Some(patch) = patch.cache {
            self.cache.merge(patch);
        }
        if let Some(patch) = patch.pipeline {
            self.pipeline.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply `JOBHUNT_*` overrides read through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvReader { lookup };

        if let Some(values) = env.list("JOBHUNT_SOURCES_ENABLED") {
            self.sources.enabled = merge_unique(values, &[]);
        }
        if let Some(value) = env.parse::<usize>("JOBHUNT_SOURCES_MAX_JOBS")? {
            self.sources.max_jobs_per_source = value;
        }
        if let Some(value) = env.parse::<u32>("JOBHUNT_SOURCES_HOURS_OLD")? {
            self.sources.hours_old = value;
        }
        if let Some(value) = env.string("JOBHUNT_DEFAULT_COUNTRY") {
            self.sources.default_country = value;
        }
        if let Some(value) = env.parse::<u64>("JOBHUNT_REQUEST_TIMEOUT_SECS")? {
            self.sources.request_timeout_secs = value;
        }
        if let Some(value) = env.string("JOBHUNT_INDEED_ENDPOINT") {
            self.sources.indeed_endpoint = value;
        }
        if let Some(value) = env.string("JOBHUNT_LINKEDIN_ENDPOINT") {
            self.sources.linkedin_endpoint = value;
        }
        if let Some(value) = env.string("JOBHUNT_ROZEE_ENDPOINT") {
            self.sources.rozee_endpoint = value;
        }

        if let Some(value) = env.parse::<u32>("JOBHUNT_RETRY_MAX_ATTEMPTS")? {
            self.retry.max_attempts = value;
        }
        if let Some(value) = env.parse::<u64>("JOBHUNT_RETRY_DELAY_SECS")? {
            self.retry.delay_secs = value;
        }
        if let Some(value) = env.parse::<u64>("JOBHUNT_RETRY_ATTEMPT_TIMEOUT_SECS")? {
            self.retry.attempt_timeout_secs = value;
        }

        if let Some(value) = env.parse::<f64>("JOBHUNT_SCORING_SEMANTIC_FLOOR")? {
            self.scoring.semantic_floor = value;
        }
        if let Some(value) = env.parse::<f64>("JOBHUNT_SCORING_INCLUSION_THRESHOLD")? {
            self.scoring.inclusion_threshold = value;
        }
        if let Some(value) = env.parse::<usize>("JOBHUNT_SCORING_MAX_CONCURRENCY")? {
            self.scoring.max_concurrency = value;
        }
        if let Some(value) = env.bool("JOBHUNT_SCORING_FILL_MISSING") {
            self.scoring.fill_missing = value;
        }

        if let Some(value) = env.bool("JOBHUNT_ORACLE_ENABLED") {
            self.oracle.enabled = value;
        }
        if let Some(value) = env.string("JOBHUNT_ORACLE_ENDPOINT") {
            self.oracle.endpoint = value;
        }
        if let Some(value) = env.string("JOBHUNT_ORACLE_MODEL") {
            self.oracle.model = value;
        }
        if let Some(value) = env.string("JOBHUNT_ORACLE_API_KEY_ENV") {
            self.oracle.api_key_env = value;
        }
        if let Some(value) = env.parse::<u32>("JOBHUNT_ORACLE_CALLS_PER_MINUTE")? {
            self.oracle.calls_per_minute = value;
        }
        if let Some(value) = env.parse::<u64>("JOBHUNT_ORACLE_TIMEOUT_SECS")? {
            self.oracle.timeout_secs = value;
        }

        if let Some(value) = env.bool("JOBHUNT_CACHE_ENABLED") {
            self.cache.enabled = value;
        }
        if env.bool("JOBHUNT_CACHE_DISABLED").unwrap_or(false) {
            self.cache.enabled = false;
        }
        if let Some(value) = env.parse::<u64>("JOBHUNT_CACHE_TTL_SECONDS")? {
            self.cache.ttl_seconds = value;
        }

        if let Some(value) = env.bool("JOBHUNT_PIPELINE_DEDUPE") {
            self.pipeline.dedupe = value;
        }

        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        for name in &self.sources.enabled {
            name.parse::<SourceKind>()?;
        }
        if self.sources.max_jobs_per_source == 0 {
            return Err(HuntError::Config(
                "sources.max_jobs_per_source must be at least 1".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(HuntError::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("scoring.semantic_floor", self.scoring.semantic_floor),
            ("scoring.inclusion_threshold", self.scoring.inclusion_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(HuntError::Config(format!(
                    "{key} must be within 0.0..=1.0 (got {value})"
                )));
            }
        }
        if self.scoring.max_concurrency == 0 {
            return Err(HuntError::Config(
                "scoring.max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.cache.ttl_seconds == 0 {
            return Err(HuntError::Config(
                "cache.ttl_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub max_jobs_per_source: usize,
    #[serde(default)]
    pub hours_old: u32,
    #[serde(default)]
    pub default_country: String,
    #[serde(default)]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub indeed_endpoint: String,
    #[serde(default)]
    pub linkedin_endpoint: String,
    #[serde(default)]
    pub rozee_endpoint: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: SourceKind::ALL
                .iter()
                .map(|kind| kind.config_key().to_string())
                .collect(),
            max_jobs_per_source: 15,
            hours_old: 72,
            default_country: "Pakistan".to_string(),
            request_timeout_secs: 30,
            indeed_endpoint: "http://127.0.0.1:8700/jobs".to_string(),
            linkedin_endpoint: "http://127.0.0.1:8700/jobs".to_string(),
            rozee_endpoint: "http://127.0.0.1:8701/rozee/jobs".to_string(),
        }
    }
}

impl SourcesConfig {
    fn merge(&mut self, patch: SourcesPatch) {
        if let Some(values) = patch.enabled {
            self.enabled = merge_unique(values, &[]);
        }
        if let Some(value) = patch.max_jobs_per_source {
            self.max_jobs_per_source = value;
        }
        if let Some(value) = patch.hours_old {
            self.hours_old = value;
        }
        if let Some(value) = patch.default_country {
            self.default_country = value;
        }
        if let Some(value) = patch.request_timeout_secs {
            self.request_timeout_secs = value;
        }
        if let Some(value) = patch.indeed_endpoint {
            self.indeed_endpoint = value;
        }
        if let Some(value) = patch.linkedin_endpoint {
            self.linkedin_endpoint = value;
        }
        if let Some(value) = patch.rozee_endpoint {
            self.rozee_endpoint = value;
        }
    }

    /// Enabled sources in configuration order.
    pub fn enabled_kinds(&self) -> Result<Vec<SourceKind>> {
        self.enabled.iter().map(|name| name.parse()).collect()
    }

    #[must_use]
    pub fn endpoint(&self, kind: SourceKind) -> &str {
        match kind {
            SourceKind::Indeed => &self.indeed_endpoint,
            SourceKind::LinkedIn => &self.linkedin_endpoint,
            SourceKind::Rozee => &self.rozee_endpoint,
        }
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default)]
    pub max_attempts: u32,
    #[serde(default)]
    pub delay_secs: u64,
    #[serde(default)]
    pub attempt_timeout_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 5,
            attempt_timeout_secs: 60,
        }
    }
}

impl RetryConfig {
    fn merge(&mut self, patch: RetryPatch) {
        if let Some(value) = patch.max_attempts {
            self.max_attempts = value;
        }
        if let Some(value) = patch.delay_secs {
            self.delay_secs = value;
        }
        if let Some(value) = patch.attempt_timeout_secs {
            self.attempt_timeout_secs = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Basic score at which the semantic oracle is consulted.
    #[serde(default)]
    pub semantic_floor: f64,
    /// Final score a job needs to be returned.
    #[serde(default)]
    pub inclusion_threshold: f64,
    #[serde(default)]
    pub max_concurrency: usize,
    #[serde(default)]
    pub fill_missing: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            semantic_floor: 0.3,
            inclusion_threshold: 0.3,
            max_concurrency: 4,
            fill_missing: true,
        }
    }
}

impl ScoringConfig {
    fn merge(&mut self, patch: ScoringPatch) {
        if let Some(value) = patch.semantic_floor {
            self.semantic_floor = value;
        }
        if let Some(value) = patch.inclusion_threshold {
            self.inclusion_threshold = value;
        }
        if let Some(value) = patch.max_concurrency {
            self.max_concurrency = value;
        }
        if let Some(value) = patch.fill_missing {
            self.fill_missing = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub model: String,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: String,
    #[serde(default)]
    pub calls_per_minute: u32,
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.0-flash".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            calls_per_minute: 15,
            timeout_secs: 30,
        }
    }
}

impl OracleConfig {
    fn merge(&mut self, patch: OraclePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.endpoint {
            self.endpoint = value;
        }
        if let Some(value) = patch.model {
            self.model = value;
        }
        if let Some(value) = patch.api_key_env {
            self.api_key_env = value;
        }
        if let Some(value) = patch.calls_per_minute {
            self.calls_per_minute = value;
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = value;
        }
    }

    /// Read the API key from the configured environment variable.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600,
        }
    }
}

impl CacheConfig {
    fn merge(&mut self, patch: CachePatch) {
        if let Some(value) = patch.enabled {
            self.enabled = value;
        }
        if let Some(value) = patch.ttl_seconds {
            self.ttl_seconds = value;
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Drop postings that arrive through more than one source.
    #[serde(default)]
    pub dedupe: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { dedupe: true }
    }
}

impl PipelineConfig {
    fn merge(&mut self, patch: PipelinePatch) {
        if let Some(value) = patch.dedupe {
            self.dedupe = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub sources: Option<SourcesPatch>,
    pub retry: Option<RetryPatch>,
    pub scoring: Option<ScoringPatch>,
    pub oracle: Option<OraclePatch>,
    pub cache: Option<CachePatch>,
    pub pipeline: Option<PipelinePatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SourcesPatch {
    pub enabled: Option<Vec<String>>,
    pub max_jobs_per_source: Option<usize>,
    pub hours_old: Option<u32>,
    pub default_country: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub indeed_endpoint: Option<String>,
    pub linkedin_endpoint: Option<String>,
    pub rozee_endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RetryPatch {
    pub max_attempts: Option<u32>,
    pub delay_secs: Option<u64>,
    pub attempt_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ScoringPatch {
    pub semantic_floor: Option<f64>,
    pub inclusion_threshold: Option<f64>,
    pub max_concurrency: Option<usize>,
    pub fill_missing: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct OraclePatch {
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub calls_per_minute: Option<u32>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CachePatch {
    pub enabled: Option<bool>,
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PipelinePatch {
    pub dedupe: Option<bool>,
}

fn merge_unique(values: Vec<String>, existing: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values.into_iter().chain(existing.iter().cloned()) {
        if seen.insert(value.to_lowercase()) {
            out.push(value);
        }
    }
    out
}

struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
    }

    fn bool(&self, key: &str) -> Option<bool> {
        (self.lookup)(key).map(|value| {
            matches!(
                value.to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
    }

    fn parse<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match (self.lookup)(key) {
            Some(value) => value.trim().parse::<T>().map(Some).map_err(|err| {
                HuntError::Config(format!("invalid {key} value {value}: {err}"))
            }),
            None => Ok(None),
        }
    }

    fn list(&self, key: &str) -> Option<Vec<String>> {
        (self.lookup)(key).map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(ToString::to_string)
                .collect()
        })
    }
}
