//! The semantic oracle: an external language model reached over HTTP.
//!
//! Everything above this module only sees [`SemanticOracle`]. Failures are
//! reported as [`OracleError`] and the scorer turns them into neutral values.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use serde_json::{Map, Value, json};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::OracleConfig;
use crate::error::{HuntError, OracleError, Result};

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("score pattern"));

static SCALE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:/|out\s+of)\s*(\d+(?:\.\d+)?)").expect("scale pattern")
});

/// A model that answers free-text prompts.
#[async_trait]
pub trait SemanticOracle: Send + Sync {
    /// Send `prompt` and return the model's raw text answer.
    async fn complete(&self, prompt: &str) -> std::result::Result<String, OracleError>;

    /// Ask for a relevance score; the answer is clamped to `[0, 1]`.
    async fn score(&self, prompt: &str) -> std::result::Result<f64, OracleError> {
        let answer = self.complete(prompt).await?;
        parse_score(&answer)
    }

    /// Ask for a JSON object of field values.
    async fn fill_missing_fields(
        &self,
        prompt: &str,
    ) -> std::result::Result<Map<String, Value>, OracleError> {
        let answer = self.complete(prompt).await?;
        parse_fields(&answer)
    }
}

/// First number in `answer`, clamped to `[0, 1]`. A score given on another
/// scale ("8/10", "7 out of 10") is rejected.
pub fn parse_score(answer: &str) -> std::result::Result<f64, OracleError> {
    let found = FIRST_NUMBER
        .find(answer)
        .ok_or_else(|| OracleError::Malformed(format!("no number in {answer:?}")))?;
    let value: f64 = found
        .as_str()
        .parse()
        .map_err(|_| OracleError::Malformed(format!("bad number in {answer:?}")))?;
    if let Some(scale) = SCALE_SUFFIX.captures(&answer[found.end()..]) {
        let unit = scale[1].parse::<f64>().is_ok_and(|scale| (scale - 1.0).abs() < f64::EPSILON);
        if !unit {
            return Err(OracleError::Malformed(format!("score not on a 0-1 scale: {answer:?}")));
        }
    }
    Ok(value.clamp(0.0, 1.0))
}

/// Parse a JSON object, tolerating markdown code fences around it.
pub fn parse_fields(answer: &str) -> std::result::Result<Map<String, Value>, OracleError> {
    let cleaned = answer.replace("```json", "").replace("```", "");
    match serde_json::from_str::<Value>(cleaned.trim()) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(OracleError::Malformed(format!(
            "expected a JSON object, got {other}"
        ))),
        Err(err) => Err(OracleError::Malformed(err.to_string())),
    }
}

/// Gemini `generateContent` client.
pub struct GeminiOracle {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiOracle {
    pub fn new(config: &OracleConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|err| HuntError::Config(format!("oracle http client: {err}")))?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        Ok(Self {
            client,
            url,
            api_key,
        })
    }
}

#[async_trait]
impl SemanticOracle for GeminiOracle {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, OracleError> {
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Request(err.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|err| OracleError::Request(err.to_string()))?;
        let text = candidate_text(&payload);
        if text.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(text.trim().to_string())
    }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(payload: &Value) -> String {
    payload
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

/// Stand-in used when no oracle is configured; every call fails.
pub struct UnavailableOracle {
    reason: String,
}

impl UnavailableOracle {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl SemanticOracle for UnavailableOracle {
    async fn complete(&self, _prompt: &str) -> std::result::Result<String, OracleError> {
        Err(OracleError::Unavailable(self.reason.clone()))
    }
}

/// Build the configured oracle.
///
/// Falls back to [`UnavailableOracle`] when disabled or when the API key
/// variable is unset.
pub fn build_oracle(config: &OracleConfig) -> Result<Arc<dyn SemanticOracle>> {
    if !config.enabled {
        return Ok(Arc::new(UnavailableOracle::new("disabled in configuration")));
    }
    match config.api_key() {
        Some(key) => Ok(Arc::new(GeminiOracle::new(config, key)?)),
        None => {
            warn!(
                target: "scoring",
                env = %config.api_key_env,
                "oracle API key not set; semantic scores fall back to neutral"
            );
            Ok(Arc::new(UnavailableOracle::new(format!(
                "{} is not set",
                config.api_key_env
            ))))
        }
    }
}

/// Spaces calls evenly so at most `calls_per_minute` start per minute.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `0` disables limiting.
    #[must_use]
    pub fn per_minute(calls_per_minute: u32) -> Self {
        let interval = if calls_per_minute == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(60) / calls_per_minute
        };
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Wait for the next free slot.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let slot = {
            let mut next = self.next_slot.lock();
            let now = Instant::now();
            let slot = next.map_or(now, |next| next.max(now));
            *next = Some(slot + self.interval);
            slot
        };
        tokio::time::sleep_until(slot).await;
    }
}

/// Oracle wrapper applying a [`RateLimiter`] and counting calls.
pub struct RateLimitedOracle {
    inner: Arc<dyn SemanticOracle>,
    limiter: RateLimiter,
    calls: AtomicU64,
}

impl RateLimitedOracle {
    #[must_use]
    pub fn new(inner: Arc<dyn SemanticOracle>, calls_per_minute: u32) -> Self {
        Self {
            inner,
            limiter: RateLimiter::per_minute(calls_per_minute),
            calls: AtomicU64::new(0),
        }
    }

    /// Calls started so far.
    #[must_use]
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SemanticOracle for RateLimitedOracle {
    async fn complete(&self, prompt: &str) -> std::result::Result<String, OracleError> {
        self.limiter.acquire().await;
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(target: "scoring", call, prompt_len = prompt.len(), "oracle call");
        self.inner.complete(prompt).await
    }
}
