//! Human and robot (JSON) output.

use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

use crate::error::{HuntError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Robot,
}

/// Envelope for every robot-mode answer.
#[derive(Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl<T> RobotResponse<T> {
    #[must_use]
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    Error { code: String, message: String },
    Partial { completed: usize, failed: usize },
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
        warnings: Vec::new(),
    }
}

/// Some sources answered, some did not.
pub fn robot_partial<T: Serialize>(data: T, completed: usize, failed: usize) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Partial { completed, failed },
        ..robot_ok(data)
    }
}

pub fn robot_error(
    code: impl Into<String>,
    message: impl Into<String>,
) -> RobotResponse<serde_json::Value> {
    RobotResponse {
        status: RobotStatus::Error {
            code: code.into(),
            message: message.into(),
        },
        ..robot_ok(serde_json::Value::Null)
    }
}

/// Stable error code for robot output.
#[must_use]
pub const fn error_code(err: &HuntError) -> &'static str {
    match err {
        HuntError::ValidationFailed(_) => "validation_failed",
        HuntError::Config(_) | HuntError::MissingConfig(_) => "config_error",
        HuntError::Source(_) => "source_error",
        HuntError::Oracle(_) => "oracle_error",
        HuntError::PipelineFailed(_) => "pipeline_failed",
        HuntError::Io(_) => "io_error",
        HuntError::Serialization(_) => "serialization_error",
    }
}

pub fn emit_robot<T: Serialize>(response: &RobotResponse<T>) -> Result<()> {
    emit_json(response)
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

/// Line-oriented terminal layout.
pub struct HumanLayout {
    lines: Vec<String>,
    key_width: usize,
}

impl Default for HumanLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanLayout {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
            key_width: 12,
        }
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().to_string());
        self.lines.push(String::new());
        self
    }

    pub fn section(&mut self, text: &str) -> &mut Self {
        self.lines.push(style(text).bold().cyan().to_string());
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        let padded = format!("{key:width$}", width = self.key_width);
        self.lines
            .push(format!("   {} {value}", style(padded).dim()));
        self
    }

    pub fn warning(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("{} {text}", style("warning:").yellow().bold()));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    pub fn push_line(&mut self, line: impl Into<String>) -> &mut Self {
        self.lines.push(line.into());
        self
    }

    #[must_use]
    pub fn build(self) -> String {
        self.lines.join("\n")
    }
}

pub fn emit_human(layout: HumanLayout) {
    println!("{}", layout.build());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn robot_error_serializes_code_and_message() {
        let value = serde_json::to_value(robot_error("validation_failed", "position must not be empty"))
            .unwrap();
        assert_eq!(value["status"]["error"]["code"], "validation_failed");
        assert!(value["data"].is_null());
        assert!(value.get("warnings").is_none());
    }

    #[test]
    fn partial_status_carries_counts() {
        let value = serde_json::to_value(robot_partial(1, 2, 1).with_warnings(vec!["x".into()]))
            .unwrap();
        assert_eq!(value["status"]["partial"]["completed"], 2);
        assert_eq!(value["status"]["partial"]["failed"], 1);
        assert_eq!(value["warnings"][0], "x");
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            error_code(&HuntError::ValidationFailed(String::new())),
            "validation_failed"
        );
        assert_eq!(error_code(&HuntError::MissingConfig(String::new())), "config_error");
    }

    #[test]
    fn layout_keeps_plain_text() {
        let mut layout = HumanLayout::new();
        layout.push_line("1. Rust Developer").kv("Company", "Acme");
        let built = layout.build();
        assert!(built.contains("Rust Developer"));
        assert!(built.contains("Acme"));
    }
}
