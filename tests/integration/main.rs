//! Integration test suite entry point.

mod config_files;
mod oracle_http;
mod pipeline_scenarios;
mod sources_http;
