//! jobhunt - multi-source job aggregation with hybrid relevance scoring.
//!
//! Postings are fetched concurrently from several unreliable sources,
//! normalized into one schema, scored against a search profile, ranked and
//! cached for repeat searches.

pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod scoring;
pub mod sources;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod utils;

pub use error::{HuntError, Result};
