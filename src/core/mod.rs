//! Core job-search types: profiles, raw and canonical records.

pub mod profile;
pub mod record;

pub use profile::{Fingerprint, SearchProfile, SearchRequest};
pub use record::{
    JobRecord, NOT_AVAILABLE, NOT_SPECIFIED, RawRecord, ScoredJobRecord, SourceKind,
    UNKNOWN_COMPANY, UNKNOWN_TITLE, is_unspecified,
};
