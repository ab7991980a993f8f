//! # Arcade Importer
//! Idempotent importers that merge external feeds into the ASO graph.
//!
//! A [`Feed`] lists entries (bucket objects or one HTTP document) and parses
//! them into observations. [`FeedImporter`] drives a feed through the
//! provenance graph, keeping per-entry progress so that a re-run with an
//! unchanged feed writes nothing and an interrupted run resumes where it
//! stopped. [`ImportScheduler`] runs every configured importer periodically.
pub mod engine;
pub mod errors;
pub mod feed;
pub mod feeds;
pub mod locks;
pub mod parsers;
pub mod scheduler;

pub use engine::{
    FeedImporter, ImportResult, Importer, RunContext, RunStatus, SkippedRecord, TruncationReason,
};
pub use errors::{FeedError, ImportError, ParseError};
pub use feed::{EntryParser, EntryRef, Feed, Observation, RecordOutcome};
pub use locks::{RunLease, RunLocks, DEFAULT_RUN_LEASE};
pub use scheduler::ImportScheduler;
