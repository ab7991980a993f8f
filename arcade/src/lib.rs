//! # Arcade
//!
//! Service entry point for ASO data fusion: imports orbital data feeds into
//! the provenance graph and exposes the access gate and audit trail that an
//! API layer consults before returning data.
//!
//! ## Modules
//!
//! - [`config`]: Settings and dependency initialization
//! - [`errors`]: Error types for the service
//! - [`telemetry`]: Tracing setup

pub mod config;
pub mod errors;
pub mod telemetry;

pub use config::{Dependencies, Settings};
pub use errors::{ArcadeError, ConfigError};
