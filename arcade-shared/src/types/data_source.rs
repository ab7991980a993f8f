use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::types::DataSourceId;

/// How a source's re-ingested records are stored.
///
/// * `ExactKey` - a record whose dedup key already exists produces no new node.
/// * `AlwaysNew` - every ingestion produces a new version; older versions are kept.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupePolicy {
    #[default]
    ExactKey,
    AlwaysNew,
}

impl DedupePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DedupePolicy::ExactKey => "exact-key",
            DedupePolicy::AlwaysNew => "always-new",
        }
    }
}

impl fmt::Display for DedupePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DedupePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact-key" | "exact_key" => Ok(DedupePolicy::ExactKey),
            "always-new" | "always_new" => Ok(DedupePolicy::AlwaysNew),
            other => Err(ValidationError::UnknownDedupePolicy(other.to_string())),
        }
    }
}

/// Registration request for a data source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceSpec {
    pub name: String,
    pub public: bool,
    pub dedupe: DedupePolicy,
}

impl DataSourceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            public: false,
            dedupe: DedupePolicy::default(),
        }
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn dedupe(mut self, dedupe: DedupePolicy) -> Self {
        self.dedupe = dedupe;
        self
    }
}

/// A named external feed or provider.
///
/// When `public` is set every user may read the data it provides without an
/// explicit `has_access` grant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    pub id: DataSourceId,
    pub name: String,
    pub public: bool,
    pub dedupe: DedupePolicy,
}
