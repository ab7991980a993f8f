//! Settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use arcade_shared::types::DedupePolicy;

use crate::errors::ConfigError;

/// Default sleep between import cycles.
pub const DEFAULT_IMPORT_INTERVAL_SECS: u64 = 3600;

/// Default Neo4j user when only `NEO4J_URI` is given.
pub const DEFAULT_NEO4J_USER: &str = "neo4j";

/// Bucket name of the in-memory archive.
pub const DEFAULT_ARCHIVE_BUCKET: &str = "arcade-archive";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`. Unknown values fall back to pretty output; the
    /// second value is the rejected input so it can be logged once tracing
    /// is up.
    pub fn from_env() -> (Self, Option<String>) {
        match env::var("LOG_FORMAT") {
            Err(_) => (Self::Pretty, None),
            Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
                "json" => (Self::Json, None),
                "pretty" | "" => (Self::Pretty, None),
                _ => (Self::Pretty, Some(value)),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neo4jSettings {
    pub uri: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CosSettings {
    pub endpoint: String,
    pub bucket: String,
    pub token: Option<String>,
}

/// Location of one feed and its dedupe override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSettings<L> {
    pub location: L,
    pub dedupe: Option<DedupePolicy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// `None` selects the in-memory graph.
    pub neo4j: Option<Neo4jSettings>,
    /// `None` selects the in-memory archive.
    pub cos: Option<CosSettings>,
    pub tle: Option<FeedSettings<String>>,
    pub ut_oem: Option<FeedSettings<PathBuf>>,
    pub starlink_oem: Option<FeedSettings<PathBuf>>,
    pub compliance: Option<FeedSettings<PathBuf>>,
    pub import_interval: Duration,
    pub run_deadline: Option<Duration>,
}

impl Settings {
    /// Reads the settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `NEO4J_URI`, `NEO4J_USER` (default: neo4j), `NEO4J_PASSWORD`
    /// - `COS_ENDPOINT`, `COS_BUCKET`, `COS_API_TOKEN`
    /// - `TLE_URL`, `UT_OEM_PATH`, `STARLINK_OEM_PATH`, `COMPLIANCE_PATH`
    /// - `TLE_DEDUPE`, `UT_OEM_DEDUPE`, `STARLINK_OEM_DEDUPE`, `COMPLIANCE_DEDUPE`
    /// - `IMPORT_INTERVAL_SECS` (default: 3600), `IMPORT_RUN_DEADLINE_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        let neo4j = match var("NEO4J_URI") {
            None => None,
            Some(uri) => Some(Neo4jSettings {
                uri,
                user: var("NEO4J_USER").unwrap_or_else(|| DEFAULT_NEO4J_USER.to_string()),
                password: var("NEO4J_PASSWORD").ok_or(ConfigError::Incomplete {
                    name: "NEO4J_URI",
                    requires: "NEO4J_PASSWORD",
                })?,
            }),
        };

        let cos = match var("COS_ENDPOINT") {
            None => None,
            Some(endpoint) => Some(CosSettings {
                endpoint,
                bucket: var("COS_BUCKET").ok_or(ConfigError::Incomplete {
                    name: "COS_ENDPOINT",
                    requires: "COS_BUCKET",
                })?,
                token: var("COS_API_TOKEN"),
            }),
        };

        let import_interval = seconds("IMPORT_INTERVAL_SECS")?
            .unwrap_or(Duration::from_secs(DEFAULT_IMPORT_INTERVAL_SECS));

        Ok(Self {
            neo4j,
            cos,
            tle: feed("TLE_URL", "TLE_DEDUPE", |url| url)?,
            ut_oem: feed("UT_OEM_PATH", "UT_OEM_DEDUPE", PathBuf::from)?,
            starlink_oem: feed("STARLINK_OEM_PATH", "STARLINK_OEM_DEDUPE", PathBuf::from)?,
            compliance: feed("COMPLIANCE_PATH", "COMPLIANCE_DEDUPE", PathBuf::from)?,
            import_interval,
            run_deadline: seconds("IMPORT_RUN_DEADLINE_SECS")?,
        })
    }
}

/// A set, non-blank variable.
fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed<T>(name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    var(name)
        .map(|value| value.parse().map_err(|e| ConfigError::invalid(name, &value, e)))
        .transpose()
}

/// A positive number of seconds.
fn seconds(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match parsed::<u64>(name)? {
        Some(0) => Err(ConfigError::invalid(name, "0", "must be at least one second")),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

fn feed<L>(
    location: &'static str,
    dedupe: &'static str,
    into_location: impl FnOnce(String) -> L,
) -> Result<Option<FeedSettings<L>>, ConfigError> {
    let dedupe = parsed::<DedupePolicy>(dedupe)?;
    Ok(var(location).map(|value| FeedSettings {
        location: into_location(value),
        dedupe,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "NEO4J_URI",
        "NEO4J_USER",
        "NEO4J_PASSWORD",
        "COS_ENDPOINT",
        "COS_BUCKET",
        "COS_API_TOKEN",
        "TLE_URL",
        "UT_OEM_PATH",
        "STARLINK_OEM_PATH",
        "COMPLIANCE_PATH",
        "TLE_DEDUPE",
        "UT_OEM_DEDUPE",
        "STARLINK_OEM_DEDUPE",
        "COMPLIANCE_DEDUPE",
        "IMPORT_INTERVAL_SECS",
        "IMPORT_RUN_DEADLINE_SECS",
        "LOG_FORMAT",
    ];

    // Helper function to clear environment variables
    fn clear_env_vars() {
        for name in VARS {
            unsafe {
                env::remove_var(name);
            }
        }
    }

    fn set(name: &str, value: &str) {
        unsafe {
            env::set_var(name, value);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env_vars();
        let settings = Settings::from_env().unwrap();

        assert_eq!(settings.neo4j, None);
        assert_eq!(settings.cos, None);
        assert_eq!(settings.tle, None);
        assert_eq!(settings.ut_oem, None);
        assert_eq!(settings.import_interval, Duration::from_secs(DEFAULT_IMPORT_INTERVAL_SECS));
        assert_eq!(settings.run_deadline, None);
    }

    #[test]
    #[serial]
    fn test_reads_feeds_and_overrides() {
        clear_env_vars();
        set("NEO4J_URI", "bolt://localhost:7687");
        set("NEO4J_PASSWORD", "secret");
        set("TLE_URL", "https://celestrak.example/tle.txt");
        set("COMPLIANCE_PATH", "/data/compliance");
        set("COMPLIANCE_DEDUPE", "exact-key");
        set("IMPORT_INTERVAL_SECS", "60");
        set("IMPORT_RUN_DEADLINE_SECS", "30");

        let settings = Settings::from_env().unwrap();
        assert_eq!(
            settings.neo4j,
            Some(Neo4jSettings {
                uri: "bolt://localhost:7687".to_string(),
                user: DEFAULT_NEO4J_USER.to_string(),
                password: "secret".to_string(),
            })
        );
        assert_eq!(settings.tle.unwrap().dedupe, None);
        let compliance = settings.compliance.unwrap();
        assert_eq!(compliance.location, PathBuf::from("/data/compliance"));
        assert_eq!(compliance.dedupe, Some(DedupePolicy::ExactKey));
        assert_eq!(settings.import_interval, Duration::from_secs(60));
        assert_eq!(settings.run_deadline, Some(Duration::from_secs(30)));
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_errors() {
        clear_env_vars();
        set("IMPORT_INTERVAL_SECS", "hourly");
        assert!(matches!(
            Settings::from_env(),
            Err(ConfigError::Invalid { name: "IMPORT_INTERVAL_SECS", .. })
        ));

        clear_env_vars();
        set("IMPORT_INTERVAL_SECS", "0");
        assert!(matches!(
            Settings::from_env(),
            Err(ConfigError::Invalid { name: "IMPORT_INTERVAL_SECS", .. })
        ));

        clear_env_vars();
        set("IMPORT_RUN_DEADLINE_SECS", "0");
        assert_eq!(
            Settings::from_env(),
            Err(ConfigError::invalid(
                "IMPORT_RUN_DEADLINE_SECS",
                "0",
                "must be at least one second"
            ))
        );

        clear_env_vars();
        set("UT_OEM_DEDUPE", "sometimes");
        assert!(matches!(
            Settings::from_env(),
            Err(ConfigError::Invalid { name: "UT_OEM_DEDUPE", .. })
        ));

        clear_env_vars();
        set("COS_ENDPOINT", "https://cos.example");
        assert_eq!(
            Settings::from_env(),
            Err(ConfigError::Incomplete {
                name: "COS_ENDPOINT",
                requires: "COS_BUCKET",
            })
        );
        clear_env_vars();
    }

    #[test]
    #[serial]
    fn test_unknown_log_format_falls_back_to_pretty() {
        clear_env_vars();
        assert_eq!(LogFormat::from_env(), (LogFormat::Pretty, None));

        set("LOG_FORMAT", "JSON");
        assert_eq!(LogFormat::from_env(), (LogFormat::Json, None));

        set("LOG_FORMAT", "xml");
        assert_eq!(LogFormat::from_env(), (LogFormat::Pretty, Some("xml".to_string())));
        clear_env_vars();
    }
}
