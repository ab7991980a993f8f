//! Catalog identifiers for space objects.
//!
//! A physical object is known under several catalogs at once (NORAD
//! catalog number, COSPAR international designator, internal ASO id).
//! Identifiers are normalized on construction so that `norad:00005` and
//! `norad:5` resolve to the same object.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogScheme {
    Norad,
    Cospar,
    Aso,
}

impl CatalogScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogScheme::Norad => "norad",
            CatalogScheme::Cospar => "cospar",
            CatalogScheme::Aso => "aso",
        }
    }
}

impl fmt::Display for CatalogScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CatalogScheme {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "norad" => Ok(CatalogScheme::Norad),
            "cospar" => Ok(CatalogScheme::Cospar),
            "aso" => Ok(CatalogScheme::Aso),
            other => Err(ValidationError::UnknownScheme(other.to_string())),
        }
    }
}

/// A normalized catalog identifier, written `scheme:value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CatalogId {
    scheme: CatalogScheme,
    value: String,
}

impl CatalogId {
    pub fn new(scheme: CatalogScheme, value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let raw = value.as_ref().trim();
        if raw.is_empty() {
            return Err(invalid(raw, "empty value"));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(invalid(raw, "contains whitespace"));
        }

        let value = match scheme {
            CatalogScheme::Norad => {
                if !raw.chars().all(|c| c.is_ascii_digit()) {
                    return Err(invalid(raw, "NORAD catalog numbers are numeric"));
                }
                let trimmed = raw.trim_start_matches('0');
                if trimmed.is_empty() {
                    "0".to_string()
                } else {
                    trimmed.to_string()
                }
            }
            CatalogScheme::Cospar => raw.to_ascii_uppercase(),
            CatalogScheme::Aso => raw.to_string(),
        };

        Ok(Self { scheme, value })
    }

    pub fn norad(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        Self::new(CatalogScheme::Norad, value)
    }

    pub fn cospar(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        Self::new(CatalogScheme::Cospar, value)
    }

    pub fn aso(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        Self::new(CatalogScheme::Aso, value)
    }

    pub fn scheme(&self) -> CatalogScheme {
        self.scheme
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Unique key used by the storage layer, identical to the display form.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

fn invalid(value: &str, reason: &'static str) -> ValidationError {
    ValidationError::InvalidCatalogId {
        value: value.to_string(),
        reason,
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.value)
    }
}

impl FromStr for CatalogId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, value) = s
            .split_once(':')
            .ok_or_else(|| invalid(s, "expected scheme:value"))?;
        Self::new(scheme.parse()?, value)
    }
}

impl TryFrom<String> for CatalogId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CatalogId> for String {
    fn from(id: CatalogId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norad_leading_zeros_are_normalized() {
        assert_eq!(CatalogId::norad("00005").unwrap(), CatalogId::norad("5").unwrap());
        assert_eq!(CatalogId::norad("000").unwrap().value(), "0");
    }

    #[test]
    fn test_norad_must_be_numeric() {
        assert!(CatalogId::norad("25544A").is_err());
        assert!(CatalogId::norad("  ").is_err());
    }

    #[test]
    fn test_cospar_is_upper_cased() {
        let id = CatalogId::cospar("1998-067a").unwrap();
        assert_eq!(id.value(), "1998-067A");
        assert_eq!(id.key(), "cospar:1998-067A");
    }

    #[test]
    fn test_parses_text_form() {
        let id: CatalogId = "NORAD:025544".parse().unwrap();
        assert_eq!(id.scheme(), CatalogScheme::Norad);
        assert_eq!(id.to_string(), "norad:25544");

        assert!("25544".parse::<CatalogId>().is_err());
        assert!(matches!(
            "tle:25544".parse::<CatalogId>(),
            Err(ValidationError::UnknownScheme(_))
        ));
    }

    #[test]
    fn test_serializes_as_string() {
        let id = CatalogId::norad("25544").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"norad:25544\"");
        let back: CatalogId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
