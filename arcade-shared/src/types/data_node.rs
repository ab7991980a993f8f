//! Derived data nodes and their payloads.
//!
//! Every data node variant is attached to exactly one space object and is
//! provided by exactly one data source. Both links are captured by the
//! [`Provenance`] value that [`NewDataNode::new`] requires, so a node without
//! provenance cannot be constructed in the first place.
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::types::{CosObjectId, DataNodeId, DataSourceId, SpaceObjectId};

/// Reference frames accepted for orbit ephemeris messages.
pub const REFERENCE_FRAMES: &[&str] = &[
    "EME2000", "GCRF", "ICRF", "ITRF2000", "ITRF-93", "ITRF-97", "TEME", "TOD",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataNodeKind {
    Ephemeris,
    TwoLineElements,
    Compliance,
}

impl DataNodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataNodeKind::Ephemeris => "ephemeris",
            DataNodeKind::TwoLineElements => "two_line_elements",
            DataNodeKind::Compliance => "compliance",
        }
    }
}

impl fmt::Display for DataNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataNodeKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ephemeris" => Ok(DataNodeKind::Ephemeris),
            "two_line_elements" => Ok(DataNodeKind::TwoLineElements),
            "compliance" => Ok(DataNodeKind::Compliance),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

/// A single line of ephemeris data: epoch and 6-dimensional state vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EphemerisLine {
    pub epoch: String,
    pub state_vector: [f64; 6],
}

/// Ephemeris data for a single object, as carried by a CCSDS OEM.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrbitEphemerisMessage {
    pub ccsds_oem_vers: String,
    pub creation_date: String,
    pub originator: String,
    pub object_name: String,
    pub object_id: String,
    pub center_name: String,
    pub ref_frame: String,
    pub time_system: String,
    pub start_time: String,
    pub stop_time: String,
    pub ephemeris_lines: Vec<EphemerisLine>,
}

/// A two-line element set as published by TLE providers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TwoLineElementSet {
    pub name: Option<String>,
    pub line1: String,
    pub line2: String,
    pub epoch: DateTime<Utc>,
}

/// UN registration compliance status of an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnCompliance {
    pub is_compliant: bool,
    pub calc_time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum DataPayload {
    Ephemeris(OrbitEphemerisMessage),
    TwoLineElements(TwoLineElementSet),
    Compliance(UnCompliance),
}

impl DataPayload {
    pub fn kind(&self) -> DataNodeKind {
        match self {
            DataPayload::Ephemeris(_) => DataNodeKind::Ephemeris,
            DataPayload::TwoLineElements(_) => DataNodeKind::TwoLineElements,
            DataPayload::Compliance(_) => DataNodeKind::Compliance,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            DataPayload::Ephemeris(oem) => {
                if !REFERENCE_FRAMES.contains(&oem.ref_frame.as_str()) {
                    return Err(ValidationError::payload(format!(
                        "unknown reference frame {}",
                        oem.ref_frame
                    )));
                }
                if oem.ephemeris_lines.is_empty() {
                    return Err(ValidationError::payload("ephemeris has no state vectors"));
                }
                if oem
                    .ephemeris_lines
                    .iter()
                    .any(|line| line.state_vector.iter().any(|v| !v.is_finite()))
                {
                    return Err(ValidationError::payload("state vector is not finite"));
                }
                Ok(())
            }
            DataPayload::TwoLineElements(tle) => {
                if !tle.line1.starts_with("1 ") || !tle.line2.starts_with("2 ") {
                    return Err(ValidationError::payload("element set lines out of order"));
                }
                Ok(())
            }
            DataPayload::Compliance(compliance) => {
                if compliance.calc_time.trim().is_empty() {
                    return Err(ValidationError::MissingField("calc_time"));
                }
                Ok(())
            }
        }
    }
}

/// The two mandatory, immutable edges of every data node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Provenance {
    pub space_object: SpaceObjectId,
    pub data_source: DataSourceId,
}

/// Validation shared by every data node variant.
pub fn validate_data_node(dedup_key: &str, payload: &DataPayload) -> Result<(), ValidationError> {
    if dedup_key.trim().is_empty() {
        return Err(ValidationError::MissingField("dedup_key"));
    }
    payload.validate()
}

/// A data node that has not been written yet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewDataNode {
    pub provenance: Provenance,
    pub dedup_key: String,
    /// Identity of the importer write that produced this node. A second
    /// insert with the same ingest key is a replay and writes nothing.
    pub ingest_key: Option<String>,
    pub payload: DataPayload,
    pub artifact: Option<CosObjectId>,
}

impl NewDataNode {
    pub fn new(
        provenance: Provenance,
        dedup_key: impl Into<String>,
        payload: DataPayload,
    ) -> Result<Self, ValidationError> {
        let dedup_key = dedup_key.into();
        validate_data_node(&dedup_key, &payload)?;
        Ok(Self {
            provenance,
            dedup_key,
            ingest_key: None,
            payload,
            artifact: None,
        })
    }

    pub fn with_artifact(mut self, artifact: Option<CosObjectId>) -> Self {
        self.artifact = artifact;
        self
    }

    pub fn with_ingest_key(mut self, ingest_key: impl Into<String>) -> Self {
        self.ingest_key = Some(ingest_key.into());
        self
    }

    pub fn kind(&self) -> DataNodeKind {
        self.payload.kind()
    }
}

/// A stored data node.
///
/// `provided_by` is optional only because storage can hold nodes whose
/// source edge has gone missing; such nodes are orphaned and never readable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataNode {
    pub id: DataNodeId,
    pub space_object: SpaceObjectId,
    pub provided_by: Option<DataSourceId>,
    pub kind: DataNodeKind,
    pub dedup_key: String,
    pub ingest_key: Option<String>,
    pub version: u32,
    pub payload: DataPayload,
    pub artifact: Option<CosObjectId>,
    pub created_at: DateTime<Utc>,
}

impl DataNode {
    /// Materializes a new node at the given version.
    pub fn from_new(node: &NewDataNode, version: u32) -> Self {
        Self {
            id: DataNodeId::new(),
            space_object: node.provenance.space_object,
            provided_by: Some(node.provenance.data_source),
            kind: node.payload.kind(),
            dedup_key: node.dedup_key.clone(),
            ingest_key: node.ingest_key.clone(),
            version,
            payload: node.payload.clone(),
            artifact: node.artifact,
            created_at: Utc::now(),
        }
    }
}
