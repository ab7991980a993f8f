//! Strongly-typed node identifiers.
//!
//! Every graph node carries a UUID; wrapping each one in its own type keeps a
//! `UserId` from being passed where a `DataNodeId` is expected.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generates a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

node_id!(
    /// Identifies a `SpaceObject` node.
    SpaceObjectId
);
node_id!(
    /// Identifies a `DataSource` node.
    DataSourceId
);
node_id!(
    /// Identifies a derived data node (ephemeris, TLE, compliance, ...).
    DataNodeId
);
node_id!(
    /// Identifies a `User` principal.
    UserId
);
node_id!(
    /// Identifies a `COSObject` node.
    CosObjectId
);
