use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DataNodeId, UserId};

/// One `accessed` edge: `user` read `data_node` through `endpoint`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    pub user: UserId,
    pub data_node: DataNodeId,
    pub endpoint: String,
    pub accessed_at: DateTime<Utc>,
}

impl AccessEvent {
    pub fn now(user: UserId, data_node: DataNodeId, endpoint: impl Into<String>) -> Self {
        Self {
            user,
            data_node,
            endpoint: endpoint.into(),
            accessed_at: Utc::now(),
        }
    }
}

/// Per-user row of the usage report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccessCount {
    pub user: UserId,
    pub email: String,
    pub access_count: u64,
}
