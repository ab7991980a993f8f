use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::types::UserId;

/// An API principal. Credentials are managed outside the graph core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Trims and lower-cases an email address, rejecting obviously invalid ones.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && domain.contains('.') && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(ValidationError::InvalidEmail(email)),
    }
}
