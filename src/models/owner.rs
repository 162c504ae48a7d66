//! Represents an owner, the email-identified holder of reservations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An owner of one or more organization name reservations.
///
/// At most one owner exists per email address. Owners are created lazily the
/// first time an email reserves a name or receives one through a transfer.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    /// Internal identifier.
    pub id: Uuid,

    /// Unique email address of the owner.
    pub email: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Owner {
    /// Build a fresh, not yet persisted owner for `email`.
    pub fn new(email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
