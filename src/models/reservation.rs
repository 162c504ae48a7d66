//! Represents organization name reservations and their request payloads.

use super::{cloud::CloudReservation, owner::Owner};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A globally unique organization name held by exactly one owner.
///
/// The `uuid` survives ownership transfers; only `owner_id` changes.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrgReservation {
    pub uuid: Uuid,

    /// Reserved name, unique across all reservations.
    pub organization_name: String,

    /// Current owner.
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrgReservation {
    pub fn new(organization_name: impl Into<String>, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4(),
            organization_name: organization_name.into(),
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Joined view of a reservation, its owner and its cloud flags.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OrgReservationMapping {
    pub org_reservation: OrgReservation,
    pub owner: Owner,
    pub cloud_mapping: CloudReservation,
}

/// Body of `POST /org-reservations`.
#[derive(Debug, Deserialize)]
pub struct OrgReservationPayload {
    #[serde(rename = "orgName")]
    pub organization_name: String,
    #[serde(rename = "ownerEmail")]
    pub owner_email: String,
    #[serde(rename = "cloudService")]
    pub cloud_service: String,
}

/// Body of `PUT /owners/{ownersEmail}/org-mappings`.
#[derive(Debug, Deserialize)]
pub struct MappingUpdatePayload {
    #[serde(rename = "orgName")]
    pub organization_name: String,
    #[serde(rename = "newEmail")]
    pub new_owner_email: String,
}

/// Body of `DELETE /owners/{ownersEmail}/org-mappings`.
#[derive(Debug, Deserialize)]
pub struct ReservationDeletePayload {
    #[serde(rename = "orgName")]
    pub organization_name: String,
    #[serde(rename = "cloudService")]
    pub cloud_service: String,
}
