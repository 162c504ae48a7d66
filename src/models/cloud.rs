//! Cloud offerings a reservation can be claimed in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Closed set of cloud offerings, addressed on the wire by short tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloudKey {
    Choreo,
    Asgardio,
    Ballerina,
}

impl CloudKey {
    pub const CHOREO: &'static str = "CH";
    pub const ASGARDIO: &'static str = "AG";
    pub const BALLERINA: &'static str = "BL";

    /// Resolve a wire token. Unknown tokens yield `None`.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            Self::CHOREO => Some(Self::Choreo),
            Self::ASGARDIO => Some(Self::Asgardio),
            Self::BALLERINA => Some(Self::Ballerina),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Choreo => Self::CHOREO,
            Self::Asgardio => Self::ASGARDIO,
            Self::Ballerina => Self::BALLERINA,
        }
    }
}

/// Per-reservation cloud flags.
///
/// One-to-one with an [`OrgReservation`](super::reservation::OrgReservation)
/// through `reservation_id`. A persisted mapping always has at least one flag
/// set; the row is removed together with its reservation once the last flag
/// is cleared.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CloudReservation {
    pub reservation_id: Uuid,
    pub choreo_cloud: bool,
    pub asgardio_cloud: bool,
    pub ballerina_cloud: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CloudReservation {
    /// Empty mapping for a reservation, all flags cleared.
    pub fn new(reservation_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            reservation_id,
            choreo_cloud: false,
            asgardio_cloud: false,
            ballerina_cloud: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Copy of this mapping with the flag for `key` set to `value`.
    /// `None` leaves every flag untouched.
    pub fn with_flag(&self, key: Option<CloudKey>, value: bool) -> Self {
        let mut next = self.clone();
        match key {
            Some(CloudKey::Choreo) => next.choreo_cloud = value,
            Some(CloudKey::Asgardio) => next.asgardio_cloud = value,
            Some(CloudKey::Ballerina) => next.ballerina_cloud = value,
            None => {}
        }
        next
    }

    pub fn has_active_flag(&self) -> bool {
        self.choreo_cloud || self.asgardio_cloud || self.ballerina_cloud
    }

    /// Compare flags only, ignoring timestamps.
    pub fn same_flags(&self, other: &Self) -> bool {
        self.choreo_cloud == other.choreo_cloud
            && self.asgardio_cloud == other.asgardio_cloud
            && self.ballerina_cloud == other.ballerina_cloud
    }
}
