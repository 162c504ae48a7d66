//! Persistence port for reservations, owners and cloud mappings.
//!
//! The engine only talks to storage through [`ReservationStore`]; the SQLite
//! implementation lives in [`sqlite`]. Single-record lookups return `Option`,
//! never a not-found error.

#[cfg(test)]
pub mod memory;
pub mod sqlite;

use crate::models::{
    cloud::CloudReservation,
    owner::Owner,
    reservation::{OrgReservation, OrgReservationMapping},
};
use std::future::Future;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    /// An update matched no row; the record was removed concurrently.
    #[error("no such record: {0}")]
    Missing(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage used by the reservation engine.
///
/// Composite writes (`create_reservation_with_mapping`,
/// `delete_reservation_with_mapping`) are all-or-nothing.
pub trait ReservationStore: Clone + Send + Sync + 'static {
    /// Cheap round trip used by the readiness probe.
    fn ping(&self) -> impl Future<Output = StoreResult<()>> + Send;

    fn find_owner_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = StoreResult<Option<Owner>>> + Send;

    /// Insert a new owner. Fails with `Conflict` if the email is taken.
    fn create_owner(&self, owner: Owner) -> impl Future<Output = StoreResult<Owner>> + Send;

    fn update_owner_email(
        &self,
        owner_id: Uuid,
        new_email: &str,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn find_reservation_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = StoreResult<Option<OrgReservation>>> + Send;

    /// Joined view of `name` if, and only if, it is owned by `email`.
    fn find_reservation_by_name_and_owner_email(
        &self,
        name: &str,
        email: &str,
    ) -> impl Future<Output = StoreResult<Option<OrgReservationMapping>>> + Send;

    /// Insert a reservation. Fails with `Conflict` if the name is taken.
    fn create_reservation(
        &self,
        reservation: OrgReservation,
    ) -> impl Future<Output = StoreResult<OrgReservation>> + Send;

    /// Fails with `Missing` if the reservation no longer exists.
    fn update_reservation_owner(
        &self,
        uuid: Uuid,
        new_owner_id: Uuid,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn create_cloud_mapping(
        &self,
        mapping: CloudReservation,
    ) -> impl Future<Output = StoreResult<CloudReservation>> + Send;

    /// Fails with `Missing` if the reservation has no cloud mapping.
    fn update_cloud_mapping(
        &self,
        mapping: &CloudReservation,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    fn delete_cloud_mapping(&self, reservation_id: Uuid)
    -> impl Future<Output = StoreResult<()>> + Send;

    fn delete_reservation(&self, uuid: Uuid) -> impl Future<Output = StoreResult<()>> + Send;

    /// Names owned by `email`, ordered by name.
    fn list_organization_names_by_owner_email(
        &self,
        email: &str,
    ) -> impl Future<Output = StoreResult<Vec<String>>> + Send;

    /// Insert a reservation and its cloud mapping as one unit.
    /// Fails with `Conflict` if the name is taken; nothing is written then.
    fn create_reservation_with_mapping(
        &self,
        reservation: OrgReservation,
        mapping: CloudReservation,
    ) -> impl Future<Output = StoreResult<(OrgReservation, CloudReservation)>> + Send;

    /// Remove a reservation and its cloud mapping as one unit.
    fn delete_reservation_with_mapping(
        &self,
        uuid: Uuid,
    ) -> impl Future<Output = StoreResult<()>> + Send;
}
