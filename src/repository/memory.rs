//! In-memory [`ReservationStore`] for engine tests.
//!
//! Enforces the same uniqueness rules as the SQLite schema and counts every
//! write so tests can assert that a call performed none.

use super::{ReservationStore, StoreError, StoreResult};
use crate::models::{
    cloud::CloudReservation,
    owner::Owner,
    reservation::{OrgReservation, OrgReservationMapping},
};
use chrono::Utc;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    owners: HashMap<Uuid, Owner>,
    reservations: HashMap<Uuid, OrgReservation>,
    clouds: HashMap<Uuid, CloudReservation>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    writes: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    /// When set, name lookups report every name as free.
    stale_name_reads: Arc<AtomicBool>,
    /// When set, the joined ownership lookup returns its row and then drops
    /// the reservation, as if another caller released it in between.
    release_after_lookup: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_stale_name_reads(&self, stale: bool) {
        self.stale_name_reads.store(stale, Ordering::SeqCst);
    }

    pub fn set_release_after_lookup(&self, release: bool) {
        self.release_after_lookup.store(release, Ordering::SeqCst);
    }

    pub async fn cloud_mapping(&self, reservation_id: Uuid) -> Option<CloudReservation> {
        self.tables.lock().await.clouds.get(&reservation_id).cloned()
    }

    pub async fn reservation(&self, uuid: Uuid) -> Option<OrgReservation> {
        self.tables.lock().await.reservations.get(&uuid).cloned()
    }

    pub async fn owner_count(&self) -> usize {
        self.tables.lock().await.owners.len()
    }

    fn read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

impl Tables {
    fn name_taken(&self, name: &str) -> bool {
        self.reservations
            .values()
            .any(|r| r.organization_name == name)
    }
}

impl ReservationStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn find_owner_by_email(&self, email: &str) -> StoreResult<Option<Owner>> {
        self.read();
        let tables = self.tables.lock().await;
        Ok(tables.owners.values().find(|o| o.email == email).cloned())
    }

    async fn create_owner(&self, owner: Owner) -> StoreResult<Owner> {
        self.write();
        let mut tables = self.tables.lock().await;
        if tables.owners.values().any(|o| o.email == owner.email) {
            return Err(StoreError::Conflict(owner.email));
        }
        tables.owners.insert(owner.id, owner.clone());
        Ok(owner)
    }

    async fn update_owner_email(&self, owner_id: Uuid, new_email: &str) -> StoreResult<()> {
        self.write();
        let mut tables = self.tables.lock().await;
        if let Some(owner) = tables.owners.get_mut(&owner_id) {
            owner.email = new_email.to_string();
            owner.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_reservation_by_name(&self, name: &str) -> StoreResult<Option<OrgReservation>> {
        self.read();
        if self.stale_name_reads.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let tables = self.tables.lock().await;
        Ok(tables
            .reservations
            .values()
            .find(|r| r.organization_name == name)
            .cloned())
    }

    async fn find_reservation_by_name_and_owner_email(
        &self,
        name: &str,
        email: &str,
    ) -> StoreResult<Option<OrgReservationMapping>> {
        self.read();
        let mut tables = self.tables.lock().await;
        let Some(reservation) = tables
            .reservations
            .values()
            .find(|r| r.organization_name == name)
        else {
            return Ok(None);
        };
        let Some(owner) = tables.owners.get(&reservation.owner_id) else {
            return Ok(None);
        };
        if owner.email != email {
            return Ok(None);
        }
        let Some(cloud) = tables.clouds.get(&reservation.uuid) else {
            return Ok(None);
        };
        let mapping = OrgReservationMapping {
            org_reservation: reservation.clone(),
            owner: owner.clone(),
            cloud_mapping: cloud.clone(),
        };
        if self.release_after_lookup.load(Ordering::SeqCst) {
            let uuid = mapping.org_reservation.uuid;
            tables.clouds.remove(&uuid);
            tables.reservations.remove(&uuid);
        }
        Ok(Some(mapping))
    }

    async fn create_reservation(&self, reservation: OrgReservation) -> StoreResult<OrgReservation> {
        self.write();
        let mut tables = self.tables.lock().await;
        if tables.name_taken(&reservation.organization_name) {
            return Err(StoreError::Conflict(reservation.organization_name));
        }
        tables.reservations.insert(reservation.uuid, reservation.clone());
        Ok(reservation)
    }

    async fn update_reservation_owner(&self, uuid: Uuid, new_owner_id: Uuid) -> StoreResult<()> {
        self.write();
        let mut tables = self.tables.lock().await;
        let Some(reservation) = tables.reservations.get_mut(&uuid) else {
            return Err(StoreError::Missing(uuid.to_string()));
        };
        reservation.owner_id = new_owner_id;
        reservation.updated_at = Utc::now();
        Ok(())
    }

    async fn create_cloud_mapping(&self, mapping: CloudReservation) -> StoreResult<CloudReservation> {
        self.write();
        let mut tables = self.tables.lock().await;
        tables.clouds.insert(mapping.reservation_id, mapping.clone());
        Ok(mapping)
    }

    async fn update_cloud_mapping(&self, mapping: &CloudReservation) -> StoreResult<()> {
        self.write();
        let mut tables = self.tables.lock().await;
        let Some(stored) = tables.clouds.get_mut(&mapping.reservation_id) else {
            return Err(StoreError::Missing(mapping.reservation_id.to_string()));
        };
        *stored = mapping.clone();
        Ok(())
    }

    async fn delete_cloud_mapping(&self, reservation_id: Uuid) -> StoreResult<()> {
        self.write();
        self.tables.lock().await.clouds.remove(&reservation_id);
        Ok(())
    }

    async fn delete_reservation(&self, uuid: Uuid) -> StoreResult<()> {
        self.write();
        self.tables.lock().await.reservations.remove(&uuid);
        Ok(())
    }

    async fn list_organization_names_by_owner_email(&self, email: &str) -> StoreResult<Vec<String>> {
        self.read();
        let tables = self.tables.lock().await;
        let mut names: Vec<String> = tables
            .reservations
            .values()
            .filter(|r| {
                tables
                    .owners
                    .get(&r.owner_id)
                    .is_some_and(|o| o.email == email)
            })
            .map(|r| r.organization_name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn create_reservation_with_mapping(
        &self,
        reservation: OrgReservation,
        mapping: CloudReservation,
    ) -> StoreResult<(OrgReservation, CloudReservation)> {
        self.write();
        let mut tables = self.tables.lock().await;
        if tables.name_taken(&reservation.organization_name) {
            return Err(StoreError::Conflict(reservation.organization_name));
        }
        tables.reservations.insert(reservation.uuid, reservation.clone());
        tables.clouds.insert(mapping.reservation_id, mapping.clone());
        Ok((reservation, mapping))
    }

    async fn delete_reservation_with_mapping(&self, uuid: Uuid) -> StoreResult<()> {
        self.write();
        let mut tables = self.tables.lock().await;
        tables.clouds.remove(&uuid);
        tables.reservations.remove(&uuid);
        Ok(())
    }
}
