//! src/services/reservation_service.rs
//!
//! ReservationService - decides, for an organization name, an owner email and
//! a cloud token, whether to create a reservation, extend it with another
//! cloud, hand it to a new owner, or retract a cloud from it.
//!
//! The service holds no state of its own between calls; everything is read
//! from and written to the injected [`ReservationStore`]. Check-then-act
//! sequences are not locked: the store's uniqueness constraints are the final
//! word, and a `Conflict` from an insert is reported as
//! [`ReservationError::DuplicateReservation`] even if the preceding existence
//! check said the name was free.

use crate::{
    models::{
        cloud::{CloudKey, CloudReservation},
        owner::Owner,
        reservation::{OrgReservation, OrgReservationMapping},
    },
    repository::{ReservationStore, StoreError},
    services::validation::{is_valid_email, is_valid_org_name},
};
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

const INVALID_EMAIL: &str = "Email is invalid";
const INVALID_ORG_NAME: &str =
    "Organization name should contain only alphanumeric characters and underscores";

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0} is already reserved by another user")]
    DuplicateReservation(String),
    #[error(transparent)]
    Internal(#[from] StoreError),
}

pub type ReservationResult<T> = Result<T, ReservationError>;

/// The reservation engine.
///
/// Constructed once with its store and handed to the HTTP layer as router
/// state. Cloning is cheap when the store is.
#[derive(Clone)]
pub struct ReservationService<S> {
    store: S,
}

fn ensure_email(email: &str) -> ReservationResult<()> {
    if is_valid_email(email) {
        Ok(())
    } else {
        warn!(email, "rejected malformed email");
        Err(ReservationError::InvalidRequest(INVALID_EMAIL.into()))
    }
}

fn ensure_org_name(name: &str) -> ReservationResult<()> {
    if is_valid_org_name(name) {
        Ok(())
    } else {
        warn!(org_name = name, "rejected malformed organization name");
        Err(ReservationError::InvalidRequest(INVALID_ORG_NAME.into()))
    }
}

/// An update that found no row means the reservation was released after it
/// was looked up.
fn released_or(err: StoreError, name: &str) -> ReservationError {
    match err {
        StoreError::Missing(_) => {
            warn!(org_name = name, "reservation released during update");
            ReservationError::NotFound(format!("{} is not found in the registry", name))
        }
        err => err.into(),
    }
}

impl<S: ReservationStore> ReservationService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reserve `name` for `email` in the cloud named by `cloud_service`, or
    /// add that cloud to a reservation `email` already holds.
    ///
    /// Re-requesting a cloud that is already set returns the stored mapping
    /// without writing anything. A name held by anyone else fails with
    /// `DuplicateReservation`.
    pub async fn create_or_extend_reservation(
        &self,
        name: &str,
        email: &str,
        cloud_service: &str,
    ) -> ReservationResult<OrgReservationMapping> {
        debug!(org_name = name, cloud_service, "create_or_extend_reservation");
        ensure_email(email)?;
        ensure_org_name(name)?;
        let key = CloudKey::parse(cloud_service);

        if let Some(own) = self.lookup_own_reservation(name, email).await? {
            let requested = own.cloud_mapping.with_flag(key, true);
            if requested.same_flags(&own.cloud_mapping) {
                debug!(org_name = name, "cloud mapping unchanged");
                return Ok(own);
            }

            let updated = CloudReservation {
                updated_at: Utc::now(),
                ..requested
            };
            self.store
                .update_cloud_mapping(&updated)
                .await
                .map_err(|err| released_or(err, name))?;
            info!(org_name = name, cloud_service, "extended reservation to cloud");
            return Ok(OrgReservationMapping {
                cloud_mapping: updated,
                ..own
            });
        }

        if self.store.find_reservation_by_name(name).await?.is_some() {
            warn!(org_name = name, "organization name is reserved by another owner");
            return Err(ReservationError::DuplicateReservation(name.to_string()));
        }

        // A new reservation must start with one active cloud.
        let Some(key) = key else {
            warn!(cloud_service, "unknown cloud service for new reservation");
            return Err(ReservationError::InvalidRequest(format!(
                "Unknown cloud service `{}`",
                cloud_service
            )));
        };

        let owner = self.resolve_owner(email).await?;
        let reservation = OrgReservation::new(name, owner.id);
        let mapping = CloudReservation::new(reservation.uuid).with_flag(Some(key), true);

        match self
            .store
            .create_reservation_with_mapping(reservation, mapping)
            .await
        {
            Ok((org_reservation, cloud_mapping)) => {
                info!(
                    org_name = name,
                    reservation = %org_reservation.uuid,
                    cloud_service = key.as_str(),
                    "created reservation"
                );
                Ok(OrgReservationMapping {
                    org_reservation,
                    owner,
                    cloud_mapping,
                })
            }
            Err(StoreError::Conflict(_)) => {
                warn!(org_name = name, "lost reservation race");
                Err(ReservationError::DuplicateReservation(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// The joined mapping for `name` if `email` owns it, `None` otherwise.
    pub async fn lookup_own_reservation(
        &self,
        name: &str,
        email: &str,
    ) -> ReservationResult<Option<OrgReservationMapping>> {
        ensure_email(email)?;
        Ok(self
            .store
            .find_reservation_by_name_and_owner_email(name, email)
            .await?)
    }

    /// Hand `name` from `current_email` to `new_email`.
    ///
    /// The reservation keeps its uuid and cloud flags. The new owner is
    /// looked up (or created) in the store on every call.
    pub async fn transfer_ownership(
        &self,
        name: &str,
        current_email: &str,
        new_email: &str,
    ) -> ReservationResult<OrgReservationMapping> {
        debug!(org_name = name, "transfer_ownership");
        ensure_org_name(name)?;
        ensure_email(new_email)?;

        let Some(own) = self.lookup_own_reservation(name, current_email).await? else {
            warn!(org_name = name, "no reservation owned by the current owner");
            return Err(ReservationError::NotFound(format!(
                "Cannot find a reservation mapping with {} reservation name",
                name
            )));
        };

        let new_owner = self.resolve_owner(new_email).await?;
        self.store
            .update_reservation_owner(own.org_reservation.uuid, new_owner.id)
            .await
            .map_err(|err| released_or(err, name))?;

        let org_reservation = self
            .store
            .find_reservation_by_name(name)
            .await?
            .ok_or_else(|| {
                ReservationError::NotFound(format!("{} is not found in the registry", name))
            })?;

        info!(
            org_name = name,
            reservation = %org_reservation.uuid,
            new_owner = %new_owner.id,
            "transferred reservation"
        );
        Ok(OrgReservationMapping {
            org_reservation,
            owner: new_owner,
            cloud_mapping: own.cloud_mapping,
        })
    }

    /// Clear the cloud named by `cloud_service` from a reservation `email`
    /// owns. Unknown tokens change nothing.
    ///
    /// Retracting the last active cloud releases the name: the cloud mapping
    /// and the reservation are deleted together and the name becomes
    /// available to anyone.
    pub async fn retract_cloud_flag(
        &self,
        name: &str,
        email: &str,
        cloud_service: &str,
    ) -> ReservationResult<()> {
        debug!(org_name = name, cloud_service, "retract_cloud_flag");
        ensure_email(email)?;

        let Some(own) = self.lookup_own_reservation(name, email).await? else {
            warn!(org_name = name, "no reservation owned by caller");
            return Err(ReservationError::NotFound(format!(
                "{} is not found in the registry with your ownership",
                name
            )));
        };

        let cleared = own
            .cloud_mapping
            .with_flag(CloudKey::parse(cloud_service), false);
        if cleared.same_flags(&own.cloud_mapping) {
            return Ok(());
        }

        if cleared.has_active_flag() {
            let updated = CloudReservation {
                updated_at: Utc::now(),
                ..cleared
            };
            self.store
                .update_cloud_mapping(&updated)
                .await
                .map_err(|err| released_or(err, name))?;
            info!(org_name = name, cloud_service, "retracted cloud from reservation");
        } else {
            self.store
                .delete_reservation_with_mapping(own.org_reservation.uuid)
                .await?;
            info!(org_name = name, "last cloud retracted, reservation released");
        }
        Ok(())
    }

    /// Confirm `name` is reserved without revealing by whom.
    pub async fn search_reservation_by_name(&self, name: &str) -> ReservationResult<String> {
        match self.store.find_reservation_by_name(name).await? {
            Some(found) => Ok(found.organization_name),
            None => {
                debug!(org_name = name, "organization name not found");
                Err(ReservationError::NotFound(format!(
                    "{} is not found in the registry",
                    name
                )))
            }
        }
    }

    /// Names owned by `email`, ordered by name. An owner with no
    /// reservations yields `NotFound`.
    pub async fn list_reservations_of_owner(&self, email: &str) -> ReservationResult<Vec<String>> {
        ensure_email(email)?;
        let names = self
            .store
            .list_organization_names_by_owner_email(email)
            .await?;
        if names.is_empty() {
            return Err(ReservationError::NotFound(
                "No reservations are found in the registry".into(),
            ));
        }
        Ok(names)
    }

    /// Fetch the owner for `email`, creating it if absent.
    ///
    /// Losing a creation race to a concurrent call re-reads the winner.
    async fn resolve_owner(&self, email: &str) -> ReservationResult<Owner> {
        if let Some(owner) = self.store.find_owner_by_email(email).await? {
            return Ok(owner);
        }
        match self.store.create_owner(Owner::new(email)).await {
            Ok(owner) => {
                debug!(owner = %owner.id, "created owner");
                Ok(owner)
            }
            Err(StoreError::Conflict(what)) => self
                .store
                .find_owner_by_email(email)
                .await?
                .ok_or(ReservationError::Internal(StoreError::Conflict(what))),
            Err(err) => Err(err.into()),
        }
    }
}
