//! src/repository/sqlite.rs
//!
//! SQLite-backed [`ReservationStore`]. Owners, reservations and cloud
//! mappings live in three tables; uniqueness of emails and organization names
//! is enforced by the schema, so a racing insert surfaces as
//! [`StoreError::Conflict`] rather than a silent duplicate.

use super::{ReservationStore, StoreError, StoreResult};
use crate::models::{
    cloud::CloudReservation,
    owner::Owner,
    reservation::{OrgReservation, OrgReservationMapping},
};
use chrono::{DateTime, Utc};
use sqlx::{Executor, FromRow, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Apply the embedded schema statement by statement.
pub async fn run_migrations(db: &SqlitePool) -> Result<(), sqlx::Error> {
    let statements = SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

#[derive(Clone)]
pub struct SqliteReservationStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteReservationStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

/// Flat row of the reservation/owner/cloud join.
#[derive(FromRow)]
struct MappingRow {
    uuid: Uuid,
    organization_name: String,
    owner_id: Uuid,
    reservation_created_at: DateTime<Utc>,
    reservation_updated_at: DateTime<Utc>,
    email: String,
    owner_created_at: DateTime<Utc>,
    owner_updated_at: DateTime<Utc>,
    choreo_cloud: bool,
    asgardio_cloud: bool,
    ballerina_cloud: bool,
    cloud_created_at: DateTime<Utc>,
    cloud_updated_at: DateTime<Utc>,
}

impl From<MappingRow> for OrgReservationMapping {
    fn from(row: MappingRow) -> Self {
        Self {
            org_reservation: OrgReservation {
                uuid: row.uuid,
                organization_name: row.organization_name,
                owner_id: row.owner_id,
                created_at: row.reservation_created_at,
                updated_at: row.reservation_updated_at,
            },
            owner: Owner {
                id: row.owner_id,
                email: row.email,
                created_at: row.owner_created_at,
                updated_at: row.owner_updated_at,
            },
            cloud_mapping: CloudReservation {
                reservation_id: row.uuid,
                choreo_cloud: row.choreo_cloud,
                asgardio_cloud: row.asgardio_cloud,
                ballerina_cloud: row.ballerina_cloud,
                created_at: row.cloud_created_at,
                updated_at: row.cloud_updated_at,
            },
        }
    }
}

async fn insert_reservation<'e, E>(executor: E, reservation: &OrgReservation) -> StoreResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO org_reservations (uuid, organization_name, owner_id, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(reservation.uuid)
    .bind(&reservation.organization_name)
    .bind(reservation.owner_id)
    .bind(reservation.created_at)
    .bind(reservation.updated_at)
    .execute(executor)
    .await
    .map_err(|err| conflict_or(err, &reservation.organization_name))?;
    Ok(())
}

async fn insert_cloud_mapping<'e, E>(executor: E, mapping: &CloudReservation) -> StoreResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO mapped_clouds (
            reservation_id, choreo_cloud, asgardio_cloud, ballerina_cloud, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(mapping.reservation_id)
    .bind(mapping.choreo_cloud)
    .bind(mapping.asgardio_cloud)
    .bind(mapping.ballerina_cloud)
    .bind(mapping.created_at)
    .bind(mapping.updated_at)
    .execute(executor)
    .await
    .map_err(|err| conflict_or(err, &mapping.reservation_id.to_string()))?;
    Ok(())
}

async fn remove_cloud_mapping<'e, E>(executor: E, reservation_id: Uuid) -> StoreResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM mapped_clouds WHERE reservation_id = ?")
        .bind(reservation_id)
        .execute(executor)
        .await?;
    Ok(())
}

async fn remove_reservation<'e, E>(executor: E, uuid: Uuid) -> StoreResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query("DELETE FROM org_reservations WHERE uuid = ?")
        .bind(uuid)
        .execute(executor)
        .await?;
    Ok(())
}

impl ReservationStore for SqliteReservationStore {
    async fn ping(&self) -> StoreResult<()> {
        let one = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        debug!(result = one, "sqlite ping");
        Ok(())
    }

    async fn find_owner_by_email(&self, email: &str) -> StoreResult<Option<Owner>> {
        let owner = sqlx::query_as::<_, Owner>(
            "SELECT id, email, created_at, updated_at FROM owners WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&*self.db)
        .await?;
        Ok(owner)
    }

    async fn create_owner(&self, owner: Owner) -> StoreResult<Owner> {
        sqlx::query("INSERT INTO owners (id, email, created_at, updated_at) VALUES (?, ?, ?, ?)")
            .bind(owner.id)
            .bind(&owner.email)
            .bind(owner.created_at)
            .bind(owner.updated_at)
            .execute(&*self.db)
            .await
            .map_err(|err| conflict_or(err, &owner.email))?;
        debug!(owner_id = %owner.id, "inserted owner");
        Ok(owner)
    }

    async fn update_owner_email(&self, owner_id: Uuid, new_email: &str) -> StoreResult<()> {
        sqlx::query("UPDATE owners SET email = ?, updated_at = ? WHERE id = ?")
            .bind(new_email)
            .bind(Utc::now())
            .bind(owner_id)
            .execute(&*self.db)
            .await
            .map_err(|err| conflict_or(err, new_email))?;
        Ok(())
    }

    async fn find_reservation_by_name(&self, name: &str) -> StoreResult<Option<OrgReservation>> {
        let reservation = sqlx::query_as::<_, OrgReservation>(
            "SELECT uuid, organization_name, owner_id, created_at, updated_at
             FROM org_reservations WHERE organization_name = ?",
        )
        .bind(name)
        .fetch_optional(&*self.db)
        .await?;
        Ok(reservation)
    }

    async fn find_reservation_by_name_and_owner_email(
        &self,
        name: &str,
        email: &str,
    ) -> StoreResult<Option<OrgReservationMapping>> {
        let row = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT r.uuid, r.organization_name, r.owner_id,
                   r.created_at AS reservation_created_at,
                   r.updated_at AS reservation_updated_at,
                   o.email,
                   o.created_at AS owner_created_at,
                   o.updated_at AS owner_updated_at,
                   c.choreo_cloud, c.asgardio_cloud, c.ballerina_cloud,
                   c.created_at AS cloud_created_at,
                   c.updated_at AS cloud_updated_at
            FROM org_reservations AS r
            JOIN owners AS o ON r.owner_id = o.id
            JOIN mapped_clouds AS c ON c.reservation_id = r.uuid
            WHERE r.organization_name = ? AND o.email = ?
            "#,
        )
        .bind(name)
        .bind(email)
        .fetch_optional(&*self.db)
        .await?;
        Ok(row.map(OrgReservationMapping::from))
    }

    async fn create_reservation(&self, reservation: OrgReservation) -> StoreResult<OrgReservation> {
        insert_reservation(&*self.db, &reservation).await?;
        Ok(reservation)
    }

    async fn update_reservation_owner(&self, uuid: Uuid, new_owner_id: Uuid) -> StoreResult<()> {
        let result =
            sqlx::query("UPDATE org_reservations SET owner_id = ?, updated_at = ? WHERE uuid = ?")
                .bind(new_owner_id)
                .bind(Utc::now())
                .bind(uuid)
                .execute(&*self.db)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(uuid.to_string()));
        }
        Ok(())
    }

    async fn create_cloud_mapping(&self, mapping: CloudReservation) -> StoreResult<CloudReservation> {
        insert_cloud_mapping(&*self.db, &mapping).await?;
        Ok(mapping)
    }

    async fn update_cloud_mapping(&self, mapping: &CloudReservation) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE mapped_clouds
             SET choreo_cloud = ?, asgardio_cloud = ?, ballerina_cloud = ?, updated_at = ?
             WHERE reservation_id = ?",
        )
        .bind(mapping.choreo_cloud)
        .bind(mapping.asgardio_cloud)
        .bind(mapping.ballerina_cloud)
        .bind(mapping.updated_at)
        .bind(mapping.reservation_id)
        .execute(&*self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(mapping.reservation_id.to_string()));
        }
        Ok(())
    }

    async fn delete_cloud_mapping(&self, reservation_id: Uuid) -> StoreResult<()> {
        remove_cloud_mapping(&*self.db, reservation_id).await
    }

    async fn delete_reservation(&self, uuid: Uuid) -> StoreResult<()> {
        remove_reservation(&*self.db, uuid).await
    }

    async fn list_organization_names_by_owner_email(&self, email: &str) -> StoreResult<Vec<String>> {
        let names = sqlx::query_scalar::<_, String>(
            "SELECT r.organization_name
             FROM org_reservations AS r
             JOIN owners AS o ON r.owner_id = o.id
             WHERE o.email = ?
             ORDER BY r.organization_name ASC",
        )
        .bind(email)
        .fetch_all(&*self.db)
        .await?;
        Ok(names)
    }

    async fn create_reservation_with_mapping(
        &self,
        reservation: OrgReservation,
        mapping: CloudReservation,
    ) -> StoreResult<(OrgReservation, CloudReservation)> {
        let mut tx = self.db.begin().await?;
        insert_reservation(&mut *tx, &reservation).await?;
        insert_cloud_mapping(&mut *tx, &mapping).await?;
        tx.commit().await?;
        debug!(reservation = %reservation.uuid, "inserted reservation with cloud mapping");
        Ok((reservation, mapping))
    }

    async fn delete_reservation_with_mapping(&self, uuid: Uuid) -> StoreResult<()> {
        let mut tx = self.db.begin().await?;
        remove_cloud_mapping(&mut *tx, uuid).await?;
        remove_reservation(&mut *tx, uuid).await?;
        tx.commit().await?;
        debug!(reservation = %uuid, "deleted reservation with cloud mapping");
        Ok(())
    }
}

/// Translate a unique constraint violation into [`StoreError::Conflict`].
fn conflict_or(err: sqlx::Error, what: &str) -> StoreError {
    if is_unique_violation(&err) {
        StoreError::Conflict(what.to_string())
    } else {
        StoreError::Sqlx(err)
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.is_unique_violation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::cloud::CloudKey;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup() -> SqliteReservationStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteReservationStore::new(Arc::new(pool))
    }

    async fn seed(store: &SqliteReservationStore, name: &str, email: &str) -> OrgReservation {
        let owner = store.create_owner(Owner::new(email)).await.unwrap();
        let reservation = OrgReservation::new(name, owner.id);
        let mapping =
            CloudReservation::new(reservation.uuid).with_flag(Some(CloudKey::Choreo), true);
        store
            .create_reservation_with_mapping(reservation, mapping)
            .await
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn owner_lookup_by_email() {
        let store = setup().await;
        assert!(store.find_owner_by_email("a@x.com").await.unwrap().is_none());

        let owner = store.create_owner(Owner::new("a@x.com")).await.unwrap();
        let found = store.find_owner_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(found.id, owner.id);

        let err = store.create_owner(Owner::new("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_owner_email_moves_lookup() {
        let store = setup().await;
        let owner = store.create_owner(Owner::new("old@x.com")).await.unwrap();
        store.update_owner_email(owner.id, "new@x.com").await.unwrap();

        assert!(store.find_owner_by_email("old@x.com").await.unwrap().is_none());
        let moved = store.find_owner_by_email("new@x.com").await.unwrap().unwrap();
        assert_eq!(moved.id, owner.id);
    }

    #[tokio::test]
    async fn joined_lookup_requires_matching_owner() {
        let store = setup().await;
        let reservation = seed(&store, "AcmeCorp", "a@x.com").await;

        let mapping = store
            .find_reservation_by_name_and_owner_email("AcmeCorp", "a@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(mapping.org_reservation.uuid, reservation.uuid);
        assert_eq!(mapping.owner.email, "a@x.com");
        assert!(mapping.cloud_mapping.choreo_cloud);
        assert!(!mapping.cloud_mapping.asgardio_cloud);

        assert!(
            store
                .find_reservation_by_name_and_owner_email("AcmeCorp", "b@x.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn duplicate_name_rolls_back_composite_insert() {
        let store = setup().await;
        seed(&store, "AcmeCorp", "a@x.com").await;

        let other = store.create_owner(Owner::new("b@x.com")).await.unwrap();
        let reservation = OrgReservation::new("AcmeCorp", other.id);
        let mapping = CloudReservation::new(reservation.uuid);
        let orphan_id = reservation.uuid;
        let err = store
            .create_reservation_with_mapping(reservation, mapping)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mapped_clouds WHERE reservation_id = ?")
            .bind(orphan_id)
            .fetch_one(&*store.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn separate_writes_and_owner_transfer() {
        let store = setup().await;
        let a = store.create_owner(Owner::new("a@x.com")).await.unwrap();
        let b = store.create_owner(Owner::new("b@x.com")).await.unwrap();

        let reservation = store
            .create_reservation(OrgReservation::new("Globex", a.id))
            .await
            .unwrap();
        let mapping = store
            .create_cloud_mapping(
                CloudReservation::new(reservation.uuid).with_flag(Some(CloudKey::Asgardio), true),
            )
            .await
            .unwrap();

        let updated = mapping.with_flag(Some(CloudKey::Ballerina), true);
        store.update_cloud_mapping(&updated).await.unwrap();
        store.update_reservation_owner(reservation.uuid, b.id).await.unwrap();

        let moved = store
            .find_reservation_by_name_and_owner_email("Globex", "b@x.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(moved.org_reservation.uuid, reservation.uuid);
        assert!(moved.cloud_mapping.asgardio_cloud && moved.cloud_mapping.ballerina_cloud);

        store.delete_cloud_mapping(reservation.uuid).await.unwrap();
        store.delete_reservation(reservation.uuid).await.unwrap();
        assert!(store.find_reservation_by_name("Globex").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn updates_of_removed_reservation_report_missing() {
        let store = setup().await;
        let reservation = seed(&store, "AcmeCorp", "a@x.com").await;
        let other = store.create_owner(Owner::new("b@x.com")).await.unwrap();
        store
            .delete_reservation_with_mapping(reservation.uuid)
            .await
            .unwrap();

        let mapping =
            CloudReservation::new(reservation.uuid).with_flag(Some(CloudKey::Asgardio), true);
        let err = store.update_cloud_mapping(&mapping).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));

        let err = store
            .update_reservation_owner(reservation.uuid, other.id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Missing(_)));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM mapped_clouds")
            .fetch_one(&*store.db)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn lists_names_in_order_and_deletes_as_unit() {
        let store = setup().await;
        let owner = store.create_owner(Owner::new("a@x.com")).await.unwrap();
        for name in ["Zeta", "Alpha", "Mid"] {
            let reservation = OrgReservation::new(name, owner.id);
            let mapping = CloudReservation::new(reservation.uuid)
                .with_flag(Some(CloudKey::Choreo), true);
            store
                .create_reservation_with_mapping(reservation, mapping)
                .await
                .unwrap();
        }

        let names = store
            .list_organization_names_by_owner_email("a@x.com")
            .await
            .unwrap();
        assert_eq!(names, vec!["Alpha", "Mid", "Zeta"]);

        let alpha = store.find_reservation_by_name("Alpha").await.unwrap().unwrap();
        store.delete_reservation_with_mapping(alpha.uuid).await.unwrap();
        let names = store
            .list_organization_names_by_owner_email("a@x.com")
            .await
            .unwrap();
        assert_eq!(names, vec!["Mid", "Zeta"]);
    }
}
