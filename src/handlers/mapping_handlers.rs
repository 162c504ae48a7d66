//! HTTP handlers for the reservations held by one owner.

use crate::{
    errors::AppError,
    models::reservation::{MappingUpdatePayload, OrgReservationMapping, ReservationDeletePayload},
    repository::ReservationStore,
    services::reservation_service::ReservationService,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

/// `PUT /owners/{ownersEmail}/org-mappings` - transfer a reservation.
pub async fn update_mapping<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    Path(owners_email): Path<String>,
    Json(payload): Json<MappingUpdatePayload>,
) -> Result<Json<OrgReservationMapping>, AppError> {
    let mapping = service
        .transfer_ownership(
            &payload.organization_name,
            &owners_email,
            &payload.new_owner_email,
        )
        .await?;
    Ok(Json(mapping))
}

/// `GET /owners/{ownersEmail}/org-mappings` - names held by the owner.
pub async fn get_own_reservations<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    Path(owners_email): Path<String>,
) -> Result<Json<Vec<String>>, AppError> {
    let names = service.list_reservations_of_owner(&owners_email).await?;
    Ok(Json(names))
}

/// `DELETE /owners/{ownersEmail}/org-mappings` - retract one cloud.
pub async fn delete_own_reservation<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    Path(owners_email): Path<String>,
    Json(payload): Json<ReservationDeletePayload>,
) -> Result<StatusCode, AppError> {
    service
        .retract_cloud_flag(
            &payload.organization_name,
            &owners_email,
            &payload.cloud_service,
        )
        .await?;
    Ok(StatusCode::OK)
}
