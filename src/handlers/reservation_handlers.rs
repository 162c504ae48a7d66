//! HTTP handlers for reserving names and checking whether a name is taken.

use crate::{
    errors::AppError,
    models::reservation::{OrgReservationMapping, OrgReservationPayload},
    repository::ReservationStore,
    services::reservation_service::ReservationService,
};
use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

/// Query params accepted by `GET /org-reservations`.
#[derive(Debug, Deserialize)]
pub struct CheckReservationQuery {
    pub name: Option<String>,
}

/// `POST /org-reservations` - reserve a name or add a cloud to an own reservation.
pub async fn add_reservation<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    Json(payload): Json<OrgReservationPayload>,
) -> Result<Json<OrgReservationMapping>, AppError> {
    let mapping = service
        .create_or_extend_reservation(
            &payload.organization_name,
            &payload.owner_email,
            &payload.cloud_service,
        )
        .await?;
    Ok(Json(mapping))
}

/// `GET /org-reservations?name=` - echo the name back if it is reserved.
pub async fn check_reservation<S: ReservationStore>(
    State(service): State<ReservationService<S>>,
    Query(q): Query<CheckReservationQuery>,
) -> Result<Json<String>, AppError> {
    let name = q
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::bad_request("Missing query parameter: name"))?;
    let found = service.search_reservation_by_name(&name).await?;
    Ok(Json(found))
}
