//! Defines routes for reservation and ownership operations.
//!
//! ## Structure
//! - **Reservation endpoints**
//!   - `POST   /org-reservations` - reserve a name or extend it to another cloud
//!   - `GET    /org-reservations?name=` - check whether a name is reserved
//!
//! - **Owner mapping endpoints**
//!   - `PUT    /owners/{ownersEmail}/org-mappings` - transfer a reservation
//!   - `GET    /owners/{ownersEmail}/org-mappings` - list the owner's names
//!   - `DELETE /owners/{ownersEmail}/org-mappings` - retract a cloud
//!
//! Every endpoint above requires a verified bearer token. The health probes
//! `/healthz` and `/readyz` are mounted without authentication.

use crate::{
    auth::{TokenVerifier, middleware::require_bearer},
    handlers::{
        health_handlers::{healthz, readyz},
        mapping_handlers::{delete_own_reservation, get_own_reservations, update_mapping},
        reservation_handlers::{add_reservation, check_reservation},
    },
    repository::ReservationStore,
    services::reservation_service::ReservationService,
};
use axum::{
    Router, middleware,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

/// Build and return the router for all registry routes.
///
/// The router carries shared state (`ReservationService`) to all handlers;
/// `verifier` guards every non-health route.
pub fn routes<S: ReservationStore, V: TokenVerifier>(verifier: V) -> Router<ReservationService<S>> {
    let mappings = put(update_mapping::<S>)
        .get(get_own_reservations::<S>)
        .delete(delete_own_reservation::<S>);

    Router::new()
        .route(
            "/org-reservations",
            post(add_reservation::<S>).get(check_reservation::<S>),
        )
        .route("/owners/{owners_email}/org-mappings", mappings.clone())
        .route("/owners/{owners_email}/org-mappings/", mappings)
        .route_layer(middleware::from_fn_with_state(verifier, require_bearer::<V>))
        // health endpoints (mounted at root, unauthenticated)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz::<S>))
        .layer(TraceLayer::new_for_http())
}
