//! fplan-tracker library
//!
//! Ingest side of the flight-plan tracker: polls the upstream feed, decodes
//! and normalizes each message into a partial flight-plan update, resolves
//! airport codes, assigns a parking facility, and queues the result for the
//! database manager behind `GET /flight-plan`.

use axum::Router;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod assigner;
pub mod cli;
pub mod decode;
pub mod feed;
pub mod normalizer;
pub mod pipeline;
pub mod queue;
pub mod resolver;

use assigner::FacilityReservations;
use queue::HandOffQueue;

/// Application state shared across HTTP handlers
#[derive(Clone, Default)]
pub struct AppState {
    /// Items waiting for the database manager
    pub queue: HandOffQueue,
    /// Facilities held by queued items, released as they are popped
    pub reservations: FacilityReservations,
}

impl AppState {
    pub fn new(queue: HandOffQueue, reservations: FacilityReservations) -> Self {
        Self {
            queue,
            reservations,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .route("/flight-plan", get(api::next_flight_plan))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
