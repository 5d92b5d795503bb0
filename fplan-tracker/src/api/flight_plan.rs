//! Hand-off endpoint polled by the database manager

use axum::{extract::State, Json};
use fplan_common::api::FlightPlanResponse;
use tracing::debug;

use crate::AppState;

/// GET /flight-plan
///
/// Pops the oldest queued item. An empty queue answers `{"flight_plan": null}`.
/// Once popped, the item no longer holds its facility reservation.
pub async fn next_flight_plan(State(state): State<AppState>) -> Json<FlightPlanResponse> {
    let flight_plan = state.queue.pop();

    if let Some(item) = &flight_plan {
        if let Some(flight_ref) = item.flight_ref() {
            state.reservations.release(flight_ref);
        }
        debug!(
            flight_ref = ?item.flight_ref(),
            remaining = state.queue.len(),
            "Handing off flight plan"
        );
    }

    Json(FlightPlanResponse { flight_plan })
}
