//! One extraction function per message type
//!
//! Each function sees the envelope and the type-specific body and decides
//! which fields, status and side-effect intents the message determines.
//! Fields a message cannot determine stay `None` so the merge keeps the
//! stored value.

use super::probe::{self, Strategy};
use super::Envelope;
use chrono::{DateTime, Utc};
use fplan_common::db::{
    DeleteSignal, FleetChange, FlightStatus, HandOff, ParkingChange, PartialFlightPlan,
    StatusChange,
};
use fplan_common::time::{is_before, zulu_to_storage};
use serde_json::Value;
use tracing::{debug, warn};

/// Timestamp along `strategy`, converted to storage layout
fn timestamp(body: &Value, strategy: Strategy) -> Option<String> {
    probe::first_text(body, strategy).and_then(|raw| zulu_to_storage(&raw))
}

/// Envelope arrival airport, else the one on the qualified aircraft id
fn arrival_airport(envelope: &Envelope, body: &Value) -> Option<String> {
    envelope
        .arr_arpt
        .clone()
        .or_else(|| probe::first_text(body, probe::QUALIFIED_ARRIVAL_AIRPORT))
}

/// ETA from the flight-time data when it is an actual time, else the time of arrival
fn actual_arrival_time(body: &Value) -> Option<String> {
    probe::first_node(body, probe::FLIGHT_TIME_ETA)
        .filter(|eta| probe::text_at(eta, &["@etaType"]).as_deref() == Some("ACTUAL"))
        .and_then(|eta| probe::text_at(eta, &["@timeValue"]))
        .or_else(|| probe::first_text(body, probe::TIME_OF_ARRIVAL))
}

fn upsert(plan: PartialFlightPlan) -> Option<HandOff> {
    Some(HandOff::Upsert(plan))
}

pub(super) fn plan_created(envelope: &Envelope, body: &Value) -> Option<HandOff> {
    upsert(PartialFlightPlan {
        arr_arpt: arrival_airport(envelope, body),
        eta: timestamp(body, probe::ROUTE_ETA),
        etd: timestamp(body, probe::ROUTE_ETD),
        model: probe::first_text(body, probe::SPECS_MODEL),
        status: StatusChange::Set(FlightStatus::Scheduled),
        ..envelope.base_plan()
    })
}

/// Amendment; a diversion-cancel block instead deletes the plan it names
pub(super) fn plan_amended(envelope: &Envelope, body: &Value) -> Option<HandOff> {
    if let Some(diversion) = probe::first_populated(body, probe::DIVERSION_CANCEL) {
        return match probe::first_text(diversion, probe::CANCELED_FLIGHT_REF) {
            Some(canceled) => {
                debug!(
                    flight_ref = ?envelope.flight_ref,
                    canceled_flight_ref = %canceled,
                    "Diversion cancels flight plan"
                );
                Some(HandOff::Delete(DeleteSignal {
                    flight_ref: canceled,
                    acid: envelope.acid.clone(),
                }))
            }
            None => {
                warn!(
                    flight_ref = ?envelope.flight_ref,
                    "Diversion cancel without canceled flight reference"
                );
                None
            }
        };
    }

    upsert(PartialFlightPlan {
        arr_arpt: arrival_airport(envelope, body),
        eta: timestamp(body, probe::ROUTE_ETA),
        etd: timestamp(body, probe::ROUTE_ETD),
        ..envelope.base_plan()
    })
}

pub(super) fn arrival(envelope: &Envelope, body: &Value) -> Option<HandOff> {
    upsert(PartialFlightPlan {
        eta: actual_arrival_time(body).and_then(|raw| zulu_to_storage(&raw)),
        status: StatusChange::Set(FlightStatus::Arrived),
        fleet: FleetChange::Link,
        parking: ParkingChange::Park,
        ..envelope.base_plan()
    })
}

pub(super) fn departure(envelope: &Envelope, body: &Value) -> Option<HandOff> {
    upsert(PartialFlightPlan {
        eta: probe::first_node(body, probe::FLIGHT_TIME_ETA)
            .and_then(|eta| probe::text_at(eta, &["@timeValue"]))
            .and_then(|raw| zulu_to_storage(&raw)),
        etd: timestamp(body, probe::TIME_OF_DEPARTURE),
        model: probe::first_text(body, probe::SPECS_MODEL),
        status: StatusChange::Set(FlightStatus::Flying),
        fleet: FleetChange::Link,
        parking: ParkingChange::Release,
        ..envelope.base_plan()
    })
}

/// Cancellation removes the plan outright; both identifiers are required
pub(super) fn plan_cancellation(envelope: &Envelope) -> Option<HandOff> {
    match (&envelope.flight_ref, &envelope.acid) {
        (Some(flight_ref), Some(acid)) => Some(HandOff::Delete(DeleteSignal {
            flight_ref: flight_ref.clone(),
            acid: Some(acid.clone()),
        })),
        _ => {
            debug!(flight_ref = ?envelope.flight_ref, acid = ?envelope.acid, "Cancellation without identity, ignoring");
            None
        }
    }
}

pub(super) fn track_update(envelope: &Envelope, body: &Value) -> Option<HandOff> {
    upsert(PartialFlightPlan {
        arr_arpt: arrival_airport(envelope, body),
        eta: timestamp(body, probe::ROUTE_ETA),
        status: StatusChange::Set(FlightStatus::Flying),
        fleet: FleetChange::Link,
        parking: ParkingChange::Release,
        ..envelope.base_plan()
    })
}

pub(super) fn oceanic_report(envelope: &Envelope, body: &Value) -> Option<HandOff> {
    upsert(PartialFlightPlan {
        eta: timestamp(body, probe::ROUTE_ETA),
        status: StatusChange::Set(FlightStatus::Flying),
        fleet: FleetChange::Link,
        ..envelope.base_plan()
    })
}

/// Flying if the departure time has already passed, scheduled otherwise
pub(super) fn flight_create(
    envelope: &Envelope,
    body: &Value,
    now: DateTime<Utc>,
) -> Option<HandOff> {
    let etd = probe::first_text(body, probe::AIRLINE_ETD);
    let eta = probe::first_text(body, probe::AIRLINE_ETA);

    let status = if is_before(etd.as_deref(), now) {
        FlightStatus::Flying
    } else {
        FlightStatus::Scheduled
    };

    upsert(PartialFlightPlan {
        eta: eta.and_then(|raw| zulu_to_storage(&raw)),
        etd: etd.and_then(|raw| zulu_to_storage(&raw)),
        model: probe::first_text(body, probe::AIRLINE_MODEL),
        status: StatusChange::Set(status),
        ..envelope.base_plan()
    })
}

/// Status is only inferred when the times say something definite
///
/// - departure still ahead: scheduled
/// - departed and arrival still ahead: flying, and the aircraft now flies this plan
/// - anything else: keep the stored status
pub(super) fn flight_modify(
    envelope: &Envelope,
    body: &Value,
    now: DateTime<Utc>,
) -> Option<HandOff> {
    let etd = probe::first_text(body, probe::AIRLINE_ETD);
    let eta = probe::first_text(body, probe::AIRLINE_ETA);

    let (status, fleet) = match etd.as_deref() {
        Some(etd) if !is_before(Some(etd), now) => {
            (StatusChange::Set(FlightStatus::Scheduled), FleetChange::Keep)
        }
        Some(_) if !is_before(eta.as_deref(), now) => {
            (StatusChange::Set(FlightStatus::Flying), FleetChange::Link)
        }
        _ => (StatusChange::Keep, FleetChange::Keep),
    };

    upsert(PartialFlightPlan {
        eta: eta.and_then(|raw| zulu_to_storage(&raw)),
        etd: etd.and_then(|raw| zulu_to_storage(&raw)),
        model: probe::first_text(body, probe::AIRLINE_MODEL),
        status,
        fleet,
        ..envelope.base_plan()
    })
}

/// Schedule activation and route updates: refreshed times, scheduled
pub(super) fn scheduled_route(envelope: &Envelope, body: &Value) -> Option<HandOff> {
    upsert(PartialFlightPlan {
        eta: timestamp(body, probe::ROUTE_ETA),
        etd: timestamp(body, probe::ROUTE_ETD),
        status: StatusChange::Set(FlightStatus::Scheduled),
        ..envelope.base_plan()
    })
}

pub(super) fn flight_times(envelope: &Envelope, body: &Value) -> Option<HandOff> {
    upsert(PartialFlightPlan {
        eta: timestamp(body, probe::TIMES_ETA),
        etd: timestamp(body, probe::TIMES_ETD),
        status: StatusChange::Set(FlightStatus::Scheduled),
        ..envelope.base_plan()
    })
}
