//! Message Normalizer
//!
//! Turns one decoded feed message into at most one [`HandOff`] item. Each
//! message type maps to its own extraction function in [`variants`]; this
//! module only locates the envelope, reads the identity attributes and
//! dispatches.
//!
//! Normalization is pure: no store access, no state kept between calls.
//! Processing time is passed in so past/future inference is deterministic.

mod message_type;
pub mod probe;
mod variants;

pub use message_type::MessageType;

use chrono::{DateTime, Utc};
use fplan_common::db::{HandOff, PartialFlightPlan};
use serde_json::Value;
use tracing::{debug, error};

/// Stand-in body for message types that carry none
static EMPTY_BODY: Value = Value::Null;

/// Identity attributes carried on every message envelope
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub flight_ref: Option<String>,
    pub acid: Option<String>,
    pub dep_arpt: Option<String>,
    pub arr_arpt: Option<String>,
    pub msg_type: Option<String>,
}

impl Envelope {
    /// Read the envelope attributes from a decoded message
    pub fn read(message: &Value) -> Option<(Self, &Value)> {
        let root = probe::first_node(message, probe::ENVELOPE)?;
        if !root.is_object() {
            return None;
        }

        let envelope = Self {
            flight_ref: probe::first_text(root, probe::FLIGHT_REF),
            acid: probe::first_text(root, probe::ACID),
            dep_arpt: probe::first_text(root, probe::DEPARTURE_AIRPORT),
            arr_arpt: probe::first_text(root, probe::ARRIVAL_AIRPORT),
            msg_type: probe::first_text(root, probe::MESSAGE_TYPE),
        };

        Some((envelope, root))
    }

    /// Partial update seeded with the envelope's identity and airports
    pub(crate) fn base_plan(&self) -> PartialFlightPlan {
        PartialFlightPlan {
            flight_ref: self.flight_ref.clone(),
            acid: self.acid.clone(),
            dep_arpt: self.dep_arpt.clone(),
            arr_arpt: self.arr_arpt.clone(),
            ..Default::default()
        }
    }
}

/// Normalize one decoded message
///
/// Returns `None` for no-op types, unrecognized types, and messages whose
/// type-specific body is missing.
pub fn normalize(message: &Value, now: DateTime<Utc>) -> Option<HandOff> {
    let Some((envelope, root)) = Envelope::read(message) else {
        debug!("Message has no envelope object, skipping");
        return None;
    };

    let Some(type_name) = envelope.msg_type.as_deref() else {
        error!(flight_ref = ?envelope.flight_ref, "Message without message type: {}", message);
        return None;
    };

    let Some(kind) = MessageType::from_wire(type_name) else {
        error!(msg_type = type_name, "Unknown message type: {}", message);
        return None;
    };

    let body = match kind.body_key() {
        Some(key) => match root.get(key).filter(|b| !b.is_null()) {
            Some(body) => body,
            None => {
                debug!(msg_type = %kind, flight_ref = ?envelope.flight_ref, "Message body missing");
                return None;
            }
        },
        None => &EMPTY_BODY,
    };

    let item = dispatch(kind, &envelope, body, now);

    if let Some(item) = &item {
        debug!(msg_type = %kind, flight_ref = ?item.flight_ref(), "Normalized message");
    }

    item
}

fn dispatch(
    kind: MessageType,
    envelope: &Envelope,
    body: &Value,
    now: DateTime<Utc>,
) -> Option<HandOff> {
    match kind {
        MessageType::PlanCreated => variants::plan_created(envelope, body),
        MessageType::PlanAmended => variants::plan_amended(envelope, body),
        MessageType::Arrival => variants::arrival(envelope, body),
        MessageType::Departure => variants::departure(envelope, body),
        MessageType::PlanCancellation => variants::plan_cancellation(envelope),
        MessageType::TrackUpdate => variants::track_update(envelope, body),
        MessageType::OceanicReport => variants::oceanic_report(envelope, body),
        MessageType::FlightCreate => variants::flight_create(envelope, body, now),
        MessageType::FlightModify => variants::flight_modify(envelope, body, now),
        MessageType::ScheduleActivate | MessageType::RouteUpdate => {
            variants::scheduled_route(envelope, body)
        }
        MessageType::FlightTimes => variants::flight_times(envelope, body),
        MessageType::BoundaryCrossing | MessageType::SectorUpdate => None,
    }
}
