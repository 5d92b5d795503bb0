//! Flight-plan data model shared by the tracker and the database manager
//!
//! `PartialFlightPlan` is what travels across the hand-off: every field is
//! optional and absence means "leave the stored value alone". The `*Change`
//! enums make the remaining intents explicit instead of inferring them from
//! missing fields.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a flight plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    Scheduled,
    Flying,
    Arrived,
    Canceled,
    /// Reserved: no feed message produces it, stored rows may carry it
    Maintenance,
}

impl FlightStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "SCHEDULED",
            FlightStatus::Flying => "FLYING",
            FlightStatus::Arrived => "ARRIVED",
            FlightStatus::Canceled => "CANCELED",
            FlightStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlightStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCHEDULED" => Ok(FlightStatus::Scheduled),
            "FLYING" => Ok(FlightStatus::Flying),
            "ARRIVED" => Ok(FlightStatus::Arrived),
            "CANCELED" => Ok(FlightStatus::Canceled),
            "MAINTENANCE" => Ok(FlightStatus::Maintenance),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown flight status: {}",
                other
            ))),
        }
    }
}

/// Status intent carried by a partial update
///
/// On the wire this is a nullable status string: `null` (or a missing key)
/// is `Keep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<FlightStatus>", into = "Option<FlightStatus>")]
pub enum StatusChange {
    /// Message does not determine a status; keep whatever is stored
    #[default]
    Keep,
    Set(FlightStatus),
}

impl StatusChange {
    pub fn value(&self) -> Option<FlightStatus> {
        match self {
            StatusChange::Keep => None,
            StatusChange::Set(status) => Some(*status),
        }
    }
}

impl From<Option<FlightStatus>> for StatusChange {
    fn from(value: Option<FlightStatus>) -> Self {
        value.map(StatusChange::Set).unwrap_or(StatusChange::Keep)
    }
}

impl From<StatusChange> for Option<FlightStatus> {
    fn from(value: StatusChange) -> Self {
        value.value()
    }
}

/// Whether the message establishes the acid → flight_ref association
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleetChange {
    #[default]
    Keep,
    /// Point the aircraft's fleet link at this flight (evicting any other plan)
    Link,
}

/// What happens to the aircraft's parking assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParkingChange {
    #[default]
    Keep,
    /// Aircraft is on the ground at the flight's facility
    Park,
    /// Aircraft is airborne again
    Release,
}

/// Field-level update for one flight plan
///
/// Timestamps are already in storage layout (`YYYY-MM-DD HH:MM:SS`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialFlightPlan {
    pub flight_ref: Option<String>,
    pub acid: Option<String>,
    #[serde(default)]
    pub dep_arpt: Option<String>,
    #[serde(default)]
    pub arr_arpt: Option<String>,
    #[serde(default)]
    pub etd: Option<String>,
    #[serde(default)]
    pub eta: Option<String>,
    #[serde(default)]
    pub status: StatusChange,
    /// Aircraft model, only meaningful together with `FleetChange::Link`
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub facility_id: Option<i64>,
    #[serde(default)]
    pub fleet: FleetChange,
    #[serde(default)]
    pub parking: ParkingChange,
}

impl PartialFlightPlan {
    /// Both mandatory identifiers are present and non-empty
    pub fn has_identity(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.flight_ref) && present(&self.acid)
    }

    pub fn is_canceled(&self) -> bool {
        self.status == StatusChange::Set(FlightStatus::Canceled)
    }
}

/// Instruction to drop a flight plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSignal {
    pub flight_ref: String,
    #[serde(default)]
    pub acid: Option<String>,
}

/// One normalized item handed from the tracker to the database manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum HandOff {
    Upsert(PartialFlightPlan),
    Delete(DeleteSignal),
}

impl HandOff {
    pub fn flight_ref(&self) -> Option<&str> {
        match self {
            HandOff::Upsert(plan) => plan.flight_ref.as_deref(),
            HandOff::Delete(signal) => Some(signal.flight_ref.as_str()),
        }
    }
}

/// Stored `flight_plans` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FlightPlanRecord {
    pub flight_ref: String,
    pub acid: String,
    pub departing_airport: Option<String>,
    pub arrival_airport: Option<String>,
    pub etd: Option<String>,
    pub eta: Option<String>,
    pub status: Option<String>,
    pub facility_id: Option<i64>,
}

/// Stored `fleet` row: the aircraft's currently active flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FleetLink {
    pub acid: String,
    pub plane_type: Option<String>,
    pub flight_ref: Option<String>,
}

/// Stored `parked_at` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ParkingAssignment {
    pub acid: String,
    pub facility_id: i64,
}
