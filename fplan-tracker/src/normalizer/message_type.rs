//! Feed message-type discriminant

use std::fmt;

/// Every message type the feed is known to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    PlanCreated,
    PlanAmended,
    Arrival,
    Departure,
    PlanCancellation,
    TrackUpdate,
    BoundaryCrossing,
    OceanicReport,
    FlightCreate,
    FlightModify,
    ScheduleActivate,
    RouteUpdate,
    SectorUpdate,
    FlightTimes,
}

impl MessageType {
    pub const ALL: [MessageType; 14] = [
        MessageType::PlanCreated,
        MessageType::PlanAmended,
        MessageType::Arrival,
        MessageType::Departure,
        MessageType::PlanCancellation,
        MessageType::TrackUpdate,
        MessageType::BoundaryCrossing,
        MessageType::OceanicReport,
        MessageType::FlightCreate,
        MessageType::FlightModify,
        MessageType::ScheduleActivate,
        MessageType::RouteUpdate,
        MessageType::SectorUpdate,
        MessageType::FlightTimes,
    ];

    /// Look up the `@msgType` attribute value
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    /// Value of the `@msgType` attribute
    pub fn wire_name(&self) -> &'static str {
        match self {
            MessageType::PlanCreated => "flightPlanInformation",
            MessageType::PlanAmended => "flightPlanAmendmentInformation",
            MessageType::Arrival => "arrivalInformation",
            MessageType::Departure => "departureInformation",
            MessageType::PlanCancellation => "flightPlanCancellation",
            MessageType::TrackUpdate => "trackInformation",
            MessageType::BoundaryCrossing => "boundaryCrossingUpdate",
            MessageType::OceanicReport => "oceanicReport",
            MessageType::FlightCreate => "FlightCreate",
            MessageType::FlightModify => "FlightModify",
            MessageType::ScheduleActivate => "FlightScheduleActivate",
            MessageType::RouteUpdate => "FlightRoute",
            MessageType::SectorUpdate => "FlightSectors",
            MessageType::FlightTimes => "FlightTimes",
        }
    }

    /// Envelope key holding the type-specific body, `None` for types that carry nothing
    pub fn body_key(&self) -> Option<&'static str> {
        match self {
            MessageType::PlanCreated => Some("fdm:flightPlanInformation"),
            MessageType::PlanAmended => Some("fdm:flightPlanAmendmentInformation"),
            MessageType::Arrival => Some("fdm:arrivalInformation"),
            MessageType::Departure => Some("fdm:departureInformation"),
            MessageType::PlanCancellation => Some("fdm:flightPlanCancellation"),
            MessageType::TrackUpdate => Some("fdm:trackInformation"),
            MessageType::OceanicReport => Some("fdm:oceanicReport"),
            MessageType::FlightCreate => Some("fdm:ncsmFlightCreate"),
            MessageType::FlightModify => Some("fdm:ncsmFlightModify"),
            MessageType::ScheduleActivate => Some("fdm:ncsmFlightScheduleActivate"),
            MessageType::RouteUpdate => Some("fdm:ncsmFlightRoute"),
            MessageType::FlightTimes => Some("fdm:ncsmFlightTimes"),
            MessageType::BoundaryCrossing | MessageType::SectorUpdate => None,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}
