//! Path probing over decoded message trees
//!
//! The feed decodes XML into JSON: attributes become `@name` keys and element
//! text lands under `#text`. The same datum shows up under different parents
//! depending on which upstream system produced the message, so every datum is
//! described as an ordered list of candidate paths (an accessor strategy) and
//! the first path that yields a value wins.

use serde_json::Value;

/// One candidate location, as a sequence of object keys from the start node
pub type Path = &'static [&'static str];

/// Ordered candidate locations for one datum
pub type Strategy = &'static [Path];

/// Walk `path` from `node`, returning the node found there
pub fn node_at<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(node, |current, key| current.get(*key))
}

/// Text of the node at `path`
///
/// Strings are returned trimmed, numbers and booleans in their textual form,
/// and objects by their `#text` child. Empty text counts as absent.
pub fn text_at(node: &Value, path: &[&str]) -> Option<String> {
    node_at(node, path).and_then(leaf_text)
}

/// First present value along `strategy`
pub fn first_text(node: &Value, strategy: Strategy) -> Option<String> {
    strategy.iter().find_map(|path| text_at(node, path))
}

/// First present node along `strategy`
pub fn first_node<'a>(node: &'a Value, strategy: Strategy) -> Option<&'a Value> {
    strategy
        .iter()
        .find_map(|path| node_at(node, path).filter(|v| !v.is_null()))
}

/// First node along `strategy` that carries any content
///
/// Empty objects, arrays and blank strings count as absent.
pub fn first_populated<'a>(node: &'a Value, strategy: Strategy) -> Option<&'a Value> {
    strategy
        .iter()
        .filter_map(|path| node_at(node, path))
        .find(|v| match v {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::String(s) => !s.trim().is_empty(),
            Value::Bool(_) | Value::Number(_) => true,
        })
}

fn leaf_text(node: &Value) -> Option<String> {
    let text = match node {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(map) => return map.get("#text").and_then(leaf_text),
        Value::Null | Value::Array(_) => return None,
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ---------------------------------------------------------------------------
// Accessor strategies
// ---------------------------------------------------------------------------

/// Message envelope, bare or wrapped by the XML root element
pub const ENVELOPE: Strategy = &[&["fltdMessage"], &["fdm:fltdMessage"], &[]];

pub const MESSAGE_TYPE: Strategy = &[&["@msgType"], &["msgType"]];
pub const FLIGHT_REF: Strategy = &[&["@flightRef"], &["flightRef"]];
pub const ACID: Strategy = &[&["@acid"], &["acid"]];
pub const DEPARTURE_AIRPORT: Strategy = &[&["@depArpt"], &["depArpt"]];
pub const ARRIVAL_AIRPORT: Strategy = &[&["@arrArpt"], &["arrArpt"]];

/// ETA on route data, falling back to track data
pub const ROUTE_ETA: Strategy = &[
    &["nxcm:ncsmRouteData", "nxcm:eta", "@timeValue"],
    &["nxcm:ncsmTrackData", "nxcm:eta", "@timeValue"],
];

/// ETD on route data, falling back to track data
pub const ROUTE_ETD: Strategy = &[
    &["nxcm:ncsmRouteData", "nxcm:etd", "@timeValue"],
    &["nxcm:ncsmTrackData", "nxcm:etd", "@timeValue"],
];

/// Arrival airport from the qualified aircraft id, used when the envelope lacks one
pub const QUALIFIED_ARRIVAL_AIRPORT: Strategy =
    &[&["nxcm:qualifiedAircraftId", "nxce:arrivalPoint", "nxce:airport"]];

pub const SPECS_MODEL: Strategy = &[&["nxcm:flightAircraftSpecs"]];

pub const AIRLINE_MODEL: Strategy = &[
    &["nxcm:airlineData", "nxcm:flightStatusAndSpec", "nxcm:aircraftModel"],
    &["nxcm:airlineData", "nxcm:flightStatusAndSpec", "nxcm:aircraftSpecification"],
];

pub const AIRLINE_ETA: Strategy = &[&["nxcm:airlineData", "nxcm:eta", "@timeValue"]];
pub const AIRLINE_ETD: Strategy = &[&["nxcm:airlineData", "nxcm:etd", "@timeValue"]];

pub const FLIGHT_TIME_ETA: Strategy = &[&["nxcm:ncsmFlightTimeData", "nxcm:eta"]];
pub const TIME_OF_ARRIVAL: Strategy = &[&["nxcm:timeOfArrival"]];
pub const TIME_OF_DEPARTURE: Strategy = &[&["nxcm:timeOfDeparture"]];

pub const TIMES_ETA: Strategy = &[&["nxcm:eta", "@timeValue"]];
pub const TIMES_ETD: Strategy = &[&["nxcm:etd", "@timeValue"]];

pub const DIVERSION_CANCEL: Strategy = &[
    &["ncsmDiversionCancelData"],
    &["nxcm:ncsmDiversionCancelData"],
];

pub const CANCELED_FLIGHT_REF: Strategy = &[
    &["canceledFlightReference"],
    &["nxcm:canceledFlightReference"],
];
