//! HTTP envelope types shared between the feed, the tracker and the database manager

use crate::db::HandOff;
use serde::{Deserialize, Serialize};

/// Body returned by the upstream feed: at most one decoded message per call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub message: Option<serde_json::Value>,
}

/// Body returned by the tracker's `GET /flight-plan`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlightPlanResponse {
    #[serde(default)]
    pub flight_plan: Option<HandOff>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_feed_response() {
        let body: FeedResponse = serde_json::from_value(json!({"message": null})).unwrap();
        assert!(body.message.is_none());
        let body: FeedResponse = serde_json::from_value(json!({})).unwrap();
        assert!(body.message.is_none());
    }

    #[test]
    fn test_empty_flight_plan_response_serializes_null() {
        let value = serde_json::to_value(FlightPlanResponse::default()).unwrap();
        assert_eq!(value, json!({"flight_plan": null}));
    }
}
