//! Ingest pipeline: decode, normalize, resolve airport codes, assign a facility

use crate::assigner::{assign_facility, FacilityDirectory, FacilityReservations};
use crate::decode::xml_to_tree;
use crate::normalizer::{self, Envelope};
use crate::resolver::{resolve_airports, AirportDirectory};
use chrono::{DateTime, Utc};
use fplan_common::db::HandOff;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything that happens to one feed message before it is queued
#[derive(Clone)]
pub struct Pipeline {
    airports: Arc<dyn AirportDirectory>,
    facilities: Arc<dyn FacilityDirectory>,
    reservations: FacilityReservations,
    acid_suffix: Option<String>,
}

impl Pipeline {
    pub fn new(
        airports: Arc<dyn AirportDirectory>,
        facilities: Arc<dyn FacilityDirectory>,
    ) -> Self {
        Self {
            airports,
            facilities,
            reservations: FacilityReservations::new(),
            acid_suffix: None,
        }
    }

    /// Only accept aircraft whose acid ends with `suffix`
    pub fn with_acid_suffix(mut self, suffix: Option<String>) -> Self {
        self.acid_suffix = suffix.filter(|s| !s.is_empty());
        self
    }

    /// Facilities held by items this pipeline queued
    ///
    /// The hand-off endpoint releases them as items are popped.
    pub fn reservations(&self) -> &FacilityReservations {
        &self.reservations
    }

    /// Run one feed message through the pipeline
    ///
    /// The message is either XML text or an already decoded tree. Returns the
    /// item to enqueue, or `None` when the message is dropped.
    pub async fn process(&self, message: &Value, now: DateTime<Utc>) -> Option<HandOff> {
        let message = match message {
            Value::Object(_) => Cow::Borrowed(message),
            Value::String(text) => match xml_to_tree(text) {
                Ok(tree) => Cow::Owned(tree),
                Err(e) => {
                    warn!("Dropping undecodable feed message {:?}: {}", text, e);
                    return None;
                }
            },
            other => {
                warn!("Dropping non-object feed message: {}", other);
                return None;
            }
        };
        let message: &Value = &message;

        if let Some(suffix) = &self.acid_suffix {
            let acid = Envelope::read(message).and_then(|(envelope, _)| envelope.acid);
            if !acid.as_deref().is_some_and(|acid| acid.ends_with(suffix.as_str())) {
                debug!(acid = ?acid, "Aircraft outside fleet, skipping");
                return None;
            }
        }

        match normalizer::normalize(message, now)? {
            HandOff::Upsert(plan) => {
                let plan = resolve_airports(plan, self.airports.as_ref()).await;
                let plan =
                    assign_facility(plan, self.facilities.as_ref(), &self.reservations).await;
                Some(HandOff::Upsert(plan))
            }
            delete @ HandOff::Delete(_) => Some(delete),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assigner::FacilityOccupancy;
    use crate::resolver::StaticAirportDirectory;
    use async_trait::async_trait;
    use fplan_common::db::{FleetChange, FlightStatus, ParkingChange, StatusChange};
    use serde_json::json;

    /// Facility directory with one single-space facility per listed airport
    struct FixedFacilities(Vec<(&'static str, i64)>);

    #[async_trait]
    impl FacilityDirectory for FixedFacilities {
        async fn stored_assignment(&self, _flight_ref: &str) -> fplan_common::Result<Option<i64>> {
            Ok(None)
        }

        async fn facilities_at(
            &self,
            airport: &str,
        ) -> fplan_common::Result<Vec<FacilityOccupancy>> {
            Ok(self
                .0
                .iter()
                .filter(|(code, _)| *code == airport)
                .map(|(_, id)| FacilityOccupancy {
                    id: *id,
                    total_space: 1,
                    occupied: 0,
                })
                .collect())
        }
    }

    fn pipeline() -> Pipeline {
        let airports: StaticAirportDirectory =
            [("TEB", "KTEB"), ("PBI", "KPBI")].into_iter().collect();
        Pipeline::new(
            Arc::new(airports),
            Arc::new(FixedFacilities(vec![("KPBI", 7)])),
        )
    }

    fn now() -> DateTime<Utc> {
        fplan_common::time::parse_zulu("2025-06-01T12:00:00Z").unwrap()
    }

    fn plan_created(acid: &str) -> Value {
        json!({"fltdMessage": {
            "@msgType": "flightPlanInformation",
            "@flightRef": "F1",
            "@acid": acid,
            "@depArpt": "TEB",
            "@arrArpt": "PBI",
            "fdm:flightPlanInformation": {}
        }})
    }

    #[tokio::test]
    async fn test_resolves_then_assigns() {
        let item = pipeline().process(&plan_created("N1QS"), now()).await;
        let Some(HandOff::Upsert(plan)) = item else {
            panic!("expected upsert");
        };
        assert_eq!(plan.dep_arpt.as_deref(), Some("KTEB"));
        assert_eq!(plan.arr_arpt.as_deref(), Some("KPBI"));
        assert_eq!(plan.facility_id, Some(7));
        assert_eq!(plan.status, StatusChange::Set(FlightStatus::Scheduled));
    }

    #[tokio::test]
    async fn test_non_object_message_dropped() {
        assert!(pipeline().process(&json!("test"), now()).await.is_none());
        assert!(pipeline().process(&json!(""), now()).await.is_none());
        assert!(pipeline().process(&json!(42), now()).await.is_none());
        assert!(pipeline().process(&json!(null), now()).await.is_none());
    }

    const ARRIVAL_XML: &str = r#"<fdm:fltdMessage acid="N101QS" airline="XXX" arrArpt="KTTN" cdmPart="false" depArpt="TNCM" fdTrigger="HCS_ARRIVAL_MSG" flightRef="94907783" major="DAL" msgType="arrivalInformation" sensitivity="A" sourceFacility="KZOB" sourceTimeStamp="2025-03-25T03:01:21Z">
        <fdm:arrivalInformation>
            <nxcm:qualifiedAircraftId aircraftCategory="JET" userCategory="COMMERCIAL">
            <nxce:aircraftId>RPA5722</nxce:aircraftId>
            <nxce:computerId>
                <nxce:facilityIdentifier>KZOB</nxce:facilityIdentifier>
            </nxce:computerId>
            <nxce:gufi>KN01781300</nxce:gufi>
            <nxce:igtd>2025-03-25T01:20:00Z</nxce:igtd>
            <nxce:departurePoint>
                <nxce:airport>KLGA</nxce:airport>
            </nxce:departurePoint>
            <nxce:arrivalPoint>
                <nxce:airport>KTTN</nxce:airport>
            </nxce:arrivalPoint>
            </nxcm:qualifiedAircraftId>
            <nxcm:timeOfArrival estimated="false">2025-03-25T03:01:00Z</nxcm:timeOfArrival>
            <nxcm:ncsmFlightTimeData>
            <nxcm:etd etdType="ACTUAL" timeValue="2025-03-25T01:51:00Z"/>
            <nxcm:eta etaType="ACTUAL" timeValue="2025-03-25T03:01:00Z"/>
            <nxcm:rvsmData currentCompliance="true" equipped="true" futureCompliance="true"/>
            </nxcm:ncsmFlightTimeData>
        </fdm:arrivalInformation>
        </fdm:fltdMessage>"#;

    #[tokio::test]
    async fn test_xml_arrival_message() {
        let pipeline = Pipeline::new(
            Arc::new(StaticAirportDirectory::default()),
            Arc::new(FixedFacilities(vec![("KTTN", 4)])),
        )
        .with_acid_suffix(Some("QS".to_string()));
        let now = fplan_common::time::parse_zulu("2025-03-25T03:05:00Z").unwrap();

        let item = pipeline.process(&json!(ARRIVAL_XML), now).await;
        let Some(HandOff::Upsert(plan)) = item else {
            panic!("expected upsert, got {:?}", item);
        };
        assert_eq!(plan.flight_ref.as_deref(), Some("94907783"));
        assert_eq!(plan.acid.as_deref(), Some("N101QS"));
        assert_eq!(plan.dep_arpt.as_deref(), Some("TNCM"));
        assert_eq!(plan.arr_arpt.as_deref(), Some("KTTN"));
        assert_eq!(plan.eta.as_deref(), Some("2025-03-25 03:01:00"));
        assert_eq!(plan.status, StatusChange::Set(FlightStatus::Arrived));
        assert_eq!(plan.fleet, FleetChange::Link);
        assert_eq!(plan.parking, ParkingChange::Park);
        assert_eq!(plan.facility_id, Some(4));
        assert_eq!(pipeline.reservations().held_for("94907783"), Some(4));
    }

    #[tokio::test]
    async fn test_xml_and_tree_messages_normalize_alike() {
        let xml = r#"<fdm:fltdMessage msgType="flightPlanInformation" flightRef="F1" acid="N1QS" depArpt="TEB" arrArpt="PBI">
            <fdm:flightPlanInformation>
                <nxcm:flightAircraftSpecs>C68A</nxcm:flightAircraftSpecs>
            </fdm:flightPlanInformation>
        </fdm:fltdMessage>"#;
        let tree = json!({"fdm:fltdMessage": {
            "@msgType": "flightPlanInformation",
            "@flightRef": "F1",
            "@acid": "N1QS",
            "@depArpt": "TEB",
            "@arrArpt": "PBI",
            "fdm:flightPlanInformation": {"nxcm:flightAircraftSpecs": "C68A"}
        }});

        let from_xml = pipeline().process(&json!(xml), now()).await;
        let from_tree = pipeline().process(&tree, now()).await;
        assert!(matches!(from_xml, Some(HandOff::Upsert(ref p)) if p.model.as_deref() == Some("C68A")));
        assert_eq!(from_xml, from_tree);
    }

    #[tokio::test]
    async fn test_queued_assignment_holds_single_space() {
        let pipeline = pipeline();
        let mut second = plan_created("N2QS");
        second["fltdMessage"]["@flightRef"] = json!("F2");

        let first = pipeline.process(&plan_created("N1QS"), now()).await;
        assert!(matches!(first, Some(HandOff::Upsert(ref p)) if p.facility_id == Some(7)));
        let blocked = pipeline.process(&second, now()).await;
        assert!(matches!(blocked, Some(HandOff::Upsert(ref p)) if p.facility_id.is_none()));

        // Clones share reservations, as the hand-off endpoint relies on
        pipeline.clone().reservations().release("F1");
        let freed = pipeline.process(&second, now()).await;
        assert!(matches!(freed, Some(HandOff::Upsert(ref p)) if p.facility_id == Some(7)));
    }

    #[tokio::test]
    async fn test_acid_suffix_filter() {
        let filtered = pipeline().with_acid_suffix(Some("QS".to_string()));
        assert!(filtered.process(&plan_created("N1QS"), now()).await.is_some());
        assert!(filtered.process(&plan_created("N1AB"), now()).await.is_none());
    }

    #[tokio::test]
    async fn test_delete_passes_through_untouched() {
        let message = json!({"fltdMessage": {
            "@msgType": "flightPlanCancellation",
            "@flightRef": "F1",
            "@acid": "N1QS",
            "fdm:flightPlanCancellation": {}
        }});
        let item = pipeline().process(&message, now()).await;
        assert!(matches!(item, Some(HandOff::Delete(ref d)) if d.flight_ref == "F1"));
    }
}
