//! HTTP API handlers for fplan-tracker

pub mod flight_plan;
pub mod health;

pub use flight_plan::next_flight_plan;
pub use health::health_routes;
