//! fplan-dm library
//!
//! Persistence side of the flight-plan tracker: pulls normalized items from
//! the tracker and merges them into the SQLite store.

pub mod cli;
pub mod db;
pub mod handoff;
