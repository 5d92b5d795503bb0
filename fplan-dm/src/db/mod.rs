//! Store writes performed by the database manager

pub mod merge;

pub use merge::*;
