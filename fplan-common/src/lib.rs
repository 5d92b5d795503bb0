//! # FPLAN Common Library
//!
//! Shared code for the FPLAN services:
//! - Flight-plan data model and hand-off wire types
//! - Store schema bootstrap
//! - Configuration loading
//! - Feed timestamp handling

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
