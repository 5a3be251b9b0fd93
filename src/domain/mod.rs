//! Core domain types and logic.

pub mod analysis;
pub mod branch;
pub mod cache;
pub mod config_validation;
pub mod equity;
pub mod error;
pub mod merged;
pub mod metrics;
pub mod series;
pub mod signal;
pub mod slope;
pub mod trade;
