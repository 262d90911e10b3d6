//! Recruiting pipeline effort scoring (EBES) and the dropout approval workflow.
//!
//! The crate is storage agnostic: persistence, the activity aggregator, the team directory and
//! notification delivery are traits implemented by the embedding service.

pub mod config;
pub mod domain;
pub mod error;
pub mod scoring;
pub mod telemetry;
pub mod workflows;
