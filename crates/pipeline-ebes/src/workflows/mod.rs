//! Stateful pipeline workflows: role lifecycle, the candidate-role ledger and dropout approval.

pub mod dropout;
mod error;
pub mod ledger;
pub mod repository;
pub mod roles;

#[cfg(test)]
mod tests;

pub use error::WorkflowError;
