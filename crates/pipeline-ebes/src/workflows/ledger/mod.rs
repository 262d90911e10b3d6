//! Candidate-role association ledger.

pub mod domain;
pub mod router;
pub mod service;

pub use domain::{
    AssociationState, CandidateRoleAssociation, DiscardReason, LedgerInvariantViolation,
};
pub use router::ledger_router;
pub use service::CandidateLedger;
