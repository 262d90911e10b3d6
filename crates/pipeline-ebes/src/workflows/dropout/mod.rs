//! Dropout approval: a recruiter logs a dropout, the team's recruitment manager acknowledges
//! it, and the role's account manager decides the outcome and the role's next status.

pub mod domain;
pub mod router;
pub mod service;

pub use domain::{
    resolve_role_status, AmDecision, DropoutRequest, DropoutRequestView, DropoutStage,
    DropoutState,
};
pub use router::dropout_router;
pub use service::{DropoutDecision, DropoutWorkflowService};
