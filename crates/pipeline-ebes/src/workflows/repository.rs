//! Storage, directory and notification seams consumed by the workflows.
//!
//! Every mutating method states the predicate it checks. Implementations must evaluate that
//! predicate and apply the write as one atomic step (a transaction or a conditional update),
//! never as a separate read followed by a write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::dropout::domain::{DropoutRequest, DropoutStage};
use super::ledger::domain::{CandidateRoleAssociation, DiscardReason};
use crate::domain::{
    Candidate, CandidateId, DropoutRequestId, Role, RoleId, RoleStatus, TeamId, UserId,
    UserProfile,
};

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record changed concurrently (expected {expected})")]
    StaleState { expected: String },
    #[error("active role limit of {limit} reached")]
    CapacityExceeded { limit: usize },
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

pub trait RoleRepository: Send + Sync {
    fn fetch_role(&self, id: &RoleId) -> Result<Option<Role>, RepositoryError>;

    /// Inserts `role` unless its account manager already holds `limit` active roles.
    /// Fails with `CapacityExceeded` when full and `Conflict` when the id exists.
    fn insert_within_limit(&self, role: Role, limit: usize) -> Result<Role, RepositoryError>;

    /// Sets the status only while the stored status still equals `expected`,
    /// otherwise fails with `StaleState`.
    fn update_role_status(
        &self,
        id: &RoleId,
        expected: RoleStatus,
        status: RoleStatus,
        at: DateTime<Utc>,
    ) -> Result<Role, RepositoryError>;
}

pub trait AssociationRepository: Send + Sync {
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError>;

    fn set_candidate_active(
        &self,
        id: &CandidateId,
        active: bool,
    ) -> Result<Candidate, RepositoryError>;

    fn fetch_association(
        &self,
        candidate: &CandidateId,
        role: &RoleId,
    ) -> Result<Option<CandidateRoleAssociation>, RepositoryError>;

    fn associations_for_role(
        &self,
        role: &RoleId,
    ) -> Result<Vec<CandidateRoleAssociation>, RepositoryError>;

    fn associations_for_candidate(
        &self,
        candidate: &CandidateId,
    ) -> Result<Vec<CandidateRoleAssociation>, RepositoryError>;

    /// Discards the association only while it is still engaged. Returns `false` (and writes
    /// nothing) when it was already discarded.
    fn discard_if_engaged(
        &self,
        candidate: &CandidateId,
        role: &RoleId,
        reason: DiscardReason,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;

    /// Restores the association only while it is discarded for exactly `reason`.
    fn restore_if_discarded_for(
        &self,
        candidate: &CandidateId,
        role: &RoleId,
        reason: &DiscardReason,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>;
}

pub trait DropoutRepository: Send + Sync {
    /// Moves the role from `active` to `dropout` and inserts the pending request together.
    /// Fails with `StaleState` when the role is no longer active.
    fn open_request(&self, request: DropoutRequest) -> Result<DropoutRequest, RepositoryError>;

    fn fetch_request(
        &self,
        id: &DropoutRequestId,
    ) -> Result<Option<DropoutRequest>, RepositoryError>;

    /// Replaces the stored request only while its stage equals `expected`.
    fn transition(
        &self,
        expected: DropoutStage,
        request: DropoutRequest,
    ) -> Result<DropoutRequest, RepositoryError>;

    /// Stores the completed request and sets the role status in one step. The stored request
    /// must still be `Acknowledged`, otherwise nothing is written and `StaleState` is returned.
    fn commit_decision(
        &self,
        request: DropoutRequest,
        role_status: RoleStatus,
    ) -> Result<(DropoutRequest, Role), RepositoryError>;

    fn requests_for_rm(
        &self,
        rm: &UserId,
        stage: DropoutStage,
    ) -> Result<Vec<DropoutRequest>, RepositoryError>;

    fn requests_for_am(
        &self,
        am: &UserId,
        stage: DropoutStage,
    ) -> Result<Vec<DropoutRequest>, RepositoryError>;

    /// All requests ever opened against the role, oldest first.
    fn requests_for_role(&self, role: &RoleId) -> Result<Vec<DropoutRequest>, RepositoryError>;
}

/// Everything the pipeline workflows need from storage.
pub trait PipelineRepository: RoleRepository + AssociationRepository + DropoutRepository {}

impl<T> PipelineRepository for T where T: RoleRepository + AssociationRepository + DropoutRepository
{}

/// User and team lookups.
pub trait TeamDirectory: Send + Sync {
    fn user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;
    fn recruitment_manager_for(&self, team: &TeamId) -> Result<Option<UserId>, RepositoryError>;
}

/// Outbound notification hook (push, e-mail, in-app feed).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DropoutRequested,
    DropoutDecisionRequired,
    DropoutDecided,
    DropoutDecisionRecorded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related: RelatedEntity,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
}
