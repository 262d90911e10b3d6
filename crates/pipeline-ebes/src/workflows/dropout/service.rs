use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use super::domain::{
    next_dropout_id, resolve_role_status, AmDecision, DropoutRequest, DropoutStage,
};
use crate::domain::{DropoutRequestId, Role, RoleId, RoleStatus, UserId, UserRole};
use crate::error::ValidationError;
use crate::workflows::ledger::CandidateLedger;
use crate::workflows::repository::{
    Notification, NotificationKind, NotificationSink, PipelineRepository, RelatedEntity,
    TeamDirectory,
};
use crate::workflows::WorkflowError;

/// Result of an account manager decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DropoutDecision {
    pub request: DropoutRequest,
    pub role: Role,
    /// Associations closed by the resolved role status. Zero when the ledger catch-up failed
    /// and was logged instead.
    pub discarded_associations: usize,
}

/// Recruiter -> recruitment manager -> account manager approval flow for dropouts.
pub struct DropoutWorkflowService<R, D, N> {
    repository: Arc<R>,
    directory: Arc<D>,
    notifications: Arc<N>,
    ledger: CandidateLedger<R>,
}

impl<R, D, N> DropoutWorkflowService<R, D, N>
where
    R: PipelineRepository + 'static,
    D: TeamDirectory + 'static,
    N: NotificationSink + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, notifications: Arc<N>) -> Self {
        let ledger = CandidateLedger::new(Arc::clone(&repository));
        Self {
            repository,
            directory,
            notifications,
            ledger,
        }
    }

    /// Logs a dropout against an active role and moves the role into `dropout`.
    pub fn record(
        &self,
        role_id: &RoleId,
        recruiter: &UserId,
        reason: &str,
    ) -> Result<DropoutRequest, WorkflowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::EmptyField("dropout reason").into());
        }

        let profile = self
            .directory
            .user(recruiter)?
            .ok_or_else(|| WorkflowError::not_found("user", recruiter))?;
        if profile.role != UserRole::Recruiter {
            return Err(WorkflowError::forbidden(recruiter, "record dropouts"));
        }

        let role = self
            .repository
            .fetch_role(role_id)?
            .ok_or_else(|| WorkflowError::not_found("role", role_id))?;
        if role.status != RoleStatus::Active {
            return Err(WorkflowError::InvalidStateTransition(format!(
                "role '{role_id}' is {} and cannot take a dropout",
                role.status
            )));
        }

        let works_role = self
            .repository
            .associations_for_role(role_id)?
            .iter()
            .any(|association| association.recruiter_user_id == *recruiter);
        if !works_role {
            return Err(WorkflowError::forbidden(
                recruiter,
                "record a dropout on a role they do not work",
            ));
        }

        let rm = self
            .directory
            .recruitment_manager_for(&role.team_id)?
            .ok_or_else(|| {
                WorkflowError::not_found("recruitment manager for team", &role.team_id)
            })?;

        let request = DropoutRequest::new(
            next_dropout_id(),
            role.id.clone(),
            recruiter.clone(),
            rm,
            role.account_manager_id.clone(),
            reason,
            Utc::now(),
        );
        let stored = self.repository.open_request(request)?;
        info!(request = %stored.id, role = %stored.role_id, %recruiter, "dropout recorded");

        self.notify(Notification {
            user_id: stored.rm_user_id.clone(),
            kind: NotificationKind::DropoutRequested,
            title: "Dropout awaiting acknowledgement".to_string(),
            message: format!(
                "Recruiter {} logged a dropout on role {}: {}",
                stored.recruiter_user_id, stored.role_id, stored.reason
            ),
            related: related(&stored),
        });

        Ok(stored)
    }

    /// Acknowledgement by the recruitment manager named on the request.
    pub fn acknowledge(
        &self,
        request_id: &DropoutRequestId,
        rm: &UserId,
        notes: Option<String>,
    ) -> Result<DropoutRequest, WorkflowError> {
        let request = self.require_request(request_id)?;
        if request.rm_user_id != *rm {
            return Err(WorkflowError::forbidden(rm, "acknowledge this dropout request"));
        }

        let acknowledged = request.acknowledged(notes, Utc::now())?;
        let stored = self
            .repository
            .transition(DropoutStage::Pending, acknowledged)?;
        info!(request = %stored.id, %rm, "dropout acknowledged");

        self.notify(Notification {
            user_id: stored.am_user_id.clone(),
            kind: NotificationKind::DropoutDecisionRequired,
            title: "Dropout decision required".to_string(),
            message: format!(
                "Dropout on role {} was acknowledged and needs your decision",
                stored.role_id
            ),
            related: related(&stored),
        });

        Ok(stored)
    }

    /// Final decision by the account manager named on the request. The request completion
    /// and the role status commit together; the ledger catch-up that follows is logged on
    /// failure and converges when the status is applied again.
    pub fn decide(
        &self,
        request_id: &DropoutRequestId,
        am: &UserId,
        decision: AmDecision,
        new_role_status: Option<RoleStatus>,
    ) -> Result<DropoutDecision, WorkflowError> {
        let request = self.require_request(request_id)?;
        if request.am_user_id != *am {
            return Err(WorkflowError::forbidden(am, "decide this dropout request"));
        }

        let completed = request.decided(decision, new_role_status, Utc::now())?;
        let resolved = resolve_role_status(new_role_status);

        let (stored, role) = self.repository.commit_decision(completed, resolved)?;
        info!(
            request = %stored.id,
            %am,
            decision = decision.label(),
            role_status = resolved.label(),
            "dropout decided"
        );

        let discarded_associations = match self.ledger.apply_role_status(&role.id, resolved) {
            Ok(count) => count,
            Err(err) => {
                error!(
                    request = %stored.id,
                    role = %role.id,
                    error = %err,
                    "ledger update after dropout decision failed"
                );
                0
            }
        };

        self.notify(Notification {
            user_id: stored.recruiter_user_id.clone(),
            kind: NotificationKind::DropoutDecided,
            title: "Dropout decided".to_string(),
            message: format!(
                "Your dropout on role {} was marked '{}'; the role is now {}",
                stored.role_id,
                decision.label(),
                resolved
            ),
            related: related(&stored),
        });
        self.notify(Notification {
            user_id: stored.rm_user_id.clone(),
            kind: NotificationKind::DropoutDecisionRecorded,
            title: "Dropout decision recorded".to_string(),
            message: format!(
                "Account manager {} recorded '{}' for the dropout on role {}",
                stored.am_user_id,
                decision.label(),
                stored.role_id
            ),
            related: related(&stored),
        });

        Ok(DropoutDecision {
            request: stored,
            role,
            discarded_associations,
        })
    }

    /// Requests waiting on the recruitment manager's acknowledgement.
    pub fn pending_for_rm(&self, rm: &UserId) -> Result<Vec<DropoutRequest>, WorkflowError> {
        Ok(self.repository.requests_for_rm(rm, DropoutStage::Pending)?)
    }

    /// Acknowledged requests waiting on the account manager's decision.
    pub fn pending_for_am(&self, am: &UserId) -> Result<Vec<DropoutRequest>, WorkflowError> {
        Ok(self
            .repository
            .requests_for_am(am, DropoutStage::Acknowledged)?)
    }

    pub fn get(&self, request_id: &DropoutRequestId) -> Result<DropoutRequest, WorkflowError> {
        self.require_request(request_id)
    }

    /// Most recent incomplete request for the role, if any.
    pub fn current_for_role(
        &self,
        role_id: &RoleId,
    ) -> Result<Option<DropoutRequest>, WorkflowError> {
        if self.repository.fetch_role(role_id)?.is_none() {
            return Err(WorkflowError::not_found("role", role_id));
        }

        Ok(self
            .repository
            .requests_for_role(role_id)?
            .into_iter()
            .rev()
            .find(|request| !request.is_completed()))
    }

    fn require_request(&self, id: &DropoutRequestId) -> Result<DropoutRequest, WorkflowError> {
        self.repository
            .fetch_request(id)?
            .ok_or_else(|| WorkflowError::not_found("dropout request", id))
    }

    fn notify(&self, notification: Notification) {
        let user = notification.user_id.clone();
        let kind = notification.kind;
        if let Err(err) = self.notifications.notify(notification) {
            warn!(%user, ?kind, error = %err, "notification delivery failed");
        }
    }
}

fn related(request: &DropoutRequest) -> RelatedEntity {
    RelatedEntity {
        kind: "dropout_request".to_string(),
        id: request.id.to_string(),
    }
}
