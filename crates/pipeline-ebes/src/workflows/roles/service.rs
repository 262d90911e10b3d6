use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::WorkflowConfig;
use crate::domain::{ClientId, Role, RoleId, RoleStatus, TeamId, UserId, UserProfile, UserRole};
use crate::error::ValidationError;
use crate::workflows::ledger::CandidateLedger;
use crate::workflows::repository::{
    AssociationRepository, RepositoryError, RoleRepository, TeamDirectory,
};
use crate::workflows::WorkflowError;

static ROLE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_role_id() -> RoleId {
    let id = ROLE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RoleId(format!("role-{id:06}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRoleRequest {
    pub account_manager_id: UserId,
    pub team_id: TeamId,
    pub client_id: ClientId,
}

/// Outcome of a status change, including the ledger rows it discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleStatusChange {
    pub role: Role,
    pub previous_status: RoleStatus,
    pub discarded_associations: usize,
}

/// Role admission and status lifecycle.
pub struct RoleService<R, D> {
    repository: Arc<R>,
    directory: Arc<D>,
    ledger: CandidateLedger<R>,
    config: WorkflowConfig,
}

impl<R, D> RoleService<R, D>
where
    R: RoleRepository + AssociationRepository + 'static,
    D: TeamDirectory + 'static,
{
    pub fn new(repository: Arc<R>, directory: Arc<D>, config: WorkflowConfig) -> Self {
        let ledger = CandidateLedger::new(Arc::clone(&repository));
        Self {
            repository,
            directory,
            ledger,
            config,
        }
    }

    /// Opens an `active` role. The active-role limit check and the insert happen inside one
    /// repository call.
    pub fn open_role(
        &self,
        actor: &UserId,
        request: OpenRoleRequest,
    ) -> Result<Role, WorkflowError> {
        let profile = self.require_user(actor)?;
        if !matches!(
            profile.role,
            UserRole::AccountManager | UserRole::RecruitmentManager | UserRole::Admin
        ) {
            return Err(WorkflowError::forbidden(actor, "open roles"));
        }

        let manager = self.require_user(&request.account_manager_id)?;
        if manager.role != UserRole::AccountManager {
            return Err(ValidationError::NotAnAccountManager(manager.id.0).into());
        }

        let role = Role::open(
            next_role_id(),
            request.account_manager_id,
            request.team_id,
            request.client_id,
            Utc::now(),
        );

        let limit = self.config.max_active_roles;
        match self.repository.insert_within_limit(role, limit) {
            Ok(role) => {
                info!(role = %role.id, account_manager = %role.account_manager_id, "role opened");
                Ok(role)
            }
            Err(RepositoryError::CapacityExceeded { limit }) => {
                warn!(account_manager = %manager.id, limit, "active role limit reached");
                Err(WorkflowError::CapacityExceeded {
                    account_manager: manager.id,
                    limit,
                })
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Moves a role to `status` and applies the matching ledger transition. `dropout` is
    /// reserved for the dropout workflow, and a role waiting on a dropout decision cannot be
    /// moved by hand.
    pub fn change_status(
        &self,
        actor: &UserId,
        role_id: &RoleId,
        status: RoleStatus,
    ) -> Result<RoleStatusChange, WorkflowError> {
        if status == RoleStatus::Dropout {
            return Err(ValidationError::ReservedStatus(status).into());
        }

        let role = self
            .repository
            .fetch_role(role_id)?
            .ok_or_else(|| WorkflowError::not_found("role", role_id))?;

        let profile = self.require_user(actor)?;
        let may_change = role.account_manager_id == *actor
            || matches!(
                profile.role,
                UserRole::RecruitmentManager | UserRole::Admin
            );
        if !may_change {
            return Err(WorkflowError::forbidden(actor, "change this role's status"));
        }

        if role.status == RoleStatus::Dropout {
            return Err(WorkflowError::InvalidStateTransition(format!(
                "role '{role_id}' is waiting on a dropout decision"
            )));
        }

        let previous_status = role.status;
        let role = if previous_status == status {
            role
        } else {
            self.repository
                .update_role_status(role_id, previous_status, status, Utc::now())?
        };

        let discarded_associations = self.ledger.apply_role_status(role_id, status)?;
        info!(
            role = %role_id,
            from = previous_status.label(),
            to = status.label(),
            discarded_associations,
            "role status changed"
        );

        Ok(RoleStatusChange {
            role,
            previous_status,
            discarded_associations,
        })
    }

    pub fn get(&self, role_id: &RoleId) -> Result<Role, WorkflowError> {
        self.repository
            .fetch_role(role_id)?
            .ok_or_else(|| WorkflowError::not_found("role", role_id))
    }

    fn require_user(&self, id: &UserId) -> Result<UserProfile, WorkflowError> {
        self.directory
            .user(id)?
            .ok_or_else(|| WorkflowError::not_found("user", id))
    }
}
