use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DropoutRequestId, RoleId, RoleStatus, UserId};
use crate::error::ValidationError;
use crate::workflows::WorkflowError;

static DROPOUT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_dropout_id() -> DropoutRequestId {
    let id = DROPOUT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    DropoutRequestId(format!("dropout-{id:06}"))
}

/// Account manager verdict on an acknowledged dropout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmDecision {
    /// The dropout counts against the recruiter.
    Accept,
    Ignore,
}

impl AmDecision {
    pub const fn label(self) -> &'static str {
        match self {
            AmDecision::Accept => "accept",
            AmDecision::Ignore => "ignore",
        }
    }
}

impl FromStr for AmDecision {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "accept" => Ok(AmDecision::Accept),
            "ignore" => Ok(AmDecision::Ignore),
            _ => Err(ValidationError::UnknownDecision(value.to_string())),
        }
    }
}

/// Coarse position in the `pending -> acknowledged -> completed` lifecycle, used as the
/// expected value of compare-and-swap writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropoutStage {
    Pending,
    Acknowledged,
    Completed,
}

impl DropoutStage {
    pub const fn label(self) -> &'static str {
        match self {
            DropoutStage::Pending => "pending",
            DropoutStage::Acknowledged => "acknowledged",
            DropoutStage::Completed => "completed",
        }
    }
}

/// Each stage carries exactly the facts that exist once it is reached, so an undecided
/// request cannot hold a decision and an unacknowledged one cannot hold notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum DropoutState {
    Pending,
    Acknowledged {
        acknowledged_at: DateTime<Utc>,
        notes: Option<String>,
    },
    Completed {
        acknowledged_at: DateTime<Utc>,
        notes: Option<String>,
        decision: AmDecision,
        requested_status: Option<RoleStatus>,
        resolved_status: RoleStatus,
        decided_at: DateTime<Utc>,
    },
}

impl DropoutState {
    pub fn stage(&self) -> DropoutStage {
        match self {
            DropoutState::Pending => DropoutStage::Pending,
            DropoutState::Acknowledged { .. } => DropoutStage::Acknowledged,
            DropoutState::Completed { .. } => DropoutStage::Completed,
        }
    }
}

/// Role status applied when the account manager decides. `dropout` is never a resting
/// status after a decision, so it resolves to `active` like an omitted status.
pub fn resolve_role_status(requested: Option<RoleStatus>) -> RoleStatus {
    match requested {
        None | Some(RoleStatus::Dropout) => RoleStatus::Active,
        Some(status) => status,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropoutRequest {
    pub id: DropoutRequestId,
    pub role_id: RoleId,
    pub recruiter_user_id: UserId,
    pub rm_user_id: UserId,
    pub am_user_id: UserId,
    pub reason: String,
    pub state: DropoutState,
    pub created_at: DateTime<Utc>,
}

impl DropoutRequest {
    pub fn new(
        id: DropoutRequestId,
        role_id: RoleId,
        recruiter_user_id: UserId,
        rm_user_id: UserId,
        am_user_id: UserId,
        reason: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            role_id,
            recruiter_user_id,
            rm_user_id,
            am_user_id,
            reason: reason.into(),
            state: DropoutState::Pending,
            created_at,
        }
    }

    pub fn stage(&self) -> DropoutStage {
        self.state.stage()
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, DropoutState::Completed { .. })
    }

    /// The acknowledged copy of a pending request.
    pub fn acknowledged(
        &self,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        if !matches!(self.state, DropoutState::Pending) {
            return Err(self.rejected("acknowledge"));
        }

        let notes = notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        Ok(Self {
            state: DropoutState::Acknowledged {
                acknowledged_at: at,
                notes,
            },
            ..self.clone()
        })
    }

    /// The completed copy of an acknowledged request.
    pub fn decided(
        &self,
        decision: AmDecision,
        requested_status: Option<RoleStatus>,
        at: DateTime<Utc>,
    ) -> Result<Self, WorkflowError> {
        let DropoutState::Acknowledged {
            acknowledged_at,
            notes,
        } = &self.state
        else {
            return Err(self.rejected("decide"));
        };

        Ok(Self {
            state: DropoutState::Completed {
                acknowledged_at: *acknowledged_at,
                notes: notes.clone(),
                decision,
                requested_status,
                resolved_status: resolve_role_status(requested_status),
                decided_at: at,
            },
            ..self.clone()
        })
    }

    pub fn decision(&self) -> Option<AmDecision> {
        match &self.state {
            DropoutState::Completed { decision, .. } => Some(*decision),
            _ => None,
        }
    }

    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            DropoutState::Completed { decided_at, .. } => Some(*decided_at),
            _ => None,
        }
    }

    /// Completed with an `accept` verdict.
    pub fn is_accepted(&self) -> bool {
        self.decision() == Some(AmDecision::Accept)
    }

    pub fn view(&self) -> DropoutRequestView {
        let (rm_status, final_status) = match self.stage() {
            DropoutStage::Pending => ("pending", "pending"),
            DropoutStage::Acknowledged => ("acknowledged", "pending"),
            DropoutStage::Completed => ("acknowledged", "completed"),
        };

        let (rm_acknowledged_at, rm_notes) = match &self.state {
            DropoutState::Pending => (None, None),
            DropoutState::Acknowledged {
                acknowledged_at,
                notes,
            }
            | DropoutState::Completed {
                acknowledged_at,
                notes,
                ..
            } => (Some(*acknowledged_at), notes.clone()),
        };

        let (am_new_role_status, resolved_role_status) = match &self.state {
            DropoutState::Completed {
                requested_status,
                resolved_status,
                ..
            } => (*requested_status, Some(*resolved_status)),
            _ => (None, None),
        };

        DropoutRequestView {
            id: self.id.clone(),
            role_id: self.role_id.clone(),
            recruiter_user_id: self.recruiter_user_id.clone(),
            rm_user_id: self.rm_user_id.clone(),
            am_user_id: self.am_user_id.clone(),
            dropout_reason: self.reason.clone(),
            rm_status: rm_status.to_string(),
            rm_notes,
            rm_acknowledged_at,
            am_decision: self.decision(),
            am_new_role_status,
            resolved_role_status,
            am_decided_at: self.decided_at(),
            final_status: final_status.to_string(),
            created_at: self.created_at,
        }
    }

    fn rejected(&self, action: &str) -> WorkflowError {
        WorkflowError::InvalidStateTransition(format!(
            "cannot {action} dropout request '{}' while it is {}",
            self.id,
            self.stage().label()
        ))
    }
}

/// Flat wire representation with the column names dashboards already read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropoutRequestView {
    pub id: DropoutRequestId,
    pub role_id: RoleId,
    pub recruiter_user_id: UserId,
    pub rm_user_id: UserId,
    pub am_user_id: UserId,
    pub dropout_reason: String,
    pub rm_status: String,
    pub rm_notes: Option<String>,
    pub rm_acknowledged_at: Option<DateTime<Utc>>,
    pub am_decision: Option<AmDecision>,
    pub am_new_role_status: Option<RoleStatus>,
    pub resolved_role_status: Option<RoleStatus>,
    pub am_decided_at: Option<DateTime<Utc>>,
    pub final_status: String,
    pub created_at: DateTime<Utc>,
}
