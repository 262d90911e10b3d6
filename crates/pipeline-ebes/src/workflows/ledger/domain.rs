use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{CandidateId, RoleId, RoleStatus, UserId};

const GLOBAL_DISCARD_TEMPLATE: &str = "Candidate discarded globally";
const ROLE_STATUS_TEMPLATE_PREFIX: &str = "Role marked as ";
const DEFAULT_MANUAL_REASON: &str = "Discarded by recruiter";

/// Why an association was discarded. Exactly one cause applies at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", content = "detail", rename_all = "snake_case")]
pub enum DiscardReason {
    /// The candidate was discarded everywhere; undone by restoring the candidate.
    GlobalDiscard,
    /// The role was lost. The only family carrying a scoring penalty of its own.
    LostRole,
    /// The role closed as deal, on hold or cancelled.
    RoleClosed(RoleStatus),
    /// Explicit discard of a single association.
    Manual(String),
}

impl DiscardReason {
    /// Ledger transition triggered by a role moving to `status`, if any.
    pub fn for_role_status(status: RoleStatus) -> Option<Self> {
        match status {
            RoleStatus::Lost => Some(DiscardReason::LostRole),
            RoleStatus::Deal | RoleStatus::OnHold | RoleStatus::Cancelled => {
                Some(DiscardReason::RoleClosed(status))
            }
            RoleStatus::Active | RoleStatus::NoAnswer | RoleStatus::Dropout => None,
        }
    }

    /// Manual reason, defaulting when the caller left it blank.
    pub fn manual(reason: Option<&str>) -> Self {
        let reason = reason
            .map(str::trim)
            .filter(|reason| !reason.is_empty())
            .unwrap_or(DEFAULT_MANUAL_REASON);
        DiscardReason::Manual(reason.to_string())
    }

    pub fn is_lost_role(&self) -> bool {
        matches!(self, DiscardReason::LostRole)
    }

    /// Human readable reason as stored in the `discarded_reason` column.
    pub fn text(&self) -> String {
        match self {
            DiscardReason::GlobalDiscard => GLOBAL_DISCARD_TEMPLATE.to_string(),
            DiscardReason::LostRole => format!("{ROLE_STATUS_TEMPLATE_PREFIX}lost"),
            DiscardReason::RoleClosed(status) => {
                format!("{ROLE_STATUS_TEMPLATE_PREFIX}{}", status.label())
            }
            DiscardReason::Manual(reason) => reason.clone(),
        }
    }

    /// Reverse of [`DiscardReason::text`] for rows that only carry the flat columns.
    fn from_text(text: &str, is_lost_role: bool) -> Self {
        if is_lost_role {
            return DiscardReason::LostRole;
        }
        if text == GLOBAL_DISCARD_TEMPLATE {
            return DiscardReason::GlobalDiscard;
        }
        if let Some(status) = text
            .strip_prefix(ROLE_STATUS_TEMPLATE_PREFIX)
            .and_then(|label| label.parse::<RoleStatus>().ok())
            .filter(|status| !matches!(status, RoleStatus::Lost))
        {
            if let Some(reason @ DiscardReason::RoleClosed(_)) =
                DiscardReason::for_role_status(status)
            {
                return reason;
            }
        }
        DiscardReason::Manual(text.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AssociationState {
    Engaged,
    Discarded {
        reason: DiscardReason,
        discarded_at: DateTime<Utc>,
    },
}

/// Raised when flat ledger columns describe an impossible state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("association {candidate_id}/{role_id} is flagged lost-role without being discarded")]
pub struct LedgerInvariantViolation {
    pub candidate_id: CandidateId,
    pub role_id: RoleId,
}

/// A candidate's engagement with one role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRoleAssociation {
    pub candidate_id: CandidateId,
    pub role_id: RoleId,
    pub recruiter_user_id: UserId,
    pub state: AssociationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRoleAssociation {
    pub fn engaged(
        candidate_id: CandidateId,
        role_id: RoleId,
        recruiter_user_id: UserId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            candidate_id,
            role_id,
            recruiter_user_id,
            state: AssociationState::Engaged,
            created_at: at,
            updated_at: at,
        }
    }

    /// Rebuilds an association from the flat `is_discarded` / `is_lost_role` /
    /// `discarded_reason` columns, rejecting a lost-role flag on an engaged row.
    #[allow(clippy::too_many_arguments)]
    pub fn from_flags(
        candidate_id: CandidateId,
        role_id: RoleId,
        recruiter_user_id: UserId,
        is_discarded: bool,
        is_lost_role: bool,
        discarded_reason: Option<&str>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, LedgerInvariantViolation> {
        let state = match (is_discarded, is_lost_role) {
            (false, true) => {
                return Err(LedgerInvariantViolation {
                    candidate_id,
                    role_id,
                })
            }
            (false, false) => AssociationState::Engaged,
            (true, lost) => AssociationState::Discarded {
                reason: DiscardReason::from_text(discarded_reason.unwrap_or_default(), lost),
                discarded_at: updated_at,
            },
        };

        Ok(Self {
            candidate_id,
            role_id,
            recruiter_user_id,
            state,
            created_at,
            updated_at,
        })
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self.state, AssociationState::Discarded { .. })
    }

    pub fn is_lost_role(&self) -> bool {
        self.discard_reason().is_some_and(DiscardReason::is_lost_role)
    }

    pub fn discard_reason(&self) -> Option<&DiscardReason> {
        match &self.state {
            AssociationState::Engaged => None,
            AssociationState::Discarded { reason, .. } => Some(reason),
        }
    }

    pub fn discarded_reason(&self) -> Option<String> {
        self.discard_reason().map(DiscardReason::text)
    }

    pub fn discarded_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            AssociationState::Engaged => None,
            AssociationState::Discarded { discarded_at, .. } => Some(*discarded_at),
        }
    }

    /// Returns `false` when already discarded; the original reason and timestamp stay.
    pub fn discard(&mut self, reason: DiscardReason, at: DateTime<Utc>) -> bool {
        if self.is_discarded() {
            return false;
        }
        self.state = AssociationState::Discarded {
            reason,
            discarded_at: at,
        };
        self.updated_at = at;
        true
    }

    /// Restores only a discard made for exactly `reason`.
    pub fn restore_if(&mut self, reason: &DiscardReason, at: DateTime<Utc>) -> bool {
        if self.discard_reason() != Some(reason) {
            return false;
        }
        self.state = AssociationState::Engaged;
        self.updated_at = at;
        true
    }
}
