use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::DiscardReason;
use crate::domain::{CandidateId, RoleId, RoleStatus};
use crate::workflows::repository::AssociationRepository;
use crate::workflows::WorkflowError;

/// Discard/restore lifecycle of candidate-role associations. Every operation is idempotent:
/// repeating it converges on the same ledger state and reports zero changes.
pub struct CandidateLedger<R> {
    repository: Arc<R>,
}

impl<R> Clone for CandidateLedger<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R> CandidateLedger<R>
where
    R: AssociationRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Discards one association. Returns `false` when it was already discarded.
    pub fn discard_association(
        &self,
        candidate: &CandidateId,
        role: &RoleId,
        reason: Option<&str>,
    ) -> Result<bool, WorkflowError> {
        if self
            .repository
            .fetch_association(candidate, role)?
            .is_none()
        {
            return Err(WorkflowError::not_found(
                "association",
                format!("{candidate}/{role}"),
            ));
        }

        let changed = self.repository.discard_if_engaged(
            candidate,
            role,
            DiscardReason::manual(reason),
            Utc::now(),
        )?;
        if changed {
            info!(%candidate, %role, "association discarded");
        }
        Ok(changed)
    }

    /// Flags the candidate inactive and discards each engaged association.
    pub fn discard_candidate(&self, candidate: &CandidateId) -> Result<usize, WorkflowError> {
        self.require_candidate(candidate)?;
        self.repository.set_candidate_active(candidate, false)?;

        let now = Utc::now();
        let mut discarded = 0;
        for association in self.repository.associations_for_candidate(candidate)? {
            if self.repository.discard_if_engaged(
                candidate,
                &association.role_id,
                DiscardReason::GlobalDiscard,
                now,
            )? {
                discarded += 1;
            }
        }

        info!(%candidate, discarded, "candidate discarded globally");
        Ok(discarded)
    }

    /// Reactivates the candidate and restores only the associations the global discard
    /// closed. Discards made for any other reason stay in place.
    pub fn restore_candidate(&self, candidate: &CandidateId) -> Result<usize, WorkflowError> {
        self.require_candidate(candidate)?;
        self.repository.set_candidate_active(candidate, true)?;

        let now = Utc::now();
        let mut restored = 0;
        for association in self.repository.associations_for_candidate(candidate)? {
            if self.repository.restore_if_discarded_for(
                candidate,
                &association.role_id,
                &DiscardReason::GlobalDiscard,
                now,
            )? {
                restored += 1;
            }
        }

        info!(%candidate, restored, "candidate restored");
        Ok(restored)
    }

    /// Applies the ledger side of a role status change. Statuses without a ledger effect
    /// return zero.
    pub fn apply_role_status(
        &self,
        role: &RoleId,
        status: RoleStatus,
    ) -> Result<usize, WorkflowError> {
        let Some(reason) = DiscardReason::for_role_status(status) else {
            return Ok(0);
        };

        let now = Utc::now();
        let mut discarded = 0;
        for association in self.repository.associations_for_role(role)? {
            if self.repository.discard_if_engaged(
                &association.candidate_id,
                role,
                reason.clone(),
                now,
            )? {
                discarded += 1;
            }
        }

        if discarded > 0 {
            info!(%role, status = status.label(), discarded, "role closure discarded associations");
        }
        Ok(discarded)
    }

    fn require_candidate(&self, candidate: &CandidateId) -> Result<(), WorkflowError> {
        match self.repository.fetch_candidate(candidate)? {
            Some(_) => Ok(()),
            None => Err(WorkflowError::not_found("candidate", candidate)),
        }
    }
}
