use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info};

use super::aggregates::ActivityAggregator;
use super::history::{EbesHistoryRepository, RmEbesHistory};
use super::{
    apply_quality_bonus, compute_account_manager_score, compute_recruiter_score,
    compute_recruitment_manager_score, ScoreResult,
};
use crate::domain::{DateRange, UserId};
use crate::workflows::repository::RepositoryError;

/// Pulls aggregates for a person and runs them through the matching formula.
pub struct ScoringService<G, H> {
    aggregator: Arc<G>,
    history: Arc<H>,
}

impl<G, H> ScoringService<G, H>
where
    G: ActivityAggregator + 'static,
    H: EbesHistoryRepository + 'static,
{
    pub fn new(aggregator: Arc<G>, history: Arc<H>) -> Self {
        Self {
            aggregator,
            history,
        }
    }

    pub fn recruiter_score(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<ScoreResult, RepositoryError> {
        let aggregates = self.aggregator.recruiter(user, range)?;
        let result = compute_recruiter_score(&aggregates);
        debug!(%user, score = result.score, label = result.label.label(), "recruiter scored");
        Ok(result)
    }

    pub fn account_manager_score(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<ScoreResult, RepositoryError> {
        let aggregates = self.aggregator.account_manager(user, range)?;
        let result = compute_account_manager_score(&aggregates);
        debug!(%user, score = result.score, label = result.label.label(), "account manager scored");
        Ok(result)
    }

    /// Team score with the CV-quality bonus layered on top.
    pub fn recruitment_manager_score(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<ScoreResult, RepositoryError> {
        let aggregates = self.aggregator.recruitment_manager(user, range)?;
        let result = apply_quality_bonus(
            compute_recruitment_manager_score(&aggregates),
            aggregates.average_quality,
        );
        debug!(%user, score = result.score, label = result.label.label(), "recruitment manager scored");
        Ok(result)
    }

    /// Scores the manager and stores the snapshot for `day`, replacing any earlier one.
    pub fn record_daily_snapshot(
        &self,
        user: &UserId,
        day: NaiveDate,
        range: Option<&DateRange>,
    ) -> Result<RmEbesHistory, RepositoryError> {
        let result = self.recruitment_manager_score(user, range)?;
        let stored = self
            .history
            .upsert(RmEbesHistory::from_result(user.clone(), day, &result))?;
        info!(%user, %day, score = stored.score, "recorded recruitment manager snapshot");
        Ok(stored)
    }

    pub fn snapshots(&self, user: &UserId) -> Result<Vec<RmEbesHistory>, RepositoryError> {
        self.history.history(user)
    }
}
