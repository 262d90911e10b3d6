use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::policy::ScoreLabel;
use super::ScoreResult;
use crate::domain::UserId;
use crate::workflows::repository::RepositoryError;

/// Table totals kept alongside a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentTotals {
    pub table1_points: f64,
    pub table2_points: f64,
    pub quality_bonus: f64,
}

/// Daily recruitment manager score, unique per `(rm_user_id, recorded_at)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RmEbesHistory {
    pub rm_user_id: UserId,
    pub recorded_at: NaiveDate,
    pub score: f64,
    pub label: ScoreLabel,
    pub component_totals: ComponentTotals,
}

impl RmEbesHistory {
    pub fn from_result(rm_user_id: UserId, recorded_at: NaiveDate, result: &ScoreResult) -> Self {
        Self {
            rm_user_id,
            recorded_at,
            score: result.score,
            label: result.label,
            component_totals: ComponentTotals {
                table1_points: result.table1_points,
                table2_points: result.table2_points,
                quality_bonus: result.quality_bonus,
            },
        }
    }

    pub fn key(&self) -> (&UserId, NaiveDate) {
        (&self.rm_user_id, self.recorded_at)
    }
}

/// Snapshot store. `upsert` replaces the row for the same manager and day.
pub trait EbesHistoryRepository: Send + Sync {
    fn upsert(&self, snapshot: RmEbesHistory) -> Result<RmEbesHistory, RepositoryError>;
    fn history(&self, rm_user_id: &UserId) -> Result<Vec<RmEbesHistory>, RepositoryError>;
}
