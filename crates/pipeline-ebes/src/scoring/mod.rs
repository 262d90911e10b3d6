//! EBES scoring engine.
//!
//! One pure function per role type turns aggregate activity counts into a capped, labeled score.
//! Table 1 carries activity/performance points, Table 2 the workload denominator. Nothing in this
//! module performs I/O; [`service::ScoringService`] is the only piece that talks to the
//! aggregator and the snapshot store.

mod account_manager;
pub mod aggregates;
pub mod history;
mod policy;
mod recruiter;
mod recruitment_manager;
pub mod router;
mod rules;
pub mod service;

pub use account_manager::{compute_account_manager_score, AM_MAX_EXPECTED_POINTS};
pub use aggregates::{
    actively_worked_roles, average_cv_match, AccountManagerAggregates, ActivityAggregator,
    RecruiterAggregates, RecruitmentManagerAggregates,
};
pub use history::{ComponentTotals, EbesHistoryRepository, RmEbesHistory};
pub use policy::{quality_bonus, ScoreLabel};
pub use recruiter::compute_recruiter_score;
pub use recruitment_manager::{apply_quality_bonus, compute_recruitment_manager_score};
pub use router::scoring_router;
pub use service::ScoringService;

use serde::{Deserialize, Serialize};

/// Inputs that move a score, named so component breakdowns stay readable in audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Submissions6h,
    Submissions24h,
    SubmissionsAfter24h,
    InterviewsLevel1,
    InterviewsLevel2,
    Deals,
    AcceptedDropouts,
    DiscardedCandidates,
    LostRoleCandidates,
    AssignedRoles,
    ActivelyWorkedRoles,
    Roles,
    LostRoles,
    NoAnswerRoles,
    CancelledRoles,
    OnHoldRoles,
    DropoutRoles,
    OverloadedWithoutDeals,
    TotalRoles,
    ActiveRoles,
    Dropouts,
}

/// Which side of the ratio a component lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreTable {
    Performance,
    Engagement,
}

/// Discrete contribution to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub table: ScoreTable,
    pub points: f64,
    pub notes: String,
}

/// Final score plus the trail that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// Rounded to one decimal, always within `[0, cap]`.
    pub score: f64,
    pub label: ScoreLabel,
    pub table1_points: f64,
    pub table2_points: f64,
    pub cap: f64,
    pub quality_bonus: f64,
    pub components: Vec<ScoreComponent>,
}

impl ScoreResult {
    pub fn points_for(&self, factor: ScoreFactor) -> f64 {
        self.components
            .iter()
            .filter(|component| component.factor == factor)
            .map(|component| component.points)
            .sum()
    }
}
