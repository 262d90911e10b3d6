//! Output contract of the activity aggregator.
//!
//! The aggregator itself belongs to the persistence layer; these structs are what it must hand
//! to the scoring engine. All counts are non-negative by construction.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{DateRange, RoleId, UserId};
use crate::error::ValidationError;
use crate::workflows::repository::RepositoryError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecruiterAggregates {
    pub submissions_6h: u32,
    pub submissions_24h: u32,
    pub submissions_after_24h: u32,
    pub interviews_level1: u32,
    pub interviews_level2: u32,
    pub deals: u32,
    pub accepted_dropouts: u32,
    /// Discarded associations that are not lost-role discards.
    pub discarded_candidates: u32,
    pub lost_role_candidates: u32,
    pub assigned_roles: u32,
    /// Roles with recorded activity outside the formal assignment set.
    pub actively_worked_roles: u32,
    /// Mean CV-match percentage over the submissions in scope.
    pub average_quality: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountManagerAggregates {
    pub roles: u32,
    pub interviews_level1: u32,
    pub interviews_level2: u32,
    pub deals: u32,
    pub lost_roles: u32,
    pub no_answer_roles: u32,
    pub cancelled_roles: u32,
    pub on_hold_roles: u32,
    pub dropout_roles: u32,
    pub active_roles: u32,
}

/// Team-level counts for a recruitment manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecruitmentManagerAggregates {
    pub submissions_6h: u32,
    pub submissions_24h: u32,
    pub submissions_after_24h: u32,
    pub interviews_level1: u32,
    pub interviews_level2: u32,
    /// Collected for reporting; the formula gives it no weight.
    pub interviews_level3: u32,
    pub deals: u32,
    pub dropouts: u32,
    pub total_roles: u32,
    pub active_roles: u32,
    pub average_quality: Option<f64>,
}

impl RecruiterAggregates {
    /// Aggregates posted from outside must carry a real percentage.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_average_quality(self.average_quality)
    }
}

impl RecruitmentManagerAggregates {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_average_quality(self.average_quality)
    }
}

fn check_average_quality(value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(pct) if !pct.is_finite() || !(0.0..=100.0).contains(&pct) => {
            Err(ValidationError::CvMatchOutOfRange(pct))
        }
        _ => Ok(()),
    }
}

/// Read side the scoring service pulls aggregates from.
pub trait ActivityAggregator: Send + Sync {
    fn recruiter(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<RecruiterAggregates, RepositoryError>;

    fn account_manager(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<AccountManagerAggregates, RepositoryError>;

    fn recruitment_manager(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<RecruitmentManagerAggregates, RepositoryError>;
}

/// Worked roles that are not formally assigned, so a role is never credited twice.
pub fn actively_worked_roles(assigned: &BTreeSet<RoleId>, worked: &BTreeSet<RoleId>) -> u32 {
    let count = worked.difference(assigned).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Mean CV-match percentage. Every value must be a percentage at or above `floor`, the same
/// floor the submission path enforces. An empty slice yields `None`.
pub fn average_cv_match(percentages: &[f64], floor: f64) -> Result<Option<f64>, ValidationError> {
    if percentages.is_empty() {
        return Ok(None);
    }

    for &pct in percentages {
        if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
            return Err(ValidationError::CvMatchOutOfRange(pct));
        }
        if pct < floor {
            return Err(ValidationError::CvMatchBelowFloor { found: pct, floor });
        }
    }

    let total: f64 = percentages.iter().sum();
    Ok(Some(total / percentages.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(ids: &[&str]) -> BTreeSet<RoleId> {
        ids.iter().map(|id| RoleId::new(*id)).collect()
    }

    #[test]
    fn worked_roles_exclude_assignments() {
        let assigned = roles(&["r-1", "r-2"]);
        let worked = roles(&["r-2", "r-3", "r-4"]);
        assert_eq!(actively_worked_roles(&assigned, &worked), 2);
        assert_eq!(actively_worked_roles(&worked, &worked), 0);
    }

    #[test]
    fn average_cv_match_requires_submission_floor() {
        assert_eq!(average_cv_match(&[], 85.0), Ok(None));
        assert_eq!(average_cv_match(&[90.0, 96.0], 85.0), Ok(Some(93.0)));
        assert_eq!(
            average_cv_match(&[90.0, 80.0], 85.0),
            Err(ValidationError::CvMatchBelowFloor {
                found: 80.0,
                floor: 85.0
            })
        );
        assert_eq!(
            average_cv_match(&[101.0], 85.0),
            Err(ValidationError::CvMatchOutOfRange(101.0))
        );
    }

    #[test]
    fn average_quality_outside_a_percentage_is_rejected() {
        let mut recruiter = RecruiterAggregates {
            average_quality: Some(250.0),
            ..RecruiterAggregates::default()
        };
        assert_eq!(
            recruiter.validate(),
            Err(ValidationError::CvMatchOutOfRange(250.0))
        );
        recruiter.average_quality = None;
        assert_eq!(recruiter.validate(), Ok(()));

        let manager = RecruitmentManagerAggregates {
            average_quality: Some(-5.0),
            ..RecruitmentManagerAggregates::default()
        };
        assert_eq!(
            manager.validate(),
            Err(ValidationError::CvMatchOutOfRange(-5.0))
        );
        let boundary = RecruitmentManagerAggregates {
            average_quality: Some(100.0),
            ..RecruitmentManagerAggregates::default()
        };
        assert_eq!(boundary.validate(), Ok(()));
    }

    #[test]
    fn aggregates_deserialize_with_missing_fields() {
        let parsed: RecruiterAggregates =
            serde_json::from_str(r#"{"deals": 2, "assigned_roles": 1}"#).expect("parses");
        assert_eq!(parsed.deals, 2);
        assert_eq!(parsed.submissions_6h, 0);
        assert_eq!(parsed.average_quality, None);
    }
}
