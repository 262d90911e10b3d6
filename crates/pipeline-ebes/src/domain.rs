//! Entities shared by the scoring engine and the pipeline workflows.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

identifier!(
    /// Any platform user: recruiter, account manager, recruitment manager or admin.
    UserId
);
identifier!(
    /// Recruiting requisition identifier.
    RoleId
);
identifier!(CandidateId);
identifier!(TeamId);
identifier!(ClientId);
identifier!(DropoutRequestId);

/// Platform role type of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Recruiter,
    AccountManager,
    RecruitmentManager,
    Admin,
}

impl UserRole {
    pub const fn label(self) -> &'static str {
        match self {
            UserRole::Recruiter => "recruiter",
            UserRole::AccountManager => "account_manager",
            UserRole::RecruitmentManager => "recruitment_manager",
            UserRole::Admin => "admin",
        }
    }
}

/// Directory entry resolved for an acting user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub role: UserRole,
    pub team_id: Option<TeamId>,
}

/// Lifecycle status of a role. The status alone decides whether a role counts as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    Active,
    Deal,
    Lost,
    OnHold,
    Cancelled,
    NoAnswer,
    Dropout,
}

impl RoleStatus {
    pub const ALL: [RoleStatus; 7] = [
        RoleStatus::Active,
        RoleStatus::Deal,
        RoleStatus::Lost,
        RoleStatus::OnHold,
        RoleStatus::Cancelled,
        RoleStatus::NoAnswer,
        RoleStatus::Dropout,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            RoleStatus::Active => "active",
            RoleStatus::Deal => "deal",
            RoleStatus::Lost => "lost",
            RoleStatus::OnHold => "on_hold",
            RoleStatus::Cancelled => "cancelled",
            RoleStatus::NoAnswer => "no_answer",
            RoleStatus::Dropout => "dropout",
        }
    }

    pub const fn is_active(self) -> bool {
        matches!(self, RoleStatus::Active)
    }
}

impl fmt::Display for RoleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised when a status string does not name a known role status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role status '{0}'")]
pub struct UnknownRoleStatus(pub String);

impl FromStr for RoleStatus {
    type Err = UnknownRoleStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        RoleStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| UnknownRoleStatus(value.to_string()))
    }
}

/// Recruiting requisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub status: RoleStatus,
    pub account_manager_id: UserId,
    pub team_id: TeamId,
    pub client_id: ClientId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// A freshly opened role always starts out `active`.
    pub fn open(
        id: RoleId,
        account_manager_id: UserId,
        team_id: TeamId,
        client_id: ClientId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            status: RoleStatus::Active,
            account_manager_id,
            team_id,
            client_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Candidate owned by the recruiter who created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub owner_recruiter_id: UserId,
    /// Cleared when the candidate is discarded globally.
    pub is_active: bool,
}

/// Inclusive calendar window applied to aggregate reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Returns `None` when `from` is after `to`.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        (from <= to).then_some(Self { from, to })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.date_naive();
        self.from <= day && day <= self.to
    }
}

/// `true` when the instant falls inside the optional window (no window means "all time").
pub fn within(range: Option<&DateRange>, at: DateTime<Utc>) -> bool {
    range.map_or(true, |range| range.contains(at))
}
