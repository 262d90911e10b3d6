use chrono::{DateTime, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use pipeline_ebes::config::WorkflowConfig;
use pipeline_ebes::domain::{
    within, Candidate, CandidateId, DateRange, DropoutRequestId, Role, RoleId, RoleStatus, TeamId,
    UserId, UserProfile, UserRole,
};
use pipeline_ebes::scoring::{
    actively_worked_roles, average_cv_match, AccountManagerAggregates, ActivityAggregator,
    EbesHistoryRepository, RecruiterAggregates, RecruitmentManagerAggregates, RmEbesHistory,
};
use pipeline_ebes::workflows::dropout::{DropoutRequest, DropoutStage};
use pipeline_ebes::workflows::ledger::{CandidateRoleAssociation, DiscardReason};
use pipeline_ebes::workflows::repository::{
    AssociationRepository, DropoutRepository, Notification, NotificationError, NotificationSink,
    RepositoryError, RoleRepository, TeamDirectory,
};
use pipeline_ebes::workflows::WorkflowError;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// How quickly a CV went out after the role was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SubmissionTiming {
    Within6h,
    Within24h,
    After24h,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum ActivityKind {
    Submission {
        timing: SubmissionTiming,
        cv_match: f64,
    },
    Interview {
        level: u8,
    },
    Deal,
}

/// Raw pipeline event the aggregator folds into counts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ActivityEvent {
    pub(crate) recruiter: UserId,
    pub(crate) role: RoleId,
    pub(crate) kind: ActivityKind,
    pub(crate) at: DateTime<Utc>,
}

#[derive(Default)]
struct PipelineState {
    users: BTreeMap<UserId, UserProfile>,
    team_managers: BTreeMap<TeamId, UserId>,
    roles: BTreeMap<RoleId, Role>,
    candidates: BTreeMap<CandidateId, Candidate>,
    associations: BTreeMap<(CandidateId, RoleId), CandidateRoleAssociation>,
    requests: Vec<DropoutRequest>,
    assignments: BTreeMap<UserId, BTreeSet<RoleId>>,
    activity: Vec<ActivityEvent>,
    history: BTreeMap<(UserId, NaiveDate), RmEbesHistory>,
}

/// Process-local store behind every repository seam, the directory, the activity aggregator
/// and the snapshot history. Each trait method runs under one lock, which makes the
/// conditional writes atomic.
#[derive(Clone)]
pub(crate) struct InMemoryPipeline {
    state: Arc<Mutex<PipelineState>>,
    cv_floor: f64,
}

impl InMemoryPipeline {
    pub(crate) fn new(config: &WorkflowConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(PipelineState::default())),
            cv_floor: config.min_cv_match_percent,
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, PipelineState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("pipeline store lock poisoned".to_string()))
    }

    pub(crate) fn add_user(
        &self,
        id: &str,
        role: UserRole,
        team: Option<&str>,
    ) -> Result<(), RepositoryError> {
        let profile = UserProfile {
            id: UserId::new(id),
            role,
            team_id: team.map(TeamId::new),
        };
        self.state()?.users.insert(profile.id.clone(), profile);
        Ok(())
    }

    pub(crate) fn assign_manager(&self, team: &str, rm: &str) -> Result<(), RepositoryError> {
        self.state()?
            .team_managers
            .insert(TeamId::new(team), UserId::new(rm));
        Ok(())
    }

    pub(crate) fn add_candidate(&self, id: &str, owner: &str) -> Result<(), RepositoryError> {
        let candidate = Candidate {
            id: CandidateId::new(id),
            owner_recruiter_id: UserId::new(owner),
            is_active: true,
        };
        self.state()?
            .candidates
            .insert(candidate.id.clone(), candidate);
        Ok(())
    }

    /// Formal assignment of a recruiter to a role.
    pub(crate) fn assign(&self, recruiter: &UserId, role: &RoleId) -> Result<(), RepositoryError> {
        self.state()?
            .assignments
            .entry(recruiter.clone())
            .or_default()
            .insert(role.clone());
        Ok(())
    }

    /// Links a candidate to a role on behalf of a recruiter.
    pub(crate) fn engage(
        &self,
        candidate: &CandidateId,
        role: &RoleId,
        recruiter: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state()?;
        if !state.candidates.contains_key(candidate) || !state.roles.contains_key(role) {
            return Err(RepositoryError::NotFound);
        }
        let key = (candidate.clone(), role.clone());
        if state.associations.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        let association = CandidateRoleAssociation::engaged(
            candidate.clone(),
            role.clone(),
            recruiter.clone(),
            at,
        );
        state.associations.insert(key, association);
        Ok(())
    }

    /// Stores an activity event. Submissions below the CV-match floor are rejected.
    pub(crate) fn record_activity(&self, event: ActivityEvent) -> Result<(), WorkflowError> {
        if let ActivityKind::Submission { cv_match, .. } = event.kind {
            average_cv_match(&[cv_match], self.cv_floor)?;
        }
        let mut state = self.state()?;
        if !state.roles.contains_key(&event.role) {
            return Err(WorkflowError::NotFound {
                entity: "role",
                id: event.role.to_string(),
            });
        }
        state.activity.push(event);
        Ok(())
    }

    fn mean_quality(&self, cv_matches: &[f64]) -> Result<Option<f64>, RepositoryError> {
        average_cv_match(cv_matches, self.cv_floor)
            .map_err(|err| RepositoryError::Unavailable(format!("stored activity invalid: {err}")))
    }
}

fn count(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn accepted_within(request: &DropoutRequest, range: Option<&DateRange>) -> bool {
    request.is_accepted() && request.decided_at().is_some_and(|at| within(range, at))
}

impl RoleRepository for InMemoryPipeline {
    fn fetch_role(&self, id: &RoleId) -> Result<Option<Role>, RepositoryError> {
        Ok(self.state()?.roles.get(id).cloned())
    }

    fn insert_within_limit(&self, role: Role, limit: usize) -> Result<Role, RepositoryError> {
        let mut state = self.state()?;
        if state.roles.contains_key(&role.id) {
            return Err(RepositoryError::Conflict);
        }
        let active = state
            .roles
            .values()
            .filter(|existing| {
                existing.account_manager_id == role.account_manager_id
                    && existing.status.is_active()
            })
            .count();
        if active >= limit {
            return Err(RepositoryError::CapacityExceeded { limit });
        }
        state.roles.insert(role.id.clone(), role.clone());
        Ok(role)
    }

    fn update_role_status(
        &self,
        id: &RoleId,
        expected: RoleStatus,
        status: RoleStatus,
        at: DateTime<Utc>,
    ) -> Result<Role, RepositoryError> {
        let mut state = self.state()?;
        let role = state.roles.get_mut(id).ok_or(RepositoryError::NotFound)?;
        if role.status != expected {
            return Err(RepositoryError::StaleState {
                expected: expected.label().to_string(),
            });
        }
        role.status = status;
        role.updated_at = at;
        Ok(role.clone())
    }
}

impl AssociationRepository for InMemoryPipeline {
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        Ok(self.state()?.candidates.get(id).cloned())
    }

    fn set_candidate_active(
        &self,
        id: &CandidateId,
        active: bool,
    ) -> Result<Candidate, RepositoryError> {
        let mut state = self.state()?;
        let candidate = state
            .candidates
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        candidate.is_active = active;
        Ok(candidate.clone())
    }

    fn fetch_association(
        &self,
        candidate: &CandidateId,
        role: &RoleId,
    ) -> Result<Option<CandidateRoleAssociation>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .associations
            .get(&(candidate.clone(), role.clone()))
            .cloned())
    }

    fn associations_for_role(
        &self,
        role: &RoleId,
    ) -> Result<Vec<CandidateRoleAssociation>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .associations
            .values()
            .filter(|association| association.role_id == *role)
            .cloned()
            .collect())
    }

    fn associations_for_candidate(
        &self,
        candidate: &CandidateId,
    ) -> Result<Vec<CandidateRoleAssociation>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .associations
            .values()
            .filter(|association| association.candidate_id == *candidate)
            .cloned()
            .collect())
    }

    fn discard_if_engaged(
        &self,
        candidate: &CandidateId,
        role: &RoleId,
        reason: DiscardReason,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state()?;
        let association = state
            .associations
            .get_mut(&(candidate.clone(), role.clone()))
            .ok_or(RepositoryError::NotFound)?;
        Ok(association.discard(reason, at))
    }

    fn restore_if_discarded_for(
        &self,
        candidate: &CandidateId,
        role: &RoleId,
        reason: &DiscardReason,
        at: DateTime<Utc>,
    ) -> Result<bool, RepositoryError> {
        let mut state = self.state()?;
        let association = state
            .associations
            .get_mut(&(candidate.clone(), role.clone()))
            .ok_or(RepositoryError::NotFound)?;
        Ok(association.restore_if(reason, at))
    }
}

impl DropoutRepository for InMemoryPipeline {
    fn open_request(&self, request: DropoutRequest) -> Result<DropoutRequest, RepositoryError> {
        let mut state = self.state()?;
        if state.requests.iter().any(|stored| stored.id == request.id) {
            return Err(RepositoryError::Conflict);
        }
        let role = state
            .roles
            .get_mut(&request.role_id)
            .ok_or(RepositoryError::NotFound)?;
        if role.status != RoleStatus::Active {
            return Err(RepositoryError::StaleState {
                expected: RoleStatus::Active.label().to_string(),
            });
        }
        role.status = RoleStatus::Dropout;
        role.updated_at = request.created_at;
        state.requests.push(request.clone());
        Ok(request)
    }

    fn fetch_request(
        &self,
        id: &DropoutRequestId,
    ) -> Result<Option<DropoutRequest>, RepositoryError> {
        let state = self.state()?;
        Ok(state.requests.iter().find(|stored| stored.id == *id).cloned())
    }

    fn transition(
        &self,
        expected: DropoutStage,
        request: DropoutRequest,
    ) -> Result<DropoutRequest, RepositoryError> {
        let mut state = self.state()?;
        let stored = state
            .requests
            .iter_mut()
            .find(|stored| stored.id == request.id)
            .ok_or(RepositoryError::NotFound)?;
        if stored.stage() != expected {
            return Err(RepositoryError::StaleState {
                expected: expected.label().to_string(),
            });
        }
        *stored = request.clone();
        Ok(request)
    }

    fn commit_decision(
        &self,
        request: DropoutRequest,
        role_status: RoleStatus,
    ) -> Result<(DropoutRequest, Role), RepositoryError> {
        let mut state = self.state()?;
        let position = state
            .requests
            .iter()
            .position(|stored| stored.id == request.id)
            .ok_or(RepositoryError::NotFound)?;
        if state.requests[position].stage() != DropoutStage::Acknowledged {
            return Err(RepositoryError::StaleState {
                expected: DropoutStage::Acknowledged.label().to_string(),
            });
        }
        let decided_at = request.decided_at().unwrap_or_else(Utc::now);
        let role = state
            .roles
            .get_mut(&request.role_id)
            .ok_or(RepositoryError::NotFound)?;
        role.status = role_status;
        role.updated_at = decided_at;
        let role = role.clone();
        state.requests[position] = request.clone();
        Ok((request, role))
    }

    fn requests_for_rm(
        &self,
        rm: &UserId,
        stage: DropoutStage,
    ) -> Result<Vec<DropoutRequest>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .requests
            .iter()
            .filter(|request| request.rm_user_id == *rm && request.stage() == stage)
            .cloned()
            .collect())
    }

    fn requests_for_am(
        &self,
        am: &UserId,
        stage: DropoutStage,
    ) -> Result<Vec<DropoutRequest>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .requests
            .iter()
            .filter(|request| request.am_user_id == *am && request.stage() == stage)
            .cloned()
            .collect())
    }

    fn requests_for_role(&self, role: &RoleId) -> Result<Vec<DropoutRequest>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .requests
            .iter()
            .filter(|request| request.role_id == *role)
            .cloned()
            .collect())
    }
}

impl TeamDirectory for InMemoryPipeline {
    fn user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.state()?.users.get(id).cloned())
    }

    fn recruitment_manager_for(&self, team: &TeamId) -> Result<Option<UserId>, RepositoryError> {
        Ok(self.state()?.team_managers.get(team).cloned())
    }
}

impl ActivityAggregator for InMemoryPipeline {
    fn recruiter(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<RecruiterAggregates, RepositoryError> {
        let state = self.state()?;
        let mut aggregates = RecruiterAggregates::default();
        let mut cv_matches = Vec::new();
        let mut worked = BTreeSet::new();

        for event in state
            .activity
            .iter()
            .filter(|event| event.recruiter == *user && within(range, event.at))
        {
            worked.insert(event.role.clone());
            match event.kind {
                ActivityKind::Submission { timing, cv_match } => {
                    match timing {
                        SubmissionTiming::Within6h => aggregates.submissions_6h += 1,
                        SubmissionTiming::Within24h => aggregates.submissions_24h += 1,
                        SubmissionTiming::After24h => aggregates.submissions_after_24h += 1,
                    }
                    cv_matches.push(cv_match);
                }
                ActivityKind::Interview { level: 1 } => aggregates.interviews_level1 += 1,
                ActivityKind::Interview { level: 2 } => aggregates.interviews_level2 += 1,
                ActivityKind::Interview { .. } => {}
                ActivityKind::Deal => aggregates.deals += 1,
            }
        }

        for association in state
            .associations
            .values()
            .filter(|association| association.recruiter_user_id == *user)
        {
            let Some(discarded_at) = association.discarded_at() else {
                continue;
            };
            if !within(range, discarded_at) {
                continue;
            }
            match association.discard_reason() {
                Some(DiscardReason::LostRole) => aggregates.lost_role_candidates += 1,
                Some(DiscardReason::GlobalDiscard | DiscardReason::Manual(_)) => {
                    aggregates.discarded_candidates += 1
                }
                // Closing a role as deal, on hold or cancelled carries no penalty.
                Some(DiscardReason::RoleClosed(_)) | None => {}
            }
        }

        aggregates.accepted_dropouts = count(
            state
                .requests
                .iter()
                .filter(|request| request.recruiter_user_id == *user)
                .filter(|request| accepted_within(request, range))
                .count(),
        );

        let assigned = state.assignments.get(user).cloned().unwrap_or_default();
        aggregates.assigned_roles = count(assigned.len());
        aggregates.actively_worked_roles = actively_worked_roles(&assigned, &worked);
        aggregates.average_quality = self.mean_quality(&cv_matches)?;
        Ok(aggregates)
    }

    fn account_manager(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<AccountManagerAggregates, RepositoryError> {
        let state = self.state()?;
        let mut aggregates = AccountManagerAggregates::default();
        let mut owned = BTreeSet::new();

        for role in state
            .roles
            .values()
            .filter(|role| role.account_manager_id == *user && within(range, role.created_at))
        {
            owned.insert(role.id.clone());
            aggregates.roles += 1;
            match role.status {
                RoleStatus::Active => aggregates.active_roles += 1,
                RoleStatus::Deal => aggregates.deals += 1,
                RoleStatus::Lost => aggregates.lost_roles += 1,
                RoleStatus::OnHold => aggregates.on_hold_roles += 1,
                RoleStatus::Cancelled => aggregates.cancelled_roles += 1,
                RoleStatus::NoAnswer => aggregates.no_answer_roles += 1,
                RoleStatus::Dropout => aggregates.dropout_roles += 1,
            }
        }

        for event in state
            .activity
            .iter()
            .filter(|event| owned.contains(&event.role) && within(range, event.at))
        {
            match event.kind {
                ActivityKind::Interview { level: 1 } => aggregates.interviews_level1 += 1,
                ActivityKind::Interview { level: 2 } => aggregates.interviews_level2 += 1,
                _ => {}
            }
        }

        Ok(aggregates)
    }

    fn recruitment_manager(
        &self,
        user: &UserId,
        range: Option<&DateRange>,
    ) -> Result<RecruitmentManagerAggregates, RepositoryError> {
        let state = self.state()?;
        let team = state
            .users
            .get(user)
            .ok_or(RepositoryError::NotFound)?
            .team_id
            .clone();
        let Some(team) = team else {
            return Ok(RecruitmentManagerAggregates::default());
        };

        let recruiters: BTreeSet<&UserId> = state
            .users
            .values()
            .filter(|profile| {
                profile.role == UserRole::Recruiter && profile.team_id.as_ref() == Some(&team)
            })
            .map(|profile| &profile.id)
            .collect();

        let mut aggregates = RecruitmentManagerAggregates::default();
        let mut cv_matches = Vec::new();
        for event in state
            .activity
            .iter()
            .filter(|event| recruiters.contains(&event.recruiter) && within(range, event.at))
        {
            match event.kind {
                ActivityKind::Submission { timing, cv_match } => {
                    match timing {
                        SubmissionTiming::Within6h => aggregates.submissions_6h += 1,
                        SubmissionTiming::Within24h => aggregates.submissions_24h += 1,
                        SubmissionTiming::After24h => aggregates.submissions_after_24h += 1,
                    }
                    cv_matches.push(cv_match);
                }
                ActivityKind::Interview { level: 1 } => aggregates.interviews_level1 += 1,
                ActivityKind::Interview { level: 2 } => aggregates.interviews_level2 += 1,
                ActivityKind::Interview { level: 3 } => aggregates.interviews_level3 += 1,
                ActivityKind::Interview { .. } => {}
                ActivityKind::Deal => aggregates.deals += 1,
            }
        }

        aggregates.dropouts = count(
            state
                .requests
                .iter()
                .filter(|request| request.rm_user_id == *user)
                .filter(|request| accepted_within(request, range))
                .count(),
        );

        for role in state
            .roles
            .values()
            .filter(|role| role.team_id == team && within(range, role.created_at))
        {
            aggregates.total_roles += 1;
            if role.status.is_active() {
                aggregates.active_roles += 1;
            }
        }

        aggregates.average_quality = self.mean_quality(&cv_matches)?;
        Ok(aggregates)
    }
}

impl EbesHistoryRepository for InMemoryPipeline {
    fn upsert(&self, snapshot: RmEbesHistory) -> Result<RmEbesHistory, RepositoryError> {
        let key = (snapshot.rm_user_id.clone(), snapshot.recorded_at);
        self.state()?.history.insert(key, snapshot.clone());
        Ok(snapshot)
    }

    fn history(&self, rm_user_id: &UserId) -> Result<Vec<RmEbesHistory>, RepositoryError> {
        let state = self.state()?;
        Ok(state
            .history
            .values()
            .filter(|snapshot| snapshot.rm_user_id == *rm_user_id)
            .cloned()
            .collect())
    }
}

/// Notification sink that only writes to the log.
#[derive(Default, Clone)]
pub(crate) struct TracingNotificationSink {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl TracingNotificationSink {
    pub(crate) fn delivered(&self) -> Vec<Notification> {
        self.delivered
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for TracingNotificationSink {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        info!(
            user = %notification.user_id,
            kind = ?notification.kind,
            title = %notification.title,
            "notification queued"
        );
        self.delivered
            .lock()
            .map_err(|_| NotificationError::Transport("notification log poisoned".to_string()))?
            .push(notification);
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pipeline_ebes::domain::ClientId;
    use pipeline_ebes::workflows::ledger::CandidateLedger;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 4, day, 10, 0, 0).unwrap()
    }

    fn pipeline() -> InMemoryPipeline {
        let pipeline = InMemoryPipeline::new(&WorkflowConfig::default());
        pipeline
            .add_user("rec-1", UserRole::Recruiter, Some("team-a"))
            .unwrap();
        pipeline
            .add_user("am-1", UserRole::AccountManager, Some("team-a"))
            .unwrap();
        pipeline
            .add_user("rm-1", UserRole::RecruitmentManager, Some("team-a"))
            .unwrap();
        for (id, status) in [("role-a", RoleStatus::Active), ("role-b", RoleStatus::Lost)] {
            let mut role = Role::open(
                RoleId::new(id),
                UserId::new("am-1"),
                TeamId::new("team-a"),
                ClientId::new("client-1"),
                at(1),
            );
            role.status = status;
            pipeline.insert_within_limit(role, 30).unwrap();
        }
        pipeline
    }

    #[test]
    fn submissions_below_floor_are_rejected() {
        let pipeline = pipeline();
        let result = pipeline.record_activity(ActivityEvent {
            recruiter: UserId::new("rec-1"),
            role: RoleId::new("role-a"),
            kind: ActivityKind::Submission {
                timing: SubmissionTiming::Within6h,
                cv_match: 70.0,
            },
            at: at(2),
        });
        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn recruiter_aggregates_follow_the_window() {
        let pipeline = pipeline();
        let recruiter = UserId::new("rec-1");
        pipeline.assign(&recruiter, &RoleId::new("role-a")).unwrap();
        for (day, timing, cv_match) in [
            (2, SubmissionTiming::Within6h, 96.0),
            (3, SubmissionTiming::Within24h, 90.0),
            (20, SubmissionTiming::After24h, 87.0),
        ] {
            pipeline
                .record_activity(ActivityEvent {
                    recruiter: recruiter.clone(),
                    role: RoleId::new(if day == 20 { "role-b" } else { "role-a" }),
                    kind: ActivityKind::Submission { timing, cv_match },
                    at: at(day),
                })
                .unwrap();
        }

        let all_time = pipeline.recruiter(&recruiter, None).unwrap();
        assert_eq!(all_time.submissions_6h, 1);
        assert_eq!(all_time.submissions_after_24h, 1);
        assert_eq!(all_time.assigned_roles, 1);
        assert_eq!(all_time.actively_worked_roles, 1);
        assert_eq!(all_time.average_quality, Some(91.0));

        let first_week = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 7).unwrap(),
        );
        let windowed = pipeline.recruiter(&recruiter, first_week.as_ref()).unwrap();
        assert_eq!(windowed.submissions_after_24h, 0);
        assert_eq!(windowed.actively_worked_roles, 0);
        assert_eq!(windowed.average_quality, Some(93.0));
    }

    #[test]
    fn closing_a_role_as_a_deal_costs_the_recruiter_nothing() {
        let pipeline = pipeline();
        let recruiter = UserId::new("rec-1");
        let role = RoleId::new("role-a");
        pipeline.assign(&recruiter, &role).unwrap();
        for candidate in ["cand-1", "cand-2"] {
            pipeline.add_candidate(candidate, "rec-1").unwrap();
            pipeline
                .engage(&CandidateId::new(candidate), &role, &recruiter, at(2))
                .unwrap();
        }
        pipeline
            .record_activity(ActivityEvent {
                recruiter: recruiter.clone(),
                role: role.clone(),
                kind: ActivityKind::Deal,
                at: at(3),
            })
            .unwrap();
        let before = pipeline_ebes::scoring::compute_recruiter_score(
            &pipeline.recruiter(&recruiter, None).unwrap(),
        );

        let ledger = CandidateLedger::new(Arc::new(pipeline.clone()));
        assert_eq!(ledger.apply_role_status(&role, RoleStatus::Deal).unwrap(), 2);

        let aggregates = pipeline.recruiter(&recruiter, None).unwrap();
        assert_eq!(aggregates.discarded_candidates, 0);
        assert_eq!(aggregates.lost_role_candidates, 0);
        let after = pipeline_ebes::scoring::compute_recruiter_score(&aggregates);
        assert_eq!(after.cap, 100.0);
        assert_eq!(after.score, before.score);
    }

    #[test]
    fn manual_and_lost_role_discards_are_counted_apart() {
        let pipeline = pipeline();
        let recruiter = UserId::new("rec-1");
        for (candidate, role) in [("cand-1", "role-a"), ("cand-2", "role-b")] {
            pipeline.add_candidate(candidate, "rec-1").unwrap();
            pipeline
                .engage(&CandidateId::new(candidate), &RoleId::new(role), &recruiter, at(2))
                .unwrap();
        }
        let ledger = CandidateLedger::new(Arc::new(pipeline.clone()));
        ledger
            .discard_association(&CandidateId::new("cand-1"), &RoleId::new("role-a"), None)
            .unwrap();
        ledger
            .apply_role_status(&RoleId::new("role-b"), RoleStatus::Lost)
            .unwrap();

        let aggregates = pipeline.recruiter(&recruiter, None).unwrap();
        assert_eq!(aggregates.discarded_candidates, 1);
        assert_eq!(aggregates.lost_role_candidates, 1);
    }

    #[test]
    fn account_manager_counts_roles_by_status() {
        let pipeline = pipeline();
        let aggregates = pipeline
            .account_manager(&UserId::new("am-1"), None)
            .unwrap();
        assert_eq!(aggregates.roles, 2);
        assert_eq!(aggregates.active_roles, 1);
        assert_eq!(aggregates.lost_roles, 1);
    }

    #[test]
    fn snapshots_upsert_by_manager_and_day() {
        let pipeline = pipeline();
        let rm = UserId::new("rm-1");
        let day = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        let result = pipeline_ebes::scoring::compute_recruitment_manager_score(
            &RecruitmentManagerAggregates::default(),
        );
        pipeline
            .upsert(RmEbesHistory::from_result(rm.clone(), day, &result))
            .unwrap();
        let mut replacement = RmEbesHistory::from_result(rm.clone(), day, &result);
        replacement.score = 42.0;
        pipeline.upsert(replacement).unwrap();

        let history = pipeline.history(&rm).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].score, 42.0);
    }
}
