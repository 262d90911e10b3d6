use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::config::WorkflowConfig;
use crate::domain::{
    Candidate, CandidateId, ClientId, DropoutRequestId, Role, RoleId, RoleStatus, TeamId, UserId,
    UserProfile, UserRole,
};
use crate::workflows::dropout::{DropoutRequest, DropoutStage, DropoutWorkflowService};
use crate::workflows::ledger::{CandidateLedger, CandidateRoleAssociation, DiscardReason};
use crate::workflows::repository::{
    AssociationRepository, DropoutRepository, Notification, NotificationError, NotificationSink,
    RepositoryError, RoleRepository, TeamDirectory,
};
use crate::workflows::roles::RoleService;

pub(super) const TEAM: &str = "team-1";
pub(super) const RECRUITER: &str = "rec-1";
pub(super) const OTHER_RECRUITER: &str = "rec-2";
pub(super) const ACCOUNT_MANAGER: &str = "am-1";
pub(super) const OTHER_ACCOUNT_MANAGER: &str = "am-2";
pub(super) const RECRUITMENT_MANAGER: &str = "rm-1";
pub(super) const OTHER_RECRUITMENT_MANAGER: &str = "rm-2";
pub(super) const ROLE: &str = "role-1";

pub(super) fn user(id: &str) -> UserId {
    UserId::new(id)
}

pub(super) fn role_id() -> RoleId {
    RoleId::new(ROLE)
}

pub(super) fn candidate(id: &str) -> CandidateId {
    CandidateId::new(id)
}

#[derive(Default)]
struct StoreState {
    users: BTreeMap<UserId, UserProfile>,
    team_managers: BTreeMap<TeamId, UserId>,
    roles: BTreeMap<RoleId, Role>,
    candidates: BTreeMap<CandidateId, Candidate>,
    associations: BTreeMap<(CandidateId, RoleId), CandidateRoleAssociation>,
    requests: Vec<DropoutRequest>,
}

/// Single in-memory store backing every repository seam plus the directory. Ledger reads can
/// be switched off to exercise post-commit failure handling, and a concurrent writer can be
/// slipped in right after the next request read.
#[derive(Default)]
pub(super) struct MemoryStore {
    state: Mutex<StoreState>,
    ledger_unavailable: AtomicBool,
    concurrent_write: Mutex<Option<DropoutRequest>>,
}

impl MemoryStore {
    pub(super) fn add_user(&self, id: &str, role: UserRole) {
        let profile = UserProfile {
            id: user(id),
            role,
            team_id: Some(TeamId::new(TEAM)),
        };
        self.state
            .lock()
            .unwrap()
            .users
            .insert(profile.id.clone(), profile);
    }

    pub(super) fn assign_manager(&self, team: &str, rm: &str) {
        self.state
            .lock()
            .unwrap()
            .team_managers
            .insert(TeamId::new(team), user(rm));
    }

    pub(super) fn add_role(&self, id: &str, am: &str, status: RoleStatus) {
        let mut role = Role::open(
            RoleId::new(id),
            user(am),
            TeamId::new(TEAM),
            ClientId::new("client-1"),
            Utc::now(),
        );
        role.status = status;
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(role.id.clone(), role);
    }

    pub(super) fn add_candidate(&self, id: &str, owner: &str) {
        let candidate = Candidate {
            id: candidate(id),
            owner_recruiter_id: user(owner),
            is_active: true,
        };
        self.state
            .lock()
            .unwrap()
            .candidates
            .insert(candidate.id.clone(), candidate);
    }

    pub(super) fn engage(&self, candidate_id: &str, role: &str, recruiter: &str) {
        let association = CandidateRoleAssociation::engaged(
            candidate(candidate_id),
            RoleId::new(role),
            user(recruiter),
            Utc::now(),
        );
        self.state.lock().unwrap().associations.insert(
            (association.candidate_id.clone(), association.role_id.clone()),
            association,
        );
    }

    pub(super) fn role(&self, id: &str) -> Role {
        self.state.lock().unwrap().roles[&RoleId::new(id)].clone()
    }

    pub(super) fn candidate_record(&self, id: &str) -> Candidate {
        self.state.lock().unwrap().candidates[&candidate(id)].clone()
    }

    pub(super) fn association(&self, candidate_id: &str, role: &str) -> CandidateRoleAssociation {
        self.state.lock().unwrap().associations[&(candidate(candidate_id), RoleId::new(role))]
            .clone()
    }

    pub(super) fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    pub(super) fn break_ledger(&self) {
        self.ledger_unavailable.store(true, Ordering::SeqCst);
    }

    pub(super) fn heal_ledger(&self) {
        self.ledger_unavailable.store(false, Ordering::SeqCst);
    }

    /// The next `fetch_request` returns the stored copy, then `concurrent` overwrites it
    /// before the caller gets to write.
    pub(super) fn overwrite_after_next_fetch(&self, concurrent: DropoutRequest) {
        *self.concurrent_write.lock().unwrap() = Some(concurrent);
    }

    fn ledger_guard(&self) -> Result<(), RepositoryError> {
        if self.ledger_unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("ledger offline".to_string()));
        }
        Ok(())
    }
}

impl RoleRepository for MemoryStore {
    fn fetch_role(&self, id: &RoleId) -> Result<Option<Role>, RepositoryError> {
        Ok(self.state.lock().unwrap().roles.get(id).cloned())
    }

    fn insert_within_limit(&self, role: Role, limit: usize) -> Result<Role, RepositoryError> {
        let mut state = self.state.lock().unwrap();
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
        let mut state = self.state.lock().unwrap();
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

impl AssociationRepository for MemoryStore {
    fn fetch_candidate(&self, id: &CandidateId) -> Result<Option<Candidate>, RepositoryError> {
        Ok(self.state.lock().unwrap().candidates.get(id).cloned())
    }

    fn set_candidate_active(
        &self,
        id: &CandidateId,
        active: bool,
    ) -> Result<Candidate, RepositoryError> {
        let mut state = self.state.lock().unwrap();
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
        let state = self.state.lock().unwrap();
        Ok(state
            .associations
            .get(&(candidate.clone(), role.clone()))
            .cloned())
    }

    fn associations_for_role(
        &self,
        role: &RoleId,
    ) -> Result<Vec<CandidateRoleAssociation>, RepositoryError> {
        self.ledger_guard()?;
        let state = self.state.lock().unwrap();
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
        self.ledger_guard()?;
        let state = self.state.lock().unwrap();
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
        let mut state = self.state.lock().unwrap();
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
        let mut state = self.state.lock().unwrap();
        let association = state
            .associations
            .get_mut(&(candidate.clone(), role.clone()))
            .ok_or(RepositoryError::NotFound)?;
        Ok(association.restore_if(reason, at))
    }
}

impl DropoutRepository for MemoryStore {
    fn open_request(&self, request: DropoutRequest) -> Result<DropoutRequest, RepositoryError> {
        let mut state = self.state.lock().unwrap();
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
        let mut state = self.state.lock().unwrap();
        let fetched = state.requests.iter().find(|stored| stored.id == *id).cloned();
        if let Some(concurrent) = self.concurrent_write.lock().unwrap().take() {
            if let Some(stored) = state
                .requests
                .iter_mut()
                .find(|stored| stored.id == concurrent.id)
            {
                *stored = concurrent;
            }
        }
        Ok(fetched)
    }

    fn transition(
        &self,
        expected: DropoutStage,
        request: DropoutRequest,
    ) -> Result<DropoutRequest, RepositoryError> {
        let mut state = self.state.lock().unwrap();
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
        let mut state = self.state.lock().unwrap();
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
        let role = state
            .roles
            .get_mut(&request.role_id)
            .ok_or(RepositoryError::NotFound)?;
        role.status = role_status;
        role.updated_at = Utc::now();
        let role = role.clone();
        state.requests[position] = request.clone();
        Ok((request, role))
    }

    fn requests_for_rm(
        &self,
        rm: &UserId,
        stage: DropoutStage,
    ) -> Result<Vec<DropoutRequest>, RepositoryError> {
        let state = self.state.lock().unwrap();
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
        let state = self.state.lock().unwrap();
        Ok(state
            .requests
            .iter()
            .filter(|request| request.am_user_id == *am && request.stage() == stage)
            .cloned()
            .collect())
    }

    fn requests_for_role(&self, role: &RoleId) -> Result<Vec<DropoutRequest>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .requests
            .iter()
            .filter(|request| request.role_id == *role)
            .cloned()
            .collect())
    }
}

impl TeamDirectory for MemoryStore {
    fn user(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.state.lock().unwrap().users.get(id).cloned())
    }

    fn recruitment_manager_for(&self, team: &TeamId) -> Result<Option<UserId>, RepositoryError> {
        Ok(self.state.lock().unwrap().team_managers.get(team).cloned())
    }
}

#[derive(Default)]
pub(super) struct MemoryNotifications {
    events: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    pub(super) fn events(&self) -> Vec<Notification> {
        self.events.lock().unwrap().clone()
    }
}

impl NotificationSink for MemoryNotifications {
    fn notify(&self, notification: Notification) -> Result<(), NotificationError> {
        self.events.lock().unwrap().push(notification);
        Ok(())
    }
}

pub(super) struct OfflineNotifications;

impl NotificationSink for OfflineNotifications {
    fn notify(&self, _notification: Notification) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("push gateway down".to_string()))
    }
}

/// Team with one recruitment manager, two recruiters, two account managers and an active
/// role worked by `rec-1` through two candidates.
pub(super) fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::default();
    store.add_user(RECRUITER, UserRole::Recruiter);
    store.add_user(OTHER_RECRUITER, UserRole::Recruiter);
    store.add_user(ACCOUNT_MANAGER, UserRole::AccountManager);
    store.add_user(OTHER_ACCOUNT_MANAGER, UserRole::AccountManager);
    store.add_user(RECRUITMENT_MANAGER, UserRole::RecruitmentManager);
    store.add_user(OTHER_RECRUITMENT_MANAGER, UserRole::RecruitmentManager);
    store.add_user("admin-1", UserRole::Admin);
    store.assign_manager(TEAM, RECRUITMENT_MANAGER);

    store.add_role(ROLE, ACCOUNT_MANAGER, RoleStatus::Active);
    store.add_candidate("cand-1", RECRUITER);
    store.add_candidate("cand-2", RECRUITER);
    store.engage("cand-1", ROLE, RECRUITER);
    store.engage("cand-2", ROLE, RECRUITER);
    Arc::new(store)
}

pub(super) type DropoutService =
    DropoutWorkflowService<MemoryStore, MemoryStore, MemoryNotifications>;

pub(super) fn build_dropout_service() -> (
    DropoutService,
    Arc<MemoryStore>,
    Arc<MemoryNotifications>,
) {
    let store = seeded_store();
    let notifications = Arc::new(MemoryNotifications::default());
    let service = DropoutWorkflowService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&notifications),
    );
    (service, store, notifications)
}

pub(super) fn build_role_service(
    limit: usize,
) -> (RoleService<MemoryStore, MemoryStore>, Arc<MemoryStore>) {
    let store = seeded_store();
    let config = WorkflowConfig {
        max_active_roles: limit,
        ..WorkflowConfig::default()
    };
    let service = RoleService::new(Arc::clone(&store), Arc::clone(&store), config);
    (service, store)
}

pub(super) fn build_ledger() -> (CandidateLedger<MemoryStore>, Arc<MemoryStore>) {
    let store = seeded_store();
    (CandidateLedger::new(Arc::clone(&store)), store)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
