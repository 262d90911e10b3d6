use super::common::*;
use crate::domain::{ClientId, RoleStatus, TeamId};
use crate::error::ValidationError;
use crate::workflows::roles::OpenRoleRequest;
use crate::workflows::WorkflowError;

fn open_request(am: &str) -> OpenRoleRequest {
    OpenRoleRequest {
        account_manager_id: user(am),
        team_id: TeamId::new(TEAM),
        client_id: ClientId::new("client-7"),
    }
}

#[test]
fn open_role_enforces_the_active_limit_per_account_manager() {
    // The seeded store already holds one active role for am-1.
    let (service, _) = build_role_service(3);

    let first = service
        .open_role(&user(ACCOUNT_MANAGER), open_request(ACCOUNT_MANAGER))
        .expect("second role fits");
    assert_eq!(first.status, RoleStatus::Active);
    assert!(first.id.as_str().starts_with("role-"));
    service
        .open_role(&user(ACCOUNT_MANAGER), open_request(ACCOUNT_MANAGER))
        .expect("third role fits");

    let overflow = service.open_role(&user(ACCOUNT_MANAGER), open_request(ACCOUNT_MANAGER));
    assert!(matches!(
        overflow,
        Err(WorkflowError::CapacityExceeded { limit: 3, .. })
    ));

    service
        .open_role(&user(RECRUITMENT_MANAGER), open_request(OTHER_ACCOUNT_MANAGER))
        .expect("limit is tracked per account manager");
}

#[test]
fn closed_roles_free_capacity() {
    let (service, _) = build_role_service(1);
    assert!(matches!(
        service.open_role(&user(ACCOUNT_MANAGER), open_request(ACCOUNT_MANAGER)),
        Err(WorkflowError::CapacityExceeded { .. })
    ));

    service
        .change_status(&user(ACCOUNT_MANAGER), &role_id(), RoleStatus::OnHold)
        .expect("hold existing role");
    service
        .open_role(&user(ACCOUNT_MANAGER), open_request(ACCOUNT_MANAGER))
        .expect("capacity freed");
}

#[test]
fn open_role_checks_actor_and_owner() {
    let (service, _) = build_role_service(30);
    assert!(matches!(
        service.open_role(&user(RECRUITER), open_request(ACCOUNT_MANAGER)),
        Err(WorkflowError::Forbidden { .. })
    ));
    assert!(matches!(
        service.open_role(&user(ACCOUNT_MANAGER), open_request(RECRUITER)),
        Err(WorkflowError::Validation(ValidationError::NotAnAccountManager(_)))
    ));
    assert!(matches!(
        service.open_role(&user("nobody"), open_request(ACCOUNT_MANAGER)),
        Err(WorkflowError::NotFound { .. })
    ));
}

#[test]
fn status_change_applies_ledger_transition() {
    let (service, store) = build_role_service(30);

    let change = service
        .change_status(&user(ACCOUNT_MANAGER), &role_id(), RoleStatus::Cancelled)
        .expect("cancelled");
    assert_eq!(change.previous_status, RoleStatus::Active);
    assert_eq!(change.role.status, RoleStatus::Cancelled);
    assert_eq!(change.discarded_associations, 2);
    assert_eq!(
        store.association("cand-2", ROLE).discarded_reason().as_deref(),
        Some("Role marked as cancelled")
    );

    let repeat = service
        .change_status(&user(ACCOUNT_MANAGER), &role_id(), RoleStatus::Cancelled)
        .expect("same status converges");
    assert_eq!(repeat.discarded_associations, 0);
}

#[test]
fn dropout_status_is_reserved_for_the_workflow() {
    let (service, store) = build_role_service(30);
    assert!(matches!(
        service.change_status(&user(ACCOUNT_MANAGER), &role_id(), RoleStatus::Dropout),
        Err(WorkflowError::Validation(ValidationError::ReservedStatus(
            RoleStatus::Dropout
        )))
    ));

    store.add_role("role-waiting", ACCOUNT_MANAGER, RoleStatus::Dropout);
    assert!(matches!(
        service.change_status(
            &user(ACCOUNT_MANAGER),
            &crate::domain::RoleId::new("role-waiting"),
            RoleStatus::Lost
        ),
        Err(WorkflowError::InvalidStateTransition(_))
    ));
}

#[test]
fn only_owner_or_managers_change_status() {
    let (service, store) = build_role_service(30);
    assert!(matches!(
        service.change_status(&user(OTHER_ACCOUNT_MANAGER), &role_id(), RoleStatus::Deal),
        Err(WorkflowError::Forbidden { .. })
    ));
    assert!(matches!(
        service.change_status(&user(RECRUITER), &role_id(), RoleStatus::Deal),
        Err(WorkflowError::Forbidden { .. })
    ));
    assert_eq!(store.role(ROLE).status, RoleStatus::Active);

    service
        .change_status(&user("admin-1"), &role_id(), RoleStatus::Deal)
        .expect("admin may change status");
    assert_eq!(store.role(ROLE).status, RoleStatus::Deal);
}
