use crate::infra::{
    ActivityEvent, ActivityKind, InMemoryPipeline, SubmissionTiming, TracingNotificationSink,
};
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use pipeline_ebes::config::WorkflowConfig;
use pipeline_ebes::domain::{CandidateId, ClientId, RoleStatus, TeamId, UserId, UserRole};
use pipeline_ebes::error::AppError;
use pipeline_ebes::scoring::{RmEbesHistory, ScoreResult, ScoringService};
use pipeline_ebes::workflows::dropout::{AmDecision, DropoutDecision, DropoutWorkflowService};
use pipeline_ebes::workflows::repository::{Notification, RepositoryError};
use pipeline_ebes::workflows::roles::{OpenRoleRequest, RoleService};
use pipeline_ebes::workflows::WorkflowError;
use std::sync::Arc;

const TEAM: &str = "team-north";
const RECRUITER: &str = "rec-ana";
const ACCOUNT_MANAGER: &str = "am-ben";
const RECRUITMENT_MANAGER: &str = "rm-cleo";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Why the candidate dropped out
    #[arg(long, default_value = "Candidate accepted a counter offer")]
    pub(crate) reason: String,
    /// Account manager decision (accept or ignore)
    #[arg(long, default_value = "accept", value_parser = parse_decision)]
    pub(crate) decision: AmDecision,
    /// Status the role moves to after the decision. Leaving it out or passing `dropout`
    /// reopens the role as active.
    #[arg(long, value_parser = parse_role_status)]
    pub(crate) new_status: Option<RoleStatus>,
    /// Day the recruitment manager snapshot is recorded for (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) snapshot_day: Option<NaiveDate>,
}

impl Default for DemoArgs {
    fn default() -> Self {
        Self {
            reason: "Candidate accepted a counter offer".to_string(),
            decision: AmDecision::Accept,
            new_status: None,
            snapshot_day: None,
        }
    }
}

fn parse_decision(raw: &str) -> Result<AmDecision, String> {
    raw.parse::<AmDecision>().map_err(|err| err.to_string())
}

fn parse_role_status(raw: &str) -> Result<RoleStatus, String> {
    raw.parse::<RoleStatus>().map_err(|err| err.to_string())
}

pub(crate) struct DemoOutcome {
    pub(crate) decision: DropoutDecision,
    pub(crate) notifications: Vec<Notification>,
    pub(crate) recruiter: ScoreResult,
    pub(crate) account_manager: ScoreResult,
    pub(crate) snapshot: RmEbesHistory,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Pipeline EBES demo");
    let outcome = walk_dropout(&args)?;
    render(&outcome);
    Ok(())
}

fn seed(store: &InMemoryPipeline) -> Result<(), RepositoryError> {
    store.add_user(RECRUITER, UserRole::Recruiter, Some(TEAM))?;
    store.add_user(ACCOUNT_MANAGER, UserRole::AccountManager, Some(TEAM))?;
    store.add_user(RECRUITMENT_MANAGER, UserRole::RecruitmentManager, Some(TEAM))?;
    store.assign_manager(TEAM, RECRUITMENT_MANAGER)?;
    for candidate in ["cand-ivy", "cand-jon", "cand-kai"] {
        store.add_candidate(candidate, RECRUITER)?;
    }
    Ok(())
}

pub(crate) fn walk_dropout(args: &DemoArgs) -> Result<DemoOutcome, AppError> {
    let config = WorkflowConfig::default();
    let store = Arc::new(InMemoryPipeline::new(&config));
    let notifications = Arc::new(TracingNotificationSink::default());
    seed(&store).map_err(WorkflowError::from)?;

    let roles = RoleService::new(Arc::clone(&store), Arc::clone(&store), config);
    let dropouts = DropoutWorkflowService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::clone(&notifications),
    );
    let scoring = ScoringService::new(Arc::clone(&store), Arc::clone(&store));

    let recruiter = UserId::new(RECRUITER);
    let account_manager = UserId::new(ACCOUNT_MANAGER);
    let recruitment_manager = UserId::new(RECRUITMENT_MANAGER);

    let mut opened = Vec::new();
    for client in ["client-acme", "client-globex"] {
        let role = roles.open_role(
            &account_manager,
            OpenRoleRequest {
                account_manager_id: account_manager.clone(),
                team_id: TeamId::new(TEAM),
                client_id: ClientId::new(client),
            },
        )?;
        store.assign(&recruiter, &role.id).map_err(WorkflowError::from)?;
        opened.push(role);
    }
    let (primary, secondary) = match opened.as_slice() {
        [primary, secondary] => (primary.id.clone(), secondary.id.clone()),
        _ => return Err(AppError::Input("demo roles were not opened".to_string())),
    };
    println!("Opened roles {primary} and {secondary} for {account_manager}");

    let now = Utc::now();
    for candidate in ["cand-ivy", "cand-jon"] {
        store
            .engage(&CandidateId::new(candidate), &primary, &recruiter, now)
            .map_err(WorkflowError::from)?;
    }
    store
        .engage(&CandidateId::new("cand-kai"), &secondary, &recruiter, now)
        .map_err(WorkflowError::from)?;

    let submission = |timing, cv_match| ActivityKind::Submission { timing, cv_match };
    let activity = [
        (&primary, submission(SubmissionTiming::Within6h, 92.0)),
        (&primary, submission(SubmissionTiming::Within24h, 88.0)),
        (&secondary, submission(SubmissionTiming::Within6h, 97.0)),
        (&primary, ActivityKind::Interview { level: 1 }),
        (&secondary, ActivityKind::Interview { level: 2 }),
    ];
    for (offset, (role, kind)) in activity.into_iter().enumerate() {
        let hours = i64::try_from(offset).unwrap_or(0) + 1;
        store.record_activity(ActivityEvent {
            recruiter: recruiter.clone(),
            role: role.clone(),
            kind,
            at: now - Duration::hours(hours),
        })?;
    }

    let request = dropouts.record(&primary, &recruiter, &args.reason)?;
    println!("Recorded {} on {} ({})", request.id, primary, request.reason);

    let acknowledged = dropouts.acknowledge(
        &request.id,
        &recruitment_manager,
        Some("Confirmed with the candidate".to_string()),
    )?;
    println!(
        "{} acknowledged {} at stage {}",
        recruitment_manager,
        acknowledged.id,
        acknowledged.stage().label()
    );

    let decision = dropouts.decide(
        &request.id,
        &account_manager,
        args.decision,
        args.new_status,
    )?;

    let recruiter_score = scoring
        .recruiter_score(&recruiter, None)
        .map_err(WorkflowError::from)?;
    let account_manager_score = scoring
        .account_manager_score(&account_manager, None)
        .map_err(WorkflowError::from)?;
    let day = args.snapshot_day.unwrap_or_else(|| now.date_naive());
    let snapshot = scoring
        .record_daily_snapshot(&recruitment_manager, day, None)
        .map_err(WorkflowError::from)?;

    Ok(DemoOutcome {
        decision,
        notifications: notifications.delivered(),
        recruiter: recruiter_score,
        account_manager: account_manager_score,
        snapshot,
    })
}

fn render(outcome: &DemoOutcome) {
    let DropoutDecision {
        request,
        role,
        discarded_associations,
    } = &outcome.decision;
    let decision = request.decision().map_or("none", AmDecision::label);
    println!(
        "Decision '{}' completed {}; role {} is now {} ({} associations discarded)",
        decision, request.id, role.id, role.status, discarded_associations
    );

    println!("\nNotifications");
    for notification in &outcome.notifications {
        println!("- {} -> {}", notification.title, notification.user_id);
    }

    println!("\nScores");
    print_score("Recruiter", RECRUITER, &outcome.recruiter);
    print_score("Account manager", ACCOUNT_MANAGER, &outcome.account_manager);
    println!(
        "- Recruitment manager {}: {:.1} ({}) snapshot for {}",
        outcome.snapshot.rm_user_id,
        outcome.snapshot.score,
        outcome.snapshot.label.label(),
        outcome.snapshot.recorded_at
    );
}

fn print_score(title: &str, person: &str, result: &ScoreResult) {
    println!(
        "- {title} {person}: {:.1} ({}) | table 1 {:.1} | table 2 {:.1} | cap {:.0}",
        result.score,
        result.label.label(),
        result.table1_points,
        result.table2_points,
        result.cap
    );
    for component in result.components.iter().filter(|component| component.points != 0.0) {
        println!("    {:?}: {:+.1} {}", component.factor, component.points, component.notes);
    }
}
