use super::aggregates::RecruiterAggregates;
use super::policy::{
    base_cap, clamp_to_cap, quality_bonus, ratio_percentage, round_one_decimal, ScoreLabel,
    FULL_CAP,
};
use super::rules::Tally;
use super::{ScoreFactor, ScoreResult, ScoreTable};

const ACCEPTED_DROPOUT_PENALTY_CAP: f64 = 20.0;
const DISCARD_PENALTY_CAP: f64 = 10.0;
const LOST_ROLE_PENALTY_CAP: f64 = 10.0;

/// Recruiter EBES: Table 1 over `max(Table 2, 1)`, capped at 95 after any negative event,
/// with the CV-quality bonus lifting the cap back toward 100.
pub fn compute_recruiter_score(input: &RecruiterAggregates) -> ScoreResult {
    let mut tally = Tally::default();

    tally.credit(
        ScoreTable::Performance,
        ScoreFactor::Submissions6h,
        input.submissions_6h,
        2.0,
    );
    tally.credit(
        ScoreTable::Performance,
        ScoreFactor::Submissions24h,
        input.submissions_24h,
        1.5,
    );
    tally.credit(
        ScoreTable::Performance,
        ScoreFactor::SubmissionsAfter24h,
        input.submissions_after_24h,
        1.0,
    );
    tally.credit(
        ScoreTable::Performance,
        ScoreFactor::InterviewsLevel1,
        input.interviews_level1,
        3.0,
    );
    tally.credit(
        ScoreTable::Performance,
        ScoreFactor::InterviewsLevel2,
        input.interviews_level2,
        2.0,
    );
    tally.credit(ScoreTable::Performance, ScoreFactor::Deals, input.deals, 7.0);

    tally.penalty(
        ScoreFactor::AcceptedDropouts,
        input.accepted_dropouts,
        5.0,
        Some(ACCEPTED_DROPOUT_PENALTY_CAP),
    );
    tally.penalty(
        ScoreFactor::DiscardedCandidates,
        input.discarded_candidates,
        1.0,
        Some(DISCARD_PENALTY_CAP),
    );
    tally.penalty(
        ScoreFactor::LostRoleCandidates,
        input.lost_role_candidates,
        1.0,
        Some(LOST_ROLE_PENALTY_CAP),
    );

    tally.credit(
        ScoreTable::Engagement,
        ScoreFactor::AssignedRoles,
        input.assigned_roles,
        3.0,
    );
    tally.credit(
        ScoreTable::Engagement,
        ScoreFactor::ActivelyWorkedRoles,
        input.actively_worked_roles,
        2.0,
    );

    let negative_event = input.accepted_dropouts > 0
        || input.discarded_candidates > 0
        || input.lost_role_candidates > 0;
    let bonus = quality_bonus(input.average_quality);
    let cap = (base_cap(negative_event) + bonus).min(FULL_CAP);

    let raw = ratio_percentage(tally.table1, tally.table2);
    let score = round_one_decimal(clamp_to_cap(raw, cap));

    ScoreResult {
        score,
        label: ScoreLabel::standard(score),
        table1_points: tally.table1,
        table2_points: tally.table2,
        cap,
        quality_bonus: bonus,
        components: tally.components,
    }
}
