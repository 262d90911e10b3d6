use super::aggregates::AccountManagerAggregates;
use super::policy::{base_cap, clamp_to_cap, round_one_decimal, ScoreLabel};
use super::rules::Tally;
use super::{ScoreFactor, ScoreResult, ScoreTable};

/// Fixed divisor for the account manager formula.
pub const AM_MAX_EXPECTED_POINTS: f64 = 60.0;

const OVERLOAD_ACTIVE_ROLES: u32 = 15;
const OVERLOAD_PENALTY: f64 = 20.0;

/// Account manager EBES: one combined point total over a fixed 60-point expectation.
pub fn compute_account_manager_score(input: &AccountManagerAggregates) -> ScoreResult {
    let mut tally = Tally::default();

    tally.credit(ScoreTable::Performance, ScoreFactor::Roles, input.roles, 2.0);
    tally.credit(
        ScoreTable::Performance,
        ScoreFactor::InterviewsLevel1,
        input.interviews_level1,
        2.0,
    );
    tally.credit(
        ScoreTable::Performance,
        ScoreFactor::InterviewsLevel2,
        input.interviews_level2,
        2.0,
    );
    tally.credit(ScoreTable::Performance, ScoreFactor::Deals, input.deals, 12.0);

    tally.penalty(ScoreFactor::LostRoles, input.lost_roles, 12.0, None);
    tally.penalty(ScoreFactor::NoAnswerRoles, input.no_answer_roles, 10.0, None);
    tally.penalty(ScoreFactor::CancelledRoles, input.cancelled_roles, 10.0, None);
    tally.penalty(ScoreFactor::OnHoldRoles, input.on_hold_roles, 0.5, None);
    tally.penalty(ScoreFactor::DropoutRoles, input.dropout_roles, 5.0, None);

    if input.active_roles > OVERLOAD_ACTIVE_ROLES && input.deals == 0 {
        tally.flat(
            ScoreFactor::OverloadedWithoutDeals,
            -OVERLOAD_PENALTY,
            format!("{} active roles without a deal", input.active_roles),
        );
    }

    let negative_event = input.dropout_roles > 0
        || input.lost_roles > 0
        || input.no_answer_roles > 0
        || input.cancelled_roles > 0;
    let cap = base_cap(negative_event);

    let raw = tally.table1 / AM_MAX_EXPECTED_POINTS * 100.0;
    let score = round_one_decimal(clamp_to_cap(raw, cap));

    ScoreResult {
        score,
        label: ScoreLabel::account_manager(score),
        table1_points: tally.table1,
        table2_points: AM_MAX_EXPECTED_POINTS,
        cap,
        quality_bonus: 0.0,
        components: tally.components,
    }
}
