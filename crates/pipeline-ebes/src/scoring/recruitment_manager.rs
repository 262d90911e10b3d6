use super::aggregates::RecruitmentManagerAggregates;
use super::policy::{
    base_cap, clamp_to_cap, quality_bonus, ratio_percentage, round_one_decimal, ScoreLabel,
    FULL_CAP,
};
use super::rules::Tally;
use super::{ScoreFactor, ScoreResult, ScoreTable};

/// Recruitment manager EBES over team-aggregated counts. Level-2 interviews weigh 1.5 here
/// (2 for recruiters) and level-3 interviews carry no weight.
pub fn compute_recruitment_manager_score(input: &RecruitmentManagerAggregates) -> ScoreResult {
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
        1.5,
    );
    tally.credit(ScoreTable::Performance, ScoreFactor::Deals, input.deals, 7.0);
    tally.penalty(ScoreFactor::Dropouts, input.dropouts, 5.0, None);

    tally.credit(
        ScoreTable::Engagement,
        ScoreFactor::TotalRoles,
        input.total_roles,
        3.0,
    );
    tally.credit(
        ScoreTable::Engagement,
        ScoreFactor::ActiveRoles,
        input.active_roles,
        1.0,
    );

    let cap = base_cap(input.dropouts > 0);
    let raw = ratio_percentage(tally.table1, tally.table2);
    let score = round_one_decimal(clamp_to_cap(raw, cap));

    ScoreResult {
        score,
        label: ScoreLabel::standard(score),
        table1_points: tally.table1,
        table2_points: tally.table2,
        cap,
        quality_bonus: 0.0,
        components: tally.components,
    }
}

/// Layers the CV-quality bonus on top of a computed score and relabels it. The bonus uses the
/// recruiter bands and the result never exceeds 100.
pub fn apply_quality_bonus(mut result: ScoreResult, average_quality: Option<f64>) -> ScoreResult {
    let bonus = quality_bonus(average_quality);
    if bonus == 0.0 {
        return result;
    }

    result.quality_bonus = bonus;
    result.cap = (result.cap + bonus).min(FULL_CAP);
    result.score = round_one_decimal((result.score + bonus).min(result.cap));
    result.label = ScoreLabel::standard(result.score);
    result
}
