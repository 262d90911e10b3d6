use serde::{Deserialize, Serialize};

pub(crate) const FULL_CAP: f64 = 100.0;
pub(crate) const PENALIZED_CAP: f64 = 95.0;

/// Performance band shown next to a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreLabel {
    Excellent,
    Strong,
    Average,
    #[serde(rename = "At Risk")]
    AtRisk,
}

impl ScoreLabel {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreLabel::Excellent => "Excellent",
            ScoreLabel::Strong => "Strong",
            ScoreLabel::Average => "Average",
            ScoreLabel::AtRisk => "At Risk",
        }
    }

    /// Bands used by the recruiter and recruitment manager formulas.
    pub fn standard(score: f64) -> Self {
        if score >= 90.0 {
            ScoreLabel::Excellent
        } else if score >= 75.0 {
            ScoreLabel::Strong
        } else if score >= 60.0 {
            ScoreLabel::Average
        } else {
            ScoreLabel::AtRisk
        }
    }

    /// Account manager bands. Kept on their own scale even though a capped score rarely
    /// reaches the top band.
    pub fn account_manager(score: f64) -> Self {
        if score >= 100.0 {
            ScoreLabel::Excellent
        } else if score >= 50.0 {
            ScoreLabel::Strong
        } else if score < 20.0 {
            ScoreLabel::AtRisk
        } else {
            ScoreLabel::Average
        }
    }
}

/// Bonus points for the average CV-match percentage of the scored submissions.
pub fn quality_bonus(average_quality: Option<f64>) -> f64 {
    match average_quality.filter(|pct| pct.is_finite()) {
        Some(pct) if pct >= 98.0 => 5.0,
        Some(pct) if pct >= 95.0 => 4.0,
        Some(pct) if pct >= 90.0 => 2.0,
        _ => 0.0,
    }
}

pub(crate) fn base_cap(negative_event: bool) -> f64 {
    if negative_event {
        PENALIZED_CAP
    } else {
        FULL_CAP
    }
}

pub(crate) fn ratio_percentage(table1: f64, table2: f64) -> f64 {
    table1 / table2.max(1.0) * 100.0
}

pub(crate) fn clamp_to_cap(raw: f64, cap: f64) -> f64 {
    if raw.is_finite() {
        raw.clamp(0.0, cap)
    } else {
        0.0
    }
}

pub(crate) fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
