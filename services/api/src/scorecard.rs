//! Batch scoring of aggregate rows exported as CSV.
//!
//! Every row carries a `person` column plus the aggregate columns of the chosen role type;
//! columns that are absent default to zero.

use clap::{Args, ValueEnum};
use pipeline_ebes::error::AppError;
use pipeline_ebes::scoring::{
    apply_quality_bonus, compute_account_manager_score, compute_recruiter_score,
    compute_recruitment_manager_score, AccountManagerAggregates, RecruiterAggregates,
    RecruitmentManagerAggregates, ScoreResult,
};
use pipeline_ebes::error::ValidationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

const PERSON_COLUMN: &str = "person";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ScoreKind {
    Recruiter,
    AccountManager,
    RecruitmentManager,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Role type whose formula scores the rows
    #[arg(value_enum)]
    pub(crate) kind: ScoreKind,
    /// CSV file with a `person` column and one aggregate column per count
    #[arg(long)]
    pub(crate) input: PathBuf,
}

#[derive(Debug)]
pub(crate) enum ScorecardError {
    Io(std::io::Error),
    Csv(csv::Error),
    InvalidRow { row: usize, source: ValidationError },
}

impl fmt::Display for ScorecardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScorecardError::Io(err) => write!(f, "failed to read scorecard input: {err}"),
            ScorecardError::Csv(err) => write!(f, "failed to parse scorecard row: {err}"),
            ScorecardError::InvalidRow { row, source } => {
                write!(f, "scorecard row {row} is invalid: {source}")
            }
        }
    }
}

impl std::error::Error for ScorecardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScorecardError::Io(err) => Some(err),
            ScorecardError::Csv(err) => Some(err),
            ScorecardError::InvalidRow { source, .. } => Some(source),
        }
    }
}

impl From<std::io::Error> for ScorecardError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ScorecardError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<ScorecardError> for AppError {
    fn from(err: ScorecardError) -> Self {
        match err {
            ScorecardError::Io(io) => AppError::Io(io),
            other => AppError::Input(other.to_string()),
        }
    }
}

/// One scored row of the input file.
#[derive(Debug, Serialize)]
pub(crate) struct ScoredRow {
    pub(crate) person: String,
    #[serde(flatten)]
    pub(crate) result: ScoreResult,
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let file = File::open(&args.input)?;
    let rows = score_reader(args.kind, file)?;
    let rendered =
        serde_json::to_string_pretty(&rows).map_err(|err| AppError::Input(err.to_string()))?;
    println!("{rendered}");
    Ok(())
}

pub(crate) fn score_reader<R: Read>(
    kind: ScoreKind,
    reader: R,
) -> Result<Vec<ScoredRow>, ScorecardError> {
    match kind {
        ScoreKind::Recruiter => score_rows(reader, |input: &RecruiterAggregates| {
            input.validate()?;
            Ok(compute_recruiter_score(input))
        }),
        ScoreKind::AccountManager => score_rows(reader, |input: &AccountManagerAggregates| {
            Ok(compute_account_manager_score(input))
        }),
        ScoreKind::RecruitmentManager => {
            score_rows(reader, |input: &RecruitmentManagerAggregates| {
                input.validate()?;
                Ok(apply_quality_bonus(
                    compute_recruitment_manager_score(input),
                    input.average_quality,
                ))
            })
        }
    }
}

fn score_rows<R, T, F>(reader: R, score: F) -> Result<Vec<ScoredRow>, ScorecardError>
where
    R: Read,
    T: DeserializeOwned,
    F: Fn(&T) -> Result<ScoreResult, ValidationError>,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let person_index = headers
        .iter()
        .position(|header| header.eq_ignore_ascii_case(PERSON_COLUMN));

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let input: T = record.deserialize(Some(&headers))?;
        let person = person_index
            .and_then(|position| record.get(position))
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row-{}", index + 1));
        let result = score(&input).map_err(|source| ScorecardError::InvalidRow {
            row: index + 1,
            source,
        })?;
        rows.push(ScoredRow { person, result });
    }
    Ok(rows)
}
