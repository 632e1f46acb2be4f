use crate::models::{Role, Stage};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Schema-level failures that stop a pipeline run.
///
/// Problems confined to a single row never surface here; they are collected as
/// [`RowIssue`]s and the run carries on with the remaining rows.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("required column '{0}' not found in table")]
    MissingColumn(String),

    #[error("forecast year columns are not in ascending order: '{previous}' is followed by '{next}'")]
    YearsOutOfOrder { previous: String, next: String },

    #[error("stage {stage} requires {requires} to have run first")]
    StageOrder { stage: Stage, requires: Stage },

    #[error("invalid column pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("percentile {0} is outside 0..=100")]
    Percentile(usize),

    #[error(transparent)]
    Polars(#[from] polars::error::PolarsError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Why a classified row could not be linked to the data row below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShapeMismatch {
    /// Pairing has not run for this record yet.
    NotPaired,
    /// The row is the last one in the table.
    NoRowBelow,
    /// The row below is itself a GSP or Primary row.
    NotADataRow { role: Role },
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeMismatch::NotPaired => write!(f, "row has not been paired"),
            ShapeMismatch::NoRowBelow => write!(f, "no row below"),
            ShapeMismatch::NotADataRow { role } => {
                write!(f, "row below is classified {} rather than a data row", role)
            }
        }
    }
}

/// A data problem found in one row. Reported, never fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RowIssue {
    ShapeMismatch {
        source_row: usize,
        stage: Stage,
        reason: ShapeMismatch,
    },
    UnresolvedHierarchy {
        source_row: usize,
        name: Option<String>,
    },
    AmbiguousClassification {
        source_row: usize,
    },
    MissingAggregate {
        source_row: usize,
        gsp: Option<String>,
    },
    NoForecastData {
        source_row: usize,
    },
    UnfilledShares {
        source_row: usize,
        missing: usize,
    },
}

impl RowIssue {
    pub fn source_row(&self) -> usize {
        match self {
            RowIssue::ShapeMismatch { source_row, .. }
            | RowIssue::UnresolvedHierarchy { source_row, .. }
            | RowIssue::AmbiguousClassification { source_row }
            | RowIssue::MissingAggregate { source_row, .. }
            | RowIssue::NoForecastData { source_row }
            | RowIssue::UnfilledShares { source_row, .. } => *source_row,
        }
    }

    /// Short label used when counting issues by kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RowIssue::ShapeMismatch { .. } => "shape_mismatch",
            RowIssue::UnresolvedHierarchy { .. } => "unresolved_hierarchy",
            RowIssue::AmbiguousClassification { .. } => "ambiguous_classification",
            RowIssue::MissingAggregate { .. } => "missing_aggregate",
            RowIssue::NoForecastData { .. } => "no_forecast_data",
            RowIssue::UnfilledShares { .. } => "unfilled_shares",
        }
    }
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowIssue::ShapeMismatch {
                source_row,
                stage,
                reason,
            } => write!(f, "row {}: {} lookup failed, {}", source_row, stage, reason),
            RowIssue::UnresolvedHierarchy { source_row, name } => write!(
                f,
                "row {}: primary '{}' has no preceding GSP",
                source_row,
                name.as_deref().unwrap_or("<unnamed>")
            ),
            RowIssue::AmbiguousClassification { source_row } => write!(
                f,
                "row {}: carries both a name and a GSP reference",
                source_row
            ),
            RowIssue::MissingAggregate { source_row, gsp } => write!(
                f,
                "row {}: GSP '{}' has no usable first-year aggregate, diversity factor set to 1",
                source_row,
                gsp.as_deref().unwrap_or("<unknown>")
            ),
            RowIssue::NoForecastData { source_row } => {
                write!(f, "row {}: no forecast year populated", source_row)
            }
            RowIssue::UnfilledShares {
                source_row,
                missing,
            } => write!(
                f,
                "row {}: {} feeder share(s) missing and not redistributed",
                source_row, missing
            ),
        }
    }
}
