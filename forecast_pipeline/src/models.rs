use crate::error::{PipelineError, PipelineResult, ShapeMismatch};
use crate::year_columns::ForecastYear;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub name: String,
    pub gsp: String,
    pub nrn: String,
    pub voltage_ratio: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            name: "Name".to_string(),
            gsp: "GSP".to_string(),
            nrn: "NRN".to_string(),
            voltage_ratio: "Voltage Ratio".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Impute missing shares, years and seasonal values instead of leaving them blank.
    pub fill: bool,
    pub columns: ColumnNames,
    pub feeder_pattern: String,
    pub seasonal_pattern: String,
    pub seasonal_percentile: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fill: false,
            columns: ColumnNames::default(),
            feeder_pattern: r"(?i)bus".to_string(),
            seasonal_pattern: r"(?i)^(winter|spring|summer|autumn)".to_string(),
            seasonal_percentile: 50,
        }
    }
}

impl PipelineConfig {
    pub fn fill() -> Self {
        Self {
            fill: true,
            ..Self::default()
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if config.seasonal_percentile > 100 {
            return Err(PipelineError::Percentile(config.seasonal_percentile).into());
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Gsp,
    Primary,
    #[default]
    Unclassified,
}

impl Role {
    pub fn is_classified(self) -> bool {
        !matches!(self, Role::Unclassified)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Gsp => write!(f, "GSP"),
            Role::Primary => write!(f, "Primary"),
            Role::Unclassified => write!(f, "Unclassified"),
        }
    }
}

/// Pipeline stages, in the order the full run executes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Classify,
    Pair,
    Aggregate,
    Hierarchy,
    BusShare,
    Filter,
    Estimate,
    Diversity,
    Seasonal,
}

impl Stage {
    pub fn prerequisites(self) -> &'static [Stage] {
        match self {
            Stage::Classify => &[],
            Stage::Pair => &[Stage::Classify],
            Stage::Aggregate => &[Stage::Pair],
            Stage::Hierarchy => &[Stage::Classify],
            Stage::BusShare => &[Stage::Pair],
            // donor rows are dropped here, so every consumer of the pairing must be done
            Stage::Filter => &[Stage::Aggregate, Stage::BusShare],
            Stage::Estimate => &[Stage::Filter],
            Stage::Diversity => &[Stage::Aggregate, Stage::Hierarchy, Stage::Filter],
            Stage::Seasonal => &[Stage::Classify],
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Classify => "classify",
            Stage::Pair => "pair",
            Stage::Aggregate => "aggregate",
            Stage::Hierarchy => "hierarchy",
            Stage::BusShare => "bus share",
            Stage::Filter => "filter",
            Stage::Estimate => "estimate",
            Stage::Diversity => "diversity",
            Stage::Seasonal => "seasonal",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub enum FeederShare {
    /// No bus reference on this row for the feeder.
    #[default]
    Unassigned,
    Known(f64),
    Missing,
    /// Redistributed from the mass left over by the known shares.
    Filled(f64),
}

impl FeederShare {
    pub fn value(self) -> Option<f64> {
        match self {
            FeederShare::Known(v) | FeederShare::Filled(v) => Some(v),
            FeederShare::Unassigned | FeederShare::Missing => None,
        }
    }
}

/// Snapshot of the raw data row that belongs to a GSP or Primary row.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub source_row: usize,
    pub year_demand: Vec<Option<f64>>,
    pub feeder_shares: Vec<Option<f64>>,
}

/// Positions of the identity columns, when present in the sheet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityColumns {
    pub name: Option<usize>,
    pub gsp: Option<usize>,
    pub nrn: Option<usize>,
    pub voltage_ratio: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct FeederColumn {
    pub column: usize,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SeasonColumn {
    pub column: usize,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct SubstationRecord {
    pub source_row: usize,
    /// Raw cell text for every column, used for pass-through on export.
    pub cells: Vec<Option<String>>,

    pub name: Option<String>,
    pub gsp_reference: Option<String>,
    pub network_reference_number: Option<String>,
    pub voltage_ratio: Option<String>,
    pub role: Role,
    pub detail: Result<DetailRow, ShapeMismatch>,

    pub year_demand: Vec<Option<f64>>,
    pub year_aggregate: Vec<Option<f64>>,
    pub year_estimate: Vec<Option<f64>>,

    pub feeder_refs: Vec<Option<String>>,
    pub feeder_share: Vec<FeederShare>,
    pub sum_percentages: Option<f64>,

    pub seasonal: Vec<Option<f64>>,

    pub available_years: Option<usize>,
    pub year_forecasted: Option<bool>,
    pub diversity_factor: Option<f64>,
}

impl SubstationRecord {
    pub fn new(source_row: usize, years: usize, feeders: usize, seasons: usize) -> Self {
        Self {
            source_row,
            cells: Vec::new(),
            name: None,
            gsp_reference: None,
            network_reference_number: None,
            voltage_ratio: None,
            role: Role::Unclassified,
            detail: Err(ShapeMismatch::NotPaired),
            year_demand: vec![None; years],
            year_aggregate: vec![None; years],
            year_estimate: vec![None; years],
            feeder_refs: vec![None; feeders],
            feeder_share: vec![FeederShare::Unassigned; feeders],
            sum_percentages: None,
            seasonal: vec![None; seasons],
            available_years: None,
            year_forecasted: None,
            diversity_factor: None,
        }
    }

    pub fn populated_years(&self) -> usize {
        self.year_demand.iter().filter(|v| v.is_some()).count()
    }

    pub fn missing_shares(&self) -> usize {
        self.feeder_share
            .iter()
            .filter(|s| matches!(s, FeederShare::Missing))
            .count()
    }
}

/// An ingested load-estimate sheet: schema plus records in ingestion order.
#[derive(Debug, Clone)]
pub struct LoadTable {
    pub columns: Vec<String>,
    pub identity: IdentityColumns,
    pub years: Vec<ForecastYear>,
    pub feeders: Vec<FeederColumn>,
    pub seasons: Vec<SeasonColumn>,
    pub records: Vec<SubstationRecord>,
    completed: Vec<Stage>,
}

impl LoadTable {
    pub fn new(
        columns: Vec<String>,
        identity: IdentityColumns,
        years: Vec<ForecastYear>,
        feeders: Vec<FeederColumn>,
        seasons: Vec<SeasonColumn>,
        records: Vec<SubstationRecord>,
    ) -> Self {
        Self {
            columns,
            identity,
            years,
            feeders,
            seasons,
            records,
            completed: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_completed(&self, stage: Stage) -> bool {
        self.completed.contains(&stage)
    }

    pub fn require(&self, stage: Stage) -> PipelineResult<()> {
        for requires in stage.prerequisites() {
            if !self.has_completed(*requires) {
                return Err(PipelineError::StageOrder {
                    stage,
                    requires: *requires,
                });
            }
        }
        Ok(())
    }

    pub(crate) fn mark(&mut self, stage: Stage) {
        if !self.completed.contains(&stage) {
            self.completed.push(stage);
        }
    }

    pub fn record(&self, source_row: usize) -> Option<&SubstationRecord> {
        self.records.iter().find(|r| r.source_row == source_row)
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.records.iter().filter(|r| r.role == role).count()
    }

    /// Copy of the table restricted to the given source rows, order preserved.
    pub fn subset(&self, source_rows: &BTreeSet<usize>) -> LoadTable {
        LoadTable {
            columns: self.columns.clone(),
            identity: self.identity,
            years: self.years.clone(),
            feeders: self.feeders.clone(),
            seasons: self.seasons.clone(),
            records: self
                .records
                .iter()
                .filter(|r| source_rows.contains(&r.source_row))
                .cloned()
                .collect(),
            completed: self.completed.clone(),
        }
    }
}

/// Parse a numeric cell, tolerating thousands separators.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned = cell.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a fractional share, accepting either `0.45` or `45%`.
pub fn parse_share(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    match trimmed.strip_suffix('%') {
        Some(percent) => parse_number(percent).map(|v| v / 100.0),
        None => parse_number(trimmed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_share_accepts_percent_suffix() {
        assert_relative_eq!(parse_share("45%").unwrap(), 0.45);
        assert_relative_eq!(parse_share(" 0.3 ").unwrap(), 0.3);
        assert_eq!(parse_share(""), None);
        assert_eq!(parse_share("n/a"), None);
    }

    #[test]
    fn test_parse_number_strips_thousands_separator() {
        assert_relative_eq!(parse_number("1,250.5").unwrap(), 1250.5);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_stage_order_is_checked() {
        let mut table = LoadTable::new(vec![], IdentityColumns::default(), vec![], vec![], vec![], vec![]);
        let err = table.require(Stage::Filter).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::StageOrder {
                stage: Stage::Filter,
                requires: Stage::Aggregate
            }
        ));

        table.mark(Stage::Aggregate);
        table.mark(Stage::BusShare);
        assert!(table.require(Stage::Filter).is_ok());
    }

    #[test]
    fn test_config_defaults_round_trip_through_json() {
        let config = PipelineConfig::fill();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert!(parsed.fill);
        assert_eq!(parsed.columns.voltage_ratio, "Voltage Ratio");

        let partial: PipelineConfig = serde_json::from_str(r#"{"fill": true}"#).unwrap();
        assert_eq!(partial.seasonal_percentile, 50);
    }
}
