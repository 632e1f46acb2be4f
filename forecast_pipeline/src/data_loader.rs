use crate::error::{PipelineError, PipelineResult};
use crate::models::{
    parse_number, parse_share, FeederColumn, IdentityColumns, LoadTable, PipelineConfig,
    SeasonColumn, SubstationRecord,
};
use crate::year_columns::YearColumnResolver;
use anyhow::{Context, Result};
use clap::ValueEnum;
use log::{debug, info};
use polars::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Csv,
    Parquet,
    Ipc,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Ipc => "arrow",
        }
    }
}

/// Strip embedded line breaks from a spreadsheet header and trim it.
pub fn clean_header(header: &str) -> String {
    header.replace(['\n', '\r'], "").trim().to_string()
}

fn clean_cell(cell: Option<&str>) -> Option<String> {
    cell.map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn compile(pattern: &str) -> PipelineResult<Regex> {
    Regex::new(pattern).map_err(|source| PipelineError::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

pub struct DataLoader {
    config: PipelineConfig,
    years: YearColumnResolver,
    feeder_pattern: Regex,
    seasonal_pattern: Regex,
}

impl DataLoader {
    pub fn new(config: &PipelineConfig) -> PipelineResult<Self> {
        Ok(Self {
            config: config.clone(),
            years: YearColumnResolver::new(),
            feeder_pattern: compile(&config.feeder_pattern)?,
            seasonal_pattern: compile(&config.seasonal_pattern)?,
        })
    }

    /// Load a sheet exported to CSV. Every column is read as text and parsed
    /// per column role afterwards, since feeder columns mix bus references and
    /// percentages.
    pub fn load_csv(&self, file_path: impl AsRef<Path>) -> Result<LoadTable> {
        let file_path = file_path.as_ref();
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
            .finish()
            .with_context(|| format!("reading {}", file_path.display()))?;

        info!(
            "Loaded {} rows x {} columns from {}",
            df.height(),
            df.width(),
            file_path.display()
        );
        Ok(self.from_dataframe(&df)?)
    }

    pub fn from_dataframe(&self, df: &DataFrame) -> PipelineResult<LoadTable> {
        let names = &self.config.columns;
        let headers: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|h| clean_header(h))
            .collect();

        let mut columns: Vec<Vec<Option<String>>> = Vec::with_capacity(df.width());
        for series in df.get_columns() {
            let text = series.cast(&DataType::String)?;
            columns.push(text.str()?.into_iter().map(clean_cell).collect());
        }

        let required = [&names.name, &names.gsp, &names.nrn, &names.voltage_ratio];
        for name in required {
            if !headers.iter().any(|h| h == name) {
                return Err(PipelineError::MissingColumn(name.clone()));
            }
        }

        // blank columns go, except the identity columns which must stay addressable
        let keep: Vec<usize> = (0..headers.len())
            .filter(|&c| {
                required.contains(&&headers[c]) || columns[c].iter().any(Option::is_some)
            })
            .collect();
        if keep.len() < headers.len() {
            debug!("Dropped {} blank columns", headers.len() - keep.len());
        }
        let headers: Vec<String> = keep.iter().map(|&c| headers[c].clone()).collect();
        let columns: Vec<Vec<Option<String>>> =
            keep.iter().map(|&c| std::mem::take(&mut columns[c])).collect();

        let position = |name: &str| headers.iter().position(|h| h == name);
        let identity = IdentityColumns {
            name: position(&names.name),
            gsp: position(&names.gsp),
            nrn: position(&names.nrn),
            voltage_ratio: position(&names.voltage_ratio),
        };
        let identity_positions = [identity.name, identity.gsp, identity.nrn, identity.voltage_ratio];

        let years = self.years.resolve(&headers);
        YearColumnResolver::validate_chronological(&years)?;

        let is_special = |c: usize| {
            identity_positions.contains(&Some(c)) || years.iter().any(|y| y.column == c)
        };
        let feeders: Vec<FeederColumn> = headers
            .iter()
            .enumerate()
            .filter(|(c, h)| !is_special(*c) && self.feeder_pattern.is_match(h))
            .map(|(column, h)| FeederColumn {
                column,
                name: h.clone(),
            })
            .collect();
        let seasons: Vec<SeasonColumn> = headers
            .iter()
            .enumerate()
            .filter(|(c, h)| {
                !is_special(*c)
                    && !feeders.iter().any(|f| f.column == *c)
                    && self.seasonal_pattern.is_match(h)
            })
            .map(|(column, h)| SeasonColumn {
                column,
                name: h.clone(),
            })
            .collect();

        // Build one record per non-blank row
        let height = df.height();
        let mut records = Vec::with_capacity(height);
        let mut blank_rows = 0;
        for row in 0..height {
            let cells: Vec<Option<String>> = columns.iter().map(|col| col[row].clone()).collect();
            if cells.iter().all(Option::is_none) {
                blank_rows += 1;
                continue;
            }

            let cell = |c: Option<usize>| c.and_then(|c| cells[c].clone());
            let mut record =
                SubstationRecord::new(records.len(), years.len(), feeders.len(), seasons.len());
            record.name = cell(identity.name);
            record.gsp_reference = cell(identity.gsp);
            record.network_reference_number = cell(identity.nrn);
            record.voltage_ratio = cell(identity.voltage_ratio);
            record.year_demand = years
                .iter()
                .map(|y| cells[y.column].as_deref().and_then(parse_number))
                .collect();
            record.feeder_refs = feeders.iter().map(|f| cells[f.column].clone()).collect();
            record.seasonal = seasons
                .iter()
                .map(|s| cells[s.column].as_deref().and_then(parse_share))
                .collect();
            record.cells = cells;
            records.push(record);
        }
        if blank_rows > 0 {
            debug!("Dropped {} blank rows", blank_rows);
        }

        info!(
            "Ingested {} rows: {} forecast years, {} feeder columns, {} seasonal columns",
            records.len(),
            years.len(),
            feeders.len(),
            seasons.len()
        );
        Ok(LoadTable::new(headers, identity, years, feeders, seasons, records))
    }
}

/// Build the output frame: the original columns with processed values, then
/// the derived columns.
pub fn to_dataframe(table: &LoadTable) -> PipelineResult<DataFrame> {
    let records = &table.records;
    let mut out: Vec<Series> = Vec::new();

    for (c, header) in table.columns.iter().enumerate() {
        let name = header.as_str();
        if let Some(y) = table.years.iter().position(|y| y.column == c) {
            let values: Vec<Option<f64>> = records.iter().map(|r| r.year_demand[y]).collect();
            out.push(Series::new(name, values));
        } else if let Some(s) = table.seasons.iter().position(|s| s.column == c) {
            let values: Vec<Option<f64>> = records.iter().map(|r| r.seasonal[s]).collect();
            out.push(Series::new(name, values));
        } else if table.identity.gsp == Some(c) {
            let values: Vec<Option<String>> =
                records.iter().map(|r| r.gsp_reference.clone()).collect();
            out.push(Series::new(name, values));
        } else {
            let values: Vec<Option<String>> = records
                .iter()
                .map(|r| r.cells.get(c).cloned().flatten())
                .collect();
            out.push(Series::new(name, values));
        }
    }

    let source_rows: Vec<u64> = records.iter().map(|r| r.source_row as u64).collect();
    out.push(Series::new("source_row", source_rows));
    let gsp_flags: Vec<bool> = records
        .iter()
        .map(|r| r.role == crate::models::Role::Gsp)
        .collect();
    out.push(Series::new("Sub_GSP", gsp_flags));
    let primary_flags: Vec<bool> = records
        .iter()
        .map(|r| r.role == crate::models::Role::Primary)
        .collect();
    out.push(Series::new("Sub_Primary", primary_flags));

    for (y, year) in table.years.iter().enumerate() {
        let values: Vec<Option<f64>> = records.iter().map(|r| r.year_aggregate[y]).collect();
        out.push(Series::new(&format!("aggregate_{}", year.label), values));
    }
    for (f, feeder) in table.feeders.iter().enumerate() {
        let values: Vec<Option<f64>> = records.iter().map(|r| r.feeder_share[f].value()).collect();
        out.push(Series::new(&format!("percentage_{}", feeder.name), values));
    }
    let sums: Vec<Option<f64>> = records.iter().map(|r| r.sum_percentages).collect();
    out.push(Series::new("sum_percentages", sums));
    let available: Vec<Option<u32>> = records
        .iter()
        .map(|r| r.available_years.map(|n| n as u32))
        .collect();
    out.push(Series::new("available_years", available));
    let forecasted: Vec<Option<bool>> = records.iter().map(|r| r.year_forecasted).collect();
    out.push(Series::new("year_forecasted", forecasted));
    for (y, year) in table.years.iter().enumerate() {
        let values: Vec<Option<f64>> = records.iter().map(|r| r.year_estimate[y]).collect();
        out.push(Series::new(&format!("estimate_{}", year.label), values));
    }
    let factors: Vec<Option<f64>> = records.iter().map(|r| r.diversity_factor).collect();
    out.push(Series::new("diverse_factor", factors));

    Ok(DataFrame::new(out)?)
}

pub fn write_table(df: &mut DataFrame, path: impl AsRef<Path>, format: OutputFormat) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    match format {
        OutputFormat::Csv => {
            CsvWriter::new(file).include_header(true).finish(df)?;
        }
        OutputFormat::Parquet => {
            ParquetWriter::new(file).finish(df)?;
        }
        OutputFormat::Ipc => {
            IpcWriter::new(file).finish(df)?;
        }
    }
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}
