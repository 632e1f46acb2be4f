use crate::error::{PipelineError, PipelineResult};
use crate::models::{LoadTable, Stage};
use log::info;
use serde::Serialize;
use statrs::statistics::{Data, OrderStatistics};

/// Per-season percentile of the supplied seasonal load values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonalPercentiles {
    pub percentile: usize,
    /// One entry per seasonal column, `None` when the column has no values.
    pub values: Vec<(String, Option<f64>)>,
}

impl SeasonalPercentiles {
    /// Computed over GSP and Primary rows only.
    pub fn compute(table: &LoadTable, percentile: usize) -> PipelineResult<Self> {
        if percentile > 100 {
            return Err(PipelineError::Percentile(percentile));
        }

        let values = table
            .seasons
            .iter()
            .enumerate()
            .map(|(i, season)| {
                let known: Vec<f64> = table
                    .records
                    .iter()
                    .filter(|r| r.role.is_classified())
                    .filter_map(|r| r.seasonal.get(i).copied().flatten())
                    .collect();
                let value = if known.is_empty() {
                    None
                } else {
                    Some(Data::new(known).percentile(percentile))
                };
                (season.name.clone(), value)
            })
            .collect();

        Ok(Self { percentile, values })
    }

    pub fn get(&self, season: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == season)
            .and_then(|(_, value)| *value)
    }
}

/// Fill blank seasonal cells of classified rows from `percentiles`.
/// Returns the number of cells filled; without `fill` nothing changes.
pub fn fill_seasonal(
    table: &mut LoadTable,
    percentiles: &SeasonalPercentiles,
    fill: bool,
) -> PipelineResult<usize> {
    table.require(Stage::Seasonal)?;

    let mut filled = 0;
    if fill {
        for record in table.records.iter_mut().filter(|r| r.role.is_classified()) {
            for (cell, (_, value)) in record.seasonal.iter_mut().zip(&percentiles.values) {
                if cell.is_none() && value.is_some() {
                    *cell = *value;
                    filled += 1;
                }
            }
        }
    }

    table.mark(Stage::Seasonal);
    info!(
        "Seasonal {}th percentiles: {:?} ({} cells filled)",
        percentiles.percentile, percentiles.values, filled
    );
    Ok(filled)
}
