use crate::error::{PipelineResult, RowIssue};
use crate::models::{LoadTable, Stage};
use interp::{interp, InterpMode};
use log::{debug, info};

/// Estimate missing forecast years for rows with partial coverage.
///
/// Only rows with more than one but fewer than all years populated are
/// touched. Gaps are filled by piecewise-linear interpolation over the year
/// index, extrapolating past either end along the nearest segment. Estimated values are written into the demand series and kept in
/// `year_estimate` so they stay distinguishable from supplied ones.
pub fn estimate_missing_years(table: &mut LoadTable, fill: bool) -> PipelineResult<Vec<RowIssue>> {
    table.require(Stage::Estimate)?;

    let total_years = table.years.len();
    let mut issues = Vec::new();
    let mut partial = 0;
    let mut estimated = 0;

    for record in table.records.iter_mut() {
        let available = record.populated_years();
        record.available_years = Some(available);

        let has_partial_forecast = available > 1 && available < total_years;
        record.year_forecasted = Some(has_partial_forecast);

        if available == 0 && total_years > 0 {
            issues.push(RowIssue::NoForecastData {
                source_row: record.source_row,
            });
        }
        if !has_partial_forecast {
            continue;
        }
        partial += 1;
        if !fill {
            continue;
        }

        // Control points: (year index, demand)
        let (xs, ys): (Vec<f64>, Vec<f64>) = record
            .year_demand
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as f64, v)))
            .unzip();

        // Estimate each blank year from the populated control points
        for (i, value) in record.year_demand.iter_mut().enumerate() {
            if value.is_some() {
                continue;
            }
            let estimate = interp(&xs, &ys, i as f64, &InterpMode::Extrapolate);
            *value = Some(estimate);
            record.year_estimate[i] = Some(estimate);
            estimated += 1;
        }
        debug!("row {}: estimated missing years from {} points", record.source_row, xs.len());
    }

    table.mark(Stage::Estimate);
    info!(
        "{} rows have a partial forecast, {} year values estimated",
        partial, estimated
    );
    Ok(issues)
}
