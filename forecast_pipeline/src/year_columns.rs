use crate::error::{PipelineError, PipelineResult};
use regex::Regex;
use serde::Serialize;

/// A `YYYY/YYYY` forecast-year column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastYear {
    /// Position of the column in the ingested table.
    pub column: usize,
    pub label: String,
    pub start: u16,
    pub end: u16,
}

pub struct YearColumnResolver {
    pattern: Regex,
}

impl YearColumnResolver {
    pub fn new() -> Self {
        // anchored at the start only, so "2019/2020 (MVA)" still counts
        let pattern = Regex::new(r"^(\d{4})\s*/\s*(\d{4})").expect("year pattern is a valid regex");
        Self { pattern }
    }

    /// Pick out the forecast-year columns, keeping their original order.
    pub fn resolve<S: AsRef<str>>(&self, headers: &[S]) -> Vec<ForecastYear> {
        headers
            .iter()
            .enumerate()
            .filter_map(|(column, header)| {
                let header = header.as_ref();
                let caps = self.pattern.captures(header)?;
                let start = caps.get(1)?.as_str().parse().ok()?;
                let end = caps.get(2)?.as_str().parse().ok()?;
                Some(ForecastYear {
                    column,
                    label: header.to_string(),
                    start,
                    end,
                })
            })
            .collect()
    }

    /// The estimator and diversity calculator treat the first year as the
    /// earliest, so start years must be strictly ascending.
    pub fn validate_chronological(years: &[ForecastYear]) -> PipelineResult<()> {
        for pair in years.windows(2) {
            if pair[1].start <= pair[0].start {
                return Err(PipelineError::YearsOutOfOrder {
                    previous: pair[0].label.clone(),
                    next: pair[1].label.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for YearColumnResolver {
    fn default() -> Self {
        Self::new()
    }
}
