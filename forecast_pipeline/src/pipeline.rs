use crate::aggregate::extract_aggregate_demand;
use crate::bus_share::allocate_bus_shares;
use crate::classifier::classify_rows;
use crate::diversity::apply_diversity_factors;
use crate::error::{PipelineError, PipelineResult, RowIssue};
use crate::estimator::estimate_missing_years;
use crate::hierarchy::resolve_hierarchy;
use crate::models::{LoadTable, PipelineConfig, Stage};
use crate::pairing::pair_detail_rows;
use crate::quality::QualityReport;
use crate::seasonal::{fill_seasonal, SeasonalPercentiles};
use log::info;

/// Everything a run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub table: LoadTable,
    pub issues: Vec<RowIssue>,
    pub seasonal: SeasonalPercentiles,
    pub quality: QualityReport,
    pub rows_in: usize,
}

/// Drop every row that is neither a GSP nor a Primary.
pub fn retain_classified(table: &mut LoadTable) -> PipelineResult<usize> {
    table.require(Stage::Filter)?;

    let before = table.len();
    table.records.retain(|r| r.role.is_classified());
    let dropped = before - table.len();

    table.mark(Stage::Filter);
    info!("Dropped {} unclassified rows, {} remain", dropped, table.len());
    Ok(dropped)
}

pub struct LoadForecastPipeline {
    config: PipelineConfig,
}

impl LoadForecastPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order. Row-level problems end up in
    /// [`PipelineOutput::issues`]; only schema problems return an error.
    pub fn run(&self, mut table: LoadTable) -> PipelineResult<PipelineOutput> {
        let fill = self.config.fill;
        if self.config.seasonal_percentile > 100 {
            return Err(PipelineError::Percentile(self.config.seasonal_percentile));
        }
        let rows_in = table.len();
        info!("Running load forecast pipeline on {} rows (fill: {})", rows_in, fill);

        // Classify rows and link each one to its data row
        let mut issues = classify_rows(&mut table)?;
        pair_detail_rows(&mut table)?;

        // Stages that read the data rows
        issues.extend(extract_aggregate_demand(&mut table)?);
        issues.extend(resolve_hierarchy(&mut table)?);
        issues.extend(allocate_bus_shares(&mut table, fill)?);

        // Data rows are no longer needed
        retain_classified(&mut table)?;

        // Fill forecast gaps, then rediversify
        issues.extend(estimate_missing_years(&mut table, fill)?);
        issues.extend(apply_diversity_factors(&mut table)?);

        // Seasonal percentiles
        let seasonal = SeasonalPercentiles::compute(&table, self.config.seasonal_percentile)?;
        fill_seasonal(&mut table, &seasonal, fill)?;

        // Partition rows into good and bad
        let quality = QualityReport::assess(&table, &issues);
        info!(
            "Pipeline finished: {} rows kept, {} good, {} bad, {} issues",
            table.len(),
            quality.good_rows.len(),
            quality.bad_rows.len(),
            quality.total_issues()
        );

        Ok(PipelineOutput {
            table,
            issues,
            seasonal,
            quality,
            rows_in,
        })
    }
}
