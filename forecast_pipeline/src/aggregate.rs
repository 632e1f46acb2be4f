use crate::error::{PipelineResult, RowIssue};
use crate::models::{LoadTable, Role, Stage};
use log::{info, warn};

/// Copy each GSP's aggregate demand from its paired data row.
pub fn extract_aggregate_demand(table: &mut LoadTable) -> PipelineResult<Vec<RowIssue>> {
    table.require(Stage::Aggregate)?;

    let mut issues = Vec::new();
    let mut extracted = 0;

    for record in table.records.iter_mut().filter(|r| r.role == Role::Gsp) {
        match &record.detail {
            Ok(detail) => {
                record.year_aggregate = detail.year_demand.clone();
                extracted += 1;
            }
            Err(reason) => {
                let issue = RowIssue::ShapeMismatch {
                    source_row: record.source_row,
                    stage: Stage::Aggregate,
                    reason: *reason,
                };
                warn!("{}", issue);
                issues.push(issue);
            }
        }
    }

    table.mark(Stage::Aggregate);
    info!("Extracted aggregate demand for {} GSPs", extracted);
    Ok(issues)
}
