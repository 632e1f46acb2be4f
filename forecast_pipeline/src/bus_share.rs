use crate::error::{PipelineResult, RowIssue};
use crate::models::{FeederShare, LoadTable, Stage};
use log::{debug, info, warn};

/// Allocate feeder percentage shares for every GSP and Primary row.
///
/// A feeder counts for a row when the row holds a bus reference in that
/// feeder's column; its share is read from the paired data row. With `fill`
/// set, the mass left by the known shares, `1 - sum`, is split equally over
/// the missing feeders of that row. The remainder is used as computed, so a
/// row whose known shares already exceed 1 gets negative fills.
pub fn allocate_bus_shares(table: &mut LoadTable, fill: bool) -> PipelineResult<Vec<RowIssue>> {
    table.require(Stage::BusShare)?;

    let mut issues = Vec::new();
    let mut filled_rows = 0;

    for record in table.records.iter_mut().filter(|r| r.role.is_classified()) {
        if record.feeder_refs.iter().all(Option::is_none) {
            continue;
        }

        let detail = match &record.detail {
            Ok(detail) => detail,
            Err(reason) => {
                let issue = RowIssue::ShapeMismatch {
                    source_row: record.source_row,
                    stage: Stage::BusShare,
                    reason: *reason,
                };
                warn!("{}", issue);
                issues.push(issue);
                continue;
            }
        };

        // Read the share of every referenced feeder
        let mut sum = 0.0;
        for (feeder, reference) in record.feeder_refs.iter().enumerate() {
            if reference.is_none() {
                continue;
            }
            record.feeder_share[feeder] = match detail.feeder_shares.get(feeder).copied().flatten() {
                Some(share) => {
                    sum += share;
                    FeederShare::Known(share)
                }
                None => FeederShare::Missing,
            };
        }
        record.sum_percentages = Some(sum);

        let missing = record.missing_shares();
        if missing == 0 {
            continue;
        }
        // Redistribute the remaining mass
        if fill {
            let each = (1.0 - sum) / missing as f64;
            for share in record.feeder_share.iter_mut() {
                if matches!(share, FeederShare::Missing) {
                    *share = FeederShare::Filled(each);
                }
            }
            debug!(
                "row {}: spread {:.4} over {} missing feeder(s)",
                record.source_row,
                1.0 - sum,
                missing
            );
            filled_rows += 1;
        } else {
            issues.push(RowIssue::UnfilledShares {
                source_row: record.source_row,
                missing,
            });
        }
    }

    table.mark(Stage::BusShare);
    info!(
        "Allocated feeder shares across {} feeders ({} rows redistributed)",
        table.feeders.len(),
        filled_rows
    );
    Ok(issues)
}
