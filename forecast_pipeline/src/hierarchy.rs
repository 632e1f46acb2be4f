use crate::error::{PipelineResult, RowIssue};
use crate::models::{LoadTable, Role, Stage, SubstationRecord};
use log::{info, warn};

/// Forward fill a field down the table, taking values only from source rows.
///
/// Every row for which `is_source` is false has the field cleared first, so a
/// stale value on a child row can never leak into the fill. Running it twice
/// gives the same result as running it once.
pub fn gated_forward_fill<T, S, F>(records: &mut [SubstationRecord], is_source: S, mut field: F)
where
    T: Clone,
    S: Fn(&SubstationRecord) -> bool,
    F: FnMut(&mut SubstationRecord) -> &mut Option<T>,
{
    let mut carried: Option<T> = None;
    for record in records.iter_mut() {
        if is_source(record) {
            carried = field(record).clone();
        } else {
            *field(record) = carried.clone();
        }
    }
}

/// Give each Primary the reference of the nearest GSP above it.
pub fn resolve_hierarchy(table: &mut LoadTable) -> PipelineResult<Vec<RowIssue>> {
    table.require(Stage::Hierarchy)?;

    gated_forward_fill(
        &mut table.records,
        |r| r.role == Role::Gsp,
        |r| &mut r.gsp_reference,
    );

    // Primaries above the first GSP
    let issues: Vec<RowIssue> = table
        .records
        .iter()
        .filter(|r| r.role == Role::Primary && r.gsp_reference.is_none())
        .map(|r| RowIssue::UnresolvedHierarchy {
            source_row: r.source_row,
            name: r.name.clone(),
        })
        .collect();
    for issue in &issues {
        warn!("{}", issue);
    }

    table.mark(Stage::Hierarchy);
    info!(
        "Resolved GSP for {} primaries ({} unresolved)",
        table.count_role(Role::Primary) - issues.len(),
        issues.len()
    );
    Ok(issues)
}
