use crate::error::{PipelineResult, RowIssue};
use crate::models::{LoadTable, Role, Stage, SubstationRecord};
use log::{debug, info};

/// Decide the role of a single row.
///
/// * GSP: no name, a GSP reference and a voltage ratio.
/// * Primary: a name, no GSP reference and a network reference number.
///
/// The two rules disagree on `name`, so at most one can hold.
pub fn classify_record(record: &SubstationRecord) -> Role {
    let is_gsp = record.name.is_none()
        && record.gsp_reference.is_some()
        && record.voltage_ratio.is_some();
    let is_primary = record.name.is_some()
        && record.gsp_reference.is_none()
        && record.network_reference_number.is_some();

    if is_gsp {
        Role::Gsp
    } else if is_primary {
        Role::Primary
    } else {
        Role::Unclassified
    }
}

pub fn classify_rows(table: &mut LoadTable) -> PipelineResult<Vec<RowIssue>> {
    table.require(Stage::Classify)?;

    let mut issues = Vec::new();
    for record in table.records.iter_mut() {
        record.role = classify_record(record);

        if record.name.is_some() && record.gsp_reference.is_some() {
            issues.push(RowIssue::AmbiguousClassification {
                source_row: record.source_row,
            });
        }
        debug!("row {} classified {}", record.source_row, record.role);
    }

    table.mark(Stage::Classify);
    info!(
        "Classified {} rows: {} GSP, {} Primary, {} unclassified",
        table.len(),
        table.count_role(Role::Gsp),
        table.count_role(Role::Primary),
        table.count_role(Role::Unclassified)
    );
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn test_gsp_rule() {
        let row = record(0, None, Some("A"), None, Some("132/33"));
        assert_eq!(classify_record(&row), Role::Gsp);

        // voltage ratio is required
        let row = record(0, None, Some("A"), None, None);
        assert_eq!(classify_record(&row), Role::Unclassified);
    }

    #[test]
    fn test_primary_rule() {
        let row = record(0, Some("P1"), None, Some("NRN-1"), None);
        assert_eq!(classify_record(&row), Role::Primary);

        // network reference number is required
        let row = record(0, Some("P1"), None, None, None);
        assert_eq!(classify_record(&row), Role::Unclassified);
    }

    #[test]
    fn test_every_row_gets_exactly_one_role() {
        let mut table = table_of(vec![
            record(0, None, Some("A"), None, Some("132/33")),
            record(1, None, None, None, None),
            record(2, Some("P1"), None, Some("NRN-1"), None),
            record(3, Some("P2"), Some("A"), Some("NRN-2"), Some("33/11")),
        ]);

        let issues = classify_rows(&mut table).unwrap();
        let roles: Vec<_> = table.records.iter().map(|r| r.role).collect();
        assert_eq!(
            roles,
            vec![Role::Gsp, Role::Unclassified, Role::Primary, Role::Unclassified]
        );
        assert_eq!(issues, vec![RowIssue::AmbiguousClassification { source_row: 3 }]);
        assert!(table.has_completed(Stage::Classify));
    }
}
