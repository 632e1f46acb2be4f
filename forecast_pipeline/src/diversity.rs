use crate::error::{PipelineResult, RowIssue};
use crate::hierarchy::gated_forward_fill;
use crate::models::{LoadTable, Role, Stage, SubstationRecord};
use log::{debug, info, warn};

/// Ratio of first-year diversified to aggregate demand for a GSP, at most 1.
///
/// Falls back to 1 when the diversified peak is absent or not positive. The
/// second value is false when the aggregate could not support a positive ratio.
pub fn diversity_factor(record: &SubstationRecord) -> (f64, bool) {
    let diversified = match record.year_demand.first().copied().flatten() {
        Some(d) if d > 0.0 => d,
        _ => return (1.0, true),
    };
    match record.year_aggregate.first().copied().flatten() {
        Some(aggregate) if aggregate > 0.0 => {
            // a ratio that underflows to zero cannot scale anything
            let ratio = diversified / aggregate;
            if ratio > 0.0 {
                (ratio.min(1.0), true)
            } else {
                (1.0, false)
            }
        }
        _ => (1.0, false),
    }
}

/// Compute GSP diversity factors, hand them down to each GSP's primaries and
/// rebuild the primaries' diversified demand from their own figures.
pub fn apply_diversity_factors(table: &mut LoadTable) -> PipelineResult<Vec<RowIssue>> {
    table.require(Stage::Diversity)?;

    // Calculate the factor on each GSP
    let mut issues = Vec::new();
    for record in table.records.iter_mut().filter(|r| r.role == Role::Gsp) {
        let (factor, supported) = diversity_factor(record);
        if !supported {
            let issue = RowIssue::MissingAggregate {
                source_row: record.source_row,
                gsp: record.gsp_reference.clone(),
            };
            warn!("{}", issue);
            issues.push(issue);
        }
        debug!("GSP row {}: diversity factor {:.4}", record.source_row, factor);
        record.diversity_factor = Some(factor);
    }

    // Hand it down to the primaries
    gated_forward_fill(
        &mut table.records,
        |r| r.role == Role::Gsp,
        |r| &mut r.diversity_factor,
    );

    // Move each non-GSP figure to aggregate, then rediversify it. Without an
    // inherited factor the diversified value stays blank.
    let mut rebuilt = 0;
    let mut unscaled = 0;
    for record in table.records.iter_mut().filter(|r| r.role != Role::Gsp) {
        let factor = record.diversity_factor;
        for (demand, aggregate) in record.year_demand.iter_mut().zip(record.year_aggregate.iter_mut()) {
            *aggregate = *demand;
            *demand = aggregate.zip(factor).map(|(a, f)| a * f);
        }
        if factor.is_some() {
            rebuilt += 1;
        } else {
            debug!("row {}: no diversity factor, diversified demand left blank", record.source_row);
            unscaled += 1;
        }
    }

    table.mark(Stage::Diversity);
    info!(
        "Applied diversity factors from {} GSPs to {} rows ({} without a factor)",
        table.count_role(Role::Gsp),
        rebuilt,
        unscaled
    );
    Ok(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;
    use approx::assert_relative_eq;

    fn ready(records: Vec<SubstationRecord>) -> LoadTable {
        let mut table = table_of(records);
        for record in table.records.iter_mut() {
            record.role = if record.voltage_ratio.is_some() {
                Role::Gsp
            } else {
                Role::Primary
            };
        }
        table.mark(Stage::Aggregate);
        table.mark(Stage::Hierarchy);
        table.mark(Stage::Filter);
        table
    }

    fn with_aggregate(mut record: SubstationRecord, aggregate: [Option<f64>; 3]) -> SubstationRecord {
        record.year_aggregate = aggregate.to_vec();
        record
    }

    #[test]
    fn test_factor_is_ratio_of_first_year() {
        let row = with_aggregate(
            gsp(0, "A").with_demand([Some(80.0), Some(85.0), None]),
            [Some(100.0), Some(100.0), None],
        );
        let (factor, supported) = diversity_factor(&row);
        assert_relative_eq!(factor, 0.8);
        assert!(supported);
    }

    #[test]
    fn test_factor_falls_back_to_one() {
        let no_peak = with_aggregate(gsp(0, "A"), [Some(100.0), None, None]);
        assert_eq!(diversity_factor(&no_peak), (1.0, true));

        let negative_peak = with_aggregate(
            gsp(0, "A").with_demand([Some(-3.0), None, None]),
            [Some(100.0), None, None],
        );
        assert_eq!(diversity_factor(&negative_peak), (1.0, true));

        let no_aggregate = gsp(0, "A").with_demand([Some(30.0), None, None]);
        assert_eq!(diversity_factor(&no_aggregate), (1.0, false));
    }

    #[test]
    fn test_factor_is_clipped_to_one() {
        let row = with_aggregate(
            gsp(0, "A").with_demand([Some(120.0), None, None]),
            [Some(100.0), None, None],
        );
        assert_eq!(diversity_factor(&row).0, 1.0);
    }

    #[test]
    fn test_primaries_inherit_factor_and_rebuild_demand() {
        let mut table = ready(vec![
            with_aggregate(
                gsp(0, "A").with_demand([Some(90.0), Some(92.0), Some(94.0)]),
                [Some(100.0), Some(100.0), Some(100.0)],
            ),
            primary(1, "P1").with_demand([Some(10.0), Some(20.0), None]),
            with_aggregate(
                gsp(2, "B").with_demand([Some(50.0), None, None]),
                [Some(50.0), None, None],
            ),
            primary(3, "P2").with_demand([Some(8.0), None, None]),
        ]);
        let issues = apply_diversity_factors(&mut table).unwrap();
        assert!(issues.is_empty());

        let p1 = &table.records[1];
        assert_relative_eq!(p1.diversity_factor.unwrap(), 0.9);
        assert_eq!(p1.year_aggregate, vec![Some(10.0), Some(20.0), None]);
        assert_relative_eq!(p1.year_demand[0].unwrap(), 9.0);
        assert_relative_eq!(p1.year_demand[1].unwrap(), 18.0);
        assert_eq!(p1.year_demand[2], None);

        let p2 = &table.records[3];
        assert_eq!(p2.diversity_factor, Some(1.0));
        assert_relative_eq!(p2.year_demand[0].unwrap(), 8.0);

        // GSP rows keep their own diversified figures
        assert_eq!(table.records[0].year_demand[0], Some(90.0));
        for record in table.records.iter().filter(|r| r.role == Role::Gsp) {
            let factor = record.diversity_factor.unwrap();
            assert!(factor > 0.0 && factor <= 1.0);
        }
    }

    #[test]
    fn test_underflowing_ratio_falls_back_to_one() {
        let row = with_aggregate(
            gsp(0, "A").with_demand([Some(1e-300), None, None]),
            [Some(1e300), None, None],
        );
        assert_eq!(diversity_factor(&row), (1.0, false));
    }

    #[test]
    fn test_primary_above_first_gsp_is_not_diversified() {
        let mut table = ready(vec![
            primary(0, "Orphan").with_demand([Some(10.0), Some(11.0), Some(12.0)]),
            with_aggregate(
                gsp(1, "A").with_demand([Some(90.0), None, None]),
                [Some(100.0), None, None],
            ),
            primary(2, "P1").with_demand([Some(10.0), None, None]),
        ]);
        apply_diversity_factors(&mut table).unwrap();

        let orphan = &table.records[0];
        assert_eq!(orphan.diversity_factor, None);
        assert_eq!(orphan.year_aggregate, vec![Some(10.0), Some(11.0), Some(12.0)]);
        assert_eq!(orphan.year_demand, vec![None, None, None]);

        assert_relative_eq!(table.records[2].year_demand[0].unwrap(), 9.0);
    }

    #[test]
    fn test_gsp_without_aggregate_is_reported() {
        let mut table = ready(vec![gsp(0, "A").with_demand([Some(30.0), None, None])]);
        let issues = apply_diversity_factors(&mut table).unwrap();
        assert_eq!(table.records[0].diversity_factor, Some(1.0));
        assert_eq!(
            issues,
            vec![RowIssue::MissingAggregate {
                source_row: 0,
                gsp: Some("A".to_string())
            }]
        );
    }
}
