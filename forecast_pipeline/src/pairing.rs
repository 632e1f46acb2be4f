use crate::error::{PipelineResult, ShapeMismatch};
use crate::models::{parse_share, DetailRow, LoadTable, Role, Stage, SubstationRecord};
use log::{debug, info};

fn detail_from(donor: &SubstationRecord) -> DetailRow {
    DetailRow {
        source_row: donor.source_row,
        year_demand: donor.year_demand.clone(),
        feeder_shares: donor
            .feeder_refs
            .iter()
            .map(|cell| cell.as_deref().and_then(parse_share))
            .collect(),
    }
}

/// Link every GSP and Primary row to the raw data row directly below it.
///
/// The source sheets put a classification row and its values on consecutive
/// rows. The link is made once, here, by source row id; later stages read the
/// stored snapshot and never look at neighbouring positions themselves. A row
/// with nothing usable below it keeps the reason instead of a link.
pub fn pair_detail_rows(table: &mut LoadTable) -> PipelineResult<()> {
    table.require(Stage::Pair)?;

    let links: Vec<Option<Result<DetailRow, ShapeMismatch>>> = (0..table.records.len())
        .map(|i| {
            if !table.records[i].role.is_classified() {
                return None;
            }
            let link = match table.records.get(i + 1) {
                None => Err(ShapeMismatch::NoRowBelow),
                Some(below) if below.role != Role::Unclassified => {
                    Err(ShapeMismatch::NotADataRow { role: below.role })
                }
                Some(below) => Ok(detail_from(below)),
            };
            Some(link)
        })
        .collect();

    let mut paired = 0;
    for (record, link) in table.records.iter_mut().zip(links) {
        if let Some(link) = link {
            match &link {
                Ok(detail) => {
                    debug!("row {} paired with row {}", record.source_row, detail.source_row);
                    paired += 1;
                }
                Err(reason) => debug!("row {} left unpaired: {}", record.source_row, reason),
            }
            record.detail = link;
        }
    }

    table.mark(Stage::Pair);
    info!("Paired {} classified rows with their data rows", paired);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify_rows;
    use crate::test_support::*;

    #[test]
    fn test_pairs_with_row_below_by_source_id() {
        let mut table = table_of(vec![
            gsp(10, "A"),
            data_row(11, [Some(90.0), Some(95.0), None]).with_feeders([Some("60%"), None]),
            primary(12, "P1"),
            data_row(13, [None, None, None]),
        ]);
        classify_rows(&mut table).unwrap();
        pair_detail_rows(&mut table).unwrap();

        let detail = table.records[0].detail.as_ref().unwrap();
        assert_eq!(detail.source_row, 11);
        assert_eq!(detail.year_demand, vec![Some(90.0), Some(95.0), None]);
        assert_eq!(detail.feeder_shares[0], Some(0.6));
        assert_eq!(table.records[2].detail.as_ref().unwrap().source_row, 13);

        // unclassified rows are donors, never linked themselves
        assert_eq!(table.records[1].detail, Err(ShapeMismatch::NotPaired));
    }

    #[test]
    fn test_missing_or_classified_row_below_is_a_shape_mismatch() {
        let mut table = table_of(vec![gsp(0, "A"), primary(1, "P1")]);
        classify_rows(&mut table).unwrap();
        pair_detail_rows(&mut table).unwrap();

        assert_eq!(
            table.records[0].detail,
            Err(ShapeMismatch::NotADataRow { role: Role::Primary })
        );
        assert_eq!(table.records[1].detail, Err(ShapeMismatch::NoRowBelow));
    }

    #[test]
    fn test_requires_classification() {
        let mut table = table_of(vec![gsp(0, "A")]);
        assert!(pair_detail_rows(&mut table).is_err());
    }
}
