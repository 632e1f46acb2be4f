use crate::error::RowIssue;
use crate::models::LoadTable;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Good/bad partition of the processed rows, driven by the reported issues.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityReport {
    pub good_rows: BTreeSet<usize>,
    pub bad_rows: BTreeSet<usize>,
    pub issue_counts: BTreeMap<&'static str, usize>,
}

impl QualityReport {
    /// A surviving row is bad when any issue names it. Issues about rows that
    /// were filtered out are still counted.
    pub fn assess(table: &LoadTable, issues: &[RowIssue]) -> Self {
        let flagged: BTreeSet<usize> = issues.iter().map(RowIssue::source_row).collect();

        let mut report = QualityReport::default();
        for record in &table.records {
            if flagged.contains(&record.source_row) {
                report.bad_rows.insert(record.source_row);
            } else {
                report.good_rows.insert(record.source_row);
            }
        }
        for issue in issues {
            *report.issue_counts.entry(issue.kind()).or_insert(0) += 1;
        }
        report
    }

    pub fn total_issues(&self) -> usize {
        self.issue_counts.values().sum()
    }

    pub fn split(&self, table: &LoadTable) -> (LoadTable, LoadTable) {
        (table.subset(&self.good_rows), table.subset(&self.bad_rows))
    }
}
