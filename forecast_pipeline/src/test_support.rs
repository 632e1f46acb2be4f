//! Fixtures shared by the unit tests: a three-year, two-feeder, one-season sheet.

use crate::models::{FeederColumn, IdentityColumns, LoadTable, SeasonColumn, SubstationRecord};
use crate::year_columns::YearColumnResolver;

pub const COLUMNS: [&str; 10] = [
    "Name",
    "GSP",
    "NRN",
    "Voltage Ratio",
    "PSS/E Bus #1",
    "PSS/E Bus #2",
    "Summer %",
    "2019/2020",
    "2020/2021",
    "2021/2022",
];

pub fn record(
    source_row: usize,
    name: Option<&str>,
    gsp: Option<&str>,
    nrn: Option<&str>,
    voltage_ratio: Option<&str>,
) -> SubstationRecord {
    let mut record = SubstationRecord::new(source_row, 3, 2, 1);
    record.name = name.map(str::to_string);
    record.gsp_reference = gsp.map(str::to_string);
    record.network_reference_number = nrn.map(str::to_string);
    record.voltage_ratio = voltage_ratio.map(str::to_string);
    record
}

pub fn gsp(source_row: usize, reference: &str) -> SubstationRecord {
    record(source_row, None, Some(reference), None, Some("132/33"))
}

pub fn primary(source_row: usize, name: &str) -> SubstationRecord {
    let nrn = format!("NRN-{}", source_row);
    record(source_row, Some(name), None, Some(&nrn), None)
}

pub fn data_row(source_row: usize, demand: [Option<f64>; 3]) -> SubstationRecord {
    record(source_row, None, None, None, None).with_demand(demand)
}

pub trait RecordBuilder {
    fn with_demand(self, demand: [Option<f64>; 3]) -> Self;
    fn with_feeders(self, cells: [Option<&str>; 2]) -> Self;
    fn with_seasonal(self, value: Option<f64>) -> Self;
}

impl RecordBuilder for SubstationRecord {
    fn with_demand(mut self, demand: [Option<f64>; 3]) -> Self {
        self.year_demand = demand.to_vec();
        self
    }

    fn with_feeders(mut self, cells: [Option<&str>; 2]) -> Self {
        self.feeder_refs = cells.iter().map(|c| c.map(str::to_string)).collect();
        self
    }

    fn with_seasonal(mut self, value: Option<f64>) -> Self {
        self.seasonal = vec![value];
        self
    }
}

pub fn table_of(records: Vec<SubstationRecord>) -> LoadTable {
    let columns: Vec<String> = COLUMNS.iter().map(|c| c.to_string()).collect();
    let years = YearColumnResolver::new().resolve(&columns);
    let feeders = vec![
        FeederColumn {
            column: 4,
            name: COLUMNS[4].to_string(),
        },
        FeederColumn {
            column: 5,
            name: COLUMNS[5].to_string(),
        },
    ];
    let seasons = vec![SeasonColumn {
        column: 6,
        name: COLUMNS[6].to_string(),
    }];
    let identity = IdentityColumns {
        name: Some(0),
        gsp: Some(1),
        nrn: Some(2),
        voltage_ratio: Some(3),
    };
    LoadTable::new(columns, identity, years, feeders, seasons, records)
}
