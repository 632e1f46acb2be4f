pub mod aggregate;
pub mod bus_share;
pub mod classifier;
pub mod data_loader;
pub mod diversity;
pub mod error;
pub mod estimator;
pub mod hierarchy;
pub mod models;
pub mod pairing;
pub mod pipeline;
pub mod quality;
pub mod seasonal;
pub mod year_columns;

#[cfg(test)]
mod test_support;

pub use data_loader::{to_dataframe, write_table, DataLoader, OutputFormat};
pub use error::{PipelineError, PipelineResult, RowIssue, ShapeMismatch};
pub use models::{FeederShare, LoadTable, PipelineConfig, Role, Stage, SubstationRecord};
pub use pipeline::{LoadForecastPipeline, PipelineOutput};
pub use quality::QualityReport;
pub use seasonal::SeasonalPercentiles;
pub use year_columns::{ForecastYear, YearColumnResolver};
