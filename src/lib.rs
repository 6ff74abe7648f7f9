// Aggregation and metric resolution for production / sales reports.
//
// Raw rows flow through the pipeline
// `normalizer -> summary -> resolver -> categorizer / colorizer -> series`,
// and `dashboard::Dashboard` ties the stages to the current upload and
// the two factory selectors.

pub mod categorizer;
pub mod colorizer;
pub mod dashboard;
pub mod error;
pub mod layout;
pub mod loader;
pub mod logging;
pub mod normalizer;
pub mod output;
pub mod resolver;
pub mod series;
pub mod summary;
pub mod types;
pub mod util;

pub use dashboard::{Dashboard, DashboardSnapshot, DashboardState, Panel};
pub use error::{EngineError, SourceError};
pub use layout::{ReportLayout, DEFAULT_LAYOUT};
pub use loader::{ReportData, ReportSource, UploadResponse};
pub use types::{Category, CellValue, FactorySelector, FieldPair, MetricClass, ReportRow, Status};
