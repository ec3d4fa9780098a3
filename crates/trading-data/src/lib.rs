//! Historical bar data and the replay indicator provider.

mod csv_source;
mod replay;

pub use csv_source::{load_csv, CsvBarSource};
pub use replay::{build_snapshot, ReplayIndicatorProvider, SnapshotConfig};
