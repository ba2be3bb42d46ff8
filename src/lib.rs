pub mod baseline;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod parse;
pub mod plan;
pub mod report;
pub mod scan;
pub mod source;
pub mod table;

pub use config::{Config, SourceKind};
pub use engine::{aggregate_file, aggregate_source, aggregate_tables};
pub use error::{Error, Result};
pub use report::Report;
pub use table::{AggregateTable, StationStat};

pub const MAX_KEY_LEN: usize = 100;
/// Key, `;`, `-99.9` and the newline.
pub const MAX_LINE_LEN: usize = MAX_KEY_LEN + 1 + 5 + 1;
