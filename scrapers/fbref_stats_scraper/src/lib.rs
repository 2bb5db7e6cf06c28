pub mod clean;
pub mod coerce;
pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod flatten;
pub mod locate;
pub mod merge;
pub mod player_logs;
pub mod storage;
pub mod types;
pub mod utils;

pub use error::{Result, ScrapeError};
pub use types::{Cell, RawDocument, Source, Table, TableSet, TableSlot};
