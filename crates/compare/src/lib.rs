//! `clcompare-engine`: spec-item alignment and limit evaluation engine.
//!
//! Pure engine crate: receives pre-loaded tables, returns evaluated records,
//! the joined report and chart data. No CLI or spreadsheet dependencies.

pub mod chart;
pub mod coerce;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod key;
pub mod mapper;
pub mod merge;
pub mod model;
pub mod presence;
pub mod report;
pub mod table;

pub use config::CompareConfig;
pub use engine::run;
pub use error::CompareError;
pub use model::{CellValue, CompareInput, CompareResult};
pub use table::Table;
