//! # Compaction Report Generator
//!
//! Builds the Word report of a soil compaction inspection from the measurement
//! workbook the field team fills in.
//!
//! ## Features
//!
//! - **Section discovery**: Reads every measurement block of every worksheet of an
//!   `.xlsx` workbook, with number-format aware display values
//! - **Schedule merging**: Adjacent blocks with identical header values share one schedule
//! - **Template driven**: Schedules are deep copies of the template's first schedule;
//!   all other parts of the document package are kept byte for byte
//! - **Summary and narrative**: Fills the evaluation table and writes one conclusion
//!   sentence per schedule
//! - **Safe output**: The report is staged next to the target and only then moved in place
//!
//! ## Entry points
//!
//! - [`run_excel_to_word_automation`]: one call with the default configuration
//! - [`run`]: full control through [`EngineConfig`], a [`ProgressSink`] and a [`CancelToken`]
mod document;
mod engine;
mod error;
mod helpers;
mod spreadsheet;

pub use crate::document::DocumentError;
pub use crate::engine::config::estimate_lines;
pub use crate::engine::config::EngineConfig;
pub use crate::engine::config::FontConfig;
pub use crate::engine::config::SectionLayout;
pub use crate::engine::orchestrator::run;
pub use crate::engine::orchestrator::run_excel_to_word_automation;
pub use crate::engine::orchestrator::RunRequest;
pub use crate::engine::orchestrator::RunSummary;
pub use crate::engine::progress::CancelToken;
pub use crate::engine::progress::NoProgress;
pub use crate::engine::progress::ProgressSink;
pub use crate::engine::progress::WARNING_PREFIX;
pub use crate::engine::recalc::CommandRecalculator;
pub use crate::engine::recalc::Recalculator;
pub use crate::engine::EngineError;
pub use crate::error::ReportError;
pub use crate::helpers::xml::XmlError;
pub use crate::spreadsheet::SpreadsheetError;
