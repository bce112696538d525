//! # Report Engine
//!
//! Turns the sections of a compaction workbook into the schedules, summary table
//! and narrative of a Word report. Phases run in a fixed order over one owned
//! [`crate::document::Document`]:
//!
//! 1. Sections are read from every selected worksheet and merged with their
//!    identical neighbours.
//! 2. Every group is written into a copy of the template schedule (the first
//!    group reuses the template itself), then degenerate rows are pruned.
//! 3. Remark rows, the summary table and the narrative paragraphs are rewritten.
//! 4. Whole-document post-processing, then a staged save.
pub(crate) mod config;
pub(crate) mod fill;
pub(crate) mod merge;
pub(crate) mod narrative;
pub(crate) mod orchestrator;
pub(crate) mod postprocess;
pub(crate) mod progress;
pub(crate) mod prune;
pub(crate) mod recalc;
pub(crate) mod remark;
pub(crate) mod section;
pub(crate) mod summary;
pub(crate) mod template;

use thiserror::Error;

/// Errors raised by the report engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Template has no paragraph starting with '{}'", template::ANCHOR_PREFIX)]
    TemplateAnchorNotFoundError,

    #[error("Template has no table after the '{}' heading", template::ANCHOR_PREFIX)]
    TemplateTableNotFoundError,

    #[error("Template table has no data row after its header")]
    TemplateWithoutDataRowError,

    #[error("Recalculation failed: {0}")]
    RecalculationError(String),
}

/// A schedule written to the document
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct GeneratedTable {
    /// Body position of the `w:tbl`
    pub(crate) position: usize,
    /// Body position of the heading paragraph
    pub(crate) heading: usize,
    /// Index of the worksheet the data came from
    pub(crate) sheet: usize,
    /// Index of the group's first section in that worksheet
    pub(crate) section: usize,
    pub(crate) label: String,
}
