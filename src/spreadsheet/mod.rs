//! # Workbook Reading
//!
//! Loads the worksheets of an Office Open XML workbook (`.xlsx`, `.xlsm`) into
//! addressable grids of display strings. Only cached values are read: formulas are
//! never evaluated, their presence is merely recorded on the cell.
pub(crate) mod cell;
pub(crate) mod criteria;
pub(crate) mod excel;
pub(crate) mod range;
pub(crate) mod reference;
pub(crate) mod sheet;
pub(crate) mod xlsx;

pub(crate) use cell::Cell;
pub(crate) use criteria::Criteria;
pub(crate) use range::Range;
pub(crate) use sheet::Sheet;

use crate::error::ReportError;
use crate::error::ResultMessage;
use crate::helpers::reader::UnifiedReader;
use crate::spreadsheet::xlsx::XlsxWorkbook;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading a workbook
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Part '{0}' is missing from the workbook")]
    FileError(String),

    #[error("Workbook '{0}' has no worksheets")]
    SpreadsheetEmptyError(String),

    #[error("Workbook '{0}' is password protected")]
    SpreadsheetPasswordProtectedError(String),

    #[error("Unsupported workbook format '{0}', only .xlsx and .xlsm can be read")]
    UnsupportedFormatError(String),

    #[error("Cell value '{0}' is outside the supported date range")]
    CellValueError(String),

    #[error("Invalid range '{0}'")]
    RangeFormatError(String),

    #[error("No worksheet matches the sheet selection in '{0}'")]
    SheetNotFoundError(String),
}

/// A workbook loaded into memory
#[derive(Debug)]
pub(crate) struct Workbook {
    /// File name used in messages
    pub(crate) name: String,
    /// Accepted worksheets in workbook order
    pub(crate) sheets: Vec<Sheet>,
}

impl Workbook {
    /// Reads a workbook from disk
    ///
    /// # Arguments
    /// * `path` - Workbook path (`.xlsx` or `.xlsm`)
    /// * `criteria` - Which worksheets to load
    ///
    /// # Returns
    /// The loaded workbook; fails when no worksheet is accepted
    pub(crate) fn open(path: &Path, criteria: &Criteria) -> Result<Workbook, ReportError> {
        let name = path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        let extension = path.extension()
            .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        if !matches!(extension.as_str(), "xlsx" | "xlsm") {
            Err(SpreadsheetError::UnsupportedFormatError(name.to_owned()))?;
        }
        let reader = UnifiedReader::open(path)
            .with_prefix(&format!("Open workbook '{}'", path.display()))?;
        Self::read(&name, reader, criteria)
    }

    /// Reads a workbook held in memory
    pub(crate) fn from_bytes(name: &str, bytes: Vec<u8>, criteria: &Criteria) -> Result<Workbook, ReportError> {
        Self::read(name, UnifiedReader::from_bytes(bytes), criteria)
    }

    fn read(name: &str, reader: UnifiedReader, criteria: &Criteria) -> Result<Workbook, ReportError> {
        let mut workbook = XlsxWorkbook::open(name, reader)?;
        let sheets = workbook.read_sheets(criteria)?;
        if sheets.is_empty() {
            log::debug!("Sheets of '{}': {:?}", workbook.name, workbook.sheet_names());
            Err(SpreadsheetError::SheetNotFoundError(name.to_owned()))?;
        }
        Ok(Workbook {
            name: name.to_owned(),
            sheets,
        })
    }
}
