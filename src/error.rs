use thiserror::Error;

/// Main error type for the compaction report generator.
/// Aggregates errors from the standard library, dependencies and the internal layers
/// (workbook reading, document model, report engine).
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("{0}")]
    WithContextError(String),

    #[error("{kind} file not found: '{path}'")]
    InputFileNotFoundError { kind: &'static str, path: String },

    #[error("Report generation cancelled")]
    CancelledError,

    #[error("Save '{path}' failed: {primary}; direct overwrite also failed: {fallback}")]
    SaveError {
        path: String,
        primary: String,
        fallback: String,
    },

    #[error("{0}")]
    AnyhowError(#[from] anyhow::Error),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("{0}")]
    ParseDateTimeError(#[from] chrono::ParseError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    // Workbook errors
    #[error("{0}")]
    SpreadsheetError(#[from] crate::spreadsheet::SpreadsheetError),

    // Document model errors
    #[error("{0}")]
    DocumentError(#[from] crate::document::DocumentError),

    // Report engine errors
    #[error("{0}")]
    EngineError(#[from] crate::engine::EngineError),
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, ReportError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| ReportError::WithContextError(format!("{}: {}", message, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_prefix_keeps_cause_text() {
        let result: Result<(), ReportError> = Err(ReportError::CancelledError);
        let error = result.with_prefix("Process sheet 'Sheet1'").unwrap_err();
        assert_eq!(error.to_string(), "Process sheet 'Sheet1': Report generation cancelled");
    }

    #[test]
    fn missing_input_names_kind_and_path() {
        let error = ReportError::InputFileNotFoundError {
            kind: "Excel",
            path: "data.xlsx".to_owned(),
        };
        assert_eq!(error.to_string(), "Excel file not found: 'data.xlsx'");
    }
}
