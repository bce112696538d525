use crate::error::ReportError;
use crate::spreadsheet::reference::index_to_reference;
use crate::spreadsheet::SpreadsheetError;
use chrono::Duration;
use chrono::NaiveDate;

/// Types of cell data in spreadsheet files.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (true/false)
    Boolean,
    /// Numeric values
    Number,
    /// Date/time values stored as numbers from 1900 epoch
    NumberDateTime1900,
    /// Date values stored as numbers from 1900 epoch
    NumberDate1900,
    /// Time values stored as numbers from 1900 epoch
    NumberTime1900,
    /// Date/time values stored as numbers from 1904 epoch
    NumberDateTime1904,
    /// Date values stored as numbers from 1904 epoch
    NumberDate1904,
    /// Time values stored as numbers from 1904 epoch
    NumberTime1904,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline string values, including cached formula strings
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error values
    Error,
}

impl CellType {
    /// Parses built-in Excel number format IDs to determine cell type.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "22" => Some(if is_1904 { Self::NumberDateTime1904 } else { Self::NumberDateTime1900 }),
            "14" | "15" | "16" | "17" => Some(if is_1904 { Self::NumberDate1904 } else { Self::NumberDate1900 }),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(if is_1904 { Self::NumberTime1904 } else { Self::NumberTime1900 }),
            _ => None,
        }
    }

    /// Parses custom number format strings to determine cell type.
    /// Analyzes format codes for date/time patterns.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_date = false;
        let mut is_time = false;
        let mut is_color = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' if !is_escaped => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_literal && !is_color => is_literal = true,

                ']' if is_color => is_color = false,
                '[' if !is_color && !is_literal => is_color = true,
                _ if is_literal || is_color => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        match (is_date, is_time, is_1904) {
            (true, true, false) => Self::NumberDateTime1900,
            (true, true, true) => Self::NumberDateTime1904,
            (true, false, false) => Self::NumberDate1900,
            (true, false, true) => Self::NumberDate1904,
            (false, true, false) => Self::NumberTime1900,
            (false, true, true) => Self::NumberTime1904,
            (false, false, _) => Self::Number,
        }
    }

    fn is_date(&self) -> bool {
        matches!(
            self,
            Self::NumberDateTime1900 | Self::NumberDate1900 | Self::NumberDateTime1904 | Self::NumberDate1904
        )
    }

    fn is_1904(&self) -> bool {
        matches!(self, Self::NumberDateTime1904 | Self::NumberDate1904 | Self::NumberTime1904)
    }
}

/// Number format attached to a cell style: how to interpret the value and how many
/// decimals a plain number shows.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct NumberFormat {
    pub(crate) kind: CellType,
    pub(crate) decimals: Option<usize>,
}

impl NumberFormat {
    /// Resolves a built-in format id. Ids without a date meaning or a fixed number
    /// of decimals (e.g. `0` General) yield `None` so the caller can fall back.
    pub(crate) fn builtin(id: &str, is_1904: bool) -> Option<Self> {
        if let Some(kind) = CellType::parse_builtin_number_format_id(id, is_1904) {
            return Some(NumberFormat { kind, decimals: None });
        }
        let code = match id {
            "1" => "0",
            "2" => "0.00",
            "3" => "#,##0",
            "4" => "#,##0.00",
            "9" => "0%",
            "10" => "0.00%",
            "11" => "0.00E+00",
            "39" | "40" => "#,##0.00;(#,##0.00)",
            "48" => "##0.0E+0",
            _ => return None,
        };
        Some(Self::custom(code, is_1904))
    }

    /// Builds a format from a custom format code such as `0.00` or `yyyy.m.d`.
    pub(crate) fn custom(code: &str, is_1904: bool) -> Self {
        let kind = CellType::parse_custom_number_format(code, is_1904);
        NumberFormat {
            kind,
            decimals: decimals_of(code),
        }
    }
}

/// Counts the `0` placeholders after the first decimal point of a format code.
/// Returns `None` when the code has no decimal point at all.
fn decimals_of(code: &str) -> Option<usize> {
    let (_, fraction) = code.split_once('.')?;
    let fraction = fraction.split(['.', ';']).next().unwrap_or_default();
    Some(fraction.chars().filter(|c| *c == '0').count())
}

/// Represents a single cell in a worksheet with position, type and raw value.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Cell {
    /// Row index (0-based)
    pub(crate) row: usize,
    /// Column index (0-based)
    pub(crate) col: usize,
    /// Cell data type
    pub(crate) kind: CellType,
    /// Raw cell value as stored in the sheet (shared strings already resolved)
    pub(crate) value: String,
    /// Decimal places implied by the cell's number format
    pub(crate) decimals: Option<usize>,
    /// Whether the cell carries a formula
    pub(crate) has_formula: bool,
}

impl Cell {
    /// Returns the Excel-style cell reference (e.g., "A1", "B2").
    pub(crate) fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }

    /// Normalizes the cell into the string shown in the report.
    ///
    /// Numbers honour the decimals of their format, dates render as `YYYY-MM-DD`,
    /// booleans as `True`/`False`, errors as their literal. A value that cannot be
    /// interpreted degrades to an empty string.
    pub(crate) fn display_value(&self) -> String {
        let result = match self.kind {
            CellType::Empty => Ok(String::new()),
            CellType::Boolean => Ok(if self.value == "1" || self.value.eq_ignore_ascii_case("true") {
                "True"
            } else {
                "False"
            }
            .to_owned()),
            CellType::Number => to_number_string(&self.value, self.decimals),
            kind if kind.is_date() => to_date_string(&self.value, kind.is_1904()),
            CellType::NumberTime1900 | CellType::NumberTime1904 => to_time_string(&self.value),
            CellType::IsoDateTime => Ok(self.value.chars().take(10).collect()),
            _ => Ok(self.value.to_owned()),
        };
        match result {
            Ok(value) => value,
            Err(error) => {
                log::debug!("Display cell {} '{}' failed: {}", self.reference(), self.value, error);
                String::new()
            }
        }
    }
}

/// Formats a raw numeric value.
/// With a fixed number of decimals the value is rounded to exactly that many places;
/// otherwise integers keep their integer form and other values use the shortest
/// representation with a mandatory fractional part (`95.0`).
fn to_number_string(value: &str, decimals: Option<usize>) -> Result<String, ReportError> {
    let value = value.trim();
    if let Some(places) = decimals {
        return Ok(format!("{:.*}", places, value.parse::<f64>()?));
    }
    if !value.contains(['.', 'e', 'E']) {
        if let Ok(integer) = value.parse::<i64>() {
            return Ok(integer.to_string());
        }
    }
    Ok(format!("{:?}", value.parse::<f64>()?))
}

/// Converts Excel numeric date to ISO date string.
/// Handles Lotus 1-2-3 leap year bug for 1900 epoch.
/// Serials outside the calendar range are an error.
fn to_date_string(value: &str, is_1904: bool) -> Result<String, ReportError> {
    let serial = value.parse::<f64>()?.trunc();
    let out_of_range = || SpreadsheetError::CellValueError(value.trim().to_owned());
    if !serial.is_finite() || serial.abs() > i64::MAX as f64 {
        Err(out_of_range())?;
    }
    let days = serial as i64;
    let shift = if is_1904 {
        1462
    } else if days < 60 {
        1
    } else {
        0
    };
    let date = days
        .checked_add(shift)
        .and_then(Duration::try_days)
        .and_then(|duration| NaiveDate::from_ymd_opt(1899, 12, 30).expect("NaiveDate Literal").checked_add_signed(duration))
        .ok_or_else(out_of_range)?;
    Ok(date.format("%Y-%m-%d").to_string())
}

/// Converts Excel numeric time to `HH:MM:SS`.
fn to_time_string(value: &str) -> Result<String, ReportError> {
    let factor = value.parse::<f64>()?.fract();
    let mut seconds = (factor * 86_400f64).round() as i64;
    let second = seconds % 60;
    seconds /= 60;
    let minute = seconds % 60;
    let hour = seconds / 60;
    Ok(format!("{hour:02}:{minute:02}:{second:02}"))
}
