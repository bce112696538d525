use crate::error::ReportError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::reference::row_to_index;
use crate::spreadsheet::SpreadsheetError;
use regex::Regex;

/// Represents an Excel-style cell range with optional boundaries.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) struct Range {
    /// Lower row bound (0-based index), None for unbounded
    pub(crate) row_lower_bound: Option<usize>,
    /// Upper row bound (0-based index), None for unbounded
    pub(crate) row_upper_bound: Option<usize>,
    /// Lower column bound (0-based index), None for unbounded
    pub(crate) col_lower_bound: Option<usize>,
    /// Upper column bound (0-based index), None for unbounded
    pub(crate) col_upper_bound: Option<usize>,
}

impl TryFrom<&str> for Range {
    type Error = ReportError;

    /// Parses an Excel-style range string (e.g., "A1", "X7:AC16", "X:AC", "1:10").
    /// Supports single cells, ranges, and partial ranges (columns or rows only).
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let pattern = Regex::new(r"^([A-Z]*)(\d*)(:([A-Z]*)(\d*))?$").expect("Hardcode regex pattern");
        let value = value.replace('$', "").to_ascii_uppercase();
        let captures = pattern
            .captures(value.as_str())
            .ok_or(SpreadsheetError::RangeFormatError(value.to_owned()))?;
        let col_lower_bound = captures.get(1).map(|matcher| matcher.as_str()).and_then(col_to_index);
        let row_lower_bound = captures.get(2).map(|matcher| matcher.as_str()).and_then(row_to_index);
        let is_pair = captures.get(3).is_some();
        Ok(Range {
            col_lower_bound,
            row_lower_bound,
            col_upper_bound: if is_pair {
                captures.get(4).map(|matcher| matcher.as_str()).and_then(col_to_index)
            } else {
                col_lower_bound
            },
            row_upper_bound: if is_pair {
                captures.get(5).map(|matcher| matcher.as_str()).and_then(row_to_index)
            } else {
                row_lower_bound
            },
        })
    }
}

impl Range {
    /// Checks whether a 0-based (row, col) lies inside the range.
    pub(crate) fn contains(&self, row: usize, col: usize) -> bool {
        self.row_lower_bound.map(|bound| bound <= row).unwrap_or(true)
            && self.row_upper_bound.map(|bound| row <= bound).unwrap_or(true)
            && self.col_lower_bound.map(|bound| bound <= col).unwrap_or(true)
            && self.col_upper_bound.map(|bound| col <= bound).unwrap_or(true)
    }

    /// Returns a copy restricted to the given 0-based rows.
    pub(crate) fn with_rows(&self, lower: usize, upper: usize) -> Range {
        Range {
            row_lower_bound: Some(lower),
            row_upper_bound: Some(upper),
            ..*self
        }
    }

    /// 0-based column indexes covered by the range (empty when unbounded).
    pub(crate) fn columns(&self) -> std::ops::RangeInclusive<usize> {
        match (self.col_lower_bound, self.col_upper_bound) {
            (Some(lower), Some(upper)) => lower..=upper,
            #[allow(clippy::reversed_empty_ranges)]
            _ => 1..=0,
        }
    }
}
