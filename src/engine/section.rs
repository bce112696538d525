use crate::engine::config::SectionLayout;
use crate::engine::progress::Reporter;
use crate::error::ReportError;
use crate::spreadsheet::reference::col_to_index;
use crate::spreadsheet::Range;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use std::collections::BTreeMap;

/// One block of measurements read from a worksheet
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Section {
    /// 0-based position of the section in its worksheet
    pub(crate) index: usize,
    /// Display values of the data rectangle, row by row
    pub(crate) data: Vec<Vec<String>>,
    /// Values of the comparison cells keyed by their template address
    pub(crate) comparison_values: BTreeMap<String, String>,
    pub(crate) label: String,
}

impl Section {
    /// Row offset of this section relative to the first one
    pub(crate) fn row_offset(&self, layout: &SectionLayout) -> usize {
        self.index * layout.row_increment
    }
}

/// Reads every section of a worksheet.
///
/// Sections start every `row_increment` rows from `base_row`. Reading stops past
/// the last used row, at a section whose stop cell shows the stop marker, or at
/// the section cap.
///
/// # Arguments
/// * `sheet` - Worksheet to read
/// * `layout` - Section addressing
/// * `reporter` - Receives a message naming why reading stopped
///
/// # Returns
/// Sections in worksheet order
pub(crate) fn extract_sections(
    sheet: &Sheet,
    layout: &SectionLayout,
    reporter: &mut Reporter,
) -> Result<Vec<Section>, ReportError> {
    let columns = Range::try_from(layout.columns.as_str())?;
    let stop_column = col_to_index(&layout.stop_column)
        .ok_or_else(|| SpreadsheetError::RangeFormatError(layout.stop_column.to_owned()))?;

    let mut sections = Vec::new();
    for index in 0.. {
        if index >= layout.max_sections {
            reporter.info(&format!("Reached the limit of {} sections on sheet '{}'", layout.max_sections, sheet.name));
            break;
        }
        let start = layout.base_row + index * layout.row_increment;
        if start > sheet.max_row() {
            break;
        }
        if sheet.display(start, stop_column + 1) == layout.stop_marker {
            reporter.info(&format!(
                "Row {} of sheet '{}' shows {} in column {}, no more sections",
                start, sheet.name, layout.stop_marker, layout.stop_column
            ));
            break;
        }

        let data = (start..start + layout.rows_per_section)
            .map(|row| columns.columns().map(|col| sheet.display(row, col + 1)).collect())
            .collect();
        let offset = index * layout.row_increment;
        let comparison_values = layout.comparison_cells
            .iter()
            .map(|reference| (reference.to_owned(), sheet.display_at(reference, offset)))
            .collect();
        let label = layout.label_cells
            .iter()
            .map(|reference| sheet.display_at(reference, offset))
            .collect::<String>();
        log::debug!("Section {} of '{}' starts at row {}, label '{}'", index + 1, sheet.name, start, label);
        sections.push(Section {
            index,
            data,
            comparison_values,
            label,
        });
    }
    Ok(sections)
}
