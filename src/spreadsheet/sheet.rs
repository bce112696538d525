use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::range::Range;
use crate::spreadsheet::reference::reference_to_index;
use std::collections::HashMap;

/// One worksheet loaded into an addressable grid.
///
/// Only cells carrying a value are stored; `max_row` still accounts for every
/// `<c>` element seen, so styled but empty rows extend the sheet the same way
/// they do in spreadsheet applications.
#[derive(Clone, Debug, Default)]
pub(crate) struct Sheet {
    /// Sheet name
    pub(crate) name: String,
    /// Cells keyed by 0-based (row, col)
    cells: HashMap<(usize, usize), Cell>,
    /// Number of rows in the used area (1-based row number of the last row)
    max_row: usize,
}

impl Sheet {
    /// Creates an empty sheet.
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..Self::default()
        }
    }

    /// Records that a row (0-based) exists even when its cells are empty.
    pub(crate) fn touch(&mut self, row: usize) {
        self.max_row = self.max_row.max(row + 1);
    }

    /// Adds a cell, replacing any earlier cell at the same position.
    pub(crate) fn push(&mut self, cell: Cell) {
        self.touch(cell.row);
        self.cells.insert((cell.row, cell.col), cell);
    }

    /// Returns the 1-based number of the last used row.
    pub(crate) fn max_row(&self) -> usize {
        self.max_row
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Gets a cell by 0-based position.
    pub(crate) fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Display string of the cell at a 1-based row and column; missing cells are empty.
    pub(crate) fn display(&self, row: usize, col: usize) -> String {
        if row == 0 || col == 0 {
            return String::new();
        }
        self.cell(row - 1, col - 1)
            .map(Cell::display_value)
            .unwrap_or_default()
    }

    /// Display string of an A1 reference shifted down by `row_offset` rows.
    pub(crate) fn display_at(&self, reference: &str, row_offset: usize) -> String {
        match reference_to_index(reference) {
            Some((row, col)) => self.cell(row + row_offset, col)
                .map(Cell::display_value)
                .unwrap_or_default(),
            None => String::new(),
        }
    }

    /// Whether any cell inside the range holds a formula.
    pub(crate) fn has_formula_in(&self, range: &Range) -> bool {
        self.cells.values().any(|cell| cell.has_formula && range.contains(cell.row, cell.col))
    }
}

#[cfg(test)]
mod tests {
    use crate::spreadsheet::cell::CellType;
    use crate::spreadsheet::*;

    fn push(sheet: &mut Sheet, row: usize, col: usize, value: &str) {
        sheet.push(Cell {
            row,
            col,
            kind: CellType::InlineString,
            value: value.to_owned(),
            ..Cell::default()
        });
    }

    #[test]
    fn sheet_initial() {
        let sheet = Sheet::new("Sheet1");

        assert!(sheet.is_empty());
        assert_eq!(sheet.max_row(), 0);
        assert_eq!(sheet.display(1, 1), "");
    }

    #[test]
    fn sheet_lookup_by_position_and_reference() {
        let mut sheet = Sheet::new("Sheet1");
        push(&mut sheet, 4, 1, "K0+100");
        push(&mut sheet, 28, 1, "K0+200");

        assert_eq!(sheet.max_row(), 29);
        assert_eq!(sheet.display(5, 2), "K0+100");
        assert_eq!(sheet.display_at("B5", 0), "K0+100");
        assert_eq!(sheet.display_at("B5", 24), "K0+200");
        assert_eq!(sheet.display_at("B5", 48), "");
        assert_eq!(sheet.display(0, 2), "");
    }

    #[test]
    fn sheet_touch_extends_rows_without_cells() {
        let mut sheet = Sheet::new("Sheet1");
        push(&mut sheet, 0, 0, "title");
        sheet.touch(40);

        assert_eq!(sheet.max_row(), 41);
        assert!(sheet.cell(40, 0).is_none());
    }

    #[test]
    fn sheet_formula_detection_is_range_bound() {
        let mut sheet = Sheet::new("Sheet1");
        sheet.push(Cell {
            row: 6,
            col: 28,
            kind: CellType::Number,
            value: "0".to_owned(),
            has_formula: true,
            ..Cell::default()
        });

        assert!(sheet.has_formula_in(&Range::try_from("X7:AC16").unwrap()));
        assert!(!sheet.has_formula_in(&Range::try_from("X17:AC26").unwrap()));
    }
}
