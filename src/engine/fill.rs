use crate::document::node::XmlElement;
use crate::document::table;
use crate::document::word;
use crate::document::word::RunFormat;

/// Writes data rows into a schedule.
///
/// Row `r` of the data goes to table row `r + 1`: column 0 receives the running
/// number `r + 1`, the next columns receive the row's values. Each written cell is
/// cleared and gets one centered paragraph in the data format. At most `capacity`
/// rows are written.
pub(crate) fn fill_table(schedule: &mut XmlElement, rows: &[Vec<String>], capacity: usize, format: &RunFormat) {
    for (index, values) in rows.iter().enumerate().take(capacity) {
        let row = match table::row_mut(schedule, index + 1) {
            Some(row) => row,
            None => break,
        };
        if let Some(cell) = table::cell_mut(row, 0) {
            write_cell(cell, &(index + 1).to_string(), format);
        }
        let cell_count = table::cells(row).len();
        for (column, value) in values.iter().enumerate().take(cell_count.saturating_sub(1)) {
            if let Some(cell) = table::cell_mut(row, column + 1) {
                write_cell(cell, value, format);
                table::set_vertical_alignment(cell, "center");
            }
        }
    }
}

fn write_cell(cell: &mut XmlElement, value: &str, format: &RunFormat) {
    table::set_cell_content(cell, Some("center"), vec![word::text_run(value, Some(format.properties()))]);
}
