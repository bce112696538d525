use crate::document::node::XmlElement;
use crate::document::table;
use crate::engine::template::remark_row_index;

/// Last-column values of rows that carry no measurement
const DEGENERATE_VALUES: [&str; 3] = ["", "0.0", "#DIV/0!"];

/// Deletes data rows whose last cell is blank, `0.0` or `#DIV/0!`.
///
/// Only rows between the header row and the remark row are examined.
///
/// # Returns
/// Number of deleted rows, or `None` when the table has no remark row and nothing
/// was examined
pub(crate) fn prune_rows(schedule: &mut XmlElement) -> Option<usize> {
    let remark = remark_row_index(schedule)?;
    let rows = table::rows(schedule);
    let degenerate: Vec<usize> = (1..remark)
        .rev()
        .filter(|index| {
            table::cells(rows[*index])
                .last()
                .map(|cell| DEGENERATE_VALUES.contains(&table::cell_text(cell).trim()))
                .unwrap_or(false)
        })
        .collect();
    // descending order keeps the remaining indexes valid
    for index in &degenerate {
        table::remove_row(schedule, *index);
    }
    Some(degenerate.len())
}
