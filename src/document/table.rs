//! Table helpers: rows, cells, and cell text
use crate::document::node::XmlElement;
use crate::document::node::XmlNode;
use crate::document::word::new_paragraph;
use crate::document::word::paragraph_text;

/// Children of `w:tcPr` in schema order
pub(crate) const TC_PR_ORDER: [&str; 13] = [
    "w:cnfStyle", "w:tcW", "w:gridSpan", "w:hMerge", "w:vMerge", "w:tcBorders", "w:shd", "w:noWrap",
    "w:tcMar", "w:textDirection", "w:tcFitText", "w:vAlign", "w:hideMark",
];

/// Cell properties always lead the cell
pub(crate) const CELL_ORDER: [&str; 1] = ["w:tcPr"];

pub(crate) fn rows(table: &XmlElement) -> Vec<&XmlElement> {
    table.children_named("w:tr").collect()
}

pub(crate) fn row_count(table: &XmlElement) -> usize {
    table.children_named("w:tr").count()
}

pub(crate) fn row(table: &XmlElement, index: usize) -> Option<&XmlElement> {
    table.children_named("w:tr").nth(index)
}

pub(crate) fn row_mut(table: &mut XmlElement, index: usize) -> Option<&mut XmlElement> {
    table.elements_mut().filter(|element| element.is("w:tr")).nth(index)
}

/// Removes the row with the given index among the table's rows
pub(crate) fn remove_row(table: &mut XmlElement, index: usize) -> Option<XmlElement> {
    let position = *table.positions_of("w:tr").get(index)?;
    match table.children.remove(position) {
        XmlNode::Element(row) => Some(row),
        XmlNode::Text(_) => None,
    }
}

/// Appends a row after the last existing row
pub(crate) fn push_row(table: &mut XmlElement, row: XmlElement) {
    let position = table.positions_of("w:tr").last().map(|position| position + 1).unwrap_or(table.children.len());
    table.children.insert(position, XmlNode::Element(row));
}

pub(crate) fn cells(row: &XmlElement) -> Vec<&XmlElement> {
    row.children_named("w:tc").collect()
}

pub(crate) fn cell_mut(row: &mut XmlElement, index: usize) -> Option<&mut XmlElement> {
    row.elements_mut().filter(|element| element.is("w:tc")).nth(index)
}

/// Text of a cell, its paragraphs joined with `\n`
pub(crate) fn cell_text(cell: &XmlElement) -> String {
    cell.children_named("w:p")
        .map(paragraph_text)
        .collect::<Vec<String>>()
        .join("\n")
}

/// Text of the cell at `index` of a row; missing cells read as empty
pub(crate) fn row_cell_text(row: &XmlElement, index: usize) -> Option<String> {
    row.children_named("w:tc").nth(index).map(cell_text)
}

/// Index of the first row whose first cell satisfies the predicate
pub(crate) fn find_row<P>(table: &XmlElement, predicate: P) -> Option<usize>
where
    P: Fn(&str) -> bool,
{
    rows(table)
        .iter()
        .position(|row| row_cell_text(row, 0).map(|text| predicate(&text)).unwrap_or(false))
}

/// Replaces the paragraphs of a cell with one new paragraph
pub(crate) fn set_cell_content(cell: &mut XmlElement, alignment: Option<&str>, runs: Vec<XmlElement>) {
    clear_cell(cell);
    cell.children.push(XmlNode::Element(new_paragraph(alignment, runs)));
}

/// Removes every paragraph of a cell
pub(crate) fn clear_cell(cell: &mut XmlElement) {
    cell.remove_children("w:p");
}

/// Cell properties, created when missing
pub(crate) fn cell_properties(cell: &mut XmlElement) -> &mut XmlElement {
    cell.ensure_child("w:tcPr", &CELL_ORDER)
}

pub(crate) fn set_vertical_alignment(cell: &mut XmlElement, alignment: &str) {
    cell_properties(cell)
        .ensure_child("w:vAlign", &TC_PR_ORDER)
        .set_attribute("w:val", alignment);
}

/// Column widths from the table grid
pub(crate) fn column_widths(table: &XmlElement) -> Vec<Option<String>> {
    table.child("w:tblGrid")
        .map(|grid| grid.children_named("w:gridCol")
            .map(|column| column.attribute("w:w").map(str::to_owned))
            .collect())
        .unwrap_or_default()
}

/// Writes the widths back to the grid and to each cell's `w:tcW` (cells spanning
/// several grid columns keep their own width)
pub(crate) fn apply_column_widths(table: &mut XmlElement, widths: &[Option<String>]) {
    if let Some(grid) = table.child_mut("w:tblGrid") {
        for (column, width) in grid.elements_mut().filter(|element| element.is("w:gridCol")).zip(widths) {
            if let Some(width) = width {
                column.set_attribute("w:w", width);
            }
        }
    }
    for row in table.elements_mut().filter(|element| element.is("w:tr")) {
        for (cell, width) in row.elements_mut().filter(|element| element.is("w:tc")).zip(widths) {
            let spanned = cell.child("w:tcPr").and_then(|properties| properties.child("w:gridSpan")).is_some();
            if let (Some(width), false) = (width, spanned) {
                let cell_width = cell_properties(cell).ensure_child("w:tcW", &TC_PR_ORDER);
                cell_width.set_attribute("w:w", width);
                cell_width.set_attribute("w:type", "dxa");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::parse;
    use crate::document::word::text_run;
    use pretty_assertions::assert_eq;

    const TABLE: &str = r#"<w:tbl><w:tblPr/><w:tblGrid><w:gridCol w:w="800"/><w:gridCol w:w="1200"/></w:tblGrid>
        <w:tr><w:tc><w:p><w:r><w:t>序号</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>压实度</w:t></w:r></w:p></w:tc></w:tr>
        <w:tr><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>
        <w:tr><w:tc><w:p><w:r><w:t>备注</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr>
        </w:tbl>"#;

    fn table() -> XmlElement {
        parse("test", TABLE.as_bytes()).unwrap()
    }

    #[test]
    fn rows_and_cells_are_indexed() {
        let table = table();
        assert_eq!(row_count(&table), 3);
        assert_eq!(row_cell_text(rows(&table)[2], 1), Some("a\nb".to_owned()));
        assert_eq!(row_cell_text(rows(&table)[2], 5), None);
        assert_eq!(find_row(&table, |text| text.contains("备注")), Some(2));
    }

    #[test]
    fn remove_and_push_rows() {
        let mut table = table();
        let removed = remove_row(&mut table, 1).unwrap();
        assert_eq!(row_count(&table), 2);
        push_row(&mut table, removed);
        assert_eq!(row_count(&table), 3);
        assert_eq!(row_cell_text(row(&table, 1).unwrap(), 0), Some("备注".to_owned()));
        assert!(remove_row(&mut table, 7).is_none());
    }

    #[test]
    fn cell_content_is_replaced_with_properties_first() {
        let mut table = table();
        let row = row_mut(&mut table, 1).unwrap();
        let cell = cell_mut(row, 0).unwrap();
        set_cell_content(cell, Some("center"), vec![text_run("1", None)]);
        set_vertical_alignment(cell, "center");
        assert_eq!(
            cell.to_xml(),
            r#"<w:tc><w:tcPr><w:vAlign w:val="center"/></w:tcPr><w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:t>1</w:t></w:r></w:p></w:tc>"#
        );
    }

    #[test]
    fn widths_are_applied_to_grid_and_cells() {
        let mut table = table();
        let widths = column_widths(&table);
        assert_eq!(widths, vec![Some("800".to_owned()), Some("1200".to_owned())]);
        apply_column_widths(&mut table, &widths);
        let row = row(&table, 0).unwrap();
        let width = cells(row)[1].child("w:tcPr").and_then(|properties| properties.child("w:tcW")).and_then(|width| width.attribute("w:w"));
        assert_eq!(width, Some("1200"));
    }
}
