use crate::document::node::XmlElement;
use crate::document::node::XmlNode;
use crate::document::table;
use crate::document::word;
use crate::document::word::RunFormat;
use crate::document::Document;
use crate::engine::config::FontConfig;
use crate::engine::EngineError;
use crate::error::ReportError;

/// Heading that introduces the template schedule
pub(crate) const ANCHOR_PREFIX: &str = "附表1";
/// First-cell marker of the remark row
pub(crate) const REMARK_MARKER: &str = "备注";
/// Title of a schedule as written in the template
pub(crate) const DEFAULT_TITLE: &str = "压实度检测结果表（承台回填土）";
/// Part of the title replaced by the section label
pub(crate) const TITLE_PLACEHOLDER: &str = "承台回填土";

/// Body positions of the template heading and table
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct TemplateAnchor {
    pub(crate) heading: usize,
    pub(crate) table: usize,
}

/// Finds the first paragraph starting with `附表1` and the first table after it
pub(crate) fn locate_anchor(document: &Document) -> Result<TemplateAnchor, ReportError> {
    let heading = document
        .find_block(0, |block| block.is("w:p") && word::paragraph_text(block).starts_with(ANCHOR_PREFIX))
        .ok_or(EngineError::TemplateAnchorNotFoundError)?;
    let table = document
        .find_block(heading + 1, |block| block.is("w:tbl"))
        .ok_or(EngineError::TemplateTableNotFoundError)?;
    Ok(TemplateAnchor { heading, table })
}

/// Whether a row is the remark row
pub(crate) fn is_remark_row(row: &XmlElement) -> bool {
    table::row_cell_text(row, 0)
        .map(|text| text.contains(REMARK_MARKER))
        .unwrap_or(false)
}

/// Index of the remark row of a table
pub(crate) fn remark_row_index(table: &XmlElement) -> Option<usize> {
    table::find_row(table, |text| text.contains(REMARK_MARKER))
}

/// Number of data rows: everything between the header row and the remark row
pub(crate) fn data_row_count(table: &XmlElement) -> usize {
    let rows = table::row_count(table);
    let remark = if remark_row_index(table).is_some() { 1 } else { 0 };
    rows.saturating_sub(1 + remark)
}

/// Pieces of the template schedule, copied before anything is modified
#[derive(Clone, Debug)]
pub(crate) struct TemplateSnapshot {
    properties: Option<XmlElement>,
    grid: Option<XmlElement>,
    widths: Vec<Option<String>>,
    header: XmlElement,
    exemplar: XmlElement,
    remark: Option<XmlElement>,
    /// Run properties used for schedule headings
    pub(crate) heading_properties: XmlElement,
}

impl TemplateSnapshot {
    /// Captures the template table and the formatting of its heading
    ///
    /// # Arguments
    /// * `document` - Document holding the template
    /// * `anchor` - Positions of the heading and table
    /// * `fonts` - Supplies the heading format when the heading has none
    ///
    /// # Returns
    /// The snapshot; fails when the table has no data row after its header
    pub(crate) fn capture(document: &Document, anchor: &TemplateAnchor, fonts: &FontConfig) -> Result<Self, ReportError> {
        let template = document.block(anchor.table).ok_or(EngineError::TemplateTableNotFoundError)?;
        let rows = table::rows(template);
        let header = rows.first().ok_or(EngineError::TemplateWithoutDataRowError)?;
        let exemplar = rows.get(1)
            .filter(|row| !is_remark_row(row))
            .ok_or(EngineError::TemplateWithoutDataRowError)?;
        let remark = rows.iter().find(|row| is_remark_row(row)).map(|row| (*row).clone());

        let heading_properties = document
            .block(anchor.heading)
            .and_then(heading_format)
            .unwrap_or_else(|| RunFormat::new(&fonts.cjk, fonts.heading_size, true).properties());

        Ok(TemplateSnapshot {
            properties: template.child("w:tblPr").cloned(),
            grid: template.child("w:tblGrid").cloned(),
            widths: table::column_widths(template),
            header: (*header).clone(),
            exemplar: (*exemplar).clone(),
            remark,
            heading_properties,
        })
    }

    /// Builds a detached table: properties, grid, header, `data_rows` copies of the
    /// exemplar row, then the remark row
    pub(crate) fn clone_table(&self, data_rows: usize) -> XmlElement {
        let mut clone = XmlElement::new("w:tbl");
        for part in [&self.properties, &self.grid].into_iter().flatten() {
            clone.children.push(XmlNode::Element(part.clone()));
        }
        clone.children.push(XmlNode::Element(self.header.clone()));
        for _ in 0..data_rows {
            clone.children.push(XmlNode::Element(self.exemplar.clone()));
        }
        if let Some(remark) = &self.remark {
            clone.children.push(XmlNode::Element(remark.clone()));
        }
        table::apply_column_widths(&mut clone, &self.widths);
        clone
    }

    /// Heading paragraph of a new schedule, centered
    pub(crate) fn heading_paragraph(&self, number: usize, label: &str) -> XmlElement {
        let mut paragraph = word::new_paragraph(
            Some("center"),
            vec![word::text_run(&format!("附表{number} {DEFAULT_TITLE}"), Some(self.heading_properties.clone()))],
        );
        self.relabel_heading(&mut paragraph, number, label);
        paragraph
    }

    /// Puts the section label into a schedule heading.
    ///
    /// The placeholder of the standard title is replaced; any other heading is
    /// rewritten as `附表{number} {label}`. An empty label leaves the heading alone.
    pub(crate) fn relabel_heading(&self, paragraph: &mut XmlElement, number: usize, label: &str) {
        if label.trim().is_empty() {
            return;
        }
        let text = word::paragraph_text(paragraph);
        let relabelled = if text.contains(DEFAULT_TITLE) {
            text.replace(TITLE_PLACEHOLDER, label)
        } else {
            format!("附表{number} {label}")
        };
        word::replace_runs(paragraph, vec![word::text_run(&relabelled, Some(self.heading_properties.clone()))]);
        word::set_alignment(paragraph, "center");
    }
}

/// Run properties of the heading's first run when they name a font and a size
fn heading_format(heading: &XmlElement) -> Option<XmlElement> {
    word::first_run_properties(heading).filter(|properties| properties.child("w:rFonts").is_some() && properties.child("w:sz").is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::parse;
    use crate::engine::tests::document_with_body;
    use pretty_assertions::assert_eq;

    const BODY: &str = r#"<w:body>
        <w:p><w:r><w:t>前言</w:t></w:r></w:p>
        <w:p><w:r><w:rPr><w:rFonts w:ascii="黑体" w:eastAsia="黑体"/><w:b/><w:sz w:val="18"/></w:rPr><w:t>附表1 压实度检测结果表（承台回填土）</w:t></w:r></w:p>
        <w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid><w:gridCol w:w="700"/><w:gridCol w:w="900"/></w:tblGrid>
          <w:tr><w:tc><w:p><w:r><w:t>序号</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>压实度</w:t></w:r></w:p></w:tc></w:tr>
          <w:tr><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>
          <w:tr><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>
          <w:tr><w:tc><w:p><w:r><w:t>备注</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>说明</w:t></w:r></w:p></w:tc></w:tr>
        </w:tbl>
        <w:sectPr/>
    </w:body>"#;

    fn document() -> Document {
        document_with_body(BODY)
    }

    #[test]
    fn anchor_and_snapshot() {
        let document = document();
        let anchor = locate_anchor(&document).unwrap();
        assert_eq!(anchor, TemplateAnchor { heading: 1, table: 2 });

        let snapshot = TemplateSnapshot::capture(&document, &anchor, &FontConfig::default()).unwrap();
        assert_eq!(remark_row_index(&snapshot.clone_table(1)), Some(2));
        assert_eq!(snapshot.heading_properties.child("w:rFonts").and_then(|fonts| fonts.attribute("w:ascii")), Some("黑体"));
        assert_eq!(data_row_count(document.block(anchor.table).unwrap()), 2);
    }

    #[test]
    fn clones_have_requested_rows_and_stay_independent() {
        let document = document();
        let anchor = locate_anchor(&document).unwrap();
        let snapshot = TemplateSnapshot::capture(&document, &anchor, &FontConfig::default()).unwrap();

        let mut clone = snapshot.clone_table(5);
        assert_eq!(table::row_count(&clone), 7);
        assert_eq!(data_row_count(&clone), 5);
        assert_eq!(remark_row_index(&clone), Some(6));
        assert!(clone.child("w:tblGrid").is_some());

        table::remove_row(&mut clone, 0);
        let again = snapshot.clone_table(5);
        assert_eq!(table::row_count(&again), 7);
        assert_eq!(table::row_cell_text(table::row(&again, 0).unwrap(), 0), Some("序号".to_owned()));
    }

    #[test]
    fn headings_take_the_label() {
        let document = document();
        let anchor = locate_anchor(&document).unwrap();
        let snapshot = TemplateSnapshot::capture(&document, &anchor, &FontConfig::default()).unwrap();

        let heading = snapshot.heading_paragraph(3, "K0+100路基");
        assert_eq!(word::paragraph_text(&heading), "附表3 压实度检测结果表（K0+100路基）");

        let unlabelled = snapshot.heading_paragraph(4, "");
        assert_eq!(word::paragraph_text(&unlabelled), "附表4 压实度检测结果表（承台回填土）");

        let mut other = word::new_paragraph(None, vec![word::text_run("附表1 说明", None)]);
        snapshot.relabel_heading(&mut other, 1, "承台");
        assert_eq!(word::paragraph_text(&other), "附表1 承台");
    }

    #[test]
    fn missing_anchor_or_rows_are_fatal() {
        let mut document = document();
        document.body = parse("body", "<w:body><w:p><w:r><w:t>附表1</w:t></w:r></w:p></w:body>".as_bytes()).unwrap();
        assert!(matches!(
            locate_anchor(&document),
            Err(ReportError::EngineError(EngineError::TemplateTableNotFoundError))
        ));

        document.body = parse("body", "<w:body><w:p><w:r><w:t>附表1</w:t></w:r></w:p><w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl></w:body>".as_bytes()).unwrap();
        let anchor = locate_anchor(&document).unwrap();
        assert!(TemplateSnapshot::capture(&document, &anchor, &FontConfig::default()).is_err());
    }
}
