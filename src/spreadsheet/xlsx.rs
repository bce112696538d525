use crate::error::ReportError;
use crate::error::ResultMessage;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::cell::NumberFormat;
use crate::spreadsheet::criteria::Criteria;
use crate::spreadsheet::excel;
use crate::spreadsheet::excel::load_relationships;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::SpreadsheetError;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts"); // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");   // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");  // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");         // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");   // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");       // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                  // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");             // Worksheet definition
const TAG_ROW: QName = QName(b"row");                 // Row in worksheet
const TAG_CELL: QName = QName(b"c");                  // Cell in worksheet
const TAG_FORMULA: QName = QName(b"f");               // Cell formula
const TAG_INLINE_STRING: QName = QName(b"is");        // Inline string value
const TAG_VALUE: QName = QName(b"v");                 // Cell value content

/// An opened XLSX package
pub(crate) struct XlsxWorkbook {
    /// Name of the workbook used in messages
    pub(crate) name: String,
    /// ZIP archive containing the XLSX file contents
    zip: ZipArchive<UnifiedReader>,
    /// Parsed number formats indexed by cell style
    number_formats: Vec<NumberFormat>,
    /// List of worksheets with (name, zip_path) pairs
    sheets: Vec<(String, String)>,
}

impl XlsxWorkbook {
    /// Opens an XLSX package and parses its structure
    ///
    /// # Arguments
    /// * `name` - Workbook name used in messages
    /// * `reader` - Package content
    ///
    /// # Returns
    /// Result containing the initialized XlsxWorkbook or an error
    pub(crate) fn open(name: &str, reader: UnifiedReader) -> Result<XlsxWorkbook, ReportError> {
        let (zip, number_formats, sheets) = excel::open(name, reader, load_workbook, load_number_formats)?;
        Ok(XlsxWorkbook {
            name: name.to_owned(),
            zip,
            number_formats,
            sheets,
        })
    }

    /// Names of all worksheets in workbook order
    pub(crate) fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|(name, _)| name.to_owned()).collect()
    }

    /// Loads the shared string table; a workbook without one yields an empty table
    fn load_shared_strings(&mut self) -> Result<Vec<String>, ReportError> {
        let mut shared_strings = Vec::<String>::new();
        let mut reader = match self.zip.xml_reader("xl/sharedStrings.xml")? {
            Some(reader) => reader,
            None => return Ok(shared_strings),
        };

        match_xml_events!(reader => {
            Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
                let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
                shared_strings.push(string);
            }
        });
        Ok(shared_strings)
    }

    /// Reads every worksheet accepted by the criteria into an addressable grid
    ///
    /// Cached values are used for formula cells; the formula itself is only recorded
    /// as a flag so callers can detect workbooks saved without calculation.
    ///
    /// # Arguments
    /// * `criteria` - Selection criteria for which sheets to load
    ///
    /// # Returns
    /// Vector of Sheet objects in workbook order
    pub(crate) fn read_sheets(&mut self, criteria: &Criteria) -> Result<Vec<Sheet>, ReportError> {
        let shared_strings = self.load_shared_strings()?;
        let mut sheets = Vec::<Sheet>::new();
        for (sheet_name, zip_path) in self.sheets.clone() {
            if !criteria.accept(&sheet_name) {
                continue;
            }
            let mut reader = self.zip.xml_reader(&zip_path)?
                .ok_or_else(|| SpreadsheetError::FileError(zip_path.to_owned()))?;
            let sheet = read_sheet(&mut reader, &sheet_name, &self.number_formats, &shared_strings)
                .with_prefix(&format!("Read sheet '{}' of '{}'", sheet_name, self.name))?;
            sheets.push(sheet);
        }

        Ok(sheets)
    }
}

/// Parses one worksheet part
fn read_sheet<R: BufRead>(
    reader: &mut XmlReader<R>,
    sheet_name: &str,
    number_formats: &[NumberFormat],
    shared_strings: &[String],
) -> Result<Sheet, ReportError> {
    let mut sheet = Sheet::new(sheet_name);
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut current = Cell::default();
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            if let Some(row) = event.parse_attribute_value::<usize>("r")? {
                row_count = row.saturating_sub(1);
            }
            col_count = 0;
        }
        Event::End(event) if event.name() == TAG_ROW => {
            row_count += 1;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            let (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count = col + 1;
            let mut kind = event.get_attribute_value("t")?.map(|t| {
                match t.as_ref() {
                    "inlineStr" | "str" => CellType::InlineString,
                    "s" => CellType::SharedString,
                    "d" => CellType::IsoDateTime,
                    "b" => CellType::Boolean,
                    "e" => CellType::Error,
                    _ => CellType::Number,
                }
            }).unwrap_or(CellType::Number);
            let mut decimals = None;
            if let Some(format_id) = event.get_attribute_value("s")? {
                if !format_id.is_empty() {
                    let index = format_id.parse::<usize>()?;
                    if let Some(format) = number_formats.get(index) {
                        if kind == CellType::Number {
                            kind = format.kind;
                        }
                        decimals = format.decimals;
                    }
                }
            }
            current = Cell { row, col, kind, decimals, ..Cell::default() };
            value.clear();
            sheet.touch(row);
        }
        Event::Start(event) if event.name() == TAG_FORMULA => {
            current.has_formula = true;
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = read_string_value(reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = read_string_value(reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if !value.is_empty() {
                if current.kind == CellType::SharedString {
                    let index = value.trim().parse::<usize>()?;
                    current.value = shared_strings.get(index).cloned().unwrap_or_default();
                } else {
                    current.value = std::mem::take(&mut value);
                }
                sheet.push(std::mem::take(&mut current));
            } else if current.has_formula {
                current.kind = CellType::Empty;
                sheet.push(std::mem::take(&mut current));
            }
            value.clear();
        }
    });
    Ok(sheet)
}

/// Loads workbook structure and worksheet information from XLSX file
///
/// Parses the workbook.xml file to extract worksheet names and their corresponding
/// XML file paths, and determines the date system (1900 vs 1904) used in the file.
///
/// # Arguments
/// * `zip` - ZIP archive containing the XLSX file
///
/// # Returns
/// Tuple of (worksheets, is_1904_date_system) where worksheets are (name, zip_path) pairs
fn load_workbook(zip: &mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, bool), ReportError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip.xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SpreadsheetError::FileError("xl/workbook.xml".to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id.to_string()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads number formats and cell styles from XLSX styles.xml file
///
/// # Arguments
/// * `zip` - ZIP archive containing the XLSX file
/// * `is_1904` - Whether the file uses the 1904 date system
///
/// # Returns
/// Vector of NumberFormat values indexed by style ID
fn load_number_formats(zip: &mut ZipArchive<UnifiedReader>, is_1904: bool) -> Result<Vec<NumberFormat>, ReportError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, NumberFormat>::new();

    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), NumberFormat::custom(&format, is_1904));
            }
        }

        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => break,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?
                .map(|id| id.to_string())
                .unwrap_or_else(|| "0".to_owned());
            format_indexes.push(id);
        }
    });

    Ok(excel::load_number_formats(format_indexes, custom_formats, is_1904))
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Extracts string content from XML elements, skipping phonetic text annotations.
///
/// # Arguments
/// * `reader` - XML reader positioned at the start of the string content
/// * `end_tag` - XML tag that marks the end of the string content
/// * `is_text_content` - Whether to treat the content as text by default
///
/// # Returns
/// Extracted string value
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, ReportError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str, formats: &[NumberFormat], strings: &[String]) -> Sheet {
        let mut reader = XmlReader::new(xml.as_bytes());
        read_sheet(&mut reader, "Sheet1", formats, strings).unwrap()
    }

    #[test]
    fn sheet_cells_resolve_strings_formats_and_formulas() {
        let formats = vec![
            NumberFormat::custom("General", false),
            NumberFormat::custom("0.00", false),
        ];
        let strings = vec!["K0+100".to_owned()];
        let sheet = parse(r#"<worksheet><sheetData>
            <row r="5"><c r="B5" t="s"><v>0</v></c><c r="C5" s="1"><v>1.476</v></c></row>
            <row r="7"><c r="AC7" t="e"><f>X7/0</f><v>#DIV/0!</v></c><c r="AD7" t="inlineStr"><is><t>a&amp;b</t></is></c></row>
            <row r="9"><c r="A9" s="1"/></row>
        </sheetData></worksheet>"#, &formats, &strings);

        assert_eq!(sheet.display(5, 2), "K0+100");
        assert_eq!(sheet.display(5, 3), "1.48");
        assert_eq!(sheet.display(7, 29), "#DIV/0!");
        assert_eq!(sheet.display(7, 30), "a&b");
        assert!(sheet.cell(6, 28).map(|cell| cell.has_formula).unwrap_or(false));
        assert_eq!(sheet.max_row(), 9);
    }

    #[test]
    fn cells_without_references_follow_row_order() {
        let sheet = parse(r#"<worksheet><sheetData>
            <row><c><v>1</v></c><c><v>2.5</v></c></row>
            <row><c t="b"><v>1</v></c></row>
        </sheetData></worksheet>"#, &[], &[]);

        assert_eq!(sheet.display(1, 1), "1");
        assert_eq!(sheet.display(1, 2), "2.5");
        assert_eq!(sheet.display(2, 1), "True");
    }

    #[test]
    fn phonetic_runs_are_skipped() -> Result<(), ReportError> {
        let mut reader = XmlReader::new(r#"<si><t>压实</t><rPh><t>ya</t></rPh></si>"#.as_bytes());
        reader.next()?;
        let text = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
        assert_eq!(text, "压实");
        Ok(())
    }
}
