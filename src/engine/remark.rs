use crate::document::node::XmlElement;
use crate::document::node::XmlNode;
use crate::document::table;
use crate::document::word;
use crate::document::Document;
use crate::engine::config::SectionLayout;
use crate::engine::progress::Reporter;
use crate::engine::GeneratedTable;
use crate::spreadsheet::Sheet;
use chrono::Datelike;
use chrono::NaiveDate;

const DENSITY_KEY: &str = "最大干密度：";
const MOISTURE_KEY: &str = "最佳含水率：";
const DEFAULT_DENSITY: &str = "最大干密度：1.48g/cm3";
const DEFAULT_MOISTURE: &str = "最佳含水率：14.4%";
const DEFAULT_DATE: &str = "检测日期：2024年7月1日；检测方法：灌砂法";

/// Accepted layouts of the inspection date cell
const DATE_FORMATS: [&str; 3] = ["%Y.%m.%d", "%Y-%m-%d", "%Y/%m/%d"];

/// Worksheet values substituted into a remark
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RemarkValues {
    pub(crate) density: String,
    pub(crate) moisture: String,
    pub(crate) date: String,
}

impl RemarkValues {
    /// Reads the density, moisture and date cells of a section
    pub(crate) fn read(sheet: &Sheet, layout: &SectionLayout, section: usize) -> Self {
        let offset = section * layout.row_increment;
        RemarkValues {
            density: sheet.display_at(&layout.density_cell, offset),
            moisture: sheet.display_at(&layout.moisture_cell, offset),
            date: sheet.display_at(&layout.date_cell, offset),
        }
    }
}

/// Rewrites the date as `Y年M月D日`; anything unparseable is returned trimmed
pub(crate) fn format_chinese_date(raw: &str) -> String {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .map(|date| format!("{}年{}月{}日", date.year(), date.month(), date.day()))
        .unwrap_or_else(|| trimmed.to_owned())
}

/// Substitutes the worksheet values into a remark text
///
/// # Returns
/// The new text and one message per substitution that could not be made
pub(crate) fn rewrite_text(text: &str, values: &RemarkValues) -> (String, Vec<String>) {
    let mut rewritten = text.to_owned();
    let mut problems = Vec::new();

    if text.contains(DENSITY_KEY) && text.contains(MOISTURE_KEY) {
        let substitutions = [
            (DEFAULT_DENSITY, format!("{}{}g/cm3", DENSITY_KEY, values.density)),
            (DEFAULT_MOISTURE, format!("{}{}%", MOISTURE_KEY, values.moisture)),
        ];
        for (literal, replacement) in substitutions {
            if rewritten.contains(literal) {
                rewritten = rewritten.replace(literal, &replacement);
            } else {
                problems.push(format!("remark does not contain '{}'", literal));
            }
        }
    }

    if rewritten.contains(DEFAULT_DATE) {
        let date = format!("检测日期：{}；检测方法：灌砂法", format_chinese_date(&values.date));
        rewritten = rewritten.replace(DEFAULT_DATE, &date);
    } else {
        problems.push(format!("remark does not contain '{}'", DEFAULT_DATE));
    }

    (rewritten, problems)
}

/// Rewrites the remark row of every generated schedule with the values of the
/// section the schedule was built from
pub(crate) fn rewrite_remarks(
    document: &mut Document,
    tables: &[GeneratedTable],
    sheets: &[Sheet],
    layout: &SectionLayout,
    reporter: &mut Reporter,
) {
    for (number, generated) in tables.iter().enumerate() {
        let name = format!("附表{}", number + 1);
        let sheet = match sheets.get(generated.sheet) {
            Some(sheet) => sheet,
            None => continue,
        };
        let values = RemarkValues::read(sheet, layout, generated.section);
        let schedule = match document.block_mut(generated.position) {
            Some(schedule) if schedule.is("w:tbl") => schedule,
            _ => {
                reporter.warn(&format!("{} is not a table any more, remark skipped", name));
                continue;
            }
        };
        let remark = match table::find_row(schedule, |text| text.trim() == "备注") {
            Some(remark) => remark,
            None => {
                reporter.warn(&format!("{} has no remark row", name));
                continue;
            }
        };
        let row = match table::row_mut(schedule, remark) {
            Some(row) => row,
            None => continue,
        };
        let cell = match table::cell_mut(row, 1) {
            Some(cell) => cell,
            None => {
                reporter.warn(&format!("Remark row of {} has no second cell", name));
                continue;
            }
        };

        let text = table::cell_text(cell);
        let (rewritten, problems) = rewrite_text(&text, &values);
        for problem in problems {
            reporter.warn(&format!("{}: {}", name, problem));
        }
        if rewritten != text {
            replace_cell_text(cell, &rewritten);
            reporter.info(&format!("Remark of {} updated", name));
        }
    }
}

/// Replaces the text of a cell, one paragraph per line, keeping the formatting
/// of its first paragraph and first run
fn replace_cell_text(cell: &mut XmlElement, text: &str) {
    let first = cell.child("w:p");
    let paragraph_properties = first.and_then(|paragraph| paragraph.child("w:pPr")).cloned();
    let run_properties = first.and_then(word::first_run_properties);

    table::clear_cell(cell);
    for line in text.split('\n') {
        let mut paragraph = XmlElement::new("w:p");
        if let Some(properties) = &paragraph_properties {
            paragraph.children.push(XmlNode::Element(properties.clone()));
        }
        paragraph.children.push(XmlNode::Element(word::text_run(line, run_properties.clone())));
        cell.children.push(XmlNode::Element(paragraph));
    }
}
