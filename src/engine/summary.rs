use crate::document::node::XmlElement;
use crate::document::table;
use crate::document::word;
use crate::document::word::RunFormat;
use crate::document::word::ScriptFonts;
use crate::document::Document;
use crate::engine::config::EngineConfig;
use crate::engine::progress::Reporter;
use crate::engine::template::data_row_count;
use crate::engine::template::remark_row_index;
use crate::engine::GeneratedTable;
use regex::Regex;

/// Headings under which the summary table is found, tried in order
pub(crate) const HEADING_VARIANTS: [&str; 8] = [
    "表2 压实度检测结果评定表",
    "表2  压实度检测结果评定表",
    "表2压实度检测结果评定表",
    "表2：压实度检测结果评定表",
    "表2.压实度检测结果评定表",
    "表2-压实度检测结果评定表",
    "表2 压实度检测结果",
    "表2 压实度评定表",
];

/// First summary row holding schedule data; earlier rows are headers
pub(crate) const FIRST_DATA_ROW: usize = 2;

pub(crate) fn is_summary_heading(text: &str) -> bool {
    let text = text.trim();
    HEADING_VARIANTS.iter().any(|variant| text.contains(variant))
}

/// Body position of the first table after the summary heading
pub(crate) fn locate_summary_table(document: &Document) -> Option<usize> {
    let heading = document.find_block(0, |block| block.is("w:p") && is_summary_heading(&word::paragraph_text(block)))?;
    document.find_block(heading + 1, |block| block.is("w:tbl"))
}

/// Figures of one schedule as shown in the summary table
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScheduleStatistics {
    /// Mean of the last-column values with one decimal; `None` without numeric values
    pub(crate) mean: Option<String>,
    pub(crate) tested: usize,
    pub(crate) passed: usize,
    pub(crate) rate: String,
}

/// Formats a pass rate with one decimal, dropping a trailing `.0`
pub(crate) fn format_rate(rate: f64) -> String {
    let formatted = format!("{:.1}", rate);
    match formatted.strip_suffix(".0") {
        Some(whole) => whole.to_owned(),
        None => formatted,
    }
}

/// Numeric last-column values of the data rows; a trailing `%` is ignored
fn last_column_values(schedule: &XmlElement) -> Vec<f64> {
    let rows = table::rows(schedule);
    let end = remark_row_index(schedule).unwrap_or(rows.len());
    rows.iter()
        .take(end)
        .skip(1)
        .filter_map(|row| table::cells(row).last().map(|cell| table::cell_text(cell)))
        .filter_map(|text| text.trim().trim_end_matches('%').trim().parse::<f64>().ok())
        .collect()
}

/// Computes the summary figures of a schedule
///
/// # Arguments
/// * `schedule` - The schedule table after pruning
/// * `threshold` - Minimum value of a passing point
/// * `assume_all_points_pass` - Report every tested point as passed
pub(crate) fn schedule_statistics(schedule: &XmlElement, threshold: f64, assume_all_points_pass: bool) -> ScheduleStatistics {
    let values = last_column_values(schedule);
    let mean = if values.is_empty() {
        None
    } else {
        Some(format!("{:.1}", values.iter().sum::<f64>() / values.len() as f64))
    };
    let tested = data_row_count(schedule);
    let (passed, rate) = if assume_all_points_pass {
        (tested, "100".to_owned())
    } else {
        let passed = values.iter().filter(|value| **value >= threshold).count().min(tested);
        let rate = if tested == 0 { 0.0 } else { passed as f64 * 100.0 / tested as f64 };
        (passed, format_rate(rate))
    };
    ScheduleStatistics { mean, tested, passed, rate }
}

/// Label of a schedule taken from its heading: the text in parentheses, or
/// whatever follows the schedule number
pub(crate) fn label_from_heading(heading: &str, number: usize) -> Option<String> {
    let pattern = Regex::new(r"[（(](.*?)[）)]").expect("Hardcode regex pattern");
    if let Some(value) = pattern.captures(heading).and_then(|captures| captures.get(1)) {
        let value = value.as_str().trim();
        if !value.is_empty() {
            return Some(value.to_owned());
        }
    }
    heading
        .split_once(&format!("附表{}", number))
        .map(|(_, rest)| rest.trim().to_owned())
        .filter(|rest| !rest.is_empty())
}

/// Writes one row per generated schedule into the summary table, starting at row 2.
/// Missing rows are cloned from row 2.
///
/// # Returns
/// Body position of the summary table, `None` when the document has none
pub(crate) fn update_summary(
    document: &mut Document,
    tables: &[GeneratedTable],
    config: &EngineConfig,
    reporter: &mut Reporter,
) -> Option<usize> {
    let position = match locate_summary_table(document) {
        Some(position) => position,
        None => {
            reporter.warn("Summary table '表2 压实度检测结果评定表' not found, summary and narrative skipped");
            return None;
        }
    };

    let mut rows = Vec::with_capacity(tables.len());
    for (index, generated) in tables.iter().enumerate() {
        let number = index + 1;
        let statistics = match document.block(generated.position) {
            Some(schedule) => schedule_statistics(schedule, config.threshold, config.assume_all_points_pass),
            None => continue,
        };
        if statistics.mean.is_none() {
            reporter.warn(&format!("附表{} has no numeric value in its last column", number));
        }
        let label = if generated.label.trim().is_empty() {
            document
                .block(generated.heading)
                .and_then(|heading| label_from_heading(&word::paragraph_text(heading), number))
                .unwrap_or_default()
        } else {
            generated.label.trim().to_owned()
        };
        reporter.info(&format!(
            "附表{}: mean {}, {} tested, {} passed",
            number,
            statistics.mean.as_deref().unwrap_or("-"),
            statistics.tested,
            statistics.passed
        ));
        rows.push((number, label, statistics));
    }

    let summary = document.block_mut(position)?;
    let fonts = ScriptFonts {
        cjk: config.fonts.cjk.clone(),
        other: config.fonts.latin.clone(),
    };
    for (number, label, statistics) in rows {
        let index = FIRST_DATA_ROW + number - 1;
        if !ensure_row(summary, index) {
            reporter.warn("Summary table has no data row to copy");
            break;
        }
        if let Some(row) = table::row_mut(summary, index) {
            write_row(row, number, &label, &statistics, config, &fonts);
        }
    }
    Some(position)
}

/// Makes row `index` exist by appending copies of the first data row
fn ensure_row(summary: &mut XmlElement, index: usize) -> bool {
    let reference = match table::row(summary, FIRST_DATA_ROW).or_else(|| table::rows(summary).last().copied()) {
        Some(reference) => reference.clone(),
        None => return false,
    };
    while table::row_count(summary) <= index {
        let mut row = reference.clone();
        for cell in row.elements_mut().filter(|element| element.is("w:tc")) {
            table::set_cell_content(cell, Some("center"), Vec::new());
        }
        table::push_row(summary, row);
    }
    true
}

fn write_row(
    row: &mut XmlElement,
    number: usize,
    label: &str,
    statistics: &ScheduleStatistics,
    config: &EngineConfig,
    fonts: &ScriptFonts,
) {
    let size = config.fonts.summary_size;
    let threshold = vec![
        word::text_run("≥", Some(RunFormat::new(&config.fonts.cjk, size, false).properties())),
        word::text_run(&format!("{}", config.threshold), Some(RunFormat::new(&config.fonts.latin, size, false).properties())),
    ];
    let values = [
        word::script_runs(&number.to_string(), fonts, size, false),
        word::script_runs(label, fonts, size, false),
        threshold,
        word::script_runs(statistics.mean.as_deref().unwrap_or(""), fonts, size, false),
        word::script_runs(&statistics.tested.to_string(), fonts, size, false),
        word::script_runs(&statistics.passed.to_string(), fonts, size, false),
        word::script_runs(&statistics.rate, fonts, size, false),
        word::script_runs(&format!("附表{}", number), fonts, size, false),
    ];
    for (column, runs) in values.into_iter().enumerate() {
        if let Some(cell) = table::cell_mut(row, column) {
            table::set_cell_content(cell, Some("center"), runs);
        }
    }
}

/// A summary row as read back for the narrative
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SummaryEntry {
    pub(crate) label: String,
    pub(crate) tested: String,
    pub(crate) passed: String,
    pub(crate) rate: String,
}

/// Rows from row 2 on whose first cell is a number and that have at least six cells
pub(crate) fn summary_entries(summary: &XmlElement) -> Vec<SummaryEntry> {
    table::rows(summary)
        .into_iter()
        .skip(FIRST_DATA_ROW)
        .filter_map(|row| {
            let cells: Vec<String> = table::cells(row).into_iter().map(|cell| table::cell_text(cell).trim().to_owned()).collect();
            let numbered = cells.first().map(|first| !first.is_empty() && first.chars().all(|c| c.is_ascii_digit())).unwrap_or(false);
            if cells.len() < 6 || !numbered {
                return None;
            }
            let rate = cells.get(6)
                .map(|rate| rate.trim_end_matches('%').to_owned())
                .filter(|rate| !rate.is_empty())
                .unwrap_or_else(|| "100".to_owned());
            Some(SummaryEntry {
                label: cells[1].clone(),
                tested: cells[4].clone(),
                passed: cells[5].clone(),
                rate,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::parse;
    use crate::engine::progress::NoProgress;
    use crate::engine::tests::document_with_body;
    use pretty_assertions::assert_eq;

    fn schedule(values: &[&str]) -> XmlElement {
        let mut xml = String::from("<w:tbl><w:tr><w:tc><w:p/></w:tc><w:tc><w:p><w:r><w:t>压实度(%)</w:t></w:r></w:p></w:tc></w:tr>");
        for (index, value) in values.iter().enumerate() {
            xml.push_str(&format!(
                "<w:tr><w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc></w:tr>",
                index + 1,
                value
            ));
        }
        xml.push_str("<w:tr><w:tc><w:p><w:r><w:t>备注</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>99</w:t></w:r></w:p></w:tc></w:tr></w:tbl>");
        parse("test", xml.as_bytes()).unwrap()
    }

    const SUMMARY: &str = r#"<w:tbl>
        <w:tr><w:tc><w:p><w:r><w:t>序号</w:t></w:r></w:p></w:tc></w:tr>
        <w:tr><w:tc><w:p><w:r><w:t>单位</w:t></w:r></w:p></w:tc></w:tr>
        <w:tr><w:trPr><w:trHeight w:val="454"/></w:trPr>
            <w:tc><w:tcPr><w:tcW w:w="600" w:type="dxa"/></w:tcPr><w:p/></w:tc><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc>
            <w:tc><w:p/></w:tc><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>
    </w:tbl>"#;

    #[test]
    fn mean_has_one_decimal_and_ignores_text() {
        let statistics = schedule_statistics(&schedule(&["95.2", "94.8%", "96.0", "n/a"]), 94.0, true);
        assert_eq!(statistics.mean.as_deref(), Some("95.3"));
        assert_eq!(statistics.tested, 4);
        assert_eq!(statistics.passed, 4);
        assert_eq!(statistics.rate, "100");
    }

    #[test]
    fn strict_pass_counts_points_over_threshold() {
        let statistics = schedule_statistics(&schedule(&["95.2", "93.0", "96.0"]), 94.0, false);
        assert_eq!(statistics.passed, 2);
        assert_eq!(statistics.rate, "66.7");
        assert_eq!(schedule_statistics(&schedule(&["95", "96"]), 94.0, false).rate, "100");
        assert_eq!(schedule_statistics(&schedule(&[]), 94.0, false).mean, None);
    }

    #[test]
    fn heading_variants_and_labels() {
        assert!(is_summary_heading("  表2：压实度检测结果评定表 "));
        assert!(is_summary_heading("表2 压实度评定表"));
        assert!(!is_summary_heading("表3 压实度检测结果评定表"));
        assert_eq!(label_from_heading("附表2 压实度检测结果表（K1+200路基）", 2), Some("K1+200路基".to_owned()));
        assert_eq!(label_from_heading("附表3 承台(二)", 3), Some("二".to_owned()));
        assert_eq!(label_from_heading("附表4 基坑回填", 4), Some("基坑回填".to_owned()));
        assert_eq!(label_from_heading("附表5", 5), None);
    }

    #[test]
    fn rows_are_written_and_cloned() {
        let body = format!(
            r#"<w:body><w:p><w:r><w:t>附表1 压实度检测结果表（承台回填土）</w:t></w:r></w:p>{}
            <w:p><w:r><w:t>表2 压实度检测结果评定表</w:t></w:r></w:p>{}</w:body>"#,
            schedule(&["95.2", "94.8", "96.0"]).to_xml(),
            SUMMARY
        );
        let mut document = document_with_body(&body);
        let tables = vec![
            GeneratedTable { position: 1, heading: 0, sheet: 0, section: 0, label: "K0+100路基".to_owned() },
            GeneratedTable { position: 1, heading: 0, sheet: 0, section: 1, label: String::new() },
        ];
        let mut sink = NoProgress;
        let position = update_summary(&mut document, &tables, &EngineConfig::default(), &mut Reporter::new(&mut sink));
        assert_eq!(position, Some(3));

        let summary = document.block(3).unwrap();
        assert_eq!(table::row_count(summary), 4);
        let texts: Vec<String> = table::cells(table::row(summary, 3).unwrap()).into_iter().map(table::cell_text).collect();
        assert_eq!(texts, vec!["2", "承台回填土", "≥94", "95.3", "3", "3", "100", "附表2"]);
        assert!(table::row(summary, 3).unwrap().child("w:trPr").is_some());

        let entries = summary_entries(summary);
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            SummaryEntry { label: "K0+100路基".to_owned(), tested: "3".to_owned(), passed: "3".to_owned(), rate: "100".to_owned() }
        );
    }

    #[test]
    fn missing_summary_table_is_a_warning() {
        let mut document = document_with_body("<w:body><w:p/></w:body>");
        let mut sink = NoProgress;
        let mut reporter = Reporter::new(&mut sink);
        assert_eq!(update_summary(&mut document, &[], &EngineConfig::default(), &mut reporter), None);
        assert_eq!(reporter.warnings(), 1);
    }
}
