use crate::engine::recalc::Recalculator;
use chrono::NaiveDate;
use std::sync::Arc;

/// Where sections live in a worksheet.
///
/// Cell addresses are A1 references of the first section; section `i` reads them
/// shifted down by `i * row_increment` rows.
#[derive(Clone, Debug, PartialEq)]
pub struct SectionLayout {
    /// 1-based row of the first section
    pub base_row: usize,
    pub row_increment: usize,
    pub rows_per_section: usize,
    /// Data columns, e.g. `X:AC`
    pub columns: String,
    /// Column holding the stop marker on each section's first row
    pub stop_column: String,
    pub stop_marker: String,
    pub max_sections: usize,
    /// Cells whose values must match for adjacent sections to merge
    pub comparison_cells: Vec<String>,
    /// Cells concatenated into the section label
    pub label_cells: Vec<String>,
    pub density_cell: String,
    pub moisture_cell: String,
    pub date_cell: String,
}

impl Default for SectionLayout {
    fn default() -> Self {
        SectionLayout {
            base_row: 7,
            row_increment: 24,
            rows_per_section: 10,
            columns: "X:AC".to_owned(),
            stop_column: "AC".to_owned(),
            stop_marker: "#DIV/0!".to_owned(),
            max_sections: 100,
            comparison_cells: ["B3", "B4", "B5", "L3", "L5", "P5", "T5", "S4"]
                .iter()
                .map(|cell| cell.to_string())
                .collect(),
            label_cells: vec!["B5".to_owned(), "L3".to_owned()],
            density_cell: "C8".to_owned(),
            moisture_cell: "K8".to_owned(),
            date_cell: "S4".to_owned(),
        }
    }
}

/// Fonts and sizes (half-points) of generated text
#[derive(Clone, Debug, PartialEq)]
pub struct FontConfig {
    /// Font for CJK characters and full-width punctuation
    pub cjk: String,
    /// Font for everything else
    pub latin: String,
    /// Schedule data cells, 10 pt
    pub table_size: u32,
    /// Summary table cells, 10.5 pt
    pub summary_size: u32,
    /// Narrative sentences and date line, 12 pt
    pub narrative_size: u32,
    /// Schedule headings, 9 pt
    pub heading_size: u32,
}

impl Default for FontConfig {
    fn default() -> Self {
        FontConfig {
            cjk: "宋体".to_owned(),
            latin: "Times New Roman".to_owned(),
            table_size: 20,
            summary_size: 21,
            narrative_size: 24,
            heading_size: 18,
        }
    }
}

/// Default number of lines a narrative sentence takes up
pub fn estimate_lines(sentence: &str) -> usize {
    (sentence.chars().count() / 30 + 1).max(1)
}

/// Settings of one report run
#[derive(Clone)]
pub struct EngineConfig {
    pub layout: SectionLayout,
    pub fonts: FontConfig,
    /// Minimum compaction percentage of a passing point
    pub threshold: f64,
    /// Report every tested point as passed (rate 100)
    pub assume_all_points_pass: bool,
    /// 1-based paragraph used when the template has no narrative placeholder
    pub narrative_start_paragraph: usize,
    /// Lines a sentence occupies; drives the spacers added above the schedule title
    pub line_estimator: fn(&str) -> usize,
    pub max_consecutive_empty_paragraphs: usize,
    /// Date printed under the narrative; today when unset
    pub report_date: Option<NaiveDate>,
    /// Glob patterns selecting worksheets; empty selects all
    pub sheet_name_patterns: Vec<String>,
    /// Refreshes formula results of workbooks saved without calculation
    pub recalculator: Option<Arc<dyn Recalculator>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            layout: SectionLayout::default(),
            fonts: FontConfig::default(),
            threshold: 94.0,
            assume_all_points_pass: true,
            narrative_start_paragraph: 52,
            line_estimator: estimate_lines,
            max_consecutive_empty_paragraphs: 1,
            report_date: None,
            sheet_name_patterns: Vec::new(),
            recalculator: None,
        }
    }
}

impl std::fmt::Debug for EngineConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("EngineConfig")
            .field("layout", &self.layout)
            .field("fonts", &self.fonts)
            .field("threshold", &self.threshold)
            .field("assume_all_points_pass", &self.assume_all_points_pass)
            .field("narrative_start_paragraph", &self.narrative_start_paragraph)
            .field("max_consecutive_empty_paragraphs", &self.max_consecutive_empty_paragraphs)
            .field("report_date", &self.report_date)
            .field("sheet_name_patterns", &self.sheet_name_patterns)
            .field("recalculator", &self.recalculator.as_ref().map(|recalculator| recalculator.name()))
            .finish()
    }
}
