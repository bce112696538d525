use crate::document::word;
use crate::document::word::RunFormat;
use crate::document::Document;
use crate::document::SaveOutcome;
use crate::engine::config::EngineConfig;
use crate::engine::fill::fill_table;
use crate::engine::merge::combined_rows;
use crate::engine::merge::merge_sections;
use crate::engine::merge::MergeGroup;
use crate::engine::narrative;
use crate::engine::postprocess;
use crate::engine::progress::CancelToken;
use crate::engine::progress::ProgressSink;
use crate::engine::progress::Reporter;
use crate::engine::prune::prune_rows;
use crate::engine::recalc::needs_recalculation;
use crate::engine::remark::rewrite_remarks;
use crate::engine::section::extract_sections;
use crate::engine::section::Section;
use crate::engine::summary::update_summary;
use crate::engine::template::data_row_count;
use crate::engine::template::locate_anchor;
use crate::engine::template::TemplateAnchor;
use crate::engine::template::TemplateSnapshot;
use crate::engine::GeneratedTable;
use crate::error::ReportError;
use crate::spreadsheet::Criteria;
use crate::spreadsheet::Sheet;
use crate::spreadsheet::Workbook;
use std::path::Path;
use std::path::PathBuf;

/// Files of one report run
#[derive(Clone, Debug, PartialEq)]
pub struct RunRequest {
    pub excel: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
    /// Maximum number of schedules built across all worksheets; 0 builds all
    pub copy_count: usize,
}

/// What a finished run did
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// Worksheets that contained at least one section
    pub sheets_processed: usize,
    pub sections: usize,
    pub groups: usize,
    /// Schedules left in the report after pruning
    pub tables: usize,
    pub narrative_paragraphs: usize,
    pub warnings: usize,
    pub output: PathBuf,
}

/// Builds a report with the default configuration.
///
/// # Arguments
/// * `excel_path` - Workbook with the compaction measurements
/// * `template_path` - Report template
/// * `copy_count` - Maximum number of schedules; 0 builds one per section group
/// * `output_path` - Where the report is written; an existing file is replaced
/// * `on_progress` - Receives progress messages in order
///
/// # Returns
/// Statistics of the run
pub fn run_excel_to_word_automation<F>(
    excel_path: impl AsRef<Path>,
    template_path: impl AsRef<Path>,
    copy_count: usize,
    output_path: impl AsRef<Path>,
    on_progress: F,
) -> Result<RunSummary, ReportError>
where
    F: FnMut(&str),
{
    let request = RunRequest {
        excel: excel_path.as_ref().to_path_buf(),
        template: template_path.as_ref().to_path_buf(),
        output: output_path.as_ref().to_path_buf(),
        copy_count,
    };
    let mut sink = on_progress;
    run(&request, &EngineConfig::default(), &mut sink, &CancelToken::new())
}

/// Builds a report.
///
/// Nothing is written unless every phase completes; cancellation is honoured
/// between worksheets, groups and phases.
pub fn run(
    request: &RunRequest,
    config: &EngineConfig,
    sink: &mut dyn ProgressSink,
    cancel: &CancelToken,
) -> Result<RunSummary, ReportError> {
    for (kind, path) in [("Excel", &request.excel), ("Template", &request.template)] {
        if !path.is_file() {
            Err(ReportError::InputFileNotFoundError {
                kind,
                path: path.display().to_string(),
            })?;
        }
    }

    let mut reporter = Reporter::new(sink);
    let criteria = Criteria::with_patterns(&config.sheet_name_patterns)?;
    let workbook = Workbook::open(&request.excel, &criteria)?;
    reporter.info(&format!("Opened workbook '{}' with {} worksheet(s)", workbook.name, workbook.sheets.len()));
    let mut document = Document::open(&request.template)?;
    let anchor = locate_anchor(&document)?;
    let snapshot = TemplateSnapshot::capture(&document, &anchor, &config.fonts)?;
    reporter.info(&format!("Template schedule found at body position {}", anchor.table));

    let mut run = ReportRun {
        request,
        config,
        criteria: &criteria,
        cancel,
        anchor,
        snapshot,
        sheets: workbook.sheets,
        tables: Vec::new(),
        template_used: false,
        materialized: 0,
        summary: RunSummary::default(),
    };

    let mut number = 1;
    for index in 0..run.sheets.len() {
        cancel.check()?;
        number = run.process_sheet(&mut document, &mut reporter, index, number)?;
        if run.limit_reached() {
            reporter.info(&format!("Reached the limit of {} schedule(s)", request.copy_count));
            break;
        }
    }
    reporter.info(&format!("{} schedule(s) generated", run.tables.len()));

    cancel.check()?;
    rewrite_remarks(&mut document, &run.tables, &run.sheets, &config.layout, &mut reporter);

    cancel.check()?;
    if let Some(summary) = update_summary(&mut document, &run.tables, config, &mut reporter) {
        run.summary.narrative_paragraphs = narrative::write_narrative(&mut document, summary, config, &mut reporter);
        let removed = narrative::collapse_empty_paragraphs(&mut document, config.max_consecutive_empty_paragraphs)
            + narrative::trim_trailing_empty_paragraphs(&mut document);
        if removed > 0 {
            reporter.info(&format!("Removed {} surplus empty paragraph(s)", removed));
        }
        if narrative::break_before_schedule_title(&mut document) {
            reporter.info("Schedule title moved to a new page");
        }
    }

    cancel.check()?;
    let units = postprocess::superscript_density_units(&mut document);
    let headings = postprocess::unify_schedule_headings(&mut document, &config.fonts);
    reporter.info(&format!("Superscripted {} density unit paragraph(s), unified {} heading(s)", units, headings));

    cancel.check()?;
    if let SaveOutcome::Copied(reason) = document.save(&request.output)? {
        reporter.warn(&format!("Could not move the staged report into place ({}), copied it instead", reason));
    }
    reporter.info(&format!("Report saved to '{}'", request.output.display()));

    let mut summary = run.summary;
    summary.tables = run.tables.len();
    summary.warnings = reporter.warnings();
    summary.output = request.output.clone();
    Ok(summary)
}

/// State carried across the worksheets of one run
struct ReportRun<'a> {
    request: &'a RunRequest,
    config: &'a EngineConfig,
    criteria: &'a Criteria,
    cancel: &'a CancelToken,
    anchor: TemplateAnchor,
    snapshot: TemplateSnapshot,
    sheets: Vec<Sheet>,
    tables: Vec<GeneratedTable>,
    /// The first group goes into the template schedule itself
    template_used: bool,
    materialized: usize,
    summary: RunSummary,
}

impl ReportRun<'_> {
    fn limit_reached(&self) -> bool {
        self.request.copy_count > 0 && self.materialized >= self.request.copy_count
    }

    /// Builds the schedules of one worksheet
    ///
    /// # Arguments
    /// * `index` - Worksheet position in `sheets`
    /// * `number` - Number of the next schedule
    ///
    /// # Returns
    /// Number of the schedule that follows this worksheet's last one
    fn process_sheet(
        &mut self,
        document: &mut Document,
        reporter: &mut Reporter,
        index: usize,
        number: usize,
    ) -> Result<usize, ReportError> {
        let config = self.config;
        let layout = &config.layout;
        let name = self.sheets[index].name.clone();
        reporter.info(&format!("Reading sheet '{}'", name));
        let mut sections = extract_sections(&self.sheets[index], layout, reporter)?;
        if sections.is_empty() {
            reporter.info(&format!("Sheet '{}' has no sections", name));
            return Ok(number);
        }
        if needs_recalculation(&self.sheets[index], &sections, layout)? {
            if let Some(refreshed) = self.recalculate(index, reporter) {
                self.sheets[index] = refreshed;
                sections = extract_sections(&self.sheets[index], layout, reporter)?;
            }
        }

        let count = sections.len();
        let groups = merge_sections(sections);
        reporter.info(&format!("Sheet '{}': {} section(s) in {} group(s)", name, count, groups.len()));
        self.summary.sheets_processed += 1;
        self.summary.sections += count;
        self.summary.groups += groups.len();

        let mut number = number;
        for group in groups {
            self.cancel.check()?;
            if self.limit_reached() {
                break;
            }
            number = self.materialize(document, reporter, index, &group, number);
        }
        Ok(number)
    }

    /// Re-reads a worksheet from a recalculated copy of the workbook
    fn recalculate(&self, index: usize, reporter: &mut Reporter) -> Option<Sheet> {
        let recalculator = self.config.recalculator.as_ref()?;
        let name = &self.sheets[index].name;
        reporter.info(&format!("Sheet '{}' has formulas without results, recalculating with {}", name, recalculator.name()));
        let refreshed = recalculator
            .recalculate(&self.request.excel)
            .and_then(|bytes| Workbook::from_bytes(name, bytes, self.criteria));
        match refreshed {
            Ok(workbook) => {
                let sheet = workbook.sheets.into_iter().find(|sheet| sheet.name == *name);
                if sheet.is_none() {
                    reporter.warn(&format!("Recalculated workbook has no sheet '{}', using cached values", name));
                }
                sheet
            }
            Err(error) => {
                reporter.warn(&format!("{}, using cached values", error));
                None
            }
        }
    }

    /// Writes one group into a schedule, pruning it afterwards.
    /// A schedule left without data rows is removed together with its heading.
    ///
    /// # Returns
    /// Number of the next schedule
    fn materialize(
        &mut self,
        document: &mut Document,
        reporter: &mut Reporter,
        sheet: usize,
        group: &MergeGroup,
        number: usize,
    ) -> usize {
        self.materialized += 1;
        let first: &Section = &group[0];
        let rows = combined_rows(group);
        let label = first.label.trim().to_owned();

        let (heading, position, capacity) = if self.template_used {
            document.append_block(word::new_paragraph(None, Vec::new()));
            let heading = document.append_block(self.snapshot.heading_paragraph(number, &label));
            let position = document.append_block(self.snapshot.clone_table(rows.len()));
            (heading, position, rows.len())
        } else {
            self.template_used = true;
            if let Some(paragraph) = document.block_mut(self.anchor.heading) {
                self.snapshot.relabel_heading(paragraph, number, &label);
            }
            let capacity = document.block(self.anchor.table).map(data_row_count).unwrap_or(0);
            if rows.len() > capacity {
                reporter.warn(&format!(
                    "Template schedule holds {} row(s), {} row(s) of sheet '{}' dropped",
                    capacity,
                    rows.len() - capacity,
                    self.sheets[sheet].name
                ));
            }
            (self.anchor.heading, self.anchor.table, capacity)
        };

        let format = RunFormat::new(&self.config.fonts.latin, self.config.fonts.table_size, false);
        let remaining = match document.block_mut(position) {
            Some(schedule) => {
                fill_table(schedule, &rows, capacity, &format);
                match prune_rows(schedule) {
                    Some(pruned) if pruned > 0 => reporter.info(&format!("附表{}: {} empty row(s) removed", number, pruned)),
                    Some(_) => (),
                    None => reporter.warn(&format!("附表{} has no remark row, rows not pruned", number)),
                }
                data_row_count(schedule)
            }
            None => 0,
        };

        if remaining == 0 {
            document.remove_block(position);
            document.remove_block(heading);
            reporter.info(&format!(
                "Sections from row {} of sheet '{}' have no data, schedule dropped",
                self.config.layout.base_row + first.row_offset(&self.config.layout),
                self.sheets[sheet].name
            ));
            return number;
        }

        reporter.info(&format!(
            "附表{}: {} row(s) from {} section(s) of sheet '{}'",
            number,
            remaining,
            group.len(),
            self.sheets[sheet].name
        ));
        self.tables.push(GeneratedTable {
            position,
            heading,
            sheet,
            section: first.index,
            label,
        });
        number + 1
    }
}
