//! Best-effort recalculation of workbooks saved without cached formula results
use crate::engine::config::SectionLayout;
use crate::engine::section::Section;
use crate::engine::EngineError;
use crate::error::ReportError;
use crate::spreadsheet::Range;
use crate::spreadsheet::Sheet;
use std::path::Path;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

/// Refreshes the cached results of a workbook's formulas
pub trait Recalculator: Send + Sync {
    fn name(&self) -> &str;

    /// Produces the bytes of a recalculated copy of `workbook`; the original file
    /// is left untouched.
    fn recalculate(&self, workbook: &Path) -> Result<Vec<u8>, ReportError>;
}

/// Runs a headless office suite converting the workbook into a scratch directory:
/// `<program> --headless --calc --convert-to xlsx --outdir <dir> <workbook>`
#[derive(Clone, Debug)]
pub struct CommandRecalculator {
    pub program: String,
    pub timeout: Duration,
}

impl CommandRecalculator {
    pub fn new(program: &str) -> Self {
        CommandRecalculator {
            program: program.to_owned(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl Recalculator for CommandRecalculator {
    fn name(&self) -> &str {
        &self.program
    }

    fn recalculate(&self, workbook: &Path) -> Result<Vec<u8>, ReportError> {
        let directory = tempfile::tempdir()?;
        let mut child = Command::new(&self.program)
            .arg("--headless")
            .arg("--calc")
            .arg("--convert-to")
            .arg("xlsx")
            .arg("--outdir")
            .arg(directory.path())
            .arg(workbook)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                Err(EngineError::RecalculationError(format!(
                    "'{}' timed out after {}s",
                    self.program,
                    self.timeout.as_secs()
                )))?;
            }
            std::thread::sleep(Duration::from_millis(100));
        };
        if !status.success() {
            Err(EngineError::RecalculationError(format!("'{}' exited with {}", self.program, status)))?;
        }

        let stem = workbook
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let converted = directory.path().join(format!("{stem}.xlsx"));
        if !converted.exists() {
            Err(EngineError::RecalculationError(format!(
                "'{}' produced no '{}'",
                self.program,
                converted.display()
            )))?;
        }
        Ok(std::fs::read(converted)?)
    }
}

/// Whether a sheet looks saved without calculation: every section is blank beyond
/// its first column while the section rectangles hold formulas
pub(crate) fn needs_recalculation(sheet: &Sheet, sections: &[Section], layout: &SectionLayout) -> Result<bool, ReportError> {
    if sections.is_empty() {
        return Ok(false);
    }
    let blank = sections.iter().all(|section| {
        section.data.iter().all(|row| row.iter().skip(1).all(|value| value.is_empty()))
    });
    if !blank {
        return Ok(false);
    }
    let columns = Range::try_from(layout.columns.as_str())?;
    let has_formula = sections.iter().any(|section| {
        let start = layout.base_row - 1 + section.index * layout.row_increment;
        sheet.has_formula_in(&columns.with_rows(start, start + layout.rows_per_section - 1))
    });
    Ok(has_formula)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;
    use crate::spreadsheet::Cell;
    use std::collections::BTreeMap;

    fn blank_section(index: usize) -> Section {
        Section {
            index,
            data: vec![vec!["1".to_owned(), String::new(), String::new()]],
            comparison_values: BTreeMap::new(),
            label: String::new(),
        }
    }

    fn formula_sheet(row: usize) -> Sheet {
        let mut sheet = Sheet::new("Sheet1");
        sheet.push(Cell {
            row,
            col: 25,
            kind: CellType::Empty,
            has_formula: true,
            ..Cell::default()
        });
        sheet
    }

    #[test]
    fn blank_sections_with_formulas_need_recalculation() {
        let layout = SectionLayout::default();
        let sections = vec![blank_section(0), blank_section(1)];
        assert!(needs_recalculation(&formula_sheet(31), &sections, &layout).unwrap());
        assert!(!needs_recalculation(&formula_sheet(60), &sections, &layout).unwrap());
    }

    #[test]
    fn filled_sections_never_need_recalculation() {
        let layout = SectionLayout::default();
        let mut section = blank_section(0);
        section.data[0][1] = "96.1".to_owned();
        assert!(!needs_recalculation(&formula_sheet(6), &[section], &layout).unwrap());
        assert!(!needs_recalculation(&formula_sheet(6), &[], &layout).unwrap());
    }

    #[test]
    fn missing_program_is_an_error() {
        let recalculator = CommandRecalculator::new("definitely-not-an-office-suite");
        assert!(recalculator.recalculate(Path::new("book.xlsx")).is_err());
    }
}
