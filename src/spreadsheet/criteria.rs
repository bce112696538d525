use glob::Pattern;

/// Criteria for selecting which worksheets of a workbook are loaded.
#[derive(Clone, Debug, Default)]
pub(crate) struct Criteria {
    /// Sheet name patterns; `None` accepts every sheet.
    pub(crate) sheet_name_patterns: Option<Vec<Pattern>>,
}

impl Criteria {
    /// Builds criteria from glob patterns such as `路基*`.
    pub(crate) fn with_patterns(patterns: &[String]) -> Result<Self, glob::PatternError> {
        if patterns.is_empty() {
            return Ok(Criteria::default());
        }
        let patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern))
            .collect::<Result<Vec<Pattern>, glob::PatternError>>()?;
        Ok(Criteria {
            sheet_name_patterns: Some(patterns),
        })
    }

    /// Checks if a sheet name matches the criteria patterns.
    /// Returns true if no patterns are specified or if name matches any pattern.
    pub(crate) fn accept(&self, sheet_name: &str) -> bool {
        match &self.sheet_name_patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }
}
