use crate::document::node::XmlElement;
use crate::document::word;
use crate::document::word::RunFormat;
use crate::document::word::ScriptFonts;
use crate::document::word::P_PR_ORDER;
use crate::document::word::R_PR_ORDER;
use crate::document::Document;
use crate::engine::config::EngineConfig;
use crate::engine::config::FontConfig;
use crate::engine::progress::Reporter;
use crate::engine::summary::summary_entries;
use crate::engine::summary::SummaryEntry;
use chrono::Datelike;
use chrono::NaiveDate;

/// Chinese numerals, with `○` for zero as used in written years
const NUMERALS: [char; 10] = ['○', '一', '二', '三', '四', '五', '六', '七', '八', '九'];

/// First-line indent of a narrative paragraph, two 12 pt characters in twips
const FIRST_LINE_INDENT: &str = "480";

pub(crate) fn is_placeholder(paragraph: &XmlElement) -> bool {
    let text = word::paragraph_text(paragraph);
    paragraph.is("w:p") && text.contains("本次对") && text.contains("进行压实度检测")
}

/// Whether a paragraph is the title of the schedule part: it mentions `附表`
/// without any schedule number
pub(crate) fn is_schedule_title(paragraph: &XmlElement) -> bool {
    let text = word::paragraph_text(paragraph);
    paragraph.is("w:p") && text.contains("附表") && !text.chars().any(char::is_numeric)
}

pub(crate) fn sentence(entry: &SummaryEntry) -> String {
    format!(
        "本次对{}进行压实度检测，检测点数为{}个，合格点数为{}个，合格率为{}%。",
        entry.label, entry.tested, entry.passed, entry.rate
    )
}

/// Runs of a narrative sentence; only the rate is bold
fn sentence_runs(entry: &SummaryEntry, fonts: &ScriptFonts, size: u32) -> Vec<XmlElement> {
    let lead = format!(
        "本次对{}进行压实度检测，检测点数为{}个，合格点数为{}个，合格率为",
        entry.label, entry.tested, entry.passed
    );
    let mut runs = word::script_runs(&lead, fonts, size, false);
    runs.extend(word::script_runs(&format!("{}%", entry.rate), fonts, size, true));
    runs.extend(word::script_runs("。", fonts, size, false));
    runs
}

/// Writes a number below 100 in Chinese numerals
fn chinese_number(value: u32) -> String {
    let digit = |value: u32| NUMERALS[(value % 10) as usize];
    match value {
        0..=9 => digit(value).to_string(),
        10 => "十".to_owned(),
        11..=19 => format!("十{}", digit(value)),
        _ if value % 10 == 0 => format!("{}十", digit(value / 10)),
        _ => format!("{}十{}", digit(value / 10), digit(value)),
    }
}

/// Formats a date the way reports are signed, e.g. `二○二五年六月十日`
pub(crate) fn chinese_date(date: NaiveDate) -> String {
    let year: String = date
        .year()
        .to_string()
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|digit| NUMERALS[digit as usize])
        .collect();
    format!("{}年{}月{}日", year, chinese_number(date.month()), chinese_number(date.day()))
}

/// Applies indent, justification and numbering to a narrative paragraph.
/// The numbering glyph takes the paragraph mark's formatting, forced non-bold.
fn format_paragraph(paragraph: &mut XmlElement, numbering: Option<&XmlElement>) {
    word::set_alignment(paragraph, "both");
    let properties = word::paragraph_properties(paragraph);
    if let Some(numbering) = numbering {
        properties.set_child(numbering.clone(), &P_PR_ORDER);
    }
    properties.set_child(XmlElement::new("w:ind").with_attribute("w:firstLine", FIRST_LINE_INDENT), &P_PR_ORDER);
    let mark = properties.ensure_child("w:rPr", &P_PR_ORDER);
    mark.set_child(XmlElement::new("w:b").with_attribute("w:val", "0"), &R_PR_ORDER);
    mark.set_child(XmlElement::new("w:bCs").with_attribute("w:val", "0"), &R_PR_ORDER);
}

/// Empty paragraph at 1.5 line spacing with no space after
fn spacer_paragraph() -> XmlElement {
    let mut paragraph = XmlElement::new("w:p");
    word::paragraph_properties(&mut paragraph).set_child(
        XmlElement::new("w:spacing")
            .with_attribute("w:after", "0")
            .with_attribute("w:line", "360")
            .with_attribute("w:lineRule", "auto"),
        &P_PR_ORDER,
    );
    paragraph
}

fn date_paragraph(date: NaiveDate, fonts: &FontConfig) -> XmlElement {
    let format = RunFormat::new(&fonts.cjk, fonts.narrative_size, true);
    word::new_paragraph(Some("right"), vec![word::text_run(&chinese_date(date), Some(format.properties()))])
}

/// Body position of the first narrative paragraph: the first placeholder, or the
/// configured paragraph ordinal
fn narrative_start(document: &Document, ordinal: usize) -> Option<usize> {
    document.find_block(0, is_placeholder).or_else(|| {
        ordinal
            .checked_sub(1)
            .and_then(|index| document.paragraph_positions().get(index).copied())
    })
}

/// Body positions that move while blocks are inserted
struct Positions {
    last: usize,
    marker: Option<usize>,
}

impl Positions {
    fn insert(&mut self, document: &mut Document, position: usize, block: XmlElement) {
        document.insert_block(position, block);
        if self.last >= position {
            self.last += 1;
        }
        if let Some(marker) = self.marker.as_mut() {
            if *marker >= position {
                *marker += 1;
            }
        }
    }
}

/// Writes one narrative sentence per numbered summary row, then the date line.
///
/// Each sentence after the first goes into the next paragraph when that is a
/// placeholder, otherwise into a new paragraph; every new paragraph pushes the
/// schedule title down by the estimated number of lines.
///
/// # Returns
/// Number of narrative paragraphs written
pub(crate) fn write_narrative(
    document: &mut Document,
    summary: usize,
    config: &EngineConfig,
    reporter: &mut Reporter,
) -> usize {
    let entries = document.block(summary).map(summary_entries).unwrap_or_default();
    if entries.is_empty() {
        reporter.warn("Summary table has no numbered row, no narrative written");
        return 0;
    }
    let start = match narrative_start(document, config.narrative_start_paragraph) {
        Some(start) => start,
        None => {
            reporter.warn(&format!(
                "No narrative placeholder and no paragraph {}, no narrative written",
                config.narrative_start_paragraph
            ));
            return 0;
        }
    };
    let numbering = document
        .block(start)
        .and_then(|paragraph| paragraph.child("w:pPr"))
        .and_then(|properties| properties.child("w:numPr"))
        .cloned();
    if numbering.is_none() {
        reporter.info("First narrative paragraph has no numbering to copy");
    }

    let fonts = ScriptFonts {
        cjk: config.fonts.cjk.clone(),
        other: config.fonts.latin.clone(),
    };
    let size = config.fonts.narrative_size;
    let mut positions = Positions {
        last: start,
        marker: document.find_block(0, is_schedule_title),
    };

    for (index, entry) in entries.iter().enumerate() {
        let runs = sentence_runs(entry, &fonts, size);
        let reuse = index == 0 || document.block(positions.last + 1).map(is_placeholder).unwrap_or(false);
        if reuse {
            if index > 0 {
                positions.last += 1;
            }
            if let Some(paragraph) = document.block_mut(positions.last) {
                word::replace_runs(paragraph, runs);
                format_paragraph(paragraph, numbering.as_ref());
            }
        } else {
            let mut paragraph = word::new_paragraph(None, runs);
            format_paragraph(&mut paragraph, numbering.as_ref());
            let position = positions.last + 1;
            positions.insert(document, position, paragraph);
            positions.last = position;
            if let Some(marker) = positions.marker {
                let lines = (config.line_estimator)(&sentence(entry));
                for _ in 0..lines {
                    let marker = positions.marker.unwrap_or(marker);
                    positions.insert(document, marker, spacer_paragraph());
                }
            }
        }
        reporter.info(&format!("Narrative {}: {}", index + 1, sentence(entry)));
    }

    let date = config.report_date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let after = positions.last + 1;
    positions.insert(document, after, date_paragraph(date, &config.fonts));
    reporter.info(&format!("Report dated {}", chinese_date(date)));
    entries.len()
}

/// Removes empty paragraphs beyond `threshold` in every run of consecutive ones.
/// Tables and other blocks end a run.
///
/// # Returns
/// Number of removed paragraphs
pub(crate) fn collapse_empty_paragraphs(document: &mut Document, threshold: usize) -> usize {
    let mut consecutive = 0;
    let mut doomed = Vec::new();
    for position in 0..document.block_count() {
        match document.block(position) {
            Some(block) if word::is_empty_paragraph(block) => {
                consecutive += 1;
                if consecutive > threshold {
                    doomed.push(position);
                }
            }
            _ => consecutive = 0,
        }
    }
    for position in doomed.iter().rev() {
        document.remove_block(*position);
    }
    doomed.len()
}

/// Keeps a single empty paragraph at the end of the body. The closing section
/// properties are skipped and any other block ends the trailing run.
///
/// # Returns
/// Number of removed paragraphs
pub(crate) fn trim_trailing_empty_paragraphs(document: &mut Document) -> usize {
    let mut end = document.block_count();
    while end > 0 && document.block(end - 1).map(|block| block.is("w:sectPr")).unwrap_or(false) {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && document.block(start - 1).map(word::is_empty_paragraph).unwrap_or(false) {
        start -= 1;
    }
    let doomed = (end - start).saturating_sub(1);
    for _ in 0..doomed {
        document.remove_block(start + 1);
    }
    doomed
}

/// Starts the schedule title on a new page unless a page break already precedes it
///
/// # Returns
/// Whether a page break was inserted
pub(crate) fn break_before_schedule_title(document: &mut Document) -> bool {
    let marker = match document.find_block(0, is_schedule_title) {
        Some(marker) => marker,
        None => return false,
    };
    let preceded = marker
        .checked_sub(1)
        .and_then(|previous| document.block(previous))
        .map(word::has_page_break)
        .unwrap_or(false);
    if !preceded {
        document.insert_block(marker, word::page_break_paragraph());
    }
    !preceded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node;
    use crate::document::table;
    use crate::engine::progress::NoProgress;
    use crate::engine::tests::document_with_body;
    use pretty_assertions::assert_eq;

    fn summary_table(rows: &[(&str, &str, &str)]) -> String {
        let mut xml = String::from("<w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr><w:tr><w:tc><w:p/></w:tc></w:tr>");
        for (index, (label, tested, rate)) in rows.iter().enumerate() {
            xml.push_str("<w:tr>");
            for value in [&(index + 1).to_string(), *label, "≥94", "95.3", *tested, *tested, *rate, "附表1"] {
                xml.push_str(&format!("<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>", value));
            }
            xml.push_str("</w:tr>");
        }
        xml.push_str("</w:tbl>");
        xml
    }

    fn texts(document: &Document) -> Vec<String> {
        (0..document.block_count())
            .map(|position| {
                let block = document.block(position).unwrap();
                if block.is("w:tbl") {
                    "<table>".to_owned()
                } else {
                    word::paragraph_text(block)
                }
            })
            .collect()
    }

    fn config() -> EngineConfig {
        EngineConfig {
            report_date: NaiveDate::from_ymd_opt(2025, 6, 10),
            line_estimator: |_| 2,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn chinese_numerals() {
        assert_eq!(chinese_date(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()), "二○二五年六月十日");
        assert_eq!(chinese_date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()), "二○二四年十二月三十一日");
        assert_eq!(chinese_date(NaiveDate::from_ymd_opt(2030, 1, 20).unwrap()), "二○三○年一月二十日");
    }

    #[test]
    fn sentences_fill_placeholder_then_new_paragraphs() {
        let body = format!(
            r#"<w:body>{}
            <w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="3"/></w:numPr></w:pPr><w:r><w:t>本次对XX进行压实度检测。</w:t></w:r></w:p>
            <w:p><w:r><w:t>结论</w:t></w:r></w:p>
            <w:p><w:r><w:t>附表</w:t></w:r></w:p>
            <w:sectPr/></w:body>"#,
            summary_table(&[("K0+100路基", "10", "100"), ("承台", "8", "87.5")])
        );
        let mut document = document_with_body(&body);
        let mut sink = NoProgress;
        let written = write_narrative(&mut document, 0, &config(), &mut Reporter::new(&mut sink));
        assert_eq!(written, 2);
        // the trailing empty text is the section properties

        assert_eq!(
            texts(&document),
            vec![
                "<table>",
                "本次对K0+100路基进行压实度检测，检测点数为10个，合格点数为10个，合格率为100%。",
                "本次对承台进行压实度检测，检测点数为8个，合格点数为8个，合格率为87.5%。",
                "二○二五年六月十日",
                "结论",
                "",
                "",
                "附表",
                "",
            ]
        );

        let created = document.block(2).unwrap();
        let properties = created.child("w:pPr").unwrap();
        assert!(properties.child("w:numPr").is_some());
        assert_eq!(properties.child("w:jc").and_then(|jc| jc.attribute("w:val")), Some("both"));
        assert_eq!(properties.child("w:ind").and_then(|ind| ind.attribute("w:firstLine")), Some("480"));
        assert!(created.to_xml().contains(r#"<w:b/><w:bCs/><w:sz w:val="24"/><w:szCs w:val="24"/></w:rPr><w:t>87.5%</w:t>"#));
    }

    #[test]
    fn ordinal_fallback_and_missing_rows() {
        let body = format!(
            "<w:body><w:p><w:r><w:t>一</w:t></w:r></w:p><w:p><w:r><w:t>二</w:t></w:r></w:p>{}</w:body>",
            summary_table(&[("路基", "4", "100")])
        );
        let mut document = document_with_body(&body);
        let config = EngineConfig { narrative_start_paragraph: 2, ..config() };
        let mut sink = NoProgress;
        assert_eq!(write_narrative(&mut document, 2, &config, &mut Reporter::new(&mut sink)), 1);
        assert_eq!(word::paragraph_text(document.block(1).unwrap()), "本次对路基进行压实度检测，检测点数为4个，合格点数为4个，合格率为100%。");
        assert_eq!(word::paragraph_text(document.block(2).unwrap()), "二○二五年六月十日");

        let mut empty = document_with_body(&format!("<w:body>{}</w:body>", summary_table(&[])));
        let mut reporter = Reporter::new(&mut sink);
        assert_eq!(write_narrative(&mut empty, 0, &config, &mut reporter), 0);
        assert_eq!(reporter.warnings(), 1);
        assert_eq!(table::row_count(empty.block(0).unwrap()), 2);
    }

    #[test]
    fn empty_runs_collapse_and_title_gets_a_page_break() {
        let mut document = document_with_body(
            r#"<w:body><w:p/><w:p/><w:p><w:r><w:t xml:space="preserve">  </w:t></w:r></w:p>
            <w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl><w:p/>
            <w:p><w:r><w:t>正文</w:t></w:r></w:p><w:p/><w:p/><w:p><w:r><w:t>附表</w:t></w:r></w:p><w:sectPr/></w:body>"#,
        );
        assert_eq!(collapse_empty_paragraphs(&mut document, 1), 3);
        assert_eq!(texts(&document), vec!["", "<table>", "", "正文", "", "附表", ""]);

        assert!(break_before_schedule_title(&mut document));
        assert!(word::has_page_break(document.block(5).unwrap()));
        assert!(!break_before_schedule_title(&mut document));
        assert_eq!(document.block_count(), 8);
    }

    #[test]
    fn only_digit_free_headings_are_schedule_titles() {
        let paragraph = |text: &str| node::parse("test", format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text).as_bytes()).unwrap();
        assert!(is_schedule_title(&paragraph("附表")));
        assert!(is_schedule_title(&paragraph("附表一")));
        assert!(!is_schedule_title(&paragraph("附表1 压实度检测结果表")));
        assert!(!is_schedule_title(&paragraph("附表１ 压实度检测结果表")));
        assert!(!is_schedule_title(&paragraph("附表٣")));
    }

    #[test]
    fn trailing_empty_paragraphs_keep_one() {
        let mut document = document_with_body(
            r#"<w:body><w:p><w:r><w:t>结论</w:t></w:r></w:p><w:p/><w:p/>
            <w:p><w:r><w:br w:type="page"/></w:r></w:p><w:p><w:r><w:t xml:space="preserve"> </w:t></w:r></w:p><w:sectPr/></w:body>"#,
        );
        assert_eq!(collapse_empty_paragraphs(&mut document, 5), 0);
        assert_eq!(trim_trailing_empty_paragraphs(&mut document), 3);
        assert_eq!(texts(&document), vec!["结论", "", ""]);
        assert!(document.block(2).unwrap().is("w:sectPr"));
        assert_eq!(trim_trailing_empty_paragraphs(&mut document), 0);

        let mut ending_in_table = document_with_body(
            "<w:body><w:p/><w:p/><w:tbl><w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl><w:sectPr/></w:body>",
        );
        assert_eq!(trim_trailing_empty_paragraphs(&mut ending_in_table), 0);
        assert_eq!(ending_in_table.block_count(), 4);
    }
}
