//! Whole-document passes run after all content is written. Both are idempotent.
use crate::document::node::XmlElement;
use crate::document::word;
use crate::document::word::ScriptFonts;
use crate::document::word::R_PR_ORDER;
use crate::document::Document;
use crate::engine::config::FontConfig;
use regex::Regex;

const DENSITY_UNIT: &str = "g/cm3";

/// Whether a paragraph already carries a superscript run
fn has_superscript(paragraph: &XmlElement) -> bool {
    let mut alignments = Vec::new();
    paragraph.descendants("w:vertAlign", &mut alignments);
    alignments.iter().any(|alignment| alignment.attribute("w:val") == Some("superscript"))
}

/// Rebuilds a paragraph so every `g/cm3` ends in a superscript `3`
fn superscript_units(paragraph: &mut XmlElement) {
    let text = word::paragraph_text(paragraph);
    let base = word::first_run_properties(paragraph);
    let mut superscript = base.clone().unwrap_or_else(|| XmlElement::new("w:rPr"));
    superscript.set_child(XmlElement::new("w:vertAlign").with_attribute("w:val", "superscript"), &R_PR_ORDER);

    let mut runs = Vec::new();
    let parts: Vec<&str> = text.split(DENSITY_UNIT).collect();
    for (index, part) in parts.iter().enumerate() {
        if !part.is_empty() {
            runs.push(word::text_run(part, base.clone()));
        }
        if index + 1 < parts.len() {
            runs.push(word::text_run("g/cm", base.clone()));
            runs.push(word::text_run("3", Some(superscript.clone())));
        }
    }
    word::replace_runs(paragraph, runs);
}

/// Writes the `3` of every `g/cm3` as superscript, in body paragraphs and table
/// cells alike
///
/// # Returns
/// Number of rebuilt paragraphs
pub(crate) fn superscript_density_units(document: &mut Document) -> usize {
    let mut rebuilt = 0;
    document.body.visit_mut("w:p", &mut |paragraph| {
        if word::paragraph_text(paragraph).contains(DENSITY_UNIT) && !has_superscript(paragraph) {
            superscript_units(paragraph);
            rebuilt += 1;
        }
    });
    rebuilt
}

/// Gives every schedule heading the same runs: CJK text in the CJK font, the rest
/// in the Latin font, bold at heading size
///
/// # Returns
/// Number of headings rewritten
pub(crate) fn unify_schedule_headings(document: &mut Document, fonts: &FontConfig) -> usize {
    let pattern = Regex::new(r"^附表\d+\s+压实度检测结果表（.*）$").expect("Hardcode regex pattern");
    let script_fonts = ScriptFonts {
        cjk: fonts.cjk.clone(),
        other: fonts.latin.clone(),
    };
    let mut unified = 0;
    document.body.visit_mut("w:p", &mut |paragraph| {
        let text = word::paragraph_text(paragraph);
        let text = text.trim();
        if pattern.is_match(text) {
            word::replace_runs(paragraph, word::script_runs(text, &script_fonts, fonts.heading_size, true));
            unified += 1;
        }
    });
    unified
}
