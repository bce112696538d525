//! WordprocessingML paragraph and run helpers
use crate::document::node::XmlElement;
use crate::document::node::XmlNode;

/// Children of `w:pPr` in schema order
pub(crate) const P_PR_ORDER: [&str; 36] = [
    "w:pStyle", "w:keepNext", "w:keepLines", "w:pageBreakBefore", "w:framePr", "w:widowControl",
    "w:numPr", "w:suppressLineNumbers", "w:pBdr", "w:shd", "w:tabs", "w:suppressAutoHyphens",
    "w:kinsoku", "w:wordWrap", "w:overflowPunct", "w:topLinePunct", "w:autoSpaceDE", "w:autoSpaceDN",
    "w:bidi", "w:adjustRightInd", "w:snapToGrid", "w:spacing", "w:ind", "w:contextualSpacing",
    "w:mirrorIndents", "w:suppressOverlap", "w:jc", "w:textDirection", "w:textAlignment",
    "w:textboxTightWrap", "w:outlineLvl", "w:divId", "w:cnfStyle", "w:rPr", "w:sectPr", "w:pPrChange",
];

/// Children of `w:rPr` in schema order
pub(crate) const R_PR_ORDER: [&str; 39] = [
    "w:rStyle", "w:rFonts", "w:b", "w:bCs", "w:i", "w:iCs", "w:caps", "w:smallCaps", "w:strike",
    "w:dstrike", "w:outline", "w:shadow", "w:emboss", "w:imprint", "w:noProof", "w:snapToGrid",
    "w:vanish", "w:webHidden", "w:color", "w:spacing", "w:w", "w:kern", "w:position", "w:sz",
    "w:szCs", "w:highlight", "w:u", "w:effect", "w:bdr", "w:shd", "w:fitText", "w:vertAlign",
    "w:rtl", "w:cs", "w:em", "w:lang", "w:eastAsianLayout", "w:specVanish", "w:oMath",
];

/// Properties always lead their paragraph
pub(crate) const PARAGRAPH_ORDER: [&str; 1] = ["w:pPr"];

/// Content that keeps a paragraph from counting as blank
const NON_TEXT_CONTENT: [&str; 5] = ["w:sectPr", "w:drawing", "w:pict", "w:object", "mc:AlternateContent"];

/// Subtrees that contribute no paragraph text
const TEXTLESS: [&str; 7] = ["w:pPr", "w:rPr", "w:del", "w:drawing", "w:pict", "w:object", "mc:AlternateContent"];

/// Script class of a character, used to pick the run font
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Script {
    /// CJK ideographs, CJK punctuation and full-width forms
    Cjk,
    Other,
}

pub(crate) fn classify(character: char) -> Script {
    match character {
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{3000}'..='\u{303F}'
        | '\u{FF00}'..='\u{FFEF}' => Script::Cjk,
        _ => Script::Other,
    }
}

/// Splits text into maximal runs of one script class
pub(crate) fn split_by_script(text: &str) -> Vec<(Script, String)> {
    let mut pieces: Vec<(Script, String)> = Vec::new();
    for character in text.chars() {
        let script = classify(character);
        match pieces.last_mut() {
            Some((last, piece)) if *last == script => piece.push(character),
            _ => pieces.push((script, character.to_string())),
        }
    }
    pieces
}

/// Character formatting of a generated run
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct RunFormat {
    pub(crate) font: String,
    /// Size in half-points (`w:sz`)
    pub(crate) size: u32,
    pub(crate) bold: bool,
}

impl RunFormat {
    pub(crate) fn new(font: &str, size: u32, bold: bool) -> Self {
        RunFormat {
            font: font.to_owned(),
            size,
            bold,
        }
    }

    /// Builds the `w:rPr` element.
    /// Non-bold is written explicitly so paragraph and style bolding does not leak in.
    pub(crate) fn properties(&self) -> XmlElement {
        let mut properties = XmlElement::new("w:rPr").with_child(
            XmlElement::new("w:rFonts")
                .with_attribute("w:ascii", &self.font)
                .with_attribute("w:hAnsi", &self.font)
                .with_attribute("w:eastAsia", &self.font)
                .with_attribute("w:cs", &self.font),
        );
        if self.bold {
            properties = properties
                .with_child(XmlElement::new("w:b"))
                .with_child(XmlElement::new("w:bCs"));
        } else {
            properties = properties
                .with_child(XmlElement::new("w:b").with_attribute("w:val", "0"))
                .with_child(XmlElement::new("w:bCs").with_attribute("w:val", "0"));
        }
        let size = self.size.to_string();
        properties = properties
            .with_child(XmlElement::new("w:sz").with_attribute("w:val", &size))
            .with_child(XmlElement::new("w:szCs").with_attribute("w:val", &size));
        properties
    }
}

/// Fonts used for each script class
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ScriptFonts {
    pub(crate) cjk: String,
    pub(crate) other: String,
}

impl ScriptFonts {
    pub(crate) fn font_for(&self, script: Script) -> &str {
        match script {
            Script::Cjk => &self.cjk,
            Script::Other => &self.other,
        }
    }
}

/// Builds a `w:r` holding `text` with the given properties
pub(crate) fn text_run(text: &str, properties: Option<XmlElement>) -> XmlElement {
    let mut content = XmlElement::new("w:t");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        content.set_attribute("xml:space", "preserve");
    }
    let mut run = XmlElement::new("w:r");
    if let Some(properties) = properties {
        run = run.with_child(properties);
    }
    run.with_child(content.with_text(text))
}

/// Builds one run per script class piece of `text`
pub(crate) fn script_runs(text: &str, fonts: &ScriptFonts, size: u32, bold: bool) -> Vec<XmlElement> {
    split_by_script(text)
        .into_iter()
        .map(|(script, piece)| {
            let format = RunFormat::new(fonts.font_for(script), size, bold);
            text_run(&piece, Some(format.properties()))
        })
        .collect()
}

/// Builds a paragraph from runs, optionally aligned
pub(crate) fn new_paragraph(alignment: Option<&str>, runs: Vec<XmlElement>) -> XmlElement {
    let mut paragraph = XmlElement::new("w:p");
    if let Some(alignment) = alignment {
        set_alignment(&mut paragraph, alignment);
    }
    for run in runs {
        paragraph.children.push(XmlNode::Element(run));
    }
    paragraph
}

/// Visible text of a paragraph: `w:t` content, tabs as `\t`, breaks as `\n`
pub(crate) fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut text = String::new();
    collect_text(paragraph, &mut text);
    text
}

fn collect_text(element: &XmlElement, text: &mut String) {
    for child in element.elements() {
        match child.name.as_str() {
            "w:t" => {
                for node in &child.children {
                    if let XmlNode::Text(content) = node {
                        text.push_str(content);
                    }
                }
            }
            "w:tab" => text.push('\t'),
            "w:br" | "w:cr" => text.push('\n'),
            name if TEXTLESS.contains(&name) => (),
            _ => collect_text(child, text),
        }
    }
}

/// Whether a paragraph shows nothing: whitespace and page breaks only,
/// no drawings and no section properties
pub(crate) fn is_empty_paragraph(paragraph: &XmlElement) -> bool {
    paragraph.is("w:p")
        && paragraph_text(paragraph).trim().is_empty()
        && !paragraph.elements().any(|child| child.contains_any(&NON_TEXT_CONTENT))
}

pub(crate) fn has_page_break(paragraph: &XmlElement) -> bool {
    let mut breaks = Vec::new();
    paragraph.descendants("w:br", &mut breaks);
    breaks.iter().any(|element| element.attribute("w:type") == Some("page"))
}

pub(crate) fn page_break_paragraph() -> XmlElement {
    XmlElement::new("w:p").with_child(
        XmlElement::new("w:r").with_child(XmlElement::new("w:br").with_attribute("w:type", "page")),
    )
}

/// Paragraph properties, created when missing
pub(crate) fn paragraph_properties(paragraph: &mut XmlElement) -> &mut XmlElement {
    paragraph.ensure_child("w:pPr", &PARAGRAPH_ORDER)
}

pub(crate) fn set_alignment(paragraph: &mut XmlElement, alignment: &str) {
    paragraph_properties(paragraph)
        .ensure_child("w:jc", &P_PR_ORDER)
        .set_attribute("w:val", alignment);
}

/// Properties of the first run that has any
pub(crate) fn first_run_properties(paragraph: &XmlElement) -> Option<XmlElement> {
    let mut runs = Vec::new();
    paragraph.descendants("w:r", &mut runs);
    runs.into_iter().find_map(|run| run.child("w:rPr").cloned())
}

/// Removes everything but the paragraph properties
pub(crate) fn clear_runs(paragraph: &mut XmlElement) {
    paragraph
        .children
        .retain(|node| node.as_element().map(|element| element.is("w:pPr")).unwrap_or(false));
}

/// Replaces the content of a paragraph, keeping its properties
pub(crate) fn replace_runs(paragraph: &mut XmlElement, runs: Vec<XmlElement>) {
    clear_runs(paragraph);
    for run in runs {
        paragraph.children.push(XmlNode::Element(run));
    }
}
