#![allow(dead_code)]

use regex::Regex;
use std::collections::BTreeMap;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipArchive;
use zip::ZipWriter;

pub const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:style w:type="paragraph" w:styleId="Normal"/></w:styles>"#;

pub const REMARK: &str = "最大干密度：1.48g/cm3，最佳含水率：14.4%；检测日期：2024年7月1日；检测方法：灌砂法";

/// Value of one worksheet cell
pub enum Value {
    Number(f64),
    Text(String),
}

fn split_reference(reference: &str) -> (String, usize) {
    let column: String = reference.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let row = reference[column.len()..].parse().expect("row number");
    (column, row)
}

fn column_number(column: &str) -> usize {
    column.bytes().fold(0, |number, byte| number * 26 + (byte - b'A' + 1) as usize)
}

fn write_parts(path: &Path, parts: &[(&str, String)]) {
    let file = std::fs::File::create(path).expect("create package");
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in parts {
        writer.start_file(*name, options).expect("start part");
        writer.write_all(content.as_bytes()).expect("write part");
    }
    writer.finish().expect("finish package");
}

/// Writes a one-sheet workbook; strings are stored inline
pub fn write_workbook(path: &Path, sheet: &str, cells: &[(String, Value)]) {
    let mut rows: BTreeMap<usize, Vec<(usize, String)>> = BTreeMap::new();
    for (reference, value) in cells {
        let (column, row) = split_reference(reference);
        let xml = match value {
            Value::Number(number) => format!(r#"<c r="{}"><v>{}</v></c>"#, reference, number),
            Value::Text(text) => format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, reference, text),
        };
        rows.entry(row).or_default().push((column_number(&column), xml));
    }
    let mut data = String::new();
    for (row, mut cells) in rows {
        cells.sort_by_key(|(column, _)| *column);
        data.push_str(&format!(r#"<row r="{}">"#, row));
        for (_, xml) in cells {
            data.push_str(&xml);
        }
        data.push_str("</row>");
    }

    write_parts(path, &[
        ("[Content_Types].xml", r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_owned()),
        ("_rels/.rels", r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_owned()),
        ("xl/workbook.xml", format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#, sheet)),
        ("xl/_rels/workbook.xml.rels", r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_owned()),
        ("xl/worksheets/sheet1.xml", format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#, data)),
    ]);
}

/// Header, measurement and remark cells of one section
pub struct SectionFixture<'a> {
    pub station: &'a str,
    pub density: &'a str,
    pub moisture: &'a str,
    pub date: &'a str,
    /// Compaction of each filled data row
    pub compaction: &'a [f64],
}

/// Cells of sections laid out every 24 rows from row 7
pub fn section_cells(sections: &[SectionFixture]) -> Vec<(String, Value)> {
    let mut cells = Vec::new();
    for (index, section) in sections.iter().enumerate() {
        let offset = index * 24;
        let text = |column: &str, row: usize, value: &str| {
            (format!("{}{}", column, row + offset), Value::Text(value.to_owned()))
        };
        cells.push(text("B", 3, "某某道路工程"));
        cells.push(text("B", 4, "第一标段"));
        cells.push(text("B", 5, section.station));
        cells.push(text("L", 3, "路基"));
        cells.push(text("L", 5, "93区"));
        cells.push(text("P", 5, "灌砂法"));
        cells.push(text("T", 5, "≥94"));
        cells.push(text("S", 4, section.date));
        cells.push(text("C", 8, section.density));
        cells.push(text("K", 8, section.moisture));
        for (row, compaction) in section.compaction.iter().enumerate() {
            let row = 7 + row + offset;
            cells.push((format!("X{}", row), Value::Number((row - offset) as f64)));
            cells.push((format!("Y{}", row), Value::Number(1.85)));
            cells.push((format!("AC{}", row), Value::Number(*compaction)));
        }
    }
    cells
}

fn cell(text: &str) -> String {
    if text.is_empty() {
        "<w:tc><w:p/></w:tc>".to_owned()
    } else {
        format!("<w:tc><w:p><w:r><w:t>{}</w:t></w:r></w:p></w:tc>", text)
    }
}

fn row(cells: &[&str]) -> String {
    format!("<w:tr>{}</w:tr>", cells.iter().map(|text| cell(text)).collect::<String>())
}

/// Writes a report template with a summary table, one narrative placeholder and
/// a schedule of `data_rows` rows
pub fn write_template(path: &Path, data_rows: usize) {
    let mut schedule = String::from(r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid><w:gridCol w:w="800"/><w:gridCol w:w="1200"/><w:gridCol w:w="1200"/><w:gridCol w:w="1200"/><w:gridCol w:w="1200"/><w:gridCol w:w="1200"/><w:gridCol w:w="1200"/></w:tblGrid>"#);
    schedule.push_str(&row(&["序号", "桩号", "湿密度", "含水率", "干密度", "最大干密度", "压实度"]));
    for _ in 0..data_rows {
        schedule.push_str(&row(&["", "", "", "", "", "", ""]));
    }
    schedule.push_str(&format!(r#"<w:tr>{}<w:tc><w:tcPr><w:gridSpan w:val="6"/></w:tcPr><w:p><w:r><w:rPr><w:sz w:val="18"/></w:rPr><w:t>{}</w:t></w:r></w:p></w:tc></w:tr>"#, cell("备注"), REMARK));
    schedule.push_str("</w:tbl>");

    let summary = [
        "<w:tbl>".to_owned(),
        row(&["序号", "检测部位", "规定值", "平均值", "检测点数", "合格点数", "合格率(%)", "备注"]),
        row(&["", "", "(%)", "(%)", "(个)", "(个)", "", ""]),
        row(&["1", "", "", "", "", "", "", ""]),
        "</w:tbl>".to_owned(),
    ]
    .concat();

    let body = [
        "<w:p><w:r><w:t>一、工程概况</w:t></w:r></w:p>".to_owned(),
        "<w:p><w:r><w:t>表2 压实度检测结果评定表</w:t></w:r></w:p>".to_owned(),
        summary,
        r#"<w:p><w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="3"/></w:numPr></w:pPr><w:r><w:t>本次对XX进行压实度检测。</w:t></w:r></w:p>"#.to_owned(),
        "<w:p/>".to_owned(),
        "<w:p><w:r><w:t>附表</w:t></w:r></w:p>".to_owned(),
        r#"<w:p><w:pPr><w:jc w:val="center"/></w:pPr><w:r><w:rPr><w:rFonts w:ascii="黑体" w:eastAsia="黑体"/><w:sz w:val="21"/></w:rPr><w:t>附表1 压实度检测结果表（承台回填土）</w:t></w:r></w:p>"#.to_owned(),
        schedule,
        r#"<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr>"#.to_owned(),
    ]
    .concat();
    write_document(path, &body);
}

/// Writes a document package whose body holds `body`, plus a styles part
pub fn write_document(path: &Path, body: &str) {
    write_parts(path, &[
        ("[Content_Types].xml", r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#.to_owned()),
        ("_rels/.rels", r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#.to_owned()),
        ("word/document.xml", format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#, body)),
        ("word/styles.xml", STYLES_XML.to_owned()),
    ]);
}

/// Reads one part of a package as text
pub fn read_part(path: &Path, name: &str) -> String {
    let file = std::fs::File::open(path).expect("open package");
    let mut archive = ZipArchive::new(file).expect("read package");
    let mut part = archive.by_name(name).expect("find part");
    let mut content = String::new();
    part.read_to_string(&mut content).expect("read part");
    content
}

/// Text of every paragraph of a document part, table cells included, in order
pub fn paragraph_texts(document_xml: &str) -> Vec<String> {
    let tags = Regex::new(r"<[^>]*>").expect("Hardcode regex pattern");
    let paragraph = Regex::new(r"(?s)<w:p[ >].*?</w:p>|<w:p/>").expect("Hardcode regex pattern");
    paragraph
        .find_iter(document_xml)
        .map(|found| tags.replace_all(found.as_str(), "").to_string())
        .collect()
}

/// Texts of the cells of the row whose second cell is `label`
pub fn summary_row(texts: &[String], label: &str) -> Vec<String> {
    let position = texts.iter().position(|text| text == label).expect("summary row");
    texts[position - 1..position + 7].to_vec()
}
