//! Office Open XML workbook helpers
use crate::error::ReportError;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::zip::ZipHelper;
use crate::spreadsheet::cell::NumberFormat;
use crate::spreadsheet::SpreadsheetError;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use zip::ZipArchive;

/// Signature of an OLE compound file, which is what an encrypted workbook is stored in
const COMPOUND_FILE_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Opens a workbook package and loads its structure
///
/// # Arguments
/// * `name` - Name of the workbook used in error messages
/// * `reader` - Reader positioned anywhere in the package
/// * `load_workbook` - Function to load worksheet names, paths and the date system
/// * `load_number_formats` - Function to load number formats indexed by style
///
/// # Returns
/// Tuple containing:
/// - Zip archive handle
/// - Number formats indexed by cell style id
/// - List of sheet names and their paths
pub(super) fn open<W, F>(name: &str, mut reader: UnifiedReader, load_workbook: W, load_number_formats: F) -> Result<(
    ZipArchive<UnifiedReader>,
    Vec<NumberFormat>,
    Vec<(String, String)>
), ReportError>
where
    W: Fn(&mut ZipArchive<UnifiedReader>) -> Result<(Vec<(String, String)>, bool), ReportError>,
    F: Fn(&mut ZipArchive<UnifiedReader>, bool) -> Result<Vec<NumberFormat>, ReportError>,
{
    if is_password_protected(&mut reader)? {
        Err(SpreadsheetError::SpreadsheetPasswordProtectedError(name.to_owned()))?;
    }

    let mut zip = ZipArchive::new(reader)?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SpreadsheetError::SpreadsheetEmptyError(name.to_owned()))?
    }

    let number_formats = load_number_formats(&mut zip, is_1904)?;
    Ok((zip, number_formats, sheets))
}

/// Loads worksheet relationships from a workbook package
///
/// # Arguments
/// * `zip` - Zip archive handle
/// * `path` - Path to the relationships XML file within the archive
///
/// # Returns
/// Mapping of relationship IDs to worksheet paths
pub(super) fn load_relationships(zip: &mut ZipArchive<UnifiedReader>, path: &str) -> Result<HashMap<String, String>, ReportError> {
    if zip.file(path)?.is_none() {
        Err(SpreadsheetError::FileError(path.to_string()))?;
    }
    let relationships = zip.relationships(path, "/worksheet")?
        .into_iter()
        .map(|(id, target)| (id, to_zip_path(Cow::Owned(target))))
        .collect();
    Ok(relationships)
}

/// Maps style format ids to number formats using custom and built-in formats
///
/// # Arguments
/// * `format_indexes` - Format id of each cell style, in style order
/// * `custom_formats` - Custom format mappings defined in the workbook
/// * `is_1904` - Whether the workbook uses the 1904 date system
///
/// # Returns
/// Number format of each cell style
pub(super) fn load_number_formats(format_indexes: Vec<String>, custom_formats: HashMap<String, NumberFormat>, is_1904: bool) -> Vec<NumberFormat> {
    format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .cloned()
                .or_else(|| NumberFormat::builtin(id, is_1904))
                .unwrap_or_else(|| NumberFormat::custom("General", is_1904))
        })
        .collect()
}

/// Normalizes a path to ensure it points to the correct location within the workbook package
///
/// # Arguments
/// * `path` - Original path from relationship or reference
///
/// # Returns
/// Normalized path suitable for accessing files within the zip archive
pub(crate) fn to_zip_path(path: Cow<'_, str>) -> String {
    if let Some(path) = path.strip_prefix("/xl/") {
        format!("xl/{path}")
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Checks if a workbook is an encrypted compound file rather than a zip package
///
/// # Arguments
/// * `reader` - File reader; rewound to the start afterwards
///
/// # Returns
/// `true` if the file starts with the compound file signature
fn is_password_protected(reader: &mut UnifiedReader) -> Result<bool, ReportError> {
    let mut signature = [0u8; 8];
    reader.seek(SeekFrom::Start(0))?;
    let matched = match reader.read_exact(&mut signature) {
        Ok(()) => signature == COMPOUND_FILE_SIGNATURE,
        Err(_) => false,
    };
    reader.seek(SeekFrom::Start(0))?;
    Ok(matched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellType;

    #[test]
    fn zip_paths_are_rooted_in_xl() {
        assert_eq!(to_zip_path(Cow::Borrowed("worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("/xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
        assert_eq!(to_zip_path(Cow::Borrowed("xl/worksheets/sheet1.xml")), "xl/worksheets/sheet1.xml");
    }

    #[test]
    fn style_formats_prefer_custom_then_builtin() {
        let mut custom = HashMap::new();
        custom.insert("164".to_owned(), NumberFormat::custom("0.000", false));
        let formats = load_number_formats(
            vec!["0".to_owned(), "164".to_owned(), "14".to_owned(), "2".to_owned()],
            custom,
            false,
        );
        assert_eq!(formats[0], NumberFormat { kind: CellType::Number, decimals: None });
        assert_eq!(formats[1].decimals, Some(3));
        assert_eq!(formats[2].kind, CellType::NumberDate1900);
        assert_eq!(formats[3].decimals, Some(2));
    }

    #[test]
    fn compound_files_are_detected() {
        let mut bytes = COMPOUND_FILE_SIGNATURE.to_vec();
        bytes.extend_from_slice(&[0u8; 32]);
        assert!(is_password_protected(&mut UnifiedReader::from_bytes(bytes)).unwrap());
        assert!(!is_password_protected(&mut UnifiedReader::from_bytes(b"PK\x03\x04".to_vec())).unwrap());
    }
}
