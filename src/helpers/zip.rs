//! ZIP archive helper utilities for OOXML packages (.xlsx and .docx)
//! Provides convenient methods for accessing parts within the package

use crate::error::ReportError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::match_xml_events;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::io::BufReader;
use std::io::Read;
use std::io::Seek;
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

/// XML tag name for relationship elements in package relationship parts
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

/// Helper trait for ZIP archive operations with specialized reader creation
pub(crate) trait ZipHelper<RS: Read + Seek> {
    /// Gets a file from the ZIP archive by name (case-insensitive, path separator agnostic)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ReportError>;

    /// Creates an XML reader for a file within the ZIP archive
    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ReportError>;

    /// Reads a whole part into memory
    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ReportError>;

    /// Loads a relationship part into an id -> target map,
    /// keeping only relationships whose type ends with `kind_suffix`
    fn relationships(&mut self, path: &str, kind_suffix: &str) -> Result<HashMap<String, String>, ReportError>;
}

impl<RS: Read + Seek> ZipHelper<RS> for ZipArchive<RS> {
    /// Gets a file from the ZIP archive by name with case-insensitive matching
    /// and path separator normalization (backslash to forward slash)
    fn file(&'_ mut self, name: &str) -> Result<Option<ZipFile<'_, RS>>, ReportError> {
        let pattern = name.replace('\\', "/");
        let path = self.file_names()
            .find(|file_name| pattern.eq_ignore_ascii_case(*file_name))
            .map(|file_name| file_name.to_owned());
        match path.map(|file_name| self.by_name(&file_name)).transpose() {
            Ok(Some(file)) => Ok(Some(file)),
            Ok(None) | Err(ZipError::FileNotFound) => Ok(None),
            Err(error) => Err(error)?,
        }
    }

    fn xml_reader(
        &'_ mut self,
        name: &str,
    ) -> Result<Option<XmlReader<BufReader<ZipFile<'_, RS>>>>, ReportError> {
        let reader = self
            .file(name)?
            .map(|file| XmlReader::new(BufReader::new(file)));
        Ok(reader)
    }

    fn read_bytes(&mut self, name: &str) -> Result<Option<Vec<u8>>, ReportError> {
        match self.file(name)? {
            Some(mut file) => {
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    fn relationships(&mut self, path: &str, kind_suffix: &str) -> Result<HashMap<String, String>, ReportError> {
        let mut relationships: HashMap<String, String> = HashMap::new();
        let mut reader = match self.xml_reader(path)? {
            Some(reader) => reader,
            None => return Ok(relationships),
        };
        match_xml_events!(reader => {
            Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
                let id = event.get_attribute_value("Id")?;
                let kind = event.get_attribute_value("Type")?;
                let target = event.get_attribute_value("Target")?;
                if kind.map(|it| it.ends_with(kind_suffix)).unwrap_or(true) {
                    if let Some((id, target)) = id.zip(target) {
                        relationships.insert(id.to_string(), target.to_string());
                    }
                }
            }
        });
        Ok(relationships)
    }
}
