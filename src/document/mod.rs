//! # Word Document Model
//!
//! A `.docx` package held in memory. The main document part is parsed into an owned
//! [`node::XmlElement`] tree whose body children ("blocks": paragraphs and tables)
//! can be inspected, inserted, and removed by position. Every other part is kept
//! as raw bytes and written back unchanged.
pub(crate) mod node;
pub(crate) mod table;
pub(crate) mod word;

use crate::document::node::XmlElement;
use crate::document::node::XmlNode;
use crate::error::ReportError;
use crate::error::ResultMessage;
use crate::helpers::reader::UnifiedReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::CompressionMethod;
use zip::ZipArchive;
use zip::ZipWriter;

/// Fallback location of the main part when the package relationships do not name one
const DEFAULT_MAIN_PART: &str = "word/document.xml";

/// Errors raised by the document model
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Document '{0}' has no main document part")]
    MainPartNotFoundError(String),

    #[error("Main part of '{0}' has no body")]
    BodyNotFoundError(String),
}

/// How a staged file reached its final path
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum SaveOutcome {
    Renamed,
    /// The rename failed for the given reason and the bytes were copied instead
    Copied(String),
}

/// One part of the package, kept verbatim unless it is the main part
#[derive(Clone, Debug)]
struct PackageEntry {
    name: String,
    bytes: Vec<u8>,
    compression: CompressionMethod,
    is_dir: bool,
}

/// An opened Word document
#[derive(Clone, Debug)]
pub(crate) struct Document {
    /// File name used in messages
    pub(crate) name: String,
    entries: Vec<PackageEntry>,
    main_part: String,
    /// `w:document` with its body taken out
    root: XmlElement,
    /// Position of the body among the root's children
    body_index: usize,
    /// `w:body`; its children are the blocks
    pub(crate) body: XmlElement,
}

impl Document {
    /// Opens a document from disk, reading the whole package into memory
    pub(crate) fn open(path: &Path) -> Result<Document, ReportError> {
        let name = path.to_string_lossy().to_string();
        let reader = UnifiedReader::load(path)
            .with_prefix(&format!("Read document '{}'", name))?;
        Self::read(&name, reader)
    }

    /// Opens a document held in memory
    pub(crate) fn from_bytes(name: &str, bytes: Vec<u8>) -> Result<Document, ReportError> {
        Self::read(name, UnifiedReader::from_bytes(bytes))
    }

    fn read(name: &str, reader: UnifiedReader) -> Result<Document, ReportError> {
        let mut zip = ZipArchive::new(reader)?;
        let main_part = zip.relationships("_rels/.rels", "/officeDocument")?
            .into_values()
            .next()
            .map(|target| target.trim_start_matches('/').to_owned())
            .unwrap_or_else(|| DEFAULT_MAIN_PART.to_owned());

        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let mut file = zip.by_index(index)?;
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)?;
            entries.push(PackageEntry {
                name: file.name().to_owned(),
                bytes,
                compression: file.compression(),
                is_dir: file.is_dir(),
            });
        }

        let main_bytes = entries.iter()
            .find(|entry| entry.name.eq_ignore_ascii_case(&main_part))
            .map(|entry| entry.bytes.as_slice())
            .ok_or_else(|| DocumentError::MainPartNotFoundError(name.to_owned()))?;
        let mut root = node::parse(&main_part, main_bytes)?;
        let body_index = root.children.iter()
            .position(|node| node.as_element().map(|element| element.is("w:body")).unwrap_or(false))
            .ok_or_else(|| DocumentError::BodyNotFoundError(name.to_owned()))?;
        let body = match root.children.remove(body_index) {
            XmlNode::Element(body) => body,
            XmlNode::Text(_) => Err(DocumentError::BodyNotFoundError(name.to_owned()))?,
        };

        Ok(Document {
            name: name.to_owned(),
            entries,
            main_part,
            root,
            body_index,
            body,
        })
    }

    pub(crate) fn block_count(&self) -> usize {
        self.body.children.len()
    }

    pub(crate) fn block(&self, position: usize) -> Option<&XmlElement> {
        self.body.children.get(position).and_then(XmlNode::as_element)
    }

    pub(crate) fn block_mut(&mut self, position: usize) -> Option<&mut XmlElement> {
        self.body.children.get_mut(position).and_then(XmlNode::as_element_mut)
    }

    /// Positions of all body paragraphs in document order
    pub(crate) fn paragraph_positions(&self) -> Vec<usize> {
        self.body.positions_of("w:p")
    }

    /// First block at or after `from` that satisfies the predicate
    pub(crate) fn find_block<P>(&self, from: usize, predicate: P) -> Option<usize>
    where
        P: Fn(&XmlElement) -> bool,
    {
        (from..self.block_count()).find(|position| self.block(*position).map(&predicate).unwrap_or(false))
    }

    pub(crate) fn insert_block(&mut self, position: usize, block: XmlElement) {
        let position = position.min(self.body.children.len());
        self.body.children.insert(position, XmlNode::Element(block));
    }

    pub(crate) fn remove_block(&mut self, position: usize) -> Option<XmlElement> {
        if position < self.body.children.len() {
            match self.body.children.remove(position) {
                XmlNode::Element(element) => Some(element),
                XmlNode::Text(_) => None,
            }
        } else {
            None
        }
    }

    /// Appends a block at the end of the body, ahead of the final section properties
    ///
    /// # Returns
    /// Position of the appended block
    pub(crate) fn append_block(&mut self, block: XmlElement) -> usize {
        let position = match self.body.children.last() {
            Some(XmlNode::Element(last)) if last.is("w:sectPr") => self.body.children.len() - 1,
            _ => self.body.children.len(),
        };
        self.body.children.insert(position, XmlNode::Element(block));
        position
    }

    /// Serializes the main part with the body put back in place
    pub(crate) fn main_part_xml(&self) -> String {
        let mut output = String::from(node::XML_DECLARATION);
        self.root.write_start(&mut output);
        for (index, child) in self.root.children.iter().enumerate() {
            if index == self.body_index {
                self.body.write(&mut output);
            }
            match child {
                XmlNode::Element(element) => element.write(&mut output),
                XmlNode::Text(text) => output.push_escaped(text),
            }
        }
        if self.body_index >= self.root.children.len() {
            self.body.write(&mut output);
        }
        self.root.write_close(&mut output);
        output
    }

    /// Writes the package to `path`
    pub(crate) fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let main_part = self.main_part_xml();
        let mut writer = ZipWriter::new(File::create(path)?);
        for entry in &self.entries {
            let compression = match entry.compression {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            let options = SimpleFileOptions::default().compression_method(compression);
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            writer.start_file(entry.name.as_str(), options)?;
            if entry.name.eq_ignore_ascii_case(&self.main_part) {
                writer.write_all(main_part.as_bytes())?;
            } else {
                writer.write_all(&entry.bytes)?;
            }
        }
        writer.finish()?;
        Ok(())
    }

    /// Saves through a staged temporary file next to the output.
    ///
    /// The output directory is created when missing. A pre-existing output stays
    /// untouched until the staged file is complete.
    pub(crate) fn save(&self, output: &Path) -> Result<SaveOutcome, ReportError> {
        if let Some(directory) = output.parent() {
            if !directory.as_os_str().is_empty() && !directory.exists() {
                std::fs::create_dir_all(directory)?;
            }
        }
        let staged = self.stage(output)?;
        promote(&staged, output)
    }

    /// Writes the package to `<output>.temp`
    pub(crate) fn stage(&self, output: &Path) -> Result<PathBuf, ReportError> {
        let staged = staged_path(output);
        if let Err(error) = self.write_to(&staged) {
            let _ = std::fs::remove_file(&staged);
            return Err(error).with_prefix(&format!("Write '{}'", staged.display()));
        }
        Ok(staged)
    }
}

/// Path of the staged copy of an output file
pub(crate) fn staged_path(output: &Path) -> PathBuf {
    let mut staged = output.as_os_str().to_owned();
    staged.push(".temp");
    PathBuf::from(staged)
}

/// Moves a staged file onto its final path.
///
/// The old output is removed and the staged file renamed; when that fails the
/// staged bytes are copied over the output directly.
pub(crate) fn promote(staged: &Path, output: &Path) -> Result<SaveOutcome, ReportError> {
    promote_with(staged, output, |from: &Path, to: &Path| std::fs::rename(from, to))
}

fn promote_with<F>(staged: &Path, output: &Path, rename: F) -> Result<SaveOutcome, ReportError>
where
    F: Fn(&Path, &Path) -> std::io::Result<()>,
{
    let renamed = (|| -> std::io::Result<()> {
        if output.exists() {
            std::fs::remove_file(output)?;
        }
        rename(staged, output)
    })();
    let primary = match renamed {
        Ok(()) => return Ok(SaveOutcome::Renamed),
        Err(error) => error,
    };
    log::debug!("Rename '{}' failed: {}; copying instead", staged.display(), primary);
    match std::fs::copy(staged, output) {
        Ok(_) => {
            let _ = std::fs::remove_file(staged);
            Ok(SaveOutcome::Copied(primary.to_string()))
        }
        Err(fallback) => Err(ReportError::SaveError {
            path: output.to_string_lossy().to_string(),
            primary: primary.to_string(),
            fallback: fallback.to_string(),
        }),
    }
}
