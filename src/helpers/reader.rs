use crate::error::ReportError;
use std::fs::File;
use std::io::BufReader;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use std::path::Path;

/// A unified reader over a package on disk or a package already held in memory
pub(crate) enum UnifiedReader {
    /// Local file reader
    Local(BufReader<File>),
    /// In-memory buffer
    Memory(Cursor<Vec<u8>>),
}

impl UnifiedReader {
    /// Opens a local file for streaming reads
    ///
    /// # Arguments
    /// * `path` - Path to the file
    ///
    /// # Returns
    /// * `Result<UnifiedReader, ReportError>` - Reader for the file content
    pub(crate) fn open(path: &Path) -> Result<UnifiedReader, ReportError> {
        let file = File::open(path)?;
        Ok(UnifiedReader::Local(BufReader::new(file)))
    }

    /// Reads the whole file up front so no handle stays open on `path`
    pub(crate) fn load(path: &Path) -> Result<UnifiedReader, ReportError> {
        Ok(UnifiedReader::Memory(Cursor::new(std::fs::read(path)?)))
    }

    /// Wraps bytes that are already in memory
    pub(crate) fn from_bytes(bytes: Vec<u8>) -> UnifiedReader {
        UnifiedReader::Memory(Cursor::new(bytes))
    }
}

impl Read for UnifiedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            UnifiedReader::Local(reader) => reader.read(buf),
            UnifiedReader::Memory(reader) => reader.read(buf),
        }
    }
}

impl Seek for UnifiedReader {
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        match self {
            UnifiedReader::Local(reader) => reader.seek(pos),
            UnifiedReader::Memory(reader) => reader.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::SeekFrom;

    #[test]
    fn test_open_local_file() {
        // Cargo.toml always exists at the crate root
        let result = UnifiedReader::open(Path::new("Cargo.toml"));
        assert!(result.is_ok(), "Failed to open local file: {:?}", result.err());

        let result = UnifiedReader::open(Path::new("non_existent_file.xlsx"));
        assert!(result.is_err(), "Should fail to open non-existent file");
    }

    #[test]
    fn test_load_matches_streamed_content() {
        let mut streamed = Vec::new();
        UnifiedReader::open(Path::new("Cargo.toml")).unwrap().read_to_end(&mut streamed).unwrap();
        let mut loaded = Vec::new();
        UnifiedReader::load(Path::new("Cargo.toml")).unwrap().read_to_end(&mut loaded).unwrap();
        assert_eq!(streamed, loaded);
    }

    #[test]
    fn test_memory_reader_seeks() {
        let mut reader = UnifiedReader::from_bytes(b"PK0123".to_vec());
        reader.seek(SeekFrom::Start(2)).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "0123");
    }
}
