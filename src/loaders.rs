//! Loading XML documents from files
//!
//! A load is one linear sequence: open the file, read it whole, close it,
//! decode the bytes as text, build the tree. The file handle lives only
//! inside [`Loader::read_file`], so it is closed on every exit path before
//! parsing starts.

use crate::documents::Document;
use crate::error::{Error, Result};
use crate::limits::Limits;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Byte order marks of encodings that are not decoded
const UNSUPPORTED_BOMS: &[(&[u8], &str)] = &[
    (b"\x00\x00\xFE\xFF", "UTF-32BE"),
    (b"\xFF\xFE\x00\x00", "UTF-32LE"),
    (b"\xFE\xFF", "UTF-16BE"),
    (b"\xFF\xFE", "UTF-16LE"),
];

/// Resource loader for XML documents
#[derive(Debug, Clone, Default)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// The limits this loader enforces
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load and parse the XML file at `path`
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading XML document");

        let bytes = self.read_file(path)?;
        let text = decode_text(&bytes)?;
        let doc = Document::parse_with_limits(text, &self.limits).map_err(|e| e.in_file(path))?;

        debug!(
            path = %path.display(),
            bytes = bytes.len(),
            elements = doc.len(),
            root = %doc.root().name(),
            "loaded XML document"
        );
        Ok(doc)
    }

    /// Read the whole file at `path` into memory
    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let path = path.as_ref();
        let mut file = File::open(path).map_err(|e| Error::io(path, e))?;

        // Reject oversized files before reading them
        if let Ok(metadata) = file.metadata() {
            if metadata.is_file() {
                self.limits
                    .check_xml_size(usize::try_from(metadata.len()).unwrap_or(usize::MAX))?;
            }
        }

        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|e| Error::io(path, e))?;

        // Check size limits
        self.limits.check_xml_size(content.len())?;

        Ok(content)
    }
}

/// Decode file content as UTF-8 text, dropping a UTF-8 byte order mark
pub fn decode_text(bytes: &[u8]) -> Result<&str> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return decode_utf8(rest, UTF8_BOM.len());
    }
    if let Some((_, name)) = UNSUPPORTED_BOMS.iter().find(|(bom, _)| bytes.starts_with(bom)) {
        return Err(Error::Encoding(format!("{} input is not supported, only UTF-8", name)));
    }
    decode_utf8(bytes, 0)
}

fn decode_utf8(bytes: &[u8], base: usize) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| {
        Error::Encoding(format!("invalid UTF-8 at byte offset {}", base + e.valid_up_to()))
    })
}

/// Load and parse the XML file at `path` with default limits.
///
/// This is the crate's main entry point. It either returns the complete
/// tree or fails with an [`Error`] describing why: the file could not be
/// read ([`Error::Io`]), its bytes are not UTF-8 ([`Error::Encoding`]), or
/// its content is not well-formed XML ([`Error::Parse`]).
pub fn get_xml(path: impl AsRef<Path>) -> Result<Document> {
    Loader::new().load(path)
}
