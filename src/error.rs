//! Error types for bncparse
//!
//! Loading a document can fail in four distinct ways: the file cannot be
//! read, its bytes cannot be decoded as text, the text is not well-formed
//! XML, or a configured resource limit is exceeded. Each has its own
//! variant so callers can tell a transient I/O failure from permanently
//! malformed content.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias using bncparse Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for loading and parsing XML documents
#[derive(Error, Debug)]
pub enum Error {
    /// The file could not be opened or read
    #[error("I/O error reading '{}': {source}", .path.display())]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// The file content could not be decoded as text
    #[error("encoding error: {0}")]
    Encoding(String),

    /// The text is not a well-formed XML document
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// File system failure
    Io,
    /// Text decoding failure
    Encoding,
    /// Malformed XML
    Parse,
    /// Resource limit exceeded
    LimitExceeded,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Io => "io",
            ErrorKind::Encoding => "encoding",
            ErrorKind::Parse => "parse",
            ErrorKind::LimitExceeded => "limit",
        };
        f.pad(name)
    }
}

impl Error {
    /// Build an I/O error for `path`
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io { .. } => ErrorKind::Io,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::Parse(_) => ErrorKind::Parse,
            Error::LimitExceeded(_) => ErrorKind::LimitExceeded,
        }
    }

    /// Whether this is a file system failure (possibly worth retrying)
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }

    /// Whether the content itself is unusable (not worth retrying)
    pub fn is_content_error(&self) -> bool {
        matches!(self, Error::Encoding(_) | Error::Parse(_))
    }

    /// The underlying OS error, if any
    pub fn io_error(&self) -> Option<&std::io::Error> {
        match self {
            Error::Io { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Attach the file path to a parse error; other variants pass through
    pub(crate) fn in_file(self, path: &Path) -> Self {
        match self {
            Error::Parse(err) => Error::Parse(err.with_file(path)),
            other => other,
        }
    }
}

/// XML well-formedness error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// 1-based line of the offending input, when known
    pub line: Option<usize>,
    /// 1-based column (in bytes) of the offending input, when known
    pub column: Option<usize>,
    /// File the input was read from
    pub file: Option<PathBuf>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
            file: None,
        }
    }

    /// Set the position from a byte offset into `source`
    pub fn with_position(mut self, source: &str, offset: usize) -> Self {
        let (line, column) = line_column(source, offset);
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    /// Set the file path
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        match (&self.file, self.line, self.column) {
            (Some(file), Some(line), Some(col)) => {
                write!(f, " at {}:{}:{}", file.display(), line, col)
            }
            (Some(file), _, _) => write!(f, " in {}", file.display()),
            (None, Some(line), Some(col)) => write!(f, " at line {}, column {}", line, col),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for ParseError {}

/// 1-based line and column of a byte offset
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let bytes = source.as_bytes();
    let offset = offset.min(bytes.len());
    let before = &bytes[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    (line, offset - line_start + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unclosed element 'root'")
            .with_position("<root>\n  <a>", 9)
            .with_file("doc.xml");

        let msg = format!("{}", err);
        assert_eq!(msg, "unclosed element 'root' at doc.xml:2:3");
    }

    #[test]
    fn test_parse_error_display_without_file() {
        let err = ParseError::new("bad").with_position("abc", 0);
        assert_eq!(err.to_string(), "bad at line 1, column 1");
        assert_eq!(ParseError::new("bad").to_string(), "bad");
    }

    #[test]
    fn test_line_column_clamps_offset() {
        assert_eq!(line_column("ab\ncd", 100), (2, 3));
        assert_eq!(line_column("", 0), (1, 1));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ParseError::new("test").into();
        assert!(matches!(err, Error::Parse(_)));
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.is_content_error());
        assert!(!err.is_io());
    }

    #[test]
    fn test_io_error_kind() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = Error::io("/nope.xml", source);
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.is_io());
        assert_eq!(
            err.io_error().map(|e| e.kind()),
            Some(std::io::ErrorKind::NotFound)
        );
        assert!(err.to_string().contains("/nope.xml"));
    }

    #[test]
    fn test_in_file_only_touches_parse_errors() {
        let err = Error::from(ParseError::new("x")).in_file(Path::new("a.xml"));
        match err {
            Error::Parse(p) => assert_eq!(p.file.as_deref(), Some(Path::new("a.xml"))),
            other => panic!("unexpected {other:?}"),
        }

        let err = Error::Encoding("bad".into()).in_file(Path::new("a.xml"));
        assert_eq!(err.kind(), ErrorKind::Encoding);
    }
}
