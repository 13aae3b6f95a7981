//! Error types for NIML parsing and serialization.
//!
//! All errors are fail-fast: the first structural problem aborts the parse or
//! write with no partial result and no recovery. Each variant carries enough
//! context (byte position, expected vs. found, a short excerpt of the input)
//! to diagnose the document without re-running under a debugger.
//!
//! ## Examples
//!
//! ```rust
//! use niml::{parse, NimlError};
//!
//! let result = parse(b"<dset ni_type=\"int\" ni_dimen=\"1\" >1");
//! assert!(matches!(result, Err(NimlError::MalformedDocument { .. })));
//! ```

use thiserror::Error;

/// Represents all possible errors that can occur while reading or writing a
/// NIML document.
#[derive(Debug, Clone, Error)]
pub enum NimlError {
    /// Neither a header nor a close tag could be matched at the current
    /// position.
    #[error("malformed document at byte {position}: {msg} near [{excerpt}]")]
    MalformedDocument {
        position: usize,
        msg: String,
        excerpt: String,
    },

    /// Non-whitespace, non-null bytes remain after the outermost close tag.
    #[error("unexpected trailing data after byte {position}: [{excerpt}]")]
    UnexpectedTrailingData { position: usize, excerpt: String },

    /// A binary payload slice was not immediately followed by the expected
    /// close tag.
    #[error("missing close tag {expected} at byte {position} (found [{found}])")]
    MissingCloseTag {
        position: usize,
        expected: String,
        found: String,
    },

    /// The declared row count disagrees with the parsed content.
    #[error("row count mismatch: declared {expected} rows, found {found}")]
    RowCountMismatch { expected: usize, found: usize },

    /// The declared column count disagrees with the parsed content.
    #[error("column count mismatch: declared {expected} columns, found {found}")]
    ColumnCountMismatch { expected: usize, found: usize },

    /// A column type code has no registry entry.
    #[error("unknown type code: {0:?}")]
    UnknownTypeCode(String),

    /// Binary or base64 was requested for data it cannot represent, or an
    /// encoding tag was not recognized.
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// A data element header is missing a required attribute.
    #[error("element <{element}> is missing required attribute {attribute:?}")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },

    /// A value in the document could not be converted to its declared type.
    #[error("invalid {type_name} value: {value:?}")]
    InvalidValue {
        type_name: &'static str,
        value: String,
    },

    /// Fewer bytes were written than were produced by the serializer.
    #[error("short write: wrote {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// IO error during reading or writing.
    #[error("IO error: {0}")]
    Io(String),
}

impl NimlError {
    /// Creates a malformed-document error with an excerpt of the input around
    /// the failure position.
    pub fn malformed(position: usize, msg: &str, excerpt: String) -> Self {
        NimlError::MalformedDocument {
            position,
            msg: msg.to_string(),
            excerpt,
        }
    }

    /// Creates a missing-close-tag error recording what was found instead.
    pub fn missing_close_tag(position: usize, expected: &str, found: String) -> Self {
        NimlError::MissingCloseTag {
            position,
            expected: expected.to_string(),
            found,
        }
    }

    /// Creates an unsupported-encoding error.
    pub fn unsupported_encoding(msg: impl Into<String>) -> Self {
        NimlError::UnsupportedEncoding(msg.into())
    }

    /// Creates an invalid-value error for a cell that failed its column's
    /// converter.
    pub fn invalid_value(type_name: &'static str, value: &str) -> Self {
        NimlError::InvalidValue {
            type_name,
            value: value.to_string(),
        }
    }

    /// Creates an I/O error from any displayable source.
    pub fn io(msg: impl std::fmt::Display) -> Self {
        NimlError::Io(msg.to_string())
    }
}

impl From<std::io::Error> for NimlError {
    fn from(err: std::io::Error) -> Self {
        NimlError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NimlError>;
