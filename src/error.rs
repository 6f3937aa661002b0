//! Error types for the camtqif library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while loading, parsing and converting statements.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error reading a zipped export.
    #[error("ZIP archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Error parsing XML format.
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// The XML document is not a CAMT.053 statement.
    #[error("Unsupported document (expected CAMT.053): {0}")]
    UnsupportedDocument(String),

    /// The source file is neither a ZIP archive nor an XML file.
    #[error("Unsupported source file: {}", .0.display())]
    UnsupportedSource(PathBuf),

    /// The configuration file could not be read or is malformed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A statement belongs to an account missing from the configuration.
    #[error("Account {0} is not configured")]
    UnmappedAccount(String),

    /// Entry description matches none of the known patterns (strict mode).
    #[error("Transaction type not supported for \"{0}\"")]
    UnsupportedTransaction(String),

    /// Invalid date format.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// Missing required field.
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// General parsing error.
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlError(err.to_string())
    }
}

impl From<serde_xml_rs::Error> for Error {
    fn from(err: serde_xml_rs::Error) -> Self {
        Error::XmlError(err.to_string())
    }
}

impl From<ini::Error> for Error {
    fn from(err: ini::Error) -> Self {
        Error::Config(err.to_string())
    }
}
