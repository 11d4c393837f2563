//! Error type shared by the font, store and report layers.

use std::io;

use thiserror::Error;

/// Coarse classification of a [`ReportError`], useful for callers that only care about the
/// failure category.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or missing configuration, detected before any side effect.
    Configuration,
    /// A font file could not be described.
    Parse,
    /// A requested font family or font file does not exist.
    NotFound,
    /// File system failure.
    Io,
    /// The embedded table store rejected the query.
    Store,
    /// Layout, rendering or read-back of the PDF failed.
    Render,
    /// The background worker died before producing a result.
    Task,
}

/// Errors produced while building font catalogs and rendering reports.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to parse font file {path}: {message}")]
    FontParse { path: String, message: String },

    #[error("no font file found for '{0}'")]
    FontNotFound(String),

    #[error("font family '{0}' is not installed")]
    FamilyNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("data store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("invalid configuration file: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("report task terminated unexpectedly")]
    TaskPanicked,
}

impl ReportError {
    /// Creates a configuration error with the given message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the failure category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::ConfigFormat(_) => ErrorKind::Configuration,
            Self::FontParse { .. } => ErrorKind::Parse,
            Self::FontNotFound(_) | Self::FamilyNotFound(_) => ErrorKind::NotFound,
            Self::Io(_) => ErrorKind::Io,
            Self::Store(_) => ErrorKind::Store,
            Self::Render(_) => ErrorKind::Render,
            Self::TaskPanicked => ErrorKind::Task,
        }
    }
}

// genpdf and lopdf errors are flattened to text so the error stays `Send` across the worker
// thread boundary.
impl From<genpdf::error::Error> for ReportError {
    fn from(err: genpdf::error::Error) -> Self {
        Self::Render(err.to_string())
    }
}

impl From<lopdf::Error> for ReportError {
    fn from(err: lopdf::Error) -> Self {
        Self::Render(format!("failed to read back rendered PDF: {err}"))
    }
}
