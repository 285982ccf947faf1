use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Unified error type for versetidy operations
#[derive(Debug, Error)]
pub enum TidyError {
    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // Frontmatter errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No front matter found")]
    NoFrontMatter,

    #[error("Front matter is never closed")]
    UnterminatedFrontMatter,

    // Project layout errors
    #[error("'{0}' is not a site root (no config.toml). Run from the project root.")]
    NotProjectRoot(PathBuf),

    #[error("Content directory not found: {0}")]
    ContentDirNotFound(PathBuf),

    // Scaffold errors
    #[error("Invalid book manifest '{path}': {message}")]
    InvalidManifest { path: PathBuf, message: String },
}

/// Result type alias for versetidy operations
pub type Result<T> = std::result::Result<T, TidyError>;

/// The kinds of per-document defect a batch run can report.
///
/// None of these abort a batch; the document is left untouched and the
/// defect is collected in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefectKind {
    /// The file does not begin with a front matter delimiter
    MissingFrontMatter,
    /// An opening delimiter was found but no closing one
    UnterminatedBlock,
    /// The file bytes are not valid UTF-8
    DecodeError,
    /// Reading, backing up or writing the file failed
    IoError,
}

impl DefectKind {
    /// Stable name used in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            DefectKind::MissingFrontMatter => "missing-front-matter",
            DefectKind::UnterminatedBlock => "unterminated-block",
            DefectKind::DecodeError => "decode-error",
            DefectKind::IoError => "io-error",
        }
    }
}

impl fmt::Display for DefectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-document failure recorded during a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentError {
    /// Path of the offending document
    pub path: PathBuf,
    /// What went wrong
    pub kind: DefectKind,
    /// Human-readable detail
    pub message: String,
}

impl DocumentError {
    /// Create a new document error
    pub fn new(path: impl Into<PathBuf>, kind: DefectKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.path.display(), self.kind, self.message)
    }
}
