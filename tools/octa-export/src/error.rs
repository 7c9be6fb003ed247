//! Export error types

use std::path::PathBuf;

use octamerge::MergeError;

/// Error type for asset export failures
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The scene description was rejected or could not be encoded
    #[error("failed to serialize scene description {path:?}: {reason}")]
    SerializationFailure { path: PathBuf, reason: String },

    /// A structural or binary file could not be created or written
    #[error("failed to write {path:?}: {source}")]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ExportError::IoFailure {
            path: path.into(),
            source,
        }
    }
}

/// Failure of one preset in a batch, tagged with the stage that failed
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    #[error("export failed: {0}")]
    Export(#[from] ExportError),
}

impl PresetError {
    /// Pipeline stage that produced the error
    pub fn stage(&self) -> &'static str {
        match self {
            PresetError::Merge(_) => "merge",
            PresetError::Export(_) => "export",
        }
    }
}
