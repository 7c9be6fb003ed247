//! Merge error type

/// Error type for fragment generation and merging failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MergeError {
    /// Extents, radius, subdivision level or merge configuration out of range
    #[error("invalid shape parameters: {0}")]
    InvalidShapeParameters(String),

    /// Vertex total cannot be addressed with 16-bit indices
    #[error("merged mesh needs {vertices} vertices, but 16-bit indices address at most {max}")]
    IndexRangeExceeded { vertices: u64, max: u64 },

    /// The single backing allocation for the merged buffers could not be made
    #[error("failed to allocate {bytes} bytes for merged mesh buffers")]
    AllocationFailure { bytes: usize },
}

impl MergeError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        MergeError::InvalidShapeParameters(msg.into())
    }
}
