//! Structural file writers

use std::path::Path;

use gltf_json as json;
use gltf_json::validation::Validate;

use crate::error::ExportError;

/// Writes a scene description to a structural file
pub trait SceneSerializer {
    fn write(&self, path: &Path, root: &json::Root) -> Result<(), ExportError>;
}

/// Writes `.gltf` JSON documents
#[derive(Debug, Clone, Copy)]
pub struct GltfJsonWriter {
    /// Indent the JSON output
    pub pretty: bool,
}

impl Default for GltfJsonWriter {
    fn default() -> Self {
        Self { pretty: true }
    }
}

impl GltfJsonWriter {
    /// Validate `root` and encode it as JSON text
    ///
    /// `path` only labels the error.
    pub fn to_json_string(&self, path: &Path, root: &json::Root) -> Result<String, ExportError> {
        validate(path, root)?;

        let encoded = if self.pretty {
            json::serialize::to_string_pretty(root)
        } else {
            json::serialize::to_string(root)
        };
        encoded.map_err(|e| ExportError::SerializationFailure {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl SceneSerializer for GltfJsonWriter {
    fn write(&self, path: &Path, root: &json::Root) -> Result<(), ExportError> {
        let text = self.to_json_string(path, root)?;
        std::fs::write(path, text).map_err(|e| ExportError::io(path, e))?;
        tracing::debug!("wrote scene description {:?}", path);
        Ok(())
    }
}

/// Reject documents that break glTF's structural rules (dangling indices etc.)
fn validate(path: &Path, root: &json::Root) -> Result<(), ExportError> {
    let mut errors = Vec::new();
    root.validate(root, json::Path::new, &mut |p, e| {
        errors.push(format!("{:?}: {:?}", p(), e));
    });

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ExportError::SerializationFailure {
            path: path.to_path_buf(),
            reason: errors.join("; "),
        })
    }
}
