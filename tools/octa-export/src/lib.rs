//! octa-export library
//!
//! Turns a merged rounded-box mesh into glTF assets:
//! - `scene`: glTF object graph built from the mesh's buffer layout
//! - `serializer`: structural file writer (`.gltf` JSON)
//! - `export`: blob writer and the `.gltf` + `.bin` / `.glb` entry points
//! - `presets`: level-of-detail presets and batch runs

pub mod error;
pub mod export;
pub mod glb;
pub mod presets;
pub mod scene;
pub mod serializer;

pub use error::{ExportError, PresetError};
pub use export::{
    ExportOptions, ExportSummary, blob_bytes, buffer_uri, export, export_glb, export_with,
    write_blob,
};
pub use glb::assemble_glb;
pub use presets::{BatchSettings, OutputConfig, Preset, PresetFile, load_presets, run_batch, run_preset};
pub use scene::{AccessorIndex, BoundsMode, MeshAccessors, SceneOptions, build_scene};
pub use serializer::{GltfJsonWriter, SceneSerializer};
