//! Level-of-detail presets and batch orchestration
//!
//! Presets come from a TOML file:
//!
//! ```toml
//! [output]
//! dir = "out"
//!
//! [[preset]]
//! name = "hi"
//! corner_radius = 0.1
//! subdivisions = 4
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use octamerge::{MergeConfig, ShapeParams, merge};
use serde::Deserialize;

use crate::error::PresetError;
use crate::export::{ExportOptions, ExportSummary, export, export_glb};

/// Root preset file structure
#[derive(Debug, Deserialize)]
pub struct PresetFile {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "preset")]
    pub presets: Vec<Preset>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// Prepended to each preset name to form the file stem
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            prefix: default_prefix(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_prefix() -> String {
    "test_".to_string()
}

fn default_extent() -> f32 {
    1.0
}

/// One `(corner_radius, subdivisions)` variant to export
#[derive(Debug, Clone, Deserialize)]
pub struct Preset {
    pub name: String,
    pub corner_radius: f32,
    pub subdivisions: u32,
    #[serde(default = "default_extent")]
    pub width: f32,
    #[serde(default = "default_extent")]
    pub height: f32,
    #[serde(default = "default_extent")]
    pub depth: f32,
}

impl Preset {
    pub fn new(name: &str, corner_radius: f32, subdivisions: u32) -> Self {
        Self {
            name: name.to_string(),
            corner_radius,
            subdivisions,
            width: default_extent(),
            height: default_extent(),
            depth: default_extent(),
        }
    }

    /// The high and low detail variants
    pub fn defaults() -> Vec<Preset> {
        vec![Preset::new("hi", 0.1, 4), Preset::new("lo", 0.1, 1)]
    }

    pub fn shape(&self) -> ShapeParams {
        ShapeParams {
            corner_radius: self.corner_radius,
            width: self.width,
            height: self.height,
            depth: self.depth,
            subdivisions: self.subdivisions,
        }
    }
}

/// Load presets from a TOML file
pub fn load_presets(path: &Path) -> Result<PresetFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read preset file: {:?}", path))?;
    let file: PresetFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse preset file: {:?}", path))?;
    if file.presets.is_empty() {
        anyhow::bail!("Preset file {:?} defines no [[preset]] entries", path);
    }
    Ok(file)
}

/// Settings shared by every preset in a batch
#[derive(Debug, Clone, Default)]
pub struct BatchSettings {
    pub merge: MergeConfig,
    pub export: ExportOptions,
    /// Also write a self-contained `.glb`
    pub glb: bool,
}

/// Merge and export one preset into `out_dir`
pub fn run_preset(
    preset: &Preset,
    out_dir: &Path,
    prefix: &str,
    settings: &BatchSettings,
) -> Result<ExportSummary, PresetError> {
    let mesh = merge(&preset.shape(), &settings.merge)?;

    let stem = format!("{}{}", prefix, preset.name);
    let gltf_path = out_dir.join(format!("{stem}.gltf"));
    let bin_path = out_dir.join(format!("{stem}.bin"));
    let summary = export(&mesh, &gltf_path, &bin_path, &settings.export)?;

    if settings.glb {
        export_glb(&mesh, &out_dir.join(format!("{stem}.glb")), &settings.export)?;
    }

    Ok(summary)
}

/// Run every preset; a failing preset does not stop the others
pub fn run_batch<'a>(
    presets: &'a [Preset],
    output: &OutputConfig,
    settings: &BatchSettings,
) -> Vec<(&'a Preset, Result<ExportSummary, PresetError>)> {
    presets
        .iter()
        .map(|preset| {
            let _span = tracing::info_span!("preset", name = %preset.name).entered();
            (preset, run_preset(preset, &output.dir, &output.prefix, settings))
        })
        .collect()
}
