//! octa-export - rounded-box glTF generator
//!
//! Merges three axis-stretched rounded boxes per level-of-detail preset and
//! writes each result as a `.gltf` + `.bin` pair.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use octa_export::{BatchSettings, BoundsMode, OutputConfig, Preset, load_presets, run_batch};

#[derive(Parser)]
#[command(name = "octa-export")]
#[command(about = "Merge rounded-box fragments and export them as glTF")]
#[command(version)]
struct Cli {
    /// TOML file with [[preset]] entries (defaults to the hi/lo presets)
    #[arg(long)]
    preset_file: Option<PathBuf>,

    /// Output directory (overrides the preset file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of merged fragments, one per axis
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=3))]
    fragments: u8,

    /// Omit TEXCOORD_0
    #[arg(long)]
    no_texcoords: bool,

    /// Keep each fragment's own V range instead of packing bands
    #[arg(long)]
    no_atlas: bool,

    /// Also write a self-contained .glb per preset
    #[arg(long)]
    glb: bool,

    /// Declare POSITION bounds computed from the vertex data
    #[arg(long)]
    tight_bounds: bool,

    /// Write single-line JSON
    #[arg(long)]
    compact: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let (mut output, presets) = match &cli.preset_file {
        Some(path) => {
            let file = load_presets(path)?;
            (file.output, file.presets)
        }
        None => (OutputConfig::default(), Preset::defaults()),
    };
    if let Some(dir) = cli.output {
        output.dir = dir;
    }
    std::fs::create_dir_all(&output.dir)?;

    let mut settings = BatchSettings::default();
    settings.merge.fragment_count = usize::from(cli.fragments);
    settings.merge.texcoords = !cli.no_texcoords;
    settings.merge.atlas = !cli.no_atlas;
    settings.export.json.pretty = !cli.compact;
    settings.glb = cli.glb;
    if cli.tight_bounds {
        settings.export.scene.bounds = BoundsMode::Tight;
    }

    let mut failures = 0;
    for (preset, result) in run_batch(&presets, &output, &settings) {
        match result {
            Ok(summary) => {
                let name = summary
                    .gltf_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                println!("{} has {} verts", name, summary.vertex_count);
            }
            Err(e) => {
                failures += 1;
                tracing::error!("preset '{}' failed during {}: {}", preset.name, e.stage(), e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} presets failed", failures, presets.len());
    }
    Ok(())
}
