//! Asset export (.gltf + .bin, or .glb)

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use octamerge::{MergedMesh, Section};

use crate::error::ExportError;
use crate::glb::assemble_glb;
use crate::scene::{SceneOptions, build_scene};
use crate::serializer::{GltfJsonWriter, SceneSerializer};

/// Options for one export call
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub scene: SceneOptions,
    pub json: GltfJsonWriter,
}

/// What an export call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub gltf_path: PathBuf,
    pub bin_path: PathBuf,
    pub blob_len: usize,
    pub vertex_count: usize,
    pub index_count: usize,
}

/// Blob contents: positions, normals, texcoords, indices as little-endian bytes
pub fn blob_bytes(mesh: &MergedMesh) -> Vec<u8> {
    let layout = mesh.layout();
    let mut out = Vec::with_capacity(layout.total_size());

    for (section, range) in layout.sections() {
        debug_assert_eq!(out.len(), range.start, "{section:?} out of place");
        match section {
            Section::Positions => push_floats(&mut out, mesh.positions().as_flattened()),
            Section::Normals => push_floats(&mut out, mesh.normals().as_flattened()),
            Section::Texcoords => {
                if let Some(uvs) = mesh.texcoords() {
                    push_floats(&mut out, uvs.as_flattened());
                }
            }
            Section::Indices => {
                for idx in mesh.indices() {
                    out.extend_from_slice(&idx.to_le_bytes());
                }
            }
        }
    }

    out
}

fn push_floats(out: &mut Vec<u8>, values: &[f32]) {
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
}

/// Write the blob to `writer`, returning the number of bytes written
pub fn write_blob<W: Write>(mesh: &MergedMesh, writer: &mut W) -> std::io::Result<usize> {
    let bytes = blob_bytes(mesh);
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}

/// Path of `bin_path` as seen from the directory holding `gltf_path`
///
/// Both paths are made absolute against the working directory and
/// normalized lexically, then joined with `/` and as many `..` segments as
/// needed. Fails when no relative path exists (different drive prefixes).
pub fn buffer_uri(gltf_path: &Path, bin_path: &Path) -> Result<String, ExportError> {
    let base = match gltf_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let base_abs = std::path::absolute(base).map_err(|e| ExportError::io(gltf_path, e))?;
    let target_abs = std::path::absolute(bin_path).map_err(|e| ExportError::io(bin_path, e))?;
    let (base, target) = (normalized(&base_abs), normalized(&target_abs));

    if base.first() != target.first() {
        return Err(ExportError::SerializationFailure {
            path: gltf_path.to_path_buf(),
            reason: format!("no relative path to buffer {:?}", bin_path),
        });
    }

    let common = base.iter().zip(&target).take_while(|(a, b)| a == b).count();
    let segments: Vec<String> = std::iter::repeat_n("..".to_string(), base.len() - common)
        .chain(
            target[common..]
                .iter()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        )
        .collect();
    Ok(segments.join("/"))
}

/// Absolute path components with `.` dropped and `..` applied
fn normalized(path: &Path) -> Vec<Component<'_>> {
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.last(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Export `mesh` as a `.gltf` document plus its `.bin` blob
///
/// Both files are created or overwritten. A failed export may leave either
/// file behind in an indeterminate state.
pub fn export(
    mesh: &MergedMesh,
    gltf_path: &Path,
    bin_path: &Path,
    options: &ExportOptions,
) -> Result<ExportSummary, ExportError> {
    export_with(&options.json, mesh, gltf_path, bin_path, &options.scene)
}

/// Export using a custom structural-file serializer
pub fn export_with<S: SceneSerializer + ?Sized>(
    serializer: &S,
    mesh: &MergedMesh,
    gltf_path: &Path,
    bin_path: &Path,
    options: &SceneOptions,
) -> Result<ExportSummary, ExportError> {
    let root = build_scene(mesh, Some(buffer_uri(gltf_path, bin_path)?), options);
    serializer.write(gltf_path, &root)?;

    let file = std::fs::File::create(bin_path).map_err(|e| ExportError::io(bin_path, e))?;
    let mut writer = std::io::BufWriter::new(file);
    let blob_len = write_blob(mesh, &mut writer)
        .and_then(|len| writer.flush().map(|_| len))
        .map_err(|e| ExportError::io(bin_path, e))?;

    tracing::info!(
        "exported {:?} + {:?}: {} vertices, {} indices, {} bytes",
        gltf_path,
        bin_path,
        mesh.vertex_count(),
        mesh.index_count(),
        blob_len
    );

    Ok(ExportSummary {
        gltf_path: gltf_path.to_path_buf(),
        bin_path: bin_path.to_path_buf(),
        blob_len,
        vertex_count: mesh.vertex_count(),
        index_count: mesh.index_count(),
    })
}

/// Export `mesh` as a single self-contained `.glb`, returning its size in bytes
pub fn export_glb(
    mesh: &MergedMesh,
    glb_path: &Path,
    options: &ExportOptions,
) -> Result<usize, ExportError> {
    let root = build_scene(mesh, None, &options.scene);
    let json_text = options.json.to_json_string(glb_path, &root)?;
    let glb = assemble_glb(&json_text, &blob_bytes(mesh));

    std::fs::write(glb_path, &glb).map_err(|e| ExportError::io(glb_path, e))?;
    tracing::info!("exported {:?}: {} bytes", glb_path, glb.len());
    Ok(glb.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use octamerge::{MergeConfig, ShapeParams, merge};

    #[test]
    fn test_buffer_uri_relative() {
        let uri = |g: &str, b: &str| buffer_uri(Path::new(g), Path::new(b)).unwrap();
        assert_eq!(uri("out/test_hi.gltf", "out/test_hi.bin"), "test_hi.bin");
        assert_eq!(uri("test_hi.gltf", "test_hi.bin"), "test_hi.bin");
        assert_eq!(uri("out/a.gltf", "out/bin/a.bin"), "bin/a.bin");
        assert_eq!(uri("./out/a.gltf", "out/./a.bin"), "a.bin");
    }

    #[test]
    fn test_buffer_uri_sibling_directory() {
        let uri = |g: &str, b: &str| buffer_uri(Path::new(g), Path::new(b)).unwrap();
        assert_eq!(uri("gltf/a.gltf", "bin/a.bin"), "../bin/a.bin");
        assert_eq!(uri("a/b/c.gltf", "a.bin"), "../../a.bin");
        assert_eq!(uri("a/../c.gltf", "bin/c.bin"), "bin/c.bin");
    }

    #[test]
    fn test_buffer_uri_absolute_paths() {
        let dir = tempfile::tempdir().unwrap();
        let gltf = dir.path().join("gltf").join("a.gltf");
        let bin = dir.path().join("bin").join("a.bin");

        let uri = buffer_uri(&gltf, &bin).unwrap();
        assert_eq!(uri, "../bin/a.bin");
        assert!(!uri.starts_with('/'));
    }

    #[test]
    fn test_blob_failure_after_scene_written() {
        let mesh = merge(&ShapeParams::new(0.1, 0), &MergeConfig::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let gltf_path = dir.path().join("a.gltf");
        let bin_path = dir.path().join("missing").join("a.bin");

        let err = export(&mesh, &gltf_path, &bin_path, &ExportOptions::default()).unwrap_err();
        match err {
            ExportError::IoFailure { path, .. } => assert_eq!(path, bin_path),
            other => panic!("unexpected error: {other}"),
        }
        assert!(gltf_path.exists());
    }

    #[test]
    fn test_blob_matches_layout() {
        let mesh = merge(&ShapeParams::new(0.1, 1), &MergeConfig::default()).unwrap();
        let blob = blob_bytes(&mesh);
        let layout = mesh.layout();

        assert_eq!(blob.len(), layout.total_size());
        let first_index = &blob[layout.indices().start..layout.indices().start + 2];
        assert_eq!(first_index, &mesh.indices()[0].to_le_bytes());

        let normals = &blob[layout.normals()];
        assert_eq!(&normals[..4], &mesh.normals()[0][0].to_le_bytes());
    }

    #[test]
    #[cfg(target_endian = "little")]
    fn test_blob_is_arena_image_on_little_endian() {
        let mesh = merge(&ShapeParams::new(0.1, 0), &MergeConfig::default()).unwrap();
        assert_eq!(blob_bytes(&mesh), mesh.as_bytes());
    }

    /// Serializer that always refuses, for error propagation checks
    struct Refuse;

    impl SceneSerializer for Refuse {
        fn write(&self, path: &Path, _root: &gltf_json::Root) -> Result<(), ExportError> {
            Err(ExportError::SerializationFailure {
                path: path.to_path_buf(),
                reason: "refused".to_string(),
            })
        }
    }

    #[test]
    fn test_serializer_failure_propagates() {
        let mesh = merge(&ShapeParams::new(0.1, 0), &MergeConfig::default()).unwrap();
        let err = export_with(
            &Refuse,
            &mesh,
            Path::new("never.gltf"),
            Path::new("never.bin"),
            &SceneOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ExportError::SerializationFailure { .. }));
        assert!(!Path::new("never.bin").exists());
    }
}
