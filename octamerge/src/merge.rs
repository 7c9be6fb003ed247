//! Mesh merging
//!
//! Generates one fragment per box axis straight into a shared arena, then
//! renumbers each fragment's indices by its cumulative vertex offset and,
//! when atlassing, packs each fragment's V coordinates into its own band.

use tracing::{debug, info};

use crate::arena::{MeshArena, SectionsMut};
use crate::error::MergeError;
use crate::generator::{FragmentGenerator, FragmentTarget, Octasphere};
use crate::layout::{BufferLayout, FragmentSpan, OffsetTable};
use crate::params::{Aabb, MergeConfig, ShapeParams};

/// Combined mesh with planar, contiguous buffers in a single allocation
#[derive(Debug)]
pub struct MergedMesh {
    arena: MeshArena,
    spans: Vec<FragmentSpan>,
    bounds: Aabb,
}

impl MergedMesh {
    pub fn positions(&self) -> &[[f32; 3]] {
        self.arena.sections().positions
    }

    pub fn normals(&self) -> &[[f32; 3]] {
        self.arena.sections().normals
    }

    pub fn texcoords(&self) -> Option<&[[f32; 2]]> {
        self.arena.sections().texcoords
    }

    pub fn indices(&self) -> &[u16] {
        self.arena.sections().indices
    }

    pub fn vertex_count(&self) -> usize {
        self.arena.layout().vertex_count()
    }

    pub fn index_count(&self) -> usize {
        self.arena.layout().index_count()
    }

    pub fn layout(&self) -> &BufferLayout {
        self.arena.layout()
    }

    /// Per-fragment vertex and index ranges, in fragment order
    pub fn spans(&self) -> &[FragmentSpan] {
        &self.spans
    }

    /// Bounds derived from the shape parameters of every fragment
    ///
    /// These are not computed from vertex data; use [`Self::tight_bounds`]
    /// when the exact extent of the generated vertices matters.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Bounds recomputed from the merged positions
    pub fn tight_bounds(&self) -> Aabb {
        Aabb::from_points(self.positions())
    }

    /// Raw buffer contents in layout order (native byte order)
    pub fn as_bytes(&self) -> &[u8] {
        self.arena.as_bytes()
    }
}

/// Merge rounded-box fragments produced by [`Octasphere`]
pub fn merge(params: &ShapeParams, config: &MergeConfig) -> Result<MergedMesh, MergeError> {
    merge_with(&Octasphere, params, config)
}

/// Merge fragments produced by any generator
///
/// Fragment `i` is `params` stretched along axis `i` by `config.stretch`.
/// Fails without producing a mesh if the parameters are invalid, the vertex
/// total does not fit 16-bit indices, or the buffer cannot be allocated.
pub fn merge_with<G: FragmentGenerator + ?Sized>(
    generator: &G,
    params: &ShapeParams,
    config: &MergeConfig,
) -> Result<MergedMesh, MergeError> {
    params.validate()?;
    config.validate()?;

    let fragments = config.fragment_params(params);
    let counts = fragments
        .iter()
        .map(|p| generator.counts(p))
        .collect::<Result<Vec<_>, _>>()?;
    let table = OffsetTable::from_counts(&counts)?;

    let mut arena = MeshArena::allocate(table.layout(config.texcoords))?;
    let SectionsMut {
        positions,
        normals,
        mut texcoords,
        indices,
    } = arena.sections_mut();

    for (i, (fragment, span)) in fragments.iter().zip(table.spans()).enumerate() {
        debug!(
            "fragment {}: extents {:?}, vertices {:?}, indices {:?}",
            i,
            fragment.extents(),
            span.vertices(),
            span.indices()
        );
        generator.populate(
            fragment,
            FragmentTarget {
                positions: &mut positions[span.vertices()],
                normals: &mut normals[span.vertices()],
                texcoords: texcoords.as_deref_mut().map(|t| &mut t[span.vertices()]),
                indices: &mut indices[span.indices()],
            },
        );
    }

    for span in table.spans() {
        offset_indices(&mut indices[span.indices()], span);
    }

    if let Some(uvs) = texcoords.as_deref_mut().filter(|_| config.atlas) {
        let bands = table.spans().len();
        for (band, span) in table.spans().iter().enumerate() {
            pack_v_band(&mut uvs[span.vertices()], band, bands);
        }
    }

    let bounds = fragments
        .iter()
        .map(ShapeParams::bounds)
        .fold(Aabb::EMPTY, |acc, b| acc.union(&b));

    let (total_vertices, total_indices) = table.totals();
    info!(
        "merged {} fragments: {} vertices, {} indices, {} bytes",
        fragments.len(),
        total_vertices,
        total_indices,
        arena.layout().total_size()
    );

    Ok(MergedMesh {
        arena,
        spans: table.spans().to_vec(),
        bounds,
    })
}

/// Shift fragment-local indices into the merged vertex range
fn offset_indices(indices: &mut [u16], span: &FragmentSpan) {
    // The offset table already bounded the vertex total by u16::MAX
    let offset = span.vertex_offset as u16;
    for idx in indices {
        debug_assert!((*idx as usize) < span.vertex_count, "index outside its fragment");
        *idx += offset;
    }
}

/// Compress V into band `band` of `bands` equal slices of the unit range
fn pack_v_band(uvs: &mut [[f32; 2]], band: usize, bands: usize) {
    let scale = 1.0 / bands as f32;
    let base = band as f32 * scale;
    for uv in uvs {
        uv[1] = uv[1] * scale + base;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::FragmentCounts;

    /// Single triangle with V running 0..1, for checking the fix-ups in isolation
    struct TriangleGenerator {
        extra_vertices: u32,
    }

    impl FragmentGenerator for TriangleGenerator {
        fn counts(&self, _params: &ShapeParams) -> Result<FragmentCounts, MergeError> {
            Ok(FragmentCounts {
                num_vertices: 3 + self.extra_vertices,
                num_indices: 3,
            })
        }

        fn populate(&self, _params: &ShapeParams, target: FragmentTarget<'_>) {
            for (i, p) in target.positions.iter_mut().enumerate() {
                *p = [i as f32, 0.0, 0.0];
            }
            target.normals.fill([0.0, 0.0, 1.0]);
            if let Some(uvs) = target.texcoords {
                let last = (uvs.len() - 1) as f32;
                for (i, uv) in uvs.iter_mut().enumerate() {
                    *uv = [0.0, i as f32 / last];
                }
            }
            target.indices.copy_from_slice(&[0, 1, 2]);
        }
    }

    #[test]
    fn test_indices_offset_by_fragment() {
        let generator = TriangleGenerator { extra_vertices: 1 };
        let mesh = merge_with(&generator, &ShapeParams::default(), &MergeConfig::default()).unwrap();

        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.index_count(), 9);
        assert_eq!(mesh.indices(), &[0, 1, 2, 4, 5, 6, 8, 9, 10]);
    }

    #[test]
    fn test_texcoord_bands() {
        let generator = TriangleGenerator { extra_vertices: 0 };
        let mesh = merge_with(&generator, &ShapeParams::default(), &MergeConfig::default()).unwrap();
        let uvs = mesh.texcoords().unwrap();

        let third = 1.0 / 3.0;
        assert_eq!(uvs[0][1], 0.0);
        assert!((uvs[2][1] - third).abs() < 1e-6);
        assert!((uvs[3][1] - third).abs() < 1e-6);
        assert!((uvs[8][1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_atlas_disabled_keeps_v() {
        let generator = TriangleGenerator { extra_vertices: 0 };
        let config = MergeConfig {
            atlas: false,
            ..MergeConfig::default()
        };
        let mesh = merge_with(&generator, &ShapeParams::default(), &config).unwrap();
        let uvs = mesh.texcoords().unwrap();
        assert_eq!(uvs[5][1], 1.0);
        assert_eq!(uvs[6][1], 0.0);
    }

    #[test]
    fn test_no_texcoords() {
        let config = MergeConfig {
            texcoords: false,
            ..MergeConfig::default()
        };
        let mesh = merge(&ShapeParams::new(0.1, 1), &config).unwrap();
        assert!(mesh.texcoords().is_none());
        assert!(!mesh.layout().has_texcoords());
    }

    #[test]
    fn test_declared_bounds_cover_stretched_fragments() {
        let mesh = merge(&ShapeParams::new(0.1, 1), &MergeConfig::default()).unwrap();
        assert_eq!(mesh.bounds().min, [-1.5; 3]);
        assert_eq!(mesh.bounds().max, [1.5; 3]);

        let tight = mesh.tight_bounds();
        for i in 0..3 {
            assert!(tight.min[i] >= -1.5 - 1e-5 && tight.max[i] <= 1.5 + 1e-5);
        }
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = ShapeParams {
            width: -1.0,
            ..ShapeParams::default()
        };
        let err = merge(&params, &MergeConfig::default()).unwrap_err();
        assert!(matches!(err, MergeError::InvalidShapeParameters(_)));
    }
}
