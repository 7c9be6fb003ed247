//! Fragment generation
//!
//! A fragment generator reports how many vertices and indices a shape needs,
//! then writes exactly that many into caller-provided slices. The merger only
//! depends on the [`FragmentGenerator`] trait; [`Octasphere`] is the rounded
//! box tessellator used by default.

use std::f32::consts::PI;

use glam::Vec3;
use tracing::warn;

use crate::error::MergeError;
use crate::layout::FragmentCounts;
use crate::params::{MAX_VERTICES, ShapeParams};

/// Destination slices for one fragment, sized from its reported counts
pub struct FragmentTarget<'a> {
    pub positions: &'a mut [[f32; 3]],
    pub normals: &'a mut [[f32; 3]],
    pub texcoords: Option<&'a mut [[f32; 2]]>,
    pub indices: &'a mut [u16],
}

/// Source of mesh fragments
pub trait FragmentGenerator {
    /// Vertex and index counts `populate` will write for `params`
    fn counts(&self, params: &ShapeParams) -> Result<FragmentCounts, MergeError>;

    /// Write the fragment into `target`
    ///
    /// `params` must have passed `counts`, and every slice in `target` must be
    /// exactly the reported length. Indices are local to the fragment.
    fn populate(&self, params: &ShapeParams, target: FragmentTarget<'_>);
}

/// Rounded box built from eight geodesic sphere octants
///
/// Each octant patch is pushed into its corner of the box; the gaps between
/// patches are closed by edge strips and one quad per box face, so the
/// surface stays watertight for every extent (gaps of zero width simply
/// produce degenerate triangles).
#[derive(Debug, Clone, Copy, Default)]
pub struct Octasphere;

/// Sign of each axis for octant `o` (bit 0: X, bit 1: Y, bit 2: Z)
fn octant_sign(o: usize) -> Vec3 {
    let s = |bit: usize| if o & (1 << bit) == 0 { 1.0 } else { -1.0 };
    Vec3::new(s(0), s(1), s(2))
}

fn octant_index(sign: [f32; 3]) -> usize {
    (0..3).filter(|&axis| sign[axis] < 0.0).map(|axis| 1 << axis).sum()
}

/// Points along one patch edge for a subdivision level
fn edge_points(subdivisions: u32) -> usize {
    (1usize << subdivisions) + 1
}

/// Triangular grid over one sphere octant
///
/// Grid point `(i, j)` with `i + j < n` blends X, Y and Z with weights
/// `n - 1 - i - j`, `j` and `i`, so row `i = 0` lies in the XY plane,
/// column `j = 0` in the XZ plane and the diagonal `i + j = n - 1` in the
/// YZ plane.
struct Patch {
    n: usize,
}

impl Patch {
    fn vertex_count(&self) -> usize {
        self.n * (self.n + 1) / 2
    }

    fn index(&self, i: usize, j: usize) -> usize {
        i * self.n - i * i.saturating_sub(1) / 2 + j
    }

    fn unit_vectors(&self) -> Vec<Vec3> {
        let last = (self.n - 1) as f32;
        let mut out = Vec::with_capacity(self.vertex_count());
        for i in 0..self.n {
            for j in 0..self.n - i {
                let (x, y, z) = (last - (i + j) as f32, j as f32, i as f32);
                out.push(Vec3::new(x, y, z).normalize());
            }
        }
        out
    }

    fn x_pole(&self) -> usize {
        self.index(0, 0)
    }

    fn y_pole(&self) -> usize {
        self.index(0, self.n - 1)
    }

    fn z_pole(&self) -> usize {
        self.index(self.n - 1, 0)
    }

    /// Boundary arc whose points have a zero component on `axis`
    fn arc(&self, axis: usize) -> Vec<usize> {
        let n = self.n;
        match axis {
            0 => (0..n).map(|i| self.index(i, n - 1 - i)).collect(),
            1 => (0..n).map(|i| self.index(i, 0)).collect(),
            _ => (0..n).map(|j| self.index(0, j)).collect(),
        }
    }
}

/// Writes triangles, fixing winding so faces point along the vertex normals
struct TriangleWriter<'a> {
    positions: &'a [[f32; 3]],
    normals: &'a [[f32; 3]],
    indices: &'a mut [u16],
    cursor: usize,
}

impl TriangleWriter<'_> {
    fn push_outward(&mut self, a: usize, b: usize, c: usize) {
        let p = |i: usize| Vec3::from_array(self.positions[i]);
        let nrm = |i: usize| Vec3::from_array(self.normals[i]);

        let face = (p(b) - p(a)).cross(p(c) - p(a));
        let (b, c) = if face.dot(nrm(a) + nrm(b) + nrm(c)) < 0.0 {
            (c, b)
        } else {
            (b, c)
        };

        // Vertex totals were checked against the 16-bit range in `counts`
        self.indices[self.cursor..self.cursor + 3].copy_from_slice(&[a as u16, b as u16, c as u16]);
        self.cursor += 3;
    }
}

/// Equirectangular mapping of a unit normal into `[0, 1]²`
fn spherical_uv(normal: Vec3) -> [f32; 2] {
    let u = 0.5 + normal.z.atan2(normal.x) / (2.0 * PI);
    let v = normal.y.clamp(-1.0, 1.0).acos() / PI;
    [u, v]
}

impl FragmentGenerator for Octasphere {
    fn counts(&self, params: &ShapeParams) -> Result<FragmentCounts, MergeError> {
        params.validate()?;

        let n = edge_points(params.subdivisions) as u64;
        let vertices = 8 * n * (n + 1) / 2;
        if vertices > MAX_VERTICES {
            return Err(MergeError::IndexRangeExceeded {
                vertices,
                max: MAX_VERTICES,
            });
        }

        // 8 patches, 12 edge strips, 6 face quads
        let triangles = 8 * (n - 1) * (n - 1) + 12 * 2 * (n - 1) + 6 * 2;
        let indices = u32::try_from(triangles * 3).map_err(|_| {
            MergeError::invalid(format!(
                "subdivision level {} produces too many indices",
                params.subdivisions
            ))
        })?;

        Ok(FragmentCounts {
            num_vertices: vertices as u32,
            num_indices: indices,
        })
    }

    fn populate(&self, params: &ShapeParams, target: FragmentTarget<'_>) {
        let patch = Patch {
            n: edge_points(params.subdivisions),
        };
        let per_patch = patch.vertex_count();
        let unit = patch.unit_vectors();

        let radius = params.corner_radius;
        if params.extents().iter().any(|&e| e * 0.5 < radius) {
            warn!(
                "octasphere: corner radius {} exceeds a half extent of {:?}, clamping",
                radius,
                params.extents()
            );
        }
        let inner = Vec3::from_array(params.half_extents()) - Vec3::splat(radius);

        let FragmentTarget {
            positions,
            normals,
            mut texcoords,
            indices,
        } = target;

        for octant in 0..8 {
            let sign = octant_sign(octant);
            let base = octant * per_patch;
            for (k, dir) in unit.iter().enumerate() {
                let normal = *dir * sign;
                positions[base + k] = (normal * radius + inner * sign).to_array();
                normals[base + k] = normal.to_array();
                if let Some(uvs) = texcoords.as_deref_mut() {
                    uvs[base + k] = spherical_uv(normal);
                }
            }
        }

        let mut tris = TriangleWriter {
            positions,
            normals,
            indices,
            cursor: 0,
        };

        // Octant patches
        for octant in 0..8 {
            let base = octant * per_patch;
            let v = |i: usize, j: usize| base + patch.index(i, j);
            for i in 0..patch.n - 1 {
                for j in 0..patch.n - 1 - i {
                    tris.push_outward(v(i, j), v(i, j + 1), v(i + 1, j));
                    if j + 1 < patch.n - 1 - i {
                        tris.push_outward(v(i, j + 1), v(i + 1, j + 1), v(i + 1, j));
                    }
                }
            }
        }

        // Edge strips between octants that differ only in the sign of `axis`
        for axis in 0..3 {
            let arc = patch.arc(axis);
            for octant in (0..8).filter(|o| o & (1 << axis) == 0) {
                let a = octant * per_patch;
                let b = (octant | (1 << axis)) * per_patch;
                for w in arc.windows(2) {
                    tris.push_outward(a + w[0], a + w[1], b + w[1]);
                    tris.push_outward(a + w[0], b + w[1], b + w[0]);
                }
            }
        }

        // One quad per box face, spanned by the poles of the four octants on that side
        let poles = [patch.x_pole(), patch.y_pole(), patch.z_pole()];
        for axis in 0..3 {
            let (u, v) = ((axis + 1) % 3, (axis + 2) % 3);
            for side in [1.0, -1.0] {
                let corner = |su: f32, sv: f32| {
                    let mut sign = [0.0; 3];
                    sign[axis] = side;
                    sign[u] = su;
                    sign[v] = sv;
                    octant_index(sign) * per_patch + poles[axis]
                };
                let quad = [
                    corner(1.0, 1.0),
                    corner(-1.0, 1.0),
                    corner(-1.0, -1.0),
                    corner(1.0, -1.0),
                ];
                tris.push_outward(quad[0], quad[1], quad[2]);
                tris.push_outward(quad[0], quad[2], quad[3]);
            }
        }

        debug_assert_eq!(tris.cursor, tris.indices.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Buffers {
        positions: Vec<[f32; 3]>,
        normals: Vec<[f32; 3]>,
        texcoords: Vec<[f32; 2]>,
        indices: Vec<u16>,
    }

    fn generate(params: &ShapeParams) -> Buffers {
        let counts = Octasphere.counts(params).unwrap();
        let nv = counts.num_vertices as usize;
        let mut buffers = Buffers {
            positions: vec![[0.0; 3]; nv],
            normals: vec![[0.0; 3]; nv],
            texcoords: vec![[0.0; 2]; nv],
            indices: vec![0; counts.num_indices as usize],
        };
        Octasphere.populate(
            params,
            FragmentTarget {
                positions: &mut buffers.positions,
                normals: &mut buffers.normals,
                texcoords: Some(&mut buffers.texcoords),
                indices: &mut buffers.indices,
            },
        );
        buffers
    }

    #[test]
    fn test_counts_subdivision_zero() {
        let counts = Octasphere.counts(&ShapeParams::new(0.1, 0)).unwrap();
        // 8 patches of 3 vertices; 8 + 24 + 12 triangles
        assert_eq!(counts.num_vertices, 24);
        assert_eq!(counts.num_indices, 44 * 3);
    }

    #[test]
    fn test_counts_subdivision_four() {
        let counts = Octasphere.counts(&ShapeParams::new(0.1, 4)).unwrap();
        assert_eq!(counts.num_vertices, 8 * 17 * 18 / 2);
        assert_eq!(counts.num_indices, (8 * 16 * 16 + 24 * 16 + 12) * 3);
    }

    #[test]
    fn test_counts_too_fine() {
        let err = Octasphere.counts(&ShapeParams::new(0.1, 7)).unwrap_err();
        assert!(matches!(err, MergeError::IndexRangeExceeded { .. }));
    }

    #[test]
    fn test_patch_indexing() {
        let patch = Patch { n: 5 };
        assert_eq!(patch.index(0, 4), 4);
        assert_eq!(patch.index(1, 0), 5);
        assert_eq!(patch.index(4, 0), patch.vertex_count() - 1);
        assert_eq!(patch.unit_vectors().len(), patch.vertex_count());
    }

    #[test]
    fn test_populate_within_bounds() {
        let params = ShapeParams::new(0.1, 3).stretched(crate::params::Axis::X, 3.0);
        let mesh = generate(&params);
        let bounds = params.bounds();
        let eps = 1e-5;

        for p in &mesh.positions {
            for i in 0..3 {
                assert!(p[i] >= bounds.min[i] - eps && p[i] <= bounds.max[i] + eps);
            }
        }
        for &idx in &mesh.indices {
            assert!((idx as usize) < mesh.positions.len());
        }
        for n in &mesh.normals {
            assert!((Vec3::from_array(*n).length() - 1.0).abs() < 1e-4);
        }
        for uv in &mesh.texcoords {
            assert!((0.0..=1.0).contains(&uv[0]) && (0.0..=1.0).contains(&uv[1]));
        }
    }

    #[test]
    fn test_triangles_face_outward() {
        let mesh = generate(&ShapeParams::new(0.2, 2));
        for tri in mesh.indices.chunks(3) {
            let p: Vec<Vec3> = tri.iter().map(|&i| Vec3::from_array(mesh.positions[i as usize])).collect();
            let face = (p[1] - p[0]).cross(p[2] - p[0]);
            if face.length_squared() < 1e-12 {
                continue;
            }
            let centroid = (p[0] + p[1] + p[2]) / 3.0;
            assert!(face.dot(centroid) > 0.0, "triangle {tri:?} faces inward");
        }
    }
}
