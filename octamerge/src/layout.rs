//! Planar buffer layout shared by the arena, the merger and the exporter
//!
//! One merged mesh occupies a single flat byte range:
//!
//! ```text
//! | positions (12 B/vert) | normals (12 B/vert) | texcoords (8 B/vert, optional) | indices (2 B/index) |
//! ```
//!
//! Every float section is a multiple of 4 bytes long, so each section
//! starts 4-byte aligned and no padding is ever inserted.

use std::ops::Range;

use crate::error::MergeError;
use crate::params::MAX_VERTICES;

/// Bytes per position (`[f32; 3]`)
pub const POSITION_STRIDE: usize = 12;
/// Bytes per normal (`[f32; 3]`)
pub const NORMAL_STRIDE: usize = 12;
/// Bytes per texcoord (`[f32; 2]`)
pub const TEXCOORD_STRIDE: usize = 8;
/// Bytes per index (`u16`)
pub const INDEX_STRIDE: usize = 2;

/// One planar section of the merged buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Positions,
    Normals,
    Texcoords,
    Indices,
}

impl Section {
    /// Size in bytes of one element of this section
    pub fn stride(self) -> usize {
        match self {
            Section::Positions => POSITION_STRIDE,
            Section::Normals => NORMAL_STRIDE,
            Section::Texcoords => TEXCOORD_STRIDE,
            Section::Indices => INDEX_STRIDE,
        }
    }

    /// True for per-vertex attribute data, false for index data
    pub fn is_vertex_data(self) -> bool {
        !matches!(self, Section::Indices)
    }
}

/// Byte offsets and sizes of each section, derived from the element counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    vertex_count: usize,
    index_count: usize,
    has_texcoords: bool,
}

impl BufferLayout {
    pub fn new(vertex_count: usize, index_count: usize, has_texcoords: bool) -> Self {
        Self {
            vertex_count,
            index_count,
            has_texcoords,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn has_texcoords(&self) -> bool {
        self.has_texcoords
    }

    pub fn positions(&self) -> Range<usize> {
        0..self.vertex_count * POSITION_STRIDE
    }

    pub fn normals(&self) -> Range<usize> {
        let start = self.positions().end;
        start..start + self.vertex_count * NORMAL_STRIDE
    }

    pub fn texcoords(&self) -> Option<Range<usize>> {
        self.has_texcoords.then(|| {
            let start = self.normals().end;
            start..start + self.vertex_count * TEXCOORD_STRIDE
        })
    }

    pub fn indices(&self) -> Range<usize> {
        let start = self.texcoords().map_or(self.normals().end, |t| t.end);
        start..start + self.index_count * INDEX_STRIDE
    }

    /// Byte range of `section`, or `None` for absent texcoords
    pub fn range(&self, section: Section) -> Option<Range<usize>> {
        match section {
            Section::Positions => Some(self.positions()),
            Section::Normals => Some(self.normals()),
            Section::Texcoords => self.texcoords(),
            Section::Indices => Some(self.indices()),
        }
    }

    /// Number of elements stored in `section`
    pub fn element_count(&self, section: Section) -> usize {
        match section {
            Section::Indices => self.index_count,
            _ => self.vertex_count,
        }
    }

    /// Present sections in blob order with their byte ranges
    pub fn sections(&self) -> impl Iterator<Item = (Section, Range<usize>)> + '_ {
        [
            Section::Positions,
            Section::Normals,
            Section::Texcoords,
            Section::Indices,
        ]
        .into_iter()
        .filter_map(|s| self.range(s).map(|r| (s, r)))
    }

    /// Total blob length in bytes
    pub fn total_size(&self) -> usize {
        self.indices().end
    }
}

/// Vertex and index counts of one fragment, as reported by its generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentCounts {
    pub num_vertices: u32,
    pub num_indices: u32,
}

/// Where one fragment lives inside the merged buffers (in elements)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentSpan {
    pub vertex_offset: usize,
    pub vertex_count: usize,
    pub index_offset: usize,
    pub index_count: usize,
}

impl FragmentSpan {
    pub fn vertices(&self) -> Range<usize> {
        self.vertex_offset..self.vertex_offset + self.vertex_count
    }

    pub fn indices(&self) -> Range<usize> {
        self.index_offset..self.index_offset + self.index_count
    }
}

/// Cumulative vertex/index offsets of every fragment, computed once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetTable {
    spans: Vec<FragmentSpan>,
    total_vertices: usize,
    total_indices: usize,
}

impl OffsetTable {
    /// Build the table, failing if the vertex total overflows 16-bit indices
    pub fn from_counts(counts: &[FragmentCounts]) -> Result<Self, MergeError> {
        let vertices: u64 = counts.iter().map(|c| u64::from(c.num_vertices)).sum();
        if vertices > MAX_VERTICES {
            return Err(MergeError::IndexRangeExceeded {
                vertices,
                max: MAX_VERTICES,
            });
        }

        let mut spans = Vec::with_capacity(counts.len());
        let mut vertex_offset = 0;
        let mut index_offset = 0;
        for c in counts {
            let span = FragmentSpan {
                vertex_offset,
                vertex_count: c.num_vertices as usize,
                index_offset,
                index_count: c.num_indices as usize,
            };
            vertex_offset += span.vertex_count;
            index_offset += span.index_count;
            spans.push(span);
        }

        Ok(Self {
            spans,
            total_vertices: vertex_offset,
            total_indices: index_offset,
        })
    }

    pub fn spans(&self) -> &[FragmentSpan] {
        &self.spans
    }

    /// `(total_vertices, total_indices)`
    pub fn totals(&self) -> (usize, usize) {
        (self.total_vertices, self.total_indices)
    }

    /// Layout for the whole merged mesh
    pub fn layout(&self, has_texcoords: bool) -> BufferLayout {
        BufferLayout::new(self.total_vertices, self.total_indices, has_texcoords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_with_texcoords() {
        let layout = BufferLayout::new(10, 6, true);
        assert_eq!(layout.positions(), 0..120);
        assert_eq!(layout.normals(), 120..240);
        assert_eq!(layout.texcoords(), Some(240..320));
        assert_eq!(layout.indices(), 320..332);
        assert_eq!(layout.total_size(), 332);
    }

    #[test]
    fn test_layout_without_texcoords() {
        let layout = BufferLayout::new(10, 6, false);
        assert_eq!(layout.texcoords(), None);
        assert_eq!(layout.indices(), 240..252);
        assert_eq!(layout.sections().count(), 3);
    }

    #[test]
    fn test_sections_are_contiguous() {
        let layout = BufferLayout::new(7, 9, true);
        let mut cursor = 0;
        for (section, range) in layout.sections() {
            assert_eq!(range.start, cursor, "{section:?} must follow the previous section");
            assert_eq!(range.start % 4, 0);
            assert_eq!(range.len(), layout.element_count(section) * section.stride());
            cursor = range.end;
        }
        assert_eq!(cursor, layout.total_size());
    }

    #[test]
    fn test_offset_table_uneven_counts() {
        let table = OffsetTable::from_counts(&[
            FragmentCounts { num_vertices: 4, num_indices: 6 },
            FragmentCounts { num_vertices: 3, num_indices: 3 },
            FragmentCounts { num_vertices: 5, num_indices: 9 },
        ])
        .unwrap();

        let spans = table.spans();
        assert_eq!(spans[1].vertex_offset, 4);
        assert_eq!(spans[2].vertex_offset, 7);
        assert_eq!(spans[2].index_offset, 9);
        assert_eq!(table.totals(), (12, 18));
    }

    #[test]
    fn test_offset_table_rejects_large_totals() {
        let big = FragmentCounts { num_vertices: 40_000, num_indices: 3 };
        let err = OffsetTable::from_counts(&[big, big]).unwrap_err();
        assert_eq!(
            err,
            MergeError::IndexRangeExceeded { vertices: 80_000, max: MAX_VERTICES }
        );
    }
}
