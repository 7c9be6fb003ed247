//! Single-allocation backing store for a merged mesh
//!
//! The arena is one word-aligned block sized by a [`BufferLayout`]. Typed
//! views over each planar section are derived from the layout's byte
//! ranges, so the generator, the merger and the exporter all agree on where
//! every section starts.

use bytemuck::{cast_slice, cast_slice_mut};

use crate::error::MergeError;
use crate::layout::BufferLayout;

/// Mutable typed views over the arena's sections
pub struct SectionsMut<'a> {
    pub positions: &'a mut [[f32; 3]],
    pub normals: &'a mut [[f32; 3]],
    pub texcoords: Option<&'a mut [[f32; 2]]>,
    pub indices: &'a mut [u16],
}

/// Shared typed views over the arena's sections
#[derive(Clone, Copy)]
pub struct Sections<'a> {
    pub positions: &'a [[f32; 3]],
    pub normals: &'a [[f32; 3]],
    pub texcoords: Option<&'a [[f32; 2]]>,
    pub indices: &'a [u16],
}

/// Owned byte arena holding every section of one merged mesh
#[derive(Debug)]
pub struct MeshArena {
    // u32 storage keeps every section start 4-byte aligned for the f32 casts
    words: Vec<u32>,
    layout: BufferLayout,
}

impl MeshArena {
    /// Allocate a zeroed arena for `layout` in a single allocation
    pub fn allocate(layout: BufferLayout) -> Result<Self, MergeError> {
        let bytes = layout.total_size();
        let mut words = Vec::new();
        words
            .try_reserve_exact(bytes.div_ceil(4))
            .map_err(|_| MergeError::AllocationFailure { bytes })?;
        words.resize(bytes.div_ceil(4), 0);

        tracing::debug!("allocated mesh arena: {} bytes", bytes);
        Ok(Self { words, layout })
    }

    pub fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    /// Exactly `layout.total_size()` bytes, in section order
    pub fn as_bytes(&self) -> &[u8] {
        &cast_slice::<u32, u8>(&self.words)[..self.layout.total_size()]
    }

    pub fn sections(&self) -> Sections<'_> {
        let bytes = self.as_bytes();
        let layout = &self.layout;
        Sections {
            positions: cast_slice(&bytes[layout.positions()]),
            normals: cast_slice(&bytes[layout.normals()]),
            texcoords: layout.texcoords().map(|r| cast_slice(&bytes[r])),
            indices: cast_slice(&bytes[layout.indices()]),
        }
    }

    pub fn sections_mut(&mut self) -> SectionsMut<'_> {
        let layout = self.layout;
        let bytes: &mut [u8] = cast_slice_mut(&mut self.words);

        let (positions, rest) = bytes.split_at_mut(layout.positions().len());
        let (normals, rest) = rest.split_at_mut(layout.normals().len());
        let (texcoords, rest) = match layout.texcoords() {
            Some(range) => {
                let (t, rest) = rest.split_at_mut(range.len());
                (Some(t), rest)
            }
            None => (None, rest),
        };
        let indices = &mut rest[..layout.indices().len()];

        SectionsMut {
            positions: cast_slice_mut(positions),
            normals: cast_slice_mut(normals),
            texcoords: texcoords.map(|t| cast_slice_mut(t)),
            indices: cast_slice_mut(indices),
        }
    }
}
