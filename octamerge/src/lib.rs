//! Rounded-box mesh merging for glTF export
//!
//! Generates one rounded-box fragment per principal axis and merges them into a
//! single 16-bit indexed mesh:
//! - `params`: shape parameters and merge configuration
//! - `generator`: fragment generator trait and the octasphere tessellator
//! - `layout`: planar buffer layout and per-fragment offset table
//! - `arena`: single-allocation storage with typed section views
//! - `merge`: the merger itself
//!
//! # Example
//!
//! ```no_run
//! use octamerge::{merge, MergeConfig, ShapeParams};
//!
//! let mesh = merge(&ShapeParams::new(0.1, 4), &MergeConfig::default())?;
//! assert!(mesh.indices().iter().all(|&i| (i as usize) < mesh.vertex_count()));
//! # Ok::<(), octamerge::MergeError>(())
//! ```

pub mod arena;
pub mod error;
pub mod generator;
pub mod layout;
pub mod merge;
pub mod params;

pub use arena::MeshArena;
pub use error::MergeError;
pub use generator::{FragmentGenerator, FragmentTarget, Octasphere};
pub use layout::{BufferLayout, FragmentCounts, FragmentSpan, OffsetTable, Section};
pub use merge::{MergedMesh, merge, merge_with};
pub use params::{Aabb, Axis, MAX_SUBDIVISIONS, MAX_VERTICES, MergeConfig, ShapeParams};
