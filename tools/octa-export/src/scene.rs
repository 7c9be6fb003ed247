//! Scene description construction
//!
//! Builds the glTF object graph for one merged mesh. Every buffer view and
//! accessor is derived from the mesh's [`BufferLayout`], the same layout the
//! blob writer walks, so declared offsets always match the bytes on disk.
//! Cross references are indices into the root's arrays.

use std::collections::BTreeMap;
use std::ops::Range;

use gltf_json as json;
use gltf_json::validation::Checked::Valid;
use octamerge::{Aabb, BufferLayout, MergedMesh, Section};

/// Where the declared POSITION min/max come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsMode {
    /// Bounds derived from the shape parameters
    #[default]
    Declared,
    /// Bounds recomputed from the merged vertex data
    Tight,
}

/// Accessor index returned by section packing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessorIndex(pub u32);

impl AccessorIndex {
    pub fn as_json_index(&self) -> json::Index<json::Accessor> {
        json::Index::new(self.0)
    }
}

/// Accessors created for each present section
#[derive(Debug, Clone)]
pub struct MeshAccessors {
    pub positions: AccessorIndex,
    pub normals: AccessorIndex,
    pub texcoords: Option<AccessorIndex>,
    pub indices: AccessorIndex,
}

/// Buffer views and accessors for one layout
struct ViewTable {
    views: Vec<json::buffer::View>,
    accessors: Vec<json::Accessor>,
}

impl ViewTable {
    fn new() -> Self {
        Self {
            views: Vec::new(),
            accessors: Vec::new(),
        }
    }

    /// Add a view over `section` and one accessor reading all of it
    fn add_section(
        &mut self,
        layout: &BufferLayout,
        section: Section,
        range: Range<usize>,
        bounds: Option<Aabb>,
    ) -> AccessorIndex {
        let target = if section.is_vertex_data() {
            json::buffer::Target::ArrayBuffer
        } else {
            json::buffer::Target::ElementArrayBuffer
        };
        self.views.push(json::buffer::View {
            buffer: json::Index::new(0),
            byte_length: range.len().into(),
            byte_offset: Some((range.start as u64).into()),
            byte_stride: None,
            extensions: Default::default(),
            extras: Default::default(),
            name: None,
            target: Some(Valid(target)),
        });

        let (component_type, type_) = match section {
            Section::Positions | Section::Normals => {
                (json::accessor::ComponentType::F32, json::accessor::Type::Vec3)
            }
            Section::Texcoords => (json::accessor::ComponentType::F32, json::accessor::Type::Vec2),
            Section::Indices => (json::accessor::ComponentType::U16, json::accessor::Type::Scalar),
        };
        let to_json = |v: [f32; 3]| json::Value::Array(v.into_iter().map(json::Value::from).collect());

        let accessor_idx = self.accessors.len() as u32;
        self.accessors.push(json::Accessor {
            buffer_view: Some(json::Index::new(self.views.len() as u32 - 1)),
            byte_offset: Some(0u64.into()),
            count: layout.element_count(section).into(),
            component_type: Valid(json::accessor::GenericComponentType(component_type)),
            extensions: Default::default(),
            extras: Default::default(),
            type_: Valid(type_),
            min: bounds.map(|b| to_json(b.min)),
            max: bounds.map(|b| to_json(b.max)),
            name: None,
            normalized: false,
            sparse: None,
        });

        AccessorIndex(accessor_idx)
    }
}

/// Names and policies that shape the scene description
#[derive(Debug, Clone)]
pub struct SceneOptions {
    pub mesh_name: String,
    pub node_name: String,
    pub generator: String,
    pub bounds: BoundsMode,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            mesh_name: "octasphere".to_string(),
            node_name: "root".to_string(),
            generator: concat!("octa-export ", env!("CARGO_PKG_VERSION")).to_string(),
            bounds: BoundsMode::Declared,
        }
    }
}

/// Build the glTF root for `mesh`
///
/// `buffer_uri` is the blob location relative to the structural file, or
/// `None` when the blob is embedded (GLB).
pub fn build_scene(mesh: &MergedMesh, buffer_uri: Option<String>, options: &SceneOptions) -> json::Root {
    let layout = mesh.layout();
    let bounds = match options.bounds {
        BoundsMode::Declared => mesh.bounds(),
        BoundsMode::Tight => mesh.tight_bounds(),
    };

    // Accessor order follows blob order: positions, normals, texcoords, indices
    let mut table = ViewTable::new();
    let accessors = MeshAccessors {
        positions: table.add_section(layout, Section::Positions, layout.positions(), Some(bounds)),
        normals: table.add_section(layout, Section::Normals, layout.normals(), None),
        texcoords: layout
            .texcoords()
            .map(|range| table.add_section(layout, Section::Texcoords, range, None)),
        indices: table.add_section(layout, Section::Indices, layout.indices(), None),
    };

    let mesh_json = build_mesh(&options.mesh_name, &accessors);

    let node = json::Node {
        camera: None,
        children: None,
        extensions: Default::default(),
        extras: Default::default(),
        matrix: None,
        mesh: Some(json::Index::new(0)),
        name: Some(options.node_name.clone()),
        rotation: None,
        scale: None,
        translation: None,
        skin: None,
        weights: None,
    };

    let scene = json::Scene {
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        nodes: vec![json::Index::new(0)],
    };

    let buffers = vec![json::Buffer {
        byte_length: layout.total_size().into(),
        extensions: Default::default(),
        extras: Default::default(),
        name: None,
        uri: buffer_uri,
    }];

    json::Root {
        accessors: table.accessors,
        animations: Vec::new(),
        asset: json::Asset {
            copyright: None,
            extensions: Default::default(),
            extras: Default::default(),
            generator: Some(options.generator.clone()),
            min_version: None,
            version: "2.0".to_string(),
        },
        buffers,
        buffer_views: table.views,
        cameras: Vec::new(),
        extensions: Default::default(),
        extensions_required: Vec::new(),
        extensions_used: Vec::new(),
        extras: Default::default(),
        images: Vec::new(),
        materials: Vec::new(),
        meshes: vec![mesh_json],
        nodes: vec![node],
        samplers: Vec::new(),
        scene: Some(json::Index::new(0)),
        scenes: vec![scene],
        skins: Vec::new(),
        textures: Vec::new(),
    }
}

/// One mesh holding a single triangle-list primitive
fn build_mesh(name: &str, accessors: &MeshAccessors) -> json::Mesh {
    let mut attributes = BTreeMap::new();
    attributes.insert(
        Valid(json::mesh::Semantic::Positions),
        accessors.positions.as_json_index(),
    );
    attributes.insert(
        Valid(json::mesh::Semantic::Normals),
        accessors.normals.as_json_index(),
    );
    if let Some(uvs) = accessors.texcoords {
        attributes.insert(
            Valid(json::mesh::Semantic::TexCoords(0)),
            uvs.as_json_index(),
        );
    }

    let primitive = json::mesh::Primitive {
        attributes,
        extensions: Default::default(),
        extras: Default::default(),
        indices: Some(accessors.indices.as_json_index()),
        material: None,
        mode: Valid(json::mesh::Mode::Triangles),
        targets: None,
    };

    json::Mesh {
        extensions: Default::default(),
        extras: Default::default(),
        name: Some(name.to_string()),
        primitives: vec![primitive],
        weights: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octamerge::{MergeConfig, ShapeParams, merge};

    fn byte_length(view: &json::buffer::View) -> u64 {
        view.byte_length.0
    }

    #[test]
    fn test_scene_views_match_layout() {
        let mesh = merge(&ShapeParams::new(0.1, 1), &MergeConfig::default()).unwrap();
        let root = build_scene(&mesh, Some("mesh.bin".to_string()), &SceneOptions::default());

        assert_eq!(root.buffer_views.len(), 4);
        assert_eq!(root.accessors.len(), 4);
        assert_eq!(root.buffers[0].uri.as_deref(), Some("mesh.bin"));

        let total: u64 = root.buffer_views.iter().map(byte_length).sum();
        assert_eq!(total, root.buffers[0].byte_length.0);
        assert_eq!(total as usize, mesh.layout().total_size());

        let index_view = &root.buffer_views[3];
        assert_eq!(
            index_view.byte_offset.map(|o| o.0),
            Some(mesh.layout().indices().start as u64)
        );
        assert!(matches!(
            index_view.target,
            Some(Valid(json::buffer::Target::ElementArrayBuffer))
        ));
    }

    #[test]
    fn test_scene_without_texcoords() {
        let config = MergeConfig {
            texcoords: false,
            ..MergeConfig::default()
        };
        let mesh = merge(&ShapeParams::new(0.1, 1), &config).unwrap();
        let root = build_scene(&mesh, None, &SceneOptions::default());

        assert_eq!(root.buffer_views.len(), 3);
        let attributes = &root.meshes[0].primitives[0].attributes;
        assert_eq!(attributes.len(), 2);
        assert!(!attributes.contains_key(&Valid(json::mesh::Semantic::TexCoords(0))));
        assert_eq!(
            root.meshes[0].primitives[0].indices.map(|i| i.value()),
            Some(2)
        );
    }

    #[test]
    fn test_position_bounds_declared() {
        let mesh = merge(&ShapeParams::new(0.1, 1), &MergeConfig::default()).unwrap();
        let root = build_scene(&mesh, None, &SceneOptions::default());

        let pos = &root.accessors[0];
        assert_eq!(pos.min, Some(serde_json::json!([-1.5, -1.5, -1.5])));
        assert_eq!(pos.max, Some(serde_json::json!([1.5, 1.5, 1.5])));
        assert!(root.accessors[1].min.is_none());
    }
}
