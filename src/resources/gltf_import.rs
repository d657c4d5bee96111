//! glTF 2.0 importer.
//!
//! Reads `.gltf` and `.glb` files into the importer-neutral [`ImportedScene`]:
//! each mesh primitive becomes its own raw mesh, primitives are triangulated,
//! images stored in buffer views or base64 `data:` URIs become embedded
//! textures named `"*<index>"`, and the scene's root nodes are gathered under a
//! synthetic identity root.
//!
//! glTF validation does not reject node cycles, so the hierarchy is converted
//! with three guards: a depth bound, a check against the nodes on the current
//! path, and a budget on the total number of nodes produced.

use std::{collections::HashMap, ops::Range, path::Path};

use cgmath::SquareMatrix;
use gltf::mesh::Mode;
use log::{debug, warn};

use crate::{
    config::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_NODES},
    data_structures::scene_graph::{
        EmbeddedTexture, ImportedScene, RawMaterial, RawMesh, SceneNode,
    },
    error::ImportError,
    resources::{Importer, load_binary},
};

#[derive(Clone, Debug)]
pub struct GltfImporter {
    /// Nodes nested deeper than this are dropped while converting the hierarchy.
    pub max_depth: usize,
    /// Upper bound on the number of nodes in the converted tree.
    pub max_nodes: usize,
}

impl Default for GltfImporter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl GltfImporter {
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }
}

impl Importer for GltfImporter {
    fn import(&self, path: &Path) -> Result<ImportedScene, ImportError> {
        let bytes = load_binary(path)?;
        let gltf = gltf::Gltf::from_slice(&bytes).map_err(|source| ImportError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or(Path::new("./"));
        let buffers = match gltf::import_buffers(&gltf.document, Some(base), gltf.blob.clone()) {
            Ok(buffers) => buffers,
            Err(e) => {
                warn!("Buffers of {:?} could not be loaded: {}", path, e);
                return Ok(ImportedScene {
                    incomplete: true,
                    ..Default::default()
                });
            }
        };
        let buffers: Vec<&[u8]> = buffers.iter().map(|data| data.0.as_slice()).collect();

        let (textures, image_keys) = load_images(&gltf, &buffers);
        let materials = load_materials(&gltf, &image_keys);
        let (meshes, mesh_ranges) = load_meshes(&gltf, &buffers);

        let root = gltf
            .default_scene()
            .or_else(|| gltf.scenes().next())
            .map(|scene| {
                let mut root = SceneNode::new(
                    scene.name().unwrap_or("root"),
                    cgmath::Matrix4::identity(),
                );
                let mut budget = self.max_nodes;
                let mut ancestors = Vec::new();
                for node in scene.nodes() {
                    if let Some(child) =
                        self.to_scene_node(node, &mesh_ranges, &mut ancestors, &mut budget)
                    {
                        root.children.push(child);
                    }
                }
                if budget == 0 {
                    warn!(
                        "Scene of {:?} has more than {} nodes, the rest was dropped.",
                        path, self.max_nodes
                    );
                }
                root
            });

        debug!(
            "Imported {:?}: {} meshes, {} materials, {} embedded textures",
            path,
            meshes.len(),
            materials.len(),
            textures.len()
        );

        Ok(ImportedScene {
            incomplete: false,
            root,
            meshes,
            materials,
            textures,
        })
    }
}

impl GltfImporter {
    /// Convert `node` and its subtree. `path` holds the glTF indices of the
    /// ancestors being converted, `budget` the number of nodes still allowed.
    fn to_scene_node(
        &self,
        node: gltf::Node,
        mesh_ranges: &HashMap<usize, Range<usize>>,
        path: &mut Vec<usize>,
        budget: &mut usize,
    ) -> Option<SceneNode> {
        if path.len() >= self.max_depth {
            warn!(
                "Node {} is nested deeper than {} levels, dropping it.",
                node.index(),
                self.max_depth
            );
            return None;
        }
        if path.contains(&node.index()) {
            warn!(
                "Node {} is its own ancestor, dropping the cyclic reference.",
                node.index()
            );
            return None;
        }
        if *budget == 0 {
            return None;
        }
        *budget -= 1;
        let name = node
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("node_{}", node.index()));
        let meshes = node
            .mesh()
            .and_then(|mesh| mesh_ranges.get(&mesh.index()))
            .cloned()
            .unwrap_or_default();
        let mut scene_node =
            SceneNode::new(name, cgmath::Matrix4::from(node.transform().matrix())).with_meshes(meshes);
        path.push(node.index());
        for child in node.children() {
            if let Some(child) = self.to_scene_node(child, mesh_ranges, path, budget) {
                scene_node.children.push(child);
            }
        }
        path.pop();
        Some(scene_node)
    }
}

/// Embedded images, plus the texture identifier of every glTF image in document order.
fn load_images(gltf: &gltf::Gltf, buffers: &[&[u8]]) -> (Vec<EmbeddedTexture>, Vec<String>) {
    let mut textures = Vec::new();
    let mut keys = Vec::new();
    for image in gltf.images() {
        match image.source() {
            gltf::image::Source::View { view, mime_type } => {
                let start = view.offset();
                let end = start + view.length();
                let data = buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end))
                    .map(<[u8]>::to_vec)
                    .unwrap_or_else(|| {
                        warn!("Image {} points outside its buffer.", image.index());
                        Vec::new()
                    });
                let mut texture = EmbeddedTexture::compressed(data, Some(mime_type.to_string()));
                texture.name = image.name().map(str::to_string);
                keys.push(format!("*{}", textures.len()));
                textures.push(texture);
            }
            gltf::image::Source::Uri { uri, mime_type } => match decode_data_uri(uri) {
                Some(Ok((media_type, data))) => {
                    let hint = mime_type.or(media_type).map(str::to_string);
                    let mut texture = EmbeddedTexture::compressed(data, hint);
                    texture.name = image.name().map(str::to_string);
                    keys.push(format!("*{}", textures.len()));
                    textures.push(texture);
                }
                Some(Err(e)) => {
                    warn!("Image {} has a malformed data URI: {}", image.index(), e);
                    keys.push(format!("*{}", textures.len()));
                    textures.push(EmbeddedTexture::compressed(Vec::new(), None));
                }
                None => keys.push(uri.to_string()),
            },
        }
    }
    (textures, keys)
}

/// Media type and payload of a base64 `data:` URI. `None` for any other URI.
fn decode_data_uri(uri: &str) -> Option<Result<(Option<&str>, Vec<u8>), base64::DecodeError>> {
    let (media_type, payload) = uri.strip_prefix("data:")?.split_once(";base64,")?;
    let media_type = (!media_type.is_empty()).then_some(media_type);
    Some(base64::decode(payload).map(|data| (media_type, data)))
}

fn load_materials(gltf: &gltf::Gltf, image_keys: &[String]) -> Vec<RawMaterial> {
    gltf.materials()
        .map(|material| {
            let key = |image: gltf::Image| image_keys.get(image.index()).cloned();
            RawMaterial {
                name: material
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0))),
                diffuse_texture: material
                    .pbr_metallic_roughness()
                    .base_color_texture()
                    .and_then(|info| key(info.texture().source())),
                normal_texture: material
                    .normal_texture()
                    .and_then(|normal| key(normal.texture().source())),
            }
        })
        .collect()
}

/// One raw mesh per primitive, plus the raw mesh range of every glTF mesh.
fn load_meshes(
    gltf: &gltf::Gltf,
    buffers: &[&[u8]],
) -> (Vec<RawMesh>, HashMap<usize, Range<usize>>) {
    let mut meshes = Vec::new();
    let mut ranges = HashMap::new();
    for mesh in gltf.meshes() {
        let start = meshes.len();
        let mesh_name = mesh.name().unwrap_or("unknown_mesh");
        for primitive in mesh.primitives() {
            let name = format!("{}#{}", mesh_name, primitive.index());
            if let Some(raw) = load_primitive(&primitive, buffers, name) {
                meshes.push(raw);
            }
        }
        ranges.insert(mesh.index(), start..meshes.len());
    }
    (meshes, ranges)
}

fn load_primitive(primitive: &gltf::Primitive, buffers: &[&[u8]], name: String) -> Option<RawMesh> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).copied());

    let Some(positions) = reader.read_positions() else {
        warn!("Primitive {} has no positions, skipping it.", name);
        return None;
    };
    let positions: Vec<[f32; 3]> = positions.collect();
    let normals = reader.read_normals().map(|normals| normals.collect());
    // glTF stores handedness in w, only xyz goes into the vertex
    let tangents = reader
        .read_tangents()
        .map(|tangents| tangents.map(|[x, y, z, _]| [x, y, z]).collect());
    let tex_coords = reader
        .read_tex_coords(0)
        .map(|tex_coords| tex_coords.into_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let Some(faces) = triangulate(primitive.mode(), &indices) else {
        warn!(
            "Primitive {} uses {:?} topology, only triangles are supported. Skipping it.",
            name,
            primitive.mode()
        );
        return None;
    };

    Some(RawMesh {
        name,
        positions,
        normals,
        tangents,
        tex_coords,
        faces,
        material: primitive.material().index(),
    })
}

/// Split an index list into triangles according to the primitive topology.
///
/// Returns `None` for point and line topologies. Strips alternate their winding
/// so every triangle keeps the orientation of the first; degenerate strip
/// triangles (used to stitch strips together) are dropped.
pub fn triangulate(mode: Mode, indices: &[u32]) -> Option<Vec<[u32; 3]>> {
    match mode {
        Mode::Triangles => Some(
            indices
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
        ),
        Mode::TriangleStrip => Some(
            indices
                .windows(3)
                .enumerate()
                .map(|(i, w)| {
                    if i % 2 == 0 {
                        [w[0], w[1], w[2]]
                    } else {
                        [w[1], w[0], w[2]]
                    }
                })
                .filter(|t| t[0] != t[1] && t[1] != t[2] && t[0] != t[2])
                .collect(),
        ),
        Mode::TriangleFan => Some(match indices.split_first() {
            Some((&first, rest)) => rest.windows(2).map(|w| [first, w[0], w[1]]).collect(),
            None => Vec::new(),
        }),
        Mode::Points | Mode::Lines | Mode::LineLoop | Mode::LineStrip => None,
    }
}
