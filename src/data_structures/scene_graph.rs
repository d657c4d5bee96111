//! Scene graph as delivered by an importer, and its flattening.
//!
//! The importer hands over an owned tree of [`SceneNode`]s plus flat tables of
//! raw meshes, materials and embedded textures. [`SceneWalker`] walks that tree
//! once, depth-first and pre-order, and emits one render-ready [`Mesh`] per
//! (node, mesh reference) pair with its world matrix baked in. The tree is
//! dropped by the caller afterwards; nothing in the output points back into it.

use cgmath::SquareMatrix;
use log::{debug, warn};

use crate::{
    backend::GpuBackend,
    config::DEFAULT_MAX_DEPTH,
    data_structures::model::{Material, Mesh},
    resources::{
        mesh::MeshBuilder,
        texture::{ImageDecoder, TextureCache, TextureSlot},
    },
};

/// A node of the imported hierarchy. Parents own their children.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub name: String,
    /// Transform relative to the parent node.
    pub transform: cgmath::Matrix4<f32>,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, transform: cgmath::Matrix4<f32>) -> Self {
        Self {
            name: name.into(),
            transform,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_meshes(mut self, meshes: impl IntoIterator<Item = usize>) -> Self {
        self.meshes.extend(meshes);
        self
    }

    pub fn with_child(mut self, child: SceneNode) -> Self {
        self.children.push(child);
        self
    }

    /// World transform of every node in pre-order, the root's parent being identity.
    pub fn world_transforms(&self) -> Vec<(&str, cgmath::Matrix4<f32>)> {
        let mut out = Vec::new();
        collect_world_transforms(self, &cgmath::Matrix4::identity(), &mut out);
        out
    }
}

fn collect_world_transforms<'a>(
    node: &'a SceneNode,
    parent_world: &cgmath::Matrix4<f32>,
    out: &mut Vec<(&'a str, cgmath::Matrix4<f32>)>,
) {
    let world = parent_world * node.transform;
    out.push((node.name.as_str(), world));
    for child in &node.children {
        collect_world_transforms(child, &world, out);
    }
}

/// Geometry of one imported mesh before interleaving.
///
/// Optional attributes are either present for every vertex or absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawMesh {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub tangents: Option<Vec<[f32; 3]>>,
    /// First UV channel.
    pub tex_coords: Option<Vec<[f32; 2]>>,
    /// Triangulated faces, three vertex indices each.
    pub faces: Vec<[u32; 3]>,
    /// Index into [`ImportedScene::materials`], if any.
    pub material: Option<usize>,
}

/// Texture references of an imported material, by source identifier.
///
/// Embedded textures are named `"*<index>"`; anything else is an external path.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawMaterial {
    pub name: String,
    pub diffuse_texture: Option<String>,
    pub normal_texture: Option<String>,
}

impl RawMaterial {
    pub fn texture(&self, slot: TextureSlot) -> Option<&str> {
        match slot {
            TextureSlot::Diffuse => self.diffuse_texture.as_deref(),
            TextureSlot::Normal => self.normal_texture.as_deref(),
        }
    }
}

/// Image data stored inside the model file.
///
/// A `height` of 0 marks a compressed image: `data` holds the encoded file
/// (png, jpeg, ...) and `width` its byte length. Any other height means `data`
/// holds raw texels, which are not supported.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmbeddedTexture {
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    /// File extension or MIME type of the encoded image.
    pub format_hint: Option<String>,
}

impl EmbeddedTexture {
    pub fn compressed(data: Vec<u8>, format_hint: Option<String>) -> Self {
        Self {
            name: None,
            width: data.len() as u32,
            height: 0,
            data,
            format_hint,
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.height == 0
    }
}

/// Everything an importer produced for one file. Lives for one load call.
#[derive(Clone, Debug, Default)]
pub struct ImportedScene {
    /// Set when the importer could not read all of the file's data.
    pub incomplete: bool,
    pub root: Option<SceneNode>,
    pub meshes: Vec<RawMesh>,
    pub materials: Vec<RawMaterial>,
    pub textures: Vec<EmbeddedTexture>,
}

/// Flattens an [`ImportedScene`] into render-ready meshes.
///
/// World transforms are computed top-down once per node
/// (`world = parent_world * local`) and shared by all meshes of that node.
/// The placement matrix is applied last: `model = placement * world`.
pub struct SceneWalker<'a> {
    scene: &'a ImportedScene,
    placement: cgmath::Matrix4<f32>,
    max_depth: usize,
    textures: &'a mut TextureCache,
    decoder: &'a mut dyn ImageDecoder,
    backend: &'a mut dyn GpuBackend,
}

impl<'a> SceneWalker<'a> {
    pub fn new(
        scene: &'a ImportedScene,
        textures: &'a mut TextureCache,
        decoder: &'a mut dyn ImageDecoder,
        backend: &'a mut dyn GpuBackend,
    ) -> Self {
        Self {
            scene,
            placement: cgmath::Matrix4::identity(),
            max_depth: DEFAULT_MAX_DEPTH,
            textures,
            decoder,
            backend,
        }
    }

    pub fn with_placement(mut self, placement: cgmath::Matrix4<f32>) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn flatten(&mut self, root: &SceneNode) -> Vec<Mesh> {
        let mut meshes = Vec::new();
        self.visit(root, &cgmath::Matrix4::identity(), 0, &mut meshes);
        meshes
    }

    fn visit(
        &mut self,
        node: &SceneNode,
        parent_world: &cgmath::Matrix4<f32>,
        depth: usize,
        out: &mut Vec<Mesh>,
    ) {
        if depth > self.max_depth {
            warn!(
                "Node {} is nested deeper than {} levels, skipping it and its children.",
                node.name, self.max_depth
            );
            return;
        }
        let world = parent_world * node.transform;
        let model_matrix = self.placement * world;

        for &mesh_index in &node.meshes {
            if let Some(mesh) = self.build_mesh(node, mesh_index, model_matrix) {
                out.push(mesh);
            }
        }
        for child in &node.children {
            self.visit(child, &world, depth + 1, out);
        }
    }

    fn build_mesh(
        &mut self,
        node: &SceneNode,
        mesh_index: usize,
        model_matrix: cgmath::Matrix4<f32>,
    ) -> Option<Mesh> {
        let scene = self.scene;
        let Some(raw) = scene.meshes.get(mesh_index) else {
            warn!(
                "Node {} references mesh {} but the scene only has {} meshes.",
                node.name,
                mesh_index,
                scene.meshes.len()
            );
            return None;
        };
        if raw.positions.is_empty() || raw.faces.is_empty() {
            warn!(
                "Mesh {} ({}) of node {} has no geometry, skipping it.",
                mesh_index, raw.name, node.name
            );
            return None;
        }
        let mut mesh = match MeshBuilder::build(raw, &mut *self.backend) {
            Ok(mesh) => mesh,
            Err(e) => {
                warn!(
                    "Mesh {} ({}) of node {} could not be built: {}",
                    mesh_index, raw.name, node.name, e
                );
                return None;
            }
        };
        mesh.material = self.resolve_material(raw);
        mesh.model_matrix = model_matrix;
        debug!(
            "Flattened mesh {} of node {}: {} vertices, {} indices, {:?}",
            raw.name,
            node.name,
            mesh.vertices.len(),
            mesh.indices.len(),
            mesh.material
        );
        Some(mesh)
    }

    fn resolve_material(&mut self, raw: &RawMesh) -> Material {
        let scene = self.scene;
        let Some(index) = raw.material else {
            return Material::untextured();
        };
        let Some(material) = scene.materials.get(index) else {
            warn!(
                "Mesh {} references material {} which does not exist.",
                raw.name, index
            );
            return Material::untextured();
        };
        let mut resolve = |slot| {
            self.textures.resolve(
                material,
                slot,
                &scene.textures,
                &mut *self.decoder,
                &mut *self.backend,
            )
        };
        Material {
            diffuse_texture: resolve(TextureSlot::Diffuse),
            normal_texture: resolve(TextureSlot::Normal),
        }
    }
}
