//! Render-ready model types.
//!
//! A [`Scene`] is the flat output of a load: an ordered list of [`Mesh`]es with
//! baked world matrices, plus every texture handle the load allocated. There is
//! no back-reference to the node tree it came from.

use std::collections::HashSet;

use crate::backend::GpuBackend;

/// Opaque GPU buffer id handed out by a [`GpuBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u32);

/// Opaque GPU texture id, or the sentinel `-1` meaning "no texture bound".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub i32);

impl TextureHandle {
    pub const SENTINEL: TextureHandle = TextureHandle(-1);

    pub fn is_valid(self) -> bool {
        self.0 >= 0
    }

    /// The underlying id, or `None` for the sentinel.
    pub fn get(self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }
}

impl Default for TextureHandle {
    fn default() -> Self {
        Self::SENTINEL
    }
}

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// One interleaved vertex: position, normal, tangent, uv (11 floats).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tangent: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl ModelVertex {
    /// Number of floats per interleaved vertex.
    pub const FLOATS: usize = 3 + 3 + 3 + 2;
    pub const STRIDE: wgpu::BufferAddress = (Self::FLOATS * std::mem::size_of::<f32>()) as _;

    pub const POSITION_LOCATION: u32 = 0;
    pub const NORMAL_LOCATION: u32 = 1;
    pub const TANGENT_LOCATION: u32 = 2;
    pub const TEX_COORDS_LOCATION: u32 = 3;
}

/**
 * The shader reads the vertex buffer as:
 *
 * location 0: position (vec3), location 1: normal (vec3),
 * location 2: tangent (vec3), location 3: uv (vec2)
 *
 * The frame renderer's shader has to declare exactly these bindings.
 */
impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: ModelVertex::STRIDE,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: ModelVertex::POSITION_LOCATION,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: ModelVertex::NORMAL_LOCATION,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: ModelVertex::TANGENT_LOCATION,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 9]>() as wgpu::BufferAddress,
                    shader_location: ModelVertex::TEX_COORDS_LOCATION,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Texture slots of a mesh. Each is a valid handle or [`TextureHandle::SENTINEL`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Material {
    pub diffuse_texture: TextureHandle,
    pub normal_texture: TextureHandle,
}

impl Material {
    pub fn untextured() -> Self {
        Self::default()
    }

    pub fn has_diffuse(&self) -> bool {
        self.diffuse_texture.is_valid()
    }

    pub fn has_normal_map(&self) -> bool {
        self.normal_texture.is_valid()
    }
}

/// GPU buffers backing one mesh. Uploaded once, never written again.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshBuffers {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
}

#[derive(Clone, Debug)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
    pub buffers: MeshBuffers,
    pub material: Material,
    /// World-space model matrix, baked at load time.
    pub model_matrix: cgmath::Matrix4<f32>,
}

impl Mesh {
    pub fn num_elements(&self) -> u32 {
        self.indices.len() as u32
    }

    /// Vertex data as the flat float sequence that was uploaded.
    pub fn interleaved(&self) -> &[f32] {
        bytemuck::cast_slice(&self.vertices)
    }
}

/// The flattened result of one model load. Owned by the caller.
///
/// GPU resources are not freed on drop; call [`Scene::release`] on shutdown.
#[derive(Debug, Default)]
pub struct Scene {
    pub meshes: Vec<Mesh>,
    /// Every texture allocated for this scene, each listed once.
    pub textures: Vec<TextureHandle>,
}

impl Scene {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    pub fn index_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len()).sum()
    }

    /// Free all GPU resources of this scene.
    ///
    /// Textures shared by several materials are released once.
    pub fn release(self, backend: &mut dyn GpuBackend) {
        for mesh in &self.meshes {
            backend.release_buffer(mesh.buffers.vertex_buffer);
            backend.release_buffer(mesh.buffers.index_buffer);
        }
        let mut released = HashSet::new();
        for texture in self.textures {
            if texture.is_valid() && released.insert(texture) {
                backend.release_texture(texture);
            }
        }
        log::debug!(
            "Released {} meshes and {} textures",
            self.meshes.len(),
            released.len()
        );
    }
}
