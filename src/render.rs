//! What a frame renderer needs to draw a flattened scene.
//!
//! The loader does not issue draw calls. A renderer walks [`Scene::meshes`],
//! uploads a [`MeshUniform`] per mesh, looks up the GPU objects with
//! [`drawables`] and records them with [`DrawMesh::draw_mesh`]. Shader,
//! pipeline and bind group setup stay with the renderer.
//!
//! # Key types
//!
//! - [`MeshUniform`] is the per-mesh uniform block (model + normal matrix, texture flags)
//! - [`Drawable<'a>`] contains the wgpu buffers and textures of one mesh
//!

use cgmath::{Matrix, SquareMatrix};

use crate::{
    context::WgpuBackend,
    data_structures::{
        model::{Mesh, Scene},
        texture::Texture,
    },
};

/**
 * The per-mesh uniform block as stored on the GPU.
 *
 * The flags tell the shader whether a texture is bound to a slot. A slot with
 * the sentinel handle has nothing bound, and sampling it is undefined.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshUniform {
    pub model: [[f32; 4]; 4],
    // Inverse transpose of the model matrix, kept as mat4 for uniform alignment
    pub normal: [[f32; 4]; 4],
    pub has_diffuse: u32,
    pub has_normal_map: u32,
    // Due to uniforms requiring 16 byte (4 float) spacing, we need to use a padding field here
    pub _padding: [u32; 2],
}

impl MeshUniform {
    pub fn from_mesh(mesh: &Mesh) -> Self {
        Self::from_matrix(mesh, mesh.model_matrix)
    }

    /// Uniform for this frame with an extra transform applied in model space.
    ///
    /// The baked matrix is left untouched, so per-frame animation doesn't accumulate.
    pub fn with_frame_transform(mesh: &Mesh, frame: cgmath::Matrix4<f32>) -> Self {
        Self::from_matrix(mesh, mesh.model_matrix * frame)
    }

    fn from_matrix(mesh: &Mesh, model: cgmath::Matrix4<f32>) -> Self {
        let normal = model
            .invert()
            .map(|inverse| inverse.transpose())
            .unwrap_or_else(cgmath::Matrix4::identity);
        Self {
            model: model.into(),
            normal: normal.into(),
            has_diffuse: mesh.material.has_diffuse() as u32,
            has_normal_map: mesh.material.has_normal_map() as u32,
            _padding: [0; 2],
        }
    }
}

/// GPU objects of one mesh, as found in a [`WgpuBackend`].
pub struct Drawable<'a> {
    pub vertex: &'a wgpu::Buffer,
    pub index: &'a wgpu::Buffer,
    pub amount: u32,
    pub diffuse: Option<&'a Texture>,
    pub normal: Option<&'a Texture>,
    pub uniform: MeshUniform,
}

/// Resolve every mesh of `scene` against the backend that uploaded it.
///
/// Meshes whose buffers are unknown to `backend` (released, or uploaded by a
/// different backend) are left out.
pub fn drawables<'a>(scene: &Scene, backend: &'a WgpuBackend) -> Vec<Drawable<'a>> {
    scene
        .meshes
        .iter()
        .filter_map(|mesh| {
            let vertex = backend.buffer(mesh.buffers.vertex_buffer)?;
            let index = backend.buffer(mesh.buffers.index_buffer)?;
            Some(Drawable {
                vertex,
                index,
                amount: mesh.num_elements(),
                diffuse: backend.texture(mesh.material.diffuse_texture),
                normal: backend.texture(mesh.material.normal_texture),
                uniform: MeshUniform::from_mesh(mesh),
            })
        })
        .collect()
}

pub trait DrawMesh<'a> {
    fn draw_mesh(&mut self, drawable: &Drawable<'a>);
}

impl<'a, 'b> DrawMesh<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(&mut self, drawable: &Drawable<'b>) {
        self.set_vertex_buffer(0, drawable.vertex.slice(..));
        self.set_index_buffer(drawable.index.slice(..), wgpu::IndexFormat::Uint32);
        self.draw_indexed(0..drawable.amount, 0, 0..1);
    }
}
