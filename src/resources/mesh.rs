use cgmath::SquareMatrix;

use crate::{
    backend::GpuBackend,
    data_structures::{
        model::{self, Material, ModelVertex},
        scene_graph::RawMesh,
    },
    error::MeshError,
};

/**
 * Converts one raw mesh record into interleaved vertices, an index list and GPU buffers.
 *
 * Every vertex gets all four attributes. A channel the source mesh doesn't have
 * is filled with zeros, so the stride is the same for every mesh. Faces are
 * expected to be triangulated already; their indices are copied verbatim.
 */
pub struct MeshBuilder;

impl MeshBuilder {
    /// Interleave the vertex attributes and collect the indices, without touching the GPU.
    pub fn interleave(raw: &RawMesh) -> Result<(Vec<ModelVertex>, Vec<u32>), MeshError> {
        let vertices = raw
            .positions
            .iter()
            .enumerate()
            .map(|(i, position)| ModelVertex {
                position: *position,
                normal: attribute(&raw.normals, i),
                tangent: attribute(&raw.tangents, i),
                tex_coords: attribute(&raw.tex_coords, i),
            })
            .collect::<Vec<_>>();

        let mut indices = Vec::with_capacity(raw.faces.len() * 3);
        for (face, triangle) in raw.faces.iter().enumerate() {
            if let Some(&index) = triangle.iter().find(|&&i| i as usize >= vertices.len()) {
                return Err(MeshError::IndexOutOfRange {
                    face,
                    index,
                    vertex_count: vertices.len(),
                });
            }
            indices.extend_from_slice(triangle);
        }
        Ok((vertices, indices))
    }

    /// Interleave and upload. The returned mesh has no material and an identity
    /// model matrix; the caller fills both in.
    pub fn build(raw: &RawMesh, backend: &mut dyn GpuBackend) -> Result<model::Mesh, MeshError> {
        let (vertices, indices) = Self::interleave(raw)?;
        let buffers = backend.create_mesh_buffers(&raw.name, &vertices, &indices);
        Ok(model::Mesh {
            name: raw.name.clone(),
            vertices,
            indices,
            buffers,
            material: Material::untextured(),
            model_matrix: cgmath::Matrix4::identity(),
        })
    }
}

fn attribute<const N: usize>(channel: &Option<Vec<[f32; N]>>, i: usize) -> [f32; N] {
    channel
        .as_ref()
        .and_then(|values| values.get(i))
        .copied()
        .unwrap_or([0.0; N])
}
