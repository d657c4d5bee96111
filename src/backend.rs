//! GPU resource seam.
//!
//! The loader never talks to a graphics API directly. It asks a [`GpuBackend`]
//! for buffers and textures and gets opaque integer handles back. The wgpu
//! implementation lives in [`crate::context`]; [`HeadlessBackend`] hands out
//! handles without a device, which is what tools and tests use.
//!
//! Handles must only be used on the thread that owns the backend.

use std::collections::HashMap;

use image::RgbaImage;
use log::warn;

use crate::{
    data_structures::{
        model::{BufferHandle, MeshBuffers, ModelVertex, TextureHandle},
        texture::mip_level_count,
    },
    error::TextureError,
    resources::texture::TextureSlot,
};

pub trait GpuBackend {
    /// Upload a decoded image and generate its mipmaps.
    fn create_texture(
        &mut self,
        label: &str,
        image: &RgbaImage,
        slot: TextureSlot,
    ) -> Result<TextureHandle, TextureError>;

    /// Upload interleaved vertices and indices with static usage.
    fn create_mesh_buffers(
        &mut self,
        label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> MeshBuffers;

    fn release_texture(&mut self, handle: TextureHandle);

    fn release_buffer(&mut self, handle: BufferHandle);
}

/// What a [`HeadlessBackend`] remembers about a texture it allocated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureInfo {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub slot: TextureSlot,
}

/// Handle allocator without a GPU. Tracks live resources so leaks and double
/// releases show up.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    next_texture: i32,
    next_buffer: u32,
    textures: HashMap<TextureHandle, TextureInfo>,
    buffers: HashMap<BufferHandle, usize>,
    textures_created: usize,
    buffers_created: usize,
    invalid_releases: usize,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created
    }

    /// Releases of handles that were never allocated or already released.
    pub fn invalid_releases(&self) -> usize {
        self.invalid_releases
    }

    pub fn texture_info(&self, handle: TextureHandle) -> Option<&TextureInfo> {
        self.textures.get(&handle)
    }

    /// Size in bytes of a live buffer.
    pub fn buffer_size(&self, handle: BufferHandle) -> Option<usize> {
        self.buffers.get(&handle).copied()
    }

    fn alloc_buffer(&mut self, size: usize) -> BufferHandle {
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        self.buffers_created += 1;
        self.buffers.insert(handle, size);
        handle
    }
}

impl GpuBackend for HeadlessBackend {
    fn create_texture(
        &mut self,
        label: &str,
        image: &RgbaImage,
        slot: TextureSlot,
    ) -> Result<TextureHandle, TextureError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(TextureError::Empty);
        }
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures_created += 1;
        self.textures.insert(
            handle,
            TextureInfo {
                label: label.to_string(),
                width,
                height,
                mip_levels: mip_level_count(width, height),
                slot,
            },
        );
        Ok(handle)
    }

    fn create_mesh_buffers(
        &mut self,
        _label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> MeshBuffers {
        MeshBuffers {
            vertex_buffer: self.alloc_buffer(std::mem::size_of_val(vertices)),
            index_buffer: self.alloc_buffer(std::mem::size_of_val(indices)),
        }
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        if self.textures.remove(&handle).is_none() {
            warn!("Released unknown texture {:?}", handle);
            self.invalid_releases += 1;
        }
    }

    fn release_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(&handle).is_none() {
            warn!("Released unknown buffer {:?}", handle);
            self.invalid_releases += 1;
        }
    }
}
