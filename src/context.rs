//! wgpu device ownership and the wgpu implementation of [`GpuBackend`].
//!
//! [`WgpuBackend`] keeps every buffer and texture it created in a table keyed by
//! the integer handle it returned, so flattened meshes can refer to GPU
//! resources without borrowing them. Resources are destroyed on release, not on
//! drop of a mesh.

use std::collections::HashMap;

use image::RgbaImage;
use log::{debug, warn};
use wgpu::util::DeviceExt;

use crate::{
    backend::GpuBackend,
    data_structures::{
        model::{BufferHandle, MeshBuffers, ModelVertex, TextureHandle},
        texture::Texture,
    },
    error::TextureError,
    resources::texture::TextureSlot,
};

#[derive(Debug)]
pub struct WgpuBackend {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    textures: HashMap<TextureHandle, Texture>,
    buffers: HashMap<BufferHandle, wgpu::Buffer>,
    next_texture: i32,
    next_buffer: u32,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            textures: HashMap::new(),
            buffers: HashMap::new(),
            next_texture: 0,
            next_buffer: 0,
        }
    }

    /// Create a device without a window or surface.
    ///
    /// Blocks on the adapter and device requests.
    pub fn headless() -> anyhow::Result<Self> {
        futures::executor::block_on(async {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
                backends: wgpu::Backends::PRIMARY,
                ..wgpu::InstanceDescriptor::new_without_display_handle()
            });
            let adapter = instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::default(),
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await?;
            debug!("Using adapter {:?}", adapter.get_info());
            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some("scene-flatten headless device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    ..Default::default()
                })
                .await?;
            Ok::<_, anyhow::Error>(Self::new(device, queue))
        })
    }

    pub fn buffer(&self, handle: BufferHandle) -> Option<&wgpu::Buffer> {
        self.buffers.get(&handle)
    }

    /// The texture behind a handle. The sentinel never resolves.
    pub fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(&handle)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    fn insert_buffer(&mut self, buffer: wgpu::Buffer) -> BufferHandle {
        let handle = BufferHandle(self.next_buffer);
        self.next_buffer += 1;
        self.buffers.insert(handle, buffer);
        handle
    }
}

impl GpuBackend for WgpuBackend {
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
        let limit = self.device.limits().max_texture_dimension_2d;
        if width > limit || height > limit {
            return Err(TextureError::TooLarge {
                width,
                height,
                limit,
            });
        }
        let texture = Texture::from_image(
            &self.device,
            &self.queue,
            image,
            Some(label),
            slot == TextureSlot::Normal,
        );
        let handle = TextureHandle(self.next_texture);
        self.next_texture += 1;
        self.textures.insert(handle, texture);
        Ok(handle)
    }

    fn create_mesh_buffers(
        &mut self,
        label: &str,
        vertices: &[ModelVertex],
        indices: &[u32],
    ) -> MeshBuffers {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Vertex Buffer", label)),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{:?} Index Buffer", label)),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        MeshBuffers {
            vertex_buffer: self.insert_buffer(vertex_buffer),
            index_buffer: self.insert_buffer(index_buffer),
        }
    }

    fn release_texture(&mut self, handle: TextureHandle) {
        match self.textures.remove(&handle) {
            Some(texture) => texture.texture.destroy(),
            None => warn!("Released unknown texture {:?}", handle),
        }
    }

    fn release_buffer(&mut self, handle: BufferHandle) {
        match self.buffers.remove(&handle) {
            Some(buffer) => buffer.destroy(),
            None => warn!("Released unknown buffer {:?}", handle),
        }
    }
}
