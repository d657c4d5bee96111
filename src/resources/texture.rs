use std::collections::{HashMap, HashSet};

use image::{ImageFormat, RgbaImage};
use log::{debug, warn};

use crate::{
    backend::GpuBackend,
    data_structures::{
        model::TextureHandle,
        scene_graph::{EmbeddedTexture, RawMaterial},
    },
    error::TextureError,
};

/// The material texture slots a mesh can bind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlot {
    Diffuse,
    Normal,
}

/// Turns encoded image bytes into RGBA8 pixels.
pub trait ImageDecoder {
    /// `format_hint` is a file extension ("png") or MIME type ("image/png").
    fn decode(&mut self, bytes: &[u8], format_hint: Option<&str>) -> Result<RgbaImage, TextureError>;
}

/// [`ImageDecoder`] backed by the `image` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&mut self, bytes: &[u8], format_hint: Option<&str>) -> Result<RgbaImage, TextureError> {
        let format = format_hint
            .and_then(|hint| hint.split('/').last())
            .and_then(ImageFormat::from_extension);
        let img = match format {
            None => image::load_from_memory(bytes)?,
            Some(fmt) => image::load_from_memory_with_format(bytes, fmt)?,
        };
        Ok(img.to_rgba8())
    }
}

/**
 * Deduplicates embedded textures into GPU handles for the duration of one model load.
 *
 * Textures are keyed by their source identifier ("*0", "*1", ...) and the slot
 * they are bound to, since the slot decides the colour space of the upload. The
 * first reference decodes and uploads, later references in the same slot get the
 * same handle back. An image used both as diffuse map and as normal map is
 * uploaded once per slot. Identifiers that failed once stay failed for every
 * slot until the next `clear`, so a broken image is decoded and reported a
 * single time.
 *
 * A cache must not be shared between loads running at the same time: each load
 * starts by clearing it.
 */
#[derive(Debug, Default)]
pub struct TextureCache {
    resolved: HashMap<(String, TextureSlot), TextureHandle>,
    failed: HashSet<String>,
    allocated: Vec<TextureHandle>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything. Handles allocated so far are not released.
    pub fn clear(&mut self) {
        self.resolved.clear();
        self.failed.clear();
        self.allocated.clear();
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn get(&self, key: &str, slot: TextureSlot) -> Option<TextureHandle> {
        self.resolved.get(&(key.to_string(), slot)).copied()
    }

    /// Handles created since the last clear, in creation order, each once.
    pub fn take_allocated(&mut self) -> Vec<TextureHandle> {
        std::mem::take(&mut self.allocated)
    }

    /// Resolve a material's texture slot to a GPU handle.
    ///
    /// Returns [`TextureHandle::SENTINEL`] when the slot is empty or the texture
    /// cannot be used. Failures are logged, never propagated.
    pub fn resolve(
        &mut self,
        material: &RawMaterial,
        slot: TextureSlot,
        textures: &[EmbeddedTexture],
        decoder: &mut dyn ImageDecoder,
        backend: &mut dyn GpuBackend,
    ) -> TextureHandle {
        let Some(key) = material.texture(slot) else {
            return TextureHandle::SENTINEL;
        };
        if let Some(handle) = self.get(key, slot) {
            return handle;
        }
        if self.failed.contains(key) {
            return TextureHandle::SENTINEL;
        }
        match load_embedded_texture(key, slot, textures, decoder, backend) {
            Ok(handle) => {
                debug!(
                    "Uploaded {:?} texture {} of material {} as {:?}",
                    slot, key, material.name, handle
                );
                self.resolved.insert((key.to_string(), slot), handle);
                self.allocated.push(handle);
                handle
            }
            Err(e) => {
                warn!(
                    "{:?} texture {} of material {} is unusable, rendering without it: {}",
                    slot, key, material.name, e
                );
                self.failed.insert(key.to_string());
                TextureHandle::SENTINEL
            }
        }
    }
}

/// Index of an embedded texture identifier such as `"*3"`.
pub fn embedded_index(key: &str) -> Option<usize> {
    key.strip_prefix('*')?.parse().ok()
}

fn load_embedded_texture(
    key: &str,
    slot: TextureSlot,
    textures: &[EmbeddedTexture],
    decoder: &mut dyn ImageDecoder,
    backend: &mut dyn GpuBackend,
) -> Result<TextureHandle, TextureError> {
    if !key.starts_with('*') {
        return Err(TextureError::External {
            key: key.to_string(),
        });
    }
    let texture = embedded_index(key)
        .and_then(|index| textures.get(index))
        .ok_or_else(|| TextureError::Missing {
            key: key.to_string(),
        })?;
    if !texture.is_compressed() {
        return Err(TextureError::Uncompressed {
            key: key.to_string(),
            width: texture.width,
            height: texture.height,
        });
    }
    let img = decoder.decode(&texture.data, texture.format_hint.as_deref())?;
    if img.width() == 0 || img.height() == 0 {
        return Err(TextureError::Empty);
    }
    let label = texture.name.as_deref().unwrap_or(key);
    backend.create_texture(label, &img, slot)
}
