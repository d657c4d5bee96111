//! Error taxonomy.
//!
//! Only [`ImportError`] is fatal to a load. Texture and mesh errors are
//! downgraded where they happen: the texture slot falls back to the sentinel
//! handle, the offending mesh is skipped, and the rest of the model renders.

use std::path::PathBuf;

use thiserror::Error;

/// The model file could not be turned into a usable scene.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("model file {path:?} does not exist")]
    NotFound { path: PathBuf },

    #[error("model file {path:?} could not be read")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model file {path:?} could not be parsed")]
    Parse {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("scene in {path:?} is flagged incomplete")]
    Incomplete { path: PathBuf },

    #[error("scene in {path:?} has no root node")]
    MissingRoot { path: PathBuf },
}

/// A texture slot could not be resolved to a GPU texture.
#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode embedded image")]
    Decode(#[from] image::ImageError),

    #[error("embedded texture {key} is stored uncompressed ({width}x{height}), which is not supported")]
    Uncompressed { key: String, width: u32, height: u32 },

    #[error("texture {key} is not embedded in the model file")]
    External { key: String },

    #[error("texture {key} does not name an embedded texture")]
    Missing { key: String },

    #[error("decoded image has a zero dimension")]
    Empty,

    #[error("image of {width}x{height} exceeds the device limit of {limit}")]
    TooLarge { width: u32, height: u32, limit: u32 },
}

/// A raw mesh record cannot be turned into GPU buffers.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("face {face} references vertex {index}, but the mesh only has {vertex_count} vertices")]
    IndexOutOfRange {
        face: usize,
        index: u32,
        vertex_count: usize,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path:?} could not be read")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid loader config")]
    Toml(#[from] toml::de::Error),
}
