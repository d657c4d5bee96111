//! scene-flatten
//!
//! Imports hierarchical 3D scenes (glTF / GLB) and flattens them into a list of
//! render-ready meshes. Every mesh carries an interleaved vertex buffer, an
//! index buffer, a material whose texture slots are either a GPU handle or the
//! `-1` sentinel, and a world matrix that is baked once at load time. The node
//! tree itself is discarded after flattening.
//!
//! High-level modules
//! - `backend`: the GPU resource seam (`GpuBackend`) and a device-less backend
//! - `config`: loader configuration (scene placement, traversal bounds)
//! - `context`: wgpu device ownership and the wgpu implementation of `GpuBackend`
//! - `data_structures`: import-side scene tree and the render-ready model types
//! - `error`: error taxonomy for imports, textures, meshes and configuration
//! - `resources`: the model loader, importer, mesh builder and texture cache
//! - `render`: what a frame renderer needs to draw a flattened scene
//!

pub mod backend;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod error;
pub mod render;
pub mod resources;

// Re-exports commonly used types for convenience in downstream code.
pub use backend::{GpuBackend, HeadlessBackend};
pub use cgmath;
pub use config::{LoaderConfig, Placement};
pub use data_structures::model::{Material, Mesh, ModelVertex, Scene, TextureHandle};
pub use error::{ImportError, TextureError};
pub use resources::{ModelLoader, gltf_import::GltfImporter};
