//! Engine data structures: import-side scene trees, render-ready models, textures.
//!
//! - `scene_graph` holds the importer's node tree, raw mesh and material records,
//!   and the walker that flattens the tree
//! - `model` contains the flattened meshes, materials and GPU handle types
//! - `texture` contains the GPU texture wrapper and mip chain generation
//! - `instance` holds decomposed translation/rotation/scale transforms

pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
