//! Loader configuration.
//!
//! The configuration is small and read once per loader, so it is a plain
//! serde struct that can be built in code or read from a TOML file:
//!
//! ```toml
//! max_depth = 128
//! max_nodes = 100000
//!
//! [placement]
//! translation = [0.0, -1.1, 0.0]
//! scale = 28.0
//! rotation_degrees = [0.0, 0.0, 0.0]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{data_structures::instance::Instance, error::ConfigError};

/// Default bound on node nesting, both while importing and while flattening.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default bound on the number of nodes an importer may produce for one scene.
pub const DEFAULT_MAX_NODES: usize = 1 << 20;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Transform applied on top of every flattened mesh to place the whole model.
    pub placement: Placement,
    /// Nodes nested deeper than this are skipped with a warning.
    pub max_depth: usize,
    /// Nodes beyond this count are dropped while importing.
    pub max_nodes: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            placement: Placement::default(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_nodes: DEFAULT_MAX_NODES,
        }
    }
}

impl LoaderConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

/// Uniform scale, rotation and translation applied to a whole loaded model.
///
/// The identity placement leaves the model where the file puts it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placement {
    pub translation: [f32; 3],
    pub scale: f32,
    /// Euler angles around x, y and z.
    pub rotation_degrees: [f32; 3],
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            translation: [0.0; 3],
            scale: 1.0,
            rotation_degrees: [0.0; 3],
        }
    }
}

impl Placement {
    pub fn new(translation: [f32; 3], scale: f32) -> Self {
        Self {
            translation,
            scale,
            ..Default::default()
        }
    }

    pub fn to_instance(&self) -> Instance {
        let [x, y, z] = self.rotation_degrees;
        Instance {
            position: self.translation.into(),
            rotation: cgmath::Euler::new(cgmath::Deg(x), cgmath::Deg(y), cgmath::Deg(z)).into(),
            scale: cgmath::Vector3::new(self.scale, self.scale, self.scale),
        }
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        self.to_instance().to_matrix()
    }
}
