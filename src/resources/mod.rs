use std::path::Path;

use log::{error, info};

use crate::{
    backend::GpuBackend,
    config::LoaderConfig,
    data_structures::{
        model::Scene,
        scene_graph::{ImportedScene, SceneWalker},
    },
    error::ImportError,
    resources::{
        gltf_import::GltfImporter,
        texture::{ImageCrateDecoder, ImageDecoder, TextureCache},
    },
};

/**
 * This module contains all logic for loading meshes/materials/textures from model files.
 */
pub mod gltf_import;
pub mod mesh;
pub mod texture;

/// Parses a model file into an [`ImportedScene`].
pub trait Importer {
    fn import(&self, path: &Path) -> Result<ImportedScene, ImportError>;
}

pub fn load_binary(path: &Path) -> Result<Vec<u8>, ImportError> {
    std::fs::read(path).map_err(|source| match source.kind() {
        std::io::ErrorKind::NotFound => ImportError::NotFound {
            path: path.to_path_buf(),
        },
        _ => ImportError::Unreadable {
            path: path.to_path_buf(),
            source,
        },
    })
}

/**
 * Loads a model file and flattens it into a [`Scene`].
 *
 * The loader owns the texture cache it deduplicates with and clears it at the
 * start of every load, so one loader must not run two loads at once. Use one
 * loader per concurrent load instead.
 */
pub struct ModelLoader<I = GltfImporter, D = ImageCrateDecoder> {
    importer: I,
    decoder: D,
    config: LoaderConfig,
    textures: TextureCache,
}

impl ModelLoader {
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_parts(
            GltfImporter::new(config.max_depth).with_max_nodes(config.max_nodes),
            ImageCrateDecoder,
            config,
        )
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new(LoaderConfig::default())
    }
}

impl<I: Importer, D: ImageDecoder> ModelLoader<I, D> {
    pub fn with_parts(importer: I, decoder: D, config: LoaderConfig) -> Self {
        Self {
            importer,
            decoder,
            config,
            textures: TextureCache::new(),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Load a model, returning an empty scene if it cannot be imported.
    ///
    /// The failure is logged. An empty scene renders nothing.
    pub fn load(&mut self, path: impl AsRef<Path>, backend: &mut dyn GpuBackend) -> Scene {
        let path = path.as_ref();
        match self.try_load(path, backend) {
            Ok(scene) => scene,
            Err(e) => {
                error!("Error loading model {:?}: {}", path, e);
                Scene::empty()
            }
        }
    }

    pub fn try_load(
        &mut self,
        path: impl AsRef<Path>,
        backend: &mut dyn GpuBackend,
    ) -> Result<Scene, ImportError> {
        let path = path.as_ref();
        let imported = self.importer.import(path)?;
        self.load_imported(path, &imported, backend)
    }

    /// Validate an already imported scene and flatten it.
    ///
    /// `path` is only used for diagnostics.
    pub fn load_imported(
        &mut self,
        path: &Path,
        imported: &ImportedScene,
        backend: &mut dyn GpuBackend,
    ) -> Result<Scene, ImportError> {
        if imported.incomplete {
            return Err(ImportError::Incomplete {
                path: path.to_path_buf(),
            });
        }
        let Some(root) = &imported.root else {
            return Err(ImportError::MissingRoot {
                path: path.to_path_buf(),
            });
        };

        self.textures.clear();
        let meshes = SceneWalker::new(imported, &mut self.textures, &mut self.decoder, backend)
            .with_placement(self.config.placement.to_matrix())
            .with_max_depth(self.config.max_depth)
            .flatten(root);
        let textures = self.textures.take_allocated();

        let scene = Scene { meshes, textures };
        info!(
            "Loaded {:?}: {} meshes, {} vertices, {} indices, {} textures",
            path,
            scene.meshes.len(),
            scene.vertex_count(),
            scene.index_count(),
            scene.textures.len()
        );
        Ok(scene)
    }
}
