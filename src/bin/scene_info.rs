//! Loads a model without a GPU and prints what the flattened scene looks like.
//!
//! Usage: `scene_info <model.gltf|model.glb> [loader.toml]`

use anyhow::{Context, bail};
use scene_flatten::{
    HeadlessBackend, LoaderConfig, ModelLoader, data_structures::instance::Instance,
};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(model) = args.next() else {
        bail!("usage: scene_info <model> [loader.toml]");
    };
    let config = match args.next() {
        Some(path) => LoaderConfig::from_file(&path)
            .with_context(|| format!("failed to read loader config {}", path))?,
        None => LoaderConfig::default(),
    };

    let mut backend = HeadlessBackend::new();
    let mut loader = ModelLoader::new(config);
    let scene = loader.try_load(&model, &mut backend)?;

    println!(
        "{}: {} meshes, {} vertices, {} indices, {} textures",
        model,
        scene.meshes.len(),
        scene.vertex_count(),
        scene.index_count(),
        scene.textures.len()
    );
    for (i, mesh) in scene.meshes.iter().enumerate() {
        let placed = Instance::from_matrix(&mesh.model_matrix);
        let position: [f32; 3] = placed.position.into();
        let scale: [f32; 3] = placed.scale.into();
        println!(
            "  [{i}] {}: {} vertices, {} indices, diffuse {}, normal {}, position {:?}, scale {:?}",
            mesh.name,
            mesh.vertices.len(),
            mesh.indices.len(),
            mesh.material.diffuse_texture.0,
            mesh.material.normal_texture.0,
            position,
            scale,
        );
    }

    scene.release(&mut backend);
    if backend.live_buffers() != 0 || backend.live_textures() != 0 {
        bail!(
            "{} buffers and {} textures were not released",
            backend.live_buffers(),
            backend.live_textures()
        );
    }
    Ok(())
}
