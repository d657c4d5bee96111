use std::time::{Duration, Instant};

use gltf::mesh::Mode;
use scene_flatten::{
    GltfImporter, HeadlessBackend,
    data_structures::scene_graph::SceneNode,
    resources::{
        Importer,
        gltf_import::triangulate,
        texture::{TextureCache, TextureSlot},
    },
};

use crate::common::test_utils::{
    CountingDecoder, GltfFixture, assert_matrix_eq, identity, png_bytes, scale, translation,
    write_gltf_json,
};

mod common;

#[test]
fn should_import_fixture_hierarchy_under_synthetic_root() {
    let path = GltfFixture::write_gltf("import_fixture");

    let imported = GltfImporter::default().import(&path).unwrap();

    assert!(!imported.incomplete);
    let root = imported.root.as_ref().unwrap();
    assert_eq!(root.name, "fixture");
    assert_matrix_eq(&root.transform, &identity());
    assert!(root.meshes.is_empty());
    assert_eq!(root.children.len(), 1);

    let base = &root.children[0];
    assert_eq!(base.name, "base");
    assert_eq!(base.meshes, vec![0]);
    assert_matrix_eq(&base.transform, &translation(0.0, 1.0, 0.0));

    let arm = &base.children[0];
    assert_eq!(arm.name, "arm");
    assert_eq!(arm.meshes, vec![1, 2]);
    assert_matrix_eq(&arm.transform, &(translation(2.0, 0.0, 0.0) * scale(2.0)));
    assert!(arm.children.is_empty());
}

#[test]
fn should_split_primitives_into_raw_meshes() {
    let path = GltfFixture::write_gltf("import_primitives");

    let imported = GltfImporter::default().import(&path).unwrap();

    let names: Vec<&str> = imported.meshes.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["body#0", "limb#0", "limb#1"]);
    let materials: Vec<Option<usize>> = imported.meshes.iter().map(|m| m.material).collect();
    assert_eq!(materials, vec![Some(0), Some(0), Some(1)]);

    let body = &imported.meshes[0];
    assert_eq!(body.positions.len(), 3);
    assert_eq!(body.faces, vec![[0, 1, 2]]);
    assert_eq!(body.normals.as_deref(), Some(&[[0.0, 0.0, 1.0]; 3][..]));
    assert!(body.tangents.is_none());
    assert_eq!(body.tex_coords.as_ref().map(Vec::len), Some(3));
}

#[test]
fn should_key_embedded_images_in_document_order() {
    let path = GltfFixture::write_gltf("import_images");

    let imported = GltfImporter::default().import(&path).unwrap();

    assert_eq!(imported.textures.len(), 2);
    for texture in &imported.textures {
        assert!(texture.is_compressed());
        assert_eq!(texture.format_hint.as_deref(), Some("image/png"));
        assert!(texture.data.starts_with(b"\x89PNG"));
    }
    assert_eq!(imported.textures[0].name.as_deref(), Some("albedo"));

    let painted = &imported.materials[0];
    assert_eq!(painted.name, "painted");
    assert_eq!(painted.diffuse_texture.as_deref(), Some("*0"));
    assert_eq!(painted.normal_texture, None);

    let bumpy = &imported.materials[1];
    assert_eq!(bumpy.diffuse_texture.as_deref(), Some("*0"));
    assert_eq!(bumpy.normal_texture.as_deref(), Some("*1"));
}

#[test]
fn should_import_binary_container() {
    let path = GltfFixture::write_glb("import_binary");

    let imported = GltfImporter::default().import(&path).unwrap();

    assert!(!imported.incomplete);
    assert_eq!(imported.meshes.len(), 3);
    assert_eq!(imported.textures.len(), 2);
}

#[test]
fn should_drop_nodes_nested_past_the_limit() {
    let path = GltfFixture::write_gltf("import_shallow");

    let imported = GltfImporter::new(1).import(&path).unwrap();

    let root = imported.root.unwrap();
    assert_eq!(root.children.len(), 1);
    assert!(root.children[0].children.is_empty());
}

#[test]
fn should_triangulate_lists_strips_and_fans() {
    assert_eq!(
        triangulate(Mode::Triangles, &[0, 1, 2, 2, 1, 3, 9]),
        Some(vec![[0, 1, 2], [2, 1, 3]])
    );
    assert_eq!(
        triangulate(Mode::TriangleStrip, &[0, 1, 2, 3, 4]),
        Some(vec![[0, 1, 2], [2, 1, 3], [2, 3, 4]])
    );
    // repeated indices stitch two strips together, winding still follows position
    assert_eq!(
        triangulate(Mode::TriangleStrip, &[0, 1, 2, 2, 5, 5, 6, 7]),
        Some(vec![[0, 1, 2], [6, 5, 7]])
    );
    assert_eq!(
        triangulate(Mode::TriangleFan, &[0, 1, 2, 3]),
        Some(vec![[0, 1, 2], [0, 2, 3]])
    );
    assert_eq!(triangulate(Mode::TriangleFan, &[]), Some(vec![]));
    assert_eq!(triangulate(Mode::Points, &[0, 1, 2]), None);
    assert_eq!(triangulate(Mode::LineStrip, &[0, 1, 2]), None);
}

fn count_nodes(node: &SceneNode) -> usize {
    1 + node.children.iter().map(count_nodes).sum::<usize>()
}

#[test]
fn should_cut_node_cycles_instead_of_expanding_them() {
    let path = write_gltf_json(
        "self_parent",
        r#"{
  "asset": {"version": "2.0"},
  "scene": 0,
  "scenes": [{"nodes": [0]}],
  "nodes": [{"name": "loop", "children": [0, 0]}]
}"#,
    );

    let started = Instant::now();
    let imported = GltfImporter::default().import(&path).unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    let root = imported.root.unwrap();
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].name, "loop");
    assert!(root.children[0].children.is_empty());
}

#[test]
fn should_stop_converting_nodes_when_the_budget_is_spent() {
    // every node lists the next one twice, so the expanded tree doubles per level
    let nodes: Vec<String> = (0..24)
        .map(|i| {
            if i == 23 {
                format!(r#"{{"name": "n{}"}}"#, i)
            } else {
                format!(r#"{{"name": "n{}", "children": [{}, {}]}}"#, i, i + 1, i + 1)
            }
        })
        .collect();
    let json = format!(
        r#"{{"asset": {{"version": "2.0"}}, "scenes": [{{"nodes": [0]}}], "nodes": [{}]}}"#,
        nodes.join(", ")
    );
    let path = write_gltf_json("shared_children", &json);

    let started = Instant::now();
    let imported = GltfImporter::default()
        .with_max_nodes(100)
        .import(&path)
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    let root = imported.root.unwrap();
    assert_eq!(count_nodes(&root) - 1, 100);
}

#[test]
fn should_embed_images_stored_in_data_uris() {
    let png = png_bytes(2, 2, [10, 200, 30, 255]);
    let json = format!(
        r#"{{
  "asset": {{"version": "2.0"}},
  "scenes": [{{"nodes": []}}],
  "materials": [
    {{"name": "inline", "pbrMetallicRoughness": {{"baseColorTexture": {{"index": 0}}}}}},
    {{"name": "outside", "pbrMetallicRoughness": {{"baseColorTexture": {{"index": 1}}}}}}
  ],
  "textures": [{{"source": 0}}, {{"source": 1}}],
  "images": [
    {{"name": "inline", "uri": "data:image/png;base64,{}"}},
    {{"uri": "textures/wood.png"}}
  ]
}}"#,
        base64::encode(&png)
    );
    let path = write_gltf_json("data_uri_image", &json);

    let imported = GltfImporter::default().import(&path).unwrap();

    assert_eq!(imported.textures.len(), 1);
    let texture = &imported.textures[0];
    assert!(texture.is_compressed());
    assert_eq!(texture.data, png);
    assert_eq!(texture.format_hint.as_deref(), Some("image/png"));
    assert_eq!(texture.name.as_deref(), Some("inline"));
    assert_eq!(imported.materials[0].diffuse_texture.as_deref(), Some("*0"));
    assert_eq!(
        imported.materials[1].diffuse_texture.as_deref(),
        Some("textures/wood.png")
    );

    let mut cache = TextureCache::new();
    let mut decoder = CountingDecoder::new();
    let mut backend = HeadlessBackend::new();
    let handle = cache.resolve(
        &imported.materials[0],
        TextureSlot::Diffuse,
        &imported.textures,
        &mut decoder,
        &mut backend,
    );
    assert!(handle.is_valid());
    assert_eq!(backend.texture_info(handle).unwrap().width, 2);
}
