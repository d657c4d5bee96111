use std::{
    cell::Cell,
    io::Cursor,
    path::{Path, PathBuf},
    rc::Rc,
};

use image::{ImageFormat, Rgba, RgbaImage};
use scene_flatten::{
    cgmath::{self, SquareMatrix},
    data_structures::scene_graph::{EmbeddedTexture, ImportedScene, RawMaterial, RawMesh, SceneNode},
    error::TextureError,
    resources::texture::{ImageCrateDecoder, ImageDecoder},
};

/// Decoder that counts how often it is asked to decode.
#[derive(Clone, Default)]
pub(crate) struct CountingDecoder {
    calls: Rc<Cell<usize>>,
}

impl CountingDecoder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A handle to the counter that stays valid after the decoder moved into a loader.
    pub(crate) fn counter(&self) -> Rc<Cell<usize>> {
        self.calls.clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ImageDecoder for CountingDecoder {
    fn decode(&mut self, bytes: &[u8], format_hint: Option<&str>) -> Result<RgbaImage, TextureError> {
        self.calls.set(self.calls.get() + 1);
        ImageCrateDecoder.decode(bytes, format_hint)
    }
}

pub(crate) fn png_bytes(width: u32, height: u32, colour: [u8; 4]) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba(colour));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png)
        .expect("failed to encode png fixture");
    bytes.into_inner()
}

pub(crate) fn identity() -> cgmath::Matrix4<f32> {
    cgmath::Matrix4::identity()
}

pub(crate) fn translation(x: f32, y: f32, z: f32) -> cgmath::Matrix4<f32> {
    cgmath::Matrix4::from_translation(cgmath::Vector3::new(x, y, z))
}

pub(crate) fn scale(s: f32) -> cgmath::Matrix4<f32> {
    cgmath::Matrix4::from_scale(s)
}

pub(crate) fn assert_matrix_eq(actual: &cgmath::Matrix4<f32>, expected: &cgmath::Matrix4<f32>) {
    let actual: [[f32; 4]; 4] = (*actual).into();
    let expected: [[f32; 4]; 4] = (*expected).into();
    for col in 0..4 {
        for row in 0..4 {
            assert!(
                (actual[col][row] - expected[col][row]).abs() < 1e-5,
                "matrices differ at column {}, row {}:\nactual   {:?}\nexpected {:?}",
                col,
                row,
                actual,
                expected
            );
        }
    }
}

/// A single triangle with positions only.
pub(crate) fn triangle(name: &str) -> RawMesh {
    RawMesh {
        name: name.to_string(),
        positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        faces: vec![[0, 1, 2]],
        ..Default::default()
    }
}

pub(crate) fn material(name: &str, diffuse: Option<&str>, normal: Option<&str>) -> RawMaterial {
    RawMaterial {
        name: name.to_string(),
        diffuse_texture: diffuse.map(str::to_string),
        normal_texture: normal.map(str::to_string),
    }
}

pub(crate) fn embedded_png(colour: [u8; 4]) -> EmbeddedTexture {
    EmbeddedTexture::compressed(png_bytes(4, 4, colour), Some("png".to_string()))
}

/// Root (identity, no meshes) -> child translated by (0, 5, 0) with one untextured triangle.
pub(crate) fn two_node_scene() -> ImportedScene {
    let child = SceneNode::new("child", translation(0.0, 5.0, 0.0)).with_meshes([0]);
    ImportedScene {
        root: Some(SceneNode::new("root", identity()).with_child(child)),
        meshes: vec![triangle("tri")],
        ..Default::default()
    }
}

/// Directory for files written by tests.
pub(crate) fn fixture_dir() -> PathBuf {
    let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("scene_flatten_fixtures");
    std::fs::create_dir_all(&dir).expect("failed to create fixture dir");
    dir
}

/// Write a hand-written `.gltf` document and return its path.
pub(crate) fn write_gltf_json(name: &str, json: &str) -> PathBuf {
    let path = fixture_dir().join(format!("{}.gltf", name));
    std::fs::write(&path, json).expect("failed to write gltf document");
    path
}

/**
 * A small glTF asset:
 *
 * scene root -> "base" (translation (0, 1, 0), mesh 0)
 *                 -> "arm" (translation (2, 0, 0), scale 2, mesh 1)
 *
 * mesh 0 has one triangle primitive using material 0, mesh 1 has two triangle
 * primitives using materials 0 and 1. Material 0 has image 0 as base colour,
 * material 1 has image 0 as base colour and image 1 as normal map. Both images
 * are PNGs stored in buffer views.
 */
pub(crate) struct GltfFixture {
    json: String,
    bin: Vec<u8>,
}

impl GltfFixture {
    pub(crate) fn new() -> Self {
        Self::build(None)
    }

    fn build(buffer_uri: Option<&str>) -> Self {
        let mut bin = Vec::new();
        let mut views = Vec::new();
        let mut push_view = |bin: &mut Vec<u8>, bytes: &[u8], target: Option<u32>| {
            let offset = bin.len();
            bin.extend_from_slice(bytes);
            while bin.len() % 4 != 0 {
                bin.push(0);
            }
            let target = target
                .map(|t| format!(r#", "target": {}"#, t))
                .unwrap_or_default();
            views.push(format!(
                r#"{{"buffer": 0, "byteOffset": {}, "byteLength": {}{}}}"#,
                offset,
                bytes.len(),
                target
            ));
        };

        let positions: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let normals: [[f32; 3]; 3] = [[0.0, 0.0, 1.0]; 3];
        let uvs: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        let indices: [u16; 3] = [0, 1, 2];

        push_view(&mut bin, bytemuck::cast_slice(&positions), Some(34962));
        push_view(&mut bin, bytemuck::cast_slice(&normals), Some(34962));
        push_view(&mut bin, bytemuck::cast_slice(&uvs), Some(34962));
        push_view(&mut bin, bytemuck::cast_slice(&indices), Some(34963));
        push_view(&mut bin, &png_bytes(4, 4, [255, 0, 0, 255]), None);
        push_view(&mut bin, &png_bytes(2, 2, [128, 128, 255, 255]), None);

        let uri = buffer_uri
            .map(|uri| format!(r#", "uri": "{}""#, uri))
            .unwrap_or_default();
        let primitive = |material: usize| {
            format!(
                r#"{{"attributes": {{"POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2}}, "indices": 3, "material": {}}}"#,
                material
            )
        };
        let json = format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"name": "fixture", "nodes": [0]}}],
  "nodes": [
    {{"name": "base", "translation": [0.0, 1.0, 0.0], "mesh": 0, "children": [1]}},
    {{"name": "arm", "translation": [2.0, 0.0, 0.0], "scale": [2.0, 2.0, 2.0], "mesh": 1}}
  ],
  "meshes": [
    {{"name": "body", "primitives": [{p0}]}},
    {{"name": "limb", "primitives": [{p0}, {p1}]}}
  ],
  "materials": [
    {{"name": "painted", "pbrMetallicRoughness": {{"baseColorTexture": {{"index": 0}}}}}},
    {{"name": "bumpy", "pbrMetallicRoughness": {{"baseColorTexture": {{"index": 0}}}}, "normalTexture": {{"index": 1}}}}
  ],
  "textures": [{{"source": 0}}, {{"source": 1}}],
  "images": [
    {{"name": "albedo", "bufferView": 4, "mimeType": "image/png"}},
    {{"name": "normals", "bufferView": 5, "mimeType": "image/png"}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3"}},
    {{"bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2"}},
    {{"bufferView": 3, "componentType": 5123, "count": 3, "type": "SCALAR"}}
  ],
  "bufferViews": [{views}],
  "buffers": [{{"byteLength": {len}{uri}}}]
}}"#,
            p0 = primitive(0),
            p1 = primitive(1),
            views = views.join(", "),
            len = bin.len(),
            uri = uri,
        );
        Self { json, bin }
    }

    /// Write `<name>.gltf` plus `<name>.bin` and return the `.gltf` path.
    pub(crate) fn write_gltf(name: &str) -> PathBuf {
        let dir = fixture_dir();
        let bin_name = format!("{}.bin", name);
        let fixture = Self::build(Some(&bin_name));
        std::fs::write(dir.join(&bin_name), &fixture.bin).expect("failed to write fixture bin");
        let path = dir.join(format!("{}.gltf", name));
        std::fs::write(&path, fixture.json).expect("failed to write fixture gltf");
        path
    }

    /// Write a self-contained `<name>.glb` and return its path.
    pub(crate) fn write_glb(name: &str) -> PathBuf {
        let fixture = Self::new();
        let mut json = fixture.json.into_bytes();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let bin = fixture.bin;
        let total = 12 + 8 + json.len() + 8 + bin.len();

        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);

        let path = fixture_dir().join(format!("{}.glb", name));
        std::fs::write(&path, glb).expect("failed to write fixture glb");
        path
    }
}
