use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cgmath::{Matrix4, Point3, SquareMatrix, Transform};
use futures::{FutureExt, future::BoxFuture};

use crate::data_structures::model::{Aabb, ClipInfo, Model};

/**
 * This module contains all logic for loading models from external files.
 */
pub mod animation;
pub mod cache;

/// Source of decoded models. Implementations do the actual IO and decoding;
/// memoization lives in [`cache::AssetCache`].
pub trait ModelLoader: Send + Sync {
    fn load(&self, url: &str) -> BoxFuture<'static, anyhow::Result<Model>>;
}

/// Loads `.gltf`/`.glb` files relative to a root directory.
#[derive(Debug, Clone)]
pub struct GltfFileLoader {
    root: PathBuf,
}

impl GltfFileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Default for GltfFileLoader {
    fn default() -> Self {
        Self::new(Path::new("./").join("assets"))
    }
}

impl ModelLoader for GltfFileLoader {
    fn load(&self, url: &str) -> BoxFuture<'static, anyhow::Result<Model>> {
        let path = self.root.join(url);
        let name = url.to_string();
        async move {
            let bytes = load_binary(&path).await?;
            let base = path.parent().map(Path::to_path_buf).unwrap_or_default();
            load_model_gltf(&name, &bytes, &base).await
        }
        .boxed()
    }
}

pub async fn load_binary(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

/// Decodes a glTF document into bounds and animation clip catalog.
///
/// External buffers are resolved relative to `base`.
pub async fn load_model_gltf(name: &str, bytes: &[u8], base: &Path) -> anyhow::Result<Model> {
    let gltf = gltf::Gltf::from_slice(bytes)?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .with_context(|| format!("{name} references a missing binary chunk"))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                if uri.starts_with("data:") {
                    anyhow::bail!("{name} uses an embedded data uri, which is not supported");
                }
                buffer_data.push(load_binary(&base.join(uri)).await?);
            }
        }
    }

    // Load animations
    let mut clips = Vec::new();
    for animation in gltf.animations() {
        let mut duration = 0.0f32;
        for channel in animation.channels() {
            let reader = channel.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
            if let Some(inputs) = reader.read_inputs() {
                duration = inputs.fold(duration, f32::max);
            } else {
                log::debug!("No keyframe times in channel {} of {}", channel.index(), name);
            }
        }
        let clip_name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Animation{}", animation.index()));
        clips.push(ClipInfo {
            name: clip_name,
            duration,
        });
    }

    // Bounds of every primitive under its node transform
    let mut bounds: Option<Aabb> = None;
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    let mut stack: Vec<(gltf::Node, Matrix4<f32>)> = scene
        .map(|scene| scene.nodes().map(|node| (node, Matrix4::identity())).collect())
        .unwrap_or_default();
    while let Some((node, parent)) = stack.pop() {
        let world = parent * Matrix4::from(node.transform().matrix());
        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                let bb = primitive.bounding_box();
                let local = Aabb::new(Point3::from(bb.min), Point3::from(bb.max));
                let corners = local.corners().map(|c| world.transform_point(c));
                if let Some(primitive_bounds) = Aabb::enclosing(corners) {
                    bounds = Some(match bounds {
                        Some(acc) => acc.union(&primitive_bounds),
                        None => primitive_bounds,
                    });
                }
            }
        }
        stack.extend(node.children().map(|child| (child, world)));
    }
    let bounds = bounds.with_context(|| format!("{name} contains no mesh geometry"))?;

    Ok(Model {
        name: name.to_string(),
        bounds,
        clips,
        mesh_count: gltf.meshes().count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "translation": [0.0, 1.0, 0.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "animations": [{
            "name": "Walk",
            "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
            "samplers": [{ "input": 1, "output": 2 }]
        }],
        "buffers": [{ "uri": "box.bin", "byteLength": 68 }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 24 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [-1.0, 0.0, -1.0], "max": [1.0, 2.0, 1.0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.0], "max": [1.5] },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }
        ]
    }"#;

    fn buffer() -> Vec<u8> {
        let floats: [f32; 17] = [
            -1.0, 0.0, -1.0, 1.0, 0.0, 1.0, 0.0, 2.0, 0.0, // positions
            0.0, 1.5, // keyframe times
            0.0, 1.0, 0.0, 0.0, 1.5, 0.0, // translations
        ];
        floats.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    #[tokio::test]
    async fn gltf_bounds_and_clips() {
        let dir = std::env::temp_dir().join(format!("village-ngin-gltf-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        tokio::fs::write(dir.join("box.bin"), buffer()).await.unwrap();
        tokio::fs::write(dir.join("box.gltf"), GLTF).await.unwrap();

        let model = GltfFileLoader::new(&dir).load("box.gltf").await.unwrap();
        assert_eq!(model.name, "box.gltf");
        assert_eq!(model.bounds.min, Point3::new(-1.0, 1.0, -1.0));
        assert_eq!(model.bounds.max, Point3::new(1.0, 3.0, 1.0));
        assert_eq!(model.mesh_count, 1);
        assert_eq!(model.clips.len(), 1);
        assert_eq!(model.clips[0].name, "Walk");
        assert!((model.clips[0].duration - 1.5).abs() < 1e-6);

        let missing = GltfFileLoader::new(&dir).load("nope.glb").await;
        assert!(missing.is_err());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
