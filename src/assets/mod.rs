//! Asset loading: glTF/GLB import into the scene graph, the blob store for
//! in-session images, image sources and the crop pipeline.

pub mod blob;
pub mod crop;
pub mod source;
pub mod textures;

use crate::render::{
    Geometry, Material, MaterialId, NodeId, NodeKind, SceneGraph, StandardMaterial, Surface,
    TextureImage, TextureMap, UnlitMaterial,
};
use glam::{Mat4, Vec2, Vec3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to import glTF at {path}: {source}")]
    Import {
        path: String,
        #[source]
        source: gltf::Error,
    },
    #[error("glTF at {path} has no scene")]
    NoScene { path: String },
    #[error("glTF at {path} has no drawable triangle meshes")]
    NoSurfaces { path: String },
    #[error("asset loader task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Summary of an imported asset, for logging and camera framing.
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub name: String,
    pub surfaces: usize,
    pub materials: usize,
    pub center: Vec3,
    pub extent: Vec3,
}

/// Loads the asset on the blocking pool so the view loop keeps running.
pub async fn load_asset(path: PathBuf) -> Result<(SceneGraph, LoadedAsset), AssetError> {
    tokio::task::spawn_blocking(move || load_asset_blocking(&path)).await?
}

pub fn load_asset_blocking(path: &Path) -> Result<(SceneGraph, LoadedAsset), AssetError> {
    let label = path.display().to_string();
    let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Import {
        path: label.clone(),
        source,
    })?;
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("gltf")
        .to_string();
    build_scene(name, &label, &document, &buffers, &images)
}

/// Imports a self-contained glTF/GLB held in memory.
pub fn load_asset_from_slice(
    name: &str,
    bytes: &[u8],
) -> Result<(SceneGraph, LoadedAsset), AssetError> {
    let (document, buffers, images) =
        gltf::import_slice(bytes).map_err(|source| AssetError::Import {
            path: name.to_string(),
            source,
        })?;
    build_scene(name.to_string(), name, &document, &buffers, &images)
}

fn build_scene(
    name: String,
    label: &str,
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    images: &[gltf::image::Data],
) -> Result<(SceneGraph, LoadedAsset), AssetError> {
    let gltf_scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| AssetError::NoScene {
            path: label.to_string(),
        })?;

    let mut builder = SceneBuilder {
        scene: SceneGraph::new(),
        buffers,
        images,
        materials: HashMap::new(),
        textures: HashMap::new(),
        default_material: None,
    };
    for node in gltf_scene.nodes() {
        builder.add_node(None, &node);
    }
    let scene = builder.scene;

    let surfaces = scene.surfaces().count();
    let Some(bounds) = scene.bounds().filter(|_| surfaces > 0) else {
        return Err(AssetError::NoSurfaces {
            path: label.to_string(),
        });
    };
    let loaded = LoadedAsset {
        name,
        surfaces,
        materials: scene.material_count(),
        center: bounds.center(),
        extent: bounds.extent(),
    };
    log::info!(
        "Loaded asset '{}': {} surfaces, {} materials",
        loaded.name,
        loaded.surfaces,
        loaded.materials
    );
    Ok((scene, loaded))
}

struct SceneBuilder<'a> {
    scene: SceneGraph,
    buffers: &'a [gltf::buffer::Data],
    images: &'a [gltf::image::Data],
    /// glTF material index -> shared scene material.
    materials: HashMap<usize, MaterialId>,
    textures: HashMap<usize, Option<Arc<TextureImage>>>,
    default_material: Option<MaterialId>,
}

impl SceneBuilder<'_> {
    fn add_node(&mut self, parent: Option<NodeId>, node: &gltf::Node) {
        let name = node.name().unwrap_or_default().to_string();
        let local = Mat4::from_cols_array_2d(&node.transform().matrix());

        let mut primitives: Vec<(Geometry, MaterialId)> = node
            .mesh()
            .map(|mesh| {
                mesh.primitives()
                    .filter_map(|primitive| self.primitive(&primitive))
                    .collect()
            })
            .unwrap_or_default();

        let id = if primitives.len() == 1 {
            let (geometry, material) = primitives.remove(0);
            self.scene.add_node(
                parent,
                name.clone(),
                NodeKind::Surface(Surface {
                    geometry: Arc::new(geometry),
                    material,
                }),
                local,
            )
        } else {
            let group = self.scene.add_node(parent, name.clone(), NodeKind::Group, local);
            for (index, (geometry, material)) in primitives.into_iter().enumerate() {
                self.scene.add_node(
                    Some(group),
                    format!("{name}_{index}"),
                    NodeKind::Surface(Surface {
                        geometry: Arc::new(geometry),
                        material,
                    }),
                    Mat4::IDENTITY,
                );
            }
            group
        };
        self.scene.index_name(&name, id);

        for child in node.children() {
            self.add_node(Some(id), &child);
        }
    }

    fn primitive(&mut self, primitive: &gltf::Primitive) -> Option<(Geometry, MaterialId)> {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::debug!("Skipping non-triangle primitive ({:?})", primitive.mode());
            return None;
        }
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
        let positions: Vec<Vec3> = reader.read_positions()?.map(Vec3::from).collect();
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        let normals = reader
            .read_normals()
            .map(|normals| normals.map(Vec3::from).collect())
            .unwrap_or_default();
        let uvs = reader
            .read_tex_coords(0)
            .map(|uvs| uvs.into_f32().map(Vec2::from).collect())
            .unwrap_or_default();

        let geometry = Geometry {
            positions,
            normals,
            uvs,
            indices,
        };
        if !geometry.is_valid() {
            return None;
        }
        let material = self.material(&primitive.material());
        Some((geometry, material))
    }

    /// Materials are shared between primitives exactly as the file shares them.
    fn material(&mut self, material: &gltf::Material) -> MaterialId {
        let Some(index) = material.index() else {
            if let Some(id) = self.default_material {
                return id;
            }
            let id = self
                .scene
                .add_material(Material::Standard(StandardMaterial::new("default")));
            self.default_material = Some(id);
            return id;
        };
        if let Some(id) = self.materials.get(&index) {
            return *id;
        }

        let name = material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material_{index}"));
        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, _] = pbr.base_color_factor();
        let base_map = pbr
            .base_color_texture()
            .and_then(|info| self.texture_map(&info.texture()));

        let converted = if material.unlit() {
            Material::Unlit(UnlitMaterial {
                name,
                color: [r, g, b],
                map: base_map,
                version: 0,
            })
        } else {
            let mut standard = StandardMaterial::new(name);
            standard.color = [r, g, b];
            standard.map = base_map;
            standard.roughness = pbr.roughness_factor();
            standard.metalness = pbr.metallic_factor();
            let metallic_roughness = pbr
                .metallic_roughness_texture()
                .and_then(|info| self.texture_map(&info.texture()));
            standard.roughness_map = metallic_roughness.clone();
            standard.metalness_map = metallic_roughness;
            standard.normal_map = material
                .normal_texture()
                .and_then(|info| self.texture_map(&info.texture()));
            standard.ao_map = material
                .occlusion_texture()
                .and_then(|info| self.texture_map(&info.texture()));
            Material::Standard(standard)
        };

        let id = self.scene.add_material(converted);
        self.materials.insert(index, id);
        id
    }

    fn texture_map(&mut self, texture: &gltf::Texture) -> Option<TextureMap> {
        let index = texture.source().index();
        let images = self.images;
        let image = self
            .textures
            .entry(index)
            .or_insert_with(|| images.get(index).and_then(convert_image).map(Arc::new))
            .clone()?;
        Some(TextureMap::baked(image))
    }
}

fn convert_image(data: &gltf::image::Data) -> Option<TextureImage> {
    use gltf::image::Format;
    let rgba = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => data
            .pixels
            .chunks_exact(3)
            .flat_map(|px| [px[0], px[1], px[2], 255])
            .collect(),
        Format::R8 => data.pixels.iter().flat_map(|v| [*v, *v, *v, 255]).collect(),
        other => {
            log::warn!("Unsupported embedded image format {:?}; texture skipped", other);
            return None;
        }
    };
    TextureImage::new_rgba8(data.width, data.height, rgba)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Three named meshes under a `shoe` root: `midsole` and `laces` share a
    /// mesh and a material, `upper` has two primitives (one unlit).
    pub(crate) const SHOE_GLTF: &str = r#"{
        "asset": {"version": "2.0"},
        "extensionsUsed": ["KHR_materials_unlit"],
        "scene": 0,
        "scenes": [{"nodes": [0]}],
        "nodes": [
            {"name": "shoe", "children": [1, 2, 3]},
            {"name": "midsole", "mesh": 0, "translation": [0.0, 0.0, 1.0]},
            {"name": "laces", "mesh": 0},
            {"name": "upper", "mesh": 1}
        ],
        "meshes": [
            {"name": "sole_mesh", "primitives": [{"attributes": {"POSITION": 0}, "indices": 1, "material": 0}]},
            {"name": "upper_mesh", "primitives": [
                {"attributes": {"POSITION": 0}, "indices": 1, "material": 0},
                {"attributes": {"POSITION": 0}, "indices": 1, "material": 1}
            ]}
        ],
        "materials": [
            {"name": "leather", "pbrMetallicRoughness": {"baseColorFactor": [1.0, 1.0, 1.0, 1.0], "metallicFactor": 0.5}},
            {"name": "flat", "extensions": {"KHR_materials_unlit": {}}}
        ],
        "buffers": [{"byteLength": 44, "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA="}],
        "bufferViews": [
            {"buffer": 0, "byteOffset": 0, "byteLength": 36},
            {"buffer": 0, "byteOffset": 36, "byteLength": 6}
        ],
        "accessors": [
            {"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]},
            {"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}
        ]
    }"#;

    #[test]
    fn imports_named_nodes_and_shared_materials() {
        let (scene, loaded) = load_asset_from_slice("shoe.gltf", SHOE_GLTF.as_bytes()).unwrap();
        assert_eq!(loaded.surfaces, 4);
        assert_eq!(loaded.materials, 2);

        let midsole = scene.find_indexed("midsole").unwrap();
        let laces = scene.find_indexed("laces").unwrap();
        assert_eq!(
            scene.surface(midsole).unwrap().material,
            scene.surface(laces).unwrap().material
        );
        assert_eq!(scene.surface(midsole).unwrap().geometry.triangle_count(), 1);
        assert!(scene.ledger().is_empty());
    }

    #[test]
    fn multi_primitive_meshes_become_groups() {
        let (scene, _) = load_asset_from_slice("shoe.gltf", SHOE_GLTF.as_bytes()).unwrap();
        let upper = scene.find_indexed("upper").unwrap();
        assert!(scene.surface(upper).is_none());
        let first = scene.node(upper).unwrap().children()[0];
        assert_eq!(scene.node(first).unwrap().name, "upper_0");

        let second = scene.node(upper).unwrap().children()[1];
        let material = scene.surface(second).unwrap().material;
        assert!(matches!(scene.material(material), Some(Material::Unlit(_))));
    }

    #[test]
    fn node_transforms_are_kept() {
        let (scene, loaded) = load_asset_from_slice("shoe.gltf", SHOE_GLTF.as_bytes()).unwrap();
        let midsole = scene.find_indexed("midsole").unwrap();
        let origin = scene.world_transform(midsole).transform_point3(Vec3::ZERO);
        assert_eq!(origin, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(loaded.extent, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn garbage_is_an_import_error() {
        let err = load_asset_from_slice("broken.gltf", b"{not json").unwrap_err();
        assert!(matches!(err, AssetError::Import { .. }));
    }

    #[tokio::test]
    async fn missing_file_fails_without_panicking() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_asset(dir.path().join("nope.glb")).await.unwrap_err();
        assert!(err.to_string().contains("nope.glb"));
    }
}
