//! Material variants, texture maps and the tint capability.

use crate::scene::TextureRef;
use glam::Vec2;
use std::sync::Arc;

/// Decoded RGBA8 pixels ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureImage {
    /// Returns `None` when the buffer does not hold `width * height` RGBA8 pixels.
    pub fn new_rgba8(width: u32, height: u32, rgba: Vec<u8>) -> Option<Self> {
        let expected = (width as usize) * (height as usize) * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return None;
        }
        Some(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn solid(width: u32, height: u32, pixel: [u8; 4]) -> Self {
        let count = (width.max(1) as usize) * (height.max(1) as usize);
        Self {
            width: width.max(1),
            height: height.max(1),
            rgba: pixel.repeat(count),
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = ((y as usize) * (self.width as usize) + x as usize) * 4;
        let px = self.rgba.get(start..start + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wrap {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    Nearest,
    Linear,
    LinearMipmapLinear,
}

/// A texture bound to a material slot, with its sampling state and UV mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureMap {
    pub image: Arc<TextureImage>,
    /// Where the image came from. `None` for textures baked into the asset.
    pub source: Option<TextureRef>,
    pub wrap_s: Wrap,
    pub wrap_t: Wrap,
    pub min_filter: Filter,
    pub mag_filter: Filter,
    pub generate_mipmaps: bool,
    pub repeat: Vec2,
    pub offset: Vec2,
}

impl TextureMap {
    pub fn baked(image: Arc<TextureImage>) -> Self {
        Self {
            image,
            source: None,
            wrap_s: Wrap::ClampToEdge,
            wrap_t: Wrap::ClampToEdge,
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            generate_mipmaps: false,
            repeat: Vec2::ONE,
            offset: Vec2::ZERO,
        }
    }

    /// Tiling map: repeat wrapping on both axes with trilinear filtering.
    pub fn tiled(image: Arc<TextureImage>, source: TextureRef) -> Self {
        Self {
            image,
            source: Some(source),
            wrap_s: Wrap::Repeat,
            wrap_t: Wrap::Repeat,
            min_filter: Filter::LinearMipmapLinear,
            mag_filter: Filter::Linear,
            generate_mipmaps: true,
            repeat: Vec2::ONE,
            offset: Vec2::ZERO,
        }
    }

    pub fn with_mapping(mut self, repeat: Vec2, offset: Vec2) -> Self {
        self.repeat = repeat;
        self.offset = offset;
        self
    }
}

/// Capability of materials whose surface color can be driven by a flat tint
/// or an image map. Materials without it are skipped by customization.
pub trait Tintable {
    fn color(&self) -> [f32; 3];
    fn set_color(&mut self, color: [f32; 3]);
    fn map(&self) -> Option<&TextureMap>;
    fn set_map(&mut self, map: Option<TextureMap>);
    /// Removes secondary shading maps and forces a fully matte response.
    fn flatten_shading(&mut self) {}
    fn mark_dirty(&mut self);
}

/// Lit PBR material, the variant glTF assets load into.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardMaterial {
    pub name: String,
    pub color: [f32; 3],
    pub map: Option<TextureMap>,
    pub normal_map: Option<TextureMap>,
    pub roughness_map: Option<TextureMap>,
    pub metalness_map: Option<TextureMap>,
    pub bump_map: Option<TextureMap>,
    pub ao_map: Option<TextureMap>,
    pub roughness: f32,
    pub metalness: f32,
    pub version: u64,
}

impl StandardMaterial {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: [1.0, 1.0, 1.0],
            map: None,
            normal_map: None,
            roughness_map: None,
            metalness_map: None,
            bump_map: None,
            ao_map: None,
            roughness: 1.0,
            metalness: 1.0,
            version: 0,
        }
    }

    pub fn has_secondary_maps(&self) -> bool {
        self.normal_map.is_some()
            || self.roughness_map.is_some()
            || self.metalness_map.is_some()
            || self.bump_map.is_some()
            || self.ao_map.is_some()
    }
}

impl Tintable for StandardMaterial {
    fn color(&self) -> [f32; 3] {
        self.color
    }

    fn set_color(&mut self, color: [f32; 3]) {
        self.color = color;
    }

    fn map(&self) -> Option<&TextureMap> {
        self.map.as_ref()
    }

    fn set_map(&mut self, map: Option<TextureMap>) {
        self.map = map;
    }

    fn flatten_shading(&mut self) {
        self.normal_map = None;
        self.roughness_map = None;
        self.metalness_map = None;
        self.bump_map = None;
        self.ao_map = None;
        self.roughness = 1.0;
        self.metalness = 0.0;
    }

    fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// Unlit material (glTF `KHR_materials_unlit`).
#[derive(Debug, Clone, PartialEq)]
pub struct UnlitMaterial {
    pub name: String,
    pub color: [f32; 3],
    pub map: Option<TextureMap>,
    pub version: u64,
}

impl Tintable for UnlitMaterial {
    fn color(&self) -> [f32; 3] {
        self.color
    }

    fn set_color(&mut self, color: [f32; 3]) {
        self.color = color;
    }

    fn map(&self) -> Option<&TextureMap> {
        self.map.as_ref()
    }

    fn set_map(&mut self, map: Option<TextureMap>) {
        self.map = map;
    }

    fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

/// Custom shader material. Has no notion of a tint.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderMaterial {
    pub name: String,
    pub program: String,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Standard(StandardMaterial),
    Unlit(UnlitMaterial),
    Shader(ShaderMaterial),
}

impl Material {
    pub fn name(&self) -> &str {
        match self {
            Material::Standard(material) => &material.name,
            Material::Unlit(material) => &material.name,
            Material::Shader(material) => &material.name,
        }
    }

    pub fn version(&self) -> u64 {
        match self {
            Material::Standard(material) => material.version,
            Material::Unlit(material) => material.version,
            Material::Shader(material) => material.version,
        }
    }

    pub fn as_tintable(&self) -> Option<&dyn Tintable> {
        match self {
            Material::Standard(material) => Some(material),
            Material::Unlit(material) => Some(material),
            Material::Shader(_) => None,
        }
    }

    pub fn as_tintable_mut(&mut self) -> Option<&mut dyn Tintable> {
        match self {
            Material::Standard(material) => Some(material),
            Material::Unlit(material) => Some(material),
            Material::Shader(_) => None,
        }
    }

    pub fn as_standard(&self) -> Option<&StandardMaterial> {
        match self {
            Material::Standard(material) => Some(material),
            _ => None,
        }
    }
}
