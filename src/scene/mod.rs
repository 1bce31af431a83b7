//! Customization state: one record per shoe part, the selected part and the
//! global interaction flag.
//!
//! Every mutation replaces a whole [`PartRecord`] and bumps the state
//! revision, which is what the view watches to schedule reconciliation.

pub mod serialization;

use std::fmt;
use std::str::FromStr;

/// Smallest UV scale accepted. Anything lower collapses the texture.
pub const MIN_UV_SCALE: f32 = 0.05;

/// Named, independently customizable regions of the shoe asset.
///
/// Textual names match the node names in the model.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PartId {
    Logo,
    Upper,
    Midsole,
    Outsole,
    Laces,
    Tongue,
    Heel,
    Lining,
}

impl PartId {
    pub const COUNT: usize = 8;

    pub const ALL: [PartId; PartId::COUNT] = [
        PartId::Logo,
        PartId::Upper,
        PartId::Midsole,
        PartId::Outsole,
        PartId::Laces,
        PartId::Tongue,
        PartId::Heel,
        PartId::Lining,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PartId::Logo => "logo",
            PartId::Upper => "upper",
            PartId::Midsole => "midsole",
            PartId::Outsole => "outsole",
            PartId::Laces => "laces",
            PartId::Tongue => "tongue",
            PartId::Heel => "heel",
            PartId::Lining => "lining",
        }
    }

    /// Membership check for names coming from outside (host messages, node
    /// names). Unknown names are `None`, never an error.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|part| part.as_str() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}': expected #rrggbb or #rgb")]
pub struct ColorParseError(pub String);

/// Flat 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColorValue {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorValue {
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn parse(text: &str) -> Result<Self, ColorParseError> {
        let trimmed = text.trim();
        let hex = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let invalid = || ColorParseError(text.to_string());
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        match hex.len() {
            6 => Ok(Self::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            3 => Ok(Self::rgb(
                channel(0..1)? * 17,
                channel(1..2)? * 17,
                channel(2..3)? * 17,
            )),
            _ => Err(invalid()),
        }
    }

    /// Normalized `[0, 1]` channels, the form material parameters take.
    pub fn to_rgb_f32(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for ColorValue {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for ColorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ColorValue {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl serde::Serialize for ColorValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for ColorValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Texture placement on a part's unwrapped surface.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UvTransform {
    pub offset_x: f32,
    pub offset_y: f32,
    pub scale: f32,
}

impl UvTransform {
    /// Builds a transform, replacing non-finite components with defaults and
    /// clamping the scale to [`MIN_UV_SCALE`].
    pub fn new(offset_x: f32, offset_y: f32, scale: f32) -> Self {
        let finite_or = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };
        Self {
            offset_x: finite_or(offset_x, 0.0),
            offset_y: finite_or(offset_y, 0.0),
            scale: finite_or(scale, 1.0).max(MIN_UV_SCALE),
        }
    }

    fn sanitized(self) -> Self {
        Self::new(self.offset_x, self.offset_y, self.scale)
    }
}

impl Default for UvTransform {
    fn default() -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            scale: 1.0,
        }
    }
}

/// Opaque handle to image data: data URL, remote URL, file path or a
/// `blob:` key from the view's blob store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TextureRef(String);

impl TextureRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // data URLs can be megabytes long
        const SHOWN: usize = 64;
        if self.0.len() <= SHOWN {
            return f.write_str(&self.0);
        }
        let mut end = SHOWN;
        while !self.0.is_char_boundary(end) {
            end -= 1;
        }
        write!(f, "{}…", &self.0[..end])
    }
}

/// Per-part visual configuration.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PartRecord {
    pub color: ColorValue,
    pub texture: Option<TextureRef>,
    pub uv: UvTransform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomizationState {
    records: [PartRecord; PartId::COUNT],
    selected: Option<PartId>,
    interaction_enabled: bool,
    revision: u64,
}

impl CustomizationState {
    pub fn new() -> Self {
        Self {
            records: std::array::from_fn(|_| PartRecord::default()),
            selected: None,
            interaction_enabled: true,
            revision: 0,
        }
    }

    pub fn record(&self, part: PartId) -> &PartRecord {
        &self.records[part.index()]
    }

    pub fn records(&self) -> impl Iterator<Item = (PartId, &PartRecord)> {
        PartId::ALL
            .into_iter()
            .map(move |part| (part, &self.records[part.index()]))
    }

    pub fn selected(&self) -> Option<PartId> {
        self.selected
    }

    pub fn interaction_enabled(&self) -> bool {
        self.interaction_enabled
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True if any part currently wants `reference` as its texture.
    pub fn wants_texture(&self, reference: &TextureRef) -> bool {
        self.records
            .iter()
            .any(|record| record.texture.as_ref() == Some(reference))
    }

    pub fn desired_textures(&self) -> impl Iterator<Item = &TextureRef> {
        self.records.iter().filter_map(|record| record.texture.as_ref())
    }

    /// Sets the flat color. Color and texture are exclusive visual sources,
    /// so this also drops the part's texture.
    pub fn set_color(&mut self, part: PartId, color: ColorValue) -> bool {
        let current = self.record(part);
        let record = PartRecord {
            color,
            texture: None,
            uv: current.uv,
        };
        self.replace_record(part, record)
    }

    /// Sets or clears the texture. The color is kept as the fallback.
    pub fn set_texture(&mut self, part: PartId, texture: Option<TextureRef>) -> bool {
        let current = self.record(part);
        let record = PartRecord {
            color: current.color,
            texture,
            uv: current.uv,
        };
        self.replace_record(part, record)
    }

    pub fn set_uv_transform(&mut self, part: PartId, uv: UvTransform) -> bool {
        let current = self.record(part);
        let record = PartRecord {
            color: current.color,
            texture: current.texture.clone(),
            uv: uv.sanitized(),
        };
        self.replace_record(part, record)
    }

    /// Selecting a part replaces the previous selection. While interaction is
    /// disabled there is no selection, so selecting is a no-op.
    pub fn select_part(&mut self, part: Option<PartId>) -> bool {
        if part.is_some() && !self.interaction_enabled {
            log::debug!("Ignoring selection of {:?}: interaction disabled", part);
            return false;
        }
        if self.selected == part {
            return false;
        }
        self.selected = part;
        self.bump();
        true
    }

    pub fn set_interaction_enabled(&mut self, enabled: bool) -> bool {
        if self.interaction_enabled == enabled {
            return false;
        }
        self.interaction_enabled = enabled;
        if !enabled {
            self.selected = None;
        }
        self.bump();
        true
    }

    fn replace_record(&mut self, part: PartId, record: PartRecord) -> bool {
        let slot = &mut self.records[part.index()];
        if *slot == record {
            return false;
        }
        *slot = record;
        self.bump();
        true
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl Default for CustomizationState {
    fn default() -> Self {
        Self::new()
    }
}
