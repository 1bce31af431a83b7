//! Host message schema and validation.
//!
//! ```json
//! {"part": "midsole", "color": "#ff0000",
//!  "mapping": {"offsetX": 0.25, "offsetY": -0.1, "scale": 2},
//!  "image": "data:image/png;base64,..."}
//! ```
//!
//! Every field but `part` is optional. `"image": null` removes the texture.

use crate::scene::{ColorParseError, ColorValue, CustomizationState, PartId, TextureRef, UvTransform};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HostMessage {
    pub part: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Absent: leave the texture alone. `null`: clear it.
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
    #[serde(default)]
    pub mapping: Option<Mapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
    #[serde(default = "unit_scale")]
    pub scale: f32,
}

fn unit_scale() -> f32 {
    1.0
}

/// Keeps an explicit `null` distinguishable from a missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, thiserror::Error)]
pub enum MessageError {
    #[error("message is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message has no part")]
    MissingPart,
    #[error("unknown part '{0}'")]
    UnknownPart(String),
    #[error(transparent)]
    Color(#[from] ColorParseError),
}

/// A validated host message.
#[derive(Debug, Clone, PartialEq)]
pub struct HostCommand {
    pub part: PartId,
    pub color: Option<ColorValue>,
    pub mapping: Option<UvTransform>,
    pub image: Option<Option<TextureRef>>,
}

impl HostCommand {
    pub fn parse(text: &str) -> Result<Self, MessageError> {
        let message: HostMessage = serde_json::from_str(text)?;
        Self::validate(message)
    }

    pub fn validate(message: HostMessage) -> Result<Self, MessageError> {
        let name = message.part.ok_or(MessageError::MissingPart)?;
        let part = PartId::from_name(&name).ok_or(MessageError::UnknownPart(name))?;
        let color = message.color.as_deref().map(ColorValue::parse).transpose()?;
        Ok(Self {
            part,
            color,
            mapping: message
                .mapping
                .map(|m| UvTransform::new(m.offset_x, m.offset_y, m.scale)),
            image: message.image.map(|image| image.map(TextureRef::new)),
        })
    }

    /// Applies color, then mapping, then image. Returns true if the state changed.
    pub fn apply(&self, state: &mut CustomizationState) -> bool {
        let mut changed = false;
        if let Some(color) = self.color {
            changed |= state.set_color(self.part, color);
        }
        if let Some(uv) = self.mapping {
            changed |= state.set_uv_transform(self.part, uv);
        }
        if let Some(image) = &self.image {
            changed |= state.set_texture(self.part, image.clone());
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_message_validates() {
        let command = HostCommand::parse(
            r##"{"part":"laces","color":"#00ff00","mapping":{"offsetX":0.25,"offsetY":-0.1,"scale":2},"image":"https://example.com/a.png"}"##,
        )
        .unwrap();
        assert_eq!(
            command,
            HostCommand {
                part: PartId::Laces,
                color: Some(ColorValue::rgb(0, 255, 0)),
                mapping: Some(UvTransform::new(0.25, -0.1, 2.0)),
                image: Some(Some(TextureRef::new("https://example.com/a.png"))),
            }
        );
    }

    #[test]
    fn absent_and_null_image_differ() {
        let absent = HostCommand::parse(r#"{"part":"logo"}"#).unwrap();
        assert_eq!(absent.image, None);
        let null = HostCommand::parse(r#"{"part":"logo","image":null}"#).unwrap();
        assert_eq!(null.image, Some(None));
    }

    #[test]
    fn malformed_messages_are_rejected() {
        assert!(matches!(
            HostCommand::parse(r##"{"part":"wheel","color":"#ff0000"}"##),
            Err(MessageError::UnknownPart(name)) if name == "wheel"
        ));
        assert!(matches!(
            HostCommand::parse(r##"{"color":"#ff0000"}"##),
            Err(MessageError::MissingPart)
        ));
        assert!(matches!(
            HostCommand::parse(r#"{"part":"logo","color":"blue"}"#),
            Err(MessageError::Color(_))
        ));
        assert!(matches!(HostCommand::parse("not json"), Err(MessageError::Json(_))));
        assert!(matches!(
            HostCommand::parse(r#"{"part":7}"#),
            Err(MessageError::Json(_))
        ));
    }

    #[test]
    fn unknown_part_changes_nothing() {
        let mut state = CustomizationState::new();
        let before = state.clone();
        let result = HostCommand::parse(r##"{"part":"wheel","color":"#ff0000"}"##);
        if let Ok(command) = result {
            command.apply(&mut state);
        }
        assert_eq!(state, before);
    }

    #[test]
    fn color_then_image_keeps_the_color_as_fallback() {
        let mut state = CustomizationState::new();
        let red = HostCommand::parse(r##"{"part":"midsole","color":"#ff0000"}"##).unwrap();
        let image =
            HostCommand::parse(r#"{"part":"midsole","image":"https://example.com/a.png"}"#).unwrap();
        assert!(red.apply(&mut state));
        assert!(image.apply(&mut state));

        let record = state.record(PartId::Midsole);
        assert_eq!(record.texture, Some(TextureRef::new("https://example.com/a.png")));
        assert_eq!(record.color, ColorValue::rgb(255, 0, 0));

        let clear = HostCommand::parse(r#"{"part":"midsole","image":null}"#).unwrap();
        assert!(clear.apply(&mut state));
        let record = state.record(PartId::Midsole);
        assert_eq!(record.texture, None);
        assert_eq!(record.color, ColorValue::rgb(255, 0, 0));
    }

    #[test]
    fn image_is_applied_after_color_in_one_message() {
        let mut state = CustomizationState::new();
        let command = HostCommand::parse(
            r##"{"part":"upper","image":"b.png","color":"#0000ff","mapping":{"offsetX":0.5,"offsetY":0,"scale":3}}"##,
        )
        .unwrap();
        command.apply(&mut state);
        let record = state.record(PartId::Upper);
        assert_eq!(record.texture, Some(TextureRef::new("b.png")));
        assert_eq!(record.color, ColorValue::rgb(0, 0, 255));
        assert_eq!(record.uv.scale, 3.0);
    }
}
