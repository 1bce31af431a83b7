use crate::app::ViewStatus;
use crate::render::ResourceLedger;
use crate::scene::{ColorValue, CustomizationState, PartId, TextureRef, UvTransform};

/// One edit issued by the on-screen controls.
///
/// Crop uploads are not listed here: they need the async crop pipeline and go
/// through `CustomizerView::apply_cropped_image` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlAction {
    SelectPart(Option<PartId>),
    SetColor { part: PartId, color: ColorValue },
    SetTexture { part: PartId, texture: Option<TextureRef> },
    SetUv { part: PartId, uv: UvTransform },
    SetInteraction(bool),
}

impl ControlAction {
    /// Returns true if the state changed.
    pub fn apply(&self, state: &mut CustomizationState) -> bool {
        match self {
            ControlAction::SelectPart(part) => state.select_part(*part),
            ControlAction::SetColor { part, color } => state.set_color(*part, *color),
            ControlAction::SetTexture { part, texture } => state.set_texture(*part, texture.clone()),
            ControlAction::SetUv { part, uv } => state.set_uv_transform(*part, *uv),
            ControlAction::SetInteraction(enabled) => state.set_interaction_enabled(*enabled),
        }
    }
}

/// Control panel model: which part the panel edits and the HUD text.
pub struct UiState {
    show_summary: bool,
    summary: String,
    panel_part: Option<PartId>,
    status: String,
}

impl UiState {
    pub fn new() -> Self {
        Self {
            show_summary: true,
            summary: String::new(),
            panel_part: None,
            status: String::new(),
        }
    }

    pub fn update(&mut self, state: &CustomizationState, status: &ViewStatus, ledger: ResourceLedger) {
        // the panel keeps editing the last selected part after a deselect
        if let Some(part) = state.selected() {
            self.panel_part = Some(part);
        }
        if !self.show_summary {
            return;
        }

        let mut summary = format!("{} | revision {}\n", status, state.revision());
        for (part, record) in state.records() {
            let marker = if state.selected() == Some(part) { '>' } else { ' ' };
            let texture = record
                .texture
                .as_ref()
                .map(|texture| texture.to_string())
                .unwrap_or_else(|| "-".to_string());
            summary.push_str(&format!(
                "{} {:<8} {} tex {} (offset {:.2}, {:.2}, scale {:.2})\n",
                marker,
                part,
                record.color.to_hex(),
                texture,
                record.uv.offset_x,
                record.uv.offset_y,
                record.uv.scale
            ));
        }
        summary.push_str(&format!(
            "Interaction: {} | runtime materials {}, overlays {}, textures {}",
            if state.interaction_enabled() { "on" } else { "off" },
            ledger.materials,
            ledger.overlays,
            ledger.textures
        ));
        if !self.status.is_empty() {
            summary.push('\n');
            summary.push_str(&self.status);
        }
        self.summary = summary;
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn set_show_summary(&mut self, show: bool) {
        self.show_summary = show;
    }

    pub fn panel_part(&self) -> Option<PartId> {
        self.panel_part
    }

    pub fn set_panel_part(&mut self, part: Option<PartId>) {
        self.panel_part = part;
    }

    pub fn color_action(&self, color: ColorValue) -> Option<ControlAction> {
        self.panel_part.map(|part| ControlAction::SetColor { part, color })
    }

    pub fn uv_action(&self, offset_x: f32, offset_y: f32, scale: f32) -> Option<ControlAction> {
        self.panel_part.map(|part| ControlAction::SetUv {
            part,
            uv: UvTransform::new(offset_x, offset_y, scale),
        })
    }

    pub fn clear_texture_action(&self) -> Option<ControlAction> {
        self.panel_part.map(|part| ControlAction::SetTexture { part, texture: None })
    }

    /// Transient message shown under the summary (upload errors etc).
    pub fn set_status(&mut self, status: String) {
        self.status = status;
    }
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}
