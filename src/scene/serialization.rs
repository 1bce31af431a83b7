//! JSON snapshot of the customization state, for diagnostics (`--print-state`).
//! The state itself is never persisted.

use crate::scene::{CustomizationState, PartId, PartRecord};
use std::collections::BTreeMap;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum SerializationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SerializationError>;

#[derive(Debug, serde::Serialize)]
pub struct StateSnapshot<'a> {
    pub revision: u64,
    pub selected: Option<PartId>,
    pub interaction_enabled: bool,
    pub parts: BTreeMap<&'static str, &'a PartRecord>,
}

pub fn snapshot(state: &CustomizationState) -> StateSnapshot<'_> {
    StateSnapshot {
        revision: state.revision(),
        selected: state.selected(),
        interaction_enabled: state.interaction_enabled(),
        parts: state
            .records()
            .map(|(part, record)| (part.as_str(), record))
            .collect(),
    }
}

pub fn snapshot_json(state: &CustomizationState) -> Result<String> {
    Ok(serde_json::to_string_pretty(&snapshot(state))?)
}

/// Writes one compact snapshot per line.
pub fn write_snapshot<W: Write>(state: &CustomizationState, out: &mut W) -> Result<()> {
    serde_json::to_writer(&mut *out, &snapshot(state))?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
