//! Reconciler-side texture bookkeeping: which references are loading, which
//! are uploaded, which failed.

use crate::render::{SceneGraph, TextureImage};
use crate::scene::TextureRef;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum TextureSlot {
    Pending,
    Ready(Arc<TextureImage>),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct TextureCache {
    slots: HashMap<TextureRef, TextureSlot>,
}

impl TextureCache {
    pub fn slot(&self, reference: &TextureRef) -> Option<&TextureSlot> {
        self.slots.get(reference)
    }

    pub fn mark_pending(&mut self, reference: TextureRef) {
        self.slots.insert(reference, TextureSlot::Pending);
    }

    /// Uploads `image` for `reference`, releasing any previous upload.
    pub fn store(&mut self, scene: &mut SceneGraph, reference: TextureRef, image: TextureImage) {
        let uploaded = scene.upload_texture(image);
        if let Some(TextureSlot::Ready(previous)) =
            self.slots.insert(reference, TextureSlot::Ready(uploaded))
        {
            scene.release_texture(previous);
        }
    }

    pub fn fail(&mut self, scene: &mut SceneGraph, reference: TextureRef, message: String) {
        if let Some(TextureSlot::Ready(previous)) =
            self.slots.insert(reference, TextureSlot::Failed(message))
        {
            scene.release_texture(previous);
        }
    }

    pub fn forget_failed(&mut self, reference: &TextureRef) -> bool {
        if matches!(self.slots.get(reference), Some(TextureSlot::Failed(_))) {
            self.slots.remove(reference);
            return true;
        }
        false
    }

    /// Forgets every slot whose reference is neither wanted nor still mapped.
    /// Returns how many uploads were released.
    pub fn release_unused(
        &mut self,
        scene: &mut SceneGraph,
        wanted: &HashSet<TextureRef>,
        mapped: &HashSet<TextureRef>,
    ) -> usize {
        let stale: Vec<TextureRef> = self
            .slots
            .keys()
            .filter(|reference| !wanted.contains(*reference) && !mapped.contains(*reference))
            .cloned()
            .collect();
        let mut released = 0;
        for reference in stale {
            if let Some(TextureSlot::Ready(image)) = self.slots.remove(&reference) {
                scene.release_texture(image);
                released += 1;
            }
        }
        released
    }

    pub fn clear(&mut self, scene: &mut SceneGraph) {
        for (_, slot) in self.slots.drain() {
            if let TextureSlot::Ready(image) = slot {
                scene.release_texture(image);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
