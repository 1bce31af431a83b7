//! Mesh reconciler: makes the scene graph match the customization state.
//!
//! Each pass walks every part and every surface under it, isolates each
//! surface's material (clone on first touch), applies the flat color or
//! texture, normalizes shading and keeps the selection outline in sync. A
//! pass is synchronous and always complete; textures that are still loading
//! keep whatever the surface showed before.
//!
//! All per-node bookkeeping lives in a side table owned by the reconciler.
//! Scene nodes are never annotated.

mod textures;

pub use textures::{TextureCache, TextureSlot};

use crate::assets::textures::TextureEvent;
use crate::render::{
    EdgeOverlay, MaterialId, NodeId, SceneGraph, TextureMap, Tintable, EDGE_THRESHOLD_DEG,
};
use crate::scene::{ColorValue, CustomizationState, PartId, PartRecord, TextureRef};
use glam::Vec2;
use std::collections::{HashMap, HashSet};

/// Textures repeat twice across a part's unwrapped surface at scale 1.
pub const UV_TILING_FACTOR: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeAux {
    original: MaterialId,
    clone: MaterialId,
    overlay: Option<NodeId>,
}

/// Outcome of one pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    /// Parts whose material was updated.
    pub applied: Vec<PartId>,
    /// Parts with no surface in this asset.
    pub missing: Vec<PartId>,
    /// Parts whose material has no tint capability. Only the outline applies.
    pub untintable: Vec<PartId>,
    /// References the caller has to start loading.
    pub texture_requests: Vec<TextureRef>,
}

#[derive(Clone)]
enum Visual {
    Color([f32; 3]),
    Texture(TextureMap),
    /// Texture not available (yet): keep what is shown.
    Keep([f32; 3]),
}

#[derive(Debug, Default)]
pub struct Reconciler {
    aux: HashMap<NodeId, NodeAux>,
    textures: TextureCache,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reconcile(&mut self, scene: &mut SceneGraph, state: &CustomizationState) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        for (part, record) in state.records() {
            let surfaces = resolve_surfaces(scene, part);
            if surfaces.is_empty() {
                report.missing.push(part);
                continue;
            }

            let visual = self.resolve_visual(record, &mut report);
            let wants_overlay = state.interaction_enabled() && state.selected() == Some(part);
            let mut touched = false;
            let mut tinted = false;
            for surface in surfaces {
                let Some(mut aux) = self.touch(scene, surface) else {
                    log::warn!("Part '{}' has a surface without a material; skipped", part);
                    continue;
                };
                touched = true;
                tinted |= scene
                    .material_mut(aux.clone)
                    .and_then(|material| material.as_tintable_mut())
                    .map(|tint| {
                        apply_visual(&mut *tint, visual.clone());
                        tint.flatten_shading();
                        tint.mark_dirty();
                    })
                    .is_some();
                sync_overlay(scene, surface, &mut aux, wants_overlay);
                self.aux.insert(surface, aux);
            }

            if !touched {
                report.missing.push(part);
            } else if tinted {
                report.applied.push(part);
            } else {
                report.untintable.push(part);
            }
        }

        let wanted: HashSet<TextureRef> = state.desired_textures().cloned().collect();
        let mapped = self.mapped_textures(scene);
        let released = self.textures.release_unused(scene, &wanted, &mapped);

        log::debug!(
            "Reconciled revision {}: {} applied, {} missing, {} requests, {} textures released",
            state.revision(),
            report.applied.len(),
            report.missing.len(),
            report.texture_requests.len(),
            released
        );
        report
    }

    /// Accepts a finished texture load. Returns true when a new pass is needed.
    ///
    /// Completions for references no part wants any more are dropped, so a
    /// slow load can never overwrite a newer assignment.
    pub fn texture_loaded(
        &mut self,
        scene: &mut SceneGraph,
        state: &CustomizationState,
        event: TextureEvent,
    ) -> bool {
        let TextureEvent { reference, result } = event;
        if !state.wants_texture(&reference) {
            log::debug!("Dropping stale texture {}", reference);
            return false;
        }
        match result {
            Ok(image) => {
                log::debug!("Texture {} ready ({}x{})", reference, image.width, image.height);
                self.textures.store(scene, reference, image);
                true
            }
            Err(err) => {
                log::warn!("Texture {} failed to load: {}", reference, err);
                self.textures.fail(scene, reference, err.to_string());
                false
            }
        }
    }

    /// Releases every clone, overlay and texture and puts the original
    /// materials back, leaving the scene exactly as it was loaded.
    pub fn teardown(&mut self, scene: &mut SceneGraph) {
        let touched = self.aux.len();
        for (node, aux) in self.aux.drain() {
            if let Some(overlay) = aux.overlay {
                scene.dispose_overlay(overlay);
            }
            scene.set_surface_material(node, aux.original);
            scene.dispose_material(aux.clone);
        }
        self.textures.clear(scene);
        log::debug!("Reconciler torn down: {} surfaces restored", touched);
    }

    /// Forgets a failed load so the next pass requests `reference` again.
    /// Returns true if there was a failure to forget.
    pub fn retry_failed(&mut self, reference: &TextureRef) -> bool {
        self.textures.forget_failed(reference)
    }

    pub fn overlay_count(&self) -> usize {
        self.aux.values().filter(|aux| aux.overlay.is_some()).count()
    }

    pub fn overlay_for(&self, surface: NodeId) -> Option<NodeId> {
        self.aux.get(&surface)?.overlay
    }

    /// Clone material assigned to `surface`, if the surface was touched.
    pub fn clone_for(&self, surface: NodeId) -> Option<MaterialId> {
        self.aux.get(&surface).map(|aux| aux.clone)
    }

    pub fn touched_surfaces(&self) -> usize {
        self.aux.len()
    }

    pub fn texture_slot(&self, reference: &TextureRef) -> Option<&TextureSlot> {
        self.textures.slot(reference)
    }

    /// Side-table entry for `surface`, cloning its material on first touch.
    fn touch(&mut self, scene: &mut SceneGraph, surface: NodeId) -> Option<NodeAux> {
        if let Some(aux) = self.aux.get(&surface) {
            return Some(*aux);
        }
        let original = scene.surface(surface)?.material;
        let clone = scene.clone_material(original)?;
        scene.set_surface_material(surface, clone);
        log::debug!(
            "Isolated material '{}' for surface '{}'",
            scene.material(original).map(|m| m.name()).unwrap_or_default(),
            scene.node(surface).map(|n| n.name.as_str()).unwrap_or_default()
        );
        Some(NodeAux {
            original,
            clone,
            overlay: None,
        })
    }

    fn resolve_visual(&mut self, record: &PartRecord, report: &mut ReconcileReport) -> Visual {
        let color = record.color.to_rgb_f32();
        let Some(reference) = &record.texture else {
            return Visual::Color(color);
        };
        match self.textures.slot(reference) {
            Some(TextureSlot::Ready(image)) => {
                let repeat = Vec2::splat(UV_TILING_FACTOR * record.uv.scale);
                let offset = Vec2::new(record.uv.offset_x, record.uv.offset_y);
                Visual::Texture(
                    TextureMap::tiled(image.clone(), reference.clone()).with_mapping(repeat, offset),
                )
            }
            Some(TextureSlot::Pending) | Some(TextureSlot::Failed(_)) => Visual::Keep(color),
            None => {
                self.textures.mark_pending(reference.clone());
                if !report.texture_requests.contains(reference) {
                    report.texture_requests.push(reference.clone());
                }
                Visual::Keep(color)
            }
        }
    }

    fn mapped_textures(&self, scene: &SceneGraph) -> HashSet<TextureRef> {
        self.aux
            .values()
            .filter_map(|aux| scene.material(aux.clone)?.as_tintable()?.map()?.source.clone())
            .collect()
    }
}

/// Every surface under the part's node, depth-first. Subtrees named after
/// another part belong to that part.
fn resolve_surfaces(scene: &SceneGraph, part: PartId) -> Vec<NodeId> {
    let name = part.as_str();
    let Some(root) = scene.find_indexed(name).or_else(|| scene.find_by_name(name)) else {
        return Vec::new();
    };
    let mut surfaces = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let Some(node) = scene.node(id) else {
            continue;
        };
        if id != root && PartId::from_name(&node.name).is_some_and(|other| other != part) {
            continue;
        }
        if node.surface().is_some() {
            surfaces.push(id);
        }
        stack.extend(node.children().iter().rev().copied());
    }
    surfaces
}

fn apply_visual(tint: &mut dyn Tintable, visual: Visual) {
    match visual {
        Visual::Color(color) => {
            tint.set_map(None);
            tint.set_color(color);
        }
        Visual::Texture(map) => {
            tint.set_map(Some(map));
            tint.set_color(ColorValue::WHITE.to_rgb_f32());
        }
        Visual::Keep(color) => {
            if tint.map().is_none() {
                tint.set_color(color);
            }
        }
    }
}

fn sync_overlay(scene: &mut SceneGraph, surface: NodeId, aux: &mut NodeAux, wanted: bool) {
    match (wanted, aux.overlay) {
        (true, None) => {
            let Some(geometry) = scene.surface(surface).map(|s| s.geometry.clone()) else {
                return;
            };
            let overlay = EdgeOverlay::from_geometry(&geometry, EDGE_THRESHOLD_DEG);
            aux.overlay = scene.attach_overlay(surface, overlay);
        }
        (false, Some(overlay)) => {
            scene.dispose_overlay(overlay);
            aux.overlay = None;
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::source::ImageLoadError;
    use crate::render::{
        Geometry, Material, NodeKind, ShaderMaterial, StandardMaterial, Surface, TextureImage,
        Wrap,
    };
    use crate::scene::UvTransform;
    use glam::{Mat4, Vec3};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::sync::Arc;

    struct Fixture {
        scene: SceneGraph,
        shared: MaterialId,
        midsole: NodeId,
        laces: NodeId,
        logo: NodeId,
    }

    /// `midsole` and `laces` share one material; `logo` sits under a group
    /// node and uses a shader material; there is no `heel`, `tongue`, ...
    fn fixture() -> Fixture {
        let mut scene = SceneGraph::new();
        let mut leather = StandardMaterial::new("leather");
        let baked = Arc::new(TextureImage::solid(2, 2, [90, 90, 90, 255]));
        leather.normal_map = Some(TextureMap::baked(baked.clone()));
        leather.ao_map = Some(TextureMap::baked(baked));
        leather.metalness = 0.4;
        leather.roughness = 0.3;
        let shared = scene.add_material(Material::Standard(leather));
        let glow = scene.add_material(Material::Shader(ShaderMaterial {
            name: "glow".to_string(),
            program: "emissive".to_string(),
            version: 0,
        }));

        let geometry = Arc::new(Geometry::cuboid(Vec3::ONE));
        let root = scene.add_node(None, "shoe", NodeKind::Group, Mat4::IDENTITY);
        let midsole = scene.add_node(
            Some(root),
            "midsole",
            NodeKind::Surface(Surface {
                geometry: geometry.clone(),
                material: shared,
            }),
            Mat4::IDENTITY,
        );
        let laces = scene.add_node(
            Some(root),
            "laces",
            NodeKind::Surface(Surface {
                geometry: geometry.clone(),
                material: shared,
            }),
            Mat4::IDENTITY,
        );
        let logo_group = scene.add_node(Some(root), "logo", NodeKind::Group, Mat4::IDENTITY);
        let logo = scene.add_node(
            Some(logo_group),
            "logo_mesh",
            NodeKind::Surface(Surface {
                geometry,
                material: glow,
            }),
            Mat4::IDENTITY,
        );
        scene.index_name("midsole", midsole);
        Fixture {
            scene,
            shared,
            midsole,
            laces,
            logo,
        }
    }

    fn standard(scene: &SceneGraph, surface: NodeId) -> StandardMaterial {
        let id = scene.surface(surface).unwrap().material;
        scene.material(id).and_then(Material::as_standard).unwrap().clone()
    }

    fn loaded(reference: &TextureRef) -> TextureEvent {
        TextureEvent {
            reference: reference.clone(),
            result: Ok(TextureImage::solid(4, 4, [200, 10, 10, 255])),
        }
    }

    #[test]
    fn missing_parts_are_tolerated() {
        let mut f = fixture();
        let mut state = CustomizationState::new();
        state.set_color(PartId::Heel, ColorValue::rgb(1, 2, 3));
        state.set_color(PartId::Midsole, ColorValue::rgb(255, 0, 0));

        let report = Reconciler::new().reconcile(&mut f.scene, &state);
        assert_eq!(
            report.missing,
            vec![PartId::Upper, PartId::Outsole, PartId::Tongue, PartId::Heel, PartId::Lining]
        );
        assert_eq!(report.applied, vec![PartId::Midsole, PartId::Laces]);
        assert_eq!(report.untintable, vec![PartId::Logo]);
        assert_eq!(standard(&f.scene, f.midsole).color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn shared_materials_are_isolated_and_never_recloned() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        state.set_color(PartId::Midsole, ColorValue::rgb(255, 0, 0));

        reconciler.reconcile(&mut f.scene, &state);
        let first = f.scene.ledger();
        let midsole_clone = reconciler.clone_for(f.midsole).unwrap();
        assert_ne!(midsole_clone, f.shared);
        assert_ne!(Some(midsole_clone), reconciler.clone_for(f.laces));
        assert_eq!(standard(&f.scene, f.laces).color, [1.0, 1.0, 1.0]);

        let original = f.scene.material(f.shared).and_then(Material::as_standard).unwrap();
        assert_eq!(original.color, [1.0, 1.0, 1.0]);
        assert!(original.has_secondary_maps());

        reconciler.reconcile(&mut f.scene, &state);
        assert_eq!(f.scene.ledger(), first);
        assert_eq!(first.materials, 3);
        assert_eq!(reconciler.clone_for(f.midsole), Some(midsole_clone));
    }

    #[test]
    fn shading_is_normalized_every_pass() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let state = CustomizationState::new();
        reconciler.reconcile(&mut f.scene, &state);

        let material = standard(&f.scene, f.midsole);
        assert!(!material.has_secondary_maps());
        assert_eq!((material.roughness, material.metalness), (1.0, 0.0));

        let clone = reconciler.clone_for(f.midsole).unwrap();
        if let Some(Material::Standard(m)) = f.scene.material_mut(clone) {
            m.bump_map = Some(TextureMap::baked(Arc::new(TextureImage::solid(1, 1, [0; 4]))));
            m.metalness = 1.0;
        }
        let version = material.version;
        reconciler.reconcile(&mut f.scene, &state);
        let material = standard(&f.scene, f.midsole);
        assert!(!material.has_secondary_maps());
        assert_eq!(material.metalness, 0.0);
        assert!(material.version > version);
    }

    #[test]
    fn texture_then_color_clears_the_map() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        let reference = TextureRef::new("https://example.com/canvas.png");
        state.set_texture(PartId::Midsole, Some(reference.clone()));

        let report = reconciler.reconcile(&mut f.scene, &state);
        assert_eq!(report.texture_requests, vec![reference.clone()]);
        assert!(reconciler.texture_loaded(&mut f.scene, &state, loaded(&reference)));
        reconciler.reconcile(&mut f.scene, &state);
        assert!(standard(&f.scene, f.midsole).map.is_some());

        state.set_color(PartId::Midsole, ColorValue::rgb(0, 0, 255));
        reconciler.reconcile(&mut f.scene, &state);
        let material = standard(&f.scene, f.midsole);
        assert!(material.map.is_none());
        assert_eq!(material.color, [0.0, 0.0, 1.0]);
        assert_eq!(f.scene.ledger().textures, 0);
    }

    #[test]
    fn uv_transform_doubles_scale_into_repeat() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        let reference = TextureRef::new("blob:sha256-01");
        state.set_uv_transform(PartId::Laces, UvTransform::new(0.25, -0.1, 2.0));
        state.set_texture(PartId::Laces, Some(reference.clone()));
        reconciler.reconcile(&mut f.scene, &state);
        reconciler.texture_loaded(&mut f.scene, &state, loaded(&reference));
        reconciler.reconcile(&mut f.scene, &state);

        let material = standard(&f.scene, f.laces);
        let map = material.map.unwrap();
        assert_eq!(map.repeat, Vec2::new(4.0, 4.0));
        assert_eq!(map.offset, Vec2::new(0.25, -0.1));
        assert_eq!((map.wrap_s, map.wrap_t), (Wrap::Repeat, Wrap::Repeat));
        assert!(map.generate_mipmaps);
        assert_eq!(material.color, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn pending_and_failed_textures_keep_the_previous_visual() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        state.set_color(PartId::Midsole, ColorValue::rgb(255, 0, 0));
        reconciler.reconcile(&mut f.scene, &state);

        let reference = TextureRef::new("https://example.com/missing.png");
        state.set_texture(PartId::Midsole, Some(reference.clone()));
        let report = reconciler.reconcile(&mut f.scene, &state);
        assert_eq!(report.texture_requests.len(), 1);
        assert_eq!(standard(&f.scene, f.midsole).color, [1.0, 0.0, 0.0]);

        let failure = TextureEvent {
            reference: reference.clone(),
            result: Err(ImageLoadError::MalformedDataUrl),
        };
        assert!(!reconciler.texture_loaded(&mut f.scene, &state, failure));
        let report = reconciler.reconcile(&mut f.scene, &state);
        assert!(report.texture_requests.is_empty());
        assert!(matches!(reconciler.texture_slot(&reference), Some(TextureSlot::Failed(_))));
        let material = standard(&f.scene, f.midsole);
        assert!(material.map.is_none());
        assert_eq!(material.color, [1.0, 0.0, 0.0]);
    }

    #[test]
    fn stale_texture_completions_are_dropped() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        let old = TextureRef::new("old.png");
        let new = TextureRef::new("new.png");
        state.set_texture(PartId::Midsole, Some(old.clone()));
        reconciler.reconcile(&mut f.scene, &state);
        state.set_texture(PartId::Midsole, Some(new.clone()));
        reconciler.reconcile(&mut f.scene, &state);

        assert!(reconciler.texture_loaded(&mut f.scene, &state, loaded(&new)));
        assert!(!reconciler.texture_loaded(&mut f.scene, &state, loaded(&old)));
        reconciler.reconcile(&mut f.scene, &state);

        let map = standard(&f.scene, f.midsole).map.unwrap();
        assert_eq!(map.source, Some(new));
        assert_eq!(f.scene.ledger().textures, 1);
        assert!(reconciler.texture_slot(&old).is_none());
    }

    #[test]
    fn selection_outline_follows_state() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();

        state.select_part(Some(PartId::Midsole));
        reconciler.reconcile(&mut f.scene, &state);
        let overlay = reconciler.overlay_for(f.midsole).unwrap();
        let node = f.scene.node(overlay).unwrap();
        assert_eq!(node.parent(), Some(f.midsole));
        let outline = node.overlay().unwrap();
        assert!(!outline.depth_test);
        assert_eq!(outline.segments.len(), 12);

        reconciler.reconcile(&mut f.scene, &state);
        assert_eq!(reconciler.overlay_for(f.midsole), Some(overlay));
        assert_eq!(f.scene.ledger().overlays, 1);

        state.select_part(Some(PartId::Laces));
        reconciler.reconcile(&mut f.scene, &state);
        assert_eq!(reconciler.overlay_for(f.midsole), None);
        assert!(reconciler.overlay_for(f.laces).is_some());
        assert_eq!(f.scene.ledger().overlays, 1);

        state.set_interaction_enabled(false);
        reconciler.reconcile(&mut f.scene, &state);
        assert_eq!(reconciler.overlay_count(), 0);
        assert_eq!(f.scene.ledger().overlays, 0);
    }

    #[test]
    fn overlay_count_is_never_above_one() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        let script = [
            Some(PartId::Logo),
            Some(PartId::Midsole),
            None,
            Some(PartId::Heel),
            Some(PartId::Laces),
            Some(PartId::Laces),
            Some(PartId::Midsole),
        ];
        for (step, selection) in script.into_iter().enumerate() {
            if step == 4 {
                state.set_interaction_enabled(false);
            }
            if step == 5 {
                state.set_interaction_enabled(true);
            }
            state.select_part(selection);
            reconciler.reconcile(&mut f.scene, &state);
            assert!(reconciler.overlay_count() <= 1);
            assert_eq!(f.scene.overlay_nodes().len(), reconciler.overlay_count());
        }
        assert!(reconciler.overlay_for(f.midsole).is_some());
    }

    #[test]
    fn untintable_parts_still_get_the_outline() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        state.set_color(PartId::Logo, ColorValue::rgb(0, 255, 0));
        state.select_part(Some(PartId::Logo));
        let report = reconciler.reconcile(&mut f.scene, &state);
        assert_eq!(report.untintable, vec![PartId::Logo]);
        assert!(reconciler.overlay_for(f.logo).is_some());
    }

    #[test]
    fn teardown_restores_the_asset_and_releases_everything() {
        let mut f = fixture();
        let pristine = standard(&f.scene, f.midsole);
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        let reference = TextureRef::new("a.png");
        state.set_texture(PartId::Midsole, Some(reference.clone()));
        state.select_part(Some(PartId::Laces));
        reconciler.reconcile(&mut f.scene, &state);
        reconciler.texture_loaded(&mut f.scene, &state, loaded(&reference));
        reconciler.reconcile(&mut f.scene, &state);
        assert!(!f.scene.ledger().is_empty());

        reconciler.teardown(&mut f.scene);
        assert!(f.scene.ledger().is_empty());
        assert_eq!(f.scene.surface(f.midsole).unwrap().material, f.shared);
        assert_eq!(f.scene.surface(f.laces).unwrap().material, f.shared);
        assert_eq!(standard(&f.scene, f.midsole), pristine);
        assert!(f.scene.overlay_nodes().is_empty());
        assert_eq!(reconciler.touched_surfaces(), 0);
    }

    #[test]
    fn every_surface_of_a_part_is_customized() {
        let mut scene = SceneGraph::new();
        let canvas = scene.add_material(Material::Standard(StandardMaterial::new("canvas")));
        let geometry = Arc::new(Geometry::cuboid(Vec3::ONE));
        let surface = |material| {
            NodeKind::Surface(Surface {
                geometry: geometry.clone(),
                material,
            })
        };
        let upper = scene.add_node(None, "upper", NodeKind::Group, Mat4::IDENTITY);
        let front = scene.add_node(Some(upper), "upper_0", surface(canvas), Mat4::IDENTITY);
        let back = scene.add_node(Some(upper), "upper_1", surface(canvas), Mat4::IDENTITY);
        let tongue = scene.add_node(Some(upper), "tongue", surface(canvas), Mat4::IDENTITY);

        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        state.set_color(PartId::Upper, ColorValue::rgb(255, 0, 0));
        state.select_part(Some(PartId::Upper));
        let report = reconciler.reconcile(&mut scene, &state);

        assert!(report.applied.contains(&PartId::Upper));
        for node in [front, back] {
            assert_eq!(standard(&scene, node).color, [1.0, 0.0, 0.0]);
            assert!(reconciler.overlay_for(node).is_some());
        }
        assert_ne!(reconciler.clone_for(front), reconciler.clone_for(back));
        assert_eq!(standard(&scene, tongue).color, [1.0, 1.0, 1.0]);
        assert_eq!(reconciler.overlay_for(tongue), None);
        assert_eq!(scene.ledger().overlays, 2);

        state.select_part(Some(PartId::Tongue));
        reconciler.reconcile(&mut scene, &state);
        assert_eq!(reconciler.overlay_for(front), None);
        assert_eq!(reconciler.overlay_for(back), None);
        assert!(reconciler.overlay_for(tongue).is_some());
        assert_eq!(scene.ledger().overlays, 1);
    }

    #[test]
    fn failed_texture_is_requested_again_on_retry() {
        let mut f = fixture();
        let mut reconciler = Reconciler::new();
        let mut state = CustomizationState::new();
        let reference = TextureRef::new("https://example.com/flaky.png");
        state.set_texture(PartId::Laces, Some(reference.clone()));
        reconciler.reconcile(&mut f.scene, &state);
        let failure = TextureEvent {
            reference: reference.clone(),
            result: Err(ImageLoadError::MalformedDataUrl),
        };
        reconciler.texture_loaded(&mut f.scene, &state, failure);
        assert!(reconciler.reconcile(&mut f.scene, &state).texture_requests.is_empty());

        assert!(reconciler.retry_failed(&reference));
        assert!(!reconciler.retry_failed(&reference));
        let report = reconciler.reconcile(&mut f.scene, &state);
        assert_eq!(report.texture_requests, vec![reference.clone()]);
        assert!(matches!(reconciler.texture_slot(&reference), Some(TextureSlot::Pending)));

        assert!(reconciler.texture_loaded(&mut f.scene, &state, loaded(&reference)));
        reconciler.reconcile(&mut f.scene, &state);
        assert!(standard(&f.scene, f.laces).map.is_some());
    }

    #[derive(Debug, Clone)]
    enum Edit {
        Select(Option<PartId>),
        Interaction(bool),
        Color(PartId, u8),
        Texture(PartId, Option<u8>),
    }

    fn part() -> impl Strategy<Value = PartId> {
        prop::sample::select(PartId::ALL.to_vec())
    }

    fn edit() -> impl Strategy<Value = Edit> {
        prop_oneof![
            prop::option::of(part()).prop_map(Edit::Select),
            any::<bool>().prop_map(Edit::Interaction),
            (part(), any::<u8>()).prop_map(|(part, level)| Edit::Color(part, level)),
            (part(), prop::option::of(0u8..3)).prop_map(|(part, n)| Edit::Texture(part, n)),
        ]
    }

    proptest! {
        /// Whatever the edit sequence, only the selected part is outlined
        /// and the scene holds exactly the overlays the reconciler tracks.
        #[test]
        fn outline_count_stays_at_most_one(edits in prop::collection::vec(edit(), 1..40)) {
            let mut f = fixture();
            let mut reconciler = Reconciler::new();
            let mut state = CustomizationState::new();
            for edit in edits {
                match edit {
                    Edit::Select(part) => {
                        state.select_part(part);
                    }
                    Edit::Interaction(enabled) => {
                        state.set_interaction_enabled(enabled);
                    }
                    Edit::Color(part, level) => {
                        state.set_color(part, ColorValue::rgb(level, 0, 255 - level));
                    }
                    Edit::Texture(part, n) => {
                        state.set_texture(part, n.map(|n| TextureRef::new(format!("tex-{n}.png"))));
                    }
                }
                reconciler.reconcile(&mut f.scene, &state);

                let outlined = state.interaction_enabled()
                    && matches!(
                        state.selected(),
                        Some(PartId::Midsole | PartId::Laces | PartId::Logo)
                    );
                prop_assert!(reconciler.overlay_count() <= 1);
                prop_assert_eq!(reconciler.overlay_count(), usize::from(outlined));
                prop_assert_eq!(f.scene.overlay_nodes().len(), reconciler.overlay_count());
                prop_assert_eq!(f.scene.ledger().overlays, reconciler.overlay_count());
            }

            reconciler.teardown(&mut f.scene);
            prop_assert!(f.scene.ledger().is_empty());
        }
    }
}
