use crate::render::{pick, NodeId, OrbitCamera, SceneGraph, Viewport};
use crate::scene::{CustomizationState, PartId};
use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
}

/// Pointer input in viewport pixels (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { x: f32, y: f32, button: PointerButton },
    Drag { dx: f32, dy: f32 },
    /// Positive `delta` zooms in.
    Wheel { delta: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Interactive,
    NonInteractive,
}

impl InputMode {
    pub fn of(state: &CustomizationState) -> Self {
        if state.interaction_enabled() {
            InputMode::Interactive
        } else {
            InputMode::NonInteractive
        }
    }
}

/// What a pointer event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    None,
    Selected(PartId),
    Deselected,
    CameraMoved,
}

/// Routes pointer events to part selection and the orbit camera.
///
/// The router holds no mode of its own; it reads the interaction flag from
/// the customization state on every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputRouter;

impl InputRouter {
    pub fn new() -> Self {
        Self
    }

    pub fn mode(&self, state: &CustomizationState) -> InputMode {
        InputMode::of(state)
    }

    /// Switches mode. Leaving interactive mode clears the selection.
    /// Returns true if the state changed.
    pub fn set_mode(&self, mode: InputMode, state: &mut CustomizationState) -> bool {
        state.set_interaction_enabled(mode == InputMode::Interactive)
    }

    pub fn handle(
        &self,
        event: PointerEvent,
        scene: &SceneGraph,
        camera: &mut OrbitCamera,
        viewport: Viewport,
        state: &mut CustomizationState,
    ) -> InputAction {
        match event {
            PointerEvent::Drag { dx, dy } => {
                camera.rotate(Vec2::new(dx, dy));
                InputAction::CameraMoved
            }
            PointerEvent::Wheel { delta } => {
                camera.zoom(delta);
                InputAction::CameraMoved
            }
            PointerEvent::Down { .. } if self.mode(state) == InputMode::NonInteractive => {
                InputAction::None
            }
            PointerEvent::Down {
                button: PointerButton::Secondary,
                ..
            } => InputAction::None,
            PointerEvent::Down { x, y, .. } => {
                let ray = camera.ray_from_screen(x, y, viewport);
                let part = pick::pick(scene, &ray).and_then(|hit| part_for_node(scene, hit.node));
                state.select_part(part);
                match part {
                    Some(part) => {
                        log::debug!("Selected part '{}'", part);
                        InputAction::Selected(part)
                    }
                    None => InputAction::Deselected,
                }
            }
        }
    }
}

/// First node on the path from `node` up to the root whose name is a part.
pub fn part_for_node(scene: &SceneGraph, node: NodeId) -> Option<PartId> {
    let mut current = Some(node);
    while let Some(id) = current {
        let node = scene.node(id)?;
        if let Some(part) = PartId::from_name(&node.name) {
            return Some(part);
        }
        current = node.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{Geometry, Material, NodeKind, OrbitSettings, StandardMaterial, Surface};
    use glam::{Mat4, Vec3};
    use std::sync::Arc;

    const VIEWPORT: Viewport = Viewport {
        width: 200,
        height: 200,
    };

    /// A `heel` group with an unnamed mesh child at the origin, and a
    /// `wheel` mesh off to the side. The camera sits at z = -10 looking along +Z.
    fn setup() -> (SceneGraph, OrbitCamera) {
        let mut scene = SceneGraph::new();
        let material = scene.add_material(Material::Standard(StandardMaterial::new("m")));
        let geometry = Arc::new(Geometry::cuboid(Vec3::ONE));
        let heel = scene.add_node(None, "heel", NodeKind::Group, Mat4::IDENTITY);
        scene.add_node(
            Some(heel),
            "Mesh_042",
            NodeKind::Surface(Surface {
                geometry: geometry.clone(),
                material,
            }),
            Mat4::IDENTITY,
        );
        scene.add_node(
            None,
            "wheel",
            NodeKind::Surface(Surface { geometry, material }),
            Mat4::from_translation(Vec3::new(3.0, 0.0, 0.0)),
        );
        let mut camera = OrbitCamera::new(Vec3::ZERO, 10.0, OrbitSettings::default());
        camera.yaw = std::f32::consts::FRAC_PI_2;
        camera.pitch = 0.0;
        camera.fov_y = 60f32.to_radians();
        (scene, camera)
    }

    fn click(x: f32, y: f32) -> PointerEvent {
        PointerEvent::Down {
            x,
            y,
            button: PointerButton::Primary,
        }
    }

    #[test]
    fn hit_resolves_part_through_ancestors() {
        let (scene, mut camera) = setup();
        let mut state = CustomizationState::new();
        let router = InputRouter::new();
        let action = router.handle(click(104.0, 97.0), &scene, &mut camera, VIEWPORT, &mut state);
        assert_eq!(action, InputAction::Selected(PartId::Heel));
        assert_eq!(state.selected(), Some(PartId::Heel));
    }

    #[test]
    fn misses_and_unknown_names_deselect() {
        let (scene, mut camera) = setup();
        let mut state = CustomizationState::new();
        state.select_part(Some(PartId::Laces));
        let router = InputRouter::new();

        let action = router.handle(click(1.0, 1.0), &scene, &mut camera, VIEWPORT, &mut state);
        assert_eq!(action, InputAction::Deselected);
        assert_eq!(state.selected(), None);

        state.select_part(Some(PartId::Laces));
        let action = router.handle(click(48.0, 100.0), &scene, &mut camera, VIEWPORT, &mut state);
        assert_eq!(action, InputAction::Deselected);
        assert_eq!(state.selected(), None);

        let wheel = scene.find_by_name("wheel").unwrap();
        assert_eq!(part_for_node(&scene, wheel), None);
    }

    #[test]
    fn non_interactive_mode_ignores_clicks_but_moves_camera() {
        let (scene, mut camera) = setup();
        let mut state = CustomizationState::new();
        let router = InputRouter::new();
        router.handle(click(104.0, 97.0), &scene, &mut camera, VIEWPORT, &mut state);

        assert!(router.set_mode(InputMode::NonInteractive, &mut state));
        assert_eq!(state.selected(), None);
        assert!(!state.interaction_enabled());

        let action = router.handle(click(104.0, 97.0), &scene, &mut camera, VIEWPORT, &mut state);
        assert_eq!(action, InputAction::None);
        assert_eq!(state.selected(), None);

        let distance = camera.distance;
        let action = router.handle(
            PointerEvent::Wheel { delta: 1.0 },
            &scene,
            &mut camera,
            VIEWPORT,
            &mut state,
        );
        assert_eq!(action, InputAction::CameraMoved);
        assert!(camera.distance < distance);

        let yaw = camera.yaw;
        router.handle(
            PointerEvent::Drag { dx: 30.0, dy: 0.0 },
            &scene,
            &mut camera,
            VIEWPORT,
            &mut state,
        );
        assert_ne!(camera.yaw, yaw);
    }

    #[test]
    fn mode_follows_the_state_flag() {
        let (scene, mut camera) = setup();
        let mut state = CustomizationState::new();
        let router = InputRouter::new();
        assert_eq!(router.mode(&state), InputMode::Interactive);

        // flipped on the state directly, e.g. by a control action
        state.set_interaction_enabled(false);
        assert_eq!(router.mode(&state), InputMode::NonInteractive);
        let action = router.handle(click(104.0, 97.0), &scene, &mut camera, VIEWPORT, &mut state);
        assert_eq!(action, InputAction::None);
        assert_eq!(state.selected(), None);

        state.set_interaction_enabled(true);
        assert_eq!(router.mode(&state), InputMode::Interactive);
        let action = router.handle(click(104.0, 97.0), &scene, &mut camera, VIEWPORT, &mut state);
        assert_eq!(action, InputAction::Selected(PartId::Heel));
    }

    #[test]
    fn secondary_button_does_not_select() {
        let (scene, mut camera) = setup();
        let mut state = CustomizationState::new();
        let router = InputRouter::new();
        let event = PointerEvent::Down {
            x: 100.0,
            y: 100.0,
            button: PointerButton::Secondary,
        };
        assert_eq!(
            router.handle(event, &scene, &mut camera, VIEWPORT, &mut state),
            InputAction::None
        );
        assert_eq!(state.selected(), None);
    }
}
