//! In-process rendering engine: scene graph, materials, geometry, selection
//! outlines, picking and the orbit camera.
//!
//! No rasterization happens here. The scene graph holds exactly what a GPU
//! backend would consume, and [`ResourceLedger`] counts runtime allocations
//! so that leaks are observable.

mod camera;
pub mod geometry;
pub mod material;
pub mod outline;
pub mod pick;
mod scene_graph;

pub use camera::{OrbitCamera, OrbitSettings, Viewport};
pub use geometry::{Aabb, Geometry};
pub use material::{
    Filter, Material, ShaderMaterial, StandardMaterial, TextureImage, TextureMap, Tintable,
    UnlitMaterial, Wrap,
};
pub use outline::{EdgeOverlay, EDGE_THRESHOLD_DEG, OVERLAY_RENDER_ORDER};
pub use pick::{PickHit, Ray};
pub use scene_graph::{
    MaterialId, NodeId, NodeKind, ResourceLedger, SceneGraph, SceneNode, Surface,
};

/// One line per frame-relevant fact, for `debug` logs and the HUD.
pub fn describe(scene: &SceneGraph) -> String {
    let ledger = scene.ledger();
    format!(
        "{} surfaces, {} materials, {} overlays, runtime: {} materials / {} overlays / {} textures",
        scene.surfaces().count(),
        scene.material_count(),
        scene.overlay_nodes().len(),
        ledger.materials,
        ledger.overlays,
        ledger.textures,
    )
}
