//! CPU ray picking against scene surfaces.
//!
//! A pointer position is turned into a world-space [`Ray`] by the camera,
//! then tested against every surface: a slab test on the world bounds first,
//! then Möller–Trumbore on each triangle. Overlay nodes are never pickable.

use crate::render::geometry::Aabb;
use crate::render::scene_graph::{NodeId, SceneGraph};
use glam::Vec3;

// ========================================================================
// Ray
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

// ========================================================================
// PickHit
// ========================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickHit {
    pub node: NodeId,
    pub distance: f32,
    pub point: Vec3,
}

// ========================================================================
// intersection tests
// ========================================================================

/// Slab test. Distance to the nearest entry point, or to the exit point when
/// the origin is inside the box.
pub fn ray_aabb(ray: &Ray, aabb: &Aabb) -> Option<f32> {
    let inv = ray.direction.recip();
    let t1 = (aabb.min - ray.origin) * inv;
    let t2 = (aabb.max - ray.origin) * inv;
    let tmin = t1.min(t2).max_element();
    let tmax = t1.max(t2).min_element();

    if tmax.is_nan() || tmin.is_nan() || tmax < 0.0 || tmin > tmax {
        return None;
    }
    Some(if tmin < 0.0 { tmax } else { tmin })
}

/// Möller–Trumbore. Hits behind the origin and edge-on triangles miss.
pub fn ray_triangle_intersect(ray: &Ray, v0: Vec3, v1: Vec3, v2: Vec3) -> Option<f32> {
    const EPSILON: f32 = 1e-7;

    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(edge2);
    let a = edge1.dot(h);
    if a.abs() < EPSILON {
        return None;
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(edge1);
    let v = f * ray.direction.dot(q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(q);
    (t > EPSILON).then_some(t)
}

// ========================================================================
// scene pick
// ========================================================================

/// Nearest surface hit along `ray`, in world space.
pub fn pick(scene: &SceneGraph, ray: &Ray) -> Option<PickHit> {
    if ray.direction == Vec3::ZERO {
        return None;
    }
    let mut best: Option<PickHit> = None;

    for (node, surface) in scene.surfaces() {
        let world = scene.world_transform(node);
        let Some(bounds) = surface.geometry.bounds() else {
            continue;
        };
        let Some(entry) = ray_aabb(ray, &bounds.transformed(&world)) else {
            continue;
        };
        if best.is_some_and(|hit| entry > hit.distance) {
            continue;
        }

        for [a, b, c] in surface.geometry.triangles() {
            let (a, b, c) = (
                world.transform_point3(a),
                world.transform_point3(b),
                world.transform_point3(c),
            );
            let Some(distance) = ray_triangle_intersect(ray, a, b, c) else {
                continue;
            };
            if best.map_or(true, |hit| distance < hit.distance) {
                best = Some(PickHit {
                    node,
                    distance,
                    point: ray.at(distance),
                });
            }
        }
    }

    best
}
