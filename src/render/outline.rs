//! Selection outline: feature-edge line overlay drawn over the selected surface.

use crate::render::geometry::Geometry;
use glam::Vec3;
use std::collections::HashMap;

/// Edges whose adjacent faces meet at more than this angle are drawn.
pub const EDGE_THRESHOLD_DEG: f32 = 15.0;
/// Draw order for overlays; higher draws later.
pub const OVERLAY_RENDER_ORDER: i32 = 999;
pub const OVERLAY_COLOR: [f32; 3] = [1.0, 0.78, 0.0];

/// Line-segment overlay. Rendered without depth testing, after everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeOverlay {
    pub segments: Vec<[Vec3; 2]>,
    pub color: [f32; 3],
    pub depth_test: bool,
    pub depth_write: bool,
    pub render_order: i32,
}

impl EdgeOverlay {
    pub fn from_geometry(geometry: &Geometry, threshold_deg: f32) -> Self {
        Self {
            segments: feature_edges(geometry, threshold_deg),
            color: OVERLAY_COLOR,
            depth_test: false,
            depth_write: false,
            render_order: OVERLAY_RENDER_ORDER,
        }
    }
}

type QuantizedPos = (i64, i64, i64);

fn quantize(pos: Vec3) -> QuantizedPos {
    let scale = 10_000.0;
    (
        (pos.x * scale).round() as i64,
        (pos.y * scale).round() as i64,
        (pos.z * scale).round() as i64,
    )
}

fn edge_key(a: QuantizedPos, b: QuantizedPos) -> (QuantizedPos, QuantizedPos) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

struct OpenEdge {
    start: Vec3,
    end: Vec3,
    normal: Vec3,
}

/// Sharp and boundary edges of a triangle mesh.
///
/// Vertices are welded by quantized position, so split normals/UVs along a
/// seam do not produce spurious edges. An edge shared by two faces is kept
/// when the faces' normals differ by more than `threshold_deg`; an edge with a
/// single face is a boundary and always kept. Degenerate triangles are ignored.
pub fn feature_edges(geometry: &Geometry, threshold_deg: f32) -> Vec<[Vec3; 2]> {
    let threshold_dot = threshold_deg.to_radians().cos();
    let mut open: HashMap<(QuantizedPos, QuantizedPos), OpenEdge> = HashMap::new();
    let mut segments = Vec::new();

    for [a, b, c] in geometry.triangles() {
        let normal = (b - a).cross(c - a);
        if normal.length_squared() <= f32::EPSILON * f32::EPSILON {
            continue;
        }
        let normal = normal.normalize();
        let keys = [quantize(a), quantize(b), quantize(c)];
        if keys[0] == keys[1] || keys[1] == keys[2] || keys[0] == keys[2] {
            continue;
        }
        let corners = [a, b, c];
        for i in 0..3 {
            let j = (i + 1) % 3;
            let key = edge_key(keys[i], keys[j]);
            if let Some(other) = open.remove(&key) {
                if normal.dot(other.normal) <= threshold_dot {
                    segments.push([other.start, other.end]);
                }
                continue;
            }
            open.insert(
                key,
                OpenEdge {
                    start: corners[i],
                    end: corners[j],
                    normal,
                },
            );
        }
    }

    let mut boundary: Vec<_> = open.into_iter().collect();
    // HashMap order is random; keep output deterministic
    boundary.sort_by(|(ka, _), (kb, _)| ka.cmp(kb));
    segments.extend(boundary.into_iter().map(|(_, edge)| [edge.start, edge.end]));
    segments
}
