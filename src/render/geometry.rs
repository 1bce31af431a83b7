//! CPU-side triangle geometry shared by surfaces, overlays and picking.

use glam::{Mat4, Vec2, Vec3};

/// Indexed triangle list. `normals` and `uvs` are either empty or one per position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
}

impl Geometry {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            normals: Vec::new(),
            uvs: Vec::new(),
            indices,
        }
    }

    /// Non-indexed triangle soup gets a trivial index buffer.
    pub fn from_triangle_soup(positions: Vec<Vec3>) -> Self {
        let indices = (0..positions.len() as u32).collect();
        Self::new(positions, indices)
    }

    pub fn is_valid(&self) -> bool {
        !self.positions.is_empty() && self.indices.len() >= 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangles referencing out-of-range vertices are skipped.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.indices.chunks_exact(3).filter_map(move |tri| {
            let a = *self.positions.get(tri[0] as usize)?;
            let b = *self.positions.get(tri[1] as usize)?;
            let c = *self.positions.get(tri[2] as usize)?;
            Some([a, b, c])
        })
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.positions.iter().copied())
    }

    /// Axis-aligned box centered on the origin, flat shaded (24 vertices).
    pub fn cuboid(size: Vec3) -> Self {
        let h = size * 0.5;
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::X, Vec3::Z, Vec3::Y),
            (Vec3::NEG_X, Vec3::NEG_Z, Vec3::Y),
            (Vec3::Y, Vec3::X, Vec3::Z),
            (Vec3::NEG_Y, Vec3::X, Vec3::NEG_Z),
            (Vec3::Z, Vec3::X, Vec3::Y),
            (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        ];
        let mut geometry = Geometry::default();
        for (normal, u, v) in faces {
            let base = geometry.positions.len() as u32;
            let center = normal * h;
            let du = u * h;
            let dv = v * h;
            for (corner, uv) in [
                (center - du - dv, Vec2::new(0.0, 0.0)),
                (center + du - dv, Vec2::new(1.0, 0.0)),
                (center + du + dv, Vec2::new(1.0, 1.0)),
                (center - du + dv, Vec2::new(0.0, 1.0)),
            ] {
                geometry.positions.push(corner);
                geometry.normals.push(normal);
                geometry.uvs.push(uv);
            }
            geometry
                .indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        geometry
    }

    /// Flat quad in the XY plane facing +Z.
    pub fn quad(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self {
            positions: vec![
                Vec3::new(-hw, -hh, 0.0),
                Vec3::new(hw, -hh, 0.0),
                Vec3::new(hw, hh, 0.0),
                Vec3::new(-hw, hh, 0.0),
            ],
            normals: vec![Vec3::Z; 4],
            uvs: vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Bounds of the eight transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> Aabb {
        let corners = (0..8).map(|i| {
            let pick = |bit: u32, lo: f32, hi: f32| if i & bit == 0 { lo } else { hi };
            matrix.transform_point3(Vec3::new(
                pick(1, self.min.x, self.max.x),
                pick(2, self.min.y, self.max.y),
                pick(4, self.min.z, self.max.z),
            ))
        });
        // eight corners, never empty
        Aabb::from_points(corners).unwrap_or(*self)
    }
}
