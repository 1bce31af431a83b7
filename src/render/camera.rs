use crate::render::geometry::Aabb;
use crate::render::pick::Ray;
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Pitch stays short of the poles so the view basis never degenerates.
const PITCH_LIMIT: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

/// Orbit limits and feel, usually taken from the viewer config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitSettings {
    pub min_distance: f32,
    pub max_distance: f32,
    /// Fraction of angular velocity lost per second, in `[0, 1)`.
    pub damping: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            min_distance: 0.5,
            max_distance: 20.0,
            damping: 0.9,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
        }
    }
}

/// Camera orbiting a target point. Drag rotates, wheel zooms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_y: f32,
    pub settings: OrbitSettings,
    velocity: Vec2,
}

impl OrbitCamera {
    pub fn new(target: Vec3, distance: f32, settings: OrbitSettings) -> Self {
        let mut camera = Self {
            target,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: 0.3,
            distance,
            fov_y: 45f32.to_radians(),
            settings,
            velocity: Vec2::ZERO,
        };
        camera.distance = camera.clamp_distance(distance);
        camera
    }

    /// Frames the given bounds from a three-quarter view.
    pub fn from_bounds(bounds: &Aabb, settings: OrbitSettings) -> Self {
        let radius = bounds.extent().max_element();
        let distance = if radius > 0.0 { radius * 3.0 } else { 3.0 };
        let settings = OrbitSettings {
            max_distance: settings.max_distance.max(distance),
            ..settings
        };
        Self::new(bounds.center(), distance, settings)
    }

    /// Applies a drag delta in pixels and keeps the residual as momentum.
    pub fn rotate(&mut self, delta: Vec2) {
        let step = delta * self.settings.rotate_speed;
        self.apply_rotation(step);
        self.velocity = step;
    }

    /// Positive `steps` zoom in.
    pub fn zoom(&mut self, steps: f32) {
        if !steps.is_finite() {
            return;
        }
        let factor = (1.0 - self.settings.zoom_speed).powf(steps);
        self.distance = self.clamp_distance(self.distance * factor);
    }

    /// Advances damped momentum. Returns true while the camera is still moving.
    pub fn update(&mut self, dt: f32) -> bool {
        if self.velocity == Vec2::ZERO {
            return false;
        }
        let keep = (1.0 - self.settings.damping.clamp(0.0, 0.999)).powf(dt.max(0.0));
        self.velocity *= keep;
        if self.velocity.length_squared() < 1e-10 {
            self.velocity = Vec2::ZERO;
            return false;
        }
        self.apply_rotation(self.velocity);
        true
    }

    /// True while rotation momentum is still decaying.
    pub fn is_moving(&self) -> bool {
        self.velocity != Vec2::ZERO
    }

    pub fn forward(&self) -> Vec3 {
        let cos_pitch = self.pitch.cos();
        Vec3::new(
            self.yaw.cos() * cos_pitch,
            self.pitch.sin(),
            self.yaw.sin() * cos_pitch,
        )
        .normalize()
    }

    pub fn position(&self) -> Vec3 {
        self.target - self.forward() * self.distance
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection(&self, viewport: Viewport) -> Mat4 {
        let near = (self.distance * 0.01).max(0.001);
        Mat4::perspective_rh(self.fov_y, viewport.aspect(), near, self.distance * 10.0 + 100.0)
    }

    /// World-space ray through a pixel (top-left origin).
    pub fn ray_from_screen(&self, x: f32, y: f32, viewport: Viewport) -> Ray {
        let ndc_x = (x / viewport.width as f32) * 2.0 - 1.0;
        let ndc_y = 1.0 - (y / viewport.height as f32) * 2.0;
        let inverse = (self.projection(viewport) * self.view()).inverse();

        let unproject = |z: f32| {
            let p = inverse * Vec4::new(ndc_x, ndc_y, z, 1.0);
            p.truncate() / p.w
        };
        let near = unproject(-1.0);
        let far = unproject(1.0);
        Ray::new(near, far - near)
    }

    fn apply_rotation(&mut self, step: Vec2) {
        self.yaw = wrap_angle(self.yaw + step.x);
        self.pitch = (self.pitch + step.y).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    fn clamp_distance(&self, distance: f32) -> f32 {
        let min = self.settings.min_distance.max(0.01);
        let max = self.settings.max_distance.max(min);
        if distance.is_finite() {
            distance.clamp(min, max)
        } else {
            max
        }
    }
}

fn wrap_angle(angle: f32) -> f32 {
    const TWO_PI: f32 = std::f32::consts::PI * 2.0;
    if !angle.is_finite() {
        return 0.0;
    }
    (angle + std::f32::consts::PI).rem_euclid(TWO_PI) - std::f32::consts::PI
}
