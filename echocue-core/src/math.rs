//! Math types for EchoCue

pub use glam::Vec3;

/// Up axis of the game world. Pan and facing are computed in the plane
/// perpendicular to it.
pub const UP: Vec3 = Vec3::Y;

/// Forward used when a listener reports a degenerate (zero or vertical)
/// look direction.
pub const DEFAULT_FORWARD: Vec3 = Vec3::NEG_Z;

/// Projects a vector onto the ground plane.
pub fn flatten(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

/// Flattened, normalized look direction, falling back to [`DEFAULT_FORWARD`].
pub fn ground_forward(forward: Vec3) -> Vec3 {
    flatten(forward).try_normalize().unwrap_or(DEFAULT_FORWARD)
}

/// Right-hand vector in the ground plane for a flattened forward.
pub fn ground_right(forward: Vec3) -> Vec3 {
    forward.cross(UP)
}

pub fn clamp01(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Listener position and camera look direction, as supplied by the host
/// once per logic tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Listener {
    pub position: Vec3,
    pub forward: Vec3,
}

impl Listener {
    pub fn new(position: Vec3, forward: Vec3) -> Self {
        Self { position, forward }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            forward: DEFAULT_FORWARD,
        }
    }

    pub fn distance(&self, target: Vec3) -> f32 {
        self.position.distance(target)
    }
}

impl Default for Listener {
    fn default() -> Self {
        Self::from_position(Vec3::ZERO)
    }
}
