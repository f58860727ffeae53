//! Listener-relative spatialization.
//!
//! The camera looks down on the scene from a fixed angle, so "forward" is
//! the camera's look direction flattened onto the ground plane, not the
//! avatar's facing. Pan comes from the flattened offset's projection on the
//! right vector. Pitch is bent up for sources ahead and down for sources
//! behind, so players who cannot resolve stereo precisely still hear the
//! front/back distinction. Height difference adds a small, bounded bias.

use crate::math::{Vec3, clamp01, flatten, ground_forward, ground_right, lerp};

/// Result of spatializing one source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialCue {
    /// Stereo position in `[-1, 1]`, negative is left
    pub pan: f32,
    /// Front/back pitch multiplier in `[behind_pitch, ahead_pitch]`
    pub directional_pitch: f32,
    /// `target.y - listener.y`
    pub vertical_offset: f32,
    /// Fractional pitch bias from height, within `±max_vertical_bias`
    pub vertical_bias: f32,
}

impl SpatialCue {
    /// Combined multiplier to apply to a family's base frequency.
    pub fn pitch_multiplier(&self) -> f32 {
        self.directional_pitch * (1.0 + self.vertical_bias)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spatializer {
    pub ahead_pitch: f32,
    pub behind_pitch: f32,
    /// Bias per world unit of height difference
    pub vertical_bias_per_unit: f32,
    pub max_vertical_bias: f32,
}

impl Default for Spatializer {
    fn default() -> Self {
        Self {
            ahead_pitch: 1.15,
            behind_pitch: 0.85,
            vertical_bias_per_unit: 0.02,
            max_vertical_bias: 0.08,
        }
    }
}

impl Spatializer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute(
        &self,
        listener_pos: Vec3,
        listener_forward: Vec3,
        target_pos: Vec3,
    ) -> SpatialCue {
        let offset = target_pos - listener_pos;
        let vertical_offset = if offset.y.is_finite() { offset.y } else { 0.0 };
        let vertical_bias = (vertical_offset * self.vertical_bias_per_unit)
            .clamp(-self.max_vertical_bias, self.max_vertical_bias);

        let Some(direction) = flatten(offset).try_normalize() else {
            // Directly above or below: centered, neutral front/back pitch.
            return SpatialCue {
                pan: 0.0,
                directional_pitch: lerp(self.behind_pitch, self.ahead_pitch, 0.5),
                vertical_offset,
                vertical_bias,
            };
        };

        let forward = ground_forward(listener_forward);
        let right = ground_right(forward);
        let pan = direction.dot(right).clamp(-1.0, 1.0);
        let facing = direction.dot(forward).clamp(-1.0, 1.0);
        let directional_pitch =
            lerp(self.behind_pitch, self.ahead_pitch, clamp01((facing + 1.0) * 0.5));

        SpatialCue {
            pan,
            directional_pitch,
            vertical_offset,
            vertical_bias,
        }
    }

    /// Signed angle of the target around the listener in radians, 0 straight
    /// ahead, positive clockwise (to the right). `None` when the target is
    /// directly above or below.
    pub fn bearing(
        &self,
        listener_pos: Vec3,
        listener_forward: Vec3,
        target_pos: Vec3,
    ) -> Option<f32> {
        let direction = flatten(target_pos - listener_pos).try_normalize()?;
        let forward = ground_forward(listener_forward);
        let right = ground_right(forward);
        Some(direction.dot(right).atan2(direction.dot(forward)))
    }
}

/// Number of angular sectors around the listener.
pub const OCTANTS: usize = 8;

/// Maps a bearing to one of eight 45° sectors: 0 ahead, 2 right, 4 behind,
/// 6 left.
pub fn octant_of(bearing: f32) -> usize {
    use std::f32::consts::{FRAC_PI_4, FRAC_PI_8, TAU};
    if !bearing.is_finite() {
        return 0;
    }
    let shifted = (bearing + FRAC_PI_8).rem_euclid(TAU);
    ((shifted / FRAC_PI_4) as usize) % OCTANTS
}
