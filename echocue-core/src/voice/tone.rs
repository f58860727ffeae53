//! Continuous guidance tone: triangle softened with a sine.

use super::oscillator::{Phase, sine, triangle};

/// Frequency glides slowly so distance changes never wobble the pitch.
pub(super) const FREQUENCY_SMOOTHING: f32 = 0.040;
/// Volume follows quickly so the envelope never snaps audibly.
pub(super) const VOLUME_SMOOTHING: f32 = 0.008;

const TRIANGLE_MIX: f32 = 0.6;

pub(super) fn sample(phase: &mut Phase, frequency: f32, sample_rate: f32) -> f32 {
    let p = phase.value();
    let value = TRIANGLE_MIX * triangle(p) + (1.0 - TRIANGLE_MIX) * sine(p);
    phase.advance(frequency, sample_rate);
    value
}
