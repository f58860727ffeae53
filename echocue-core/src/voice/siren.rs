//! Alarm siren: a sawtooth/sine blend whose pitch is swept by an internal
//! LFO running at the channel's modulation rate.

use super::oscillator::{Phase, saw, sine};

pub(super) const FREQUENCY_SMOOTHING: f32 = 0.060;
pub(super) const VOLUME_SMOOTHING: f32 = 0.010;

/// Alarm rate used when the director leaves modulation at 0.
const DEFAULT_ALARM_RATE: f32 = 2.0;
/// Peak pitch deviation of the sweep, as a fraction of the target.
const SWEEP_DEPTH: f32 = 0.25;
const SAW_MIX: f32 = 0.55;

pub(super) fn sample(
    phase: &mut Phase,
    lfo: &mut Phase,
    frequency: f32,
    alarm_rate: f32,
    sample_rate: f32,
) -> f32 {
    let rate = if alarm_rate > 0.0 {
        alarm_rate
    } else {
        DEFAULT_ALARM_RATE
    };
    let sweep = sine(lfo.value());
    lfo.advance(rate, sample_rate);

    let instantaneous = frequency * (1.0 + SWEEP_DEPTH * sweep);
    let p = phase.value();
    let dt = phase.advance(instantaneous, sample_rate);
    SAW_MIX * saw(p, dt) + (1.0 - SAW_MIX) * sine(p)
}
