//! Charge-up rumble telegraphing a hostile action: a run of low pulses
//! that climb in pitch, spaced by the attack's tempo.

use super::oscillator::{attack_release, ms_to_samples, saw, sine};
use super::{AttackTempo, Oscillators, PulseContext, PulseShape};

const PULSE_MS: f32 = 45.0;
/// Pitch step between consecutive pulses.
const RISE: f32 = 1.12;

pub(super) fn pulse_shape(tempo: AttackTempo, sample_rate: f32) -> PulseShape {
    let gap_ms = match tempo {
        AttackTempo::Slow => 200.0,
        AttackTempo::Medium => 120.0,
        AttackTempo::Fast => 60.0,
    };
    PulseShape::from_ms(PULSE_MS, gap_ms, sample_rate)
}

pub(super) fn sample(osc: &mut Oscillators, ctx: &PulseContext) -> f32 {
    let sr = ctx.sample_rate;
    let frequency = ctx.frequency * RISE.powi(ctx.pulse.min(16) as i32);
    let env = attack_release(ctx.pos, ctx.len, ms_to_samples(3.0, sr), ms_to_samples(10.0, sr));
    let p = osc.primary.value();
    let dt = osc.primary.advance(frequency, sr);
    env * (0.5 * saw(p, dt) + 0.5 * sine(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faster_tempo_has_shorter_gap() {
        let sr = 44_100.0;
        let slow = pulse_shape(AttackTempo::Slow, sr);
        let medium = pulse_shape(AttackTempo::Medium, sr);
        let fast = pulse_shape(AttackTempo::Fast, sr);
        assert_eq!(slow.pulse_len, fast.pulse_len);
        assert!(slow.gap_len > medium.gap_len && medium.gap_len > fast.gap_len);
    }
}
