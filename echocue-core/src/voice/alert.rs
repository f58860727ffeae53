//! Tiered alert beeps.
//!
//! Tiers differ in duration, harmonic content and envelope so they stay
//! distinguishable by timbre alone:
//! - normal: short, sharp exponential decay, odd harmonic
//! - elite: longer, vibrato
//! - boss: longest, pitch falls with a sub-octave underneath
//! - rare: pitch rises through bright harmonics

use super::oscillator::{attack_release, ms_to_samples, partial, sine, triangle};
use super::{EntityTier, Oscillators, PulseContext, PulseShape};
use crate::math::lerp;
use std::f32::consts::TAU;

pub(super) fn pulse_shape(tier: EntityTier, sample_rate: f32) -> PulseShape {
    let pulse_ms = match tier {
        EntityTier::Normal => 60.0,
        EntityTier::Elite => 110.0,
        EntityTier::Boss => 200.0,
        EntityTier::Rare => 140.0,
    };
    PulseShape::from_ms(pulse_ms, pulse_ms * 0.5, sample_rate)
}

pub(super) fn sample(tier: EntityTier, osc: &mut Oscillators, ctx: &PulseContext) -> f32 {
    let sr = ctx.sample_rate;
    let t = ctx.time();
    match tier {
        EntityTier::Normal => {
            let env = envelope(ctx, 2.0, 3.0) * (-t * 35.0).exp();
            let p = osc.primary.value();
            osc.primary.advance(ctx.frequency, sr);
            env * (sine(p) + 0.3 * partial(p, 3.0)) / 1.3
        }
        EntityTier::Elite => {
            let vibrato = 1.0 + 0.03 * (TAU * 8.0 * t).sin();
            let env = envelope(ctx, 3.0, 10.0) * (1.0 - 0.4 * ctx.progress());
            let p = osc.primary.value();
            osc.primary.advance(ctx.frequency * vibrato, sr);
            env * (0.7 * sine(p) + 0.3 * triangle(p))
        }
        EntityTier::Boss => {
            let glide = lerp(1.0, 0.6, ctx.progress());
            let env = envelope(ctx, 5.0, 20.0);
            let p = osc.primary.value();
            let sub = osc.secondary.value();
            osc.primary.advance(ctx.frequency * glide, sr);
            osc.secondary.advance(ctx.frequency * glide * 0.5, sr);
            env * (0.6 * sine(p) + 0.4 * sine(sub))
        }
        EntityTier::Rare => {
            let glide = lerp(1.0, 1.5, ctx.progress());
            let env = envelope(ctx, 2.0, 15.0) * (-t * 6.0).exp();
            let p = osc.primary.value();
            osc.primary.advance(ctx.frequency * glide, sr);
            env * bright(p)
        }
    }
}

fn envelope(ctx: &PulseContext, attack_ms: f32, release_ms: f32) -> f32 {
    attack_release(
        ctx.pos,
        ctx.len,
        ms_to_samples(attack_ms, ctx.sample_rate),
        ms_to_samples(release_ms, ctx.sample_rate),
    )
}

fn bright(p: f32) -> f32 {
    (sine(p) + 0.5 * partial(p, 2.0) + 0.3 * partial(p, 3.0)) / 1.8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(tier: EntityTier) -> Vec<f32> {
        let shape = pulse_shape(tier, 44_100.0);
        let mut osc = Oscillators::default();
        (0..shape.pulse_len)
            .map(|pos| {
                let ctx = PulseContext {
                    pulse: 0,
                    pos,
                    len: shape.pulse_len,
                    frequency: 600.0,
                    mode: 0,
                    sample_rate: 44_100.0,
                };
                sample(tier, &mut osc, &ctx)
            })
            .collect()
    }

    fn zero_crossings(buf: &[f32]) -> usize {
        buf.windows(2).filter(|w| w[0] < 0.0 && w[1] >= 0.0).count()
    }

    #[test]
    fn test_boss_pitch_descends_and_rare_pitch_ascends() {
        let boss = render(EntityTier::Boss);
        let half = boss.len() / 2;
        assert!(zero_crossings(&boss[..half]) > zero_crossings(&boss[half..]));

        let rare = render(EntityTier::Rare);
        let half = rare.len() / 2;
        assert!(zero_crossings(&rare[..half]) < zero_crossings(&rare[half..]));
    }

    #[test]
    fn test_pulses_start_and_end_at_zero() {
        for tier in EntityTier::ALL {
            let buf = render(tier);
            assert_eq!(buf[0], 0.0);
            assert_eq!(*buf.last().unwrap_or(&1.0), 0.0);
        }
    }
}
