//! Beacon guidance bursts.
//!
//! `Ping` is a short pair of slightly detuned sines, sized so two of them
//! fit in the beacon's critical interval. `PingEcho` rings longer, like
//! sonar, and adds a quieter, higher echo pulse inside the same burst.
//! `Warble` sweeps its pitch rapidly and saturates it into a buzz.

use super::oscillator::{attack_release, ms_to_samples, sine};
use super::{BeaconMode, Oscillators, PulseContext, PulseShape};
use std::f32::consts::TAU;

const PING_MS: f32 = 110.0;
const PING_GAP_MS: f32 = 50.0;
const RING_MS: f32 = 260.0;
const ECHO_DELAY_MS: f32 = 140.0;
const ECHO_MS: f32 = 160.0;
const WARBLE_MS: f32 = 160.0;

const DETUNE: f32 = 1.006;
const ECHO_RATIO: f32 = 1.25;
const ECHO_LEVEL: f32 = 0.45;
const WARBLE_RATE: f32 = 28.0;
const WARBLE_DEPTH: f32 = 0.15;

pub(super) fn pulse_shape(mode: BeaconMode, sample_rate: f32) -> PulseShape {
    match mode {
        BeaconMode::Ping => PulseShape::from_ms(PING_MS, PING_GAP_MS, sample_rate),
        BeaconMode::PingEcho => PulseShape::from_ms(ECHO_DELAY_MS + ECHO_MS, 80.0, sample_rate),
        BeaconMode::Warble => PulseShape::from_ms(WARBLE_MS, 60.0, sample_rate),
    }
}

pub(super) fn sample(osc: &mut Oscillators, ctx: &PulseContext) -> f32 {
    match BeaconMode::from_mode(ctx.mode) {
        BeaconMode::Ping => sonar(osc, ctx, ctx.len),
        BeaconMode::PingEcho => {
            let ring_len = ms_to_samples(RING_MS, ctx.sample_rate).min(ctx.len);
            let echo_start = ms_to_samples(ECHO_DELAY_MS, ctx.sample_rate);
            let mut value = sonar(osc, ctx, ring_len);
            if ctx.pos >= echo_start {
                value += ECHO_LEVEL * echo(osc, ctx, ctx.pos - echo_start, ctx.len - echo_start);
            }
            value / (1.0 + ECHO_LEVEL)
        }
        BeaconMode::Warble => warble(osc, ctx),
    }
}

fn sonar(osc: &mut Oscillators, ctx: &PulseContext, ring_len: u32) -> f32 {
    if ctx.pos >= ring_len {
        return 0.0;
    }
    let sr = ctx.sample_rate;
    let env = attack_release(ctx.pos, ring_len, ms_to_samples(2.0, sr), ms_to_samples(10.0, sr))
        * (-ctx.time() * 9.0).exp();
    let a = osc.primary.value();
    let b = osc.secondary.value();
    osc.primary.advance(ctx.frequency, sr);
    osc.secondary.advance(ctx.frequency * DETUNE, sr);
    env * 0.5 * (sine(a) + sine(b))
}

fn echo(osc: &mut Oscillators, ctx: &PulseContext, pos: u32, len: u32) -> f32 {
    let sr = ctx.sample_rate;
    let t = pos as f32 / sr;
    let env = attack_release(pos, len, ms_to_samples(2.0, sr), ms_to_samples(10.0, sr))
        * (-t * 12.0).exp();
    let p = osc.tertiary.value();
    osc.tertiary.advance(ctx.frequency * ECHO_RATIO, sr);
    env * sine(p)
}

fn warble(osc: &mut Oscillators, ctx: &PulseContext) -> f32 {
    let sr = ctx.sample_rate;
    let t = ctx.time();
    let sweep = 1.0 + WARBLE_DEPTH * (TAU * WARBLE_RATE * t).sin();
    let env = attack_release(ctx.pos, ctx.len, ms_to_samples(3.0, sr), ms_to_samples(15.0, sr));
    let p = osc.primary.value();
    osc.primary.advance(ctx.frequency * sweep, sr);
    let s = sine(p);
    env * (0.6 * s + 0.4 * (3.0 * s).tanh())
}
