//! Phase accumulators, waveform shapes and parameter smoothing.
//!
//! Everything here is plain arithmetic on `f32` and safe to call from the
//! render callback.

use std::f32::consts::{PI, TAU};

/// Normalized oscillator phase in `[0, 1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Phase(f32);

impl Phase {
    pub fn value(self) -> f32 {
        self.0
    }

    pub fn reset(&mut self) {
        self.0 = 0.0;
    }

    /// Advances by one sample at `frequency` and returns the phase
    /// increment used, which doubles as the PolyBLEP step size.
    pub fn advance(&mut self, frequency: f32, sample_rate: f32) -> f32 {
        let increment = frequency / sample_rate;
        let increment = if increment.is_finite() { increment } else { 0.0 };
        self.0 = wrap(self.0 + increment);
        increment.abs()
    }
}

/// Renormalizes into `[0, 1)`. Non-finite input restarts at 0.
pub fn wrap(x: f32) -> f32 {
    let wrapped = x - x.floor();
    if wrapped.is_finite() && (0.0..1.0).contains(&wrapped) {
        wrapped
    } else {
        0.0
    }
}

pub fn sine(phase: f32) -> f32 {
    (TAU * phase).sin()
}

/// Sine at an integer or fractional multiple of the phase.
pub fn partial(phase: f32, multiple: f32) -> f32 {
    (TAU * phase * multiple).sin()
}

/// Band-limited triangle from its first four odd harmonics.
pub fn triangle(phase: f32) -> f32 {
    const SCALE: f32 = 8.0 / (PI * PI);
    let mut sum = 0.0;
    let mut sign = 1.0;
    for k in 0..4 {
        let n = (2 * k + 1) as f32;
        sum += sign * partial(phase, n) / (n * n);
        sign = -sign;
    }
    SCALE * sum
}

/// PolyBLEP residual for a discontinuity at phase 0.
fn poly_blep(t: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        0.0
    } else if t < dt {
        let x = t / dt;
        2.0 * x - x * x - 1.0
    } else if t > 1.0 - dt {
        let x = (t - 1.0) / dt;
        x * x + 2.0 * x + 1.0
    } else {
        0.0
    }
}

/// Anti-aliased sawtooth.
pub fn saw(phase: f32, dt: f32) -> f32 {
    2.0 * phase - 1.0 - poly_blep(phase, dt)
}

/// Linear attack from 0 and linear fade to 0 over the last `release`
/// samples of a `len`-sample pulse.
pub fn attack_release(pos: u32, len: u32, attack: u32, release: u32) -> f32 {
    if pos >= len {
        return 0.0;
    }
    let rise = if attack == 0 {
        1.0
    } else {
        pos as f32 / attack as f32
    };
    let fall = if release == 0 {
        1.0
    } else {
        (len - pos - 1) as f32 / release as f32
    };
    rise.min(fall).clamp(0.0, 1.0)
}

/// One-pole exponential moving average toward a target.
#[derive(Debug, Clone, Copy)]
pub struct Smoother {
    current: f32,
    coef: f32,
}

impl Smoother {
    pub fn new(time_constant_secs: f32, sample_rate: f32) -> Self {
        let samples = time_constant_secs * sample_rate;
        let coef = if samples > 1.0 {
            1.0 - (-1.0 / samples).exp()
        } else {
            1.0
        };
        Self { current: 0.0, coef }
    }

    pub fn next(&mut self, target: f32) -> f32 {
        self.current += (target - self.current) * self.coef;
        if !self.current.is_finite() {
            self.current = target;
        }
        self.current
    }

    pub fn reset(&mut self, value: f32) {
        self.current = value;
    }

    pub fn value(&self) -> f32 {
        self.current
    }
}

pub fn ms_to_samples(ms: f32, sample_rate: f32) -> u32 {
    ((ms * 0.001 * sample_rate).round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_stays_in_unit_interval() {
        let mut phase = Phase::default();
        for &freq in &[0.5, 440.0, 12_345.0, 44_099.0, 44_100.0, 1.0e9, f32::MAX] {
            for _ in 0..1000 {
                phase.advance(freq, 44_100.0);
                assert!((0.0..1.0).contains(&phase.value()), "freq {freq}");
            }
        }
    }

    #[test]
    fn test_phase_survives_non_finite_frequency() {
        let mut phase = Phase::default();
        phase.advance(f32::NAN, 44_100.0);
        phase.advance(f32::INFINITY, 44_100.0);
        assert!((0.0..1.0).contains(&phase.value()));
    }

    #[test]
    fn test_wrap_of_tiny_negative_is_in_range() {
        let w = wrap(-1.0e-9);
        assert!((0.0..1.0).contains(&w));
    }

    #[test]
    fn test_triangle_peaks_near_unity() {
        let peak = (0..1000)
            .map(|i| triangle(i as f32 / 1000.0).abs())
            .fold(0.0f32, f32::max);
        assert!(peak > 0.9 && peak <= 1.0, "peak {peak}");
    }

    #[test]
    fn test_saw_is_bounded() {
        let dt = 1000.0 / 44_100.0;
        for i in 0..1000 {
            let s = saw(i as f32 / 1000.0, dt);
            assert!(s.abs() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_smoother_converges_to_target() {
        let mut s = Smoother::new(0.01, 44_100.0);
        for _ in 0..44_100 {
            s.next(1.0);
        }
        assert!((s.value() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_attack_release_ends_at_zero() {
        let len = 100;
        assert_eq!(attack_release(0, len, 10, 10), 0.0);
        assert_eq!(attack_release(len - 1, len, 10, 10), 0.0);
        assert_eq!(attack_release(50, len, 10, 10), 1.0);
    }
}
