//! Lock-free control parameters shared between the logic tick and the
//! render callback.
//!
//! # Ordering contract
//!
//! Each field is an independent atomic. Frequency, volume, pan, modulation,
//! mode and the active flag are stored and loaded with `Relaxed` ordering:
//! the render thread may observe any recent value of each field, and no
//! cross-field consistency is guaranteed. A stale or mixed read produces at
//! worst one buffer of a slightly wrong but still valid tone, because every
//! value is clamped on the write side.
//!
//! Burst triggers are the one exception. The writer stores the burst count
//! and stagger first and then bumps `trigger_seq` with `Release`; the reader
//! loads `trigger_seq` with `Acquire` before reading the burst fields, so a
//! trigger is always seen together with the count and stagger it was issued
//! with, and with every target written before it. A voice re-reads its
//! targets after observing a trigger, so a burst starts at the frequency
//! and volume the director set for it.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Upper bound on pulses per trigger.
pub const MAX_BURST_COUNT: u32 = 8;

/// Upper bound on stagger, one second at 44.1 kHz.
pub const MAX_STAGGER_SAMPLES: u32 = 44_100;

/// An `f32` stored in an `AtomicU32` by bit pattern.
#[derive(Debug)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Clamp that maps NaN to the lower bound instead of propagating it.
pub(crate) fn sanitize(value: f32, lo: f32, hi: f32) -> f32 {
    if value.is_nan() { lo } else { value.clamp(lo, hi) }
}

/// Values the render thread reads once at the start of each buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSnapshot {
    pub frequency: f32,
    pub volume: f32,
    pub pan: f32,
    pub modulation: f32,
    pub mode: u32,
    pub active: bool,
}

/// A burst request observed by the render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstTrigger {
    pub count: u32,
    pub stagger_samples: u32,
}

/// Target values for one channel.
///
/// Written only by the director that owns the channel; read only by the
/// channel's voice on the render thread.
#[derive(Debug)]
pub struct ControlParameters {
    frequency_range: (f32, f32),
    max_volume: f32,

    frequency: AtomicF32,
    volume: AtomicF32,
    pan: AtomicF32,
    modulation: AtomicF32,
    mode: AtomicU32,
    active: AtomicBool,

    burst_count: AtomicU32,
    stagger: AtomicU32,
    trigger_seq: AtomicU32,
}

impl ControlParameters {
    /// Creates a parameter set with the given clamping bounds. Starts
    /// inactive, silent, centered, at the bottom of the frequency range.
    pub fn new(frequency_range: (f32, f32), max_volume: f32) -> Self {
        let (lo, hi) = frequency_range;
        let lo = if lo.is_finite() && lo > 0.0 { lo } else { 1.0 };
        let hi = if hi.is_finite() && hi >= lo { hi } else { lo };
        let max_volume = sanitize(max_volume, 0.0, 1.0);
        Self {
            frequency_range: (lo, hi),
            max_volume,
            frequency: AtomicF32::new(lo),
            volume: AtomicF32::new(0.0),
            pan: AtomicF32::new(0.0),
            modulation: AtomicF32::new(0.0),
            mode: AtomicU32::new(0),
            active: AtomicBool::new(false),
            burst_count: AtomicU32::new(1),
            stagger: AtomicU32::new(0),
            trigger_seq: AtomicU32::new(0),
        }
    }

    pub fn frequency_range(&self) -> (f32, f32) {
        self.frequency_range
    }

    pub fn max_volume(&self) -> f32 {
        self.max_volume
    }

    pub fn set_frequency(&self, hz: f32) {
        let (lo, hi) = self.frequency_range;
        self.frequency.store(sanitize(hz, lo, hi));
    }

    pub fn set_volume(&self, volume: f32) {
        self.volume.store(sanitize(volume, 0.0, self.max_volume));
    }

    pub fn set_pan(&self, pan: f32) {
        self.pan.store(sanitize(pan, -1.0, 1.0));
    }

    /// Family-specific modulation control (siren alarm rate in Hz).
    pub fn set_modulation(&self, value: f32) {
        self.modulation.store(sanitize(value, 0.0, 40.0));
    }

    pub fn set_mode(&self, mode: u32) {
        self.mode.store(mode, Ordering::Relaxed);
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Relaxed);
    }

    /// Requests a burst of `count` pulses preceded by `stagger_samples` of
    /// silence. Only the most recent trigger between two render callbacks
    /// takes effect.
    pub fn trigger(&self, count: u32, stagger_samples: u32) {
        self.burst_count
            .store(count.clamp(1, MAX_BURST_COUNT), Ordering::Relaxed);
        self.stagger
            .store(stagger_samples.min(MAX_STAGGER_SAMPLES), Ordering::Relaxed);
        self.trigger_seq.fetch_add(1, Ordering::Release);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency.load()
    }

    pub fn volume(&self) -> f32 {
        self.volume.load()
    }

    pub fn pan(&self) -> f32 {
        self.pan.load()
    }

    pub fn modulation(&self) -> f32 {
        self.modulation.load()
    }

    pub fn mode(&self) -> u32 {
        self.mode.load(Ordering::Relaxed)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            frequency: self.frequency(),
            volume: self.volume(),
            pan: self.pan(),
            modulation: self.modulation(),
            mode: self.mode(),
            active: self.is_active(),
        }
    }

    /// Returns the pending trigger if the sequence moved past `last_seen`,
    /// updating `last_seen`.
    pub fn take_trigger(&self, last_seen: &mut u32) -> Option<BurstTrigger> {
        let seq = self.trigger_seq.load(Ordering::Acquire);
        if seq == *last_seen {
            return None;
        }
        *last_seen = seq;
        Some(BurstTrigger {
            count: self.burst_count.load(Ordering::Relaxed),
            stagger_samples: self.stagger.load(Ordering::Relaxed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_setters_clamp_into_family_bounds() {
        let params = ControlParameters::new((100.0, 5000.0), 0.8);
        params.set_frequency(20_000.0);
        assert_eq!(params.frequency(), 5000.0);
        params.set_frequency(-3.0);
        assert_eq!(params.frequency(), 100.0);
        params.set_volume(1.5);
        assert_eq!(params.volume(), 0.8);
        params.set_pan(-4.0);
        assert_eq!(params.pan(), -1.0);
    }

    #[test]
    fn test_nan_is_clamped_not_stored() {
        let params = ControlParameters::new((100.0, 5000.0), 0.8);
        params.set_frequency(f32::NAN);
        params.set_volume(f32::NAN);
        params.set_pan(f32::NAN);
        assert_eq!(params.frequency(), 100.0);
        assert_eq!(params.volume(), 0.0);
        assert_eq!(params.pan(), -1.0);
    }

    #[test]
    fn test_trigger_is_observed_once() {
        let params = ControlParameters::new((100.0, 5000.0), 0.8);
        let mut seen = 0;
        assert!(params.take_trigger(&mut seen).is_none());

        params.trigger(2, 300);
        let trigger = params.take_trigger(&mut seen).expect("pending trigger");
        assert_eq!(trigger.count, 2);
        assert_eq!(trigger.stagger_samples, 300);
        assert!(params.take_trigger(&mut seen).is_none());
    }

    #[test]
    fn test_trigger_count_and_stagger_are_bounded() {
        let params = ControlParameters::new((100.0, 5000.0), 0.8);
        let mut seen = 0;
        params.trigger(0, u32::MAX);
        let trigger = params.take_trigger(&mut seen).expect("pending trigger");
        assert_eq!(trigger.count, 1);
        assert_eq!(trigger.stagger_samples, MAX_STAGGER_SAMPLES);
    }

    #[test]
    fn test_concurrent_writes_never_produce_out_of_range_reads() {
        let params = Arc::new(ControlParameters::new((100.0, 5000.0), 0.8));
        let writer = {
            let params = params.clone();
            std::thread::spawn(move || {
                for i in 0..10_000 {
                    params.set_frequency(i as f32);
                    params.set_volume((i % 7) as f32 * 0.3);
                }
            })
        };
        for _ in 0..10_000 {
            let snap = params.snapshot();
            assert!((100.0..=5000.0).contains(&snap.frequency));
            assert!((0.0..=0.8).contains(&snap.volume));
        }
        writer.join().expect("writer thread");
    }
}
