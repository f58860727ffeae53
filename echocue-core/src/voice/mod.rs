//! Procedural waveform voices.
//!
//! A [`WaveformVoice`] is one synthesizer instance for one [`CueFamily`].
//! The family selects the synthesis strategy; the voice owns all per-sample
//! state (phases, smoothers, burst counters) and reads its targets from a
//! [`ControlParameters`] once per buffer.
//!
//! Continuous families (tone, siren) sound while their channel is active.
//! The other families are one-shot bursts started by
//! [`ControlParameters::trigger`]. A trigger that arrives while a burst is
//! still sounding is held and starts when that burst ends; a newer trigger
//! replaces the held one. Deactivating a channel fades the voice out within
//! the buffer that observes it and leaves it silent afterwards.

mod alert;
mod beacon;
mod charge;
mod chime;
mod oscillator;
mod siren;
mod tone;

pub use oscillator::{Phase, Smoother, wrap};

use crate::params::{
    BurstTrigger, ControlParameters, MAX_BURST_COUNT, MAX_STAGGER_SAMPLES, ParamSnapshot,
};
use oscillator::ms_to_samples;

/// Fade applied when a channel is deactivated.
const RELEASE_SAMPLES: u32 = 64;

/// Hostile entity tier. Each tier has its own alert timbre and its own
/// channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityTier {
    Normal,
    Elite,
    Boss,
    /// Rare or loot-carrying entity
    Rare,
}

impl EntityTier {
    pub const ALL: [EntityTier; 4] = [Self::Normal, Self::Elite, Self::Boss, Self::Rare];
    pub const COUNT: usize = 4;

    pub fn index(self) -> usize {
        match self {
            Self::Normal => 0,
            Self::Elite => 1,
            Self::Boss => 2,
            Self::Rare => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectibleKind {
    Resource,
    Health,
    Artifact,
}

impl CollectibleKind {
    pub const ALL: [CollectibleKind; 3] = [Self::Resource, Self::Health, Self::Artifact];

    pub fn index(self) -> usize {
        match self {
            Self::Resource => 0,
            Self::Health => 1,
            Self::Artifact => 2,
        }
    }
}

/// Beacon timbre, written through the channel's mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeaconMode {
    /// Detuned dual-oscillator sonar ping
    #[default]
    Ping,
    /// Sonar ping followed by an ascending echo pulse
    PingEcho,
    /// Rapid frequency-oscillating mechanical buzz
    Warble,
}

impl BeaconMode {
    pub fn as_mode(self) -> u32 {
        match self {
            Self::Ping => 0,
            Self::PingEcho => 1,
            Self::Warble => 2,
        }
    }

    pub fn from_mode(mode: u32) -> Self {
        match mode {
            1 => Self::PingEcho,
            2 => Self::Warble,
            _ => Self::Ping,
        }
    }
}

/// Charge-up tempo for a telegraphed hostile action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttackTempo {
    Slow,
    #[default]
    Medium,
    Fast,
}

impl AttackTempo {
    pub fn as_mode(self) -> u32 {
        match self {
            Self::Slow => 0,
            Self::Medium => 1,
            Self::Fast => 2,
        }
    }

    pub fn from_mode(mode: u32) -> Self {
        match mode {
            0 => Self::Slow,
            2 => Self::Fast,
            _ => Self::Medium,
        }
    }
}

/// Cue family tag selecting a voice's synthesis strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueFamily {
    ContinuousTone,
    /// Ping or warble, selected by [`BeaconMode`]
    Beacon,
    Siren,
    Alert(EntityTier),
    Collectible(CollectibleKind),
    ChargeUp,
}

impl CueFamily {
    /// Bounds every target frequency for this family is clamped into.
    pub fn frequency_range(self) -> (f32, f32) {
        match self {
            Self::Siren => (20.0, 20_000.0),
            Self::ChargeUp => (30.0, 2_000.0),
            _ => (100.0, 5_000.0),
        }
    }

    /// Loudest target volume a director may request.
    pub fn max_volume(self) -> f32 {
        match self {
            Self::ContinuousTone => 0.6,
            Self::Beacon => 0.85,
            Self::Siren => 0.7,
            Self::Alert(_) => 0.8,
            Self::Collectible(_) => 0.7,
            Self::ChargeUp => 0.8,
        }
    }

    /// Continuous families sound while active; the rest only on trigger.
    pub fn is_continuous(self) -> bool {
        matches!(self, Self::ContinuousTone | Self::Siren)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ContinuousTone => "tone",
            Self::Beacon => "beacon",
            Self::Siren => "siren",
            Self::Alert(EntityTier::Normal) => "alert-normal",
            Self::Alert(EntityTier::Elite) => "alert-elite",
            Self::Alert(EntityTier::Boss) => "alert-boss",
            Self::Alert(EntityTier::Rare) => "alert-rare",
            Self::Collectible(_) => "collectible",
            Self::ChargeUp => "charge-up",
        }
    }

    pub fn control_parameters(self) -> ControlParameters {
        ControlParameters::new(self.frequency_range(), self.max_volume())
    }

    /// Pulse timing for a one-shot family in the given mode. `None` for
    /// continuous families.
    pub(crate) fn pulse_shape(self, mode: u32, sample_rate: f32) -> Option<PulseShape> {
        let shape = match self {
            Self::Alert(tier) => alert::pulse_shape(tier, sample_rate),
            Self::Beacon => beacon::pulse_shape(BeaconMode::from_mode(mode), sample_rate),
            Self::Collectible(kind) => chime::pulse_shape(kind, sample_rate),
            Self::ChargeUp => charge::pulse_shape(AttackTempo::from_mode(mode), sample_rate),
            Self::ContinuousTone | Self::Siren => return None,
        };
        Some(shape)
    }

    /// Seconds from trigger to the end of the last pulse of a burst, stagger
    /// prefix included. Zero for continuous families.
    ///
    /// Directors re-trigger a channel no sooner than this so a burst is
    /// never cut short.
    pub fn burst_seconds(
        self,
        mode: u32,
        count: u32,
        stagger_samples: u32,
        sample_rate: u32,
    ) -> f32 {
        let sample_rate = sample_rate.max(1) as f32;
        let Some(shape) = self.pulse_shape(mode, sample_rate) else {
            return 0.0;
        };
        let count = u64::from(count.clamp(1, MAX_BURST_COUNT));
        let samples = u64::from(stagger_samples.min(MAX_STAGGER_SAMPLES))
            + count * u64::from(shape.pulse_len)
            + (count - 1) * u64::from(shape.gap_len);
        samples as f32 / sample_rate
    }
}

/// Length of one pulse and the silence after it, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PulseShape {
    pub pulse_len: u32,
    pub gap_len: u32,
}

impl PulseShape {
    pub(crate) fn from_ms(pulse_ms: f32, gap_ms: f32, sample_rate: f32) -> Self {
        Self {
            pulse_len: ms_to_samples(pulse_ms, sample_rate),
            gap_len: ms_to_samples(gap_ms, sample_rate),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BurstStep {
    Silent,
    Sounding { pulse: u32, pos: u32 },
    Finished,
}

/// A finite pulse train with a silent stagger prefix.
#[derive(Debug, Clone, Copy)]
struct Burst {
    stagger: u32,
    pulses: u32,
    pulse: u32,
    pos: u32,
    shape: PulseShape,
    frequency: f32,
    volume: f32,
    mode: u32,
}

impl Burst {
    fn step(&mut self) -> BurstStep {
        if self.stagger > 0 {
            self.stagger -= 1;
            return BurstStep::Silent;
        }
        if self.pulse >= self.pulses {
            return BurstStep::Finished;
        }

        let pulse = self.pulse;
        let pos = self.pos;
        // The trailing gap after the last pulse is skipped.
        let cycle = if pulse + 1 == self.pulses {
            self.shape.pulse_len
        } else {
            self.shape.pulse_len + self.shape.gap_len
        };
        self.pos += 1;
        if self.pos >= cycle {
            self.pulse += 1;
            self.pos = 0;
        }

        if pos < self.shape.pulse_len {
            BurstStep::Sounding { pulse, pos }
        } else {
            BurstStep::Silent
        }
    }
}

/// Per-sample inputs for one pulse of a one-shot family.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PulseContext {
    pub pulse: u32,
    pub pos: u32,
    pub len: u32,
    pub frequency: f32,
    pub mode: u32,
    pub sample_rate: f32,
}

impl PulseContext {
    /// Seconds since the start of this pulse.
    pub fn time(&self) -> f32 {
        self.pos as f32 / self.sample_rate
    }

    /// Position within the pulse in `[0, 1)`.
    pub fn progress(&self) -> f32 {
        self.pos as f32 / self.len.max(1) as f32
    }
}

/// Oscillator bank shared by the family strategies.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Oscillators {
    pub primary: Phase,
    pub secondary: Phase,
    pub tertiary: Phase,
}

impl Oscillators {
    fn reset(&mut self) {
        self.primary.reset();
        self.secondary.reset();
        self.tertiary.reset();
    }
}

/// Stateful synthesizer for one cue family.
#[derive(Debug, Clone)]
pub struct WaveformVoice {
    family: CueFamily,
    sample_rate: f32,
    osc: Oscillators,
    lfo: Phase,
    frequency: Smoother,
    volume: Smoother,
    burst: Option<Burst>,
    /// Trigger held until the sounding burst ends
    pending: Option<Burst>,
    last_trigger: u32,
    gate: f32,
    release_len: u32,
    release_remaining: u32,
    release_from: f32,
}

impl WaveformVoice {
    pub fn new(family: CueFamily, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1) as f32;
        let (freq_tau, vol_tau) = match family {
            CueFamily::Siren => (siren::FREQUENCY_SMOOTHING, siren::VOLUME_SMOOTHING),
            _ => (tone::FREQUENCY_SMOOTHING, tone::VOLUME_SMOOTHING),
        };
        Self {
            family,
            sample_rate,
            osc: Oscillators::default(),
            lfo: Phase::default(),
            frequency: Smoother::new(freq_tau, sample_rate),
            volume: Smoother::new(vol_tau, sample_rate),
            burst: None,
            pending: None,
            last_trigger: 0,
            gate: 0.0,
            release_len: 0,
            release_remaining: 0,
            release_from: 0.0,
        }
    }

    pub fn family(&self) -> CueFamily {
        self.family
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Primary oscillator phase, always in `[0, 1)`.
    pub fn phase(&self) -> f32 {
        self.osc.primary.value()
    }

    /// True while a one-shot burst (including its stagger prefix) is pending.
    pub fn is_bursting(&self) -> bool {
        self.burst.is_some()
    }

    /// True when the voice will produce nothing but zeros until
    /// reactivated or retriggered.
    pub fn is_silent(&self) -> bool {
        self.gate <= 0.0 || (!self.family.is_continuous() && self.burst.is_none())
    }

    /// Drops all sounding state.
    pub fn reset(&mut self) {
        self.osc.reset();
        self.lfo.reset();
        self.frequency.reset(0.0);
        self.volume.reset(0.0);
        self.burst = None;
        self.pending = None;
        self.gate = 0.0;
        self.release_len = 0;
        self.release_remaining = 0;
    }

    /// Fills `out` with mono samples and returns `out.len()`.
    ///
    /// Never blocks or allocates. Finished or inactive voices write 0.0.
    pub fn read(&mut self, params: &ControlParameters, out: &mut [f32]) -> usize {
        let snap = params.snapshot();

        if snap.active {
            if self.gate <= 0.0 || self.release_remaining > 0 {
                self.activate(&snap);
            }
            if let Some(trigger) = params.take_trigger(&mut self.last_trigger) {
                if !self.family.is_continuous() {
                    // Re-read so the burst latches the targets written
                    // before the trigger.
                    let latest = params.snapshot();
                    self.start_burst(trigger, &latest);
                }
            }
        } else {
            // A trigger issued while inactive must not fire on reactivation.
            let _ = params.take_trigger(&mut self.last_trigger);
            if self.gate <= 0.0 {
                out.fill(0.0);
                return out.len();
            }
            self.begin_release(out.len());
        }

        for sample in out.iter_mut() {
            if self.gate <= 0.0 {
                *sample = 0.0;
                continue;
            }
            let raw = self.next_sample(&snap);
            if self.release_remaining > 0 {
                self.release_remaining -= 1;
                self.gate =
                    self.release_from * self.release_remaining as f32 / self.release_len as f32;
                if self.release_remaining == 0 {
                    self.reset();
                }
            }
            let value = raw * self.gate;
            *sample = if value.is_finite() {
                value.clamp(-1.0, 1.0)
            } else {
                0.0
            };
        }

        out.len()
    }

    fn activate(&mut self, snap: &ParamSnapshot) {
        if self.gate <= 0.0 {
            self.frequency.reset(snap.frequency);
            self.volume.reset(0.0);
        }
        self.gate = 1.0;
        self.release_len = 0;
        self.release_remaining = 0;
    }

    fn begin_release(&mut self, buffer_len: usize) {
        if self.release_remaining > 0 {
            return;
        }
        let len = (buffer_len as u32).clamp(1, RELEASE_SAMPLES);
        self.release_len = len;
        self.release_remaining = len;
        self.release_from = self.gate;
    }

    fn start_burst(&mut self, trigger: BurstTrigger, snap: &ParamSnapshot) {
        let Some(shape) = self.family.pulse_shape(snap.mode, self.sample_rate) else {
            return;
        };
        let burst = Burst {
            stagger: trigger.stagger_samples,
            pulses: trigger.count.max(1),
            pulse: 0,
            pos: 0,
            shape,
            frequency: snap.frequency,
            volume: snap.volume,
            mode: snap.mode,
        };
        if self.burst.is_some() {
            self.pending = Some(burst);
        } else {
            self.osc.reset();
            self.burst = Some(burst);
        }
    }

    fn next_sample(&mut self, snap: &ParamSnapshot) -> f32 {
        match self.family {
            CueFamily::ContinuousTone => {
                let frequency = self.frequency.next(snap.frequency);
                let volume = self.volume.next(snap.volume);
                tone::sample(&mut self.osc.primary, frequency, self.sample_rate) * volume
            }
            CueFamily::Siren => {
                let frequency = self.frequency.next(snap.frequency);
                let volume = self.volume.next(snap.volume);
                siren::sample(
                    &mut self.osc.primary,
                    &mut self.lfo,
                    frequency,
                    snap.modulation,
                    self.sample_rate,
                ) * volume
            }
            family => self.next_burst_sample(family),
        }
    }

    fn next_burst_sample(&mut self, family: CueFamily) -> f32 {
        let Some(burst) = self.burst.as_mut() else {
            return 0.0;
        };
        let step = burst.step();
        let (frequency, volume, mode, len) =
            (burst.frequency, burst.volume, burst.mode, burst.shape.pulse_len);

        let (pulse, pos) = match step {
            BurstStep::Silent => return 0.0,
            BurstStep::Finished => {
                self.burst = self.pending.take();
                return 0.0;
            }
            BurstStep::Sounding { pulse, pos } => (pulse, pos),
        };
        if pos == 0 {
            self.osc.reset();
        }

        let ctx = PulseContext {
            pulse,
            pos,
            len,
            frequency,
            mode,
            sample_rate: self.sample_rate,
        };
        let value = match family {
            CueFamily::Alert(tier) => alert::sample(tier, &mut self.osc, &ctx),
            CueFamily::Beacon => beacon::sample(&mut self.osc, &ctx),
            CueFamily::Collectible(kind) => chime::sample(kind, &mut self.osc, &ctx),
            CueFamily::ChargeUp => charge::sample(&mut self.osc, &ctx),
            CueFamily::ContinuousTone | CueFamily::Siren => 0.0,
        };
        value * volume
    }
}
