//! Beacon guidance toward a single point of interest.
//!
//! The host reports the target's lifecycle through [`BeaconEvent`]s. While
//! the target is descending a warble announces it; once it has landed,
//! sonar pings repeat faster and climb in pitch as the walking distance
//! shrinks, switch to a double beep inside the critical radius, and give
//! way to a steady tone inside the boarding zone.

use super::Director;
use crate::config::EchoCueWorldDesc;
use crate::events::{EchoCueEvent, emit};
use crate::math::{Listener, Vec3, lerp};
use crate::mixer::{ChannelHandle, Mixer};
use crate::output::CueOutput;
use crate::proximity::ProximityCurve;
use crate::spatial::Spatializer;
use crate::view::{EntityHandle, TickContext};
use crate::voice::{BeaconMode, CueFamily};
use crossbeam_channel::{Receiver, Sender};

/// How long the descent warning stays urgent after the target starts
/// descending, in seconds.
pub const LANDING_WARNING_SECS: f64 = 5.0;

const PING_LOW_HZ: f32 = 660.0;
const PING_HIGH_HZ: f32 = 1_100.0;
const ZONE_TONE_HZ: f32 = 1_046.5;
const ZONE_TONE_LEVEL: f32 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BeaconPhase {
    #[default]
    Idle,
    Descending,
    Landed,
    Boarded,
}

/// Beacon lifecycle input from the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BeaconEvent {
    TargetDescending { position: Vec3 },
    TargetLanded { position: Vec3 },
    /// The target moved without changing phase
    TargetMoved { position: Vec3 },
    /// Follow a moving entity (escort target) instead of a fixed point
    TrackEntity(EntityHandle),
    ListenerEntered,
    TargetCleared,
}

pub struct BeaconDirector {
    output: CueOutput,
    ping: ChannelHandle,
    zone_tone: ChannelHandle,
    inbox: Receiver<BeaconEvent>,
    events: Sender<EchoCueEvent>,
    phase: BeaconPhase,
    target: Option<Vec3>,
    tracked: Option<EntityHandle>,
    warning_until: f64,
    next_ping: f64,
    in_zone: bool,
    spatializer: Spatializer,
    sample_rate: u32,
}

impl BeaconDirector {
    pub fn new(
        desc: &EchoCueWorldDesc,
        inbox: Receiver<BeaconEvent>,
        events: Sender<EchoCueEvent>,
    ) -> Self {
        let mut mixer = Mixer::new(desc);
        let ping = mixer.add_channel(CueFamily::Beacon, 1.0);
        let zone_tone = mixer.add_channel(CueFamily::ContinuousTone, 1.0);
        Self {
            output: CueOutput::new("beacon", desc.clone(), mixer),
            ping,
            zone_tone,
            inbox,
            events,
            phase: BeaconPhase::Idle,
            target: None,
            tracked: None,
            warning_until: f64::NEG_INFINITY,
            next_ping: 0.0,
            in_zone: false,
            spatializer: Spatializer::default(),
            sample_rate: desc.sample_rate,
        }
    }

    pub fn phase(&self) -> BeaconPhase {
        self.phase
    }

    pub fn in_zone(&self) -> bool {
        self.in_zone
    }

    pub fn ping_channel(&self) -> &ChannelHandle {
        &self.ping
    }

    pub fn zone_channel(&self) -> &ChannelHandle {
        &self.zone_tone
    }

    fn set_phase(&mut self, to: BeaconPhase) {
        if self.phase == to {
            return;
        }
        let from = self.phase;
        self.phase = to;
        log::debug!("Beacon phase {:?} -> {:?}", from, to);
        emit(&self.events, EchoCueEvent::BeaconPhaseChanged { from, to });
    }

    fn apply(&mut self, event: BeaconEvent, now: f64) {
        match event {
            BeaconEvent::TargetDescending { position } => {
                self.target = Some(position);
                self.tracked = None;
                if self.phase != BeaconPhase::Descending {
                    self.warning_until = now + LANDING_WARNING_SECS;
                    self.next_ping = now;
                }
                self.set_phase(BeaconPhase::Descending);
            }
            BeaconEvent::TargetLanded { position } => {
                self.target = Some(position);
                if self.phase != BeaconPhase::Landed {
                    self.next_ping = now;
                }
                self.set_phase(BeaconPhase::Landed);
            }
            BeaconEvent::TargetMoved { position } => {
                self.target = Some(position);
            }
            BeaconEvent::TrackEntity(handle) => {
                self.tracked = Some(handle);
                if self.phase == BeaconPhase::Idle {
                    self.next_ping = now;
                    self.set_phase(BeaconPhase::Landed);
                }
            }
            BeaconEvent::ListenerEntered => self.set_phase(BeaconPhase::Boarded),
            BeaconEvent::TargetCleared => {
                self.target = None;
                self.tracked = None;
                self.set_phase(BeaconPhase::Idle);
            }
        }
    }

    fn set_zone(&mut self, inside: bool) {
        if self.in_zone == inside {
            return;
        }
        self.in_zone = inside;
        let event = if inside {
            EchoCueEvent::BeaconZoneEntered
        } else {
            EchoCueEvent::BeaconZoneExited
        };
        emit(&self.events, event);
    }

    /// Current target position. A stale tracked entity is dropped and the
    /// beacon falls back to the last fixed point, if any.
    fn resolve_target(&mut self, ctx: &TickContext<'_>) -> Option<Vec3> {
        if let Some(handle) = self.tracked {
            match ctx.world.position_of(handle) {
                Some(position) => return Some(position),
                None => {
                    log::debug!("Beacon escort {:?} is gone", handle);
                    self.tracked = None;
                }
            }
        }
        self.target
    }

    fn guide(&mut self, ctx: &TickContext<'_>, listener: &Listener, target: Vec3, gain: f32) {
        let settings = ctx.settings;
        let straight = listener.distance(target);
        let distance = ctx
            .world
            .path_distance(listener.position, target)
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(straight);
        let cue = self
            .spatializer
            .compute(listener.position, listener.forward, target);

        let inside = self.phase == BeaconPhase::Landed && distance < settings.beacon_zone_radius;
        self.set_zone(inside);
        if inside {
            self.ping.silence();
            self.zone_tone.set_pan(cue.pan);
            self.zone_tone.set_frequency(ZONE_TONE_HZ);
            self.zone_tone.set_volume(ZONE_TONE_LEVEL * gain);
            self.zone_tone.set_active(true);
            return;
        }
        self.zone_tone.silence();

        let curve = ProximityCurve::beacon().with_range(
            ProximityCurve::beacon().max_range,
            settings.beacon_critical_radius,
        );
        if ctx.now < self.next_ping {
            return;
        }

        let warning = self.phase == BeaconPhase::Descending && ctx.now < self.warning_until;
        let critical = curve.is_critical(distance);
        let (mode, pulses) = match self.phase {
            BeaconPhase::Descending => (BeaconMode::Warble, 1),
            _ if critical => (BeaconMode::Ping, 2),
            _ => (BeaconMode::PingEcho, 1),
        };
        let interval = if warning {
            curve.critical_interval
        } else {
            curve.next_interval(distance, 1)
        };
        let volume = if warning {
            curve.critical_volume
        } else {
            curve.intensity(distance, 1)
        };
        let urgency = curve.urgency(distance, 1);

        self.ping.set_pan(cue.pan);
        self.ping.set_mode(mode.as_mode());
        self.ping
            .set_frequency(lerp(PING_LOW_HZ, PING_HIGH_HZ, urgency) * cue.pitch_multiplier());
        self.ping.set_volume(volume * gain);
        self.ping.trigger(pulses, 0);
        // The double beep must finish before the next one starts.
        let burst = CueFamily::Beacon.burst_seconds(mode.as_mode(), pulses, 0, self.sample_rate);
        self.next_ping = ctx.now + f64::from(interval.max(burst));
    }
}

impl Director for BeaconDirector {
    fn label(&self) -> &'static str {
        "beacon"
    }

    fn tick(&mut self, ctx: &TickContext<'_>) {
        while let Ok(event) = self.inbox.try_recv() {
            self.apply(event, ctx.now);
        }

        let gain = ctx.settings.beacon.gain();
        let listener = match ctx.gameplay_listener() {
            Some(listener) if gain > 0.0 => listener,
            _ => {
                self.silence();
                return;
            }
        };
        if matches!(self.phase, BeaconPhase::Idle | BeaconPhase::Boarded) {
            self.set_zone(false);
            self.silence();
            return;
        }
        let Some(target) = self.resolve_target(ctx) else {
            self.silence();
            return;
        };
        if !self.output.ensure_started(&self.events) {
            return;
        }
        self.guide(ctx, &listener, target, gain);
    }

    fn silence(&mut self) {
        self.ping.silence();
        self.zone_tone.silence();
    }

    fn reset(&mut self) {
        self.silence();
        while self.inbox.try_recv().is_ok() {}
        self.set_zone(false);
        self.set_phase(BeaconPhase::Idle);
        self.target = None;
        self.tracked = None;
        self.warning_until = f64::NEG_INFINITY;
        self.next_ping = 0.0;
    }

    fn output(&mut self) -> &mut CueOutput {
        &mut self.output
    }
}
