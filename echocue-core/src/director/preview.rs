//! Menu previews of each cue family.
//!
//! While the host is in a menu, focusing a cue setting plays one sample of
//! that cue, centered. Continuous cues stop after [`PREVIEW_SECS`].

use super::Director;
use super::collectible::CHIME_BASE_HZ;
use super::enemy::{CHARGE_BASE_HZ, CHARGE_PULSES, tier_base_frequency};
use crate::config::EchoCueWorldDesc;
use crate::events::EchoCueEvent;
use crate::mixer::{ChannelHandle, Mixer};
use crate::output::CueOutput;
use crate::view::{GamePhase, TickContext};
use crate::voice::{AttackTempo, BeaconMode, CollectibleKind, CueFamily, EntityTier};
use crossbeam_channel::Sender;

pub const PREVIEW_SECS: f64 = 1.5;

const PREVIEW_LEVEL: f32 = 0.6;
const BEACON_HZ: f32 = 880.0;
const SIREN_HZ: f32 = 700.0;
const SIREN_ALARM_RATE: f32 = 2.0;
const TONE_HZ: f32 = 523.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewCue {
    Alert(EntityTier),
    Beacon(BeaconMode),
    Siren,
    Tone,
    Collectible(CollectibleKind),
    ChargeUp(AttackTempo),
}

pub struct PreviewDirector {
    output: CueOutput,
    alerts: Vec<ChannelHandle>,
    beacon: ChannelHandle,
    siren: ChannelHandle,
    tone: ChannelHandle,
    chimes: Vec<ChannelHandle>,
    charge: ChannelHandle,
    focus: Option<PreviewCue>,
    played: Option<PreviewCue>,
    continuous_until: f64,
    events: Sender<EchoCueEvent>,
}

impl PreviewDirector {
    pub fn new(desc: &EchoCueWorldDesc, events: Sender<EchoCueEvent>) -> Self {
        let mut mixer = Mixer::new(desc);
        let alerts = EntityTier::ALL
            .iter()
            .map(|&tier| mixer.add_channel(CueFamily::Alert(tier), 1.0))
            .collect();
        let beacon = mixer.add_channel(CueFamily::Beacon, 1.0);
        let siren = mixer.add_channel(CueFamily::Siren, 1.0);
        let tone = mixer.add_channel(CueFamily::ContinuousTone, 1.0);
        let chimes = CollectibleKind::ALL
            .iter()
            .map(|&kind| mixer.add_channel(CueFamily::Collectible(kind), 1.0))
            .collect();
        let charge = mixer.add_channel(CueFamily::ChargeUp, 1.0);

        Self {
            output: CueOutput::new("preview", desc.clone(), mixer),
            alerts,
            beacon,
            siren,
            tone,
            chimes,
            charge,
            focus: None,
            played: None,
            continuous_until: f64::NEG_INFINITY,
            events,
        }
    }

    /// The cue the menu currently has focused.
    pub fn set_focus(&mut self, focus: Option<PreviewCue>) {
        self.focus = focus;
    }

    pub fn focus(&self) -> Option<PreviewCue> {
        self.focus
    }

    /// The channel a preview plays on.
    pub fn channel_for(&self, cue: PreviewCue) -> &ChannelHandle {
        match cue {
            PreviewCue::Alert(tier) => &self.alerts[tier.index()],
            PreviewCue::Beacon(_) => &self.beacon,
            PreviewCue::Siren => &self.siren,
            PreviewCue::Tone => &self.tone,
            PreviewCue::Collectible(kind) => &self.chimes[kind.index()],
            PreviewCue::ChargeUp(_) => &self.charge,
        }
    }

    fn play(&mut self, cue: PreviewCue, now: f64, gain: f32) {
        let volume = PREVIEW_LEVEL * gain;
        let channel = self.channel_for(cue);
        channel.set_pan(0.0);
        channel.set_volume(volume);
        match cue {
            PreviewCue::Alert(tier) => {
                channel.set_frequency(tier_base_frequency(tier));
                channel.trigger(1, 0);
            }
            PreviewCue::Beacon(mode) => {
                channel.set_mode(mode.as_mode());
                channel.set_frequency(BEACON_HZ);
                channel.trigger(1, 0);
            }
            PreviewCue::Collectible(_) => {
                channel.set_frequency(CHIME_BASE_HZ);
                channel.trigger(1, 0);
            }
            PreviewCue::ChargeUp(tempo) => {
                channel.set_mode(tempo.as_mode());
                channel.set_frequency(CHARGE_BASE_HZ);
                channel.trigger(CHARGE_PULSES, 0);
            }
            PreviewCue::Siren => {
                channel.set_frequency(SIREN_HZ);
                channel.set_modulation(SIREN_ALARM_RATE);
                channel.set_active(true);
                self.continuous_until = now + PREVIEW_SECS;
            }
            PreviewCue::Tone => {
                channel.set_frequency(TONE_HZ);
                channel.set_active(true);
                self.continuous_until = now + PREVIEW_SECS;
            }
        }
    }
}

impl Director for PreviewDirector {
    fn label(&self) -> &'static str {
        "preview"
    }

    fn tick(&mut self, ctx: &TickContext<'_>) {
        let gain = ctx.settings.previews.gain();
        if ctx.phase != GamePhase::Menu || gain <= 0.0 {
            self.silence();
            self.played = None;
            return;
        }

        if self.focus != self.played {
            self.silence();
            self.played = self.focus;
            if let Some(cue) = self.focus {
                if self.output.ensure_started(&self.events) {
                    log::debug!("Previewing {:?}", cue);
                    self.play(cue, ctx.now, gain);
                }
            }
        } else if ctx.now >= self.continuous_until {
            self.siren.silence();
            self.tone.silence();
        }
    }

    fn silence(&mut self) {
        self.alerts.iter().for_each(ChannelHandle::silence);
        self.chimes.iter().for_each(ChannelHandle::silence);
        self.beacon.silence();
        self.siren.silence();
        self.tone.silence();
        self.charge.silence();
    }

    fn reset(&mut self) {
        self.silence();
        self.played = None;
        self.continuous_until = f64::NEG_INFINITY;
    }

    fn output(&mut self) -> &mut CueOutput {
        &mut self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CueSettings;
    use crate::math::Listener;
    use crate::view::fake::FakeWorld;
    use crossbeam_channel::unbounded;

    fn fired(channel: &ChannelHandle) -> u32 {
        let mut seen = 0;
        let _ = channel.params().take_trigger(&mut seen);
        seen
    }

    fn tick(director: &mut PreviewDirector, phase: GamePhase, now: f64) {
        let world = FakeWorld::with_listener(Listener::default());
        let settings = CueSettings::default();
        director.tick(&TickContext::new(now, phase, &world, &settings));
    }

    fn director() -> PreviewDirector {
        let (tx, _rx) = unbounded();
        PreviewDirector::new(&EchoCueWorldDesc::detached(), tx)
    }

    #[test]
    fn test_focus_change_plays_once() {
        let mut director = director();
        let cue = PreviewCue::Alert(EntityTier::Boss);
        director.set_focus(Some(cue));
        tick(&mut director, GamePhase::Menu, 0.0);
        tick(&mut director, GamePhase::Menu, 0.1);
        tick(&mut director, GamePhase::Menu, 0.2);
        assert_eq!(fired(director.channel_for(cue)), 1);

        director.set_focus(Some(PreviewCue::Beacon(BeaconMode::Warble)));
        tick(&mut director, GamePhase::Menu, 0.3);
        let beacon = director.channel_for(PreviewCue::Beacon(BeaconMode::Warble));
        assert_eq!(fired(beacon), 1);
        assert_eq!(beacon.params().mode(), BeaconMode::Warble.as_mode());
    }

    #[test]
    fn test_siren_preview_expires_on_logic_clock() {
        let mut director = director();
        director.set_focus(Some(PreviewCue::Siren));
        tick(&mut director, GamePhase::Menu, 0.0);
        assert!(director.channel_for(PreviewCue::Siren).is_active());
        tick(&mut director, GamePhase::Menu, 1.0);
        assert!(director.channel_for(PreviewCue::Siren).is_active());
        tick(&mut director, GamePhase::Menu, PREVIEW_SECS + 0.01);
        assert!(!director.channel_for(PreviewCue::Siren).is_active());
    }

    #[test]
    fn test_silent_outside_menus() {
        let mut director = director();
        director.set_focus(Some(PreviewCue::Tone));
        tick(&mut director, GamePhase::Gameplay, 0.0);
        assert!(!director.channel_for(PreviewCue::Tone).is_active());

        tick(&mut director, GamePhase::Menu, 0.1);
        assert!(director.channel_for(PreviewCue::Tone).is_active());
        tick(&mut director, GamePhase::Gameplay, 0.2);
        assert!(!director.channel_for(PreviewCue::Tone).is_active());
    }
}
