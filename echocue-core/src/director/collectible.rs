//! Collectible chimes: the nearest pickup in range announces itself with
//! its kind's chime on the shared proximity curve.

use super::Director;
use crate::config::EchoCueWorldDesc;
use crate::events::EchoCueEvent;
use crate::mixer::{ChannelHandle, Mixer};
use crate::output::CueOutput;
use crate::proximity::ProximityCurve;
use crate::spatial::Spatializer;
use crate::view::{Collectible, TickContext};
use crate::voice::{CollectibleKind, CueFamily};
use crossbeam_channel::Sender;

pub(crate) const CHIME_BASE_HZ: f32 = 1_318.5;

pub struct CollectibleDirector {
    output: CueOutput,
    chimes: Vec<ChannelHandle>,
    next_due: f64,
    spatializer: Spatializer,
    events: Sender<EchoCueEvent>,
}

impl CollectibleDirector {
    pub fn new(desc: &EchoCueWorldDesc, events: Sender<EchoCueEvent>) -> Self {
        let mut mixer = Mixer::new(desc);
        let chimes = CollectibleKind::ALL
            .iter()
            .map(|&kind| mixer.add_channel(CueFamily::Collectible(kind), 1.0))
            .collect();
        Self {
            output: CueOutput::new("collectible", desc.clone(), mixer),
            chimes,
            next_due: 0.0,
            spatializer: Spatializer::default(),
            events,
        }
    }

    pub fn chime_channel(&self, kind: CollectibleKind) -> &ChannelHandle {
        &self.chimes[kind.index()]
    }
}

impl Director for CollectibleDirector {
    fn label(&self) -> &'static str {
        "collectible"
    }

    fn tick(&mut self, ctx: &TickContext<'_>) {
        let gain = ctx.settings.collectibles.gain();
        let listener = match ctx.gameplay_listener() {
            Some(listener) if gain > 0.0 => listener,
            _ => {
                self.silence();
                return;
            }
        };
        if ctx.now < self.next_due {
            return;
        }

        let max_range = ctx.settings.collectible_max_range;
        let mut nearest: Option<(f32, Collectible)> = None;
        ctx.world.for_each_collectible(&mut |item| {
            let distance = listener.distance(item.position);
            if !distance.is_finite() || distance > max_range {
                return;
            }
            if nearest.is_none_or(|(best, _)| distance < best) {
                nearest = Some((distance, item));
            }
        });
        let Some((distance, item)) = nearest else {
            return;
        };
        if !self.output.ensure_started(&self.events) {
            return;
        }

        let curve = ProximityCurve::collectible()
            .with_range(max_range, ProximityCurve::collectible().critical_radius);
        let cue = self
            .spatializer
            .compute(listener.position, listener.forward, item.position);
        let chime = &self.chimes[item.kind.index()];
        chime.set_pan(cue.pan);
        chime.set_frequency(CHIME_BASE_HZ * cue.pitch_multiplier());
        chime.set_volume(curve.intensity(distance, 1) * gain);
        chime.trigger(1, 0);
        self.next_due = ctx.now + curve.next_interval(distance, 1) as f64;
    }

    fn silence(&mut self) {
        self.chimes.iter().for_each(ChannelHandle::silence);
    }

    fn reset(&mut self) {
        self.silence();
        self.next_due = 0.0;
    }

    fn output(&mut self) -> &mut CueOutput {
        &mut self.output
    }
}
