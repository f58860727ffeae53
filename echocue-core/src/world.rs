use crate::config::{CueSettings, EchoCueWorldDesc};
use crate::director::{
    BeaconDirector, BeaconEvent, CollectibleDirector, Director, EnemyDirector, HazardDirector,
    HazardRecord, HazardRegistry, HazardRegistryHandle, PreviewCue, PreviewDirector,
    RegisterOutcome,
};
use crate::director::hazard::{DEFAULT_MERGE_TOLERANCE, DEFAULT_REGISTRY_CAPACITY};
use crate::error::Result;
use crate::events::{EVENT_QUEUE_CAPACITY, EchoCueEvent, RenderTimingEvent};
use crate::view::{EntityHandle, GamePhase, TickContext, WorldView};
use crate::voice::AttackTempo;
use crossbeam_channel::{Receiver, Sender, bounded, unbounded};

/// Main context object that owns every cue director.
///
/// `EchoCueWorld` lives on the logic thread. The host calls [`tick`](Self::tick)
/// once per game frame with a [`WorldView`] and the current settings; each
/// director then writes its channels' parameters, which the render callbacks
/// pick up on their own cadence.
///
/// # Architecture
///
/// - **Logic thread**: owns the `EchoCueWorld`, runs directors, drains events
/// - **Audio threads**: one device stream per cue family, reading channel
///   parameters without locks
///
/// Output devices are opened lazily on the first tick a family needs one and
/// released on [`shutdown`](Self::shutdown) or drop.
pub struct EchoCueWorld {
    desc: EchoCueWorldDesc,
    events_rx: Receiver<EchoCueEvent>,
    beacon_tx: Sender<BeaconEvent>,
    hazards: HazardRegistryHandle,
    enemies: EnemyDirector,
    hazard: HazardDirector,
    beacon: BeaconDirector,
    collectibles: CollectibleDirector,
    previews: PreviewDirector,
    mix_scratch: Vec<f32>,
}

impl EchoCueWorld {
    pub fn new(desc: EchoCueWorldDesc) -> Result<Self> {
        desc.validate()?;
        let (events_tx, events_rx) = bounded(EVENT_QUEUE_CAPACITY);
        let (beacon_tx, beacon_rx) = unbounded();
        let hazards = HazardRegistry::shared(
            DEFAULT_REGISTRY_CAPACITY,
            DEFAULT_MERGE_TOLERANCE,
            events_tx.clone(),
        );

        log::info!(
            "EchoCue world created: {} Hz, {} channels, {:?} output",
            desc.sample_rate,
            desc.channels,
            desc.output
        );

        Ok(Self {
            enemies: EnemyDirector::new(&desc, events_tx.clone()),
            hazard: HazardDirector::new(&desc, hazards.clone(), events_tx.clone()),
            beacon: BeaconDirector::new(&desc, beacon_rx, events_tx.clone()),
            collectibles: CollectibleDirector::new(&desc, events_tx.clone()),
            previews: PreviewDirector::new(&desc, events_tx),
            mix_scratch: vec![0.0; desc.max_block_frames * desc.channels as usize],
            desc,
            events_rx,
            beacon_tx,
            hazards,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.desc.sample_rate
    }

    pub fn config(&self) -> &EchoCueWorldDesc {
        &self.desc
    }

    fn directors(&mut self) -> [&mut dyn Director; 5] {
        [
            &mut self.enemies,
            &mut self.hazard,
            &mut self.beacon,
            &mut self.collectibles,
            &mut self.previews,
        ]
    }

    /// Runs every director once. `now` is the host clock in seconds.
    pub fn tick(
        &mut self,
        now: f64,
        phase: GamePhase,
        world: &dyn WorldView,
        settings: &CueSettings,
    ) {
        let ctx = TickContext::new(now, phase, world, settings);
        for director in self.directors() {
            director.tick(&ctx);
        }
    }

    /// Clears all scheduling state, hazards and beacon progress. Call on
    /// scene or world transitions.
    pub fn reset(&mut self) {
        log::debug!("Resetting cue state");
        for director in self.directors() {
            director.reset();
        }
    }

    /// Silences every channel without touching schedule state.
    pub fn silence(&mut self) {
        for director in self.directors() {
            director.silence();
        }
    }

    /// Drains every event emitted since the last call. At most
    /// [`EVENT_QUEUE_CAPACITY`] events are held between calls; later ones
    /// are dropped.
    pub fn poll_events(&self) -> Vec<EchoCueEvent> {
        self.events_rx.try_iter().collect()
    }

    /// Sender for beacon lifecycle input. May be cloned to other threads.
    pub fn beacon_events(&self) -> Sender<BeaconEvent> {
        self.beacon_tx.clone()
    }

    /// Shared hazard registry, for hosts that register from other threads.
    pub fn hazards(&self) -> HazardRegistryHandle {
        self.hazards.clone()
    }

    pub fn register_hazard(&self, record: HazardRecord) -> RegisterOutcome {
        HazardRegistry::lock(&self.hazards).register(record)
    }

    /// Queues a charge-up warning for an attack wind-up by `attacker`.
    pub fn telegraph(&mut self, attacker: EntityHandle, tempo: AttackTempo) {
        self.enemies.telegraph(attacker, tempo);
    }

    pub fn set_preview_focus(&mut self, focus: Option<PreviewCue>) {
        self.previews.set_focus(focus);
    }

    pub fn enemies(&self) -> &EnemyDirector {
        &self.enemies
    }

    pub fn hazard_director(&self) -> &HazardDirector {
        &self.hazard
    }

    pub fn beacon(&self) -> &BeaconDirector {
        &self.beacon
    }

    pub fn collectibles(&self) -> &CollectibleDirector {
        &self.collectibles
    }

    pub fn previews(&self) -> &PreviewDirector {
        &self.previews
    }

    /// Pulls one interleaved buffer summed over every detached output.
    /// Device-backed outputs contribute silence. Returns the frame count.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        out.fill(0.0);
        let channels = self.desc.channels.max(1) as usize;
        let block = self.mix_scratch.len().max(channels);
        let mut scratch = std::mem::take(&mut self.mix_scratch);

        for chunk in out.chunks_mut(block) {
            let buffer = &mut scratch[..chunk.len()];
            for director in self.directors() {
                director.output().render(buffer);
                for (sum, &value) in chunk.iter_mut().zip(buffer.iter()) {
                    *sum += value;
                }
            }
            for sample in chunk.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }

        self.mix_scratch = scratch;
        out.len() / channels
    }

    /// Render timings from every running device stream.
    pub fn drain_timing(&mut self) -> Vec<RenderTimingEvent> {
        let mut timings = Vec::new();
        for director in self.directors() {
            timings.extend(director.output().drain_timing());
        }
        timings
    }

    /// Silences every family and releases all output devices.
    pub fn shutdown(&mut self) {
        for director in self.directors() {
            director.shutdown();
        }
        log::info!("EchoCue world shut down");
    }
}

impl Drop for EchoCueWorld {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::director::HazardCategory;
    use crate::math::{Listener, Vec3};
    use crate::view::fake::FakeWorld;
    use crate::voice::EntityTier;

    fn world() -> EchoCueWorld {
        EchoCueWorld::new(EchoCueWorldDesc::detached().max_block_frames(256)).expect("valid desc")
    }

    #[test]
    fn test_new_rejects_invalid_desc() {
        assert!(EchoCueWorld::new(EchoCueWorldDesc::detached().sample_rate(0)).is_err());
    }

    #[test]
    fn test_render_fills_buffer_larger_than_scratch() {
        let mut cues = world();
        let mut host = FakeWorld::with_listener(Listener::default());
        host.add_hostile(1, Vec3::new(4.0, 0.0, -4.0), EntityTier::Elite);
        cues.tick(0.0, GamePhase::Gameplay, &host, &CueSettings::default());

        let mut out = vec![f32::NAN; 2048 * 2];
        assert_eq!(cues.render(&mut out), 2048);
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.0));
        assert!(out.iter().any(|s| s.abs() > 1e-3));
    }

    #[test]
    fn test_register_hazard_reports_outcome() {
        let cues = world();
        let record = HazardRecord::new(Vec3::new(2.0, 0.0, 0.0), 5.0, HazardCategory::GroundSpike);
        assert_eq!(cues.register_hazard(record), RegisterOutcome::Added);
        assert_eq!(cues.register_hazard(record), RegisterOutcome::Merged);
        assert_eq!(HazardRegistry::lock(&cues.hazards()).len(), 1);
    }

    #[test]
    fn test_reset_clears_hazards_and_beacon() {
        let mut cues = world();
        cues.register_hazard(HazardRecord::new(Vec3::ZERO, 5.0, HazardCategory::Explosive));
        cues.beacon_events()
            .send(BeaconEvent::TargetLanded {
                position: Vec3::new(0.0, 0.0, -30.0),
            })
            .expect("beacon inbox open");
        let host = FakeWorld::with_listener(Listener::default());
        cues.tick(0.0, GamePhase::Gameplay, &host, &CueSettings::default());

        cues.reset();
        assert!(HazardRegistry::lock(&cues.hazards()).is_empty());
        assert_eq!(cues.beacon().phase(), crate::director::BeaconPhase::Idle);
    }

    #[test]
    fn test_event_queue_holds_at_most_capacity_between_polls() {
        let cues = world();
        for i in 0..DEFAULT_REGISTRY_CAPACITY {
            let near = Vec3::new(2.0 * i as f32, 0.0, 0.0);
            cues.register_hazard(HazardRecord::new(near, 60.0, HazardCategory::Explosive));
        }
        for i in 0..EVENT_QUEUE_CAPACITY + 50 {
            let far = Vec3::new(1000.0 + 2.0 * i as f32, 0.0, 0.0);
            let outcome =
                cues.register_hazard(HazardRecord::new(far, 60.0, HazardCategory::Explosive));
            assert_eq!(outcome, RegisterOutcome::Dropped);
        }

        assert_eq!(cues.poll_events().len(), EVENT_QUEUE_CAPACITY);
        let far = Vec3::new(5000.0, 0.0, 0.0);
        cues.register_hazard(HazardRecord::new(far, 60.0, HazardCategory::Explosive));
        assert_eq!(
            cues.poll_events(),
            vec![EchoCueEvent::HazardDropped {
                category: HazardCategory::Explosive
            }]
        );
    }
}
