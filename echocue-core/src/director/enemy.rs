//! Enemy direction cues.
//!
//! Hostiles are sorted into eight sectors around the listener. Each
//! (sector, tier) pair has its own alert channel and its own schedule, and
//! is cued from the closest entity of that tier in that sector. Sectors
//! fired in the same tick are staggered so they stay audibly separate.
//! A channel is never re-triggered before its previous beep, stagger
//! included, has finished.

use super::Director;
use crate::config::EchoCueWorldDesc;
use crate::events::EchoCueEvent;
use crate::math::{Listener, Vec3};
use crate::mixer::{ChannelHandle, Mixer};
use crate::output::CueOutput;
use crate::proximity::ProximityCurve;
use crate::spatial::{OCTANTS, Spatializer, octant_of};
use crate::view::{EntityHandle, TickContext};
use crate::voice::{AttackTempo, CueFamily, EntityTier};
use crossbeam_channel::Sender;
use std::collections::VecDeque;

/// Silent prefix per sector index, in samples (30 ms at 44.1 kHz).
pub const STAGGER_SAMPLES: u32 = 1_323;

const MAX_PENDING_TELEGRAPHS: usize = 8;
/// Charge-up channels, so attackers winding up together are heard apart.
pub const CHARGE_CHANNELS: usize = 4;
pub(crate) const CHARGE_BASE_HZ: f32 = 110.0;
pub(crate) const CHARGE_PULSES: u32 = 4;

pub(crate) fn tier_base_frequency(tier: EntityTier) -> f32 {
    match tier {
        EntityTier::Normal => 880.0,
        EntityTier::Elite => 660.0,
        EntityTier::Boss => 220.0,
        EntityTier::Rare => 520.0,
    }
}

/// Closest entity and head count for one (sector, tier) this tick.
#[derive(Debug, Clone, Copy)]
struct DirectionBucket {
    count: usize,
    closest: f32,
    position: Vec3,
}

impl DirectionBucket {
    const EMPTY: Self = Self {
        count: 0,
        closest: f32::INFINITY,
        position: Vec3::ZERO,
    };

    fn offer(&mut self, distance: f32, position: Vec3) {
        self.count += 1;
        if distance < self.closest {
            self.closest = distance;
            self.position = position;
        }
    }
}

pub struct EnemyDirector {
    output: CueOutput,
    alerts: Vec<ChannelHandle>,
    charges: Vec<ChannelHandle>,
    charge_busy_until: [f64; CHARGE_CHANNELS],
    buckets: [[DirectionBucket; EntityTier::COUNT]; OCTANTS],
    next_due: [[f64; EntityTier::COUNT]; OCTANTS],
    telegraphs: VecDeque<(EntityHandle, AttackTempo)>,
    spatializer: Spatializer,
    sample_rate: u32,
    events: Sender<EchoCueEvent>,
}

impl EnemyDirector {
    pub fn new(desc: &EchoCueWorldDesc, events: Sender<EchoCueEvent>) -> Self {
        let mut mixer = Mixer::new(desc);
        let mut alerts = Vec::with_capacity(OCTANTS * EntityTier::COUNT);
        for _ in 0..OCTANTS {
            for tier in EntityTier::ALL {
                alerts.push(mixer.add_channel(CueFamily::Alert(tier), 1.0));
            }
        }
        let charges = (0..CHARGE_CHANNELS)
            .map(|_| mixer.add_channel(CueFamily::ChargeUp, 1.0))
            .collect();

        Self {
            output: CueOutput::new("enemy", desc.clone(), mixer),
            alerts,
            charges,
            charge_busy_until: [f64::NEG_INFINITY; CHARGE_CHANNELS],
            buckets: [[DirectionBucket::EMPTY; EntityTier::COUNT]; OCTANTS],
            next_due: [[0.0; EntityTier::COUNT]; OCTANTS],
            telegraphs: VecDeque::with_capacity(MAX_PENDING_TELEGRAPHS),
            spatializer: Spatializer::default(),
            sample_rate: desc.sample_rate,
            events,
        }
    }

    pub fn alert_channel(&self, octant: usize, tier: EntityTier) -> &ChannelHandle {
        &self.alerts[octant * EntityTier::COUNT + tier.index()]
    }

    pub fn charge_channel(&self, slot: usize) -> Option<&ChannelHandle> {
        self.charges.get(slot)
    }

    /// Requests still waiting for a free charge-up channel.
    pub fn pending_telegraphs(&self) -> usize {
        self.telegraphs.len()
    }

    /// Queues a charge-up cue for an attack wind-up by `handle`. It plays on
    /// the first gameplay tick with a free charge-up channel. The oldest
    /// request is dropped when the queue is full.
    pub fn telegraph(&mut self, handle: EntityHandle, tempo: AttackTempo) {
        if self.telegraphs.len() == MAX_PENDING_TELEGRAPHS {
            self.telegraphs.pop_front();
        }
        self.telegraphs.push_back((handle, tempo));
    }

    fn rebuild_buckets(&mut self, ctx: &TickContext<'_>, listener: &Listener) {
        self.buckets = [[DirectionBucket::EMPTY; EntityTier::COUNT]; OCTANTS];
        let max_range = ctx.settings.enemy_max_range;
        let buckets = &mut self.buckets;
        let spatializer = &self.spatializer;

        ctx.world.for_each_hostile(&mut |entity| {
            if !entity.alive {
                return;
            }
            let distance = listener.distance(entity.position);
            if !distance.is_finite() || distance > max_range {
                return;
            }
            let bearing = spatializer
                .bearing(listener.position, listener.forward, entity.position)
                .unwrap_or(0.0);
            buckets[octant_of(bearing)][entity.tier.index()].offer(distance, entity.position);
        });
    }

    fn schedule_alerts(&mut self, ctx: &TickContext<'_>, listener: &Listener, gain: f32) {
        let curve = ProximityCurve::enemy().with_range(
            ctx.settings.enemy_max_range,
            ctx.settings.enemy_critical_radius,
        );

        for octant in 0..OCTANTS {
            for tier in EntityTier::ALL {
                let bucket = self.buckets[octant][tier.index()];
                let due = &mut self.next_due[octant][tier.index()];
                if bucket.count == 0 || ctx.now < *due {
                    continue;
                }

                let cue =
                    self.spatializer
                        .compute(listener.position, listener.forward, bucket.position);
                let channel = &self.alerts[octant * EntityTier::COUNT + tier.index()];
                channel.set_pan(cue.pan);
                channel.set_frequency(tier_base_frequency(tier) * cue.pitch_multiplier());
                channel.set_volume(curve.intensity(bucket.closest, bucket.count) * gain);
                let stagger = octant as u32 * STAGGER_SAMPLES;
                channel.trigger(1, stagger);

                let burst =
                    CueFamily::Alert(tier).burst_seconds(0, 1, stagger, self.sample_rate);
                let interval = curve.next_interval(bucket.closest, bucket.count);
                *due = ctx.now + f64::from(interval.max(burst));
            }
        }
    }

    fn fire_telegraphs(&mut self, ctx: &TickContext<'_>, listener: &Listener, gain: f32) {
        let curve = ProximityCurve::enemy().with_range(
            ctx.settings.enemy_max_range,
            ctx.settings.enemy_critical_radius,
        );

        while let Some(&(handle, tempo)) = self.telegraphs.front() {
            let position = if ctx.world.is_alive(handle) {
                ctx.world.position_of(handle)
            } else {
                None
            };
            let Some(position) = position else {
                log::debug!("Telegraph for stale entity {:?} dropped", handle);
                self.telegraphs.pop_front();
                continue;
            };
            if gain <= 0.0 {
                self.telegraphs.pop_front();
                continue;
            }
            let Some(slot) = self
                .charge_busy_until
                .iter()
                .position(|&busy_until| ctx.now >= busy_until)
            else {
                break;
            };
            self.telegraphs.pop_front();

            let cue = self
                .spatializer
                .compute(listener.position, listener.forward, position);
            let distance = listener.distance(position);
            let charge = &self.charges[slot];
            charge.set_pan(cue.pan);
            charge.set_mode(tempo.as_mode());
            charge.set_frequency(CHARGE_BASE_HZ * cue.pitch_multiplier());
            charge.set_volume(curve.intensity(distance, 1) * gain);
            charge.trigger(CHARGE_PULSES, 0);

            let burst = CueFamily::ChargeUp.burst_seconds(
                tempo.as_mode(),
                CHARGE_PULSES,
                0,
                self.sample_rate,
            );
            self.charge_busy_until[slot] = ctx.now + f64::from(burst);
        }
    }
}

impl Director for EnemyDirector {
    fn label(&self) -> &'static str {
        "enemy"
    }

    fn tick(&mut self, ctx: &TickContext<'_>) {
        let Some(listener) = ctx.gameplay_listener() else {
            self.silence();
            return;
        };
        let alert_gain = ctx.settings.enemies.gain();
        let telegraph_gain = ctx.settings.telegraphs.gain();
        if alert_gain <= 0.0 && telegraph_gain <= 0.0 {
            self.silence();
            return;
        }
        if !self.output.ensure_started(&self.events) {
            self.telegraphs.clear();
            return;
        }

        self.rebuild_buckets(ctx, &listener);
        if alert_gain > 0.0 {
            self.schedule_alerts(ctx, &listener, alert_gain);
        } else {
            self.alerts.iter().for_each(ChannelHandle::silence);
        }
        self.fire_telegraphs(ctx, &listener, telegraph_gain);
    }

    fn silence(&mut self) {
        self.alerts.iter().for_each(ChannelHandle::silence);
        self.charges.iter().for_each(ChannelHandle::silence);
        self.charge_busy_until = [f64::NEG_INFINITY; CHARGE_CHANNELS];
        self.telegraphs.clear();
    }

    fn reset(&mut self) {
        self.silence();
        self.buckets = [[DirectionBucket::EMPTY; EntityTier::COUNT]; OCTANTS];
        self.next_due = [[0.0; EntityTier::COUNT]; OCTANTS];
    }

    fn output(&mut self) -> &mut CueOutput {
        &mut self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CueSettings;
    use crate::proximity::ProximityCurve;
    use crate::view::{GamePhase, WorldView};
    use crate::view::fake::FakeWorld;
    use crossbeam_channel::unbounded;

    fn director() -> EnemyDirector {
        let (tx, _rx) = unbounded();
        EnemyDirector::new(&EchoCueWorldDesc::detached(), tx)
    }

    fn trigger_seq(channel: &ChannelHandle) -> u32 {
        let mut seen = 0;
        let _ = channel.params().take_trigger(&mut seen);
        seen
    }

    fn tick(director: &mut EnemyDirector, world: &FakeWorld, now: f64) {
        let settings = CueSettings::default();
        director.tick(&TickContext::new(now, GamePhase::Gameplay, world, &settings));
    }

    #[test]
    fn test_entity_ahead_triggers_front_sector_with_ahead_pitch() {
        let mut world = FakeWorld::with_listener(Listener::default());
        world.add_hostile(1, Vec3::new(0.0, 0.0, -10.0), EntityTier::Normal);
        let mut director = director();
        tick(&mut director, &world, 0.0);

        let channel = director.alert_channel(0, EntityTier::Normal);
        assert_eq!(trigger_seq(channel), 1);
        assert!(channel.params().pan().abs() < 1e-5);
        let expected = 880.0 * Spatializer::default().ahead_pitch;
        assert!((channel.params().frequency() - expected).abs() < 0.5);
    }

    #[test]
    fn test_each_tier_in_a_sector_gets_its_own_channel() {
        let mut world = FakeWorld::with_listener(Listener::default());
        world.add_hostile(1, Vec3::new(10.0, 0.0, 0.0), EntityTier::Normal);
        world.add_hostile(2, Vec3::new(12.0, 0.0, 0.5), EntityTier::Boss);
        let mut director = director();
        tick(&mut director, &world, 0.0);

        assert_eq!(trigger_seq(director.alert_channel(2, EntityTier::Normal)), 1);
        assert_eq!(trigger_seq(director.alert_channel(2, EntityTier::Boss)), 1);
        assert_eq!(trigger_seq(director.alert_channel(2, EntityTier::Elite)), 0);
        assert_eq!(trigger_seq(director.alert_channel(0, EntityTier::Normal)), 0);
    }

    #[test]
    fn test_co_triggered_sectors_are_staggered_by_index() {
        let mut world = FakeWorld::with_listener(Listener::default());
        world.add_hostile(1, Vec3::new(0.0, 0.0, -10.0), EntityTier::Normal);
        world.add_hostile(2, Vec3::new(0.0, 0.0, 10.0), EntityTier::Normal);
        let mut director = director();
        tick(&mut director, &world, 0.0);

        let mut seen = 0;
        let front = director
            .alert_channel(0, EntityTier::Normal)
            .params()
            .take_trigger(&mut seen)
            .expect("front trigger");
        let mut seen = 0;
        let back = director
            .alert_channel(4, EntityTier::Normal)
            .params()
            .take_trigger(&mut seen)
            .expect("back trigger");
        assert_eq!(front.stagger_samples, 0);
        assert_eq!(back.stagger_samples, 4 * STAGGER_SAMPLES);
    }

    #[test]
    fn test_schedule_throttles_until_interval_elapses() {
        let mut world = FakeWorld::with_listener(Listener::default());
        world.add_hostile(1, Vec3::new(-20.0, 0.0, 0.0), EntityTier::Elite);
        let mut director = director();
        tick(&mut director, &world, 0.0);
        tick(&mut director, &world, 0.05);
        let channel = director.alert_channel(6, EntityTier::Elite);
        assert_eq!(trigger_seq(channel), 1);

        tick(&mut director, &world, 5.0);
        assert_eq!(trigger_seq(director.alert_channel(6, EntityTier::Elite)), 2);
    }

    #[test]
    fn test_reset_clears_schedule() {
        let mut world = FakeWorld::with_listener(Listener::default());
        world.add_hostile(1, Vec3::new(-20.0, 0.0, 0.0), EntityTier::Rare);
        let mut director = director();
        tick(&mut director, &world, 0.0);
        director.reset();
        tick(&mut director, &world, 0.01);
        assert_eq!(trigger_seq(director.alert_channel(6, EntityTier::Rare)), 2);
    }

    #[test]
    fn test_out_of_range_and_dead_entities_are_ignored() {
        let mut world = FakeWorld::with_listener(Listener::default());
        world.add_hostile(1, Vec3::new(0.0, 0.0, -80.0), EntityTier::Normal);
        let handle = world.add_hostile(2, Vec3::new(0.0, 0.0, -5.0), EntityTier::Elite);
        world.hostiles[1].alive = false;
        let mut director = director();
        tick(&mut director, &world, 0.0);
        assert_eq!(trigger_seq(director.alert_channel(0, EntityTier::Normal)), 0);
        assert_eq!(trigger_seq(director.alert_channel(0, EntityTier::Elite)), 0);
        assert!(!world.is_alive(handle));
    }

    #[test]
    fn test_outside_gameplay_silences_everything() {
        let mut world = FakeWorld::with_listener(Listener::default());
        world.add_hostile(1, Vec3::new(0.0, 0.0, -5.0), EntityTier::Normal);
        let mut director = director();
        tick(&mut director, &world, 0.0);
        assert!(director.alert_channel(0, EntityTier::Normal).is_active());

        let settings = CueSettings::default();
        director.tick(&TickContext::new(1.0, GamePhase::Paused, &world, &settings));
        assert!(director.alerts.iter().all(|c| !c.is_active()));
    }

    #[test]
    fn test_telegraph_fires_for_live_entity_and_drops_stale_one() {
        let mut world = FakeWorld::with_listener(Listener::default());
        let live = world.add_hostile(1, Vec3::new(3.0, 0.0, 0.0), EntityTier::Boss);
        let mut director = director();

        director.telegraph(EntityHandle::new(99, 0), AttackTempo::Fast);
        tick(&mut director, &world, 0.0);
        assert!(director.charges.iter().all(|c| trigger_seq(c) == 0));
        assert_eq!(director.pending_telegraphs(), 0);

        director.telegraph(live, AttackTempo::Slow);
        tick(&mut director, &world, 0.1);
        let charge = director.charge_channel(0).expect("charge slot");
        assert_eq!(trigger_seq(charge), 1);
        assert_eq!(charge.params().mode(), AttackTempo::Slow.as_mode());
        assert!(charge.params().pan() > 0.9);
    }

    #[test]
    fn test_telegraph_queue_is_bounded() {
        let mut director = director();
        for i in 0..20 {
            director.telegraph(EntityHandle::new(i, 0), AttackTempo::Medium);
        }
        assert_eq!(director.telegraphs.len(), MAX_PENDING_TELEGRAPHS);
        assert_eq!(director.telegraphs[0].0, EntityHandle::new(12, 0));
    }

    #[test]
    fn test_same_tick_telegraphs_play_on_separate_channels() {
        let mut world = FakeWorld::with_listener(Listener::default());
        let right = world.add_hostile(1, Vec3::new(4.0, 0.0, 0.0), EntityTier::Elite);
        let left = world.add_hostile(2, Vec3::new(-4.0, 0.0, 0.0), EntityTier::Boss);
        let mut director = director();

        director.telegraph(right, AttackTempo::Fast);
        director.telegraph(left, AttackTempo::Slow);
        tick(&mut director, &world, 0.0);

        let first = director.charge_channel(0).expect("charge slot");
        let second = director.charge_channel(1).expect("charge slot");
        assert_eq!(trigger_seq(first), 1);
        assert_eq!(trigger_seq(second), 1);
        assert!(first.params().pan() > 0.9);
        assert!(second.params().pan() < -0.9);
        assert_eq!(first.params().mode(), AttackTempo::Fast.as_mode());
        assert_eq!(second.params().mode(), AttackTempo::Slow.as_mode());
    }

    #[test]
    fn test_telegraphs_wait_for_a_free_charge_channel() {
        let mut world = FakeWorld::with_listener(Listener::default());
        let attacker = world.add_hostile(1, Vec3::new(0.0, 0.0, -6.0), EntityTier::Normal);
        let mut director = director();
        for _ in 0..CHARGE_CHANNELS + 2 {
            director.telegraph(attacker, AttackTempo::Medium);
        }

        tick(&mut director, &world, 0.0);
        assert_eq!(director.pending_telegraphs(), 2);
        tick(&mut director, &world, 0.05);
        assert_eq!(director.pending_telegraphs(), 2);

        let burst = CueFamily::ChargeUp.burst_seconds(
            AttackTempo::Medium.as_mode(),
            CHARGE_PULSES,
            0,
            44_100,
        );
        tick(&mut director, &world, f64::from(burst) + 0.01);
        assert_eq!(director.pending_telegraphs(), 0);
        assert_eq!(trigger_seq(director.charge_channel(0).expect("charge slot")), 2);
        assert_eq!(trigger_seq(director.charge_channel(1).expect("charge slot")), 2);
    }

    #[test]
    fn test_normal_tier_has_the_highest_base_pitch() {
        let normal = tier_base_frequency(EntityTier::Normal);
        for tier in [EntityTier::Elite, EntityTier::Boss, EntityTier::Rare] {
            assert!(tier_base_frequency(tier) < normal, "{tier:?}");
        }
    }

    #[test]
    fn test_retrigger_waits_for_staggered_beep_to_finish() {
        let mut world = FakeWorld::with_listener(Listener::default());
        world.add_hostile(1, Vec3::new(-1.5, 0.0, -1.5), EntityTier::Normal);
        let mut director = director();
        let critical = ProximityCurve::enemy().critical_interval as f64;

        tick(&mut director, &world, 0.0);
        tick(&mut director, &world, critical + 0.01);
        assert_eq!(trigger_seq(director.alert_channel(7, EntityTier::Normal)), 1);

        let burst = CueFamily::Alert(EntityTier::Normal).burst_seconds(
            0,
            1,
            7 * STAGGER_SAMPLES,
            44_100,
        );
        tick(&mut director, &world, f64::from(burst) + 0.01);
        assert_eq!(trigger_seq(director.alert_channel(7, EntityTier::Normal)), 2);
    }

    const TICK_FRAMES: usize = 735;

    /// Ticks at 60 Hz, rendering one tick of stereo audio after each.
    fn run(director: &mut EnemyDirector, world: &FakeWorld, seconds: f64) -> Vec<f32> {
        let ticks = (seconds * 60.0) as usize;
        let mut out = vec![0.0; ticks * TICK_FRAMES * 2];
        for (i, chunk) in out.chunks_mut(TICK_FRAMES * 2).enumerate() {
            tick(director, world, i as f64 / 60.0);
            director.output().render(chunk);
        }
        out
    }

    #[test]
    fn test_critical_enemy_behind_is_heard_in_full_in_every_rear_sector() {
        use crate::director::testing::sounding_runs;

        let pulse_frames =
            (CueFamily::Alert(EntityTier::Normal).burst_seconds(0, 1, 0, 44_100) * 44_100.0)
                as usize;
        for octant in 4..OCTANTS {
            let bearing = octant as f32 * std::f32::consts::FRAC_PI_4;
            let position = Vec3::new(2.0 * bearing.sin(), 0.0, -2.0 * bearing.cos());
            let mut world = FakeWorld::with_listener(Listener::default());
            world.add_hostile(1, position, EntityTier::Normal);
            let mut director = director();

            let audio = run(&mut director, &world, 2.0);
            let runs = sounding_runs(&audio);
            assert!(runs.len() >= 5, "octant {octant}: {} beeps", runs.len());
            // The last beep may be cut by the end of the render.
            for &(start, len) in &runs[..runs.len() - 1] {
                assert!(
                    len + 300 >= pulse_frames,
                    "octant {octant}: beep at {start} lasted {len} of {pulse_frames}"
                );
            }
        }
    }
}
