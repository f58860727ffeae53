//! Hazard warning sirens.
//!
//! Hazards are registered by the host with a lifetime. The registry is
//! bounded and deduplicated; every tick the closest hazards within the
//! channel budget each drive one siren channel.

use super::Director;
use crate::config::EchoCueWorldDesc;
use crate::events::{EchoCueEvent, emit};
use crate::math::Vec3;
use crate::mixer::{ChannelHandle, Mixer};
use crate::output::CueOutput;
use crate::proximity::ProximityCurve;
use crate::spatial::Spatializer;
use crate::view::{EntityHandle, TickContext, WorldView};
use crate::voice::CueFamily;
use crossbeam_channel::Sender;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Siren channels allocated up front. The per-tick budget may use fewer.
pub const MAX_HAZARD_CHANNELS: usize = 6;

pub const DEFAULT_REGISTRY_CAPACITY: usize = 16;

/// Registrations closer than this to an existing hazard of the same
/// category refresh it instead of adding a new record.
pub const DEFAULT_MERGE_TOLERANCE: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HazardCategory {
    /// Enemy about to self-destruct
    Explosive,
    FallingRock,
    GroundSpike,
}

impl HazardCategory {
    fn base_frequency(self) -> f32 {
        match self {
            Self::Explosive => 700.0,
            Self::FallingRock => 500.0,
            Self::GroundSpike => 900.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardRecord {
    pub position: Vec3,
    /// Host clock time after which the hazard is gone
    pub expires_at: f64,
    pub category: HazardCategory,
    /// Entity whose position the hazard follows
    pub tracked: Option<EntityHandle>,
}

impl HazardRecord {
    pub fn new(position: Vec3, expires_at: f64, category: HazardCategory) -> Self {
        Self {
            position,
            expires_at,
            category,
            tracked: None,
        }
    }

    pub fn tracking(mut self, handle: EntityHandle) -> Self {
        self.tracked = Some(handle);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Added,
    /// Refreshed an existing record instead of adding a duplicate
    Merged,
    /// Added by evicting the furthest record
    Evicted(HazardCategory),
    /// Not added: every record is closer than the new one
    Dropped,
}

/// Bounded set of active hazards.
///
/// Only touched on the logic side, so it is shared behind a plain mutex.
#[derive(Debug)]
pub struct HazardRegistry {
    records: Vec<HazardRecord>,
    capacity: usize,
    merge_tolerance: f32,
    /// Listener position at the last tick, used to rank records
    reference: Vec3,
    events: Sender<EchoCueEvent>,
}

pub type HazardRegistryHandle = Arc<Mutex<HazardRegistry>>;

impl HazardRegistry {
    pub fn new(capacity: usize, merge_tolerance: f32, events: Sender<EchoCueEvent>) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
            merge_tolerance: merge_tolerance.max(0.0),
            reference: Vec3::ZERO,
            events,
        }
    }

    pub fn shared(
        capacity: usize,
        merge_tolerance: f32,
        events: Sender<EchoCueEvent>,
    ) -> HazardRegistryHandle {
        Arc::new(Mutex::new(Self::new(capacity, merge_tolerance, events)))
    }

    /// Locks a shared registry. A poisoned lock is recovered: records are
    /// plain data and stay consistent.
    pub fn lock(handle: &HazardRegistryHandle) -> MutexGuard<'_, HazardRegistry> {
        handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn records(&self) -> &[HazardRecord] {
        &self.records
    }

    pub fn set_reference(&mut self, position: Vec3) {
        self.reference = position;
    }

    pub fn register(&mut self, record: HazardRecord) -> RegisterOutcome {
        if let Some(existing) = self.records.iter_mut().find(|r| {
            match (r.tracked, record.tracked) {
                (Some(a), Some(b)) => a == b,
                _ => {
                    r.category == record.category
                        && r.position.distance(record.position) <= self.merge_tolerance
                }
            }
        }) {
            existing.position = record.position;
            existing.expires_at = existing.expires_at.max(record.expires_at);
            existing.tracked = existing.tracked.or(record.tracked);
            return RegisterOutcome::Merged;
        }

        if self.records.len() < self.capacity {
            self.records.push(record);
            return RegisterOutcome::Added;
        }

        let reference = self.reference;
        let furthest = self
            .records
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(reference)
                    .total_cmp(&b.position.distance_squared(reference))
            })
            .map(|(index, r)| (index, r.position.distance_squared(reference)));

        match furthest {
            Some((index, furthest_distance))
                if record.position.distance_squared(reference) < furthest_distance =>
            {
                let evicted = std::mem::replace(&mut self.records[index], record);
                log::debug!(
                    "Hazard registry full, evicted {:?} for closer {:?}",
                    evicted.category,
                    record.category
                );
                emit(
                    &self.events,
                    EchoCueEvent::HazardEvicted {
                        category: evicted.category,
                    },
                );
                RegisterOutcome::Evicted(evicted.category)
            }
            _ => {
                log::debug!("Hazard registry full, dropped {:?}", record.category);
                emit(
                    &self.events,
                    EchoCueEvent::HazardDropped {
                        category: record.category,
                    },
                );
                RegisterOutcome::Dropped
            }
        }
    }

    /// Removes expired records and refreshes tracked ones. A tracked record
    /// whose entity is gone is removed.
    pub fn prune(&mut self, now: f64, world: &dyn WorldView) {
        self.records.retain_mut(|record| {
            if record.expires_at <= now {
                return false;
            }
            match record.tracked {
                Some(handle) => match world.position_of(handle) {
                    Some(position) => {
                        record.position = position;
                        true
                    }
                    None => false,
                },
                None => true,
            }
        });
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

pub struct HazardDirector {
    output: CueOutput,
    sirens: Vec<ChannelHandle>,
    registry: HazardRegistryHandle,
    /// (distance, record index), reused every tick
    order: Vec<(f32, usize)>,
    spatializer: Spatializer,
    events: Sender<EchoCueEvent>,
}

impl HazardDirector {
    pub fn new(
        desc: &EchoCueWorldDesc,
        registry: HazardRegistryHandle,
        events: Sender<EchoCueEvent>,
    ) -> Self {
        let mut mixer = Mixer::new(desc);
        let sirens = (0..MAX_HAZARD_CHANNELS)
            .map(|_| mixer.add_channel(CueFamily::Siren, 1.0))
            .collect();
        let capacity = HazardRegistry::lock(&registry).capacity();
        Self {
            output: CueOutput::new("hazard", desc.clone(), mixer),
            sirens,
            registry,
            order: Vec::with_capacity(capacity),
            spatializer: Spatializer::default(),
            events,
        }
    }

    pub fn registry(&self) -> &HazardRegistryHandle {
        &self.registry
    }

    pub fn siren_channel(&self, slot: usize) -> Option<&ChannelHandle> {
        self.sirens.get(slot)
    }
}

impl Director for HazardDirector {
    fn label(&self) -> &'static str {
        "hazard"
    }

    fn tick(&mut self, ctx: &TickContext<'_>) {
        let settings = ctx.settings;
        let mut registry = HazardRegistry::lock(&self.registry);
        registry.prune(ctx.now, ctx.world);

        let gain = settings.hazards.gain();
        let listener = match ctx.gameplay_listener() {
            Some(listener) if gain > 0.0 => listener,
            _ => {
                drop(registry);
                self.silence();
                return;
            }
        };
        registry.set_reference(listener.position);
        if registry.is_empty() {
            drop(registry);
            self.silence();
            return;
        }
        if !self.output.ensure_started(&self.events) {
            return;
        }

        self.order.clear();
        for (index, record) in registry.records().iter().enumerate() {
            let distance = listener.distance(record.position);
            if distance.is_finite() && distance <= settings.hazard_max_range {
                self.order.push((distance, index));
            }
        }
        self.order.sort_by(|a, b| a.0.total_cmp(&b.0));

        let curve = ProximityCurve::hazard()
            .with_range(settings.hazard_max_range, settings.hazard_critical_radius);
        let budget = settings.hazard_channel_budget.min(self.sirens.len());
        let count = self.order.len();

        for (slot, siren) in self.sirens.iter().enumerate() {
            let Some(&(distance, index)) = self.order.get(slot).filter(|_| slot < budget) else {
                siren.silence();
                continue;
            };
            let record = registry.records()[index];
            let cue = self
                .spatializer
                .compute(listener.position, listener.forward, record.position);
            let interval = curve.next_interval(distance, count).max(f32::EPSILON);

            siren.set_pan(cue.pan);
            siren.set_frequency(record.category.base_frequency() * cue.pitch_multiplier());
            siren.set_modulation(1.0 / interval);
            siren.set_volume(curve.intensity(distance, count) * gain);
            siren.set_active(true);
        }
    }

    fn silence(&mut self) {
        self.sirens.iter().for_each(ChannelHandle::silence);
    }

    fn reset(&mut self) {
        self.silence();
        HazardRegistry::lock(&self.registry).clear();
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
    use crate::view::GamePhase;
    use crate::view::fake::FakeWorld;
    use crate::voice::EntityTier;
    use crossbeam_channel::unbounded;

    fn registry(capacity: usize) -> (HazardRegistry, crossbeam_channel::Receiver<EchoCueEvent>) {
        let (tx, rx) = unbounded();
        (HazardRegistry::new(capacity, DEFAULT_MERGE_TOLERANCE, tx), rx)
    }

    fn at(x: f32) -> HazardRecord {
        HazardRecord::new(Vec3::new(x, 0.0, 0.0), 10.0, HazardCategory::FallingRock)
    }

    #[test]
    fn test_full_registry_evicts_furthest_for_closer_hazard() {
        let (mut registry, rx) = registry(3);
        for x in [5.0, 10.0, 20.0] {
            assert_eq!(registry.register(at(x)), RegisterOutcome::Added);
        }
        assert_eq!(
            registry.register(at(2.0)),
            RegisterOutcome::Evicted(HazardCategory::FallingRock)
        );
        assert_eq!(registry.len(), 3);
        assert!(registry.records().iter().all(|r| r.position.x < 20.0));
        assert!(matches!(rx.try_recv(), Ok(EchoCueEvent::HazardEvicted { .. })));
    }

    #[test]
    fn test_full_registry_drops_hazard_further_than_all() {
        let (mut registry, rx) = registry(2);
        registry.register(at(5.0));
        registry.register(at(10.0));
        assert_eq!(registry.register(at(25.0)), RegisterOutcome::Dropped);
        assert_eq!(registry.len(), 2);
        assert!(matches!(rx.try_recv(), Ok(EchoCueEvent::HazardDropped { .. })));
    }

    #[test]
    fn test_near_duplicate_registration_merges() {
        let (mut registry, _rx) = registry(4);
        registry.register(at(5.0));
        let mut again = at(5.5);
        again.expires_at = 20.0;
        assert_eq!(registry.register(again), RegisterOutcome::Merged);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.records()[0].expires_at, 20.0);

        let mut other = at(5.2);
        other.category = HazardCategory::GroundSpike;
        assert_eq!(registry.register(other), RegisterOutcome::Added);
    }

    #[test]
    fn test_prune_drops_expired_and_stale_tracked() {
        let (mut registry, _rx) = registry(4);
        let mut world = FakeWorld::with_listener(Listener::default());
        let bomber = world.add_hostile(7, Vec3::new(3.0, 0.0, 0.0), EntityTier::Normal);

        registry.register(at(8.0));
        registry.register(
            HazardRecord::new(Vec3::ZERO, 10.0, HazardCategory::Explosive).tracking(bomber),
        );
        registry.register(HazardRecord::new(
            Vec3::new(-9.0, 0.0, 0.0),
            1.0,
            HazardCategory::GroundSpike,
        ));

        registry.prune(2.0, &world);
        assert_eq!(registry.len(), 2);
        let tracked = registry
            .records()
            .iter()
            .find(|r| r.tracked.is_some())
            .expect("tracked hazard");
        assert_eq!(tracked.position, Vec3::new(3.0, 0.0, 0.0));

        world.despawn(bomber);
        registry.prune(3.0, &world);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_closest_hazards_get_channels_within_budget() {
        let (tx, _rx) = unbounded();
        let shared = HazardRegistry::shared(8, DEFAULT_MERGE_TOLERANCE, tx.clone());
        {
            let mut registry = HazardRegistry::lock(&shared);
            for x in [12.0, 3.0, 25.0, 7.0] {
                registry.register(at(x));
            }
        }
        let mut director = HazardDirector::new(&EchoCueWorldDesc::detached(), shared, tx);
        let world = FakeWorld::with_listener(Listener::default());
        let settings = CueSettings::default().hazard_channel_budget(2);
        director.tick(&TickContext::new(0.0, GamePhase::Gameplay, &world, &settings));

        let active: Vec<_> = (0..MAX_HAZARD_CHANNELS)
            .filter_map(|slot| director.siren_channel(slot))
            .filter(|c| c.is_active())
            .collect();
        assert_eq!(active.len(), 2);
        // Closest first: 3 then 7, closer is louder and faster.
        let first = director.siren_channel(0).expect("slot 0");
        let second = director.siren_channel(1).expect("slot 1");
        assert!(first.params().volume() >= second.params().volume());
        assert!(first.params().modulation() > second.params().modulation());
    }

    #[test]
    fn test_silenced_outside_gameplay_and_when_empty() {
        let (tx, _rx) = unbounded();
        let shared = HazardRegistry::shared(8, DEFAULT_MERGE_TOLERANCE, tx.clone());
        HazardRegistry::lock(&shared).register(at(4.0));
        let mut director = HazardDirector::new(&EchoCueWorldDesc::detached(), shared.clone(), tx);
        let world = FakeWorld::with_listener(Listener::default());
        let settings = CueSettings::default();

        director.tick(&TickContext::new(0.0, GamePhase::Gameplay, &world, &settings));
        assert!(director.siren_channel(0).is_some_and(ChannelHandle::is_active));

        director.tick(&TickContext::new(0.5, GamePhase::Loading, &world, &settings));
        assert!(!director.siren_channel(0).is_some_and(ChannelHandle::is_active));

        director.tick(&TickContext::new(11.0, GamePhase::Gameplay, &world, &settings));
        assert!(HazardRegistry::lock(&shared).is_empty());
        assert!(!director.siren_channel(0).is_some_and(ChannelHandle::is_active));
    }

    #[test]
    fn test_critical_radius_setting_switches_siren_to_critical_rate() {
        let (tx, _rx) = unbounded();
        let shared = HazardRegistry::shared(8, DEFAULT_MERGE_TOLERANCE, tx.clone());
        HazardRegistry::lock(&shared).register(at(6.0));
        let mut director = HazardDirector::new(&EchoCueWorldDesc::detached(), shared, tx);
        let world = FakeWorld::with_listener(Listener::default());
        let critical_rate = 1.0 / ProximityCurve::hazard().critical_interval;

        let settings = CueSettings::default();
        director.tick(&TickContext::new(0.0, GamePhase::Gameplay, &world, &settings));
        let rate = director.siren_channel(0).expect("slot 0").params().modulation();
        assert!(rate < critical_rate - 0.1);

        let settings = CueSettings::default().hazard_critical_radius(7.0);
        director.tick(&TickContext::new(0.1, GamePhase::Gameplay, &world, &settings));
        let rate = director.siren_channel(0).expect("slot 0").params().modulation();
        assert!((rate - critical_rate).abs() < 1e-3);
    }
}
