//! Scripted arena the demo ticks the cue world against.

use echocue_core::{
    Collectible, CollectibleKind, EntityHandle, EntityTier, HostileEntity, Listener, Vec3,
    WorldView,
};
use std::f32::consts::FRAC_PI_2;

pub struct Arena {
    listener: Listener,
    hostiles: Vec<HostileEntity>,
    collectibles: Vec<Collectible>,
}

impl Arena {
    pub fn new() -> Self {
        let tiers = [
            EntityTier::Normal,
            EntityTier::Elite,
            EntityTier::Normal,
            EntityTier::Boss,
        ];
        let hostiles = tiers
            .iter()
            .enumerate()
            .map(|(i, &tier)| HostileEntity {
                handle: EntityHandle::new(i as u32, 0),
                position: Vec3::ZERO,
                tier,
                alive: true,
            })
            .collect();
        let collectibles = vec![
            Collectible {
                handle: EntityHandle::new(100, 0),
                position: Vec3::new(-6.0, 0.0, -2.0),
                kind: CollectibleKind::Health,
            },
            Collectible {
                handle: EntityHandle::new(101, 0),
                position: Vec3::new(9.0, 0.0, 8.0),
                kind: CollectibleKind::Artifact,
            },
        ];

        let mut arena = Self {
            listener: Listener::default(),
            hostiles,
            collectibles,
        };
        arena.advance(0.0);
        arena
    }

    pub fn hostile(&self, slot: usize) -> Option<EntityHandle> {
        self.hostiles.get(slot).map(|h| h.handle)
    }

    /// Moves everything to where the script has it at `t` seconds.
    pub fn advance(&mut self, t: f64) {
        let t = t as f32;
        for (i, hostile) in self.hostiles.iter_mut().enumerate() {
            let radius = 5.0 + 6.0 * i as f32;
            let angle = 0.35 * t + i as f32 * FRAC_PI_2;
            hostile.position = Vec3::new(radius * angle.cos(), 0.0, radius * angle.sin());
        }
        // The elite goes down partway through.
        if t >= 8.0 {
            if let Some(elite) = self.hostiles.get_mut(1) {
                elite.alive = false;
            }
        }

        let yaw = 0.15 * t;
        self.listener = Listener::new(Vec3::ZERO, Vec3::new(yaw.sin(), 0.0, -yaw.cos()));
    }
}

impl WorldView for Arena {
    fn listener(&self) -> Option<Listener> {
        Some(self.listener)
    }

    fn for_each_hostile(&self, visit: &mut dyn FnMut(HostileEntity)) {
        for hostile in &self.hostiles {
            visit(*hostile);
        }
    }

    fn is_alive(&self, handle: EntityHandle) -> bool {
        self.hostiles
            .iter()
            .any(|h| h.handle == handle && h.alive)
    }

    fn position_of(&self, handle: EntityHandle) -> Option<Vec3> {
        self.hostiles
            .iter()
            .find(|h| h.handle == handle && h.alive)
            .map(|h| h.position)
    }

    fn for_each_collectible(&self, visit: &mut dyn FnMut(Collectible)) {
        for item in &self.collectibles {
            visit(*item);
        }
    }
}
