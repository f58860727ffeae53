//! The world-state interface the directors read from.
//!
//! The host game implements [`WorldView`] over its own entity storage and
//! passes it into every tick. Entities are addressed by generation-counted
//! [`EntityHandle`]s so a despawned entity is detected instead of aliased.

use crate::config::CueSettings;
use crate::math::{Listener, Vec3};
use crate::voice::{CollectibleKind, EntityTier};

/// Generation-counted index into the host's entity storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityHandle {
    pub index: u32,
    pub generation: u32,
}

impl EntityHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostileEntity {
    pub handle: EntityHandle,
    pub position: Vec3,
    pub tier: EntityTier,
    pub alive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collectible {
    pub handle: EntityHandle,
    pub position: Vec3,
    pub kind: CollectibleKind,
}

/// Read-only view of the game world for one logic tick.
pub trait WorldView {
    /// The listener pose, or `None` while there is no controllable avatar.
    fn listener(&self) -> Option<Listener>;

    /// Visits every hostile entity currently known to the host.
    fn for_each_hostile(&self, visit: &mut dyn FnMut(HostileEntity));

    /// Whether `handle` still refers to a live entity.
    fn is_alive(&self, handle: EntityHandle) -> bool;

    /// Current position of a live entity. Stale handles return `None`.
    fn position_of(&self, handle: EntityHandle) -> Option<Vec3>;

    fn for_each_collectible(&self, _visit: &mut dyn FnMut(Collectible)) {}

    /// Walking distance along the navigation mesh, when the host has one.
    fn path_distance(&self, _from: Vec3, _to: Vec3) -> Option<f32> {
        None
    }
}

/// Coarse game state consulted by every director before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GamePhase {
    #[default]
    Gameplay,
    Menu,
    Loading,
    Paused,
}

impl GamePhase {
    pub fn is_gameplay(self) -> bool {
        matches!(self, Self::Gameplay)
    }
}

/// Inputs shared by all directors for one logic tick.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    /// Host clock in seconds. Pauses and time scaling are the host's call.
    pub now: f64,
    pub phase: GamePhase,
    pub world: &'a dyn WorldView,
    pub settings: &'a CueSettings,
}

impl<'a> TickContext<'a> {
    pub fn new(
        now: f64,
        phase: GamePhase,
        world: &'a dyn WorldView,
        settings: &'a CueSettings,
    ) -> Self {
        Self {
            now,
            phase,
            world,
            settings,
        }
    }

    /// Listener pose during gameplay, `None` otherwise.
    pub fn gameplay_listener(&self) -> Option<Listener> {
        if self.phase.is_gameplay() {
            self.world.listener()
        } else {
            None
        }
    }
}

impl std::fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickContext")
            .field("now", &self.now)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}
