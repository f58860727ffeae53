//! Per-tick cue configuration supplied by the host.
//!
//! The host's settings layer (persistence, menus) is outside this crate. It
//! hands a [`CueSettings`] to every [`EchoCueWorld::tick`](crate::EchoCueWorld::tick)
//! and directors read it fresh each time.

/// Enable flag and volume multiplier for one cue family.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FamilySettings {
    pub enabled: bool,
    /// Multiplier applied on top of the family's own loudness curve
    pub volume: f32,
}

impl FamilySettings {
    pub fn new(enabled: bool, volume: f32) -> Self {
        Self { enabled, volume }
    }

    /// Effective multiplier: 0 when disabled, otherwise the volume clamped
    /// to [0, 2].
    pub fn gain(&self) -> f32 {
        if !self.enabled || !self.volume.is_finite() {
            return 0.0;
        }
        self.volume.clamp(0.0, 2.0)
    }
}

impl Default for FamilySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CueSettings {
    pub enemies: FamilySettings,
    pub hazards: FamilySettings,
    pub beacon: FamilySettings,
    pub collectibles: FamilySettings,
    pub telegraphs: FamilySettings,
    pub previews: FamilySettings,

    /// Enemies further than this are ignored
    pub enemy_max_range: f32,
    /// Enemies closer than this use the critical regime
    pub enemy_critical_radius: f32,

    /// Siren channels the hazard director may use this tick
    pub hazard_channel_budget: usize,
    pub hazard_max_range: f32,
    /// Hazards closer than this use the critical regime
    pub hazard_critical_radius: f32,

    pub beacon_critical_radius: f32,
    /// Inside this distance the beacon switches to a continuous tone
    pub beacon_zone_radius: f32,

    pub collectible_max_range: f32,
}

impl Default for CueSettings {
    fn default() -> Self {
        Self {
            enemies: FamilySettings::default(),
            hazards: FamilySettings::default(),
            beacon: FamilySettings::default(),
            collectibles: FamilySettings::new(true, 0.8),
            telegraphs: FamilySettings::default(),
            previews: FamilySettings::default(),
            enemy_max_range: 50.0,
            enemy_critical_radius: 3.5,
            hazard_channel_budget: 3,
            hazard_max_range: 30.0,
            hazard_critical_radius: 4.0,
            beacon_critical_radius: 8.0,
            beacon_zone_radius: 2.5,
            collectible_max_range: 20.0,
        }
    }
}

impl CueSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enemy_max_range(mut self, range: f32) -> Self {
        self.enemy_max_range = range;
        self
    }

    pub fn enemy_critical_radius(mut self, radius: f32) -> Self {
        self.enemy_critical_radius = radius;
        self
    }

    pub fn hazard_channel_budget(mut self, budget: usize) -> Self {
        self.hazard_channel_budget = budget;
        self
    }

    pub fn hazard_max_range(mut self, range: f32) -> Self {
        self.hazard_max_range = range;
        self
    }

    pub fn hazard_critical_radius(mut self, radius: f32) -> Self {
        self.hazard_critical_radius = radius;
        self
    }

    pub fn beacon_critical_radius(mut self, radius: f32) -> Self {
        self.beacon_critical_radius = radius;
        self
    }

    pub fn beacon_zone_radius(mut self, radius: f32) -> Self {
        self.beacon_zone_radius = radius;
        self
    }

    pub fn collectible_max_range(mut self, range: f32) -> Self {
        self.collectible_max_range = range;
        self
    }
}
