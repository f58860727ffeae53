//! # EchoCue Core
//!
//! Real-time procedural audio cues that turn game-world information into
//! directional sound for blind and low-vision players.
//!
//! The host game owns an [`EchoCueWorld`] on its logic thread and ticks it
//! once per frame with a [`WorldView`] over its entities. Directors turn
//! enemy positions, hazards, beacon progress and collectibles into
//! parameters for pre-allocated synthesizer channels; the audio callbacks
//! render those channels without locks or allocation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use echocue_core::*;
//!
//! struct Arena {
//!     player: Vec3,
//!     camera_forward: Vec3,
//!     enemies: Vec<HostileEntity>,
//! }
//!
//! impl WorldView for Arena {
//!     fn listener(&self) -> Option<Listener> {
//!         Some(Listener::new(self.player, self.camera_forward))
//!     }
//!
//!     fn for_each_hostile(&self, visit: &mut dyn FnMut(HostileEntity)) {
//!         self.enemies.iter().copied().for_each(|e| visit(e));
//!     }
//!
//!     fn is_alive(&self, handle: EntityHandle) -> bool {
//!         self.enemies.iter().any(|e| e.handle == handle && e.alive)
//!     }
//!
//!     fn position_of(&self, handle: EntityHandle) -> Option<Vec3> {
//!         self.enemies.iter().find(|e| e.handle == handle).map(|e| e.position)
//!     }
//! }
//!
//! let mut cues = EchoCueWorld::new(EchoCueWorldDesc::default())?;
//! let settings = CueSettings::default();
//! let arena = Arena {
//!     player: Vec3::ZERO,
//!     camera_forward: Vec3::NEG_Z,
//!     enemies: vec![HostileEntity {
//!         handle: EntityHandle::new(0, 0),
//!         position: Vec3::new(6.0, 0.0, -3.0),
//!         tier: EntityTier::Elite,
//!         alive: true,
//!     }],
//! };
//!
//! // Once per game frame
//! cues.tick(0.016, GamePhase::Gameplay, &arena, &settings);
//!
//! // Announce what changed
//! for event in cues.poll_events() {
//!     if let EchoCueEvent::OutputFailed { family, error } = event {
//!         eprintln!("{family} cues unavailable: {error}");
//!     }
//! }
//! # Ok::<(), EchoCueError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`EchoCueWorld`]**: context object owning every director
//! - **[`WaveformVoice`]**: one synthesizer per cue family
//! - **[`ControlParameters`]**: lock-free targets shared with the render thread
//! - **[`Spatializer`]** and **[`ProximityCurve`]**: pure mapping from
//!   geometry to pan, pitch, loudness and repeat interval
//! - **[`Mixer`]**: sums channels into the interleaved device buffer
//! - **[`EchoCueEngine`]**: cpal output stream for one mixer
//!
//! ## Threading
//!
//! Directors run on the logic tick and are the only writers of their
//! channels' parameters. Voices run on the device callback and are the only
//! owners of phase and envelope state. Nothing else crosses between them.

pub mod config;
pub mod director;
pub mod engine;
pub mod error;
pub mod events;
pub mod math;
pub mod mixer;
pub mod output;
pub mod params;
pub mod proximity;
pub mod spatial;
pub mod view;
pub mod voice;
pub mod world;

pub use config::{CueSettings, EchoCueWorldDesc, FamilySettings, OutputMode};
pub use director::{
    BeaconEvent, BeaconPhase, HazardCategory, HazardRecord, HazardRegistry, PreviewCue,
    RegisterOutcome,
};
pub use engine::{AudioFillCallback, EchoCueEngine};
pub use error::{EchoCueError, Result};
pub use events::{EchoCueEvent, RenderTimingEvent};
pub use math::{Listener, Vec3};
pub use mixer::{ChannelHandle, ChannelId, Mixer};
pub use output::CueOutput;
pub use params::ControlParameters;
pub use proximity::ProximityCurve;
pub use spatial::{SpatialCue, Spatializer};
pub use view::{Collectible, EntityHandle, GamePhase, HostileEntity, TickContext, WorldView};
pub use voice::{AttackTempo, BeaconMode, CollectibleKind, CueFamily, EntityTier, WaveformVoice};
pub use world::EchoCueWorld;
