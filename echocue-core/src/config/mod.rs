mod cue_settings;
mod world_desc;

pub use cue_settings::{CueSettings, FamilySettings};
pub use world_desc::{EchoCueWorldDesc, OutputMode};
