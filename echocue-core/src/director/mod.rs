//! Per-family orchestration on the logic tick.
//!
//! A director maps world state onto its own pre-allocated channels once
//! per tick. It is the only writer of those channels' parameters, it never
//! returns errors, and a failed lookup only removes that one source for
//! the tick.

pub mod beacon;
pub mod collectible;
pub mod enemy;
pub mod hazard;
pub mod preview;

pub use beacon::{BeaconDirector, BeaconEvent, BeaconPhase};
pub use collectible::CollectibleDirector;
pub use enemy::EnemyDirector;
pub use hazard::{
    HazardCategory, HazardDirector, HazardRecord, HazardRegistry, HazardRegistryHandle,
    RegisterOutcome,
};
pub use preview::{PreviewCue, PreviewDirector};

use crate::output::CueOutput;
use crate::view::TickContext;

pub trait Director {
    /// Short family name used in logs and output events.
    fn label(&self) -> &'static str;

    /// Runs once per logic tick.
    fn tick(&mut self, ctx: &TickContext<'_>);

    /// Deactivates every channel this director owns.
    fn silence(&mut self);

    /// Clears schedule state on a scene or world transition.
    fn reset(&mut self);

    fn output(&mut self) -> &mut CueOutput;

    /// Silences and releases the output device.
    fn shutdown(&mut self) {
        self.silence();
        self.output().shutdown();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    /// (first frame, frame count) of each stretch of sound in an
    /// interleaved stereo buffer, split by at least 10 ms of silence.
    pub(crate) fn sounding_runs(stereo: &[f32]) -> Vec<(usize, usize)> {
        const QUIET_FRAMES: usize = 441;
        let mut runs: Vec<(usize, usize)> = Vec::new();
        let mut quiet = QUIET_FRAMES;
        for (frame, pair) in stereo.chunks(2).enumerate() {
            if pair.iter().any(|s| s.abs() > 1e-4) {
                if quiet < QUIET_FRAMES && !runs.is_empty() {
                    let last = runs.len() - 1;
                    runs[last].1 = frame - runs[last].0 + 1;
                } else {
                    runs.push((frame, 1));
                }
                quiet = 0;
            } else {
                quiet += 1;
            }
        }
        runs
    }

    #[test]
    fn test_sounding_runs_split_on_silence() {
        let mut stereo = vec![0.0; 4000 * 2];
        stereo[100 * 2] = 0.5;
        stereo[300 * 2 + 1] = -0.5;
        stereo[2000 * 2] = 0.5;
        assert_eq!(sounding_runs(&stereo), vec![(100, 201), (2000, 1)]);
    }
}
