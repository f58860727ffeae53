//! Output lifetime for one cue family.
//!
//! A [`CueOutput`] holds its family's [`Mixer`] until the first tick that
//! needs sound, then moves it into an [`EchoCueEngine`] stream. The device
//! is released on [`CueOutput::shutdown`] or when the output is dropped.
//! A device that fails to open leaves the family silent for good.

use crate::config::{EchoCueWorldDesc, OutputMode};
use crate::engine::EchoCueEngine;
use crate::error::Result;
use crate::events::{EchoCueEvent, RenderTimingEvent, emit};
use crate::mixer::Mixer;
use crossbeam_channel::Sender;

enum OutputState {
    Pending(Mixer),
    Running(EchoCueEngine),
    Detached(Mixer),
    Failed,
    Closed,
}

pub struct CueOutput {
    family: &'static str,
    desc: EchoCueWorldDesc,
    state: OutputState,
}

impl CueOutput {
    pub fn new(family: &'static str, desc: EchoCueWorldDesc, mixer: Mixer) -> Self {
        let state = match desc.output {
            OutputMode::Device => OutputState::Pending(mixer),
            OutputMode::Detached => OutputState::Detached(mixer),
        };
        Self {
            family,
            desc,
            state,
        }
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    /// Opens the device on first use. Returns whether audio can flow.
    ///
    /// Failures are logged and reported once through `events`; later calls
    /// return `false` without retrying.
    pub fn ensure_started(&mut self, events: &Sender<EchoCueEvent>) -> bool {
        match &self.state {
            OutputState::Running(_) | OutputState::Detached(_) => return true,
            OutputState::Failed | OutputState::Closed => return false,
            OutputState::Pending(_) => {}
        }

        let OutputState::Pending(mixer) = std::mem::replace(&mut self.state, OutputState::Failed)
        else {
            return false;
        };

        match self.open(mixer) {
            Ok(engine) => {
                log::info!("{} cues: output started", self.family);
                self.state = OutputState::Running(engine);
                emit(
                    events,
                    EchoCueEvent::OutputStarted {
                        family: self.family,
                    },
                );
                true
            }
            Err(e) => {
                log::warn!("{} cues: output unavailable, staying silent: {}", self.family, e);
                emit(
                    events,
                    EchoCueEvent::OutputFailed {
                        family: self.family,
                        error: e.to_string(),
                    },
                );
                false
            }
        }
    }

    fn open(&self, mut mixer: Mixer) -> Result<EchoCueEngine> {
        let mut engine = EchoCueEngine::new(self.desc.clone())?;
        engine.set_fill_callback(move |buffer, _sample_rate, channels| {
            mixer.read_fully(buffer, channels)
        });
        engine.start()?;
        Ok(engine)
    }

    /// Pulls one interleaved buffer from a detached output. Any other
    /// state writes silence. Returns the frame count.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        let channels = self.desc.channels;
        match &mut self.state {
            OutputState::Detached(mixer) => mixer.read_fully(out, channels),
            _ => {
                out.fill(0.0);
                out.len() / channels.max(1) as usize
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(&self.state, OutputState::Running(engine) if engine.is_running())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, OutputState::Failed)
    }

    pub fn drain_timing(&mut self) -> Vec<RenderTimingEvent> {
        match &mut self.state {
            OutputState::Running(engine) => engine.drain_timing(),
            _ => Vec::new(),
        }
    }

    /// Releases the device. The output stays closed afterwards.
    pub fn shutdown(&mut self) {
        if let OutputState::Running(mut engine) =
            std::mem::replace(&mut self.state, OutputState::Closed)
        {
            let _ = engine.stop();
            log::info!("{} cues: output released", self.family);
        }
    }
}

impl Drop for CueOutput {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CueOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.state {
            OutputState::Pending(_) => "pending",
            OutputState::Running(_) => "running",
            OutputState::Detached(_) => "detached",
            OutputState::Failed => "failed",
            OutputState::Closed => "closed",
        };
        f.debug_struct("CueOutput")
            .field("family", &self.family)
            .field("state", &state)
            .finish()
    }
}
