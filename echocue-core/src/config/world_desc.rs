use crate::error::{EchoCueError, Result};

/// Sample rate every voice synthesizes at.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Where a cue family's mixed audio goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Open the default output device on first use.
    #[default]
    Device,
    /// Never open a device. Audio is pulled with
    /// [`CueOutput::render`](crate::output::CueOutput::render) instead.
    Detached,
}

/// Configuration descriptor shared by every cue family's output.
#[derive(Debug, Clone)]
pub struct EchoCueWorldDesc {
    /// Sample rate for synthesis and for the device stream
    pub sample_rate: u32,
    /// Number of interleaved output channels (typically 2 for stereo)
    pub channels: u16,
    /// Frames per device callback. 0 lets the device pick.
    pub block_size: usize,
    /// Mono scratch frames preallocated per channel. Larger device buffers
    /// are rendered in several passes.
    pub max_block_frames: usize,
    /// Gain applied to the summed mix before the final clamp
    pub master_gain: f32,
    /// Device or detached output
    pub output: OutputMode,
}

impl Default for EchoCueWorldDesc {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 2,
            block_size: 0,
            max_block_frames: 4096,
            master_gain: 0.8,
            output: OutputMode::Device,
        }
    }
}

impl EchoCueWorldDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    pub fn channels(mut self, channels: u16) -> Self {
        self.channels = channels;
        self
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn max_block_frames(mut self, frames: usize) -> Self {
        self.max_block_frames = frames;
        self
    }

    pub fn master_gain(mut self, gain: f32) -> Self {
        self.master_gain = gain;
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    /// Detached output, for offline rendering and tests.
    pub fn detached() -> Self {
        Self::default().output(OutputMode::Detached)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(EchoCueError::Configuration(
                "sample_rate must be non-zero".into(),
            ));
        }
        if self.channels == 0 {
            return Err(EchoCueError::Configuration(
                "channels must be non-zero".into(),
            ));
        }
        if self.max_block_frames == 0 {
            return Err(EchoCueError::Configuration(
                "max_block_frames must be non-zero".into(),
            ));
        }
        if !self.master_gain.is_finite() || self.master_gain < 0.0 {
            return Err(EchoCueError::Configuration(format!(
                "master_gain must be a finite non-negative number, got {}",
                self.master_gain
            )));
        }
        Ok(())
    }
}
