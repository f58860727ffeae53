// Mixer module - sums pre-allocated channels into one interleaved buffer.
// Channels are registered on the logic side before the mixer moves into the
// render callback; after that only their ControlParameters cross threads.

use crate::config::EchoCueWorldDesc;
use crate::params::ControlParameters;
use crate::voice::{CueFamily, Smoother, WaveformVoice};
use std::f32::consts::FRAC_PI_4;
use std::sync::Arc;

/// Time constant of the per-channel pan stage, in seconds.
const PAN_SMOOTHING: f32 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub u32);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// Logic-side write handle for one channel.
///
/// This is the only inbound surface a director uses: every setter clamps
/// into the channel family's bounds and never blocks.
#[derive(Debug, Clone)]
pub struct ChannelHandle {
    id: ChannelId,
    family: CueFamily,
    params: Arc<ControlParameters>,
}

impl ChannelHandle {
    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn family(&self) -> CueFamily {
        self.family
    }

    pub fn params(&self) -> &ControlParameters {
        &self.params
    }

    pub fn set_frequency(&self, hz: f32) {
        self.params.set_frequency(hz);
    }

    pub fn set_volume(&self, volume: f32) {
        self.params.set_volume(volume);
    }

    pub fn set_pan(&self, pan: f32) {
        self.params.set_pan(pan);
    }

    pub fn set_mode(&self, mode: u32) {
        self.params.set_mode(mode);
    }

    pub fn set_modulation(&self, value: f32) {
        self.params.set_modulation(value);
    }

    pub fn set_active(&self, active: bool) {
        self.params.set_active(active);
    }

    pub fn is_active(&self) -> bool {
        self.params.is_active()
    }

    /// Starts a timed burst of `count` pulses after `stagger_samples` of
    /// silence. The channel is activated if it was not already.
    pub fn trigger(&self, count: u32, stagger_samples: u32) {
        self.params.set_active(true);
        self.params.trigger(count, stagger_samples);
    }

    /// Deactivates the channel and zeroes its target volume.
    pub fn silence(&self) {
        self.params.set_active(false);
        self.params.set_volume(0.0);
    }
}

/// A voice bound to one pan stage and one volume stage.
struct Channel {
    id: ChannelId,
    voice: WaveformVoice,
    params: Arc<ControlParameters>,
    gain: f32,
    pan: Smoother,
}

/// Sums every registered channel into an interleaved output buffer.
pub struct Mixer {
    sample_rate: u32,
    master_gain: f32,
    channels: Vec<Channel>,
    scratch: Vec<f32>,
    next_id: u32,
}

impl Mixer {
    pub fn new(desc: &EchoCueWorldDesc) -> Self {
        Self {
            sample_rate: desc.sample_rate,
            master_gain: crate::params::sanitize(desc.master_gain, 0.0, 1.0),
            channels: Vec::new(),
            scratch: vec![0.0; desc.max_block_frames.max(1)],
            next_id: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Registers a new channel and returns its write handle. `gain` is a
    /// fixed per-channel trim applied after the voice.
    pub fn add_channel(&mut self, family: CueFamily, gain: f32) -> ChannelHandle {
        let id = ChannelId(self.next_id);
        self.next_id += 1;
        let params = Arc::new(family.control_parameters());
        self.channels.push(Channel {
            id,
            voice: WaveformVoice::new(family, self.sample_rate),
            params: params.clone(),
            gain: crate::params::sanitize(gain, 0.0, 1.0),
            pan: Smoother::new(PAN_SMOOTHING, self.sample_rate as f32),
        });
        log::debug!("Mixer: registered {} as {}", id, family.label());
        ChannelHandle { id, family, params }
    }

    /// Fills all of `out` and returns the number of frames written.
    ///
    /// Never allocates. A channel whose voice yields a non-finite sample is
    /// reset and contributes silence for that block; the rest of the mix is
    /// unaffected.
    pub fn read_fully(&mut self, out: &mut [f32], channels: u16) -> usize {
        out.fill(0.0);
        let stride = channels.max(1) as usize;
        let frames = out.len() / stride;
        let block = self.scratch.len();

        let mut start = 0;
        while start < frames {
            let len = block.min(frames - start);
            let dest = &mut out[start * stride..(start + len) * stride];
            for channel in self.channels.iter_mut() {
                mix_channel(channel, &mut self.scratch[..len], dest, stride);
            }
            start += len;
        }

        for sample in out.iter_mut() {
            let value = *sample * self.master_gain;
            *sample = if value.is_finite() {
                value.clamp(-1.0, 1.0)
            } else {
                0.0
            };
        }

        frames
    }

    /// Returns every voice to silence. Only valid before the mixer is handed
    /// to the render callback.
    pub fn reset(&mut self) {
        for channel in self.channels.iter_mut() {
            channel.voice.reset();
            channel.pan.reset(0.0);
        }
    }
}

fn mix_channel(channel: &mut Channel, scratch: &mut [f32], dest: &mut [f32], stride: usize) {
    // A channel starting from silence jumps straight to its pan.
    if channel.voice.is_silent() {
        channel.pan.reset(channel.params.pan());
    }

    channel.voice.read(&channel.params, scratch);
    if scratch.iter().any(|s| !s.is_finite()) {
        channel.voice.reset();
        return;
    }

    let target_pan = channel.params.pan();
    for (frame, &sample) in dest.chunks_exact_mut(stride).zip(scratch.iter()) {
        let pan = channel.pan.next(target_pan);
        let value = sample * channel.gain;
        if stride == 1 {
            frame[0] += value;
            continue;
        }
        let (left, right) = equal_power(pan);
        frame[0] += value * left;
        frame[1] += value * right;
    }
}

/// Equal-power gains for pan in `[-1, 1]`.
fn equal_power(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * FRAC_PI_4;
    (angle.cos(), angle.sin())
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("sample_rate", &self.sample_rate)
            .field("master_gain", &self.master_gain)
            .field(
                "channels",
                &self.channels.iter().map(|c| c.id).collect::<Vec<_>>(),
            )
            .field("block_frames", &self.scratch.len())
            .finish()
    }
}
