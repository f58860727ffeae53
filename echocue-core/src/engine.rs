use crate::config::EchoCueWorldDesc;
use crate::error::{EchoCueError, Result};
use crate::events::RenderTimingEvent;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// Render timings buffered between two drains.
const TIMING_QUEUE_CAPACITY: usize = 256;

/// Device-buffer fill function: `(interleaved buffer, sample rate, channels)`.
///
/// Returns the frames written. Runs on the device thread, so it must not
/// block or allocate.
pub type AudioFillCallback = dyn FnMut(&mut [f32], u32, u16) -> usize + Send;

/// Audio engine that owns one output stream on the default device
pub struct EchoCueEngine {
    desc: EchoCueWorldDesc,
    stream: Option<cpal::Stream>,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
    fill_callback: Option<Box<AudioFillCallback>>,
    timing: Option<HeapCons<RenderTimingEvent>>,
}

impl EchoCueEngine {
    /// Validates `desc`. No device is touched until [`start`](Self::start).
    pub fn new(desc: EchoCueWorldDesc) -> Result<Self> {
        desc.validate()?;
        Ok(Self {
            desc,
            stream: None,
            is_running: Arc::new(AtomicBool::new(false)),
            frames_processed: Arc::new(AtomicUsize::new(0)),
            fill_callback: None,
            timing: None,
        })
    }

    /// Set the callback that fills each device buffer. It is moved into the
    /// stream by [`start`](Self::start).
    pub fn set_fill_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&mut [f32], u32, u16) -> usize + Send + 'static,
    {
        self.fill_callback = Some(Box::new(callback));
    }

    /// Open the default output device and start pulling from the callback
    pub fn start(&mut self) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            return Ok(());
        }

        let fill_callback = self
            .fill_callback
            .take()
            .ok_or_else(|| EchoCueError::Engine("No fill callback set".into()))?;

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            EchoCueError::AudioDevice("No default output device available".into())
        })?;

        let buffer_size = if self.desc.block_size > 0 {
            cpal::BufferSize::Fixed(self.desc.block_size as u32)
        } else {
            cpal::BufferSize::Default
        };
        let config = cpal::StreamConfig {
            channels: self.desc.channels,
            sample_rate: cpal::SampleRate(self.desc.sample_rate),
            buffer_size,
        };

        let default_config = device.default_output_config().map_err(|e| {
            EchoCueError::AudioDevice(format!("Failed to get default config: {}", e))
        })?;

        let (producer, consumer) = HeapRb::<RenderTimingEvent>::new(TIMING_QUEUE_CAPACITY).split();
        let render = RenderState {
            fill_callback,
            scratch: vec![0.0; self.desc.max_block_frames * self.desc.channels as usize],
            timing: producer,
            is_running: self.is_running.clone(),
            frames_processed: self.frames_processed.clone(),
            sample_rate: self.desc.sample_rate,
            channels: self.desc.channels,
        };

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => Self::create_stream::<f32>(&device, &config, render)?,
            cpal::SampleFormat::I16 => Self::create_stream::<i16>(&device, &config, render)?,
            cpal::SampleFormat::U16 => Self::create_stream::<u16>(&device, &config, render)?,
            other => {
                return Err(EchoCueError::AudioFormat(format!(
                    "Unsupported sample format: {:?}",
                    other
                )));
            }
        };

        // Set before play so the first callback renders.
        self.is_running.store(true, Ordering::Relaxed);
        if let Err(e) = stream.play() {
            self.is_running.store(false, Ordering::Relaxed);
            return Err(EchoCueError::AudioDevice(format!(
                "Failed to start stream: {}",
                e
            )));
        }

        log::info!(
            "Output stream started: {} Hz, {} channels, {:?}",
            self.desc.sample_rate,
            self.desc.channels,
            default_config.sample_format()
        );
        self.stream = Some(stream);
        self.timing = Some(consumer);

        Ok(())
    }

    /// Stop the audio engine and release the device
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            self.is_running.store(false, Ordering::Relaxed);
            drop(stream);
            log::info!(
                "Output stream stopped after {} frames",
                self.frames_processed()
            );
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Frames rendered by the device callback so far.
    pub fn frames_processed(&self) -> usize {
        self.frames_processed.load(Ordering::Relaxed)
    }

    pub fn config(&self) -> &EchoCueWorldDesc {
        &self.desc
    }

    /// Takes every render timing queued since the last call.
    pub fn drain_timing(&mut self) -> Vec<RenderTimingEvent> {
        let mut drained = Vec::new();
        if let Some(consumer) = self.timing.as_mut() {
            while let Some(event) = consumer.try_pop() {
                drained.push(event);
            }
        }
        drained
    }

    fn create_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut render: RenderState,
    ) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| render.fill(data),
                move |err| {
                    log::error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| EchoCueError::AudioDevice(format!("Failed to build stream: {}", e)))?;

        Ok(stream)
    }
}

impl Drop for EchoCueEngine {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Everything the device callback owns.
struct RenderState {
    fill_callback: Box<AudioFillCallback>,
    scratch: Vec<f32>,
    timing: HeapProd<RenderTimingEvent>,
    is_running: Arc<AtomicBool>,
    frames_processed: Arc<AtomicUsize>,
    sample_rate: u32,
    channels: u16,
}

impl RenderState {
    fn fill<T>(&mut self, data: &mut [T])
    where
        T: SizedSample + FromSample<f32>,
    {
        if !self.is_running.load(Ordering::Relaxed) || self.scratch.is_empty() {
            for sample in data.iter_mut() {
                *sample = T::from_sample(0.0f32);
            }
            return;
        }

        let started = Instant::now();
        let mut frames = 0;
        let block = self.scratch.len();
        for chunk in data.chunks_mut(block) {
            let buffer = &mut self.scratch[..chunk.len()];
            frames += (self.fill_callback)(buffer, self.sample_rate, self.channels);
            for (out, &value) in chunk.iter_mut().zip(buffer.iter()) {
                *out = T::from_sample(value);
            }
        }
        self.frames_processed.fetch_add(frames, Ordering::Relaxed);

        let budget_us = frames as u64 * 1_000_000 / self.sample_rate.max(1) as u64;
        // A full queue drops the sample.
        let _ = self.timing.try_push(RenderTimingEvent {
            frames,
            render_time_us: started.elapsed().as_micros() as u64,
            budget_us,
        });
    }
}
