use crate::scene::Arena;
use anyhow::{Context, Result, bail};
use echocue_core::{
    AttackTempo, BeaconEvent, CueSettings, EchoCueEvent, EchoCueWorld, EchoCueWorldDesc,
    GamePhase, HazardCategory, HazardRecord, Vec3,
};
use std::time::{Duration, Instant};

const TICK_HZ: f64 = 60.0;
const DEFAULT_SECONDS: f64 = 20.0;

#[derive(Debug, Clone)]
pub struct Options {
    pub offline: bool,
    pub seconds: f64,
}

impl Options {
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut options = Self {
            offline: false,
            seconds: DEFAULT_SECONDS,
        };
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--offline" => options.offline = true,
                "--seconds" => {
                    let value = iter.next().context("--seconds needs a value")?;
                    options.seconds = value
                        .parse()
                        .with_context(|| format!("invalid --seconds value: {value}"))?;
                }
                other => bail!("unknown argument: {other}"),
            }
        }
        if !options.seconds.is_finite() || options.seconds <= 0.0 {
            bail!("--seconds must be positive");
        }
        Ok(options)
    }
}

/// Plays the scripted scene through the default output device in real time.
pub fn run_device(options: &Options) -> Result<()> {
    log::info!("=== Playing scene on the default device for {}s ===", options.seconds);
    let mut cues = EchoCueWorld::new(EchoCueWorldDesc::default())?;
    let settings = CueSettings::default();
    let mut arena = Arena::new();

    let start = Instant::now();
    let step = Duration::from_secs_f64(1.0 / TICK_HZ);
    let mut previous = -1.0;
    loop {
        let now = start.elapsed().as_secs_f64();
        if now >= options.seconds {
            break;
        }
        arena.advance(now);
        run_script(&mut cues, &arena, previous, now);
        cues.tick(now, GamePhase::Gameplay, &arena, &settings);
        report_events(&cues);

        for timing in cues.drain_timing() {
            if timing.is_overrun() {
                log::warn!(
                    "Render overrun: {} frames took {}us of {}us",
                    timing.frames,
                    timing.render_time_us,
                    timing.budget_us
                );
            }
        }

        previous = now;
        std::thread::sleep(step);
    }

    cues.shutdown();
    log::info!("Device playback finished");
    Ok(())
}

/// Renders the scripted scene without a device and prints level statistics.
pub fn run_offline(options: &Options) -> Result<()> {
    log::info!("=== Rendering scene offline for {}s ===", options.seconds);
    let desc = EchoCueWorldDesc::detached();
    let channels = desc.channels as usize;
    let frames_per_tick = (desc.sample_rate as f64 / TICK_HZ).round() as usize;
    let mut cues = EchoCueWorld::new(desc)?;
    let settings = CueSettings::default();
    let mut arena = Arena::new();

    let mut buffer = vec![0.0f32; frames_per_tick * channels];
    let ticks = (options.seconds * TICK_HZ).ceil() as usize;
    let mut second = SecondStats::default();
    let mut previous = -1.0;

    for tick in 0..ticks {
        let now = tick as f64 / TICK_HZ;
        arena.advance(now);
        run_script(&mut cues, &arena, previous, now);
        cues.tick(now, GamePhase::Gameplay, &arena, &settings);
        report_events(&cues);

        cues.render(&mut buffer);
        second.accumulate(&buffer, channels);
        if (tick + 1) % TICK_HZ as usize == 0 {
            second.log((tick + 1) / TICK_HZ as usize);
            second = SecondStats::default();
        }
        previous = now;
    }

    log::info!("Offline render finished");
    Ok(())
}

/// Fires the scripted host events whose time falls in `(previous, now]`.
fn run_script(cues: &mut EchoCueWorld, arena: &Arena, previous: f64, now: f64) {
    let crossed = |at: f64| previous < at && now >= at;

    if crossed(1.0) {
        let outcome = cues.register_hazard(HazardRecord::new(
            Vec3::new(3.0, 0.0, -5.0),
            now + 6.0,
            HazardCategory::Explosive,
        ));
        log::info!("Registered explosive: {:?}", outcome);
    }
    if crossed(2.0) {
        send_beacon(
            cues,
            BeaconEvent::TargetDescending {
                position: Vec3::new(-20.0, 0.0, -30.0),
            },
        );
    }
    if crossed(4.0) {
        if let Some(attacker) = arena.hostile(0) {
            cues.telegraph(attacker, AttackTempo::Fast);
        }
    }
    if crossed(7.0) {
        send_beacon(
            cues,
            BeaconEvent::TargetLanded {
                position: Vec3::new(-20.0, 0.0, -30.0),
            },
        );
    }
    if crossed(12.0) {
        send_beacon(
            cues,
            BeaconEvent::TargetMoved {
                position: Vec3::new(-1.0, 0.0, -1.5),
            },
        );
    }
}

fn send_beacon(cues: &EchoCueWorld, event: BeaconEvent) {
    if let Err(err) = cues.beacon_events().send(event) {
        log::warn!("Beacon inbox closed, dropping {:?}", err.0);
    }
}

fn report_events(cues: &EchoCueWorld) {
    for event in cues.poll_events() {
        match &event {
            EchoCueEvent::OutputFailed { family, error } => {
                log::error!("{} cues unavailable: {}", family, error);
            }
            _ => log::info!("{:?}", event),
        }
    }
}

#[derive(Debug, Default)]
struct SecondStats {
    peak: f32,
    sum_squares: f64,
    samples: usize,
}

impl SecondStats {
    fn accumulate(&mut self, buffer: &[f32], channels: usize) {
        for frame in buffer.chunks(channels.max(1)) {
            for &sample in frame {
                self.peak = self.peak.max(sample.abs());
                self.sum_squares += (sample as f64) * (sample as f64);
            }
            self.samples += frame.len();
        }
    }

    fn log(&self, second: usize) {
        let rms = if self.samples == 0 {
            0.0
        } else {
            (self.sum_squares / self.samples as f64).sqrt()
        };
        log::info!("t={:>3}s  peak {:.3}  rms {:.4}", second, self.peak, rms);
    }
}
