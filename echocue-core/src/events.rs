//! Event types for EchoCue

use crate::director::beacon::BeaconPhase;
use crate::director::hazard::HazardCategory;
use crossbeam_channel::{Sender, TrySendError};

/// Events held for the host between two polls. Further events are dropped
/// until the host drains the queue.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

/// Notifications emitted by the directors on the logic thread.
///
/// These are the hooks an announcement layer (screen reader, captions)
/// reacts to. They are drained with [`crate::EchoCueWorld::poll_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum EchoCueEvent {
    BeaconPhaseChanged {
        from: BeaconPhase,
        to: BeaconPhase,
    },
    BeaconZoneEntered,
    BeaconZoneExited,
    /// A registered hazard was pushed out of a full registry by a closer one.
    HazardEvicted {
        category: HazardCategory,
    },
    /// A new hazard was refused because every tracked hazard is closer.
    HazardDropped {
        category: HazardCategory,
    },
    OutputStarted {
        family: &'static str,
    },
    OutputFailed {
        family: &'static str,
        error: String,
    },
}

impl EchoCueEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::OutputFailed { .. })
    }

    pub fn is_beacon_event(&self) -> bool {
        matches!(
            self,
            Self::BeaconPhaseChanged { .. } | Self::BeaconZoneEntered | Self::BeaconZoneExited
        )
    }

    pub fn is_hazard_event(&self) -> bool {
        matches!(
            self,
            Self::HazardEvicted { .. } | Self::HazardDropped { .. }
        )
    }
}

/// Queues `event` without blocking. A full queue drops it.
pub(crate) fn emit(events: &Sender<EchoCueEvent>, event: EchoCueEvent) {
    if let Err(TrySendError::Full(event)) = events.try_send(event) {
        log::debug!("Event queue full, dropping {:?}", event);
    }
}

/// Duration of one render callback, measured on the audio thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTimingEvent {
    /// Frames rendered in this callback
    pub frames: usize,
    pub render_time_us: u64,
    /// Real-time length of the rendered audio
    pub budget_us: u64,
}

impl RenderTimingEvent {
    /// Share of the real-time budget spent rendering.
    pub fn load(&self) -> f32 {
        if self.budget_us == 0 {
            0.0
        } else {
            self.render_time_us as f32 / self.budget_us as f32
        }
    }

    pub fn is_overrun(&self) -> bool {
        self.render_time_us > self.budget_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_timing_load() {
        let timing = RenderTimingEvent {
            frames: 441,
            render_time_us: 2_500,
            budget_us: 10_000,
        };
        assert!((timing.load() - 0.25).abs() < 1e-6);
        assert!(!timing.is_overrun());

        let idle = RenderTimingEvent {
            frames: 0,
            render_time_us: 5,
            budget_us: 0,
        };
        assert_eq!(idle.load(), 0.0);
    }

    #[test]
    fn test_emit_drops_when_queue_is_full() {
        let (tx, rx) = crossbeam_channel::bounded(2);
        for _ in 0..5 {
            emit(&tx, EchoCueEvent::BeaconZoneEntered);
        }
        assert_eq!(rx.try_iter().count(), 2);
        emit(&tx, EchoCueEvent::BeaconZoneExited);
        assert_eq!(rx.try_recv().ok(), Some(EchoCueEvent::BeaconZoneExited));
    }

    #[test]
    fn test_event_classification() {
        let failed = EchoCueEvent::OutputFailed {
            family: "hazard",
            error: "no device".into(),
        };
        assert!(failed.is_error());
        assert!(EchoCueEvent::BeaconZoneEntered.is_beacon_event());
        assert!(
            EchoCueEvent::HazardDropped {
                category: HazardCategory::Explosive
            }
            .is_hazard_event()
        );
    }
}
