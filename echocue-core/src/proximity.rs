//! Proximity scheduling curve shared by every cue family.
//!
//! One curve shape maps distance and crowd size to a repeat interval and a
//! loudness. Families differ only in their constants, so closeness sounds
//! the same everywhere: far sources repeat slowly and quietly, near or
//! crowded sources speed up and grow louder along a squared curve, and
//! anything inside the critical radius snaps to a distinct urgent regime.

use crate::math::{clamp01, lerp};

/// Crowd size at which the count factor saturates.
pub const CROWD_SATURATION: f32 = 5.0;

/// `(1 - clamp01(distance / max_range))²`
pub fn proximity_factor(distance: f32, max_range: f32) -> f32 {
    let distance = if distance.is_nan() { f32::MAX } else { distance.max(0.0) };
    let max_range = if max_range.is_finite() && max_range > 0.0 {
        max_range
    } else {
        f32::EPSILON
    };
    let closeness = 1.0 - clamp01(distance / max_range);
    closeness * closeness
}

/// `clamp01(count / 5)`
pub fn count_factor(count: usize) -> f32 {
    clamp01(count as f32 / CROWD_SATURATION)
}

/// Per-family curve constants.
///
/// Intervals are in seconds. The constructor keeps
/// `critical_interval <= min_interval <= base_interval` and
/// `critical_volume >= max_volume >= min_volume`, which is what makes the
/// curve monotonic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityCurve {
    pub max_range: f32,
    pub base_interval: f32,
    pub min_interval: f32,
    pub critical_interval: f32,
    pub critical_radius: f32,
    pub min_volume: f32,
    pub max_volume: f32,
    pub critical_volume: f32,
}

impl ProximityCurve {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        max_range: f32,
        base_interval: f32,
        min_interval: f32,
        critical_interval: f32,
        critical_radius: f32,
        min_volume: f32,
        max_volume: f32,
        critical_volume: f32,
    ) -> Self {
        let base_interval = base_interval.max(0.0);
        let min_interval = min_interval.clamp(0.0, base_interval);
        let critical_interval = critical_interval.clamp(0.0, min_interval);
        let min_volume = min_volume.max(0.0);
        let max_volume = max_volume.max(min_volume);
        let critical_volume = critical_volume.max(max_volume);
        Self {
            max_range,
            base_interval,
            min_interval,
            critical_interval,
            critical_radius: critical_radius.max(0.0),
            min_volume,
            max_volume,
            critical_volume,
        }
    }

    /// Enemy alert beeps.
    pub fn enemy() -> Self {
        Self::new(50.0, 1.2, 0.25, 0.12, 3.5, 0.15, 0.7, 0.8)
    }

    /// Hazard sirens. The interval is one alarm sweep period.
    pub fn hazard() -> Self {
        Self::new(30.0, 1.0, 0.35, 0.15, 4.0, 0.1, 0.6, 0.7)
    }

    /// Beacon pings.
    pub fn beacon() -> Self {
        Self::new(120.0, 2.0, 0.5, 0.3, 8.0, 0.35, 0.75, 0.85)
    }

    /// Collectible chimes.
    pub fn collectible() -> Self {
        Self::new(20.0, 2.5, 0.8, 0.5, 1.5, 0.1, 0.5, 0.6)
    }

    /// Returns a copy with the range and critical radius overridden.
    pub fn with_range(mut self, max_range: f32, critical_radius: f32) -> Self {
        self.max_range = max_range;
        self.critical_radius = critical_radius.max(0.0);
        self
    }

    pub fn is_critical(&self, distance: f32) -> bool {
        distance < self.critical_radius
    }

    /// Blend weight toward the near end of the curve.
    pub fn urgency(&self, distance: f32, count: usize) -> f32 {
        proximity_factor(distance, self.max_range).max(count_factor(count))
    }

    /// Seconds until the next cue for the closest source at `distance`
    /// among `count` sources.
    pub fn next_interval(&self, distance: f32, count: usize) -> f32 {
        if self.is_critical(distance) {
            return self.critical_interval;
        }
        lerp(self.base_interval, self.min_interval, self.urgency(distance, count))
    }

    /// Target volume on the same curve.
    pub fn intensity(&self, distance: f32, count: usize) -> f32 {
        if self.is_critical(distance) {
            return self.critical_volume;
        }
        lerp(self.min_volume, self.max_volume, self.urgency(distance, count))
    }
}

/// Free-function form of [`ProximityCurve::next_interval`].
pub fn next_interval(
    distance: f32,
    max_range: f32,
    count_in_bucket: usize,
    base_interval: f32,
    min_interval: f32,
    critical_interval: f32,
    critical_radius: f32,
) -> f32 {
    ProximityCurve::new(
        max_range,
        base_interval,
        min_interval,
        critical_interval,
        critical_radius,
        0.0,
        0.0,
        0.0,
    )
    .next_interval(distance, count_in_bucket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn curve() -> ProximityCurve {
        ProximityCurve::new(50.0, 1.2, 0.25, 0.12, 3.5, 0.15, 0.7, 0.8)
    }

    #[test]
    fn test_distance_five_is_between_base_and_min_closer_to_min() {
        let c = curve();
        let interval = c.next_interval(5.0, 1);
        assert!(interval < c.base_interval && interval > c.min_interval);
        let midpoint = (c.base_interval + c.min_interval) / 2.0;
        assert!(interval < midpoint, "{interval}");
    }

    #[test]
    fn test_distance_two_is_exactly_critical() {
        let c = curve();
        assert_eq!(c.next_interval(2.0, 1), c.critical_interval);
        assert_eq!(c.intensity(2.0, 1), c.critical_volume);
    }

    #[test]
    fn test_interval_is_monotonic_as_distance_decreases() {
        let c = curve();
        for count in [0usize, 1, 3, 7] {
            let mut previous = f32::MAX;
            let mut d = 80.0;
            while d >= 0.0 {
                let interval = c.next_interval(d, count);
                assert!(interval <= previous + 1e-6, "d={d} count={count}");
                previous = interval;
                d -= 0.05;
            }
        }
    }

    #[test]
    fn test_intensity_is_monotonic_as_distance_decreases() {
        let c = curve();
        let mut previous = 0.0;
        let mut d = 80.0;
        while d >= 0.0 {
            let volume = c.intensity(d, 1);
            assert!(volume >= previous - 1e-6);
            previous = volume;
            d -= 0.05;
        }
    }

    #[test]
    fn test_critical_never_slower_than_outside() {
        let c = curve();
        let inside = c.next_interval(c.critical_radius - 0.01, 0);
        for d in [c.critical_radius, 4.0, 10.0, 49.0, 100.0] {
            assert!(inside <= c.next_interval(d, 0));
        }
    }

    #[test]
    fn test_crowd_speeds_up_distant_cues() {
        let c = curve();
        assert!(c.next_interval(45.0, 5) < c.next_interval(45.0, 1));
        assert_eq!(c.next_interval(45.0, 5), c.min_interval);
    }

    #[test]
    fn test_out_of_range_is_base() {
        let c = curve();
        assert_eq!(c.next_interval(500.0, 0), c.base_interval);
        assert_eq!(proximity_factor(f32::NAN, 50.0), 0.0);
    }

    #[test]
    fn test_constructor_orders_intervals() {
        let c = ProximityCurve::new(10.0, 1.0, 2.0, 3.0, 1.0, 0.5, 0.2, 0.1);
        assert!(c.critical_interval <= c.min_interval && c.min_interval <= c.base_interval);
        assert!(c.critical_volume >= c.max_volume && c.max_volume >= c.min_volume);
    }

    #[test]
    fn test_free_function_matches_curve() {
        let c = curve();
        let free = next_interval(5.0, 50.0, 1, 1.2, 0.25, 0.12, 3.5);
        assert_eq!(free, c.next_interval(5.0, 1));
    }

    #[test]
    fn test_zero_range_does_not_produce_nan() {
        let interval = next_interval(1.0, 0.0, 0, 1.0, 0.5, 0.1, 0.0);
        assert!(interval.is_finite());
    }
}
