use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Time elapsed since the previous tick, in seconds.
    pub dt: f32,

    /// Timestamp the tick was taken at.
    pub now: Instant,

    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
}

/// Produces `FrameTime` snapshots from externally supplied timestamps.
///
/// The first tick measures from construction (or the last `reset`). Delta
/// time is reported as measured unless clamps are configured.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    clamps: Option<(Duration, Duration)>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    /// Creates a clock whose first tick measures from `start`.
    pub fn starting_at(start: Instant) -> Self {
        Self { last: start, frame_index: 0, clamps: None }
    }

    /// Creates a clock that keeps dt within `[dt_min, dt_max]`.
    ///
    /// Useful for hosts that step physics and cannot take a huge dt after a
    /// stall.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self { clamps: Some((dt_min, dt_max)), ..Self::new() }
    }

    /// Resets the baseline to `now` without advancing the frame counter.
    pub fn reset(&mut self, now: Instant) {
        self.last = now;
    }

    /// Advances the clock to `now`.
    ///
    /// A `now` earlier than the previous tick yields `dt == 0`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let mut dt = now.saturating_duration_since(self.last);
        if let Some((min, max)) = self.clamps {
            dt = dt.clamp(min, max);
        }

        self.last = now;

        let ft = FrameTime { dt: dt.as_secs_f32(), now, frame_index: self.frame_index };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dt_is_time_since_previous_tick() {
        let t0 = Instant::now();
        let mut clock = FrameClock::starting_at(t0);

        let a = clock.tick_at(t0 + Duration::from_millis(16));
        assert!((a.dt - 0.016).abs() < 1e-6);
        assert_eq!(a.frame_index, 0);

        let b = clock.tick_at(t0 + Duration::from_millis(50));
        assert!((b.dt - 0.034).abs() < 1e-6);
        assert_eq!(b.frame_index, 1);
        assert_eq!(clock.frame_index(), 2);
    }

    #[test]
    fn unclamped_by_default() {
        let t0 = Instant::now();
        let mut clock = FrameClock::starting_at(t0);
        let ft = clock.tick_at(t0 + Duration::from_secs(3));
        assert!((ft.dt - 3.0).abs() < 1e-6);
    }

    #[test]
    fn clamps_bound_dt() {
        let mut clock = FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(250));
        let t0 = Instant::now();
        clock.reset(t0);
        assert!((clock.tick_at(t0 + Duration::from_secs(2)).dt - 0.25).abs() < 1e-6);
        let t1 = t0 + Duration::from_secs(2);
        assert!((clock.tick_at(t1).dt - 0.001).abs() < 1e-6);
    }

    #[test]
    fn time_going_backwards_gives_zero() {
        let t0 = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock::starting_at(t0);
        let ft = clock.tick_at(t0 - Duration::from_millis(500));
        assert_eq!(ft.dt, 0.0);
    }
}
