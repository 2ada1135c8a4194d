use std::time::{Duration, Instant};

/// Rates observed over one metrics interval of the headless loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub fps: f32,
    pub steps_per_second: f32,
    pub events_per_second: f32,
    pub frame_time_ms: f32,
}

/// Accumulates frame/sub-step/event counts and emits a snapshot once per
/// interval. The caller decides what to do with the snapshot (the demo
/// loop logs it).
#[derive(Debug)]
pub struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    steps: u32,
    events: u32,
    frame_time_sum: Duration,
}

impl MetricsAccumulator {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_start: Instant::now(),
            interval,
            frames: 0,
            steps: 0,
            events: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub fn record_steps(&mut self, steps: u32) {
        self.steps = self.steps.saturating_add(steps);
    }

    pub fn record_events(&mut self, events: u32) {
        self.events = self.events.saturating_add(events);
    }

    pub fn maybe_snapshot(&mut self, now: Instant) -> Option<MetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let snapshot = MetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            steps_per_second: self.steps as f32 / elapsed_seconds,
            events_per_second: self.events as f32 / elapsed_seconds,
            frame_time_ms,
        };

        self.interval_start = now;
        self.frames = 0;
        self.steps = 0;
        self.events = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_interval_rates() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();

        accumulator.record_frame(Duration::from_millis(10));
        accumulator.record_frame(Duration::from_millis(30));
        accumulator.record_steps(4);
        accumulator.record_events(6);

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot");
        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.steps_per_second - 4.0).abs() < 0.1);
        assert!((snapshot.events_per_second - 6.0).abs() < 0.1);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.001);
    }

    #[test]
    fn no_snapshot_before_interval_elapses() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();
        accumulator.record_frame(Duration::from_millis(16));
        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(300))
            .is_none());
    }

    #[test]
    fn counters_reset_after_snapshot() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_millis(100));
        let base = Instant::now();
        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_steps(10);

        let _ = accumulator
            .maybe_snapshot(base + Duration::from_millis(150))
            .expect("first snapshot");
        let second = accumulator
            .maybe_snapshot(base + Duration::from_millis(300))
            .expect("second snapshot");
        assert_eq!(second.fps, 0.0);
        assert_eq!(second.steps_per_second, 0.0);
    }
}
