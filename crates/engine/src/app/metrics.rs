use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::warn;

static POISON_WARNED: AtomicBool = AtomicBool::new(false);

/// Takes the guard out of a poisoned lock, logging the first time it happens.
fn recover<G>(operation: &'static str) -> impl FnOnce(PoisonError<G>) -> G {
    move |poisoned| {
        if !POISON_WARNED.swap(true, Ordering::Relaxed) {
            warn!(operation, "metrics lock poisoned; recovered inner value");
        }
        poisoned.into_inner()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
}

/// Loop rates plus the state of the running area at the time of the sample.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimulationMetrics {
    pub loop_metrics: LoopMetricsSnapshot,
    pub frame: u64,
    pub mob_count: usize,
    pub day_minutes: f32,
}

#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<SimulationMetrics>>,
}

impl MetricsHandle {
    pub fn latest(&self) -> SimulationMetrics {
        *self.latest.read().unwrap_or_else(recover("read"))
    }

    pub(crate) fn publish(&self, metrics: SimulationMetrics) {
        *self.latest.write().unwrap_or_else(recover("write")) = metrics;
    }
}

#[derive(Debug, Default)]
struct IntervalCounts {
    frames: u32,
    ticks: u32,
    frame_time: Duration,
}

impl IntervalCounts {
    fn into_snapshot(self, elapsed: Duration) -> LoopMetricsSnapshot {
        let seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time.as_secs_f32() * 1000.0 / frames as f32,
        };
        LoopMetricsSnapshot {
            fps: self.frames as f32 / seconds,
            tps: self.ticks as f32 / seconds,
            frame_time_ms,
        }
    }
}

/// Counts frames and ticks over an interval of loop time. Loop time is
/// whatever clock the runner advances, wall time or virtual frames.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval: Duration,
    interval_start: Duration,
    counts: IntervalCounts,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            interval_start: Duration::ZERO,
            counts: IntervalCounts::default(),
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.counts.frames = self.counts.frames.saturating_add(1);
        self.counts.frame_time = self.counts.frame_time.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.counts.ticks = self.counts.ticks.saturating_add(1);
    }

    /// Closes the interval once `loop_time` has moved past its end.
    pub(crate) fn maybe_snapshot(&mut self, loop_time: Duration) -> Option<LoopMetricsSnapshot> {
        let elapsed = loop_time.saturating_sub(self.interval_start);
        if elapsed < self.interval {
            return None;
        }
        self.interval_start = loop_time;
        Some(mem::take(&mut self.counts).into_snapshot(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison_lock(lock: &RwLock<SimulationMetrics>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });
    }

    #[test]
    fn snapshot_averages_over_the_interval() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        for _ in 0..2 {
            accumulator.record_frame(Duration::from_millis(16));
        }
        for _ in 0..4 {
            accumulator.record_tick();
        }

        let snapshot = accumulator
            .maybe_snapshot(Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.tps - 4.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
    }

    #[test]
    fn next_interval_starts_where_the_last_one_ended() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        accumulator.record_frame(Duration::from_millis(16));
        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(500))
            .is_none());
        assert!(accumulator.maybe_snapshot(Duration::from_secs(1)).is_some());
        assert!(accumulator
            .maybe_snapshot(Duration::from_millis(1500))
            .is_none());

        let snapshot = accumulator
            .maybe_snapshot(Duration::from_secs(2))
            .expect("second interval");
        assert_eq!(snapshot.fps, 0.0);
        assert_eq!(snapshot.frame_time_ms, 0.0);
    }

    #[test]
    fn latest_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.latest.as_ref());

        assert_eq!(handle.latest(), SimulationMetrics::default());
    }

    #[test]
    fn publish_recovers_after_poison_without_panic() {
        let handle = MetricsHandle::default();
        poison_lock(handle.latest.as_ref());

        let expected = SimulationMetrics {
            loop_metrics: LoopMetricsSnapshot {
                fps: 15.0,
                tps: 60.0,
                frame_time_ms: 11.0,
            },
            frame: 120,
            mob_count: 4,
            day_minutes: 421.0,
        };
        handle.publish(expected);

        assert_eq!(handle.latest(), expected);
    }
}
