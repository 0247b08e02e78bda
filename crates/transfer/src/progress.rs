//! Upload throughput over a sliding time window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

const DEFAULT_WINDOW: Duration = Duration::from_secs(5);
const DEFAULT_MAX_POINTS: usize = 64;

/// Bytes acknowledged per second, measured over the last `window`.
///
/// Owned by a single transfer and fed once per acknowledged chunk. The
/// meter keeps cumulative `(instant, bytes_sent)` points, so the rate is
/// the byte delta between the oldest retained point and the newest.
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    points: VecDeque<(Instant, u64)>,
    sent: u64,
    window: Duration,
    max_points: usize,
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_MAX_POINTS)
    }
}

impl ThroughputMeter {
    /// Starts measuring now. `max_points` is clamped to at least 2.
    pub fn new(window: Duration, max_points: usize) -> Self {
        Self::starting_at(Instant::now(), window, max_points)
    }

    fn starting_at(start: Instant, window: Duration, max_points: usize) -> Self {
        let mut points = VecDeque::new();
        points.push_back((start, 0));
        Self {
            points,
            sent: 0,
            window,
            max_points: max_points.max(2),
        }
    }

    /// Total bytes recorded since the meter started.
    pub fn bytes_sent(&self) -> u64 {
        self.sent
    }

    /// Records `bytes` acknowledged just now.
    pub fn record(&mut self, bytes: u64) {
        self.record_at(Instant::now(), bytes);
    }

    fn record_at(&mut self, now: Instant, bytes: u64) {
        self.sent += bytes;
        self.points.push_back((now, self.sent));

        // Keep one point at or before the window edge as the baseline.
        if let Some(edge) = now.checked_sub(self.window) {
            while self.points.len() > 2 && self.points[1].0 <= edge {
                self.points.pop_front();
            }
        }
        while self.points.len() > self.max_points {
            self.points.pop_front();
        }
    }

    /// Average rate across the retained window, 0.0 before any progress.
    pub fn bytes_per_second(&self) -> f64 {
        let (Some(&(t0, b0)), Some(&(t1, b1))) = (self.points.front(), self.points.back()) else {
            return 0.0;
        };
        let elapsed = t1.saturating_duration_since(t0);
        if elapsed.is_zero() {
            return 0.0;
        }
        (b1 - b0) as f64 / elapsed.as_secs_f64()
    }

    /// Time left for `remaining` bytes at the current rate.
    pub fn eta(&self, remaining: u64) -> Option<Duration> {
        let rate = self.bytes_per_second();
        (rate > 0.0).then(|| Duration::from_secs_f64(remaining as f64 / rate))
    }
}
