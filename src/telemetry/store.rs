use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::{Sample, STATS_WINDOW};

// ─── Configuration ───────────────────────────────────────────────

/// Default ring-buffer cap. At one sample every 10 s the 5-minute
/// window holds 30 entries, so this only bites under on-request load.
pub const DEFAULT_CAPACITY: usize = 4096;

// ─── Public types ────────────────────────────────────────────────

/// Thread-safe rolling store of altitude samples.
/// The sampler calls `record()`, the handlers call `window()`.
///
/// Timestamps are kept non-decreasing front to back, and anything older
/// than `retention` behind the sample being written is evicted.
pub struct SampleStore {
    inner: Mutex<Inner>,
}

// ─── Internal state ──────────────────────────────────────────────

struct Inner {
    samples: VecDeque<Sample>,
    retention: Duration,
    capacity: usize,
}

// ─── SampleStore impl ────────────────────────────────────────────

impl SampleStore {
    /// Store retaining exactly the largest query window (5 minutes).
    pub fn new(capacity: usize) -> Self {
        Self::with_retention(capacity, STATS_WINDOW)
    }

    pub fn with_retention(capacity: usize, retention: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                samples: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY) + 1),
                retention,
                capacity,
            }),
        }
    }

    /// Append a sample, keeping chronological order, then evict.
    pub fn record(&self, sample: Sample) {
        self.inner.lock().record(sample);
    }

    /// Stamp `altitude` with the current instant and append it.
    ///
    /// The clock is read under the lock so concurrent writers can never
    /// interleave out of order.
    pub fn record_now(&self, altitude: f64) -> Sample {
        let mut inner = self.inner.lock();
        let sample = Sample::now(altitude);
        inner.record(sample);
        sample
    }

    /// All samples with `timestamp >= now - duration`, oldest first.
    pub fn window(&self, now: DateTime<Utc>, duration: Duration) -> Vec<Sample> {
        self.inner.lock().window(now, duration)
    }

    pub fn latest(&self) -> Option<Sample> {
        self.inner.lock().samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().samples.is_empty()
    }
}

impl Default for SampleStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ─── Inner impl ──────────────────────────────────────────────────

impl Inner {
    fn record(&mut self, sample: Sample) {
        let late = self
            .samples
            .back()
            .is_some_and(|last| sample.timestamp < last.timestamp);

        if late {
            // Slot it in after every sample not newer than it
            let idx = self
                .samples
                .partition_point(|s| s.timestamp <= sample.timestamp);
            self.samples.insert(idx, sample);
        } else {
            self.samples.push_back(sample);
        }
        self.evict(sample.timestamp);
    }

    /// Cutoff is anchored on the incoming sample, never on the stored max,
    /// so a clock stepping backwards can't evict the write that triggered it.
    fn evict(&mut self, written_at: DateTime<Utc>) {
        // ── Age-based pruning ──────────────────────────────────────
        if let Some(cutoff) = window_start(written_at, self.retention) {
            while self.samples.front().is_some_and(|s| s.timestamp < cutoff) {
                self.samples.pop_front();
            }
        }

        // ── Hard capacity cap ──────────────────────────────────────
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    fn window(&self, now: DateTime<Utc>, duration: Duration) -> Vec<Sample> {
        // Samples are sorted, so the window is a suffix of the deque
        let start = match window_start(now, duration) {
            Some(cutoff) => self.samples.partition_point(|s| s.timestamp < cutoff),
            None => 0,
        };
        self.samples.range(start..).copied().collect()
    }
}

/// `now - duration`, or `None` when that falls outside chrono's range
/// (every stored sample then qualifies).
fn window_start(now: DateTime<Utc>, duration: Duration) -> Option<DateTime<Utc>> {
    let span = chrono::Duration::from_std(duration).ok()?;
    now.checked_sub_signed(span)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: DateTime<Utc>, offset_secs: i64, altitude: f64) -> Sample {
        Sample::new(base + chrono::Duration::seconds(offset_secs), altitude)
    }

    fn altitudes(samples: &[Sample]) -> Vec<f64> {
        samples.iter().map(|s| s.altitude).collect()
    }

    #[test]
    fn empty_store_yields_empty_window() {
        let store = SampleStore::default();
        assert!(store.is_empty());
        assert!(store.window(Utc::now(), STATS_WINDOW).is_empty());
        assert!(store.latest().is_none());
    }

    #[test]
    fn window_includes_sample_on_the_boundary() {
        let now = Utc::now();
        let store = SampleStore::default();
        store.record(at(now, -61, 1.0));
        store.record(at(now, -60, 2.0));
        store.record(at(now, -59, 3.0));

        let hit = store.window(now, Duration::from_secs(60));
        assert_eq!(altitudes(&hit), vec![2.0, 3.0]);
    }

    #[test]
    fn window_preserves_chronological_order() {
        let now = Utc::now();
        let store = SampleStore::default();
        for (i, alt) in [300.0, 310.0, 305.0, 320.0].into_iter().enumerate() {
            store.record(at(now, -200 + i as i64 * 30, alt));
        }

        let hit = store.window(now, STATS_WINDOW);
        assert_eq!(altitudes(&hit), vec![300.0, 310.0, 305.0, 320.0]);
        assert!(hit.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn narrower_window_is_a_suffix() {
        let now = Utc::now();
        let store = SampleStore::default();
        store.record(at(now, -240, 300.0));
        store.record(at(now, -120, 320.0));
        store.record(at(now, -30, 161.5));

        assert_eq!(store.window(now, STATS_WINDOW).len(), 3);
        assert_eq!(altitudes(&store.window(now, Duration::from_secs(60))), vec![161.5]);
        assert!(store.window(now, Duration::ZERO).is_empty());
    }

    #[test]
    fn late_sample_is_inserted_in_order() {
        let now = Utc::now();
        let store = SampleStore::default();
        store.record(at(now, -10, 1.0));
        store.record(at(now, -5, 3.0));
        store.record(at(now, -7, 2.0));

        let hit = store.window(now, STATS_WINDOW);
        assert_eq!(altitudes(&hit), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn evicts_samples_older_than_retention() {
        let now = Utc::now();
        let store = SampleStore::with_retention(100, Duration::from_secs(300));
        store.record(at(now, -600, 1.0));
        store.record(at(now, -301, 2.0));
        assert_eq!(store.len(), 2);

        // The write at `now` moves the cutoff to now - 300s
        store.record(at(now, 0, 3.0));
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest().map(|s| s.altitude), Some(3.0));
    }

    #[test]
    fn clock_stepping_back_keeps_new_samples() {
        let now = Utc::now();
        let store = SampleStore::default();
        store.record(at(now, 400, 300.0));

        let first = store.record_now(412.0);
        let second = store.record_now(413.0);

        let stored = store.window(now - chrono::Duration::seconds(60), STATS_WINDOW);
        assert!(stored.contains(&first));
        assert!(stored.contains(&second));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn late_sample_does_not_evict_newer_history() {
        let now = Utc::now();
        let store = SampleStore::with_retention(100, Duration::from_secs(300));
        store.record(at(now, -200, 1.0));
        store.record(at(now, 0, 2.0));
        store.record(at(now, -250, 3.0));

        assert_eq!(altitudes(&store.window(now, STATS_WINDOW)), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn capacity_drops_oldest_first() {
        let now = Utc::now();
        let store = SampleStore::new(3);
        for i in 0..5 {
            store.record(at(now, i, i as f64));
        }
        assert_eq!(store.len(), 3);
        assert_eq!(altitudes(&store.window(now, STATS_WINDOW)), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn record_now_stamps_current_time() {
        let store = SampleStore::default();
        let before = Utc::now();
        let sample = store.record_now(412.5);
        assert!(sample.timestamp >= before);
        assert_eq!(store.latest(), Some(sample));
    }

    #[test]
    fn huge_window_returns_everything() {
        let now = Utc::now();
        let store = SampleStore::default();
        store.record(at(now, -10, 1.0));
        assert_eq!(store.window(now, Duration::MAX).len(), 1);
    }
}
