//! Delta batch coalescing
//!
//! Bounds the rate at which delta bursts reach the matcher: at most one
//! application to the book per window (500 ms). Coalescing is trailing
//! edge at whole-batch granularity — within a window only the *last* batch
//! received survives, and it is released as a unit, in arrival order, when
//! the window elapses. Batches are never merged level-by-level, reordered,
//! or split; superseded intermediate batches are dropped. If nothing
//! arrived, nothing fires.
//!
//! The coalescer is driven by explicit millisecond timestamps so window
//! behavior is deterministic under test; the connector supplies wall-clock
//! time in production.

use tracing::debug;

use crate::feed::LevelChange;

/// Default coalescing window in milliseconds.
pub const DEFAULT_WINDOW_MS: i64 = 500;

/// Trailing-edge, last-batch-wins coalescer for delta batches.
#[derive(Debug)]
pub struct UpdateCoalescer {
    /// Window length in milliseconds.
    window_ms: i64,
    /// Start of the currently open window, if one is open.
    window_started_at: Option<i64>,
    /// The batch that will be released when the window fires.
    pending: Option<Vec<LevelChange>>,
    /// Total batches offered.
    batches_received: u64,
    /// Batches replaced by a later batch inside the same window.
    batches_superseded: u64,
    /// Batches released to the matcher.
    batches_released: u64,
}

impl UpdateCoalescer {
    /// Create a coalescer with the default window.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_WINDOW_MS)
    }

    /// Create a coalescer with a custom window length.
    pub fn with_window(window_ms: i64) -> Self {
        Self {
            window_ms,
            window_started_at: None,
            pending: None,
            batches_received: 0,
            batches_superseded: 0,
            batches_released: 0,
        }
    }

    /// Buffer a delta batch.
    ///
    /// Opens a window if none is open; a batch arriving inside an open
    /// window replaces the buffered one (the earlier batch is dropped,
    /// never merged).
    pub fn offer(&mut self, batch: Vec<LevelChange>, now_ms: i64) {
        self.batches_received += 1;
        if self.pending.is_some() {
            self.batches_superseded += 1;
            debug!(
                superseded = self.batches_superseded,
                "delta batch superseded inside coalescing window"
            );
        }
        if self.window_started_at.is_none() {
            self.window_started_at = Some(now_ms);
        }
        self.pending = Some(batch);
    }

    /// Release the buffered batch once the window has elapsed.
    ///
    /// Returns `None` while the window is still open or when nothing is
    /// buffered.
    pub fn poll(&mut self, now_ms: i64) -> Option<Vec<LevelChange>> {
        let started = self.window_started_at?;
        if now_ms - started < self.window_ms {
            return None;
        }
        self.window_started_at = None;
        self.batches_released += 1;
        self.pending.take()
    }

    /// Drop any buffered-but-unapplied batch (connection teardown).
    ///
    /// Returns whether a batch was discarded.
    pub fn discard(&mut self) -> bool {
        self.window_started_at = None;
        let had_pending = self.pending.take().is_some();
        if had_pending {
            debug!("discarding pending delta batch at teardown");
        }
        had_pending
    }

    /// Whether a batch is currently buffered.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Window length in milliseconds.
    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Total batches offered since creation.
    pub fn batches_received(&self) -> u64 {
        self.batches_received
    }

    /// Batches dropped in favor of a later batch.
    pub fn batches_superseded(&self) -> u64 {
        self.batches_superseded
    }

    /// Batches released to the matcher.
    pub fn batches_released(&self) -> u64 {
        self.batches_released
    }
}

impl Default for UpdateCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::numeric::{Price, Size};
    use types::order::Side;

    fn change(price: &str, size: &str) -> LevelChange {
        LevelChange(
            Side::BUY,
            Price::from_str(price).unwrap(),
            Size::from_str(size).unwrap(),
        )
    }

    #[test]
    fn test_nothing_fires_on_empty_window() {
        let mut coalescer = UpdateCoalescer::new();
        assert_eq!(coalescer.poll(10_000), None);
    }

    #[test]
    fn test_batch_held_until_window_elapses() {
        let mut coalescer = UpdateCoalescer::new();
        coalescer.offer(vec![change("100", "1")], 1_000);

        assert_eq!(coalescer.poll(1_499), None);
        let released = coalescer.poll(1_500).unwrap();
        assert_eq!(released, vec![change("100", "1")]);
    }

    #[test]
    fn test_last_batch_wins_within_window() {
        let mut coalescer = UpdateCoalescer::new();
        coalescer.offer(vec![change("100", "1")], 1_000);
        coalescer.offer(vec![change("101", "2"), change("102", "3")], 1_200);

        let released = coalescer.poll(1_500).unwrap();
        // the second batch, whole and in arrival order
        assert_eq!(released, vec![change("101", "2"), change("102", "3")]);
        assert_eq!(coalescer.batches_superseded(), 1);
        assert_eq!(coalescer.batches_released(), 1);

        // exactly one release per window
        assert_eq!(coalescer.poll(2_500), None);
    }

    #[test]
    fn test_new_window_opens_after_release() {
        let mut coalescer = UpdateCoalescer::new();
        coalescer.offer(vec![change("100", "1")], 1_000);
        assert!(coalescer.poll(1_500).is_some());

        coalescer.offer(vec![change("200", "1")], 1_600);
        assert_eq!(coalescer.poll(1_700), None);
        assert!(coalescer.poll(2_100).is_some());
    }

    #[test]
    fn test_discard_drops_pending() {
        let mut coalescer = UpdateCoalescer::new();
        coalescer.offer(vec![change("100", "1")], 1_000);

        assert!(coalescer.discard());
        assert!(!coalescer.has_pending());
        assert_eq!(coalescer.poll(5_000), None);
        assert!(!coalescer.discard());
    }

    #[test]
    fn test_custom_window() {
        let mut coalescer = UpdateCoalescer::with_window(100);
        coalescer.offer(vec![change("100", "1")], 0);

        assert_eq!(coalescer.poll(99), None);
        assert!(coalescer.poll(100).is_some());
    }
}
