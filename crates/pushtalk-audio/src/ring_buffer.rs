//! Bounded single-producer/single-consumer byte buffer. This is a plain
//! mutex-guarded byte container rather than a lock-free sample ring:
//! capture and reconciliation run on two threads at session granularity,
//! not per-callback, so a lock here never sits on the audio thread's hot
//! path for longer than a `memcpy`.

use parking_lot::Mutex;

pub struct RingBuffer {
    capacity: usize,
    inner: Mutex<Vec<u8>>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends `src` to the buffer. Bytes that would exceed `capacity` are
    /// dropped silently — the hard stop on session length is enforced by
    /// the capture worker, not here.
    pub fn write(&self, src: &[u8]) {
        let mut buf = self.inner.lock();
        let remaining = self.capacity.saturating_sub(buf.len());
        if remaining == 0 {
            return;
        }
        let take = remaining.min(src.len());
        buf.extend_from_slice(&src[..take]);
    }

    /// Returns a copy of everything written so far and clears internal state.
    pub fn snapshot_and_clear(&self) -> Vec<u8> {
        let mut buf = self.inner.lock();
        std::mem::take(&mut *buf)
    }

    /// Discards accumulated bytes without copying (used on cancellation).
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::any;

    #[test]
    fn write_then_snapshot_returns_written_bytes() {
        let rb = RingBuffer::new(16);
        rb.write(&[1, 2, 3, 4]);
        rb.write(&[5, 6]);
        assert_eq!(rb.snapshot_and_clear(), vec![1, 2, 3, 4, 5, 6]);
        assert!(rb.is_empty());
    }

    #[test]
    fn overflowing_write_drops_the_tail_silently() {
        let rb = RingBuffer::new(4);
        rb.write(&[1, 2, 3]);
        rb.write(&[4, 5, 6, 7]); // only byte `4` fits
        assert_eq!(rb.snapshot_and_clear(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn clear_discards_without_returning() {
        let rb = RingBuffer::new(8);
        rb.write(&[1, 2, 3]);
        rb.clear();
        assert!(rb.is_empty());
        assert_eq!(rb.snapshot_and_clear(), Vec::<u8>::new());
    }

    #[test]
    fn snapshot_resets_capacity_for_further_writes() {
        let rb = RingBuffer::new(4);
        rb.write(&[1, 2, 3, 4, 5]);
        assert_eq!(rb.snapshot_and_clear(), vec![1, 2, 3, 4]);
        rb.write(&[9, 9]);
        assert_eq!(rb.snapshot_and_clear(), vec![9, 9]);
    }

    proptest::proptest! {
        #[test]
        fn never_exceeds_capacity_across_randomized_writes(
            capacity in 1usize..256,
            chunks in proptest::collection::vec(proptest::collection::vec(any::<u8>(), 0..64), 0..16),
        ) {
            let rb = RingBuffer::new(capacity);
            let mut expected = Vec::new();
            for chunk in &chunks {
                rb.write(chunk);
                let remaining = capacity.saturating_sub(expected.len());
                expected.extend_from_slice(&chunk[..remaining.min(chunk.len())]);
            }
            let snapshot = rb.snapshot_and_clear();
            prop_assert!(snapshot.len() <= capacity);
            prop_assert_eq!(snapshot, expected);
        }
    }
}
