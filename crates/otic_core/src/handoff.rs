//! Parameter handoff between the control path and the audio path
//!
//! A single-writer / single-reader cell holding one [`PipelineParams`]
//! snapshot. The writer holds the lock only for a struct copy. The reader
//! checks an atomic generation counter at each block boundary and, when it
//! changed, copies the snapshot under `try_lock`. If the writer happens to
//! hold the lock at that instant the reader keeps its previous snapshot and
//! tries again next block, so the audio path never waits and never sees a
//! half-written update.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::params::PipelineParams;

struct Shared {
    slot: Mutex<PipelineParams>,
    /// Bumped inside the lock on every publish
    generation: AtomicU64,
    /// Block boundaries where the reader found the lock held
    contended: AtomicU64,
}

/// Create a connected writer/reader pair seeded with `initial`
pub fn channel(initial: PipelineParams) -> (ParamWriter, ParamReader) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(initial),
        generation: AtomicU64::new(0),
        contended: AtomicU64::new(0),
    });

    let writer = ParamWriter {
        shared: Arc::clone(&shared),
    };
    let reader = ParamReader {
        shared,
        seen: 0,
        current: initial,
    };
    (writer, reader)
}

/// Control-side end. Not `Clone`: there is exactly one writer.
pub struct ParamWriter {
    shared: Arc<Shared>,
}

impl ParamWriter {
    /// Replace the published snapshot
    pub fn publish(&self, params: PipelineParams) {
        let mut slot = self.shared.slot.lock();
        *slot = params;
        self.shared.generation.fetch_add(1, Ordering::Release);
    }

    /// Number of snapshots published so far
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::Acquire)
    }

    /// How often the reader had to fall back to its previous snapshot
    pub fn contended(&self) -> u64 {
        self.shared.contended.load(Ordering::Relaxed)
    }
}

/// Audio-side end. Not `Clone`: there is exactly one reader.
pub struct ParamReader {
    shared: Arc<Shared>,
    seen: u64,
    current: PipelineParams,
}

impl ParamReader {
    /// Pick up a newer snapshot if one is available without blocking
    ///
    /// Returns `true` when `current()` changed.
    #[inline]
    pub fn refresh(&mut self) -> bool {
        if self.shared.generation.load(Ordering::Acquire) == self.seen {
            return false;
        }

        match self.shared.slot.try_lock() {
            Some(slot) => {
                self.current = *slot;
                // Read under the lock so it matches the copied snapshot
                self.seen = self.shared.generation.load(Ordering::Acquire);
                true
            }
            None => {
                self.shared.contended.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// The snapshot in effect for the current block
    pub fn current(&self) -> &PipelineParams {
        &self.current
    }

    /// Generation of the snapshot in effect
    pub fn generation(&self) -> u64 {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{EqParams, RouteSelectors};

    fn snapshot(gain: f32) -> PipelineParams {
        PipelineParams::derive(
            &EqParams::new(gain, gain, -gain, gain * 2.0),
            &RouteSelectors::default(),
            44100.0,
        )
    }

    #[test]
    fn test_initial_snapshot_visible() {
        let (_writer, reader) = channel(snapshot(1.0));
        assert_eq!(*reader.current(), snapshot(1.0));
        assert_eq!(reader.generation(), 0);
    }

    #[test]
    fn test_refresh_without_publish_is_noop() {
        let (_writer, mut reader) = channel(snapshot(1.0));
        assert!(!reader.refresh());
    }

    #[test]
    fn test_publish_then_refresh() {
        let (writer, mut reader) = channel(snapshot(1.0));
        writer.publish(snapshot(2.0));
        writer.publish(snapshot(3.0));

        assert!(reader.refresh());
        // Only the latest snapshot is observed
        assert_eq!(*reader.current(), snapshot(3.0));
        assert_eq!(reader.generation(), 2);
        assert!(!reader.refresh());
    }

    #[test]
    fn test_contended_lock_keeps_previous() {
        let (writer, mut reader) = channel(snapshot(1.0));
        writer.publish(snapshot(2.0));

        // Simulate the control path mid-update
        let guard = writer.shared.slot.lock();
        assert!(!reader.refresh());
        assert_eq!(*reader.current(), snapshot(1.0));
        drop(guard);

        assert_eq!(writer.contended(), 1);
        assert!(reader.refresh());
        assert_eq!(*reader.current(), snapshot(2.0));
    }

    #[test]
    fn test_concurrent_publish_never_tears() {
        use std::sync::atomic::AtomicBool;
        use std::thread;

        let a = snapshot(0.5);
        let b = snapshot(3.5);
        let (writer, mut reader) = channel(a);
        let done = Arc::new(AtomicBool::new(false));

        let done_writer = Arc::clone(&done);
        let handle = thread::spawn(move || {
            for i in 0..20_000 {
                writer.publish(if i % 2 == 0 { b } else { a });
            }
            done_writer.store(true, Ordering::SeqCst);
        });

        let mut observed = 0;
        while !done.load(Ordering::SeqCst) {
            if reader.refresh() {
                observed += 1;
            }
            let current = *reader.current();
            assert!(current == a || current == b, "torn snapshot observed");
        }
        handle.join().unwrap();

        if reader.refresh() {
            observed += 1;
        }
        assert!(*reader.current() == a || *reader.current() == b);
        assert!(observed > 0);
    }
}
