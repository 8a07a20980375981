//! Audio Transport
//!
//! The seam between the engine's block clock and whatever moves samples in
//! and out of the device. The engine only sees [`AudioTransport`]; the
//! device side of the shipped [`RingTransport`] is a [`TransportHandle`].
//!
//! ```text
//!   device ──push_input──▶ rtrb ──pull_block──▶ SignalGraph
//!   device ◀──pop_output── rtrb ◀──push_block── SignalGraph
//! ```

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use rtrb::{Consumer, Producer, RingBuffer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Transport closed by the device side")]
    Closed,

    #[error("Playback ring full - dropped {dropped} samples")]
    Overflow { dropped: usize },
}

/// Block-oriented audio I/O as seen from the audio thread
///
/// Both calls must be non-blocking.
pub trait AudioTransport: Send {
    /// Fill `block` with the next captured block
    ///
    /// Returns `Ok(false)` when a full block is not yet available.
    fn pull_block(&mut self, block: &mut [f32]) -> Result<bool, TransportError>;

    /// Hand one processed block to the playback side
    fn push_block(&mut self, block: &[f32]) -> Result<(), TransportError>;
}

/// Engine side of a pair of SPSC rings
pub struct RingTransport {
    capture: Consumer<f32>,
    playback: Producer<f32>,
}

/// Device side of a [`RingTransport`]
pub struct TransportHandle {
    capture: Producer<f32>,
    playback: Consumer<f32>,
}

impl RingTransport {
    /// Create both ring halves, each `config.ring_capacity()` samples deep
    pub fn new(config: &EngineConfig) -> (Self, TransportHandle) {
        let capacity = config.ring_capacity();
        let (capture_tx, capture_rx) = RingBuffer::<f32>::new(capacity);
        let (playback_tx, playback_rx) = RingBuffer::<f32>::new(capacity);

        (
            Self {
                capture: capture_rx,
                playback: playback_tx,
            },
            TransportHandle {
                capture: capture_tx,
                playback: playback_rx,
            },
        )
    }
}

impl AudioTransport for RingTransport {
    fn pull_block(&mut self, block: &mut [f32]) -> Result<bool, TransportError> {
        // Read the flag first: once set, no more input can arrive
        let closed = self.capture.is_abandoned();
        if self.capture.slots() < block.len() {
            // Partial input left behind by a closed device is discarded
            return if closed {
                Err(TransportError::Closed)
            } else {
                Ok(false)
            };
        }
        let Ok(chunk) = self.capture.read_chunk(block.len()) else {
            return Ok(false);
        };

        let (first, second) = chunk.as_slices();
        block[..first.len()].copy_from_slice(first);
        block[first.len()..].copy_from_slice(second);
        chunk.commit_all();
        Ok(true)
    }

    fn push_block(&mut self, block: &[f32]) -> Result<(), TransportError> {
        if self.playback.is_abandoned() {
            return Err(TransportError::Closed);
        }

        match self.playback.write_chunk_uninit(block.len()) {
            Ok(chunk) => {
                chunk.fill_from_iter(block.iter().copied());
                Ok(())
            }
            Err(_) => Err(TransportError::Overflow {
                dropped: block.len(),
            }),
        }
    }
}

impl TransportHandle {
    /// Queue captured samples; returns how many fit
    pub fn push_input(&mut self, samples: &[f32]) -> usize {
        let n = samples.len().min(self.capture.slots());
        if n == 0 {
            return 0;
        }
        match self.capture.write_chunk_uninit(n) {
            Ok(chunk) => chunk.fill_from_iter(samples[..n].iter().copied()),
            Err(_) => 0,
        }
    }

    /// Drain processed samples into `out`; returns how many were written
    pub fn pop_output(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.playback.slots());
        if n == 0 {
            return 0;
        }
        let Ok(chunk) = self.playback.read_chunk(n) else {
            return 0;
        };
        let (first, second) = chunk.as_slices();
        out[..first.len()].copy_from_slice(first);
        out[first.len()..n].copy_from_slice(second);
        chunk.commit_all();
        n
    }

    /// Free space in the capture ring, in samples
    pub fn input_space(&self) -> usize {
        self.capture.slots()
    }

    /// Processed samples waiting to be popped
    pub fn output_available(&self) -> usize {
        self.playback.slots()
    }

    /// Whether the engine side has been dropped
    pub fn is_closed(&self) -> bool {
        self.capture.is_abandoned()
    }
}

/// Counters shared between the audio thread and the control side
///
/// Written with relaxed stores. Only `dropped_events` is also bumped from
/// control threads.
#[derive(Debug, Default)]
pub struct EngineStats {
    blocks_processed: AtomicU64,
    idle_polls: AtomicU64,
    overflows: AtomicU64,
    dropped_samples: AtomicU64,

    /// Events lost to a full event channel
    dropped_events: AtomicU64,

    /// Last block's output peak (f32 bits; there is no AtomicF32)
    peak_bits: AtomicU32,
}

/// Point-in-time copy of [`EngineStats`] plus handoff contention
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub blocks_processed: u64,
    pub idle_polls: u64,
    pub overflows: u64,
    pub dropped_samples: u64,
    pub dropped_events: u64,
    /// Handoff contention, read from the parameter writer
    pub contended: u64,
    pub peak: f32,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_block(&self, peak: f32) {
        self.blocks_processed.fetch_add(1, Ordering::Relaxed);
        self.peak_bits.store(peak.to_bits(), Ordering::Relaxed);
    }

    pub fn record_idle(&self) {
        self.idle_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overflow(&self, dropped: usize) {
        self.overflows.fetch_add(1, Ordering::Relaxed);
        self.dropped_samples.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    pub fn record_dropped_event(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn blocks_processed(&self) -> u64 {
        self.blocks_processed.load(Ordering::Relaxed)
    }

    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak_bits.load(Ordering::Relaxed))
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            blocks_processed: self.blocks_processed(),
            idle_polls: self.idle_polls.load(Ordering::Relaxed),
            overflows: self.overflows.load(Ordering::Relaxed),
            dropped_samples: self.dropped_samples.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
            contended: 0,
            peak: self.peak(),
        }
    }
}
