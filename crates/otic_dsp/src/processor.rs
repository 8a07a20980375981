//! Audio Processor Trait
//!
//! Defines the interface shared by the in-place block stages of the signal
//! path (gain, peaking filters, the EQ cascade).

/// Context passed to processors containing stream metadata
///
/// These are transport-provided constants: the DSP layer reads them, it
/// never assumes a particular sample rate or block size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessContext {
    pub sample_rate: f64,
    pub channels: usize,
    /// Frames per block
    pub block_size: usize,
}

impl ProcessContext {
    pub fn new(sample_rate: f64, channels: usize, block_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            block_size,
        }
    }

    /// Interleaved samples in one block (frames * channels)
    pub fn block_len(&self) -> usize {
        self.block_size * self.channels
    }

    /// Nyquist frequency in Hz
    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }
}

/// Trait for in-place block processors in the DSP chain
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks)
/// - NO unbounded loops
/// - Constant or O(n) time complexity where n = buffer size
///
/// Violating these rules causes audio dropouts ("glitches").
pub trait AudioProcessor: Send {
    /// Process audio buffer in-place
    ///
    /// Buffer format is interleaved: [C0, C1, ..., C0, C1, ...]
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext);

    /// Reset internal state (delay lines)
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;
}
