//! Engine and Stream Configuration

use std::time::Duration;

use otic_dsp::ProcessContext;
use serde::{Deserialize, Serialize};

/// Audio stream configuration
///
/// These are the transport's constants. Everything downstream (coefficients,
/// tone increment, buffer sizes) is derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,

    /// Block size in frames (power of two, constant across the graph)
    pub block_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            block_size: 128,
        }
    }
}

impl StreamConfig {
    /// Calculate latency of one block in milliseconds
    pub fn latency_ms(&self) -> f32 {
        (self.block_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Wall-clock duration of one block
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(f64::from(self.block_size) / f64::from(self.sample_rate))
    }

    /// Interleaved samples per block
    pub fn block_len(&self) -> usize {
        self.block_size as usize * self.channels as usize
    }

    /// DSP-side view of this configuration
    pub fn process_context(&self) -> ProcessContext {
        ProcessContext::new(
            f64::from(self.sample_rate),
            self.channels as usize,
            self.block_size as usize,
        )
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        // The 12 kHz test tone ceiling must stay strictly below Nyquist
        if self.sample_rate < 32000 || self.sample_rate > 192000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels == 0 || self.channels > 8 {
            return Err(format!("Invalid channel count: {}", self.channels));
        }
        if !self.block_size.is_power_of_two() || self.block_size < 16 || self.block_size > 4096 {
            return Err(format!("Invalid block size: {}", self.block_size));
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Stream configuration
    pub stream: StreamConfig,

    /// Capacity of each transport ring, in blocks
    pub ring_buffer_blocks: usize,

    /// Capacity of the event channel
    pub event_capacity: usize,

    /// Send a level meter event every N processed blocks
    pub level_update_blocks: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stream: StreamConfig::default(),
            ring_buffer_blocks: 8,
            event_capacity: 256,
            // ~30 updates per second at 44.1 kHz / 128
            level_update_blocks: 12,
        }
    }
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                block_size: 64, // ~1.5ms latency
                ..StreamConfig::default()
            },
            ring_buffer_blocks: 16,
            level_update_blocks: 24,
            ..Self::default()
        }
    }

    /// Create config optimized for stability
    pub fn stable() -> Self {
        Self {
            stream: StreamConfig {
                block_size: 512, // ~11.6ms latency
                ..StreamConfig::default()
            },
            ring_buffer_blocks: 4,
            level_update_blocks: 3,
            ..Self::default()
        }
    }

    /// Ring capacity in samples
    pub fn ring_capacity(&self) -> usize {
        self.stream.block_len() * self.ring_buffer_blocks.max(2)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate()?;
        if self.event_capacity == 0 {
            return Err("Event channel capacity must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StreamConfig::default();
        assert_eq!(config.sample_rate, 44100);
        assert_eq!(config.channels, 1);
        assert_eq!(config.block_size, 128);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_latency_calculation() {
        let config = StreamConfig {
            sample_rate: 48000,
            channels: 2,
            block_size: 512,
        };
        assert!((config.latency_ms() - 10.666).abs() < 0.01);
        assert_eq!(config.block_len(), 1024);
    }

    #[test]
    fn test_process_context() {
        let ctx = StreamConfig::default().process_context();
        assert_eq!(ctx.sample_rate, 44100.0);
        assert_eq!(ctx.channels, 1);
        assert_eq!(ctx.block_size, 128);
    }

    #[test]
    fn test_validation() {
        let invalid_rate = StreamConfig {
            sample_rate: 8000,
            ..Default::default()
        };
        assert!(invalid_rate.validate().is_err());

        let invalid_channels = StreamConfig {
            channels: 0,
            ..Default::default()
        };
        assert!(invalid_channels.validate().is_err());

        let not_power_of_two = StreamConfig {
            block_size: 100,
            ..Default::default()
        };
        assert!(not_power_of_two.validate().is_err());

        let too_small = StreamConfig {
            block_size: 8,
            ..Default::default()
        };
        assert!(too_small.validate().is_err());
    }

    #[test]
    fn test_sample_rate_floor_keeps_tone_below_nyquist() {
        for rate in [16000, 24000] {
            let config = StreamConfig {
                sample_rate: rate,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "rate {rate} accepted");
        }

        let lowest = StreamConfig {
            sample_rate: 32000,
            ..Default::default()
        };
        assert!(lowest.validate().is_ok());
        let nyquist = f64::from(lowest.sample_rate) / 2.0;
        assert!(f64::from(crate::params::RouteSelectors::FREQ_MAX_HZ) < nyquist);
    }

    #[test]
    fn test_preset_configs() {
        let low_latency = EngineConfig::low_latency();
        let stable = EngineConfig::stable();

        assert!(low_latency.validate().is_ok());
        assert!(stable.validate().is_ok());
        assert!(low_latency.stream.latency_ms() < stable.stream.latency_ms());
    }

    #[test]
    fn test_ring_capacity() {
        let config = EngineConfig::default();
        assert_eq!(config.ring_capacity(), 128 * 8);
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }
}
