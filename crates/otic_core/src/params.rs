//! User-facing parameters and the derived snapshot the audio path consumes

use otic_dsp::{db_to_amplitude, BiquadCoefficients, EqBand, EQ_BANDS, NUM_BANDS};
use serde::{Deserialize, Serialize};

/// Clamp into [lo, hi]; NaN keeps `fallback`
fn clamp_or(value: f32, lo: f32, hi: f32, fallback: f32) -> f32 {
    if value.is_nan() {
        fallback
    } else {
        value.clamp(lo, hi)
    }
}

/// Global gain and the three band gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqParams {
    /// Linear multiplier applied before the filters
    pub global_gain: f32,
    pub band_500_db: f32,
    pub band_2000_db: f32,
    pub band_4000_db: f32,
}

impl Default for EqParams {
    fn default() -> Self {
        Self {
            global_gain: 1.0,
            band_500_db: 0.0,
            band_2000_db: 0.0,
            band_4000_db: 0.0,
        }
    }
}

impl EqParams {
    pub const GAIN_MIN: f32 = 0.0;
    pub const GAIN_MAX: f32 = 4.0;
    pub const BAND_MIN_DB: f32 = -20.0;
    pub const BAND_MAX_DB: f32 = 30.0;

    pub fn new(global_gain: f32, band_500_db: f32, band_2000_db: f32, band_4000_db: f32) -> Self {
        Self {
            global_gain,
            band_500_db,
            band_2000_db,
            band_4000_db,
        }
    }

    /// Unity gain with the given band gains
    pub fn from_band_gains(gains: [f32; NUM_BANDS]) -> Self {
        Self::new(1.0, gains[0], gains[1], gains[2])
    }

    pub fn band_gain(&self, band: EqBand) -> f32 {
        match band {
            EqBand::Low500 => self.band_500_db,
            EqBand::Mid2000 => self.band_2000_db,
            EqBand::High4000 => self.band_4000_db,
        }
    }

    /// Band gains in cascade order
    pub fn band_gains(&self) -> [f32; NUM_BANDS] {
        EQ_BANDS.map(|band| self.band_gain(band))
    }

    /// Copy with one band replaced
    pub fn with_band_gain(mut self, band: EqBand, gain_db: f32) -> Self {
        match band {
            EqBand::Low500 => self.band_500_db = gain_db,
            EqBand::Mid2000 => self.band_2000_db = gain_db,
            EqBand::High4000 => self.band_4000_db = gain_db,
        }
        self
    }

    /// Each field clamped independently; NaN fields take the value from `fallback`
    pub fn clamped_or(&self, fallback: &EqParams) -> Self {
        let band = |v: f32, prev: f32| clamp_or(v, Self::BAND_MIN_DB, Self::BAND_MAX_DB, prev);
        Self {
            global_gain: clamp_or(
                self.global_gain,
                Self::GAIN_MIN,
                Self::GAIN_MAX,
                fallback.global_gain,
            ),
            band_500_db: band(self.band_500_db, fallback.band_500_db),
            band_2000_db: band(self.band_2000_db, fallback.band_2000_db),
            band_4000_db: band(self.band_4000_db, fallback.band_4000_db),
        }
    }

    /// Each field clamped independently; NaN fields take their defaults
    pub fn clamped(&self) -> Self {
        self.clamped_or(&Self::default())
    }
}

/// Test-tone routing state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteSelectors {
    pub test_mode: bool,
    pub test_frequency_hz: f32,
    pub test_level_db: f32,
}

impl Default for RouteSelectors {
    fn default() -> Self {
        Self {
            test_mode: false,
            test_frequency_hz: 1000.0,
            test_level_db: -90.0,
        }
    }
}

impl RouteSelectors {
    pub const FREQ_MIN_HZ: f32 = 50.0;
    pub const FREQ_MAX_HZ: f32 = 12000.0;
    pub const LEVEL_MIN_DB: f32 = -90.0;
    pub const LEVEL_MAX_DB: f32 = -3.0;

    pub fn clamp_frequency(hz: f32, fallback: f32) -> f32 {
        clamp_or(hz, Self::FREQ_MIN_HZ, Self::FREQ_MAX_HZ, fallback)
    }

    pub fn clamp_level(db: f32, fallback: f32) -> f32 {
        clamp_or(db, Self::LEVEL_MIN_DB, Self::LEVEL_MAX_DB, fallback)
    }
}

/// Mixer gains for the normal path (input 0) and the test tone (input 1)
///
/// Hard routing: exactly one of the two is 1.0, the other 0.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteGains {
    pub normal: f32,
    pub test: f32,
}

impl RouteGains {
    pub fn for_test_mode(test_mode: bool) -> Self {
        if test_mode {
            Self {
                normal: 0.0,
                test: 1.0,
            }
        } else {
            Self {
                normal: 1.0,
                test: 0.0,
            }
        }
    }

    pub fn is_exclusive(&self) -> bool {
        (self.normal == 1.0 && self.test == 0.0) || (self.normal == 0.0 && self.test == 1.0)
    }
}

/// Test-tone oscillator settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSettings {
    pub frequency_hz: f32,
    /// Linear, already floored to exact silence below -90 dB
    pub amplitude: f32,
}

/// Everything the audio path needs for one block, derived in full
///
/// Published as one unit so the audio path never mixes fields from two
/// different updates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineParams {
    pub input_gain: f32,
    pub bands: [BiquadCoefficients; NUM_BANDS],
    pub route: RouteGains,
    pub tone: ToneSettings,
}

impl PipelineParams {
    /// Derive the full snapshot from already-clamped parameters
    ///
    /// All three bands are recomputed every time, even if only one changed.
    pub fn derive(eq: &EqParams, route: &RouteSelectors, sample_rate: f64) -> Self {
        Self {
            input_gain: eq.global_gain,
            bands: EQ_BANDS.map(|band| band.coefficients(eq.band_gain(band), sample_rate)),
            route: RouteGains::for_test_mode(route.test_mode),
            tone: ToneSettings {
                frequency_hz: route.test_frequency_hz,
                amplitude: db_to_amplitude(route.test_level_db),
            },
        }
    }
}
