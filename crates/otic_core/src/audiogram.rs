//! Audiogram tooling
//!
//! A relative audiogram is measured with one adaptive 2-down-1-up staircase
//! per test frequency, driving the test tone. The resulting thresholds are
//! mapped onto the three EQ bands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::params::EqParams;
use otic_dsp::{EqBand, EQ_BANDS, NUM_BANDS};

/// Test frequencies, in presentation order
pub const AUDIOGRAM_FREQUENCIES: [u32; 8] = [250, 500, 1000, 2000, 3000, 4000, 6000, 8000];

pub const START_DB: f32 = -45.0;
pub const MIN_DB: f32 = -80.0;
pub const MAX_DB: f32 = -3.0;

const STEP_LARGE_DB: f32 = 6.0;
const STEP_MEDIUM_DB: f32 = 3.0;
const STEP_SMALL_DB: f32 = 2.0;

const STOP_REVERSALS: usize = 6;
const AVERAGED_REVERSALS: usize = 4;

/// Fraction of the measured loss given back as band gain
pub const GAIN_FACTOR: f32 = 0.5;
pub const GAIN_MAX_DB: f32 = 25.0;
pub const GAIN_MIN_DB: f32 = 0.0;

/// Audiogram frequencies averaged into each band
pub fn band_frequencies(band: EqBand) -> &'static [u32] {
    match band {
        EqBand::Low500 => &[250, 500],
        EqBand::Mid2000 => &[1000, 2000, 3000],
        EqBand::High4000 => &[4000, 6000, 8000],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// 2-down-1-up adaptive staircase
///
/// Two consecutive correct answers lower the level, one wrong answer raises
/// it. A change of direction records the new level as a reversal; the step
/// shrinks from 6 to 3 to 2 dB as reversals accumulate.
#[derive(Debug, Clone)]
pub struct Staircase {
    level_db: f32,
    step_db: f32,
    reversals: Vec<f32>,
    last_direction: Option<Direction>,
    correct_streak: u32,
}

impl Default for Staircase {
    fn default() -> Self {
        Self::new(START_DB)
    }
}

impl Staircase {
    pub fn new(start_db: f32) -> Self {
        Self {
            level_db: start_db.clamp(MIN_DB, MAX_DB),
            step_db: STEP_LARGE_DB,
            reversals: Vec::with_capacity(STOP_REVERSALS),
            last_direction: None,
            correct_streak: 0,
        }
    }

    /// Record one answer and move the level
    pub fn update(&mut self, correct: bool) {
        let direction = if correct {
            self.correct_streak += 1;
            if self.correct_streak < 2 {
                // First of a pair: hold level and direction
                return;
            }
            self.correct_streak = 0;
            self.level_db -= self.step_db;
            Direction::Down
        } else {
            self.correct_streak = 0;
            self.level_db += self.step_db;
            Direction::Up
        };
        self.level_db = self.level_db.clamp(MIN_DB, MAX_DB);

        if self.last_direction.is_some_and(|last| last != direction) {
            self.reversals.push(self.level_db);
        }
        self.last_direction = Some(direction);

        self.step_db = match self.reversals.len() {
            0 => STEP_LARGE_DB,
            1 => STEP_MEDIUM_DB,
            _ => STEP_SMALL_DB,
        };
    }

    /// Level for the next trial
    pub fn level_db(&self) -> f32 {
        self.level_db
    }

    pub fn step_db(&self) -> f32 {
        self.step_db
    }

    pub fn reversals(&self) -> &[f32] {
        &self.reversals
    }

    pub fn is_done(&self) -> bool {
        self.reversals.len() >= STOP_REVERSALS
    }

    /// Mean of the last four reversals, or the current level if there are none
    pub fn threshold(&self) -> f32 {
        if self.reversals.is_empty() {
            return self.level_db;
        }
        let tail = &self.reversals[self.reversals.len().saturating_sub(AVERAGED_REVERSALS)..];
        tail.iter().sum::<f32>() / tail.len() as f32
    }
}

/// Runs one staircase per frequency, in order
#[derive(Debug, Clone)]
pub struct Audiogram {
    frequencies: Vec<u32>,
    index: usize,
    staircase: Staircase,
    thresholds: BTreeMap<u32, f32>,
}

impl Default for Audiogram {
    fn default() -> Self {
        Self::new(&AUDIOGRAM_FREQUENCIES)
    }
}

impl Audiogram {
    pub fn new(frequencies: &[u32]) -> Self {
        Self {
            frequencies: frequencies.to_vec(),
            index: 0,
            staircase: Staircase::default(),
            thresholds: BTreeMap::new(),
        }
    }

    /// Frequency under test, `None` once every frequency is measured
    pub fn current_frequency(&self) -> Option<u32> {
        self.frequencies.get(self.index).copied()
    }

    /// Tone level for the next trial
    pub fn current_level_db(&self) -> f32 {
        self.staircase.level_db()
    }

    /// (1-based position, total) for progress display
    pub fn progress(&self) -> (usize, usize) {
        ((self.index + 1).min(self.frequencies.len()), self.frequencies.len())
    }

    /// Record an answer; moves to the next frequency when its staircase ends
    pub fn answer(&mut self, correct: bool) {
        let Some(frequency) = self.current_frequency() else {
            return;
        };
        self.staircase.update(correct);
        if self.staircase.is_done() {
            self.thresholds.insert(frequency, self.staircase.threshold());
            self.index += 1;
            self.staircase = Staircase::default();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.index >= self.frequencies.len()
    }

    /// Thresholds measured so far, in dB relative to full scale
    pub fn thresholds(&self) -> &BTreeMap<u32, f32> {
        &self.thresholds
    }
}

/// Band gains derived from an audiogram, with the working shown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudiogramEq {
    /// Best (lowest) threshold; losses are relative to it
    pub reference_db: f32,
    pub losses_db: BTreeMap<u32, f32>,
    pub band_gains_db: [f32; NUM_BANDS],
}

impl AudiogramEq {
    /// EQ parameters for these band gains at `global_gain`
    pub fn to_params(&self, global_gain: f32) -> EqParams {
        EqParams {
            global_gain,
            ..EqParams::from_band_gains(self.band_gains_db)
        }
    }
}

/// Map relative thresholds onto the three bands
///
/// Each band gets half the mean loss of its frequencies, clipped to
/// [0, 25] dB. Bands with no measured frequency get 0 dB.
pub fn compute_eq(thresholds: &BTreeMap<u32, f32>) -> AudiogramEq {
    let reference_db = thresholds
        .values()
        .copied()
        .fold(f32::INFINITY, f32::min);
    let reference_db = if reference_db.is_finite() { reference_db } else { 0.0 };

    let losses_db: BTreeMap<u32, f32> = thresholds
        .iter()
        .map(|(&freq, &db)| (freq, db - reference_db))
        .collect();

    let mut band_gains_db = [0.0; NUM_BANDS];
    for band in EQ_BANDS {
        let losses: Vec<f32> = band_frequencies(band)
            .iter()
            .filter_map(|freq| losses_db.get(freq).copied())
            .collect();
        if losses.is_empty() {
            continue;
        }
        let mean = losses.iter().sum::<f32>() / losses.len() as f32;
        band_gains_db[band.index()] = (GAIN_FACTOR * mean).clamp(GAIN_MIN_DB, GAIN_MAX_DB);
    }

    AudiogramEq {
        reference_db,
        losses_db,
        band_gains_db,
    }
}
