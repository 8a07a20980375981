//! Parameter Controller
//!
//! Single owner of the user-adjustable state. Every mutator runs the same
//! three steps: clamp the request, derive the full [`PipelineParams`]
//! snapshot, publish it through the handoff. Unrelated bands are recomputed
//! too; that keeps every publish complete and self-consistent.

use otic_dsp::{Preset, ProcessContext};
use tracing::debug;

use crate::handoff::{self, ParamReader, ParamWriter};
use crate::params::{EqParams, PipelineParams, RouteSelectors};

pub struct ParameterController {
    eq: EqParams,
    route: RouteSelectors,
    sample_rate: f64,
    writer: ParamWriter,
}

impl ParameterController {
    /// Controller at defaults, plus the reader end for the signal graph
    ///
    /// The reader starts out with the default snapshot already in place, so
    /// the audio path never runs on undefined parameters.
    pub fn new(context: &ProcessContext) -> (Self, ParamReader) {
        let eq = EqParams::default();
        let route = RouteSelectors::default();
        let initial = PipelineParams::derive(&eq, &route, context.sample_rate);
        let (writer, reader) = handoff::channel(initial);

        let controller = Self {
            eq,
            route,
            sample_rate: context.sample_rate,
            writer,
        };
        (controller, reader)
    }

    /// Clamp and apply all four EQ fields at once
    pub fn apply_params(&mut self, requested: EqParams) {
        self.eq = requested.clamped_or(&self.eq);
        self.publish();
    }

    /// Apply a preset's band gains, keeping the current global gain
    pub fn apply_preset(&mut self, preset: &Preset) {
        let (_, gains) = preset;
        let requested = EqParams {
            global_gain: self.eq.global_gain,
            ..EqParams::from_band_gains(*gains)
        };
        self.apply_params(requested);
    }

    /// Last clamped EQ parameters (never the raw request)
    pub fn params(&self) -> EqParams {
        self.eq
    }

    pub fn route(&self) -> RouteSelectors {
        self.route
    }

    pub fn set_test_mode(&mut self, enabled: bool) {
        self.route.test_mode = enabled;
        self.publish();
    }

    /// Clamped to [50, 12000] Hz
    pub fn set_test_frequency(&mut self, hz: f32) {
        self.route.test_frequency_hz =
            RouteSelectors::clamp_frequency(hz, self.route.test_frequency_hz);
        self.publish();
    }

    /// Clamped to [-90, -3] dB; -90 dB is exact silence
    pub fn set_test_level(&mut self, db: f32) {
        self.route.test_level_db = RouteSelectors::clamp_level(db, self.route.test_level_db);
        self.publish();
    }

    /// The snapshot matching the current state
    pub fn snapshot(&self) -> PipelineParams {
        PipelineParams::derive(&self.eq, &self.route, self.sample_rate)
    }

    /// Number of publishes so far
    pub fn generation(&self) -> u64 {
        self.writer.generation()
    }

    /// Block boundaries where the audio path kept its previous snapshot
    pub fn contended(&self) -> u64 {
        self.writer.contended()
    }

    fn publish(&mut self) {
        let snapshot = self.snapshot();
        self.writer.publish(snapshot);
        debug!(
            gain = self.eq.global_gain,
            eq500 = self.eq.band_500_db,
            eq2000 = self.eq.band_2000_db,
            eq4000 = self.eq.band_4000_db,
            test_mode = self.route.test_mode,
            test_hz = self.route.test_frequency_hz,
            test_db = self.route.test_level_db,
            "Published parameter set"
        );
    }
}
