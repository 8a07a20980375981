//! Signal Graph
//!
//! Fixed topology, built once and never rewired:
//!
//! ```text
//! Source ─▶ Gain ─▶ EQ500 ─▶ EQ2000 ─▶ EQ4000 ─▶ Mixer[0] ─┐
//!                                                          ├─▶ Output
//!                                 Test Tone ─▶ Mixer[1] ───┘
//! ```
//!
//! One call to [`SignalGraph::process_block`] is one block tick. New
//! parameters are picked up only at the top of a tick.

use otic_dsp::{
    AudioProcessor, BiquadCoefficients, DspError, Equalizer, GainStage, Mixer, ProcessContext,
    ToneGenerator, EQ_BANDS,
};

use crate::config::StreamConfig;
use crate::controller::ParameterController;
use crate::error::{EngineError, EngineResult};
use crate::handoff::ParamReader;
use crate::params::PipelineParams;

/// Mixer input carrying the equalized signal
pub const NORMAL_INPUT: usize = 0;
/// Mixer input carrying the test tone
pub const TEST_INPUT: usize = 1;

pub struct SignalGraph {
    context: ProcessContext,
    params: ParamReader,
    gain: GainStage,
    equalizer: Equalizer,
    tone: ToneGenerator,
    mixer: Mixer<2>,
    // Scratch blocks, sized once at construction
    path: Vec<f32>,
    tone_block: Vec<f32>,
}

impl SignalGraph {
    /// Build the graph and load the reader's current snapshot
    ///
    /// Allocates the scratch blocks; call during setup.
    pub fn new(context: ProcessContext, params: ParamReader) -> Self {
        let block_len = context.block_len();
        let mut graph = Self {
            context,
            params,
            gain: GainStage::default(),
            equalizer: Equalizer::new(context.channels),
            tone: ToneGenerator::new(context.sample_rate),
            mixer: Mixer::new(),
            path: vec![0.0; block_len],
            tone_block: vec![0.0; block_len],
        };
        graph.load_snapshot();
        graph
    }

    /// Advance the graph by one block
    ///
    /// `input` and `output` must both be exactly one block long.
    #[inline]
    pub fn process_block(&mut self, input: &[f32], output: &mut [f32]) -> Result<(), DspError> {
        let expected = self.path.len();
        for got in [input.len(), output.len()] {
            if got != expected {
                return Err(DspError::BufferSizeMismatch { expected, got });
            }
        }

        if self.params.refresh() {
            self.load_snapshot();
        }

        // Source
        self.path.copy_from_slice(input);
        // Gain -> band 1 -> band 2 -> band 3
        self.gain.process(&mut self.path, &self.context);
        self.equalizer.process(&mut self.path, &self.context);

        // The tone only runs while it is routed
        if self.mixer.input_gain(TEST_INPUT) != Some(0.0) {
            self.tone.process(&mut self.tone_block, self.context.channels);
        }

        self.mixer
            .process([self.path.as_slice(), self.tone_block.as_slice()], output)
    }

    fn load_snapshot(&mut self) {
        let snapshot = *self.params.current();
        self.gain.set_gain(snapshot.input_gain);
        self.equalizer.set_coefficients(&snapshot.bands);
        self.mixer.set_gains([snapshot.route.normal, snapshot.route.test]);
        self.tone.set_frequency(snapshot.tone.frequency_hz);
        self.tone.set_amplitude(snapshot.tone.amplitude);
    }

    /// The parameter snapshot the last block ran with
    pub fn active_params(&self) -> &PipelineParams {
        self.params.current()
    }

    /// Current mixer gains: [normal, test]
    pub fn route_gains(&self) -> [f32; 2] {
        self.mixer.gains()
    }

    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    /// Clear filter history and restart the tone
    pub fn reset(&mut self) {
        self.equalizer.reset();
        self.tone.reset();
    }
}

/// Validate `stream` and build a connected controller and graph
pub fn build_pipeline(stream: &StreamConfig) -> EngineResult<(ParameterController, SignalGraph)> {
    stream.validate().map_err(EngineError::ConfigError)?;
    let context = stream.process_context();

    // Coefficient preconditions are checked once here, not on the audio path
    for band in EQ_BANDS {
        BiquadCoefficients::try_peaking(band.frequency(), band.q(), 0.0, context.sample_rate)?;
    }

    let (controller, reader) = ParameterController::new(&context);
    Ok((controller, SignalGraph::new(context, reader)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{EqParams, RouteSelectors};
    use std::f64::consts::PI;

    const FS: f64 = 44100.0;
    const BLOCK: usize = 128;

    fn pipeline() -> (ParameterController, SignalGraph) {
        build_pipeline(&StreamConfig::default()).unwrap()
    }

    fn sine_block(freq: f64, amplitude: f32, index: usize) -> Vec<f32> {
        (0..BLOCK)
            .map(|i| {
                let n = index * BLOCK + i;
                amplitude * (2.0 * PI * freq * n as f64 / FS).sin() as f32
            })
            .collect()
    }

    /// Run `blocks` blocks of a sine and return (input peak, output peak) over the tail
    fn measure(graph: &mut SignalGraph, freq: f64, amplitude: f32, blocks: usize) -> (f32, f32) {
        let settle = blocks / 2;
        let mut output = vec![0.0; BLOCK];
        let (mut in_peak, mut out_peak) = (0.0_f32, 0.0_f32);
        for b in 0..blocks {
            let input = sine_block(freq, amplitude, b);
            graph.process_block(&input, &mut output).unwrap();
            if b >= settle {
                in_peak = input.iter().fold(in_peak, |m, s| m.max(s.abs()));
                out_peak = output.iter().fold(out_peak, |m, s| m.max(s.abs()));
            }
        }
        (in_peak, out_peak)
    }

    #[test]
    fn test_default_params_pass_1khz_unchanged() {
        let (_controller, mut graph) = pipeline();
        let (in_peak, out_peak) = measure(&mut graph, 1000.0, 0.5, 40);
        assert!((out_peak / in_peak - 1.0).abs() < 1e-4, "ratio {}", out_peak / in_peak);
    }

    #[test]
    fn test_default_params_sample_exact_within_tolerance() {
        let (_controller, mut graph) = pipeline();
        let mut output = vec![0.0; BLOCK];
        for b in 0..10 {
            let input = sine_block(1000.0, 0.5, b);
            graph.process_block(&input, &mut output).unwrap();
            for (x, y) in input.iter().zip(output.iter()) {
                assert!((x - y).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_band_500_boost_end_to_end() {
        let (mut controller, mut graph) = pipeline();
        controller.apply_params(EqParams::new(1.0, 12.0, 0.0, 0.0));

        let (in_peak, out_peak) = measure(&mut graph, 500.0, 0.1, 80);
        let ratio = out_peak / in_peak;
        assert!((ratio - 3.98).abs() < 0.08, "ratio {ratio}");
    }

    #[test]
    fn test_global_gain_scales_output() {
        let (mut controller, mut graph) = pipeline();
        controller.apply_params(EqParams::new(2.0, 0.0, 0.0, 0.0));

        let (in_peak, out_peak) = measure(&mut graph, 1000.0, 0.25, 20);
        assert!((out_peak / in_peak - 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_update_lands_at_block_boundary() {
        let (mut controller, mut graph) = pipeline();
        let input = vec![0.5; BLOCK];
        let mut output = vec![0.0; BLOCK];

        graph.process_block(&input, &mut output).unwrap();
        controller.apply_params(EqParams::new(0.0, 0.0, 0.0, 0.0));
        // Nothing changes until the next tick
        assert_eq!(graph.active_params().input_gain, 1.0);

        graph.process_block(&input, &mut output).unwrap();
        assert_eq!(graph.active_params().input_gain, 0.0);
        assert!(output.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_test_mode_routes_tone_only() {
        let (mut controller, mut graph) = pipeline();
        controller.set_test_level(-3.0);
        controller.set_test_frequency(1000.0);
        controller.set_test_mode(true);

        let input = sine_block(440.0, 0.9, 0);
        let mut output = vec![0.0; BLOCK];
        let mut peak = 0.0_f32;
        for _ in 0..4 {
            graph.process_block(&input, &mut output).unwrap();
            peak = output.iter().fold(peak, |m, s| m.max(s.abs()));
        }
        assert_eq!(graph.route_gains(), [0.0, 1.0]);
        assert!((peak - 0.708).abs() < 0.01, "peak {peak}");
    }

    #[test]
    fn test_tone_ceiling_below_nyquist_at_lowest_rate() {
        let low = StreamConfig {
            sample_rate: 16000,
            ..StreamConfig::default()
        };
        assert!(matches!(build_pipeline(&low), Err(EngineError::ConfigError(_))));

        let lowest = StreamConfig {
            sample_rate: 32000,
            ..StreamConfig::default()
        };
        let (mut controller, mut graph) = build_pipeline(&lowest).unwrap();
        controller.set_test_frequency(20000.0);
        controller.set_test_level(-3.0);
        controller.set_test_mode(true);
        assert_eq!(controller.route().test_frequency_hz, RouteSelectors::FREQ_MAX_HZ);

        // One second of output: an aliased tone would cross zero far less often
        let input = vec![0.0; BLOCK];
        let mut output = vec![0.0; BLOCK];
        let mut previous = 0.0_f32;
        let mut crossings = 0;
        for _ in 0..lowest.sample_rate as usize / BLOCK {
            graph.process_block(&input, &mut output).unwrap();
            for &sample in &output {
                if previous < 0.0 && sample >= 0.0 {
                    crossings += 1;
                }
                previous = sample;
            }
        }
        assert!((crossings as i64 - 12000).abs() <= 2, "crossings {crossings}");
    }

    #[test]
    fn test_tone_floor_is_exact_silence() {
        let (mut controller, mut graph) = pipeline();
        controller.set_test_mode(true);
        controller.set_test_level(-120.0);

        let input = sine_block(1000.0, 0.9, 0);
        let mut output = vec![1.0; BLOCK];
        for _ in 0..8 {
            graph.process_block(&input, &mut output).unwrap();
            assert!(output.iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_toggle_back_restores_normal_path() {
        let (mut controller, mut graph) = pipeline();
        let input = vec![0.25; BLOCK];
        let mut output = vec![0.0; BLOCK];

        controller.set_test_mode(true);
        graph.process_block(&input, &mut output).unwrap();
        assert_eq!(graph.route_gains(), [0.0, 1.0]);

        controller.set_test_mode(false);
        graph.process_block(&input, &mut output).unwrap();
        assert_eq!(graph.route_gains(), [1.0, 0.0]);
    }

    #[test]
    fn test_wrong_block_size_rejected() {
        let (_controller, mut graph) = pipeline();
        let input = vec![0.0; 64];
        let mut output = vec![0.0; BLOCK];
        assert!(matches!(
            graph.process_block(&input, &mut output),
            Err(DspError::BufferSizeMismatch {
                expected: 128,
                got: 64,
            })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = StreamConfig {
            block_size: 100,
            ..StreamConfig::default()
        };
        assert!(matches!(build_pipeline(&config), Err(EngineError::ConfigError(_))));
    }

    #[test]
    fn test_stereo_graph() {
        let config = StreamConfig {
            channels: 2,
            ..StreamConfig::default()
        };
        let (_controller, mut graph) = build_pipeline(&config).unwrap();
        let input: Vec<f32> = (0..BLOCK).flat_map(|i| [i as f32 * 0.001, 0.0]).collect();
        let mut output = vec![0.0; BLOCK * 2];
        graph.process_block(&input, &mut output).unwrap();
        for frame in output.chunks_exact(2) {
            assert_eq!(frame[1], 0.0);
        }
    }

    #[test]
    fn test_concurrent_updates_never_tear() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;
        use std::thread;

        let (mut controller, mut graph) = pipeline();
        let route = RouteSelectors::default();
        let a = EqParams::new(0.5, 12.0, -6.0, 20.0);
        let b = EqParams::new(3.0, -20.0, 30.0, -3.0);
        let allowed = [
            PipelineParams::derive(&EqParams::default(), &route, FS),
            PipelineParams::derive(&a, &route, FS),
            PipelineParams::derive(&b, &route, FS),
        ];

        let done = Arc::new(AtomicBool::new(false));
        let done_control = Arc::clone(&done);
        let control = thread::spawn(move || {
            for i in 0..5_000 {
                controller.apply_params(if i % 2 == 0 { a } else { b });
            }
            done_control.store(true, Ordering::SeqCst);
            controller
        });

        let input = vec![0.1; BLOCK];
        let mut output = vec![0.0; BLOCK];
        let mut blocks = 0;
        while !done.load(Ordering::SeqCst) || blocks < 10 {
            graph.process_block(&input, &mut output).unwrap();
            let active = graph.active_params();
            assert!(allowed.contains(active), "graph ran with a torn parameter set");
            // The stages must hold exactly what the snapshot says
            assert_eq!(graph.route_gains(), [active.route.normal, active.route.test]);
            blocks += 1;
        }

        let controller = control.join().unwrap();
        graph.process_block(&input, &mut output).unwrap();
        assert_eq!(*graph.active_params(), controller.snapshot());
    }
}
