//! Audio Engine - Main Entry Point
//!
//! The AudioEngine owns the audio thread and the control side of the
//! parameter handoff.
//!
//! # Architecture
//!
//! ```text
//!   control thread(s)                        audio thread ("otic-audio")
//!   ─────────────────                        ───────────────────────────
//!   apply_params / execute                   loop {
//!        │                                     transport.pull_block
//!        ▼                                     graph.process_block ◀── ParamReader
//!   Mutex<ParameterController> ── publish ──▶  transport.push_block
//!        │                                     stats, level events
//!        └── StateUpdate ──▶ events ◀──────────  }
//! ```
//!
//! Control calls never block on the audio thread, and the audio thread never
//! blocks on control calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::controller::ParameterController;
use crate::error::{EngineError, EngineResult};
use crate::graph::{build_pipeline, SignalGraph};
use crate::message::{Command, Event, Response};
use crate::params::{EqParams, RouteSelectors};
use crate::transport::{
    AudioTransport, EngineStats, RingTransport, StatsSnapshot, TransportError, TransportHandle,
};
use otic_dsp::find_preset;

/// Shortest sleep while waiting for input
const MIN_IDLE_WAIT: Duration = Duration::from_micros(100);

/// Send without blocking; a full channel counts as a dropped event
fn emit(events: &Sender<Event>, stats: &EngineStats, event: Event) {
    if events.try_send(event).is_err() {
        stats.record_dropped_event();
    }
}

/// The main audio engine controller
///
/// Lives on the control side and may be shared between control threads.
pub struct AudioEngine {
    /// Single writer of the parameter handoff
    controller: Mutex<ParameterController>,

    event_sender: Sender<Event>,
    event_receiver: Receiver<Event>,

    /// Handle to the audio processing thread
    audio_thread: Option<JoinHandle<()>>,

    /// Flag to signal shutdown
    shutdown_flag: Arc<AtomicBool>,

    /// Whether the audio thread is inside its processing loop
    is_running: Arc<AtomicBool>,

    stats: Arc<EngineStats>,

    config: EngineConfig,
}

/// Everything the audio thread owns or shares
struct AudioThread<T> {
    graph: SignalGraph,
    transport: T,
    events: Sender<Event>,
    shutdown_flag: Arc<AtomicBool>,
    is_running: Arc<AtomicBool>,
    stats: Arc<EngineStats>,
    idle_wait: Duration,
    level_update_blocks: u64,
}

impl AudioEngine {
    /// Start an engine on a fresh [`RingTransport`] and return its device side
    pub fn new(config: EngineConfig) -> EngineResult<(Self, TransportHandle)> {
        config.validate().map_err(EngineError::ConfigError)?;
        let (transport, handle) = RingTransport::new(&config);
        let engine = Self::with_transport(config, transport)?;
        Ok((engine, handle))
    }

    /// Start an engine that pulls and pushes blocks through `transport`
    pub fn with_transport<T>(config: EngineConfig, transport: T) -> EngineResult<Self>
    where
        T: AudioTransport + 'static,
    {
        config.validate().map_err(EngineError::ConfigError)?;
        let (controller, graph) = build_pipeline(&config.stream)?;

        let (event_sender, event_receiver) = bounded::<Event>(config.event_capacity);
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let is_running = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(EngineStats::new());

        let audio = AudioThread {
            graph,
            transport,
            events: event_sender.clone(),
            shutdown_flag: Arc::clone(&shutdown_flag),
            is_running: Arc::clone(&is_running),
            stats: Arc::clone(&stats),
            idle_wait: (config.stream.block_duration() / 4).max(MIN_IDLE_WAIT),
            level_update_blocks: config.level_update_blocks.max(1),
        };

        info!(
            sample_rate = config.stream.sample_rate,
            channels = config.stream.channels,
            block_size = config.stream.block_size,
            latency_ms = config.stream.latency_ms(),
            "Starting audio engine"
        );

        let audio_thread = thread::Builder::new()
            .name("otic-audio".into())
            .spawn(move || audio.run())
            .map_err(|e| EngineError::ThreadSpawn(e.to_string()))?;

        Ok(Self {
            controller: Mutex::new(controller),
            event_sender,
            event_receiver,
            audio_thread: Some(audio_thread),
            shutdown_flag,
            is_running,
            stats,
            config,
        })
    }

    /// Clamp and apply all four EQ fields
    pub fn apply_params(&self, params: EqParams) {
        self.update(|controller| controller.apply_params(params));
    }

    /// Last clamped EQ parameters
    pub fn params(&self) -> EqParams {
        self.controller.lock().params()
    }

    pub fn route(&self) -> RouteSelectors {
        self.controller.lock().route()
    }

    pub fn set_test_mode(&self, enabled: bool) {
        self.update(|controller| controller.set_test_mode(enabled));
    }

    pub fn set_test_frequency(&self, hz: f32) {
        self.update(|controller| controller.set_test_frequency(hz));
    }

    pub fn set_test_level(&self, db: f32) {
        self.update(|controller| controller.set_test_level(db));
    }

    /// Apply a built-in preset by name, keeping the global gain
    pub fn apply_preset(&self, name: &str) -> EngineResult<()> {
        let preset =
            find_preset(name).ok_or_else(|| EngineError::UnknownPreset(name.trim().to_string()))?;
        self.update(|controller| controller.apply_preset(preset));
        Ok(())
    }

    /// Execute one parsed control command
    pub fn execute(&self, command: Command) -> Response {
        debug!(command = command.keyword(), "Executing command");

        match command {
            Command::SetGain(gain) => {
                self.update(|controller| {
                    let params = EqParams {
                        global_gain: gain,
                        ..controller.params()
                    };
                    controller.apply_params(params);
                });
            }
            Command::SetBand { band, gain_db } => {
                self.update(|controller| {
                    let params = controller.params().with_band_gain(band, gain_db);
                    controller.apply_params(params);
                });
            }
            Command::SetEq(params) => self.apply_params(params),
            Command::SetTestMode(enabled) => self.set_test_mode(enabled),
            Command::SetTestFrequency(hz) => self.set_test_frequency(hz),
            Command::SetTestLevel(db) => self.set_test_level(db),
            Command::ApplyPreset(name) => {
                if let Err(e) = self.apply_preset(&name) {
                    return Response::error(e);
                }
            }
            Command::Get => {
                let controller = self.controller.lock();
                return Response::Params {
                    params: controller.params(),
                    route: controller.route(),
                };
            }
            Command::Status => {
                let generation = self.controller.lock().generation();
                return Response::Status {
                    running: self.is_running(),
                    generation,
                    stats: self.stats(),
                };
            }
        }
        Response::Ok
    }

    /// Parse and execute one protocol line
    pub fn execute_line(&self, line: &str) -> Response {
        match line.parse::<Command>() {
            Ok(command) => self.execute(command),
            Err(e) => {
                warn!(line = line.trim(), "Rejected command: {}", e);
                Response::error(e)
            }
        }
    }

    /// Current counters
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            contended: self.controller.lock().contended(),
            ..self.stats.snapshot()
        }
    }

    /// Check if the audio thread is processing
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    /// Get next event, waiting at most `timeout`
    pub fn wait_event(&self, timeout: Duration) -> Option<Event> {
        self.event_receiver.recv_timeout(timeout).ok()
    }

    /// Get current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stop the audio thread and wait for it to exit
    pub fn shutdown(&mut self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.audio_thread.take() {
            if handle.join().is_err() {
                error!("Audio thread panicked");
            }
            let contended = self.controller.lock().contended();
            if contended > 0 {
                warn!(contended, "Audio path reused a previous snapshot at some block boundaries");
            }
            info!("Audio engine stopped");
        }
    }

    /// Mutate the controller, then report the new clamped state
    ///
    /// The event is sent under the lock so updates arrive in publish order.
    fn update<F>(&self, mutate: F)
    where
        F: FnOnce(&mut ParameterController),
    {
        let mut controller = self.controller.lock();
        mutate(&mut controller);
        let event = Event::StateUpdate {
            params: controller.params(),
            route: controller.route(),
        };
        emit(&self.event_sender, &self.stats, event);
    }
}

impl<T: AudioTransport> AudioThread<T> {
    /// Audio thread main loop
    fn run(mut self) {
        info!("Audio thread started");
        self.is_running.store(true, Ordering::SeqCst);
        self.emit(Event::Started);

        // Allocated once, before the first block
        let block_len = self.graph.context().block_len();
        let mut input = vec![0.0_f32; block_len];
        let mut output = vec![0.0_f32; block_len];

        let mut blocks: u64 = 0;
        let mut interval_peak = 0.0_f32;
        let mut overflowing = false;

        while !self.shutdown_flag.load(Ordering::SeqCst) {
            match self.transport.pull_block(&mut input) {
                Ok(true) => {}
                Ok(false) => {
                    self.stats.record_idle();
                    thread::sleep(self.idle_wait);
                    continue;
                }
                Err(TransportError::Closed) => {
                    info!("Transport closed");
                    break;
                }
                Err(e) => {
                    error!("Transport failure: {}", e);
                    self.emit(Event::error(e));
                    break;
                }
            }

            if let Err(e) = self.graph.process_block(&input, &mut output) {
                output.fill(0.0);
                self.emit(Event::error(e));
            }

            let peak = output.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
            self.stats.record_block(peak);
            interval_peak = interval_peak.max(peak);
            blocks += 1;
            if blocks % self.level_update_blocks == 0 {
                self.emit(Event::LevelUpdate {
                    peak: interval_peak,
                });
                interval_peak = 0.0;
            }

            match self.transport.push_block(&output) {
                Ok(()) => overflowing = false,
                Err(TransportError::Overflow { dropped }) => {
                    self.stats.record_overflow(dropped);
                    if !overflowing {
                        warn!(dropped, "Playback ring full, dropping blocks");
                        overflowing = true;
                    }
                    self.emit(Event::TransportOverflow { dropped });
                }
                Err(TransportError::Closed) => {
                    info!("Transport closed");
                    break;
                }
            }
        }

        self.is_running.store(false, Ordering::SeqCst);
        self.emit(Event::Stopped);
        info!(blocks, "Audio thread shutting down");
    }

    fn emit(&self, event: Event) {
        emit(&self.events, &self.stats, event);
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
