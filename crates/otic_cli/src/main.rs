//! Otic CLI
//!
//! `otic run` drives the engine from a simulated real-time device: a thread
//! that produces one input block per block period and drains the output.
//! Control lines are read from stdin and answered on stdout; logs go to
//! stderr.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use otic_core::{
    compute_eq, AudioEngine, EngineConfig, EqParams, Event, ProfileStore, StreamConfig,
    TransportHandle, UserProfile, AUDIOGRAM_FREQUENCIES, PRESETS,
};
use otic_dsp::ToneGenerator;

#[derive(Parser)]
#[command(name = "otic")]
#[command(about = "Real-time 3-band hearing equalizer", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine and read control lines from stdin (default)
    Run(RunArgs),

    /// List the built-in presets
    Presets,

    /// Manage saved hearing profiles
    #[command(subcommand)]
    Profiles(ProfileCommand),

    /// Derive band gains from audiogram thresholds (FREQ=DB pairs)
    ComputeEq {
        #[arg(value_parser = parse_threshold, required = true)]
        thresholds: Vec<(u32, f32)>,

        /// Global gain stored with the result
        #[arg(long, default_value_t = 1.0)]
        gain: f32,

        /// Save the result as a profile with this name
        #[arg(long)]
        save: Option<String>,

        #[command(flatten)]
        store: StoreArgs,
    },
}

#[derive(Args, Clone)]
struct RunArgs {
    #[arg(long, default_value_t = 44100)]
    sample_rate: u32,

    #[arg(long, default_value_t = 1)]
    channels: u16,

    /// Frames per block (power of two)
    #[arg(long, default_value_t = 128)]
    block_size: u32,

    /// Frequency of the simulated input signal, Hz
    #[arg(long, default_value_t = 1000.0)]
    input_freq: f32,

    /// Level of the simulated input signal, dBFS
    #[arg(long, default_value_t = -20.0, allow_negative_numbers = true)]
    input_level: f32,

    /// Apply a saved profile at startup
    #[arg(long)]
    profile: Option<String>,

    #[command(flatten)]
    store: StoreArgs,
}

impl Default for RunArgs {
    fn default() -> Self {
        let stream = StreamConfig::default();
        Self {
            sample_rate: stream.sample_rate,
            channels: stream.channels,
            block_size: stream.block_size,
            input_freq: 1000.0,
            input_level: -20.0,
            profile: None,
            store: StoreArgs::default(),
        }
    }
}

#[derive(Args, Clone, Default)]
struct StoreArgs {
    /// Profile directory (defaults to the platform config dir)
    #[arg(long)]
    profile_dir: Option<PathBuf>,
}

impl StoreArgs {
    fn open(&self) -> Result<ProfileStore> {
        match &self.profile_dir {
            Some(dir) => Ok(ProfileStore::new(dir)),
            None => Ok(ProfileStore::default_location()?),
        }
    }
}

#[derive(Subcommand)]
enum ProfileCommand {
    /// List saved profiles
    List(StoreArgs),

    /// Print a profile as JSON
    Show {
        name: String,
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Save a manual profile
    Save {
        name: String,
        #[arg(long, default_value_t = 1.0)]
        gain: f32,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        eq500: f32,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        eq2000: f32,
        #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
        eq4000: f32,
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Delete a profile
    Delete {
        name: String,
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn parse_threshold(s: &str) -> Result<(u32, f32), String> {
    let (freq, db) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FREQ=DB, got '{s}'"))?;
    let freq: u32 = freq
        .trim()
        .parse()
        .map_err(|_| format!("bad frequency '{freq}'"))?;
    let db: f32 = db.trim().parse().map_err(|_| format!("bad level '{db}'"))?;
    Ok((freq, db))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "otic_core=debug,otic_cli=debug"
    } else {
        "otic_core=info,otic_cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command.unwrap_or_else(|| Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(args),
        Commands::Presets => {
            for (name, [g500, g2000, g4000]) in PRESETS {
                println!("{name:<30} EQ500={g500:+.1} EQ2000={g2000:+.1} EQ4000={g4000:+.1}");
            }
            Ok(())
        }
        Commands::Profiles(command) => profiles(command),
        Commands::ComputeEq {
            thresholds,
            gain,
            save,
            store,
        } => {
            let thresholds: BTreeMap<u32, f32> = thresholds.into_iter().collect();
            for freq in thresholds.keys() {
                if !AUDIOGRAM_FREQUENCIES.contains(freq) {
                    warn!("{} Hz is not an audiogram frequency and is not mapped to a band", freq);
                }
            }

            let eq = compute_eq(&thresholds);
            println!("reference: {:.1} dB", eq.reference_db);
            for (freq, loss) in &eq.losses_db {
                println!("  {freq:>5} Hz  loss {loss:5.1} dB");
            }
            let [g500, g2000, g4000] = eq.band_gains_db;
            println!("EQ500={g500:.1} EQ2000={g2000:.1} EQ4000={g4000:.1}");

            if let Some(name) = save {
                let profile = UserProfile::from_audiogram(name, thresholds, gain);
                let path = store.open()?.save(&profile)?;
                println!("saved {}", path.display());
            }
            Ok(())
        }
    }
}

fn profiles(command: ProfileCommand) -> Result<()> {
    match command {
        ProfileCommand::List(store) => {
            for name in store.open()?.list()? {
                println!("{name}");
            }
        }
        ProfileCommand::Show { name, store } => {
            let profile = store.open()?.load(&name)?;
            let EqParams {
                global_gain,
                band_500_db,
                band_2000_db,
                band_4000_db,
            } = profile.eq;
            println!("{} ({}, {})", profile.name, profile.method, profile.created_at);
            println!(
                "GAIN={global_gain:.3} EQ500={band_500_db:.1} \
                 EQ2000={band_2000_db:.1} EQ4000={band_4000_db:.1}"
            );
            for (freq, db) in &profile.thresholds_db {
                println!("  {freq:>5} Hz  {db:6.1} dB");
            }
        }
        ProfileCommand::Save {
            name,
            gain,
            eq500,
            eq2000,
            eq4000,
            store,
        } => {
            let profile = UserProfile::manual(name, EqParams::new(gain, eq500, eq2000, eq4000));
            let path = store.open()?.save(&profile)?;
            println!("saved {}", path.display());
        }
        ProfileCommand::Delete { name, store } => {
            if !store.open()?.delete(&name)? {
                bail!("no profile named '{name}'");
            }
        }
    }
    Ok(())
}

fn run(args: RunArgs) -> Result<()> {
    let config = EngineConfig {
        stream: StreamConfig {
            sample_rate: args.sample_rate,
            channels: args.channels,
            block_size: args.block_size,
        },
        ..EngineConfig::default()
    };

    let (mut engine, handle) = AudioEngine::new(config.clone()).context("starting engine")?;

    if let Some(name) = &args.profile {
        let profile = args.store.open()?.load(name)?;
        info!("Applying profile '{}'", profile.name);
        engine.apply_params(profile.eq);
    }

    let running = Arc::new(AtomicBool::new(true));
    let device = spawn_device(handle, &config.stream, &args, Arc::clone(&running))?;

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("QUIT") || trimmed.eq_ignore_ascii_case("EXIT") {
            break;
        }

        let response = engine.execute_line(trimmed);
        writeln!(stdout, "{response}")?;
        stdout.flush()?;
        drain_events(&engine);
    }

    running.store(false, Ordering::SeqCst);
    if device.join().is_err() {
        warn!("Device thread panicked");
    }
    engine.shutdown();
    drain_events(&engine);

    let stats = engine.stats();
    info!(
        blocks = stats.blocks_processed,
        idle = stats.idle_polls,
        overflows = stats.overflows,
        lost_events = stats.dropped_events,
        contended = stats.contended,
        "Session finished"
    );
    Ok(())
}

fn drain_events(engine: &AudioEngine) {
    while let Some(event) = engine.poll_event() {
        match event {
            Event::Error { message } => warn!("Engine error: {}", message),
            Event::TransportOverflow { dropped } => warn!(dropped, "Output overflow"),
            other => debug!(?other, "Engine event"),
        }
    }
}

/// Stand-in for an audio device: a sine source and a sink, paced at the block rate
fn spawn_device(
    mut handle: TransportHandle,
    stream: &StreamConfig,
    args: &RunArgs,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<()>> {
    let block_len = stream.block_len();
    let channels = stream.channels as usize;
    let period = stream.block_duration();

    let mut source = ToneGenerator::new(f64::from(stream.sample_rate));
    source.set_frequency(args.input_freq);
    source.set_level_db(args.input_level);

    thread::Builder::new()
        .name("otic-device".into())
        .spawn(move || {
            let mut input = vec![0.0_f32; block_len];
            let mut output = vec![0.0_f32; block_len];
            let mut next = Instant::now();

            while running.load(Ordering::SeqCst) && !handle.is_closed() {
                source.process(&mut input, channels);
                if handle.push_input(&input) < block_len {
                    debug!("Capture ring full, input dropped");
                }
                handle.pop_output(&mut output);

                next += period;
                if let Some(wait) = next.checked_duration_since(Instant::now()) {
                    thread::sleep(wait);
                }
            }
        })
        .context("spawning device thread")
}
