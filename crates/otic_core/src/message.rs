//! Message Types
//!
//! Commands arrive as text lines on the control channel and are parsed into
//! [`Command`]s before anything touches the controller. Each executed command
//! yields one [`Response`] line. [`Event`]s flow from the engine to observers.
//!
//! ```text
//! GAIN 1.5          -> OK
//! EQ2000 12         -> OK
//! TEST ON           -> OK
//! GET               -> OK gain=1.500 eq500=0.0 eq2000=12.0 eq4000=0.0 test=on freq=1000.0 level=-90.0
//! BASS 3            -> ERR unknown command 'BASS'
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::{EqParams, RouteSelectors};
use crate::transport::StatsSnapshot;
use otic_dsp::EqBand;

/// Parse failures; these never reach the controller
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    #[error("empty command")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{command} needs a {argument} argument")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("{command}: '{value}' is not a number")]
    InvalidNumber {
        command: &'static str,
        value: String,
    },

    #[error("TEST expects ON or OFF, got '{0}'")]
    InvalidSwitch(String),

    #[error("{command}: unexpected argument '{value}'")]
    UnexpectedArgument {
        command: &'static str,
        value: String,
    },
}

/// Control commands
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `GAIN <linear>`
    SetGain(f32),

    /// `EQ500|EQ2000|EQ4000 <db>`
    SetBand { band: EqBand, gain_db: f32 },

    /// `EQ <gain> <db500> <db2000> <db4000>`
    SetEq(EqParams),

    /// `TEST ON|OFF`
    SetTestMode(bool),

    /// `FREQ <hz>`
    SetTestFrequency(f32),

    /// `LEVEL <db>`
    SetTestLevel(f32),

    /// `PRESET <name...>`
    ApplyPreset(String),

    /// `GET`
    Get,

    /// `STATUS`
    Status,
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let keyword = words.next().ok_or(ProtocolError::Empty)?.to_ascii_uppercase();

        let command = match keyword.as_str() {
            "GAIN" => Command::SetGain(number(&mut words, "GAIN", "gain")?),
            "EQ500" => band_command(&mut words, EqBand::Low500)?,
            "EQ2000" => band_command(&mut words, EqBand::Mid2000)?,
            "EQ4000" => band_command(&mut words, EqBand::High4000)?,
            "EQ" => Command::SetEq(EqParams::new(
                number(&mut words, "EQ", "gain")?,
                number(&mut words, "EQ", "db500")?,
                number(&mut words, "EQ", "db2000")?,
                number(&mut words, "EQ", "db4000")?,
            )),
            "TEST" => {
                let switch = words.next().ok_or(ProtocolError::MissingArgument {
                    command: "TEST",
                    argument: "ON|OFF",
                })?;
                match switch.to_ascii_uppercase().as_str() {
                    "ON" | "1" => Command::SetTestMode(true),
                    "OFF" | "0" => Command::SetTestMode(false),
                    _ => return Err(ProtocolError::InvalidSwitch(switch.to_string())),
                }
            }
            "FREQ" => Command::SetTestFrequency(number(&mut words, "FREQ", "hz")?),
            "LEVEL" => Command::SetTestLevel(number(&mut words, "LEVEL", "db")?),
            "PRESET" => {
                let name = words.by_ref().collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(ProtocolError::MissingArgument {
                        command: "PRESET",
                        argument: "name",
                    });
                }
                return Ok(Command::ApplyPreset(name));
            }
            "GET" => Command::Get,
            "STATUS" => Command::Status,
            _ => return Err(ProtocolError::UnknownCommand(keyword)),
        };

        match words.next() {
            Some(extra) => Err(ProtocolError::UnexpectedArgument {
                command: command.keyword(),
                value: extra.to_string(),
            }),
            None => Ok(command),
        }
    }
}

impl Command {
    /// Protocol keyword for this command
    pub fn keyword(&self) -> &'static str {
        match self {
            Command::SetGain(_) => "GAIN",
            Command::SetBand { band, .. } => band.label(),
            Command::SetEq(_) => "EQ",
            Command::SetTestMode(_) => "TEST",
            Command::SetTestFrequency(_) => "FREQ",
            Command::SetTestLevel(_) => "LEVEL",
            Command::ApplyPreset(_) => "PRESET",
            Command::Get => "GET",
            Command::Status => "STATUS",
        }
    }
}

fn band_command<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    band: EqBand,
) -> Result<Command, ProtocolError> {
    Ok(Command::SetBand {
        band,
        gain_db: number(words, band.label(), "db")?,
    })
}

fn number<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<f32, ProtocolError> {
    let word = words
        .next()
        .ok_or(ProtocolError::MissingArgument { command, argument })?;
    word.parse().map_err(|_| ProtocolError::InvalidNumber {
        command,
        value: word.to_string(),
    })
}

/// Reply to one command, rendered as a single `OK`/`ERR` line
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Ok,
    Params {
        params: EqParams,
        route: RouteSelectors,
    },
    Status {
        running: bool,
        generation: u64,
        stats: StatsSnapshot,
    },
    Error(String),
}

impl Response {
    pub fn error<E: fmt::Display>(err: E) -> Self {
        Response::Error(err.to_string())
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, Response::Error(_))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Ok => write!(f, "OK"),
            Response::Params { params, route } => write!(
                f,
                "OK gain={:.3} eq500={:.1} eq2000={:.1} eq4000={:.1} \
                 test={} freq={:.1} level={:.1}",
                params.global_gain,
                params.band_500_db,
                params.band_2000_db,
                params.band_4000_db,
                if route.test_mode { "on" } else { "off" },
                route.test_frequency_hz,
                route.test_level_db,
            ),
            Response::Status {
                running,
                generation,
                stats,
            } => write!(
                f,
                "OK running={} generation={} blocks={} idle={} overflows={} dropped={} \
                 lost_events={} contended={} peak={:.4}",
                running,
                generation,
                stats.blocks_processed,
                stats.idle_polls,
                stats.overflows,
                stats.dropped_samples,
                stats.dropped_events,
                stats.contended,
                stats.peak,
            ),
            Response::Error(message) => write!(f, "ERR {message}"),
        }
    }
}

/// Events sent from the engine to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Audio thread is running
    Started,

    /// Audio thread has exited
    Stopped,

    /// Error occurred
    Error { message: String },

    /// Output peak (0.0 - 1.0 for unclipped audio)
    LevelUpdate { peak: f32 },

    /// Parameters after a control mutation, already clamped
    StateUpdate {
        params: EqParams,
        route: RouteSelectors,
    },

    /// Processed samples the playback side had no room for
    TransportOverflow { dropped: usize },
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}
