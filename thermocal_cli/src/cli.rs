//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "thermocal", version, about = "Thermistor calibration bench")]
pub struct Cli {
    /// Path to config TOML; a missing file means bench defaults
    #[arg(long, value_name = "FILE", default_value = "etc/thermocal.toml")]
    pub config: PathBuf,

    /// Emit status lines, summaries and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Where the peripherals come from.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum Backend {
    /// Simulated bath, thermistor and probe; console drives the encoder
    #[default]
    Sim,
    /// Encoder and button on Raspberry Pi GPIO (feature `hardware`)
    Gpio,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the instrument loop
    Run(RunArgs),
    /// Fit the piecewise calibration from a recorded run
    Fit {
        /// CSV written by a record session
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,
        /// Raw value splitting the two cubics; defaults to calibration.upper_cutoff
        #[arg(long, value_name = "RAW")]
        cutoff: Option<i32>,
    },
    /// Convert raw ADC values with the configured calibration
    Convert {
        /// Raw readings (0..=4095)
        #[arg(required = true, value_name = "RAW")]
        raw: Vec<i32>,
    },
    /// Validate the config and print what the instrument would start with
    SelfCheck,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, value_enum, default_value_t = Backend::Sim)]
    pub backend: Backend,

    /// Button clicks to queue before the loop starts (1 = select, 3 = test, 4 = record)
    #[arg(long, default_value_t = 0)]
    pub clicks: u32,

    /// Stop after this many milliseconds
    #[arg(long = "max-runtime-ms", value_name = "MS")]
    pub max_runtime_ms: Option<u32>,

    /// Stop when a record session completes or any session aborts; an abort
    /// becomes the exit status
    #[arg(long = "until-done", action = ArgAction::SetTrue)]
    pub until_done: bool,

    /// Do not read console commands from stdin
    #[arg(long = "no-stdin", action = ArgAction::SetTrue)]
    pub no_stdin: bool,

    #[command(flatten)]
    pub bath: BathArgs,
}

/// Simulated bath. The GPIO backend reads its thermistor and probe from it too.
#[derive(Args, Debug, Clone)]
pub struct BathArgs {
    /// Bath temperature at startup (°F)
    #[arg(long = "bath-start-f", default_value_t = 120.0)]
    pub start_f: f64,

    /// Temperature the bath settles to (°F)
    #[arg(long = "bath-ambient-f", default_value_t = 35.0)]
    pub ambient_f: f64,

    /// Cooling time constant (ms)
    #[arg(long = "bath-tau-ms", default_value_t = 600_000.0)]
    pub tau_ms: f64,

    /// Peak ADC dither (counts)
    #[arg(long = "adc-noise", default_value_t = 3)]
    pub adc_noise: u32,

    /// Start with the reference probe off the bus
    #[arg(long = "disconnected-probe", action = ArgAction::SetTrue)]
    pub disconnected_probe: bool,
}
