#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Thermistor acquisition and calibration engine (hardware-agnostic).
//!
//! All peripherals are reached through the `thermocal_traits` seams: `Adc`,
//! `TempProbe`, `ButtonPin`, `DataLog`, `StatusSink` and `Clock`.
//!
//! ## Architecture
//!
//! - **Sampling**: fixed-capacity bursts with median, mean, slope, std-dev and
//!   left-skew statistics (`buffer`)
//! - **Timing**: cooperative, non-blocking millisecond timers (`timer`)
//! - **Inputs**: detent-counting rotary encoder and debounced button (`encoder`)
//! - **Conversion**: piecewise cubic raw-to-°F (`calibration`)
//! - **Control**: five-mode state machine stepping one loop pass at a time
//!   (`InstrumentCore`, `mode`, `status`)
//! - **Output**: operator status lines (`report`) and the CSV calibration log
//!   (`datalog`)

pub mod buffer;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod core;
pub mod datalog;
pub mod encoder;
pub mod error;
pub mod hw_error;
pub mod mocks;
pub mod mode;
pub mod report;
pub mod runner;
pub mod status;
pub mod timer;
pub mod util;

pub use buffer::SampleBuffer;
pub use builder::{Instrument, InstrumentBuilder, Missing, Set, Wiring, build_instrument};
pub use calibration::{Branch, Cubic, DEFAULT_CUBIC, PiecewiseCalibration};
pub use config::{EncoderCfg, InstrumentCfg, ProbeCfg, RecordCfg, SamplingCfg};
pub use crate::core::InstrumentCore;
pub use datalog::CsvDataLog;
pub use encoder::{ClickButton, RotaryEncoder};
pub use error::{AbortReason, BuildError, InstrumentError, Report, Result};
pub use mode::Mode;
pub use report::{Aggregate, MetaStats, StatusLine, TracingSink};
pub use runner::{RunLimits, RunSummary, StopReason, run};
pub use status::StepStatus;
pub use timer::CoopTimer;
