#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema, recorded-run loading and curve fitting for the thermistor
//! calibration instrument.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated. Every
//!   section is optional; omitted fields take the bench defaults.
//! - `fit` loads a recorded calibration run and fits the piecewise cubic that
//!   goes back into `[calibration]`.
use serde::Deserialize;

pub mod fit;

/// Largest value a 12-bit ADC can produce; also the largest useful burst.
pub const ADC_MAX: i32 = 4095;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Sampling {
    /// Candidate burst sizes offered by the encoder. Sorted ascending at startup.
    pub buffer_sizes: Vec<usize>,
    /// Length of the rolling median/average histories.
    pub std_dev_sample_size: usize,
    /// Period between bursts (ms).
    pub data_interval_ms: u32,
    /// Median when true, rounded mean otherwise.
    pub use_median: bool,
    /// Sigma threshold for the left-skew diagnostic.
    pub skew_deviations: f64,
}

impl Default for Sampling {
    fn default() -> Self {
        Self {
            buffer_sizes: vec![15, 31, 65, 129, 255, 511, 1025, 2049, 4095],
            std_dev_sample_size: 32,
            data_interval_ms: 1000,
            use_median: true,
            skew_deviations: 2.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Probe {
    /// Time the reference probe needs to finish a conversion (ms).
    pub conversion_ms: u32,
    /// Bus index of the reference probe.
    pub device_index: u8,
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            conversion_ms: 750,
            device_index: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Record {
    /// Recording stops once the bath has stayed at or below this (°F)...
    pub end_temp_f: f32,
    /// ...for this long (ms).
    pub end_temp_time_ms: u32,
    /// Output CSV; truncated at the start of every session.
    pub file: String,
}

impl Default for Record {
    fn default() -> Self {
        Self {
            end_temp_f: 40.0,
            end_temp_time_ms: 30_000,
            file: "probe_calibration.csv".to_string(),
        }
    }
}

/// `T = a + b·x + c·x² + d·x³`
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct CubicCoefficients {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl CubicCoefficients {
    fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d].iter().all(|v| v.is_finite())
    }
}

impl Default for CubicCoefficients {
    fn default() -> Self {
        Self {
            a: 233.2,
            b: -0.09784,
            c: 2.401e-5,
            d: -3.491e-9,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Calibration {
    /// Raw values at or below this use `upper`.
    pub upper_cutoff: i32,
    pub lower: CubicCoefficients,
    pub upper: CubicCoefficients,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            upper_cutoff: 2019,
            lower: CubicCoefficients::default(),
            upper: CubicCoefficients::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Encoder {
    /// Quadrature transitions per detent.
    pub steps_per_detent: u32,
    /// Button must read pressed this long before a click registers (ms).
    pub debounce_ms: u32,
}

impl Default for Encoder {
    fn default() -> Self {
        Self {
            steps_per_detent: 4,
            debounce_ms: 50,
        }
    }
}

/// Board wiring. Informational on the simulated bench.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Pins {
    pub thermistor_adc: u8,
    pub one_wire: u8,
    pub encoder_a: u8,
    pub encoder_b: u8,
    pub encoder_button: u8,
}

impl Default for Pins {
    fn default() -> Self {
        Self {
            thermistor_adc: 4,
            one_wire: 2,
            encoder_a: 14,
            encoder_b: 15,
            encoder_button: 16,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sampling: Sampling,
    pub probe: Probe,
    pub record: Record,
    pub calibration: Calibration,
    pub encoder: Encoder,
    pub pins: Pins,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read and parse `path`; a missing file yields the defaults.
pub fn load_path(path: &std::path::Path) -> eyre::Result<Config> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            load_toml(&text).map_err(|e| eyre::eyre!("parse config {}: {e}", path.display()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(eyre::eyre!("read config {}: {e}", path.display())),
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sampling
        let s = &self.sampling;
        if s.buffer_sizes.is_empty() {
            eyre::bail!("sampling.buffer_sizes must not be empty");
        }
        for &n in &s.buffer_sizes {
            if n == 0 || n % 2 == 0 {
                eyre::bail!("sampling.buffer_sizes must be odd (got {n})");
            }
            if n > ADC_MAX as usize {
                eyre::bail!("sampling.buffer_sizes must be <= {ADC_MAX} (got {n})");
            }
        }
        if s.std_dev_sample_size < 2 {
            eyre::bail!("sampling.std_dev_sample_size must be >= 2");
        }
        if s.data_interval_ms == 0 {
            eyre::bail!("sampling.data_interval_ms must be >= 1");
        }
        if !(s.skew_deviations.is_finite() && s.skew_deviations > 0.0) {
            eyre::bail!("sampling.skew_deviations must be > 0");
        }

        // Probe
        if s.data_interval_ms <= self.probe.conversion_ms {
            eyre::bail!(
                "sampling.data_interval_ms ({}) must be greater than probe.conversion_ms ({})",
                s.data_interval_ms,
                self.probe.conversion_ms
            );
        }

        // Record
        if !self.record.end_temp_f.is_finite() {
            eyre::bail!("record.end_temp_f must be finite");
        }
        if self.record.end_temp_time_ms == 0 {
            eyre::bail!("record.end_temp_time_ms must be >= 1");
        }
        if self.record.file.trim().is_empty() {
            eyre::bail!("record.file must not be empty");
        }

        // Calibration
        if !self.calibration.lower.is_finite() {
            eyre::bail!("calibration.lower coefficients must be finite");
        }
        if !self.calibration.upper.is_finite() {
            eyre::bail!("calibration.upper coefficients must be finite");
        }
        if !(0..=ADC_MAX).contains(&self.calibration.upper_cutoff) {
            eyre::bail!("calibration.upper_cutoff must be in [0, {ADC_MAX}]");
        }

        // Encoder
        if self.encoder.steps_per_detent == 0 {
            eyre::bail!("encoder.steps_per_detent must be >= 1");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly (got {r})");
        }

        Ok(())
    }
}
