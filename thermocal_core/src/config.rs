//! Runtime configuration for the instrument.
//!
//! These are the structs the engine consumes. They are separate from the
//! TOML-deserialized config in `thermocal_config`; see `conversions` for the
//! mapping.

/// Burst sampling and statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingCfg {
    /// Candidate burst sizes. Sorted ascending when the instrument is built.
    pub buffer_sizes: Vec<usize>,
    /// Length of the rolling median/average histories.
    pub std_dev_sample_size: usize,
    /// Period between bursts (ms).
    pub data_interval_ms: u32,
    /// Report the median when true, the rounded mean otherwise.
    pub use_median: bool,
    /// Sigma threshold for the left-skew diagnostic.
    pub skew_deviations: f64,
}

impl Default for SamplingCfg {
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

/// Reference probe timing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCfg {
    /// Conversion time (ms), measured from the start of the burst.
    pub conversion_ms: u32,
    /// Bus index resolved at startup.
    pub device_index: u8,
}

impl Default for ProbeCfg {
    fn default() -> Self {
        Self {
            conversion_ms: 750,
            device_index: 0,
        }
    }
}

/// Record-session termination.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordCfg {
    pub end_temp_f: f32,
    /// The probe must stay at or below `end_temp_f` this long (ms).
    pub end_temp_time_ms: u32,
}

impl Default for RecordCfg {
    fn default() -> Self {
        Self {
            end_temp_f: 40.0,
            end_temp_time_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderCfg {
    pub steps_per_detent: u32,
    pub debounce_ms: u32,
}

impl Default for EncoderCfg {
    fn default() -> Self {
        Self {
            steps_per_detent: 4,
            debounce_ms: 50,
        }
    }
}

/// Everything the instrument needs besides its peripherals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentCfg {
    pub sampling: SamplingCfg,
    pub probe: ProbeCfg,
    pub record: RecordCfg,
    pub encoder: EncoderCfg,
    pub calibration: crate::calibration::PiecewiseCalibration,
}
