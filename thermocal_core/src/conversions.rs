//! `From` implementations bridging `thermocal_config` types to runtime types.

use crate::calibration::{Cubic, PiecewiseCalibration};
use crate::config::{EncoderCfg, InstrumentCfg, ProbeCfg, RecordCfg, SamplingCfg};
use crate::error::InstrumentError;

// ── SamplingCfg ──────────────────────────────────────────────────────────────

impl From<&thermocal_config::Sampling> for SamplingCfg {
    fn from(c: &thermocal_config::Sampling) -> Self {
        Self {
            buffer_sizes: c.buffer_sizes.clone(),
            std_dev_sample_size: c.std_dev_sample_size,
            data_interval_ms: c.data_interval_ms,
            use_median: c.use_median,
            skew_deviations: c.skew_deviations,
        }
    }
}

// ── ProbeCfg ─────────────────────────────────────────────────────────────────

impl From<&thermocal_config::Probe> for ProbeCfg {
    fn from(c: &thermocal_config::Probe) -> Self {
        Self {
            conversion_ms: c.conversion_ms,
            device_index: c.device_index,
        }
    }
}

// ── RecordCfg ────────────────────────────────────────────────────────────────

impl From<&thermocal_config::Record> for RecordCfg {
    fn from(c: &thermocal_config::Record) -> Self {
        Self {
            end_temp_f: c.end_temp_f,
            end_temp_time_ms: c.end_temp_time_ms,
        }
    }
}

// ── EncoderCfg ───────────────────────────────────────────────────────────────

impl From<&thermocal_config::Encoder> for EncoderCfg {
    fn from(c: &thermocal_config::Encoder) -> Self {
        Self {
            steps_per_detent: c.steps_per_detent,
            debounce_ms: c.debounce_ms,
        }
    }
}

// ── Calibration ──────────────────────────────────────────────────────────────

impl From<&thermocal_config::CubicCoefficients> for Cubic {
    fn from(c: &thermocal_config::CubicCoefficients) -> Self {
        Cubic::new(c.a, c.b, c.c, c.d)
    }
}

impl From<&thermocal_config::Calibration> for PiecewiseCalibration {
    fn from(c: &thermocal_config::Calibration) -> Self {
        Self {
            upper_cutoff: c.upper_cutoff,
            upper: (&c.upper).into(),
            lower: (&c.lower).into(),
        }
    }
}

// ── InstrumentCfg ────────────────────────────────────────────────────────────

/// Validates before converting; a config that would fail `validate()` never
/// reaches the engine.
impl TryFrom<&thermocal_config::Config> for InstrumentCfg {
    type Error = InstrumentError;

    fn try_from(c: &thermocal_config::Config) -> Result<Self, Self::Error> {
        c.validate()
            .map_err(|e| InstrumentError::Config(e.to_string()))?;
        Ok(Self {
            sampling: (&c.sampling).into(),
            probe: (&c.probe).into(),
            record: (&c.record).into(),
            encoder: (&c.encoder).into(),
            calibration: (&c.calibration).into(),
        })
    }
}
