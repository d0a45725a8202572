//! Operator-facing status lines.
//!
//! Labels, spacing and precision are stable: people and scripts read this
//! output. Floats print with two decimals unless stated otherwise; probe
//! temperatures print with four (the probe resolves 0.1125 °F).

use std::fmt;

use thermocal_traits::StatusSink;

use crate::mode::Mode;
use crate::util::signed_2dp;

/// The value a cycle reports and records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Median(i32),
    Average(i32),
}

impl Aggregate {
    #[inline]
    pub fn value(self) -> i32 {
        match self {
            Aggregate::Median(v) | Aggregate::Average(v) => v,
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregate::Median(v) => write!(f, "Median: {v}"),
            Aggregate::Average(v) => write!(f, "Average: {v}"),
        }
    }
}

/// Standard deviations of the rolling median/average histories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaStats {
    pub median_std_dev: f64,
    pub average_std_dev: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusLine {
    /// Banner printed when a mode with one is entered.
    Banner(Mode),
    SampleSize(usize),
    /// Raw burst, oldest first.
    BufferDump(Vec<i16>),
    SelectCycle {
        sample_size: usize,
        median: i32,
        average: i32,
        elapsed_ms: u32,
        slope: f64,
        left_skew: usize,
        meta: Option<MetaStats>,
    },
    TestCycle {
        sample_size: usize,
        aggregate: Aggregate,
        adc_temp_f: f32,
        probe_temp_f: f32,
        slope: f64,
    },
    RecordCycle {
        sample_size: usize,
        aggregate: Aggregate,
        probe_temp_f: f32,
        end_temp_f: f32,
        count: u32,
    },
    OverrunWarning,
    OverrunHint,
    ProbeError,
    ProbeNotFound(u8),
    StorageError,
    Completed,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLine::Banner(mode) => write!(f, "{mode}"),
            StatusLine::SampleSize(n) => write!(f, "SAMPLE_SIZE: {n}"),
            StatusLine::BufferDump(values) => {
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{v}")?;
                }
                Ok(())
            }
            StatusLine::SelectCycle {
                sample_size,
                median,
                average,
                elapsed_ms,
                slope,
                left_skew,
                meta,
            } => {
                write!(
                    f,
                    "SAMPLE_SIZE: {sample_size}   Median: {median}   Average: {average}   Time(ms): {elapsed_ms}   Slope: {}   Skew: {left_skew}",
                    signed_2dp(*slope)
                )?;
                if let Some(m) = meta {
                    write!(
                        f,
                        "\t\tMedianStdDev: {:.2}\t\tAverageStdDev: {:.2}",
                        m.median_std_dev, m.average_std_dev
                    )?;
                }
                Ok(())
            }
            StatusLine::TestCycle {
                sample_size,
                aggregate,
                adc_temp_f,
                probe_temp_f,
                slope,
            } => write!(
                f,
                "SampleSize: {sample_size}   {aggregate}   ADC_TempF: {adc_temp_f:.2}   TempF: {probe_temp_f:.4}   Slope: {}",
                signed_2dp(*slope)
            ),
            StatusLine::RecordCycle {
                sample_size,
                aggregate,
                probe_temp_f,
                end_temp_f,
                count,
            } => write!(
                f,
                "SampleSize: {sample_size}   {aggregate}   TempF: {probe_temp_f:.4}   EndTemp: {end_temp_f:.2}   count: {count}"
            ),
            StatusLine::OverrunWarning => {
                f.write_str("WARNING: Data Collection taking longer than data_interval.")
            }
            StatusLine::OverrunHint => {
                f.write_str("Either decrease SAMPLE_SIZE or increase data_interval.")
            }
            StatusLine::ProbeError => {
                f.write_str("Error: Could not read temp data from 1-wire sensor!")
            }
            StatusLine::ProbeNotFound(index) => {
                write!(f, "Unable to find address for Device {index}")
            }
            StatusLine::StorageError => {
                f.write_str("!!!!!!!!!!!!!! Error opening .csv file !!!!!!!!!!!!!!!!!!")
            }
            StatusLine::Completed => f.write_str("Data Collection Completed!!!"),
        }
    }
}

/// Status sink that forwards every line to `tracing` at info level.
///
/// Default for instruments built without an explicit sink.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn line(&mut self, text: &str) {
        tracing::info!(target: "thermocal::status", "{text}");
    }
}
