//! Operating modes and the click transition table.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Pick a burst size and watch the statistics settle.
    SelectSampleSize,
    /// Dump raw bursts.
    PrintBuffer,
    /// Compare the calibrated thermistor against the reference probe.
    TestMode,
    /// Log (aggregate, probe) rows until the bath has cooled.
    RecordData,
    /// Idle. Initial mode and the fallback after any abort.
    Standby,
}

impl Mode {
    /// Mode entered on a button click.
    pub const fn next(self) -> Self {
        match self {
            Mode::SelectSampleSize => Mode::PrintBuffer,
            Mode::PrintBuffer => Mode::TestMode,
            Mode::TestMode => Mode::RecordData,
            Mode::RecordData => Mode::Standby,
            Mode::Standby => Mode::SelectSampleSize,
        }
    }

    /// Encoder rotation changes the burst size only in these modes.
    pub const fn adjusts_sample_size(self) -> bool {
        matches!(
            self,
            Mode::SelectSampleSize | Mode::PrintBuffer | Mode::TestMode
        )
    }

    /// Modes that read the reference probe each cycle.
    pub const fn reads_probe(self) -> bool {
        matches!(self, Mode::TestMode | Mode::RecordData)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::SelectSampleSize => "SAMPLE_SIZE",
            Mode::PrintBuffer => "PRINT_BUFFER",
            Mode::TestMode => "TEST_MODE",
            Mode::RecordData => "RECORD_DATA",
            Mode::Standby => "STANDBY_MODE",
        })
    }
}
