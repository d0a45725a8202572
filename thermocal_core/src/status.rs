//! Outcome of a single instrument step.

use crate::error::InstrumentError;
use crate::mode::Mode;

#[derive(Debug, Clone, PartialEq)]
pub enum StepStatus {
    /// Keep stepping; the mode is unchanged.
    Running,
    /// A click moved the instrument into this mode.
    ModeChanged(Mode),
    /// The record session reached its end condition; the log is closed and
    /// the instrument is back in standby.
    Completed,
    /// The session was abandoned; the instrument is back in standby.
    Aborted(InstrumentError),
}
