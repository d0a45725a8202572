//! Drive an instrument until shutdown, timeout or the end of a session.

use std::sync::atomic::{AtomicBool, Ordering};

use thermocal_traits::{Adc, Clock, TempProbe};

use crate::core::InstrumentCore;
use crate::error::{InstrumentError, Result};
use crate::mode::Mode;
use crate::status::StepStatus;

/// When `run` should return on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunLimits {
    /// Wall time budget measured on the instrument's clock.
    pub max_runtime_ms: Option<u32>,
    /// Return after the first record session completes or any session aborts.
    pub stop_on_session_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    Timeout,
    SessionEnded,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub steps: u64,
    pub mode_changes: u32,
    pub completed: u32,
    pub aborted: u32,
    /// Most recent abort, if any.
    pub last_error: Option<InstrumentError>,
    pub final_mode: Mode,
    pub stop: StopReason,
}

/// Step `inst` until `shutdown` is raised or a limit is hit, then close any
/// open log.
pub fn run<A: Adc, P: TempProbe>(
    inst: &mut InstrumentCore<A, P>,
    shutdown: &AtomicBool,
    limits: RunLimits,
) -> Result<RunSummary> {
    let start = inst.clock.millis();
    let mut steps = 0u64;
    let mut mode_changes = 0u32;
    let mut completed = 0u32;
    let mut aborted = 0u32;
    let mut last_error = None;

    tracing::info!(
        mode = %inst.mode(),
        sample_size = inst.sample_size(),
        sizes = ?inst.sizes(),
        "instrument running"
    );

    let stop = loop {
        if shutdown.load(Ordering::Relaxed) {
            break StopReason::Shutdown;
        }
        if let Some(max) = limits.max_runtime_ms
            && inst.clock.ms_since(start) >= max
        {
            break StopReason::Timeout;
        }

        steps += 1;
        match inst.step() {
            StepStatus::Running => {}
            StepStatus::ModeChanged(mode) => {
                mode_changes += 1;
                tracing::debug!(%mode, steps, "mode change");
            }
            StepStatus::Completed => {
                completed += 1;
                if limits.stop_on_session_end {
                    break StopReason::SessionEnded;
                }
            }
            StepStatus::Aborted(e) => {
                aborted += 1;
                last_error = Some(e);
                if limits.stop_on_session_end {
                    break StopReason::SessionEnded;
                }
            }
        }
    };

    inst.shutdown()?;
    tracing::info!(?stop, steps, completed, aborted, "instrument stopped");
    Ok(RunSummary {
        steps,
        mode_changes,
        completed,
        aborted,
        last_error,
        final_mode: inst.mode(),
        stop,
    })
}
