//! The acquisition loop (`InstrumentCore`).
//!
//! One `step()` is one pass of the control loop: service the button and the
//! encoder, then give the current mode's handler a turn. Handlers never block
//! for longer than the probe settle wait, and that wait keeps servicing the
//! inputs so a click always gets through.

use std::sync::Arc;

use thermocal_traits::{
    Adc, Clock, DEVICE_DISCONNECTED_F, DataLog, DeviceAddress, StatusSink, TempProbe,
};

use crate::buffer::SampleBuffer;
use crate::calibration::PiecewiseCalibration;
use crate::config::{ProbeCfg, RecordCfg, SamplingCfg};
use crate::datalog::RECORD_HEADER;
use crate::encoder::{ClickButton, RotaryEncoder};
use crate::error::{AbortReason, InstrumentError, Result};
use crate::hw_error::hw_detail;
use crate::mode::Mode;
use crate::report::{Aggregate, MetaStats, StatusLine};
use crate::status::StepStatus;
use crate::timer::CoopTimer;
use crate::util::saturate_i16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Idle,
    Resized,
    Clicked,
}

/// How the wait for a probe conversion ended.
enum Settle {
    Ready,
    Interrupted(StepStatus),
}

/// Instrument state machine, generic over the two sampled peripherals.
pub struct InstrumentCore<A: Adc, P: TempProbe> {
    pub(crate) adc: A,
    pub(crate) probe: P,
    pub(crate) log: Box<dyn DataLog>,
    pub(crate) sink: Box<dyn StatusSink>,
    pub(crate) button: Option<ClickButton>,
    pub(crate) encoder: RotaryEncoder,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,

    pub(crate) sampling: SamplingCfg,
    pub(crate) probe_cfg: ProbeCfg,
    pub(crate) record: RecordCfg,
    pub(crate) calibration: PiecewiseCalibration,

    pub(crate) size_index: usize,
    pub(crate) mode: Mode,
    pub(crate) entered: bool,
    pub(crate) pending_clicks: u32,
    pub(crate) samples: SampleBuffer,
    pub(crate) median_history: SampleBuffer,
    pub(crate) average_history: SampleBuffer,
    pub(crate) std_dev_ready: bool,
    pub(crate) fetching: bool,
    pub(crate) interval: CoopTimer,
    pub(crate) hold: CoopTimer,
    /// Set by the first cold reading of a streak; `hold` runs from there.
    pub(crate) cold_streak: bool,
    pub(crate) run_count: u32,
    pub(crate) probe_address: Option<DeviceAddress>,
    pub(crate) log_open: bool,
}

impl<A: Adc, P: TempProbe> core::fmt::Debug for InstrumentCore<A, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InstrumentCore")
            .field("mode", &self.mode)
            .field("sample_size", &self.sample_size())
            .field("run_count", &self.run_count)
            .field("log_open", &self.log_open)
            .finish_non_exhaustive()
    }
}

impl<A: Adc, P: TempProbe> InstrumentCore<A, P> {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current burst size.
    pub fn sample_size(&self) -> usize {
        self.samples.capacity()
    }

    pub fn size_index(&self) -> usize {
        self.size_index
    }

    /// Candidate burst sizes, ascending.
    pub fn sizes(&self) -> &[usize] {
        &self.sampling.buffer_sizes
    }

    /// Completed cycles in the current (or last) record session.
    pub fn run_count(&self) -> u32 {
        self.run_count
    }

    pub fn is_log_open(&self) -> bool {
        self.log_open
    }

    /// Address resolved at startup, if the probe answered.
    pub fn probe_address(&self) -> Option<DeviceAddress> {
        self.probe_address
    }

    pub fn calibration(&self) -> &PiecewiseCalibration {
        &self.calibration
    }

    /// Queue a button click; consumed by the next input poll.
    pub fn click(&mut self) {
        self.pending_clicks = self.pending_clicks.saturating_add(1);
    }

    /// Close an open record log. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<()> {
        if !self.log_open {
            return Ok(());
        }
        self.log_open = false;
        self.log
            .close()
            .map_err(|e| eyre::Report::new(InstrumentError::Hardware(hw_detail(&*e))))?;
        tracing::info!(rows = self.run_count, "record log closed on shutdown");
        Ok(())
    }

    /// One iteration of the control loop.
    pub fn step(&mut self) -> StepStatus {
        if !self.entered
            && let Err(reason) = self.enter()
        {
            return self.abort(reason);
        }

        if self.poll_inputs() == Input::Clicked {
            return self.switch_to(self.mode.next());
        }

        match self.mode {
            Mode::SelectSampleSize => self.run_select(),
            Mode::PrintBuffer => self.run_print(),
            Mode::TestMode => self.run_test(),
            Mode::RecordData => self.run_record(),
            Mode::Standby => {
                self.clock.relax();
                StepStatus::Running
            }
        }
    }

    // ── Inputs ───────────────────────────────────────────────────────────────

    fn poll_inputs(&mut self) -> Input {
        let resized = self.mode.adjusts_sample_size() && self.encoder.value_changed();
        if resized {
            let index = usize::try_from(self.encoder.value()).unwrap_or(0);
            self.apply_sample_size(index);
        }
        if self.take_click() {
            Input::Clicked
        } else if resized {
            Input::Resized
        } else {
            Input::Idle
        }
    }

    fn take_click(&mut self) -> bool {
        if self.pending_clicks > 0 {
            self.pending_clicks -= 1;
            return true;
        }
        self.button.as_mut().is_some_and(ClickButton::clicked)
    }

    fn apply_sample_size(&mut self, index: usize) {
        let index = index.min(self.sampling.buffer_sizes.len().saturating_sub(1));
        let n = self.sampling.buffer_sizes[index];
        self.size_index = index;
        self.samples.resize(n);
        self.reset_buffers();
        self.emit(&StatusLine::SampleSize(n));
        tracing::info!(sample_size = n, index, "sample size changed");
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    fn switch_to(&mut self, next: Mode) -> StepStatus {
        self.leave();
        self.mode = next;
        tracing::info!(mode = %next, "mode changed");
        match self.enter() {
            Ok(()) => StepStatus::ModeChanged(next),
            Err(reason) => self.abort(reason),
        }
    }

    fn enter(&mut self) -> core::result::Result<(), AbortReason> {
        self.entered = true;
        self.reset_buffers();
        if self.mode.adjusts_sample_size() {
            self.encoder
                .set_value(i32::try_from(self.size_index).unwrap_or(i32::MAX));
        }
        match self.mode {
            Mode::RecordData => self.open_session()?,
            Mode::TestMode | Mode::Standby => self.emit(&StatusLine::Banner(self.mode)),
            Mode::SelectSampleSize | Mode::PrintBuffer => {}
        }
        Ok(())
    }

    fn leave(&mut self) {
        if self.mode == Mode::RecordData {
            self.close_log();
        }
    }

    /// Leave the current mode for standby; standby entry cannot fail.
    fn fall_back(&mut self) {
        self.leave();
        self.mode = Mode::Standby;
        self.entered = true;
        self.reset_buffers();
        self.emit(&StatusLine::Banner(Mode::Standby));
    }

    fn abort(&mut self, reason: AbortReason) -> StepStatus {
        tracing::warn!(mode = %self.mode, %reason, "session aborted");
        self.fall_back();
        StepStatus::Aborted(reason.into())
    }

    fn open_session(&mut self) -> core::result::Result<(), AbortReason> {
        if let Err(e) = self.log.begin(&RECORD_HEADER) {
            let msg = hw_detail(&*e);
            self.emit(&StatusLine::StorageError);
            return Err(AbortReason::StorageUnavailable(msg));
        }
        self.log_open = true;
        self.run_count = 0;
        self.cold_streak = false;
        self.emit(&StatusLine::Banner(Mode::RecordData));
        tracing::info!(
            sample_size = self.sample_size(),
            end_temp_f = self.record.end_temp_f,
            hold_ms = self.record.end_temp_time_ms,
            "record session started"
        );
        Ok(())
    }

    fn close_log(&mut self) {
        if !self.log_open {
            return;
        }
        self.log_open = false;
        if let Err(e) = self.log.close() {
            tracing::warn!(error = %hw_detail(&*e), "closing calibration log failed");
        }
    }

    fn reset_buffers(&mut self) {
        self.samples.clear();
        self.median_history.clear();
        self.average_history.clear();
        self.fetching = false;
        self.std_dev_ready = false;
    }

    // ── Acquisition ──────────────────────────────────────────────────────────

    /// Advance the burst by at most one ADC read. `Ok(true)` once the buffer
    /// is full and ready for statistics.
    fn acquire(&mut self) -> core::result::Result<bool, AbortReason> {
        if self.interval.expired() {
            self.interval.reset();
            if self.mode.reads_probe() {
                self.probe.request_conversion();
            }
            if self.mode == Mode::SelectSampleSize && self.median_history.is_full() {
                self.std_dev_ready = true;
            }
            self.fetching = true;
        }
        if !self.fetching {
            self.clock.relax();
            return Ok(false);
        }
        let raw = self.read_adc()?;
        self.samples.append(raw);
        if self.samples.is_full() {
            self.fetching = false;
            return Ok(true);
        }
        Ok(false)
    }

    fn read_adc(&mut self) -> core::result::Result<i16, AbortReason> {
        let raw = self
            .adc
            .read()
            .map_err(|e| AbortReason::Adc(hw_detail(&*e)))?;
        tracing::trace!(raw, "adc");
        Ok(raw)
    }

    fn aggregate(&mut self) -> Option<Aggregate> {
        if self.sampling.use_median {
            self.samples
                .median()
                .map(|m| Aggregate::Median(i32::from(m)))
        } else {
            self.samples.mean_rounded().map(Aggregate::Average)
        }
    }

    /// Busy-wait until the probe conversion requested at the start of the
    /// burst has had `conversion_ms` to finish.
    fn await_probe_settle(&mut self) -> Settle {
        while self.interval.elapsed() < self.probe_cfg.conversion_ms {
            match self.poll_inputs() {
                Input::Clicked => return Settle::Interrupted(self.switch_to(self.mode.next())),
                Input::Resized => return Settle::Interrupted(StepStatus::Running),
                Input::Idle => self.clock.relax(),
            }
        }
        Settle::Ready
    }

    #[allow(clippy::float_cmp)]
    fn read_probe(&mut self) -> core::result::Result<f32, AbortReason> {
        let t = self.probe.read_temp_f();
        if t == DEVICE_DISCONNECTED_F || !t.is_finite() {
            self.emit(&StatusLine::ProbeError);
            return Err(AbortReason::SensorDisconnected);
        }
        Ok(t)
    }

    fn overran(&mut self) -> bool {
        if !self.interval.expired() {
            return false;
        }
        tracing::warn!(
            mode = %self.mode,
            elapsed_ms = self.interval.elapsed(),
            interval_ms = self.interval.deadline(),
            "collection overran the interval"
        );
        self.emit(&StatusLine::OverrunWarning);
        self.emit(&StatusLine::OverrunHint);
        true
    }

    // ── Mode handlers ────────────────────────────────────────────────────────

    fn run_select(&mut self) -> StepStatus {
        match self.acquire() {
            Err(reason) => return self.abort(reason),
            Ok(false) => return StepStatus::Running,
            Ok(true) => {}
        }
        let (Some(median), Some(average), Some(slope), Some(left_skew)) = (
            self.samples.median(),
            self.samples.mean_rounded(),
            self.samples.slope(),
            self.samples.left_skew_count(self.sampling.skew_deviations),
        ) else {
            return StepStatus::Running;
        };
        self.samples.clear();

        self.median_history.push_rolling(median);
        self.average_history.push_rolling(saturate_i16(average));
        let meta = if self.std_dev_ready {
            self.median_history
                .std_dev()
                .zip(self.average_history.std_dev())
                .map(|(median_std_dev, average_std_dev)| MetaStats {
                    median_std_dev,
                    average_std_dev,
                })
        } else {
            None
        };

        let elapsed_ms = self.interval.elapsed();
        tracing::debug!(median, average, slope, left_skew, elapsed_ms, "select cycle");
        self.emit(&StatusLine::SelectCycle {
            sample_size: self.sample_size(),
            median: i32::from(median),
            average,
            elapsed_ms,
            slope,
            left_skew,
            meta,
        });
        self.overran();
        StepStatus::Running
    }

    fn run_print(&mut self) -> StepStatus {
        if self.interval.expired() {
            match self.read_adc() {
                Ok(raw) => {
                    self.samples.append(raw);
                }
                Err(reason) => return self.abort(reason),
            }
        } else {
            self.clock.relax();
        }
        if self.samples.is_full() {
            let values: Vec<i16> = self.samples.iter().collect();
            self.emit(&StatusLine::BufferDump(values));
            self.emit(&StatusLine::SampleSize(self.sample_size()));
            self.interval.reset();
            self.samples.clear();
        }
        StepStatus::Running
    }

    fn run_test(&mut self) -> StepStatus {
        match self.acquire() {
            Err(reason) => return self.abort(reason),
            Ok(false) => return StepStatus::Running,
            Ok(true) => {}
        }
        let slope = self.samples.slope().unwrap_or_default();
        let Some(aggregate) = self.aggregate() else {
            return StepStatus::Running;
        };
        self.samples.clear();
        let adc_temp_f = self.calibration.temperature_f(aggregate.value());

        if let Settle::Interrupted(status) = self.await_probe_settle() {
            return status;
        }
        let probe_temp_f = match self.read_probe() {
            Ok(t) => t,
            Err(reason) => return self.abort(reason),
        };
        tracing::debug!(raw = aggregate.value(), adc_temp_f, probe_temp_f, "test cycle");
        self.emit(&StatusLine::TestCycle {
            sample_size: self.sample_size(),
            aggregate,
            adc_temp_f,
            probe_temp_f,
            slope,
        });
        self.overran();
        StepStatus::Running
    }

    fn run_record(&mut self) -> StepStatus {
        match self.acquire() {
            Err(reason) => return self.abort(reason),
            Ok(false) => return StepStatus::Running,
            Ok(true) => {}
        }
        self.run_count += 1;
        let Some(aggregate) = self.aggregate() else {
            return StepStatus::Running;
        };
        self.samples.clear();

        if let Settle::Interrupted(status) = self.await_probe_settle() {
            return status;
        }
        let probe_temp_f = match self.read_probe() {
            Ok(t) => t,
            Err(reason) => return self.abort(reason),
        };
        self.emit(&StatusLine::RecordCycle {
            sample_size: self.sample_size(),
            aggregate,
            probe_temp_f,
            end_temp_f: self.record.end_temp_f,
            count: self.run_count,
        });
        if let Err(e) = self.log.append(aggregate.value(), probe_temp_f) {
            return self.abort(AbortReason::StorageWrite(hw_detail(&*e)));
        }
        tracing::debug!(raw = aggregate.value(), probe_temp_f, count = self.run_count, "row logged");

        if probe_temp_f > self.record.end_temp_f {
            self.cold_streak = false;
        } else if !self.cold_streak {
            self.cold_streak = true;
            self.hold.reset();
        } else if self.hold.expired() {
            self.close_log();
            self.emit(&StatusLine::Completed);
            tracing::info!(rows = self.run_count, "record session completed");
            self.fall_back();
            return StepStatus::Completed;
        }

        if self.overran() {
            return self.abort(AbortReason::CadenceOverrun);
        }
        StepStatus::Running
    }

    fn emit(&mut self, line: &StatusLine) {
        self.sink.line(&line.to_string());
    }
}
