//! Type-state builder for `Instrument` and the generic `build_instrument`
//! constructor.
//!
//! The builder enforces at compile time that the ADC, the reference probe and
//! the data log are provided before `build()` is available. `try_build()` is
//! always available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use thermocal_config::ADC_MAX;
use thermocal_traits::{
    Adc, ButtonPin, Clock, DataLog, EncoderCounter, MonotonicClock, StatusSink, TempProbe,
};

use crate::buffer::SampleBuffer;
use crate::config::InstrumentCfg;
use crate::core::InstrumentCore;
use crate::encoder::{ClickButton, RotaryEncoder};
use crate::error::{BuildError, Result};
use crate::mode::Mode;
use crate::report::{StatusLine, TracingSink};
use crate::timer::CoopTimer;

/// Dynamically dispatched instrument, as produced by the builder.
pub type Instrument = InstrumentCore<Box<dyn Adc>, Box<dyn TempProbe>>;

impl Instrument {
    /// Start building an Instrument.
    pub fn builder() -> InstrumentBuilder<Missing, Missing, Missing> {
        InstrumentBuilder::default()
    }
}

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Optional peripherals; everything here has a working default.
#[derive(Default)]
pub struct Wiring {
    /// Defaults to `TracingSink`.
    pub sink: Option<Box<dyn StatusSink>>,
    /// No button means clicks only come from `Instrument::click`.
    pub button: Option<Box<dyn ButtonPin>>,
    pub counter: Option<EncoderCounter>,
    /// Defaults to `MonotonicClock`.
    pub clock: Option<Arc<dyn Clock + Send + Sync>>,
}

/// Builder for `Instrument`. The configuration is validated on `build()`.
pub struct InstrumentBuilder<A, P, L> {
    adc: Option<Box<dyn Adc>>,
    probe: Option<Box<dyn TempProbe>>,
    log: Option<Box<dyn DataLog>>,
    cfg: Option<InstrumentCfg>,
    wiring: Wiring,
    _a: PhantomData<A>,
    _p: PhantomData<P>,
    _l: PhantomData<L>,
}

impl Default for InstrumentBuilder<Missing, Missing, Missing> {
    fn default() -> Self {
        Self {
            adc: None,
            probe: None,
            log: None,
            cfg: None,
            wiring: Wiring::default(),
            _a: PhantomData,
            _p: PhantomData,
            _l: PhantomData,
        }
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate configuration and construct an `InstrumentCore`.
///
/// Shared by `InstrumentBuilder::try_build()` and `build_instrument()`.
fn validate_and_build<A: Adc, P: TempProbe>(
    adc: A,
    mut probe: P,
    log: Box<dyn DataLog>,
    mut cfg: InstrumentCfg,
    wiring: Wiring,
) -> Result<InstrumentCore<A, P>> {
    // ── Validation ───────────────────────────────────────────────────────────
    let sizes = &mut cfg.sampling.buffer_sizes;
    if sizes.is_empty() {
        return Err(invalid("buffer_sizes must not be empty"));
    }
    if sizes.iter().any(|n| n % 2 == 0) {
        return Err(invalid("buffer sizes must be odd"));
    }
    if sizes.iter().any(|&n| n > ADC_MAX as usize) {
        return Err(invalid("buffer sizes must be <= 4095"));
    }
    if cfg.sampling.std_dev_sample_size < 2 {
        return Err(invalid("std_dev_sample_size must be >= 2"));
    }
    if !(cfg.sampling.skew_deviations.is_finite() && cfg.sampling.skew_deviations > 0.0) {
        return Err(invalid("skew_deviations must be > 0"));
    }
    if cfg.sampling.data_interval_ms <= cfg.probe.conversion_ms {
        return Err(invalid(
            "data_interval_ms must be greater than the probe conversion time",
        ));
    }
    if !cfg.record.end_temp_f.is_finite() {
        return Err(invalid("end_temp_f must be finite"));
    }
    if cfg.record.end_temp_time_ms == 0 {
        return Err(invalid("end_temp_time_ms must be >= 1"));
    }
    if !(cfg.calibration.upper.is_finite() && cfg.calibration.lower.is_finite()) {
        return Err(invalid("calibration coefficients must be finite"));
    }

    // ── Precompute ───────────────────────────────────────────────────────────
    sizes.sort_unstable();
    sizes.dedup();
    let initial = sizes[0];
    let last_index = i32::try_from(sizes.len() - 1).unwrap_or(i32::MAX);

    let clock = wiring
        .clock
        .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
    let mut sink = wiring.sink.unwrap_or_else(|| Box::new(TracingSink));

    let mut encoder = RotaryEncoder::new(
        wiring.counter.unwrap_or_default(),
        cfg.encoder.steps_per_detent,
    );
    encoder.set_boundaries(0, last_index, false);
    encoder.set_value(0);

    let button = wiring
        .button
        .map(|pin| ClickButton::new(pin, Arc::clone(&clock), cfg.encoder.debounce_ms));

    let probe_address = probe.resolve_address(cfg.probe.device_index);
    match probe_address {
        Some(addr) => tracing::info!(index = cfg.probe.device_index, address = ?addr, "reference probe found"),
        None => {
            tracing::warn!(index = cfg.probe.device_index, "reference probe address not found");
            sink.line(&StatusLine::ProbeNotFound(cfg.probe.device_index).to_string());
        }
    }

    Ok(InstrumentCore {
        adc,
        probe,
        log,
        sink,
        button,
        encoder,
        interval: CoopTimer::new(Arc::clone(&clock), cfg.sampling.data_interval_ms),
        hold: CoopTimer::new(Arc::clone(&clock), cfg.record.end_temp_time_ms),
        clock,
        samples: SampleBuffer::new(initial),
        median_history: SampleBuffer::new(cfg.sampling.std_dev_sample_size),
        average_history: SampleBuffer::new(cfg.sampling.std_dev_sample_size),
        sampling: cfg.sampling,
        probe_cfg: cfg.probe,
        record: cfg.record,
        calibration: cfg.calibration,
        size_index: 0,
        mode: Mode::Standby,
        entered: false,
        pending_clicks: 0,
        std_dev_ready: false,
        fetching: false,
        cold_streak: false,
        run_count: 0,
        probe_address,
        log_open: false,
    })
}

impl<A, P, L> InstrumentBuilder<A, P, L> {
    /// Fallible build available in any type-state; returns a detailed error for missing pieces.
    pub fn try_build(self) -> Result<Instrument> {
        let adc = self
            .adc
            .ok_or_else(|| eyre::Report::new(BuildError::MissingAdc))?;
        let probe = self
            .probe
            .ok_or_else(|| eyre::Report::new(BuildError::MissingProbe))?;
        let log = self
            .log
            .ok_or_else(|| eyre::Report::new(BuildError::MissingLog))?;
        validate_and_build(adc, probe, log, self.cfg.unwrap_or_default(), self.wiring)
    }

    pub fn with_config(mut self, cfg: InstrumentCfg) -> Self {
        self.cfg = Some(cfg);
        self
    }

    pub fn with_sink(mut self, sink: impl StatusSink + 'static) -> Self {
        self.wiring.sink = Some(Box::new(sink));
        self
    }

    pub fn with_button(mut self, pin: impl ButtonPin + 'static) -> Self {
        self.wiring.button = Some(Box::new(pin));
        self
    }

    /// Counter the encoder interrupt (or its simulation) writes to.
    pub fn with_encoder_counter(mut self, counter: EncoderCounter) -> Self {
        self.wiring.counter = Some(counter);
        self
    }

    /// Provide a custom clock; defaults to `MonotonicClock`.
    pub fn with_clock(mut self, clock: impl Clock + Send + Sync + 'static) -> Self {
        self.wiring.clock = Some(Arc::new(clock));
        self
    }
}

// Setters that advance type-state
impl<P, L> InstrumentBuilder<Missing, P, L> {
    pub fn with_adc(self, adc: impl Adc + 'static) -> InstrumentBuilder<Set, P, L> {
        InstrumentBuilder {
            adc: Some(Box::new(adc)),
            probe: self.probe,
            log: self.log,
            cfg: self.cfg,
            wiring: self.wiring,
            _a: PhantomData,
            _p: PhantomData,
            _l: PhantomData,
        }
    }
}

impl<A, L> InstrumentBuilder<A, Missing, L> {
    pub fn with_probe(self, probe: impl TempProbe + 'static) -> InstrumentBuilder<A, Set, L> {
        InstrumentBuilder {
            adc: self.adc,
            probe: Some(Box::new(probe)),
            log: self.log,
            cfg: self.cfg,
            wiring: self.wiring,
            _a: PhantomData,
            _p: PhantomData,
            _l: PhantomData,
        }
    }
}

impl<A, P> InstrumentBuilder<A, P, Missing> {
    pub fn with_log(self, log: impl DataLog + 'static) -> InstrumentBuilder<A, P, Set> {
        InstrumentBuilder {
            adc: self.adc,
            probe: self.probe,
            log: Some(Box::new(log)),
            cfg: self.cfg,
            wiring: self.wiring,
            _a: PhantomData,
            _p: PhantomData,
            _l: PhantomData,
        }
    }
}

impl InstrumentBuilder<Set, Set, Set> {
    /// Validate and build. Only available once the ADC, probe and log are set.
    pub fn build(self) -> Result<Instrument> {
        self.try_build()
    }
}

/// Build a statically dispatched instrument from concrete peripherals.
///
/// Delegates to the same validation as the builder.
pub fn build_instrument<A, P>(
    adc: A,
    probe: P,
    log: Box<dyn DataLog>,
    cfg: InstrumentCfg,
    wiring: Wiring,
) -> Result<InstrumentCore<A, P>>
where
    A: Adc + 'static,
    P: TempProbe + 'static,
{
    validate_and_build(adc, probe, log, cfg, wiring)
}
