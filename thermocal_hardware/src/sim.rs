//! Simulated bench: a bath cooling toward ambient, a thermistor divider on
//! the ADC, a digital reference probe in the same bath, and an encoder whose
//! "interrupts" are driven from software.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use thermocal_traits::{
    Adc, ButtonPin, Clock, DEVICE_DISCONNECTED_F, DeviceAddress, EncoderCounter, MonotonicClock,
    TempProbe,
};

use crate::quadrature::QuadratureDecoder;

/// Wall clock whose `relax()` yields the thread for a moment so idle loops on
/// the host do not pin a core.
#[derive(Debug, Clone, Copy)]
pub struct HostClock {
    inner: MonotonicClock,
    relax: Duration,
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new(Duration::from_millis(1))
    }
}

impl HostClock {
    pub fn new(relax: Duration) -> Self {
        Self {
            inner: MonotonicClock::new(),
            relax,
        }
    }
}

impl Clock for HostClock {
    fn millis(&self) -> u32 {
        self.inner.millis()
    }

    fn relax(&self) {
        std::thread::sleep(self.relax);
    }
}

/// Newtonian cooling: `T(t) = ambient + (start - ambient)·exp(-t/tau)`.
pub struct BathModel {
    clock: Arc<dyn Clock + Send + Sync>,
    origin_ms: u32,
    pub start_f: f64,
    pub ambient_f: f64,
    pub tau_ms: f64,
}

impl core::fmt::Debug for BathModel {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BathModel")
            .field("start_f", &self.start_f)
            .field("ambient_f", &self.ambient_f)
            .field("tau_ms", &self.tau_ms)
            .finish()
    }
}

impl BathModel {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>, start_f: f64, ambient_f: f64, tau_ms: f64) -> Self {
        let origin_ms = clock.millis();
        Self {
            clock,
            origin_ms,
            start_f,
            ambient_f,
            tau_ms: tau_ms.max(1.0),
        }
    }

    pub fn temperature_f(&self) -> f64 {
        let t = f64::from(self.clock.ms_since(self.origin_ms));
        self.ambient_f + (self.start_f - self.ambient_f) * (-t / self.tau_ms).exp()
    }
}

/// Beta-model NTC on the low side of a divider feeding a 12-bit ADC.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thermistor {
    /// Resistance at 25 °C (Ω).
    pub r0_ohms: f64,
    pub beta: f64,
    /// Fixed high-side resistor (Ω).
    pub series_ohms: f64,
}

impl Default for Thermistor {
    fn default() -> Self {
        Self {
            r0_ohms: 10_000.0,
            beta: 3950.0,
            series_ohms: 10_000.0,
        }
    }
}

impl Thermistor {
    const T0_K: f64 = 298.15;
    const FULL_SCALE: f64 = 4095.0;

    pub fn resistance(&self, temp_f: f64) -> f64 {
        let t_k = (temp_f - 32.0) * 5.0 / 9.0 + 273.15;
        self.r0_ohms * (self.beta * (1.0 / t_k - 1.0 / Self::T0_K)).exp()
    }

    /// Noise-free ADC count for `temp_f`.
    pub fn counts(&self, temp_f: f64) -> f64 {
        let r = self.resistance(temp_f);
        Self::FULL_SCALE * r / (r + self.series_ohms)
    }
}

/// ADC channel reading the thermistor in the bath, with a little dither.
#[derive(Debug)]
pub struct SimulatedAdc {
    bath: Arc<BathModel>,
    thermistor: Thermistor,
    noise_counts: u32,
    rng: u32,
}

impl SimulatedAdc {
    pub fn new(bath: Arc<BathModel>, thermistor: Thermistor, noise_counts: u32) -> Self {
        Self {
            bath,
            thermistor,
            noise_counts,
            rng: 0x9E37_79B9,
        }
    }

    fn next_noise(&mut self) -> i32 {
        if self.noise_counts == 0 {
            return 0;
        }
        // xorshift32
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        let span = self.noise_counts * 2 + 1;
        i32::try_from(x % span).unwrap_or(0) - i32::try_from(self.noise_counts).unwrap_or(0)
    }
}

impl Adc for SimulatedAdc {
    fn read(&mut self) -> Result<i16, Box<dyn std::error::Error + Send + Sync>> {
        let ideal = self.thermistor.counts(self.bath.temperature_f()).round() as i32;
        let raw = (ideal + self.next_noise()).clamp(0, 4095);
        Ok(i16::try_from(raw).unwrap_or(i16::MAX))
    }
}

/// Digital probe in the same bath. Conversions take `conversion_ms`; a read
/// before then returns the previous result, like the real part.
#[derive(Debug)]
pub struct SimulatedProbe {
    bath: Arc<BathModel>,
    conversion_ms: u32,
    requested_at: Option<u32>,
    last_f: f32,
    disconnected: Arc<AtomicBool>,
}

/// 12-bit probe resolution (0.0625 °C).
pub const PROBE_RESOLUTION_F: f64 = 0.1125;

/// Scratchpad contents before the first conversion (85 °C).
pub const POWER_ON_RESET_F: f32 = 185.0;

impl SimulatedProbe {
    pub fn new(bath: Arc<BathModel>, conversion_ms: u32) -> Self {
        Self {
            bath,
            conversion_ms,
            requested_at: None,
            last_f: POWER_ON_RESET_F,
            disconnected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle for pulling the probe off the bus mid-run.
    pub fn disconnect_handle(&self) -> Arc<AtomicBool> {
        self.disconnected.clone()
    }

    fn quantized(&self) -> f32 {
        let t = self.bath.temperature_f();
        ((t / PROBE_RESOLUTION_F).round() * PROBE_RESOLUTION_F) as f32
    }
}

impl TempProbe for SimulatedProbe {
    fn resolve_address(&mut self, index: u8) -> Option<DeviceAddress> {
        if self.disconnected.load(Ordering::Relaxed) || index != 0 {
            return None;
        }
        Some([0x28, 0xFF, 0x64, 0x1E, 0x0F, 0x16, 0x03, 0x5C])
    }

    fn request_conversion(&mut self) {
        self.requested_at = Some(self.bath.clock.millis());
    }

    fn read_temp_f(&mut self) -> f32 {
        if self.disconnected.load(Ordering::Relaxed) {
            return DEVICE_DISCONNECTED_F;
        }
        if let Some(at) = self.requested_at
            && self.bath.clock.ms_since(at) >= self.conversion_ms
        {
            self.last_f = self.quantized();
            self.requested_at = None;
        }
        self.last_f
    }
}

/// Encoder push button held down for a fixed time per press.
#[derive(Clone)]
pub struct SimulatedButton {
    clock: Arc<dyn Clock + Send + Sync>,
    pressed_at: Arc<AtomicU32>,
    hold_ms: Arc<AtomicU32>,
}

impl core::fmt::Debug for SimulatedButton {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulatedButton")
            .field("hold_ms", &self.hold_ms.load(Ordering::Relaxed))
            .finish()
    }
}

impl SimulatedButton {
    pub fn new(clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            clock,
            pressed_at: Arc::new(AtomicU32::new(0)),
            hold_ms: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Press now and release after `hold_ms`.
    pub fn press_for(&self, hold_ms: u32) {
        self.pressed_at.store(self.clock.millis(), Ordering::Relaxed);
        self.hold_ms.store(hold_ms, Ordering::Release);
    }
}

impl ButtonPin for SimulatedButton {
    fn is_pressed(&mut self) -> bool {
        let hold = self.hold_ms.load(Ordering::Acquire);
        hold > 0 && self.clock.ms_since(self.pressed_at.load(Ordering::Relaxed)) < hold
    }
}

/// Turns the encoder by emitting the A/B edge sequence an interrupt would see.
#[derive(Debug, Clone)]
pub struct SimulatedEncoder {
    decoder: Arc<QuadratureDecoder>,
    steps_per_detent: u32,
}

impl SimulatedEncoder {
    pub fn new(counter: EncoderCounter, steps_per_detent: u32) -> Self {
        Self {
            decoder: Arc::new(QuadratureDecoder::new(counter)),
            steps_per_detent: steps_per_detent.max(1),
        }
    }

    /// Positive detents turn clockwise.
    pub fn turn(&self, detents: i32) {
        const GRAY: [(bool, bool); 4] = [(false, false), (false, true), (true, true), (true, false)];
        let steps = detents.unsigned_abs() * self.steps_per_detent;
        let (a, b) = self.decoder.levels();
        let mut pos = GRAY.iter().position(|&s| s == (a, b)).unwrap_or(0);
        for _ in 0..steps {
            pos = if detents > 0 { (pos + 1) % 4 } else { (pos + 3) % 4 };
            let (a, b) = GRAY[pos];
            self.decoder.on_edge(a, b);
        }
    }
}
