pub mod clock;
pub mod encoder;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use encoder::EncoderCounter;

/// Value returned by a reference probe that failed to answer (°F).
pub const DEVICE_DISCONNECTED_F: f32 = -196.6;

/// 64-bit bus address of a reference probe.
pub type DeviceAddress = [u8; 8];

/// One analog input channel sampled on demand.
pub trait Adc {
    fn read(&mut self) -> Result<i16, Box<dyn std::error::Error + Send + Sync>>;
}

/// Digital reference thermometer with an asynchronous conversion protocol.
pub trait TempProbe {
    /// Look up the address of the probe at `index` on the bus; called once at startup.
    fn resolve_address(&mut self, index: u8) -> Option<DeviceAddress>;
    /// Start a conversion and return immediately.
    fn request_conversion(&mut self);
    /// Result of the last conversion in °F, or `DEVICE_DISCONNECTED_F`.
    fn read_temp_f(&mut self) -> f32;
}

/// Level of the encoder push button (debouncing is done by the caller).
pub trait ButtonPin {
    fn is_pressed(&mut self) -> bool;
}

/// Append-only tabular log for calibration runs.
pub trait DataLog {
    /// Truncate the log and write the header row.
    fn begin(&mut self, header: &[&str]) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn append(
        &mut self,
        raw: i32,
        temp_f: f32,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Line-oriented operator console.
pub trait StatusSink {
    fn line(&mut self, text: &str);
}

impl<T: Adc + ?Sized> Adc for Box<T> {
    fn read(&mut self) -> Result<i16, Box<dyn std::error::Error + Send + Sync>> {
        (**self).read()
    }
}

impl<T: TempProbe + ?Sized> TempProbe for Box<T> {
    fn resolve_address(&mut self, index: u8) -> Option<DeviceAddress> {
        (**self).resolve_address(index)
    }
    fn request_conversion(&mut self) {
        (**self).request_conversion();
    }
    fn read_temp_f(&mut self) -> f32 {
        (**self).read_temp_f()
    }
}
