//! Peripherals for the thermistor calibration instrument.
//!
//! - `sim`: host-side bench (bath model, thermistor ADC, reference probe,
//!   button and encoder driven from software)
//! - `quadrature`: A/B edge decoding into the shared encoder counter
//! - `rpi` (feature `hardware`, Linux): GPIO button and encoder via rppal
pub mod error;
pub mod quadrature;
#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod rpi;
pub mod sim;

pub use error::HwError;
pub use quadrature::QuadratureDecoder;
pub use sim::{
    BathModel, HostClock, SimulatedAdc, SimulatedButton, SimulatedEncoder, SimulatedProbe,
    Thermistor,
};
