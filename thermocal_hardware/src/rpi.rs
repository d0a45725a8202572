//! Raspberry Pi wiring for the encoder and its push button (rppal).
//!
//! Encoder edges arrive on rppal's interrupt threads and are decoded straight
//! into the shared counter; the control loop only ever reads it.

use std::sync::Arc;

use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use thermocal_traits::{ButtonPin, EncoderCounter};
use tracing::info;

use crate::error::{HwError, Result};
use crate::quadrature::QuadratureDecoder;

fn gpio_err(e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(e.to_string())
}

/// Active-low push button with the internal pull-up enabled.
pub struct RpiButton {
    pin: InputPin,
}

impl RpiButton {
    pub fn new(gpio: &Gpio, pin: u8) -> Result<Self> {
        let pin = gpio.get(pin).map_err(gpio_err)?.into_input_pullup();
        Ok(Self { pin })
    }
}

impl ButtonPin for RpiButton {
    fn is_pressed(&mut self) -> bool {
        self.pin.is_low()
    }
}

/// Quadrature encoder on two pull-up inputs. Keep it alive for as long as
/// rotation should be counted; dropping it clears the interrupts.
pub struct RpiEncoder {
    _a: InputPin,
    _b: InputPin,
    decoder: Arc<QuadratureDecoder>,
}

impl RpiEncoder {
    pub fn new(gpio: &Gpio, pin_a: u8, pin_b: u8, counter: EncoderCounter) -> Result<Self> {
        let mut a = gpio.get(pin_a).map_err(gpio_err)?.into_input_pullup();
        let mut b = gpio.get(pin_b).map_err(gpio_err)?.into_input_pullup();
        let decoder = Arc::new(QuadratureDecoder::new(counter));
        // Seed with the resting levels so the first edge decodes correctly.
        decoder.on_edge(a.is_high(), b.is_high());

        let dec_a = decoder.clone();
        a.set_async_interrupt(Trigger::Both, move |level: Level| {
            let (_, b_level) = dec_a.levels();
            dec_a.on_edge(level == Level::High, b_level);
        })
        .map_err(gpio_err)?;
        let dec_b = decoder.clone();
        b.set_async_interrupt(Trigger::Both, move |level: Level| {
            let (a_level, _) = dec_b.levels();
            dec_b.on_edge(a_level, level == Level::High);
        })
        .map_err(gpio_err)?;

        info!(pin_a, pin_b, "encoder interrupts armed");
        Ok(Self {
            _a: a,
            _b: b,
            decoder,
        })
    }

    pub fn counter(&self) -> &EncoderCounter {
        self.decoder.counter()
    }
}

/// Open the GPIO controller.
pub fn open_gpio() -> Result<Gpio> {
    Gpio::new().map_err(gpio_err)
}
