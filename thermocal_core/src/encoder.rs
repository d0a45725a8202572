//! Polling-side interpretation of the rotary encoder.
//!
//! The interrupt side only ever adds raw transition counts to an
//! [`EncoderCounter`]; everything else (detents, bounds, change detection,
//! button debounce) happens here on the control thread.

use std::sync::Arc;

use thermocal_traits::{ButtonPin, Clock, EncoderCounter};

use crate::timer::CoopTimer;

/// Bounded integer driven by encoder rotation.
#[derive(Debug, Clone)]
pub struct RotaryEncoder {
    counter: EncoderCounter,
    steps_per_detent: i64,
    last_raw: i32,
    /// Transitions not yet worth a whole detent.
    carry: i64,
    value: i32,
    reported: i32,
    min: i32,
    max: i32,
    circular: bool,
}

impl RotaryEncoder {
    pub fn new(counter: EncoderCounter, steps_per_detent: u32) -> Self {
        let last_raw = counter.load();
        Self {
            counter,
            steps_per_detent: i64::from(steps_per_detent.max(1)),
            last_raw,
            carry: 0,
            value: 0,
            reported: 0,
            min: 0,
            max: 0,
            circular: false,
        }
    }

    /// Set the value range. Out-of-range values are clamped (or wrapped when
    /// `circular`). `min > max` is treated as the swapped range.
    pub fn set_boundaries(&mut self, min: i32, max: i32, circular: bool) {
        self.min = min.min(max);
        self.max = min.max(max);
        self.circular = circular;
        self.value = self.bound(i64::from(self.value));
        self.reported = self.value;
    }

    /// Force the value and resynchronise with the raw counter so rotation that
    /// happened before this call is discarded.
    pub fn set_value(&mut self, value: i32) {
        self.last_raw = self.counter.load();
        self.carry = 0;
        self.value = self.bound(i64::from(value));
        self.reported = self.value;
    }

    /// Fold pending ISR transitions into the value.
    pub fn poll(&mut self) {
        let raw = self.counter.load();
        let delta = raw.wrapping_sub(self.last_raw);
        self.last_raw = raw;
        if delta == 0 {
            return;
        }
        self.carry += i64::from(delta);
        // Truncating division keeps the remainder's sign with the carry, so a
        // half detent left then a half detent right cancels out.
        let detents = self.carry / self.steps_per_detent;
        self.carry -= detents * self.steps_per_detent;
        if detents != 0 {
            self.value = self.bound(i64::from(self.value) + detents);
        }
    }

    /// True exactly once per distinct committed value.
    pub fn value_changed(&mut self) -> bool {
        self.poll();
        if self.value == self.reported {
            return false;
        }
        self.reported = self.value;
        true
    }

    #[inline]
    pub fn value(&self) -> i32 {
        self.value
    }

    fn bound(&self, v: i64) -> i32 {
        let (min, max) = (i64::from(self.min), i64::from(self.max));
        let v = if self.circular {
            let span = max - min + 1;
            min + (v - min).rem_euclid(span)
        } else {
            v.clamp(min, max)
        };
        // In range of [min, max] so the narrowing is lossless.
        i32::try_from(v).unwrap_or(self.min)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonState {
    Released,
    Settling,
    Held,
}

/// Debounced, edge-triggered push button.
///
/// A click is reported once the pin has read pressed continuously for the
/// debounce window; the next click needs a release first.
pub struct ClickButton {
    pin: Box<dyn ButtonPin>,
    debounce: CoopTimer,
    state: ButtonState,
}

impl core::fmt::Debug for ClickButton {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClickButton")
            .field("state", &self.state)
            .field("debounce_ms", &self.debounce.deadline())
            .finish()
    }
}

impl ClickButton {
    pub fn new(
        pin: Box<dyn ButtonPin>,
        clock: Arc<dyn Clock + Send + Sync>,
        debounce_ms: u32,
    ) -> Self {
        Self {
            pin,
            debounce: CoopTimer::new(clock, debounce_ms),
            state: ButtonState::Released,
        }
    }

    pub fn clicked(&mut self) -> bool {
        let pressed = self.pin.is_pressed();
        match self.state {
            ButtonState::Released if pressed => {
                self.debounce.reset();
                self.state = ButtonState::Settling;
                self.settle()
            }
            ButtonState::Released => false,
            ButtonState::Settling if !pressed => {
                self.state = ButtonState::Released;
                false
            }
            ButtonState::Settling => self.settle(),
            ButtonState::Held => {
                if !pressed {
                    self.state = ButtonState::Released;
                }
                false
            }
        }
    }

    fn settle(&mut self) -> bool {
        if self.debounce.expired() {
            self.state = ButtonState::Held;
            return true;
        }
        false
    }
}
