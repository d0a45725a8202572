//! Quadrature decoding for the encoder interrupt.
//!
//! Each A/B edge is folded into a 2-bit Gray state; valid neighbour moves
//! commit ±1 to the shared [`EncoderCounter`], invalid double jumps (a
//! missed edge) commit nothing.

use std::sync::atomic::{AtomicU8, Ordering};

use thermocal_traits::EncoderCounter;

/// Indexed by `(prev << 2) | next`.
const TRANSITIONS: [i8; 16] = [
    0, 1, -1, 0, //
    -1, 0, 0, 1, //
    1, 0, 0, -1, //
    0, -1, 1, 0,
];

#[derive(Debug)]
pub struct QuadratureDecoder {
    state: AtomicU8,
    counter: EncoderCounter,
}

impl QuadratureDecoder {
    pub fn new(counter: EncoderCounter) -> Self {
        Self {
            state: AtomicU8::new(0),
            counter,
        }
    }

    /// Feed the current pin levels. Safe to call from several interrupt
    /// callbacks; the state swap is atomic.
    pub fn on_edge(&self, a: bool, b: bool) {
        let next = (u8::from(a) << 1) | u8::from(b);
        let prev = self.state.swap(next, Ordering::AcqRel);
        let delta = TRANSITIONS[usize::from((prev << 2) | next)];
        if delta != 0 {
            self.counter.record(i32::from(delta));
        }
    }

    /// Last latched A/B levels.
    pub fn levels(&self) -> (bool, bool) {
        let s = self.state.load(Ordering::Acquire);
        (s & 0b10 != 0, s & 0b01 != 0)
    }

    pub fn counter(&self) -> &EncoderCounter {
        &self.counter
    }
}
