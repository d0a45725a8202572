use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

/// Raw rotation counter shared between the encoder interrupt and the main loop.
///
/// The interrupt side is the only writer and only ever commits whole signed
/// transition counts with `record`; the main loop only reads. The counter
/// wraps on overflow, so readers must diff successive loads with
/// `wrapping_sub`.
#[derive(Debug, Clone, Default)]
pub struct EncoderCounter {
    raw: Arc<AtomicI32>,
}

impl EncoderCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interrupt side: commit `delta` quadrature transitions.
    #[inline]
    pub fn record(&self, delta: i32) {
        self.raw.fetch_add(delta, Ordering::Release);
    }

    /// Polling side: current raw transition count.
    #[inline]
    pub fn load(&self) -> i32 {
        self.raw.load(Ordering::Acquire)
    }
}
