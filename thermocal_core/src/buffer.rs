//! Fixed-capacity sample buffer with derived statistics.
//!
//! Two fill disciplines share one backing array:
//! - `append` fills once and then rejects samples until `clear()`/`resize()`;
//!   used for the per-cycle ADC burst.
//! - `push_rolling` overwrites the oldest sample once full; used for the
//!   median/average histories behind the meta-statistics.
//!
//! Statistics are only defined on a full buffer and return `None` otherwise.
//! Samples are visited in chronological order, which matters for `slope()`
//! and `left_skew_count()`.

#[derive(Debug, Clone)]
pub struct SampleBuffer {
    values: Vec<i16>,
    len: usize,
    /// Index of the oldest sample once a rolling push has wrapped.
    head: usize,
    full: bool,
    scratch: Vec<i16>,
}

impl SampleBuffer {
    /// Create an empty buffer; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: vec![0; capacity],
            len: 0,
            head: 0,
            full: false,
            scratch: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Store `value` in the next free slot. Returns `false` (and leaves the
    /// contents untouched) when the buffer is already full.
    pub fn append(&mut self, value: i16) -> bool {
        if self.full {
            return false;
        }
        self.values[self.len] = value;
        self.len += 1;
        self.full = self.len == self.values.len();
        true
    }

    /// Store `value`, overwriting the oldest sample when full.
    pub fn push_rolling(&mut self, value: i16) {
        if !self.full {
            self.append(value);
            return;
        }
        self.values[self.head] = value;
        self.head = (self.head + 1) % self.values.len();
    }

    /// Empty the buffer and zero its storage.
    pub fn clear(&mut self) {
        self.values.fill(0);
        self.len = 0;
        self.head = 0;
        self.full = false;
    }

    /// Reallocate to `capacity` (at least 1) and clear.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        self.values = vec![0; capacity];
        self.scratch = Vec::with_capacity(capacity);
        self.len = 0;
        self.head = 0;
        self.full = false;
    }

    /// Sample `i` in chronological order.
    pub fn get(&self, i: usize) -> Option<i16> {
        if i >= self.len {
            return None;
        }
        Some(self.values[(self.head + i) % self.values.len()])
    }

    /// Stored samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = i16> + '_ {
        let (tail, front) = self.values[..self.len].split_at(self.head);
        front.iter().chain(tail.iter()).copied()
    }

    /// Middle element of a sorted copy.
    ///
    /// Capacities are odd by configuration policy; for an even capacity this
    /// returns the upper of the two middle elements.
    pub fn median(&mut self) -> Option<i16> {
        if !self.full {
            return None;
        }
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.values);
        self.scratch.sort_unstable();
        Some(self.scratch[self.scratch.len() / 2])
    }

    pub fn mean(&self) -> Option<f64> {
        if !self.full {
            return None;
        }
        let sum: i64 = self.values.iter().map(|&v| i64::from(v)).sum();
        Some(sum as f64 / self.values.len() as f64)
    }

    /// Mean rounded half away from zero.
    pub fn mean_rounded(&self) -> Option<i32> {
        self.mean().map(|m| m.round() as i32)
    }

    /// Population standard deviation (two-pass).
    pub fn std_dev(&self) -> Option<f64> {
        let mean = self.mean()?;
        let n = self.values.len() as f64;
        let ss: f64 = self
            .values
            .iter()
            .map(|&v| {
                let d = f64::from(v) - mean;
                d * d
            })
            .sum();
        Some((ss / n).sqrt())
    }

    /// Least-squares slope of value against sample index (counts per sample).
    /// Negative means readings decreased over the burst.
    pub fn slope(&self) -> Option<f64> {
        let (slope, _) = self.trend()?;
        Some(slope)
    }

    /// Length of the leading run of samples whose distance from the trend
    /// line exceeds `threshold_sigma` standard deviations. Stops at the first
    /// sample inside the band.
    pub fn left_skew_count(&self, threshold_sigma: f64) -> Option<usize> {
        let (slope, intercept) = self.trend()?;
        let limit = threshold_sigma * self.std_dev()?;
        let count = self
            .iter()
            .enumerate()
            .take_while(|(i, v)| {
                let fitted = intercept + slope * (*i as f64);
                (f64::from(*v) - fitted).abs() > limit
            })
            .count();
        Some(count)
    }

    /// (slope, intercept) of the least-squares line through (index, value).
    fn trend(&self) -> Option<(f64, f64)> {
        let mean_y = self.mean()?;
        let n = self.values.len();
        if n < 2 {
            return Some((0.0, mean_y));
        }
        let mean_x = (n - 1) as f64 / 2.0;
        let mut sxx = 0.0f64;
        let mut sxy = 0.0f64;
        for (i, v) in self.iter().enumerate() {
            let dx = i as f64 - mean_x;
            sxx += dx * dx;
            sxy += dx * (f64::from(v) - mean_y);
        }
        let slope = sxy / sxx;
        Some((slope, mean_y - slope * mean_x))
    }
}
