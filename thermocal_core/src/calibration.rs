//! Raw ADC value to temperature.
//!
//! Two cubics share the ADC range; `upper_cutoff` selects between them. No
//! continuity is enforced at the cutoff: a fit that disagrees there shows up
//! as a step in the converted temperature.

/// `T = a + b·x + c·x² + d·x³`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cubic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Cubic {
    pub const fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        ((self.d * x + self.c) * x + self.b) * x + self.a
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d].iter().all(|v| v.is_finite())
    }
}

/// Curve fitted against the stock 10k NTC in the 12-bit divider.
pub const DEFAULT_CUBIC: Cubic = Cubic::new(233.2, -0.09784, 2.401e-5, -3.491e-9);

/// Which cubic a raw value falls under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Low ADC counts, high temperature.
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PiecewiseCalibration {
    /// Raw values `<=` this use the upper cubic.
    pub upper_cutoff: i32,
    pub upper: Cubic,
    pub lower: Cubic,
}

impl Default for PiecewiseCalibration {
    fn default() -> Self {
        Self {
            upper_cutoff: 2019,
            upper: DEFAULT_CUBIC,
            lower: DEFAULT_CUBIC,
        }
    }
}

impl PiecewiseCalibration {
    #[inline]
    pub fn branch(&self, raw: i32) -> Branch {
        if raw <= self.upper_cutoff {
            Branch::Upper
        } else {
            Branch::Lower
        }
    }

    /// Temperature in °F for a raw reading or an aggregate of readings.
    pub fn temperature_f(&self, raw: i32) -> f32 {
        let curve = match self.branch(raw) {
            Branch::Upper => &self.upper,
            Branch::Lower => &self.lower,
        };
        curve.eval(f64::from(raw)) as f32
    }
}
