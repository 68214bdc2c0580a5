//! Adaptive exponential smoothing
//!
//! [`AdaptiveFilter`] is a first order low-pass whose gain follows the
//! statistics of the innovation (new sample minus current output). While the
//! innovation stays within its usual spread the gain sits near `alpha_min`;
//! an unusually large deviation pushes it towards `alpha_max` so genuine
//! changes are tracked quickly.
//!
//! [`CircularFilter`] applies the same gain law to angles in degrees. The
//! innovation is taken on the shortest arc and the output is recovered from a
//! smoothed unit vector, so crossing ±180° never produces a jump.

use core::f32::consts::PI;

use libm::{atan2f, cosf, fabsf, fmodf, powf, sinf, sqrtf};

use crate::measurement::Reading;

const EPSILON: f32 = 1e-9;
const INITIAL_VARIANCE: f32 = 1e-6;
const DEG_TO_RAD: f32 = PI / 180.0;
const RAD_TO_DEG: f32 = 180.0 / PI;

/// Gain law parameters shared by the filters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FilterTuning {
    /// Gain floor used for a quiet signal
    pub alpha_min: f32,
    /// Gain ceiling approached for large deviations
    pub alpha_max: f32,
    /// Decay of the innovation mean and variance, in `(0, 1)`
    pub beta: f32,
    /// Exponent applied to the normalized deviation
    pub power: f32,
}

impl Default for FilterTuning {
    fn default() -> Self {
        Self {
            alpha_min: 0.001,
            alpha_max: 0.2,
            beta: 0.99,
            power: 2.0,
        }
    }
}

/// Wrap an angle in degrees into `(-180, 180]`
#[must_use]
pub fn wrap_degrees(angle: f32) -> f32 {
    let mut a = fmodf(angle + 180.0, 360.0);
    if a <= 0.0 {
        a += 360.0;
    }
    a - 180.0
}

/// Unit vector `(cos, sin)` pointing at `degrees`
#[must_use]
pub fn to_unit_vector(degrees: f32) -> (f32, f32) {
    let rad = degrees * DEG_TO_RAD;
    (cosf(rad), sinf(rad))
}

/// Direction of `(cos, sin)` in degrees, in `[-180, 180]`
#[must_use]
pub fn from_unit_vector(cos: f32, sin: f32) -> f32 {
    atan2f(sin, cos) * RAD_TO_DEG
}

/// Single channel adaptive exponential filter
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdaptiveFilter {
    tuning: FilterTuning,
    mean: f32,
    variance: f32,
    alpha: f32,
    output: f32,
}

impl AdaptiveFilter {
    /// Create a filter whose output starts at `seed`
    #[must_use]
    pub fn new(tuning: FilterTuning, seed: f32) -> Self {
        Self {
            tuning,
            mean: 0.0,
            variance: INITIAL_VARIANCE,
            alpha: tuning.alpha_min,
            output: seed,
        }
    }

    /// Feed one sample and return the new output
    pub fn update(&mut self, sample: f32) -> f32 {
        let innovation = sample - self.output;
        let alpha = self.adapt(innovation);
        self.output += alpha * innovation;
        self.output
    }

    /// Update the innovation statistics and return the new gain
    ///
    /// The output is left untouched.
    fn adapt(&mut self, innovation: f32) -> f32 {
        let FilterTuning {
            alpha_min,
            alpha_max,
            beta,
            power,
        } = self.tuning;

        self.mean = beta * self.mean + (1.0 - beta) * innovation;
        let deviation = innovation - self.mean;
        self.variance = beta * self.variance + (1.0 - beta) * deviation * deviation;

        let normalized = fabsf(deviation) / (sqrtf(self.variance) + EPSILON);
        let shaped = powf(normalized, power);

        self.alpha = alpha_min + (alpha_max - alpha_min) * (shaped / (1.0 + shaped));
        self.alpha
    }

    /// Current output
    #[must_use]
    pub const fn output(&self) -> f32 {
        self.output
    }

    /// Gain used by the last update
    #[must_use]
    pub const fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Exponential mean of the innovation
    #[must_use]
    pub const fn mean(&self) -> f32 {
        self.mean
    }

    /// Exponential variance of the innovation
    #[must_use]
    pub const fn variance(&self) -> f32 {
        self.variance
    }

    /// Tuning in use
    #[must_use]
    pub const fn tuning(&self) -> FilterTuning {
        self.tuning
    }
}

/// Adaptive filter for angles in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CircularFilter {
    core: AdaptiveFilter,
    cos: f32,
    sin: f32,
}

impl CircularFilter {
    /// Create a filter whose output starts at `seed` degrees
    #[must_use]
    pub fn new(tuning: FilterTuning, seed: f32) -> Self {
        let (cos, sin) = to_unit_vector(seed);
        Self {
            core: AdaptiveFilter::new(tuning, seed),
            cos,
            sin,
        }
    }

    /// Feed one angle in degrees and return the filtered angle
    pub fn update(&mut self, degrees: f32) -> f32 {
        let innovation = wrap_degrees(degrees - self.core.output);
        let alpha = self.core.adapt(innovation);

        let (cos, sin) = to_unit_vector(degrees);
        self.cos = (1.0 - alpha) * self.cos + alpha * cos;
        self.sin = (1.0 - alpha) * self.sin + alpha * sin;

        self.core.output = from_unit_vector(self.cos, self.sin);
        self.core.output
    }

    /// Current filtered angle in degrees
    #[must_use]
    pub const fn output(&self) -> f32 {
        self.core.output
    }

    /// Gain used by the last update
    #[must_use]
    pub const fn alpha(&self) -> f32 {
        self.core.alpha
    }

    /// Smoothed direction as `(cos, sin)`
    ///
    /// The length shrinks below one while the input is spread out
    #[must_use]
    pub const fn vector(&self) -> (f32, f32) {
        (self.cos, self.sin)
    }
}

/// Filters for one [`Reading`]: circular on the angles, scalar on temperature
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReadingFilter {
    /// X angle filter
    pub x: CircularFilter,
    /// Y angle filter
    pub y: CircularFilter,
    /// Z angle filter
    pub z: CircularFilter,
    /// Temperature filter
    pub temperature: AdaptiveFilter,
}

impl ReadingFilter {
    /// Create the filters seeded with `seed`
    #[must_use]
    pub fn new(tuning: FilterTuning, seed: &Reading) -> Self {
        Self {
            x: CircularFilter::new(tuning, seed.x),
            y: CircularFilter::new(tuning, seed.y),
            z: CircularFilter::new(tuning, seed.z),
            temperature: AdaptiveFilter::new(tuning, seed.temperature),
        }
    }

    /// Feed one reading and return the filtered reading
    pub fn update(&mut self, reading: &Reading) -> Reading {
        Reading {
            x: self.x.update(reading.x),
            y: self.y.update(reading.y),
            z: self.z.update(reading.z),
            temperature: self.temperature.update(reading.temperature),
        }
    }

    /// Current filtered reading
    #[must_use]
    pub const fn output(&self) -> Reading {
        Reading {
            x: self.x.output(),
            y: self.y.output(),
            z: self.z.output(),
            temperature: self.temperature.output(),
        }
    }
}
