//! Zero offset calibration

use crate::measurement::{Angles, Reading};

/// Per-axis angle offsets in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationOffsets {
    /// X offset in degrees
    pub x: f32,
    /// Y offset in degrees
    pub y: f32,
    /// Z offset in degrees
    pub z: f32,
}

impl CalibrationOffsets {
    /// Subtract the offsets from a reading, leaving temperature as is
    #[must_use]
    pub fn apply(&self, reading: &Reading) -> Reading {
        Reading {
            x: reading.x - self.x,
            y: reading.y - self.y,
            z: reading.z - self.z,
            temperature: reading.temperature,
        }
    }
}

/// Progress report passed to the calibration callback after every sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationProgress {
    /// Index of the sample just taken, starting at 0
    pub index: usize,
    /// Number of samples requested
    pub total: usize,
    /// Fewest valid reads of any axis so far
    pub valid: usize,
    /// Per-axis mean of the valid reads so far, `None` until every axis has
    /// one
    pub partial: Option<CalibrationOffsets>,
}

impl CalibrationProgress {
    /// Completion in percent
    #[must_use]
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 100;
        }
        let done = (self.index as u128 + 1) * 100;
        let percent = done / self.total as u128;
        u8::try_from(percent.min(100)).unwrap_or(100)
    }
}

/// Running sum of the valid reads of one channel
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AxisAccumulator {
    sum: f32,
    count: usize,
    last: Option<f32>,
}

impl AxisAccumulator {
    pub(crate) fn add(&mut self, value: f32) {
        self.sum += value;
        self.count += 1;
        self.last = Some(value);
    }

    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn mean(&self) -> Option<f32> {
        if self.count == 0 {
            return None;
        }
        Some(self.sum / self.count as f32)
    }
}

/// Per-axis sums of valid angle reads
///
/// Each axis keeps its own count, so a rejected read only leaves out that
/// one register.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct AngleAccumulator {
    pub(crate) x: AxisAccumulator,
    pub(crate) y: AxisAccumulator,
    pub(crate) z: AxisAccumulator,
}

impl AngleAccumulator {
    /// Fewest valid reads of any axis
    pub(crate) fn count(&self) -> usize {
        self.x.count.min(self.y.count).min(self.z.count)
    }

    /// Per-axis mean, once every axis has a valid read
    pub(crate) fn mean(&self) -> Option<CalibrationOffsets> {
        Some(CalibrationOffsets {
            x: self.x.mean()?,
            y: self.y.mean()?,
            z: self.z.mean()?,
        })
    }

    /// Last valid read of every axis
    pub(crate) fn last(&self) -> Option<Angles> {
        Some(Angles {
            x: self.x.last?,
            y: self.y.last?,
            z: self.z.last?,
        })
    }
}

/// Running sum of valid readings
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReadingAccumulator {
    x: AxisAccumulator,
    y: AxisAccumulator,
    z: AxisAccumulator,
    temperature: AxisAccumulator,
}

impl ReadingAccumulator {
    pub(crate) fn add(&mut self, reading: &Reading) {
        self.x.add(reading.x);
        self.y.add(reading.y);
        self.z.add(reading.z);
        self.temperature.add(reading.temperature);
    }

    pub(crate) fn mean(&self) -> Option<Reading> {
        Some(Reading {
            x: self.x.mean()?,
            y: self.y.mean()?,
            z: self.z.mean()?,
            temperature: self.temperature.mean()?,
        })
    }
}
