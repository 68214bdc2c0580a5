//! Driver configuration

use crate::{filter::FilterTuning, register::Mode};

/// SCL3300 driver configuration
///
/// The defaults reproduce the timing of the reference bring-up sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Measurement mode selected during initialization
    pub mode: Mode,
    /// Settle time after every frame before the bus is reused (µs)
    pub frame_delay_us: u32,
    /// Wait before the first command after power-up (ms)
    pub startup_delay_ms: u32,
    /// Settle time after the wake-up command (ms)
    pub wake_delay_ms: u32,
    /// Settle time after the software reset (ms)
    pub reset_delay_ms: u32,
    /// Settle time after mode, output enable and bank commands (ms)
    pub command_delay_ms: u32,
    /// Wait between calibration samples (ms)
    pub calibration_interval_ms: u32,
    /// Wait between samples of [`crate::Scl3300::read_average`] (ms)
    pub average_interval_ms: u32,
    /// Extra attempts for a failed register read, 0 for single-shot reads
    pub read_retries: u8,
    /// Gain law of the output filters
    pub filter: FilterTuning,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Mode2,
            frame_delay_us: 1_000,
            startup_delay_ms: 100,
            wake_delay_ms: 10,
            reset_delay_ms: 50,
            command_delay_ms: 20,
            calibration_interval_ms: 50,
            average_interval_ms: 5,
            read_retries: 0,
            filter: FilterTuning::default(),
        }
    }
}

impl Config {
    /// Select the measurement mode
    #[must_use]
    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the settle time after every frame
    #[must_use]
    pub const fn with_frame_delay_us(mut self, us: u32) -> Self {
        self.frame_delay_us = us;
        self
    }

    /// Set the wait between calibration samples
    #[must_use]
    pub const fn with_calibration_interval_ms(mut self, ms: u32) -> Self {
        self.calibration_interval_ms = ms;
        self
    }

    /// Retry failed register reads up to `retries` extra times
    #[must_use]
    pub const fn with_read_retries(mut self, retries: u8) -> Self {
        self.read_retries = retries;
        self
    }

    /// Set the filter gain law
    #[must_use]
    pub const fn with_filter(mut self, filter: FilterTuning) -> Self {
        self.filter = filter;
        self
    }
}
