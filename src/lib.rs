#![no_std]
#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]

mod calibration;
mod config;
mod driver;
mod error;
pub mod filter;
pub mod frame;
mod measurement;
mod register;
mod status;

pub use calibration::{CalibrationOffsets, CalibrationProgress};
pub use config::Config;
pub use driver::{DeviceState, Scl3300};
pub use error::Error;
pub use filter::{AdaptiveFilter, CircularFilter, FilterTuning, ReadingFilter};
pub use measurement::{Acceleration, Angles, Reading};
pub use register::{Bank, Command, Mode, Response, RunState, WHOAMI_EXPECTED};
pub use status::{ErrorFlags, Status, WhoAmI};
