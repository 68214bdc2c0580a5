//! Status and identification registers for SCL3300

use crate::register::{Response, RunState, WHOAMI_EXPECTED};

/// Contents of the `STATUS` summary register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    raw: u16,
    run_state: RunState,
}

impl Status {
    /// Create a status from a raw register value and return status
    #[must_use]
    pub const fn new(raw: u16, run_state: RunState) -> Self {
        Self { raw, run_state }
    }

    /// Get the raw register value
    ///
    /// Reading the status summary clears the latched flags
    #[must_use]
    pub const fn raw(&self) -> u16 {
        self.raw
    }

    /// Return status reported alongside the register
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.run_state
    }

    /// `true` when the device reports normal operation
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        matches!(self.run_state, RunState::Normal)
    }
}

impl From<Response> for Status {
    fn from(response: Response) -> Self {
        Self::new(response.data(), response.run_state())
    }
}

/// Component identification from the `WHOAMI` register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WhoAmI(u8);

impl WhoAmI {
    /// Create an identity from the raw byte
    #[must_use]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Get the identification byte
    #[must_use]
    pub const fn raw(&self) -> u8 {
        self.0
    }

    /// Check the byte against the SCL3300 identification
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        self.0 == WHOAMI_EXPECTED
    }
}

impl From<Response> for WhoAmI {
    fn from(response: Response) -> Self {
        let [_, id] = response.data().to_be_bytes();
        Self(id)
    }
}

/// Error flag registers
///
/// Any bit set here makes the device report [`RunState::Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorFlags {
    /// `ERR_FLAG1`
    pub flag1: u16,
    /// `ERR_FLAG2`
    pub flag2: u16,
}

impl ErrorFlags {
    /// `true` when no error flag is set
    #[must_use]
    pub const fn is_clear(&self) -> bool {
        self.flag1 == 0 && self.flag2 == 0
    }
}
