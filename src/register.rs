//! Command table and response frame layout for the SCL3300.

use crate::frame;

/// SPI commands for the SCL3300
///
/// The discriminant is the 24-bit payload (`OP`, `RW`, `ADDR` and `DATA`
/// fields). The CRC byte is appended by [`frame::encode`], see
/// [`Command::frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
#[repr(u32)]
pub enum Command {
    /// Read X-axis acceleration
    ReadAccX = 0x04_0000,
    /// Read Y-axis acceleration
    ReadAccY = 0x08_0000,
    /// Read Z-axis acceleration
    ReadAccZ = 0x0C_0000,
    /// Read self-test output
    ReadSto = 0x10_0000,
    /// Read temperature
    ReadTemperature = 0x14_0000,
    /// Read status summary
    ReadStatusSummary = 0x18_0000,
    /// Read error flag 1
    ReadErrFlag1 = 0x1C_0000,
    /// Read error flag 2
    ReadErrFlag2 = 0x20_0000,
    /// Read X-axis angle
    ReadAngX = 0x24_0000,
    /// Read Y-axis angle
    ReadAngY = 0x28_0000,
    /// Read Z-axis angle
    ReadAngZ = 0x2C_0000,
    /// Read component identification
    ReadWhoAmI = 0x40_0000,
    /// Read serial number, low word
    ReadSerial1 = 0x64_0000,
    /// Read serial number, high word
    ReadSerial2 = 0x68_0000,
    /// Read the active register bank
    ReadCurrentBank = 0x7C_0000,
    /// Enable the angle outputs
    EnableAngleOutputs = 0xB0_001F,
    /// Change to mode 1; also wakes the device from power down
    ChangeToMode1 = 0xB4_0000,
    /// Change to mode 2
    ChangeToMode2 = 0xB4_0001,
    /// Change to mode 3
    ChangeToMode3 = 0xB4_0002,
    /// Change to mode 4
    ChangeToMode4 = 0xB4_0003,
    /// Enter power down mode
    PowerDown = 0xB4_0004,
    /// Software reset
    SwReset = 0xB4_0020,
    /// Switch to register bank 0
    SwitchToBank0 = 0xFC_0000,
    /// Switch to register bank 1
    SwitchToBank1 = 0xFC_0001,
}

impl Command {
    /// Wake up from power down mode
    ///
    /// The device shares this command with [`Command::ChangeToMode1`]
    pub const WAKE_UP: Command = Command::ChangeToMode1;

    /// The 24-bit payload of this command
    #[must_use]
    pub const fn payload(self) -> u32 {
        self as u32
    }

    /// The complete 32-bit frame, CRC included
    #[must_use]
    pub const fn frame(self) -> u32 {
        frame::encode(self.payload())
    }
}

impl From<Command> for u32 {
    fn from(command: Command) -> u32 {
        command.frame()
    }
}

/// Expected content of the `WHOAMI` register
pub const WHOAMI_EXPECTED: u8 = 0xC1;

/// Measurement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// ±1.2 g full scale, 40 Hz bandwidth
    Mode1,
    /// ±2.4 g full scale, 70 Hz bandwidth
    #[default]
    Mode2,
    /// Inclination mode, 10 Hz bandwidth
    Mode3,
    /// Inclination mode, 10 Hz bandwidth, low noise
    Mode4,
}

impl Mode {
    /// Command that selects this mode
    #[must_use]
    pub const fn command(self) -> Command {
        match self {
            Mode::Mode1 => Command::ChangeToMode1,
            Mode::Mode2 => Command::ChangeToMode2,
            Mode::Mode3 => Command::ChangeToMode3,
            Mode::Mode4 => Command::ChangeToMode4,
        }
    }

    /// Acceleration sensitivity in LSB/g
    #[must_use]
    pub const fn sensitivity(self) -> f32 {
        match self {
            Mode::Mode1 => 6000.0,
            Mode::Mode2 => 3000.0,
            Mode::Mode3 | Mode::Mode4 => 12000.0,
        }
    }
}

/// Register bank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    /// Measurement and status registers
    #[default]
    Bank0,
    /// Serial number registers
    Bank1,
}

impl Bank {
    /// Command that switches to this bank
    #[must_use]
    pub const fn command(self) -> Command {
        match self {
            Bank::Bank0 => Command::SwitchToBank0,
            Bank::Bank1 => Command::SwitchToBank1,
        }
    }
}

impl From<u16> for Bank {
    fn from(raw: u16) -> Self {
        if raw & 0x0001 == 0 {
            Bank::Bank0
        } else {
            Bank::Bank1
        }
    }
}

/// Return status (`RS`) carried in every response frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum RunState {
    /// Start-up in progress
    Startup = 0b00,
    /// Normal operation, no flags
    Normal = 0b01,
    /// Self-test running
    SelfTest = 0b10,
    /// Error flags are set
    Error = 0b11,
}

impl From<u8> for RunState {
    fn from(raw: u8) -> Self {
        match raw & 0b11 {
            0b00 => RunState::Startup,
            0b01 => RunState::Normal,
            0b10 => RunState::SelfTest,
            _ => RunState::Error,
        }
    }
}

bitfield::bitfield! {
    /// Validated response frame
    ///
    /// `OP[31:26] RS[25:24] DATA[23:8] CRC[7:0]`
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub struct Response(u32);
    impl Debug;
    u8;
    /// Echo of the operation code of the previous request
    pub opcode, _: 31, 26;
    /// Return status bits
    pub rs, _: 25, 24;
    /// Frame CRC
    pub crc, _: 7, 0;
}

impl Response {
    /// Return status of the device when the frame was sent
    #[must_use]
    pub fn run_state(&self) -> RunState {
        RunState::from(self.rs())
    }

    /// The 16-bit data field
    #[must_use]
    pub const fn data(&self) -> u16 {
        let [_, high, low, _] = self.0.to_be_bytes();
        u16::from_be_bytes([high, low])
    }

    /// The data field as a two's complement value
    #[must_use]
    pub const fn data_signed(&self) -> i16 {
        self.data().cast_signed()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Response {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(fmt, "Response(0x{:08X})", self.0);
    }
}
