//! 32-bit SPI frame codec
//!
//! Every frame on the bus is `[31:8]` payload followed by `[7:0]` CRC-8.
//! The CRC uses polynomial `0x1D` (x⁸ + x⁴ + x³ + x² + 1), seed `0xFF`,
//! processes the payload MSB first and transmits the complement of the
//! final register.

const CRC_POLY: u8 = 0x1D;
const CRC_SEED: u8 = 0xFF;

/// Mask of the 24 payload bits
pub const PAYLOAD_MASK: u32 = 0x00FF_FFFF;

/// A received frame whose CRC does not match its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChecksumError {
    /// The rejected frame as it came off the bus
    pub frame: u32,
    /// CRC recomputed over the received payload
    pub expected: u8,
}

/// Calculate the CRC-8 of a 24-bit payload
#[must_use]
pub const fn checksum(payload: u32) -> u8 {
    let data = (payload & PAYLOAD_MASK) << 8;
    let mut crc = CRC_SEED;
    let mut bit = 31;
    while bit > 7 {
        let mut msb = crc & 0x80;
        if (data >> bit) & 0x01 == 1 {
            msb ^= 0x80;
        }
        crc <<= 1;
        if msb != 0 {
            crc ^= CRC_POLY;
        }
        bit -= 1;
    }
    !crc
}

/// Build a 32-bit frame from a 24-bit payload
#[must_use]
pub const fn encode(payload: u32) -> u32 {
    ((payload & PAYLOAD_MASK) << 8) | checksum(payload) as u32
}

/// Check the CRC of a received frame and return its 24-bit payload
///
/// # Errors
///
/// Returns [`ChecksumError`] if the low byte does not match the CRC of the
/// upper 24 bits
pub const fn validate(frame: u32) -> Result<u32, ChecksumError> {
    let payload = frame >> 8;
    let expected = checksum(payload);
    if expected == frame.to_be_bytes()[3] {
        Ok(payload)
    } else {
        Err(ChecksumError { frame, expected })
    }
}
