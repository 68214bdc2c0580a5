//! Converted sensor readings

/// Angle register LSB per degree
pub const ANGLE_SENSITIVITY: f32 = 182.0;

/// Temperature register LSB per °C
pub const TEMPERATURE_SENSITIVITY: f32 = 18.9;

/// Temperature register zero point in °C
pub const TEMPERATURE_OFFSET: f32 = -273.0;

/// Convert a raw angle register to degrees
#[must_use]
pub fn angle_from_raw(raw: i16) -> f32 {
    f32::from(raw) / ANGLE_SENSITIVITY
}

/// Convert a raw temperature register to °C
#[must_use]
pub fn temperature_from_raw(raw: i16) -> f32 {
    TEMPERATURE_OFFSET + f32::from(raw) / TEMPERATURE_SENSITIVITY
}

/// Inclination of the three axes in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Angles {
    /// X angle in degrees
    pub x: f32,
    /// Y angle in degrees
    pub y: f32,
    /// Z angle in degrees
    pub z: f32,
}

/// Acceleration of the three axes in g
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Acceleration {
    /// X acceleration in g
    pub x: f32,
    /// Y acceleration in g
    pub y: f32,
    /// Z acceleration in g
    pub z: f32,
}

/// One sample of angles and temperature
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Reading {
    /// X angle in degrees
    pub x: f32,
    /// Y angle in degrees
    pub y: f32,
    /// Z angle in degrees
    pub z: f32,
    /// Temperature in °C
    pub temperature: f32,
}
