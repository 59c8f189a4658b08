//! RGB color literals.

use std::fmt;
use std::str::FromStr;

use crate::error::{LiteralError, ReactorError, Result};

/// A color with three 8-bit channels.
///
/// The canonical string form is `"r,g,b"` in decimal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RgbColor {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl RgbColor {
    /// Create a color from channel values.
    pub const fn new(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }

    /// Parse `"r,g,b"`.
    pub fn parse(literal: &str) -> std::result::Result<Self, LiteralError> {
        let mut channels = [0u8; 3];
        let mut count = 0;

        for part in literal.split(',') {
            if let Some(bad) = part.chars().find(|c| !c.is_ascii_digit()) {
                return Err(LiteralError::InvalidCharacter(bad));
            }
            // Overlong digit runs are out of range too.
            let value = part
                .bytes()
                .try_fold(0u32, |acc, digit| {
                    acc.checked_mul(10)?.checked_add(u32::from(digit - b'0'))
                })
                .unwrap_or(u32::MAX);
            if value > 255 {
                return Err(LiteralError::ChannelOutOfRange(value));
            }
            if count < channels.len() {
                channels[count] = value as u8;
            }
            count += 1;
        }

        if count != channels.len() {
            return Err(LiteralError::ChannelCount(count));
        }
        Ok(Self::new(channels[0], channels[1], channels[2]))
    }

    /// Pack into the native `0x00BBGGRR` layout.
    pub fn to_colorref(self) -> u32 {
        u32::from(self.red) | u32::from(self.green) << 8 | u32::from(self.blue) << 16
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.red, self.green, self.blue)
    }
}

impl FromStr for RgbColor {
    type Err = ReactorError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(Self::parse(s)?)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RgbColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let literal = String::deserialize(deserializer)?;
        RgbColor::parse(&literal).map_err(serde::de::Error::custom)
    }
}
