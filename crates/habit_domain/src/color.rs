use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_COLOR_HEX: &str = "1C7ED6";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex color `{0}`")]
pub struct ColorError(pub String);

/// Six-digit uppercase `RRGGBB` color, stored without a leading `#`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Accepts `RRGGBB`, `#RRGGBB` and the three digit shorthand `RGB`.
    pub fn parse(input: &str) -> Result<Self, ColorError> {
        let digits = input.trim().trim_start_matches('#');
        let expanded: String = if digits.len() == 3 {
            digits.chars().flat_map(|c| [c, c]).collect()
        } else {
            digits.to_string()
        };
        if expanded.len() != 6 || !expanded.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError(input.to_string()));
        }
        Ok(Self(expanded.to_ascii_uppercase()))
    }

    pub fn from_rgb(red: u8, green: u8, blue: u8) -> Self {
        Self(format!("{red:02X}{green:02X}{blue:02X}"))
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        let value = u32::from_str_radix(&self.0, 16).unwrap_or(0);
        (
            ((value >> 16) & 0xFF) as u8,
            ((value >> 8) & 0xFF) as u8,
            (value & 0xFF) as u8,
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self(DEFAULT_COLOR_HEX.to_string())
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for HexColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.0
    }
}
