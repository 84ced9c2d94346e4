//! Launchpad pad color palette.
//!
//! The pads use a velocity-based palette: the velocity of an outbound
//! Note On selects the color.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const OFF: u8 = 0;
pub const WHITE: u8 = 3;
pub const RED: u8 = 5;
pub const RED_DIM: u8 = 7;
pub const YELLOW: u8 = 13;
pub const GREEN_DIM: u8 = 17;
pub const GREEN: u8 = 21;
pub const CYAN: u8 = 37;
pub const BLUE_DIM: u8 = 41;
pub const BLUE: u8 = 45;
pub const PURPLE: u8 = 53;

/// Named colors accepted in configuration files
const NAMED: &[(&str, u8)] = &[
    ("off", OFF),
    ("white", WHITE),
    ("red", RED),
    ("red_dim", RED_DIM),
    ("yellow", YELLOW),
    ("green_dim", GREEN_DIM),
    ("green", GREEN),
    ("cyan", CYAN),
    ("blue_dim", BLUE_DIM),
    ("blue", BLUE),
    ("purple", PURPLE),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("unknown color name '{0}'")]
    UnknownName(String),

    #[error("color index {0} is out of range (must be 0-127)")]
    OutOfRange(u32),
}

/// Pad color (numeric palette index or name)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Numeric(u32),
    Named(String),
}

impl ColorSpec {
    /// Resolve to a palette index
    pub fn resolve(&self) -> Result<u8, ColorError> {
        match self {
            ColorSpec::Numeric(n) if *n <= 127 => Ok(*n as u8),
            ColorSpec::Numeric(n) => Err(ColorError::OutOfRange(*n)),
            ColorSpec::Named(name) => {
                by_name(name).ok_or_else(|| ColorError::UnknownName(name.clone()))
            }
        }
    }
}

impl From<u8> for ColorSpec {
    fn from(value: u8) -> Self {
        ColorSpec::Numeric(value as u32)
    }
}

/// Look up a palette index by name (case-insensitive, `-` and `_` interchangeable)
pub fn by_name(name: &str) -> Option<u8> {
    let normalized = name.trim().to_lowercase().replace('-', "_");
    NAMED
        .iter()
        .find(|(n, _)| *n == normalized)
        .map(|(_, value)| *value)
}

/// Human name for a palette index, if it is one of the named colors
pub fn name_of(color: u8) -> Option<&'static str> {
    NAMED.iter().find(|(_, v)| *v == color).map(|(n, _)| *n)
}
