//! Pin model.
//!
//! A pin is a named, typed, directional 32-bit memory cell. This module
//! defines the type and direction tags, the value enum with its raw cell
//! encoding, and the naming rules shared by every bus backend.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bus::BusError;
use crate::consts::HAL_NAME_LEN;

/// Value type carried by a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PinType {
    /// Boolean
    Bit = 1,
    /// Signed 32-bit integer
    S32 = 2,
}

impl PinType {
    /// Convert from raw `u8` tag. Returns `None` for unknown tags.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Bit),
            2 => Some(Self::S32),
            _ => None,
        }
    }

    /// Zero value of this type; every pin starts here.
    pub const fn zero(self) -> PinValue {
        match self {
            Self::Bit => PinValue::Bit(false),
            Self::S32 => PinValue::S32(0),
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bit => f.pad("bit"),
            Self::S32 => f.pad("s32"),
        }
    }
}

/// Data direction, seen from the owning component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PinDirection {
    /// Written by other components, read by the owner.
    In = 1,
    /// Written by the owner, read by other components.
    Out = 2,
}

impl PinDirection {
    /// Convert from raw `u8` tag. Returns `None` for unknown tags.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::In),
            2 => Some(Self::Out),
            _ => None,
        }
    }
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::In => f.pad("IN"),
            Self::Out => f.pad("OUT"),
        }
    }
}

/// A typed pin value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinValue {
    /// Value of a `bit` pin
    Bit(bool),
    /// Value of an `s32` pin
    S32(i32),
}

impl PinValue {
    /// Type tag matching this value.
    pub const fn pin_type(&self) -> PinType {
        match self {
            Self::Bit(_) => PinType::Bit,
            Self::S32(_) => PinType::S32,
        }
    }

    /// Encode into the 32-bit cell representation.
    pub const fn to_raw(self) -> u32 {
        match self {
            Self::Bit(b) => b as u32,
            Self::S32(v) => v as u32,
        }
    }

    /// Decode a 32-bit cell according to `ty`. Any non-zero bit cell is true.
    pub const fn from_raw(ty: PinType, raw: u32) -> Self {
        match ty {
            PinType::Bit => Self::Bit(raw != 0),
            PinType::S32 => Self::S32(raw as i32),
        }
    }

    /// Parse text typed by a user (`halcmd setp`) as a value of type `ty`.
    ///
    /// Bits accept `1`/`0`, `true`/`false` and `TRUE`/`FALSE`.
    pub fn parse(ty: PinType, text: &str) -> Result<Self, BusError> {
        let text = text.trim();
        match ty {
            PinType::Bit => match text {
                "1" | "true" | "TRUE" | "True" => Ok(Self::Bit(true)),
                "0" | "false" | "FALSE" | "False" => Ok(Self::Bit(false)),
                _ => Err(BusError::InvalidValue {
                    value: text.to_string(),
                    expected: ty,
                }),
            },
            PinType::S32 => text
                .parse::<i32>()
                .map(Self::S32)
                .map_err(|_| BusError::InvalidValue {
                    value: text.to_string(),
                    expected: ty,
                }),
        }
    }

    /// Boolean payload, if this is a bit.
    pub const fn as_bit(&self) -> Option<bool> {
        match self {
            Self::Bit(b) => Some(*b),
            Self::S32(_) => None,
        }
    }

    /// Integer payload, if this is an s32.
    pub const fn as_s32(&self) -> Option<i32> {
        match self {
            Self::S32(v) => Some(*v),
            Self::Bit(_) => None,
        }
    }
}

impl fmt::Display for PinValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bit(true) => f.pad("TRUE"),
            Self::Bit(false) => f.pad("FALSE"),
            Self::S32(v) => f.pad(&v.to_string()),
        }
    }
}

/// Snapshot of one pin, as listed by a bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinInfo {
    /// Full name including the component prefix
    pub name: String,
    /// Value type
    pub pin_type: PinType,
    /// Direction seen from the owner
    pub direction: PinDirection,
    /// Value at the time of the snapshot
    pub value: PinValue,
}

/// Check a component name, prefix or full pin name against the naming rules.
///
/// Names must be non-empty, at most [`HAL_NAME_LEN`] bytes and made of ASCII
/// graphic characters (no whitespace).
pub fn validate_name(name: &str) -> Result<(), BusError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.len() > HAL_NAME_LEN {
        "name is too long"
    } else if !name.bytes().all(|b| b.is_ascii_graphic()) {
        "name contains whitespace or non-ASCII characters"
    } else {
        return Ok(());
    };

    Err(BusError::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Join a prefix and a pin name into the full pin name and validate it.
pub fn full_pin_name(prefix: &str, pin: &str) -> Result<String, BusError> {
    validate_name(pin)?;
    let full = format!("{prefix}.{pin}");
    validate_name(&full)?;
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_encoding_of_negative_s32() {
        let v = PinValue::S32(-5);
        assert_eq!(PinValue::from_raw(PinType::S32, v.to_raw()), v);
    }

    #[test]
    fn nonzero_bit_cell_reads_true() {
        assert_eq!(PinValue::from_raw(PinType::Bit, 7), PinValue::Bit(true));
        assert_eq!(PinValue::from_raw(PinType::Bit, 0), PinValue::Bit(false));
    }

    #[test]
    fn tags_roundtrip() {
        for ty in [PinType::Bit, PinType::S32] {
            assert_eq!(PinType::from_u8(ty as u8), Some(ty));
        }
        for dir in [PinDirection::In, PinDirection::Out] {
            assert_eq!(PinDirection::from_u8(dir as u8), Some(dir));
        }
        assert!(PinType::from_u8(0).is_none());
        assert!(PinDirection::from_u8(9).is_none());
    }

    #[test]
    fn parse_bits_and_integers() {
        assert_eq!(PinValue::parse(PinType::Bit, "1").unwrap(), PinValue::Bit(true));
        assert_eq!(PinValue::parse(PinType::Bit, "FALSE").unwrap(), PinValue::Bit(false));
        assert_eq!(PinValue::parse(PinType::S32, " -12 ").unwrap(), PinValue::S32(-12));
        assert!(matches!(
            PinValue::parse(PinType::Bit, "2"),
            Err(BusError::InvalidValue { .. })
        ));
        assert!(PinValue::parse(PinType::S32, "4294967296").is_err());
    }

    #[test]
    fn display_matches_labels() {
        assert_eq!(PinValue::Bit(true).to_string(), "TRUE");
        assert_eq!(PinValue::Bit(false).to_string(), "FALSE");
        assert_eq!(PinValue::S32(42).to_string(), "42");
        assert_eq!(PinType::S32.to_string(), "s32");
        assert_eq!(PinDirection::Out.to_string(), "OUT");
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("hal-example").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name(&"x".repeat(HAL_NAME_LEN + 1)).is_err());
        assert_eq!(full_pin_name("hal-example", "count").unwrap(), "hal-example.count");
        assert!(full_pin_name(&"p".repeat(HAL_NAME_LEN), "count").is_err());
    }
}
