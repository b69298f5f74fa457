//! Keyboard layout identifiers and catalog entries.
//!
//! A layout is identified by the 16-bit language/layout code the OS uses
//! (the low word of a Windows `HKL`, e.g. `0x0409` for English (US) and
//! `0x0407` for German).  The value `0` never names a real layout; it is the
//! "no layout" sentinel and is never sent to the system.

use std::fmt;
use std::str::FromStr;

/// A 16-bit OS language/layout code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LayoutId(pub u16);

impl LayoutId {
    /// The "no layout" sentinel.
    pub const UNSET: LayoutId = LayoutId(0);

    /// Returns `true` for the [`LayoutId::UNSET`] sentinel.
    pub fn is_unset(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw 16-bit code.
    pub fn value(self) -> u16 {
        self.0
    }

    /// Builds the `HKL`-style value the OS expects for this layout
    /// (language id in both the low and the high word).
    pub fn to_hkl_bits(self) -> u32 {
        let id = self.0 as u32;
        (id << 16) | id
    }

    /// Extracts the language id from the low word of an `HKL` value.
    pub fn from_hkl_bits(hkl: usize) -> Self {
        LayoutId((hkl & 0xFFFF) as u16)
    }
}

/// Renders as 4-digit uppercase hexadecimal (`0407`), the persisted form.
impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

/// Error returned when a layout identifier is not valid hexadecimal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a hexadecimal layout identifier: {0:?}")]
pub struct ParseLayoutIdError(pub String);

impl FromStr for LayoutId {
    type Err = ParseLayoutIdError;

    /// Parses hexadecimal in either case, surrounding whitespace ignored.
    /// An optional `0x` prefix is accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ParseLayoutIdError(s.to_string()));
        }
        u16::from_str_radix(digits, 16)
            .map(LayoutId)
            .map_err(|_| ParseLayoutIdError(s.to_string()))
    }
}

impl From<u16> for LayoutId {
    fn from(value: u16) -> Self {
        LayoutId(value)
    }
}

/// An entry of the layout catalog: identifier plus display name.
///
/// Equality is by identifier only, so two catalog entries with the same code
/// but different spellings of the name compare equal.
#[derive(Debug, Clone, Eq)]
pub struct Layout {
    /// The OS layout code.
    pub id: LayoutId,
    /// Human-readable name shown in the selection prompt.
    pub name: String,
}

impl Layout {
    pub fn new(id: impl Into<LayoutId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

impl PartialEq for Layout {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_id_displays_as_four_digit_uppercase_hex() {
        assert_eq!(LayoutId(0x407).to_string(), "0407");
        assert_eq!(LayoutId(0xabc).to_string(), "0ABC");
        assert_eq!(LayoutId(0xF00D).to_string(), "F00D");
    }

    #[test]
    fn test_layout_id_parses_either_case() {
        assert_eq!("0407".parse::<LayoutId>(), Ok(LayoutId(0x0407)));
        assert_eq!("0abc".parse::<LayoutId>(), Ok(LayoutId(0x0ABC)));
        assert_eq!(" 409 ".parse::<LayoutId>(), Ok(LayoutId(0x0409)));
        assert_eq!("0x0809".parse::<LayoutId>(), Ok(LayoutId(0x0809)));
    }

    #[test]
    fn test_layout_id_rejects_non_hex_and_overflow() {
        assert!("notahex".parse::<LayoutId>().is_err());
        assert!("".parse::<LayoutId>().is_err());
        assert!("+407".parse::<LayoutId>().is_err());
        assert!("10000".parse::<LayoutId>().is_err());
    }

    #[test]
    fn test_unset_sentinel_is_zero() {
        assert!(LayoutId::UNSET.is_unset());
        assert!(LayoutId::default().is_unset());
        assert!(!LayoutId(0x0409).is_unset());
    }

    #[test]
    fn test_hkl_bits_duplicate_language_id_into_both_words() {
        assert_eq!(LayoutId(0x0407).to_hkl_bits(), 0x0407_0407);
        assert_eq!(LayoutId::from_hkl_bits(0xF002_0409), LayoutId(0x0409));
    }

    #[test]
    fn test_layout_equality_is_by_identifier() {
        let a = Layout::new(0x0407u16, "German");
        let b = Layout::new(0x0407u16, "Deutsch");
        let c = Layout::new(0x0409u16, "German");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "German");
    }
}
