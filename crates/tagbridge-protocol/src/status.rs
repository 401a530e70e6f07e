//! ISO 7816-4 status words.

use std::fmt;

/// Two byte status word (`SW1 SW2`) trailing every card response.
///
/// `90 00` is the only value meaning success. Everything else is a failure
/// the bridge does not need to decode further, although well-known values get
/// a short description for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte.
    pub sw1: u8,

    /// Second status byte.
    pub sw2: u8,
}

impl StatusWord {
    /// `90 00`: command completed normally.
    pub const SUCCESS: StatusWord = StatusWord::new(0x90, 0x00);

    /// Create a status word from its two bytes.
    #[must_use]
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Create a status word from its big-endian 16-bit value.
    #[must_use]
    pub const fn from_u16(value: u16) -> Self {
        Self::new((value >> 8) as u8, value as u8)
    }

    /// The big-endian 16-bit value, e.g. `0x9000`.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        ((self.sw1 as u16) << 8) | self.sw2 as u16
    }

    /// Whether this is exactly `90 00`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Warning processing (`62 xx` / `63 xx`).
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self.sw1, 0x62 | 0x63)
    }

    /// Short description of the status words a `GET DATA` can produce.
    pub fn description(&self) -> Option<&'static str> {
        let text = match (self.sw1, self.sw2) {
            (0x90, 0x00) => "success",
            (0x62, 0x82) => "end of data reached before Le bytes",
            (0x63, 0x00) => "operation failed",
            (0x67, 0x00) => "wrong length",
            (0x6A, 0x81) => "function not supported",
            (0x6B, 0x00) => "wrong parameters P1-P2",
            (0x6C, _) => "wrong Le",
            (0x6D, 0x00) => "instruction not supported",
            (0x6E, 0x00) => "class not supported",
            _ => return None,
        };
        Some(text)
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X}{:02X}", self.sw1, self.sw2)
    }
}

impl From<(u8, u8)> for StatusWord {
    fn from((sw1, sw2): (u8, u8)) -> Self {
        Self::new(sw1, sw2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_success_constant() {
        assert!(StatusWord::SUCCESS.is_success());
        assert_eq!(StatusWord::SUCCESS.as_u16(), 0x9000);
        assert_eq!(StatusWord::SUCCESS.to_string(), "9000");
    }

    #[rstest]
    #[case(0x90, 0x01)]
    #[case(0x91, 0x00)]
    #[case(0x63, 0x00)]
    #[case(0x6A, 0x81)]
    #[case(0x00, 0x90)]
    fn test_not_success(#[case] sw1: u8, #[case] sw2: u8) {
        assert!(!StatusWord::new(sw1, sw2).is_success());
    }

    #[test]
    fn test_u16_conversion() {
        let sw = StatusWord::from_u16(0x6A81);
        assert_eq!(sw, StatusWord::new(0x6A, 0x81));
        assert_eq!(sw.as_u16(), 0x6A81);
    }

    #[test]
    fn test_from_tuple() {
        let sw: StatusWord = (0x63, 0x00).into();
        assert!(sw.is_warning());
    }

    #[rstest]
    #[case(StatusWord::new(0x63, 0x00), Some("operation failed"))]
    #[case(StatusWord::new(0x6A, 0x81), Some("function not supported"))]
    #[case(StatusWord::new(0x6C, 0x07), Some("wrong Le"))]
    #[case(StatusWord::new(0x12, 0x34), None)]
    fn test_description(#[case] sw: StatusWord, #[case] expected: Option<&str>) {
        assert_eq!(sw.description(), expected);
    }

    #[test]
    fn test_display_is_zero_padded() {
        assert_eq!(StatusWord::new(0x01, 0x0A).to_string(), "010A");
    }
}
