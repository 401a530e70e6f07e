//! Tag identifiers and their printable forms.

use crate::error::{ProtocolError, Result};
use std::fmt;
use std::str::FromStr;

/// Shortest UID defined by ISO 14443 (single size).
pub const MIN_STANDARD_UID_LENGTH: usize = 4;

/// Longest UID defined by ISO 14443 (triple size).
pub const MAX_STANDARD_UID_LENGTH: usize = 10;

/// Printable form used when an identifier leaves the process.
///
/// Both forms are uppercase with a fixed separator policy, so two equal
/// identifiers always print identically and every printed form decodes back
/// to exactly one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HexFormat {
    /// Bytes separated by a single space: `04 A1 B2 C3`.
    #[default]
    Spaced,

    /// No separators: `04A1B2C3`.
    Compact,
}

/// Identifier read from a card.
///
/// An immutable, non-empty byte sequence compared by exact byte match. The
/// only ways to obtain one are a successful card response
/// ([`parse_response`](crate::parse_response)), explicit bytes, or a printed
/// form.
///
/// # Examples
///
/// ```
/// use tagbridge_protocol::{HexFormat, TagIdentifier};
///
/// let id = TagIdentifier::new(vec![0x04, 0xA1, 0xB2, 0xC3]).unwrap();
/// assert_eq!(id.format(HexFormat::Spaced), "04 A1 B2 C3");
/// assert_eq!(id.format(HexFormat::Compact), "04A1B2C3");
///
/// let parsed: TagIdentifier = "04 A1 B2 C3".parse().unwrap();
/// assert_eq!(parsed, id);
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TagIdentifier(Vec<u8>);

impl TagIdentifier {
    /// Create an identifier from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::EmptyIdentifier`] for an empty sequence.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ProtocolError::EmptyIdentifier);
        }
        Ok(Self(bytes))
    }

    /// Decode either printed form.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidHex`] when the input is not a valid
    /// compact or single-space separated hex string.
    pub fn from_hex(input: &str) -> Result<Self> {
        let bytes = decode(input)?;
        Self::new(bytes)
    }

    /// Raw identifier bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the identifier.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the length is within the ISO 14443 UID size range (4 to 10 bytes).
    #[must_use]
    pub fn is_standard_length(&self) -> bool {
        (MIN_STANDARD_UID_LENGTH..=MAX_STANDARD_UID_LENGTH).contains(&self.0.len())
    }

    /// Compact form, e.g. `04A1B2C3`.
    #[must_use]
    pub fn to_hex(&self) -> String {
        encode(&self.0)
    }

    /// Spaced form, e.g. `04 A1 B2 C3`.
    #[must_use]
    pub fn to_spaced_hex(&self) -> String {
        encode_spaced(&self.0)
    }

    /// Render in the requested form.
    #[must_use]
    pub fn format(&self, format: HexFormat) -> String {
        match format {
            HexFormat::Spaced => self.to_spaced_hex(),
            HexFormat::Compact => self.to_hex(),
        }
    }
}

impl fmt::Debug for TagIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagIdentifier({})", self.to_hex())
    }
}

impl fmt::Display for TagIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_spaced_hex())
    }
}

impl FromStr for TagIdentifier {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for TagIdentifier {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Uppercase hex with no separators.
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Uppercase hex with one space between bytes.
#[must_use]
pub fn encode_spaced(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode a compact or single-space separated hex string.
///
/// Mixed separators, doubled spaces, leading/trailing whitespace and odd
/// groups are rejected so that decoding stays the exact inverse of encoding.
///
/// # Errors
///
/// Returns [`ProtocolError::InvalidHex`] for malformed input.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    if input.is_empty() {
        return Err(ProtocolError::invalid_hex(input, "empty string"));
    }

    if input.contains(' ') {
        let mut compact = String::with_capacity(input.len());
        for group in input.split(' ') {
            if group.len() != 2 {
                return Err(ProtocolError::invalid_hex(
                    input,
                    format!("byte group '{group}' is not two hex digits"),
                ));
            }
            compact.push_str(group);
        }
        return hex::decode(&compact).map_err(|e| ProtocolError::invalid_hex(input, e.to_string()));
    }

    hex::decode(input).map_err(|e| ProtocolError::invalid_hex(input, e.to_string()))
}
