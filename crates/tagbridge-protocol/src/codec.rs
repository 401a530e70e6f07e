//! Response interpretation.
//!
//! Drivers hand back the raw response buffer (data followed by `SW1 SW2`).
//! [`split_response`] separates the two, [`parse_response`] decides whether
//! the data is a usable identifier.

use crate::error::{ProtocolError, Result};
use crate::identifier::TagIdentifier;
use crate::status::StatusWord;

/// Split a raw response into its data bytes and trailing status word.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if fewer than two bytes were received.
///
/// # Examples
///
/// ```
/// use tagbridge_protocol::{StatusWord, split_response};
///
/// let (data, sw) = split_response(&[0x01, 0x02, 0x90, 0x00]).unwrap();
/// assert_eq!(data, &[0x01, 0x02]);
/// assert_eq!(sw, StatusWord::SUCCESS);
/// ```
pub fn split_response(raw: &[u8]) -> Result<(&[u8], StatusWord)> {
    match raw {
        [data @ .., sw1, sw2] => Ok((data, StatusWord::new(*sw1, *sw2))),
        _ => Err(ProtocolError::Truncated { len: raw.len() }),
    }
}

/// Interpret the data of a `GET DATA` response.
///
/// Succeeds only when `status` is exactly `90 00` and data is present. The
/// data of a failed response is never turned into an identifier.
///
/// # Errors
///
/// - [`ProtocolError::NonSuccessStatus`] for any status other than `90 00`
/// - [`ProtocolError::EmptyIdentifier`] for `90 00` without data
pub fn parse_response(data: &[u8], status: StatusWord) -> Result<TagIdentifier> {
    if !status.is_success() {
        return Err(ProtocolError::NonSuccessStatus(status));
    }
    TagIdentifier::new(data)
}

/// [`split_response`] followed by [`parse_response`].
///
/// # Errors
///
/// Any error of the two steps.
pub fn read_identifier(raw: &[u8]) -> Result<TagIdentifier> {
    let (data, status) = split_response(raw)?;
    parse_response(data, status)
}
