//! Command APDUs sent to the reader.
//!
//! Only one command is needed: the PC/SC 2.01 part 3 pseudo-APDU `GET DATA`
//! with `P1 = 00`, which every CCID contactless reader answers with the UID
//! of the card in its field.
//!
//! ```text
//! CLA  INS  P1   P2   Le
//! FF   CA   00   00   00
//! ```

/// Class byte reserved for reader pseudo-APDUs.
pub const CLA_PSEUDO_APDU: u8 = 0xFF;

/// `GET DATA` instruction.
pub const INS_GET_DATA: u8 = 0xCA;

/// `P1` selecting the card UID (as opposed to `01`, the historical bytes).
pub const P1_UID: u8 = 0x00;

/// `P2` is unused by `GET DATA`.
pub const P2_NONE: u8 = 0x00;

/// `Le = 00` lets the reader return the full UID, whatever its length.
pub const LE_FULL_LENGTH: u8 = 0x00;

/// The complete "get identifier" command.
pub const GET_IDENTIFIER_COMMAND: [u8; 5] =
    [CLA_PSEUDO_APDU, INS_GET_DATA, P1_UID, P2_NONE, LE_FULL_LENGTH];

/// Receive buffer large enough for any short APDU response (256 data bytes
/// plus the status word).
pub const MAX_RESPONSE_LEN: usize = 258;

/// Build the fixed 5-byte "get identifier" command.
///
/// # Examples
///
/// ```
/// use tagbridge_protocol::build_identifier_command;
///
/// let command = build_identifier_command();
/// assert_eq!(command.len(), 5);
/// assert_eq!(command[1], 0xCA);
/// ```
#[must_use]
pub fn build_identifier_command() -> [u8; 5] {
    GET_IDENTIFIER_COMMAND
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_command_bytes() {
        assert_eq!(build_identifier_command(), [0xFF, 0xCA, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_response_buffer_holds_status_word() {
        assert!(MAX_RESPONSE_LEN >= 256 + 2);
    }
}
