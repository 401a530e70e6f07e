//! Card command/response protocol for the tag bridge.
//!
//! The bridge talks to contactless readers through the PC/SC pseudo-APDU
//! `GET DATA` (`FF CA 00 00 00`), which asks the reader for the UID of the
//! card currently in its field. The reader answers with the identifier bytes
//! followed by a two byte status word; only `90 00` carries a valid
//! identifier.
//!
//! ```
//! use tagbridge_protocol::{build_identifier_command, read_identifier};
//!
//! assert_eq!(build_identifier_command(), [0xFF, 0xCA, 0x00, 0x00, 0x00]);
//!
//! let id = read_identifier(&[0x04, 0xA1, 0xB2, 0xC3, 0x90, 0x00]).unwrap();
//! assert_eq!(id.to_string(), "04 A1 B2 C3");
//! assert_eq!(id.to_hex(), "04A1B2C3");
//! ```
//!
//! This crate has no I/O. Transport belongs to `tagbridge-hardware`.

pub mod apdu;
pub mod codec;
pub mod error;
pub mod identifier;
pub mod status;

pub use apdu::{GET_IDENTIFIER_COMMAND, build_identifier_command};
pub use codec::{parse_response, read_identifier, split_response};
pub use error::{ProtocolError, Result};
pub use identifier::{HexFormat, TagIdentifier};
pub use status::StatusWord;
