//! Mock reader implementation for testing and development.
//!
//! This module provides a simulated PC/SC reader that can be controlled
//! programmatically without requiring physical hardware.

pub mod reader;

pub use reader::{DEFAULT_MOCK_READER_NAME, MockConnection, MockReader, MockReaderHandle};
