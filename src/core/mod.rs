//! Core types and constants shared across the library.

pub mod error;
pub mod serde;
pub mod types;

pub use self::error::{Error, Result};
pub use self::types::Config;

/// Default TCP port of the gateway's serial bridge
pub const DEFAULT_PORT: u16 = 23;

/// Bytes requested per transport read; the gateway emits short frames at a
/// slow cadence, so small chunks keep the read loop responsive
pub const READ_CHUNK_SIZE: usize = 11;

/// Length of a protocol status line: role + type digit + reserved digit +
/// two id digits + four data digits
pub const FRAME_LINE_LEN: usize = 9;
