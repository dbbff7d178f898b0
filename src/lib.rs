//! otgw_link: OpenTherm Gateway line protocol core
//!
//! This library decodes the line-based telemetry protocol emitted by an
//! OpenTherm gateway over TCP and drives a half-duplex command channel back
//! to it, with acknowledgement matching, error classification and bounded
//! retries.

pub mod core;

pub mod bridge;
pub mod command;
pub mod network;
pub mod protocol;

// Re-export commonly used items
pub use crate::core::{Config, Error, Result};
pub use bridge::{Bridge, Operation};
pub use command::{Command, CommandHandle, CommandState};
pub use protocol::Message;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
