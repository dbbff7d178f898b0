//! Command channel module
//!
//! This module owns the outbound half of the link: commands queued for the
//! gateway, matched against their acknowledgement or error lines, with
//! bounded retries on failure.

pub mod channel;
pub mod command;

pub use self::channel::{ChannelConfig, CommandChannel, CommandHandle, Dispatch};
pub use self::command::{Command, CommandState, ErrorCode, FailureReason};
