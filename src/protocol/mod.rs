//! Protocol implementation module
//!
//! This module decodes the gateway's 9-character status lines into typed
//! frames and reassembles consecutive frames into complete messages.

pub mod decoder;
pub mod frame;
pub mod message;

pub use self::decoder::{Decoded, ProtocolDecoder};
pub use self::frame::{FieldLine, FrameType, Source, Value};
pub use self::message::Message;
