//! Network module
//!
//! This module owns the reconnecting TCP connection to the gateway and the
//! line framing on top of it.

pub mod codec;
pub mod transport;

pub use self::codec::LineCodec;
pub use self::transport::TransportClient;
