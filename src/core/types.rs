use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the gateway link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Gateway host name or address
    pub host: String,
    /// Gateway TCP port
    pub port: u16,
    /// Transport read timeout; also the fixed reconnect back-off
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub read_timeout: Duration,
    /// Time allowed for the gateway to answer a sent command before it is
    /// retransmitted
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub response_timeout: Duration,
    /// Maximum automatic resends after a Syntax Error response
    pub max_syntax_retries: u32,
    /// Maximum transmissions of one command before it fails with a timeout
    pub max_send_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "localhost".to_string(),
            port: super::DEFAULT_PORT,
            read_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(2),
            max_syntax_retries: 3,
            max_send_attempts: 5,
        }
    }
}
