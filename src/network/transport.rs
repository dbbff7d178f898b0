use std::time::Duration;

use bytes::BytesMut;
use socket2::SockRef;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tokio_util::codec::Encoder;
use tracing::{error, info, warn};

use crate::core::{Config, Error, Result, READ_CHUNK_SIZE};

use super::codec::LineCodec;

/// Reconnecting byte-stream connection to the gateway.
///
/// Connection failures and read timeouts are never fatal: they close the
/// stream, get logged, and the next read reconnects. Acknowledgement of
/// written commands is entirely the command channel's concern; this layer
/// only moves bytes.
pub struct TransportClient {
    host: String,
    port: u16,
    /// Read timeout; also the fixed back-off between connect attempts
    read_timeout: Duration,
    stream: Option<TcpStream>,
    codec: LineCodec,
}

impl TransportClient {
    /// Creates a client for the given gateway endpoint
    pub fn new(host: impl Into<String>, port: u16, read_timeout: Duration) -> Self {
        TransportClient {
            host: host.into(),
            port,
            read_timeout,
            stream: None,
            codec: LineCodec::new(),
        }
    }

    /// Creates a client from the library configuration
    pub fn from_config(config: &Config) -> Self {
        TransportClient::new(config.host.clone(), config.port, config.read_timeout)
    }

    /// Opens the connection, retrying with a fixed back-off until it
    /// succeeds. Blocks the worker, never returns failure.
    pub async fn connect(&mut self) {
        while self.stream.is_none() {
            info!(host = %self.host, port = self.port, "connecting to gateway");
            match TcpStream::connect((self.host.as_str(), self.port)).await {
                Ok(stream) => {
                    if let Err(e) = configure_socket(&stream) {
                        warn!(error = %e, "socket configuration failed");
                    }
                    info!(host = %self.host, port = self.port, "connected to gateway");
                    self.stream = Some(stream);
                }
                Err(e) => {
                    error!(
                        error = %e,
                        backoff = ?self.read_timeout,
                        "connect failed, sleeping and retrying"
                    );
                    sleep(self.read_timeout).await;
                }
            }
        }
    }

    /// Reads the next chunk of bytes, reconnecting first if the stream is
    /// closed.
    ///
    /// Returns an empty chunk when the stream stays silent past the read
    /// timeout, hits end of stream, or fails; all three close the
    /// connection so the next call reconnects.
    pub async fn read(&mut self) -> Vec<u8> {
        if self.stream.is_none() {
            self.connect().await;
        }
        let Some(stream) = self.stream.as_mut() else {
            return Vec::new();
        };

        let mut buf = [0u8; READ_CHUNK_SIZE];
        match timeout(self.read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => {
                warn!("gateway closed the connection, reconnecting on next read");
                self.stream = None;
                Vec::new()
            }
            Ok(Ok(n)) => buf[..n].to_vec(),
            Ok(Err(e)) => {
                warn!(error = %e, "read failed, reconnecting on next read");
                self.stream = None;
                Vec::new()
            }
            Err(_) => {
                warn!("data timeout, reconnecting on next read");
                self.stream = None;
                Vec::new()
            }
        }
    }

    /// Writes one command line, terminated with a single carriage return,
    /// atomically. A failed write closes the stream.
    pub async fn write(&mut self, command: &str) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::transport("not connected"));
        };

        let mut buf = BytesMut::with_capacity(command.len() + 1);
        self.codec.encode(command, &mut buf)?;

        if let Err(e) = stream.write_all(&buf).await {
            self.stream = None;
            return Err(Error::transport(format!("write failed: {}", e)));
        }
        Ok(())
    }

    /// Whether the stream is currently open
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

/// Long-lived gateway links want keepalive; commands are tiny, so Nagle
/// only adds latency.
fn configure_socket(stream: &TcpStream) -> Result<()> {
    stream.set_nodelay(true)?;
    SockRef::from(stream).set_keepalive(true)?;
    Ok(())
}
