//! Bridge module
//!
//! This module runs the single worker loop: read from the transport, frame
//! lines, feed the protocol decoder, and drive the command channel. All
//! mutable state (the message under assembly, the command in flight) lives
//! in objects owned by this loop; only command submission crosses threads.

use std::time::Instant;

use bytes::BytesMut;
use tokio::sync::mpsc;
use tokio_util::codec::Decoder;
use tracing::{info, warn};

use crate::command::{ChannelConfig, Command, CommandChannel, CommandHandle, Dispatch};
use crate::core::{Config, Result};
use crate::network::{LineCodec, TransportClient};
use crate::protocol::{Decoded, Message, ProtocolDecoder};

/// One work product of the worker loop, pushed to the consumer as produced
#[derive(Debug)]
pub enum Operation {
    /// A completed telemetry message
    Message(Message),
    /// A command that reached a terminal state
    Command(Command),
}

/// The gateway worker: owns the transport, framer, decoder and command
/// channel, and runs them sequentially and indefinitely.
pub struct Bridge {
    transport: TransportClient,
    codec: LineCodec,
    buffer: BytesMut,
    decoder: ProtocolDecoder,
    channel: CommandChannel,
    operation_tx: mpsc::Sender<Operation>,
}

impl Bridge {
    /// Creates the bridge plus the two ends the embedding process keeps:
    /// a thread-safe handle for submitting commands and the stream of
    /// produced operations.
    pub fn new(config: Config) -> (Self, CommandHandle, mpsc::Receiver<Operation>) {
        let (operation_tx, operation_rx) = mpsc::channel(100);
        let (channel, handle) = CommandChannel::new(ChannelConfig::from(&config));
        let transport = TransportClient::from_config(&config);

        let bridge = Bridge {
            transport,
            codec: LineCodec::new(),
            buffer: BytesMut::with_capacity(64),
            decoder: ProtocolDecoder::new(),
            channel,
            operation_tx,
        };
        (bridge, handle, operation_rx)
    }

    /// Runs the read, frame and dispatch loop until the operation receiver
    /// is dropped. Transport faults reconnect internally; nothing here is
    /// fatal.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let chunk = self.transport.read().await;
            self.buffer.extend_from_slice(&chunk);

            let mut saw_line = false;
            while let Some(line) = self.codec.decode(&mut self.buffer)? {
                saw_line = true;
                if !self.process_line(&line).await? {
                    return Ok(());
                }
            }

            // A quiet stream must still send queued commands and drive the
            // liveness timeout
            if !saw_line && !self.dispatch_tick(None).await? {
                return Ok(());
            }
        }
    }

    /// Handles one framed line. Returns false once the consumer hung up.
    async fn process_line(&mut self, line: &str) -> Result<bool> {
        match self.decoder.decode(line) {
            Decoded::Emitted(message) => {
                if self
                    .operation_tx
                    .send(Operation::Message(message))
                    .await
                    .is_err()
                {
                    return Ok(false);
                }
                Ok(true)
            }
            Decoded::Consumed => self.dispatch_tick(None).await,
            Decoded::Unparsed => self.dispatch_tick(Some(line)).await,
        }
    }

    /// Runs one command channel tick and acts on its result.
    async fn dispatch_tick(&mut self, line: Option<&str>) -> Result<bool> {
        match self.channel.dispatch(line, Instant::now()) {
            Dispatch::Completed(command) => {
                info!(
                    command = command.text(),
                    success = command.is_success(),
                    "processed command"
                );
                if self
                    .operation_tx
                    .send(Operation::Command(command))
                    .await
                    .is_err()
                {
                    return Ok(false);
                }
            }
            Dispatch::Transmit(text) => {
                if let Err(e) = self.transport.write(&text).await {
                    warn!(error = %e, "command write failed, retransmission will retry");
                }
                // Stamp even a failed write; the liveness timeout drives
                // the resend once the transport is back
                self.channel.mark_sent(Instant::now());
            }
            Dispatch::Idle => {}
        }
        Ok(true)
    }
}
