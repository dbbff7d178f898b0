use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::Config;

use super::command::{Command, CommandState, ErrorCode, FailureReason};

/// Command channel configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Time allowed for a response before a sent command is retransmitted
    pub response_timeout: Duration,
    /// Maximum automatic resends after a Syntax Error response
    pub max_syntax_retries: u32,
    /// Maximum transmissions of one command before it fails with a timeout
    pub max_send_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            response_timeout: Duration::from_secs(2),
            max_syntax_retries: 3,
            max_send_attempts: 5,
        }
    }
}

impl From<&Config> for ChannelConfig {
    fn from(config: &Config) -> Self {
        ChannelConfig {
            response_timeout: config.response_timeout,
            max_syntax_retries: config.max_syntax_retries,
            max_send_attempts: config.max_send_attempts,
        }
    }
}

/// Result of one dispatch tick
#[derive(Debug)]
pub enum Dispatch {
    /// A command reached a terminal state and is handed to the caller
    Completed(Command),
    /// This text must be written to the transport; the caller writes it and
    /// then calls `mark_sent` with the write timestamp
    Transmit(String),
    /// Nothing to do this tick
    Idle,
}

/// Handle for submitting commands from any thread
#[derive(Debug, Clone)]
pub struct CommandHandle {
    tx: mpsc::UnboundedSender<String>,
}

impl CommandHandle {
    /// Queues a command for transmission; never blocks.
    pub fn submit(&self, text: impl Into<String>) {
        let text = text.into();
        info!(command = %text, "queueing command");
        if self.tx.send(text).is_err() {
            warn!("command channel is gone, dropping command");
        }
    }
}

/// Serializes outbound commands onto the line stream, one in flight at a
/// time, and correlates their responses.
///
/// Only the worker loop may call `dispatch` and `mark_sent`; `submit` on
/// the handle is the one thread-safe entry point.
pub struct CommandChannel {
    intake: mpsc::UnboundedReceiver<String>,
    queue: VecDeque<Command>,
    in_flight: Option<Command>,
    syntax_retries: u32,
    config: ChannelConfig,
}

impl CommandChannel {
    /// Creates a channel and its submission handle
    pub fn new(config: ChannelConfig) -> (Self, CommandHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let channel = CommandChannel {
            intake: rx,
            queue: VecDeque::new(),
            in_flight: None,
            syntax_retries: 0,
            config,
        };
        (channel, CommandHandle { tx })
    }

    /// Runs one dispatch tick.
    ///
    /// `line` is the incoming line the protocol decoder did not consume, or
    /// `None` when the decoder consumed it (or no line arrived); the
    /// dequeue and timeout stages still run in that case. `now` is the tick
    /// timestamp the 2-second liveness check compares against.
    pub fn dispatch(&mut self, line: Option<&str>, now: Instant) -> Dispatch {
        self.drain_intake();

        // Match the line against the command awaiting its response
        let mut processed = false;
        if let (Some(text), Some(cmd)) = (line, self.in_flight.as_mut()) {
            if cmd.is_sent() {
                if cmd.matches_ack(text) {
                    cmd.acknowledge(text.to_string());
                } else if let Some(code) = ErrorCode::from_line(text) {
                    cmd.fail(FailureReason::Code(code));
                }
                processed = cmd.is_processed();
            }
        }
        if processed {
            if let Some(cmd) = self.in_flight.take() {
                if cmd.is_syntax_error() && self.syntax_retries < self.config.max_syntax_retries {
                    self.syntax_retries += 1;
                    warn!(
                        retry = self.syntax_retries,
                        command = cmd.text(),
                        "repeating command after syntax error"
                    );
                    // Front of the queue: the resend goes out next
                    self.queue.push_front(Command::new(cmd.text()));
                } else {
                    self.syntax_retries = 0;
                }
                return Dispatch::Completed(cmd);
            }
        }

        // Nothing in flight: put the next queued command on the wire
        if self.in_flight.is_none() {
            if let Some(cmd) = self.queue.pop_front() {
                let text = cmd.text().to_string();
                self.in_flight = Some(cmd);
                return Dispatch::Transmit(text);
            }
        }

        // Liveness: a sent command with no response gets retransmitted
        // until its send budget runs out
        let mut verdict = TimeoutVerdict::None;
        if let Some(cmd) = self.in_flight.as_ref() {
            if let CommandState::Sent { at } = cmd.state() {
                if now.duration_since(*at) >= self.config.response_timeout {
                    verdict = if cmd.send_attempts() >= self.config.max_send_attempts {
                        TimeoutVerdict::GiveUp
                    } else {
                        TimeoutVerdict::Resend
                    };
                }
            }
        }
        match verdict {
            TimeoutVerdict::Resend => {
                if let Some(cmd) = self.in_flight.as_mut() {
                    warn!(
                        command = cmd.text(),
                        timeout = ?self.config.response_timeout,
                        "no response for command, repeating"
                    );
                    cmd.reset_for_resend();
                    return Dispatch::Transmit(cmd.text().to_string());
                }
            }
            TimeoutVerdict::GiveUp => {
                if let Some(mut cmd) = self.in_flight.take() {
                    warn!(
                        command = cmd.text(),
                        attempts = cmd.send_attempts(),
                        "no response for command, giving up"
                    );
                    cmd.fail(FailureReason::Timeout);
                    self.syntax_retries = 0;
                    return Dispatch::Completed(cmd);
                }
            }
            TimeoutVerdict::None => {}
        }

        if let Some(text) = line {
            if !text.trim().is_empty() {
                warn!(line = text, "unsupported message");
            }
        }
        Dispatch::Idle
    }

    /// Records that the in-flight command was written at `at`
    pub fn mark_sent(&mut self, at: Instant) {
        if let Some(cmd) = self.in_flight.as_mut() {
            cmd.mark_sent(at);
            debug!(
                command = cmd.text(),
                attempts = cmd.send_attempts(),
                "command sent"
            );
        }
    }

    /// Number of commands waiting behind the one in flight
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether a command currently occupies the wire
    pub fn has_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    fn drain_intake(&mut self) {
        while let Ok(text) = self.intake.try_recv() {
            self.queue.push_back(Command::new(&text));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeoutVerdict {
    None,
    Resend,
    GiveUp,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> (CommandChannel, CommandHandle) {
        CommandChannel::new(ChannelConfig::default())
    }

    fn send_next(channel: &mut CommandChannel, now: Instant) -> String {
        match channel.dispatch(None, now) {
            Dispatch::Transmit(text) => {
                channel.mark_sent(now);
                text
            }
            other => panic!("expected transmit, got {:?}", other),
        }
    }

    #[test]
    fn test_submit_and_acknowledge() {
        let (mut channel, handle) = channel();
        let now = Instant::now();

        handle.submit("TT=20.50");
        assert_eq!(send_next(&mut channel, now), "TT=20.50");
        assert!(channel.has_in_flight());

        match channel.dispatch(Some("TT: 20.50"), now) {
            Dispatch::Completed(cmd) => {
                assert!(cmd.is_processed());
                assert!(cmd.is_success());
                assert_eq!(cmd.result(), Some("TT: 20.50"));
            }
            other => panic!("expected completed, got {:?}", other),
        }
        assert!(!channel.has_in_flight());
    }

    #[test]
    fn test_error_code_fails_without_retry() {
        let (mut channel, handle) = channel();
        let now = Instant::now();

        handle.submit("HW=2");
        send_next(&mut channel, now);

        match channel.dispatch(Some("BV"), now) {
            Dispatch::Completed(cmd) => {
                assert!(!cmd.is_success());
                assert_eq!(cmd.failure(), Some(FailureReason::Code(ErrorCode::BadValue)));
            }
            other => panic!("expected completed, got {:?}", other),
        }
        // Only syntax errors are re-queued
        assert_eq!(channel.pending(), 0);
    }

    #[test]
    fn test_syntax_error_retried_three_times() {
        let (mut channel, handle) = channel();
        let now = Instant::now();

        handle.submit("TT=abc");

        // Three automatic resends
        for _ in 0..3 {
            assert_eq!(send_next(&mut channel, now), "TT=abc");
            match channel.dispatch(Some("SE"), now) {
                Dispatch::Completed(cmd) => assert!(cmd.is_syntax_error()),
                other => panic!("expected completed, got {:?}", other),
            }
            assert_eq!(channel.pending(), 1, "retry must be re-queued");
        }

        // The fourth Syntax Error surfaces the failure for good
        assert_eq!(send_next(&mut channel, now), "TT=abc");
        match channel.dispatch(Some("SE"), now) {
            Dispatch::Completed(cmd) => {
                assert!(cmd.is_syntax_error());
                let reason = cmd.failure().unwrap();
                assert_eq!(reason.message(), "Syntax Error");
            }
            other => panic!("expected completed, got {:?}", other),
        }
        assert_eq!(channel.pending(), 0, "budget exhausted, no more retries");

        // Counter was reset: a fresh command gets the full budget again
        handle.submit("TT=xyz");
        send_next(&mut channel, now);
        match channel.dispatch(Some("SE"), now) {
            Dispatch::Completed(_) => {}
            other => panic!("expected completed, got {:?}", other),
        }
        assert_eq!(channel.pending(), 1);
    }

    #[test]
    fn test_liveness_retransmission_uses_timestamp() {
        let (mut channel, handle) = channel();
        let start = Instant::now();

        handle.submit("CH=1");
        assert_eq!(send_next(&mut channel, start), "CH=1");

        // Well inside the window: no retransmission yet
        let soon = start + Duration::from_millis(500);
        assert!(matches!(channel.dispatch(None, soon), Dispatch::Idle));

        // Past the window: the same text goes out again
        let late = start + Duration::from_secs(3);
        match channel.dispatch(None, late) {
            Dispatch::Transmit(text) => assert_eq!(text, "CH=1"),
            other => panic!("expected transmit, got {:?}", other),
        }
        channel.mark_sent(late);
    }

    #[test]
    fn test_liveness_gives_up_after_send_budget() {
        let config = ChannelConfig {
            max_send_attempts: 3,
            ..ChannelConfig::default()
        };
        let (mut channel, handle) = CommandChannel::new(config);
        let mut now = Instant::now();

        handle.submit("OT=10.00");
        assert_eq!(send_next(&mut channel, now), "OT=10.00");

        // Two more silent windows re-send, the third gives up
        for _ in 0..2 {
            now += Duration::from_secs(3);
            match channel.dispatch(None, now) {
                Dispatch::Transmit(text) => {
                    assert_eq!(text, "OT=10.00");
                    channel.mark_sent(now);
                }
                other => panic!("expected transmit, got {:?}", other),
            }
        }

        now += Duration::from_secs(3);
        match channel.dispatch(None, now) {
            Dispatch::Completed(cmd) => {
                assert_eq!(cmd.failure(), Some(FailureReason::Timeout));
                assert_eq!(cmd.send_attempts(), 3);
            }
            other => panic!("expected completed, got {:?}", other),
        }
        assert!(!channel.has_in_flight());
    }

    #[test]
    fn test_fifo_submission_order() {
        let (mut channel, handle) = channel();
        let now = Instant::now();

        handle.submit("TT=20.00");
        handle.submit("HW=1");

        assert_eq!(send_next(&mut channel, now), "TT=20.00");
        assert!(matches!(
            channel.dispatch(Some("TT: 20.00"), now),
            Dispatch::Completed(_)
        ));
        assert_eq!(send_next(&mut channel, now), "HW=1");
    }

    #[test]
    fn test_submit_from_another_thread() {
        let (mut channel, handle) = channel();

        let submitter = std::thread::spawn(move || {
            handle.submit("HW=1");
        });
        submitter.join().unwrap();

        let now = Instant::now();
        assert_eq!(send_next(&mut channel, now), "HW=1");
    }

    #[test]
    fn test_processed_line_is_idempotent() {
        let (mut channel, handle) = channel();
        let now = Instant::now();

        handle.submit("TT=20.50");
        send_next(&mut channel, now);
        assert!(matches!(
            channel.dispatch(Some("TT: 20.50"), now),
            Dispatch::Completed(_)
        ));

        // The same line again finds no command in flight and has no effect
        assert!(matches!(
            channel.dispatch(Some("TT: 20.50"), now),
            Dispatch::Idle
        ));
        assert!(!channel.has_in_flight());
        assert_eq!(channel.pending(), 0);
    }

    #[test]
    fn test_response_ignored_before_send() {
        let (mut channel, handle) = channel();
        let now = Instant::now();

        handle.submit("TT=20.50");
        // Queued but not yet transmitted: an echo line cannot match it
        match channel.dispatch(Some("TT: 20.50"), now) {
            // The tick instead dequeues the command for transmission
            Dispatch::Transmit(text) => assert_eq!(text, "TT=20.50"),
            other => panic!("expected transmit, got {:?}", other),
        }
    }
}
