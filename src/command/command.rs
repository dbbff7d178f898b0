use std::time::Instant;

/// The gateway's fixed error response vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NoGood,
    SyntaxError,
    BadValue,
    OutOfRange,
    NoSpace,
    NotFound,
    Overrun,
}

impl ErrorCode {
    /// Matches a response line against the known two-letter error codes
    pub fn from_line(line: &str) -> Option<Self> {
        match line.trim() {
            "NG" => Some(ErrorCode::NoGood),
            "SE" => Some(ErrorCode::SyntaxError),
            "BV" => Some(ErrorCode::BadValue),
            "OR" => Some(ErrorCode::OutOfRange),
            "NS" => Some(ErrorCode::NoSpace),
            "NF" => Some(ErrorCode::NotFound),
            "OE" => Some(ErrorCode::Overrun),
            _ => None,
        }
    }

    /// The two-letter wire code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCode::NoGood => "NG",
            ErrorCode::SyntaxError => "SE",
            ErrorCode::BadValue => "BV",
            ErrorCode::OutOfRange => "OR",
            ErrorCode::NoSpace => "NS",
            ErrorCode::NotFound => "NF",
            ErrorCode::Overrun => "OE",
        }
    }

    /// Human-readable message for the code
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::NoGood => "No Good",
            ErrorCode::SyntaxError => "Syntax Error",
            ErrorCode::BadValue => "Bad Value",
            ErrorCode::OutOfRange => "Out of Range",
            ErrorCode::NoSpace => "No Space",
            ErrorCode::NotFound => "Not Found",
            ErrorCode::Overrun => "Overrun Error",
        }
    }
}

/// Why a command failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// The gateway answered with an error code
    Code(ErrorCode),
    /// No response arrived within the retransmission budget
    Timeout,
}

impl FailureReason {
    /// Human-readable failure message
    pub fn message(&self) -> &'static str {
        match self {
            FailureReason::Code(code) => code.message(),
            FailureReason::Timeout => "No Response",
        }
    }
}

/// Lifecycle state of an outbound command
#[derive(Debug, Clone, PartialEq)]
pub enum CommandState {
    /// Waiting in the queue or for (re)transmission
    Queued,
    /// Written to the transport, awaiting the gateway's response
    Sent {
        /// When the command was written
        at: Instant,
    },
    /// Matched its echo line; the command succeeded
    Acknowledged {
        /// The full response line
        result: String,
    },
    /// The gateway rejected the command or never answered
    Failed {
        /// Classification of the failure
        reason: FailureReason,
    },
}

/// An outbound instruction for the gateway
#[derive(Debug, Clone)]
pub struct Command {
    text: String,
    keyword: String,
    state: CommandState,
    send_attempts: u32,
}

impl Command {
    /// Creates a queued command from its literal text.
    ///
    /// The keyword is the substring before the `=` delimiter and is what
    /// the gateway echoes back on success.
    pub fn new(text: &str) -> Self {
        let text = text.trim_end_matches(['\r', '\n']).to_string();
        let keyword = text
            .split('=')
            .next()
            .unwrap_or_default()
            .to_string();
        Command {
            text,
            keyword,
            state: CommandState::Queued,
            send_attempts: 0,
        }
    }

    /// The literal command text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The keyword the response echo is matched on
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Current lifecycle state
    pub fn state(&self) -> &CommandState {
        &self.state
    }

    /// How many times this command has been written to the transport
    pub fn send_attempts(&self) -> u32 {
        self.send_attempts
    }

    /// Whether the command is on the wire awaiting a response
    pub fn is_sent(&self) -> bool {
        matches!(self.state, CommandState::Sent { .. })
    }

    /// Whether the command reached a terminal state
    pub fn is_processed(&self) -> bool {
        matches!(
            self.state,
            CommandState::Acknowledged { .. } | CommandState::Failed { .. }
        )
    }

    /// Whether the command was acknowledged
    pub fn is_success(&self) -> bool {
        matches!(self.state, CommandState::Acknowledged { .. })
    }

    /// The acknowledgement line, once acknowledged
    pub fn result(&self) -> Option<&str> {
        match &self.state {
            CommandState::Acknowledged { result } => Some(result),
            _ => None,
        }
    }

    /// The failure reason, once failed
    pub fn failure(&self) -> Option<FailureReason> {
        match &self.state {
            CommandState::Failed { reason } => Some(*reason),
            _ => None,
        }
    }

    /// Whether this command failed with a Syntax Error response
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self.state,
            CommandState::Failed {
                reason: FailureReason::Code(ErrorCode::SyntaxError),
            }
        )
    }

    /// Whether a response line is this command's acknowledgement echo
    pub fn matches_ack(&self, line: &str) -> bool {
        line.strip_prefix(self.keyword.as_str())
            .map_or(false, |rest| rest.starts_with(':'))
    }

    pub(crate) fn mark_sent(&mut self, at: Instant) {
        self.state = CommandState::Sent { at };
        self.send_attempts += 1;
    }

    pub(crate) fn reset_for_resend(&mut self) {
        self.state = CommandState::Queued;
    }

    pub(crate) fn acknowledge(&mut self, result: String) {
        self.state = CommandState::Acknowledged { result };
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        self.state = CommandState::Failed { reason };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_derivation() {
        let cmd = Command::new("TT=20.50");
        assert_eq!(cmd.text(), "TT=20.50");
        assert_eq!(cmd.keyword(), "TT");

        let cmd = Command::new("PR=A\r");
        assert_eq!(cmd.text(), "PR=A");
        assert_eq!(cmd.keyword(), "PR");
    }

    #[test]
    fn test_ack_matching() {
        let cmd = Command::new("TT=20.50");
        assert!(cmd.matches_ack("TT: 20.50"));
        assert!(cmd.matches_ack("TT:"));
        assert!(!cmd.matches_ack("TC: 20.50"));
        assert!(!cmd.matches_ack("TT 20.50"));
        // Keyword prefix alone is not enough without the colon
        assert!(!cmd.matches_ack("TTX: 20.50"));
    }

    #[test]
    fn test_error_code_vocabulary() {
        assert_eq!(ErrorCode::from_line("SE"), Some(ErrorCode::SyntaxError));
        assert_eq!(ErrorCode::from_line("SE\r"), Some(ErrorCode::SyntaxError));
        assert_eq!(ErrorCode::from_line("XX"), None);
        assert_eq!(ErrorCode::from_line("SE extra"), None);
        assert_eq!(ErrorCode::SyntaxError.message(), "Syntax Error");
        assert_eq!(ErrorCode::Overrun.message(), "Overrun Error");
        assert_eq!(FailureReason::Timeout.message(), "No Response");
    }

    #[test]
    fn test_lifecycle() {
        let mut cmd = Command::new("HW=1");
        assert!(matches!(cmd.state(), CommandState::Queued));
        assert!(!cmd.is_processed());

        cmd.mark_sent(Instant::now());
        assert!(cmd.is_sent());
        assert_eq!(cmd.send_attempts(), 1);

        cmd.acknowledge("HW: 1".to_string());
        assert!(cmd.is_processed());
        assert!(cmd.is_success());
        assert_eq!(cmd.result(), Some("HW: 1"));
    }
}
