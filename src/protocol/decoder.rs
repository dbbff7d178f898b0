use tracing::debug;

use super::frame::FieldLine;
use super::message::Message;

/// Outcome of feeding one line to the decoder
#[derive(Debug)]
pub enum Decoded {
    /// A completed message was flushed by this line
    Emitted(Message),
    /// The line was absorbed into the message under assembly
    Consumed,
    /// The line does not match the protocol grammar and was not consumed
    Unparsed,
}

/// Reassembles consecutive protocol lines into messages.
///
/// Holds the single message under assembly; only the worker loop may call
/// `decode`, there is no internal locking.
#[derive(Debug, Default)]
pub struct ProtocolDecoder {
    current: Message,
}

impl ProtocolDecoder {
    /// Creates a new decoder with an empty message under assembly
    pub fn new() -> Self {
        ProtocolDecoder::default()
    }

    /// Feeds one line into the decoder.
    ///
    /// A line with a new data id flushes the message under assembly and
    /// seeds its replacement. The flushed message is emitted only when its
    /// thermostat request is present; a fragment assembled from a stream
    /// joined mid-frame is dropped silently.
    pub fn decode(&mut self, line: &str) -> Decoded {
        let field = match FieldLine::parse(line) {
            Ok(field) => field,
            Err(_) => return Decoded::Unparsed,
        };

        if let Some(data_id) = self.current.data_id() {
            if data_id != field.data_id {
                let ready = std::mem::take(&mut self.current);
                self.current.attach(field);
                if ready.has_thermostat_request() {
                    return Decoded::Emitted(ready);
                }
                debug!(data_id, "discarding partial message without thermostat request");
                return Decoded::Consumed;
            }
        }

        self.current.attach(field);
        Decoded::Consumed
    }
}
