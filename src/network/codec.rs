use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::Error;

/// Line codec for the gateway's text protocol.
///
/// Decoding yields complete lines with their terminators stripped, in
/// receipt order, leaving a trailing partial line buffered for the next
/// read. Encoding appends the single carriage return the gateway expects
/// on commands. Purely a buffering transform; it has no failure modes of
/// its own.
#[derive(Debug, Clone, Default)]
pub struct LineCodec;

impl LineCodec {
    /// Creates a new line codec
    pub fn new() -> Self {
        LineCodec
    }
}

fn is_terminator(byte: u8) -> bool {
    byte == b'\r' || byte == b'\n'
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(end) = src.iter().position(|&b| is_terminator(b)) else {
            // Partial line stays buffered
            return Ok(None);
        };

        let line = src.split_to(end);

        // Consume the whole terminator run so \r\n is one line boundary
        let run = src.iter().take_while(|&&b| is_terminator(b)).count();
        src.advance(run);

        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl Encoder<&str> for LineCodec {
    type Error = Error;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = item.trim_end_matches(['\r', '\n']);
        dst.reserve(text.len() + 1);
        dst.put_slice(text.as_bytes());
        dst.put_u8(b'\r');
        Ok(())
    }
}
