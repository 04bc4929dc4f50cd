//! Newline framing for the inbound byte stream.
//!
//! The host writes one JSON object per line, terminated by a single `\n`.
//! [`FrameBuffer`] accumulates whatever the socket hands back and splits off
//! every complete line, keeping the unterminated tail for the next read.

use crate::error::ProtocolError;

const DELIMITER: u8 = b'\n';

/// One complete line, without its delimiter.
pub type Frame = Vec<u8>;

/// Accumulator that turns arbitrary byte chunks into complete frames.
///
/// The buffer is unbounded unless a limit is supplied with
/// [`FrameBuffer::with_limit`]; without one a peer that never sends `\n` can
/// grow it indefinitely.
#[derive(Debug, Default, Clone)]
pub struct FrameBuffer {
    pending: Vec<u8>,
    limit: Option<usize>,
}

impl FrameBuffer {
    /// Creates an unbounded buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
            limit: None,
        }
    }

    /// Creates a buffer that rejects unterminated tails longer than `limit`.
    #[must_use]
    pub const fn with_limit(limit: Option<usize>) -> Self {
        Self {
            pending: Vec::new(),
            limit,
        }
    }

    /// Appends `bytes` and returns every frame completed by them, in order.
    ///
    /// Bytes after the last delimiter stay buffered. An empty slice yields no
    /// frames and leaves the buffer untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::FrameTooLarge`] when a limit is configured and
    /// the remaining unterminated tail exceeds it.
    pub fn extend(&mut self, bytes: &[u8]) -> Result<Vec<Frame>, ProtocolError> {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        self.pending.extend_from_slice(bytes);

        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self
            .pending
            .get(start..)
            .and_then(|tail| tail.iter().position(|byte| *byte == DELIMITER))
        {
            let end = start + offset;
            if let Some(line) = self.pending.get(start..end) {
                frames.push(line.to_vec());
            }
            start = end + 1;
        }
        self.pending.drain(..start);

        if let Some(limit) = self.limit
            && self.pending.len() > limit
        {
            return Err(ProtocolError::FrameTooLarge {
                pending: self.pending.len(),
                limit,
            });
        }
        Ok(frames)
    }

    /// Bytes buffered after the last complete frame.
    #[must_use]
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const STREAM: &[u8] = b"{\"type\":\"info\"}\n{\"type\":\"action\",\"actionId\":\"a\"}\n{\"type\":\"bro";

    fn expected_frames() -> Vec<Frame> {
        vec![
            b"{\"type\":\"info\"}".to_vec(),
            b"{\"type\":\"action\",\"actionId\":\"a\"}".to_vec(),
        ]
    }

    #[rstest]
    #[case::whole(STREAM.len())]
    #[case::single_bytes(1)]
    #[case::odd_chunks(7)]
    #[case::split_on_delimiter(15)]
    fn chunking_does_not_change_frames(#[case] chunk_size: usize) {
        let mut buffer = FrameBuffer::new();
        let mut frames = Vec::new();
        for chunk in STREAM.chunks(chunk_size) {
            frames.extend(buffer.extend(chunk).expect("unbounded buffer"));
        }
        assert_eq!(frames, expected_frames());
        assert_eq!(buffer.pending(), b"{\"type\":\"bro");
    }

    #[test]
    fn empty_chunk_keeps_partial_data() {
        let mut buffer = FrameBuffer::new();
        buffer.extend(b"{\"ty").expect("partial");
        let frames = buffer.extend(b"").expect("empty chunk");
        assert!(frames.is_empty());
        assert_eq!(buffer.pending(), b"{\"ty");
    }

    #[test]
    fn consecutive_delimiters_yield_empty_frames() {
        let mut buffer = FrameBuffer::new();
        let frames = buffer.extend(b"\n\n").expect("frames");
        assert_eq!(frames, vec![Vec::<u8>::new(), Vec::<u8>::new()]);
        assert!(buffer.pending().is_empty());
    }

    #[test]
    fn limit_applies_to_unterminated_tail_only() {
        let mut buffer = FrameBuffer::with_limit(Some(8));
        let frames = buffer
            .extend(b"0123456789abcdef\nabc")
            .expect("long but terminated frame is accepted");
        assert_eq!(frames.len(), 1);

        let error = buffer.extend(b"defghij").expect_err("tail too long");
        assert!(matches!(
            error,
            ProtocolError::FrameTooLarge {
                pending: 10,
                limit: 8
            }
        ));
    }
}
