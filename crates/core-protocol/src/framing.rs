//! Wire codec: `length:u32 | type:u32 | payload:length bytes`, all
//! big-endian. An incremental decoder buffers partial reads and drains
//! every complete frame queued in the buffer on each `feed()` call.

use thiserror::Error;

const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;
const HEADER_LEN: usize = 8;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FramingError {
    #[error("frame exceeds maximum size ({0} > {MAX_FRAME_SIZE})")]
    TooLarge(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub frame_type: u32,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(frame_type: u32, payload: Vec<u8>) -> Self {
        Self { frame_type, payload }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.frame_type.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }
}

/// Incremental frame decoder handling partial reads off a stream socket.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Frame>, FramingError> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();
        loop {
            if self.buf.len() < HEADER_LEN {
                break;
            }
            let length = u32::from_be_bytes(self.buf[0..4].try_into().unwrap());
            if length > MAX_FRAME_SIZE {
                return Err(FramingError::TooLarge(length));
            }
            let total = HEADER_LEN + length as usize;
            if self.buf.len() < total {
                break;
            }
            let frame_type = u32::from_be_bytes(self.buf[4..8].try_into().unwrap());
            let payload = self.buf[HEADER_LEN..total].to_vec();
            frames.push(Frame::new(frame_type, payload));
            self.buf.drain(..total);
        }
        Ok(frames)
    }

    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_single_frame() {
        let frame = Frame::new(7, vec![1, 2, 3]);
        let mut decoder = FrameDecoder::new();
        let decoded = decoder.feed(&frame.encode()).unwrap();
        assert_eq!(decoded, vec![frame]);
        assert!(!decoder.has_partial());
    }

    #[test]
    fn feed_handles_split_header_and_payload() {
        let frame = Frame::new(2, vec![9; 10]);
        let bytes = frame.encode();
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed(&bytes[..5]).unwrap().is_empty());
        assert!(decoder.has_partial());
        let decoded = decoder.feed(&bytes[5..]).unwrap();
        assert_eq!(decoded, vec![frame]);
    }

    #[test]
    fn feed_drains_multiple_queued_frames() {
        let a = Frame::new(1, vec![1]);
        let b = Frame::new(2, vec![2, 2]);
        let mut bytes = a.encode();
        bytes.extend(b.encode());
        let mut decoder = FrameDecoder::new();
        let decoded = decoder.feed(&bytes).unwrap();
        assert_eq!(decoded, vec![a, b]);
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut decoder = FrameDecoder::new();
        let mut header = (MAX_FRAME_SIZE + 1).to_be_bytes().to_vec();
        header.extend_from_slice(&0u32.to_be_bytes());
        assert_eq!(decoder.feed(&header), Err(FramingError::TooLarge(MAX_FRAME_SIZE + 1)));
    }
}
