//! Length-prefixed framing.
//!
//! ```text
//! +-------------+----------------+------------------+
//! | len: u32 BE | version: u16 BE| body (len-2 B)   |
//! +-------------+----------------+------------------+
//! ```
//!
//! `len` covers the version field and the body. Streams may split or merge
//! frames arbitrarily; [`FrameDecoder`] reassembles them.

use crate::error::{ProtocolError, ProtocolResult};
use bytes::{Buf, BufMut, BytesMut};

/// Current framing version.
pub const FRAME_VERSION: u16 = 1;

const LEN_BYTES: usize = 4;
const VERSION_BYTES: usize = 2;

/// Wraps `body` in a frame.
///
/// # Errors
///
/// Returns [`ProtocolError::FrameTooLarge`] if the body does not fit the
/// length field.
pub fn encode_frame(body: &[u8]) -> ProtocolResult<Vec<u8>> {
    let len = u32::try_from(body.len() + VERSION_BYTES)
        .map_err(|_| ProtocolError::FrameTooLarge(body.len()))?;
    let mut out = Vec::with_capacity(LEN_BYTES + VERSION_BYTES + body.len());
    out.put_u32(len);
    out.put_u16(FRAME_VERSION);
    out.extend_from_slice(body);
    Ok(out)
}

fn checked_body_len(len: u32) -> ProtocolResult<usize> {
    if (len as usize) < VERSION_BYTES {
        return Err(ProtocolError::FrameTooShort(len));
    }
    Ok(len as usize - VERSION_BYTES)
}

fn check_version(version: u16) -> ProtocolResult<()> {
    if version != FRAME_VERSION {
        return Err(ProtocolError::UnsupportedVersion(version));
    }
    Ok(())
}

/// Incremental frame reassembly over arbitrary fragments.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Takes the next complete frame body, if one is buffered.
    ///
    /// # Errors
    ///
    /// A malformed header is an error; the stream cannot be resynchronised
    /// afterwards.
    pub fn next_frame(&mut self) -> ProtocolResult<Option<Vec<u8>>> {
        if self.buffer.len() < LEN_BYTES + VERSION_BYTES {
            return Ok(None);
        }
        let len = u32::from_be_bytes([
            self.buffer[0],
            self.buffer[1],
            self.buffer[2],
            self.buffer[3],
        ]);
        let body_len = checked_body_len(len)?;
        check_version(u16::from_be_bytes([self.buffer[4], self.buffer[5]]))?;

        if self.buffer.len() < LEN_BYTES + VERSION_BYTES + body_len {
            return Ok(None);
        }
        self.buffer.advance(LEN_BYTES + VERSION_BYTES);
        Ok(Some(self.buffer.split_to(body_len).to_vec()))
    }

    /// Number of bytes waiting for the rest of their frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Fails if a partial frame is still buffered; call at end of stream.
    pub fn finish(&self) -> ProtocolResult<()> {
        if self.buffer.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::TruncatedFrame {
                buffered: self.buffer.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_layout() {
        let frame = encode_frame(b"abc").unwrap();
        assert_eq!(&frame[..4], &5u32.to_be_bytes());
        assert_eq!(&frame[4..6], &1u16.to_be_bytes());
        assert_eq!(&frame[6..], b"abc");
    }

    #[test]
    fn decoder_waits_for_whole_frame() {
        let frame = encode_frame(b"hello").unwrap();
        let mut decoder = FrameDecoder::new();
        decoder.push(&frame[..3]);
        assert!(decoder.next_frame().unwrap().is_none());
        decoder.push(&frame[3..9]);
        assert!(decoder.next_frame().unwrap().is_none());
        decoder.push(&frame[9..]);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"hello");
        assert_eq!(decoder.buffered(), 0);
        decoder.finish().unwrap();
    }

    #[test]
    fn decoder_splits_merged_frames() {
        let mut bytes = encode_frame(b"one").unwrap();
        bytes.extend(encode_frame(b"two").unwrap());
        let mut decoder = FrameDecoder::new();
        decoder.push(&bytes);
        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"one");
        assert_eq!(decoder.next_frame().unwrap().unwrap(), b"two");
        assert!(decoder.next_frame().unwrap().is_none());
    }

    #[test]
    fn bad_headers_rejected() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0, 0, 0, 1, 0, 1]);
        assert!(matches!(
            decoder.next_frame(),
            Err(ProtocolError::FrameTooShort(1))
        ));

        let mut decoder = FrameDecoder::new();
        decoder.push(&[0, 0, 0, 2, 0, 9]);
        assert!(matches!(
            decoder.next_frame(),
            Err(ProtocolError::UnsupportedVersion(9))
        ));
    }

    #[test]
    fn partial_frame_at_finish() {
        let mut decoder = FrameDecoder::new();
        decoder.push(&[0, 0]);
        assert!(matches!(
            decoder.finish(),
            Err(ProtocolError::TruncatedFrame { buffered: 2 })
        ));
    }
}
