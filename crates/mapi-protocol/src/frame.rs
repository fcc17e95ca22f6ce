//! MAPI frame header.
//!
//! A logical message is the concatenation of one or more frame payloads,
//! terminated by the frame whose final bit is set. The header is a 16-bit
//! little-endian word: bit 0 is the final flag, bits 1-15 the payload
//! length.

use bytes::{Buf, BufMut};

use crate::error::ProtocolError;

/// Size of a frame header on the wire.
pub const FRAME_HEADER_SIZE: usize = 2;

/// Maximum frame payload length.
pub const MAX_FRAME_PAYLOAD: usize = 8190;

/// Header of a single MAPI frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length in bytes (at most [`MAX_FRAME_PAYLOAD`]).
    pub length: u16,
    /// Whether this frame terminates the logical message.
    pub is_final: bool,
}

impl FrameHeader {
    /// Header for a non-final frame, which always carries a full payload.
    ///
    /// Derived from [`MAX_FRAME_PAYLOAD`] rather than hard-coded so the
    /// two cannot drift apart.
    pub const CONTINUATION: Self = Self {
        length: MAX_FRAME_PAYLOAD as u16,
        is_final: false,
    };

    /// Header for the final frame of a message.
    #[must_use]
    pub fn final_frame(length: usize) -> Self {
        debug_assert!(length <= MAX_FRAME_PAYLOAD);
        Self {
            length: length as u16,
            is_final: true,
        }
    }

    /// The raw 16-bit header word: `(length << 1) | fin`.
    #[must_use]
    pub const fn raw(&self) -> u16 {
        (self.length << 1) | self.is_final as u16
    }

    /// Decode a header from its raw 16-bit word.
    pub fn from_raw(raw: u16) -> Result<Self, ProtocolError> {
        let length = raw >> 1;
        if length as usize > MAX_FRAME_PAYLOAD {
            return Err(ProtocolError::FrameTooLarge(length as usize));
        }
        Ok(Self {
            length,
            is_final: raw & 1 == 1,
        })
    }

    /// Read a header from a buffer.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < FRAME_HEADER_SIZE {
            return Err(ProtocolError::TruncatedHeader);
        }
        Self::from_raw(src.get_u16_le())
    }

    /// Write the header to a buffer.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16_le(self.raw());
    }
}
