//! MAPI frame codec implementation.

use bytes::{BufMut, BytesMut};
use mapi_protocol::frame::{FRAME_HEADER_SIZE, FrameHeader, MAX_FRAME_PAYLOAD};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// A MAPI frame with header and payload.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Frame header.
    pub header: FrameHeader,
    /// Frame payload (excluding header).
    pub payload: BytesMut,
}

impl Frame {
    /// Create a new frame with the given header and payload.
    #[must_use]
    pub fn new(header: FrameHeader, payload: BytesMut) -> Self {
        Self { header, payload }
    }

    /// Check if this frame terminates its logical message.
    #[must_use]
    pub fn is_final(&self) -> bool {
        self.header.is_final
    }
}

/// MAPI frame codec for tokio-util framing.
///
/// Handles the low-level encoding and decoding of frames over a byte
/// stream; message assembly happens in [`Connection`](crate::Connection).
#[derive(Debug, Default)]
pub struct MapiCodec {
    _private: (),
}

impl MapiCodec {
    /// Create a new codec.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for MapiCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        // Peek at the header without consuming it.
        let raw = u16::from_le_bytes([src[0], src[1]]);
        let header = FrameHeader::from_raw(raw)?;
        let total = FRAME_HEADER_SIZE + header.length as usize;

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame_bytes = src.split_to(total);
        let payload = frame_bytes.split_off(FRAME_HEADER_SIZE);

        tracing::trace!(
            length = header.length,
            is_final = header.is_final,
            "decoded MAPI frame"
        );

        Ok(Some(Frame::new(header, payload)))
    }
}

impl Encoder<Frame> for MapiCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > MAX_FRAME_PAYLOAD {
            return Err(CodecError::FrameTooLarge {
                size: item.payload.len(),
                max: MAX_FRAME_PAYLOAD,
            });
        }

        dst.reserve(FRAME_HEADER_SIZE + item.payload.len());
        item.header.encode(dst);
        dst.put_slice(&item.payload);

        tracing::trace!(
            length = item.payload.len(),
            is_final = item.header.is_final,
            "encoded MAPI frame"
        );

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frame() {
        let mut codec = MapiCodec::new();

        let mut data = BytesMut::new();
        // Final frame with 4-byte payload: header (4 << 1) | 1 = 0x0009.
        data.put_u16_le((4 << 1) | 1);
        data.put_slice(b"test");

        let frame = codec.decode(&mut data).unwrap().unwrap();
        assert!(frame.is_final());
        assert_eq!(&frame.payload[..], b"test");
        assert!(data.is_empty());
    }

    #[test]
    fn test_decode_incomplete_frame() {
        let mut codec = MapiCodec::new();

        let mut data = BytesMut::new();
        data.put_u16_le((4 << 1) | 1);
        data.put_slice(b"te"); // two bytes missing

        assert!(codec.decode(&mut data).unwrap().is_none());
    }

    #[test]
    fn test_decode_empty_message_frame() {
        let mut codec = MapiCodec::new();

        let mut data = BytesMut::from(&[0x01u8, 0x00][..]);
        let frame = codec.decode(&mut data).unwrap().unwrap();
        assert!(frame.is_final());
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn test_encode_frame() {
        let mut codec = MapiCodec::new();

        let frame = Frame::new(FrameHeader::final_frame(4), BytesMut::from(&b"test"[..]));
        let mut dst = BytesMut::new();
        codec.encode(frame, &mut dst).unwrap();

        assert_eq!(&dst[..], &[0x09, 0x00, b't', b'e', b's', b't']);
    }

    #[test]
    fn test_encode_oversized_frame() {
        let mut codec = MapiCodec::new();

        let payload = BytesMut::from(vec![0u8; MAX_FRAME_PAYLOAD + 1].as_slice());
        let frame = Frame::new(FrameHeader::final_frame(0), payload);
        let mut dst = BytesMut::new();
        assert!(matches!(
            codec.encode(frame, &mut dst),
            Err(CodecError::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_decode_oversized_header() {
        let mut codec = MapiCodec::new();

        let mut data = BytesMut::new();
        data.put_u16_le((8191 << 1) | 1);
        assert!(codec.decode(&mut data).is_err());
    }
}
