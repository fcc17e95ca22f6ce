//! Message-level connection over the frame codec.
//!
//! A logical MAPI message is one or more frames, terminated by the frame
//! whose final bit is set. [`Connection`] assembles incoming frames into
//! complete messages and splits outgoing messages into maximal frames.

use bytes::{Bytes, BytesMut};
use futures_util::{SinkExt, StreamExt};
use mapi_protocol::frame::{FrameHeader, MAX_FRAME_PAYLOAD};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::error::CodecError;
use crate::frame_codec::{Frame, MapiCodec};

/// A MAPI connection carrying whole messages over an async transport.
///
/// Each connection is strictly half-duplex: the caller writes one message
/// and then reads exactly the reply the server produces for it. There is
/// no out-of-band traffic to interleave.
pub struct Connection<T> {
    inner: Framed<T, MapiCodec>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new connection over the given transport.
    pub fn new(transport: T) -> Self {
        Self {
            inner: Framed::new(transport, MapiCodec::new()),
        }
    }

    /// Read the next complete logical message.
    ///
    /// Frames are accumulated until the final frame arrives. EOF before
    /// the final frame maps to [`CodecError::ConnectionClosed`].
    pub async fn read_message(&mut self) -> Result<Bytes, CodecError> {
        let mut message = BytesMut::new();
        loop {
            match self.inner.next().await {
                Some(Ok(frame)) => {
                    message.extend_from_slice(&frame.payload);
                    if frame.is_final() {
                        tracing::trace!(len = message.len(), "received message");
                        return Ok(message.freeze());
                    }
                }
                Some(Err(e)) => return Err(e),
                None => return Err(CodecError::ConnectionClosed),
            }
        }
    }

    /// Send a complete logical message, splitting it into frames.
    ///
    /// The empty message is valid and serialises as a single empty final
    /// frame. All frames are flushed before returning.
    pub async fn send_message(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        tracing::trace!(len = payload.len(), "sending message");

        if payload.is_empty() {
            let frame = Frame::new(FrameHeader::final_frame(0), BytesMut::new());
            self.inner.feed(frame).await?;
        } else {
            let mut chunks = payload.chunks(MAX_FRAME_PAYLOAD).peekable();
            while let Some(chunk) = chunks.next() {
                let header = if chunks.peek().is_some() {
                    FrameHeader::CONTINUATION
                } else {
                    FrameHeader::final_frame(chunk.len())
                };
                self.inner.feed(Frame::new(header, BytesMut::from(chunk))).await?;
            }
        }

        self.inner.flush().await?;
        Ok(())
    }

    /// Send a control command, framed as `X<cmd>\n`.
    pub async fn send_command(&mut self, command: &str) -> Result<(), CodecError> {
        let mut payload = Vec::with_capacity(command.len() + 2);
        payload.push(b'X');
        payload.extend_from_slice(command.as_bytes());
        payload.push(b'\n');
        self.send_message(&payload).await
    }

    /// Send a SQL query, framed as `s<sql>;`.
    pub async fn send_query(&mut self, sql: &str) -> Result<(), CodecError> {
        let mut payload = Vec::with_capacity(sql.len() + 2);
        payload.push(b's');
        payload.extend_from_slice(sql.as_bytes());
        payload.push(b';');
        self.send_message(&payload).await
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &T {
        self.inner.get_ref()
    }

    /// Consume the connection and return the underlying transport.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

impl<T> std::fmt::Debug for Connection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}
