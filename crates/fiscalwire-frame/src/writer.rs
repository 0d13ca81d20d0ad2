use bytes::BytesMut;
use fiscalwire_transport::ByteChannel;
use tracing::trace;

use crate::codec::{encode_frame, Frame, FrameHeader};
use crate::error::Result;
use crate::status::DeviceStatus;
use crate::wire::MAX_FRAME_SIZE;

/// Writes complete frames to a [`ByteChannel`].
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: ByteChannel> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(MAX_FRAME_SIZE),
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_parts(frame.header(), frame.payload.as_ref(), frame.status.as_ref())
    }

    /// Encode and send a host request.
    pub fn send(&mut self, header: FrameHeader, payload: &[u8]) -> Result<()> {
        self.write_parts(header, payload, None)
    }

    fn write_parts(
        &mut self,
        header: FrameHeader,
        payload: &[u8],
        status: Option<&DeviceStatus>,
    ) -> Result<()> {
        self.buf.clear();
        encode_frame(header, payload, status, &mut self.buf)?;
        trace!(bytes = ?&self.buf[..], "tx frame");
        self.inner.write_all(&self.buf)?;
        self.flush()
    }

    /// Flush the underlying channel.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Borrow the underlying channel.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying channel.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner channel.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
