use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};

/// A blocking byte source/sink attached to one device.
///
/// Implementations block in `read_byte` until a byte is available and fail
/// when no more data can arrive. Channels are not shared between concurrent
/// calls; callers that need concurrent access serialize externally.
pub trait ByteChannel {
    /// Read exactly one byte.
    fn read_byte(&mut self) -> Result<u8>;

    /// Write all of `bytes`.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Flush buffered output, if the channel buffers.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: ByteChannel + ?Sized> ByteChannel for &mut T {
    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<T: ByteChannel + ?Sized> ByteChannel for Box<T> {
    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Adapts any std `Read + Write` stream to a [`ByteChannel`].
///
/// End-of-file is reported as [`TransportError::Closed`].
pub struct IoChannel<T> {
    inner: T,
}

impl<T> IoChannel<T> {
    /// Wrap a stream.
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the channel and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> ByteChannel for IoChannel<T> {
    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(_) => return Ok(byte[0]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let mut offset = 0usize;
        while offset < bytes.len() {
            match self.inner.write(&bytes[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn io_channel_reads_bytes_in_order() {
        let mut channel = IoChannel::new(Cursor::new(vec![0x01, 0x24, 0x20]));
        assert_eq!(channel.read_byte().unwrap(), 0x01);
        assert_eq!(channel.read_byte().unwrap(), 0x24);
        assert_eq!(channel.read_byte().unwrap(), 0x20);
    }

    #[test]
    fn io_channel_reports_eof_as_closed() {
        let mut channel = IoChannel::new(Cursor::new(Vec::<u8>::new()));
        let err = channel.read_byte().unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[test]
    fn io_channel_writes_everything() {
        let mut channel = IoChannel::new(Cursor::new(Vec::<u8>::new()));
        channel.write_all(b"\x01\x24").unwrap();
        channel.flush().unwrap();
        assert_eq!(channel.into_inner().into_inner(), vec![0x01, 0x24]);
    }

    #[test]
    fn interrupted_read_retries() {
        struct InterruptedOnce {
            interrupted: bool,
        }

        impl Read for InterruptedOnce {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                buf[0] = 0x16;
                Ok(1)
            }
        }

        impl Write for InterruptedOnce {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let mut channel = IoChannel::new(InterruptedOnce { interrupted: false });
        assert_eq!(channel.read_byte().unwrap(), 0x16);
    }

    #[test]
    fn mutable_reference_is_a_channel() {
        fn read_two<C: ByteChannel>(mut channel: C) -> (u8, u8) {
            (channel.read_byte().unwrap(), channel.read_byte().unwrap())
        }

        let mut channel = IoChannel::new(Cursor::new(vec![7, 8, 9]));
        assert_eq!(read_two(&mut channel), (7, 8));
        assert_eq!(channel.read_byte().unwrap(), 9);
    }
}
