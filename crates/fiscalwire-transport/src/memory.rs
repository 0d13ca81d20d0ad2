use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

#[derive(Debug, Default)]
struct Shared {
    input: VecDeque<u8>,
    written: Vec<u8>,
}

/// In-memory channel with scripted input and captured output.
///
/// Clones share the same script and capture buffer, so one clone can be handed
/// to the sending side and another to the receiving side of a session while the
/// test keeps a third to inspect what was written. Reading past the end of the
/// script fails with [`TransportError::Exhausted`].
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a channel whose reads return `input` in order.
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        let channel = Self::new();
        channel.push_input(input);
        channel
    }

    /// Append bytes to the read script.
    pub fn push_input(&self, input: impl AsRef<[u8]>) {
        self.lock().input.extend(input.as_ref().iter().copied());
    }

    /// Number of scripted bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.lock().input.len()
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Take everything written so far, clearing the capture buffer.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ByteChannel for MemoryChannel {
    fn read_byte(&mut self) -> Result<u8> {
        self.lock().input.pop_front().ok_or(TransportError::Exhausted)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.lock().written.extend_from_slice(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_script_then_exhausts() {
        let mut channel = MemoryChannel::with_input([0x16, 0x01]);
        assert_eq!(channel.read_byte().unwrap(), 0x16);
        assert_eq!(channel.read_byte().unwrap(), 0x01);
        assert!(matches!(
            channel.read_byte().unwrap_err(),
            TransportError::Exhausted
        ));
    }

    #[test]
    fn clones_share_script_and_capture() {
        let probe = MemoryChannel::with_input([1, 2, 3]);
        let mut sender = probe.clone();
        let mut receiver = probe.clone();

        sender.write_all(b"frame").unwrap();
        assert_eq!(receiver.read_byte().unwrap(), 1);

        assert_eq!(probe.written(), b"frame");
        assert_eq!(probe.remaining(), 2);
    }

    #[test]
    fn take_written_clears_capture() {
        let mut channel = MemoryChannel::new();
        channel.write_all(&[0xAA]).unwrap();
        assert_eq!(channel.take_written(), vec![0xAA]);
        assert!(channel.written().is_empty());
    }

    #[test]
    fn push_input_appends() {
        let mut channel = MemoryChannel::with_input([1]);
        channel.push_input([2]);
        assert_eq!(channel.read_byte().unwrap(), 1);
        assert_eq!(channel.read_byte().unwrap(), 2);
    }
}
