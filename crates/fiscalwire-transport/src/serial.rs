use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::ByteChannel;

/// Serial line settings.
///
/// Fiscal printers of this family talk 8N1 without flow control; only the baud
/// rate and the read timeout vary between installations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Line speed. Default: 9600.
    pub baud_rate: u32,
    /// How long a single `read_byte` may block before failing with
    /// [`TransportError::TimedOut`]. Default: 2 s.
    pub timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout: Duration::from_secs(2),
        }
    }
}

/// A serial port opened through the `serialport` crate.
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
    name: String,
    timeout: Duration,
}

impl SerialChannel {
    /// Open `name` (e.g. `/dev/ttyUSB0`, `COM3`) with default settings.
    pub fn open(name: &str) -> Result<Self> {
        Self::open_with_config(name, ChannelConfig::default())
    }

    /// Open `name` with explicit settings.
    pub fn open_with_config(name: &str, config: ChannelConfig) -> Result<Self> {
        info!(port = name, baud = config.baud_rate, "opening serial port");
        let port = serialport::new(name, config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.timeout)
            .open()
            .map_err(|err| TransportError::Open {
                port: name.to_string(),
                reason: err.to_string(),
            })?;

        Ok(Self {
            port,
            name: name.to_string(),
            timeout: config.timeout,
        })
    }

    /// Open a second handle on the same port.
    ///
    /// Used to hand the sending and receiving halves of a session to separate
    /// owners.
    pub fn try_clone(&self) -> Result<Self> {
        let port = self.port.try_clone().map_err(|err| TransportError::Open {
            port: self.name.clone(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            port,
            name: self.name.clone(),
            timeout: self.timeout,
        })
    }

    /// Change the read timeout.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|err| TransportError::Io(err.into()))?;
        self.timeout = timeout;
        Ok(())
    }

    /// Port name this channel was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ByteChannel for SerialChannel {
    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read(&mut byte) {
                Ok(0) => return Err(TransportError::TimedOut(self.timeout)),
                Ok(_) => return Ok(byte[0]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => {
                    debug!(port = %self.name, "serial read timed out");
                    return Err(TransportError::TimedOut(self.timeout));
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        Write::write_all(&mut self.port, bytes).map_err(TransportError::Io)
    }

    fn flush(&mut self) -> Result<()> {
        Write::flush(&mut self.port).map_err(TransportError::Io)
    }
}

impl std::fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialChannel")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Names of the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<String>> {
    let ports =
        serialport::available_ports().map_err(|err| TransportError::Enumerate(err.to_string()))?;
    Ok(ports.into_iter().map(|port| port.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_9600_with_timeout() {
        let config = ChannelConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout, Duration::from_secs(2));
    }

    #[test]
    fn opening_missing_port_reports_name() {
        let err = SerialChannel::open("/dev/fiscalwire-does-not-exist").unwrap_err();
        match err {
            TransportError::Open { port, .. } => {
                assert_eq!(port, "/dev/fiscalwire-does-not-exist")
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
