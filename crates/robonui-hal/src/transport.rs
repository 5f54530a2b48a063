//! Serial command/response exchange with a servo controller.
//!
//! A [`ServoTransport`] owns the serial link together with the obligation to
//! return every configured channel to neutral: channels are centred right
//! after the port opens and again when the transport is dropped, on every
//! exit path.
//!
//! If the port cannot be opened the transport is **inactive**: nothing is
//! written, and queries answer with a zero-filled buffer of the expected
//! length so decoding yields a deterministic value instead of failing.

use std::io;
use std::time::{Duration, Instant};

use robonui_types::RoboNuiError;
use serialport::FlowControl;
use tracing::{debug, error, info, warn};

use crate::protocol::{ServoCommandGroup, ServoProtocol, hex};

/// Default bound on waiting for a response.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

/// A byte stream to a servo controller: a serial port or a
/// [`SimServoLink`][crate::sim::SimServoLink].
pub trait ServoLink: io::Read + io::Write + Send {}

impl<T: io::Read + io::Write + Send + ?Sized> ServoLink for T {}

pub struct ServoTransport {
    port: String,
    protocol: ServoProtocol,
    channels: Vec<u8>,
    read_timeout: Duration,
    link: Option<Box<dyn ServoLink>>,
}

impl ServoTransport {
    /// Open `port` with the protocol's baud rate and no flow control.
    ///
    /// Failure to open is logged and yields an inactive transport; it is
    /// never fatal.
    pub fn open(
        port: &str,
        protocol: ServoProtocol,
        channels: Vec<u8>,
        read_timeout: Duration,
    ) -> Self {
        let opened = serialport::new(port, protocol.baud_rate())
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open();
        match opened {
            Ok(serial) => {
                Self::with_link(port, protocol, channels, read_timeout, Box::new(serial))
            }
            Err(e) => {
                let err = RoboNuiError::TransportOpen {
                    port: port.to_string(),
                    details: e.to_string(),
                };
                error!(error = %err, "servo controller unavailable; running degraded");
                Self::inactive(port, protocol, channels)
            }
        }
    }

    /// Wrap an already-open link and centre all channels.
    pub fn with_link(
        port: &str,
        protocol: ServoProtocol,
        channels: Vec<u8>,
        read_timeout: Duration,
        link: Box<dyn ServoLink>,
    ) -> Self {
        let mut transport = Self {
            port: port.to_string(),
            protocol,
            channels,
            read_timeout,
            link: Some(link),
        };
        info!(port, %protocol, channels = transport.channels.len(), "servo transport open");
        transport.center_all();
        transport
    }

    /// A transport that never touches hardware.
    pub fn inactive(port: &str, protocol: ServoProtocol, channels: Vec<u8>) -> Self {
        Self {
            port: port.to_string(),
            protocol,
            channels,
            read_timeout: DEFAULT_READ_TIMEOUT,
            link: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.link.is_some()
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn protocol(&self) -> ServoProtocol {
        self.protocol
    }

    pub fn channels(&self) -> &[u8] {
        &self.channels
    }

    /// Write `group` and, if it expects one, read its response.
    ///
    /// - no response expected: `Some(empty)` once written
    /// - response read in full: `Some(bytes)`
    /// - timeout or I/O failure: `None` (logged)
    /// - inactive transport: `Some(zeros)` of the expected length
    pub fn send_command(&mut self, group: &dyn ServoCommandGroup) -> Option<Vec<u8>> {
        let expected = group.expected_response_length();
        if self.link.is_none() {
            debug!(
                port = %self.port,
                command = ?group.command_type(),
                "inactive transport; command dropped"
            );
            return Some(vec![0; expected]);
        }

        match self.exchange(group) {
            Ok(response) => Some(response),
            Err(e @ RoboNuiError::ProtocolTimeout { .. }) => {
                warn!(port = %self.port, error = %e, "no response from servo controller");
                None
            }
            Err(e) => {
                error!(port = %self.port, error = %e, "servo exchange failed");
                None
            }
        }
    }

    fn exchange(&mut self, group: &dyn ServoCommandGroup) -> Result<Vec<u8>, RoboNuiError> {
        let bytes = group.command_bytes();
        let expected = group.expected_response_length();
        debug!(port = %self.port, tx = %hex(&bytes), "servo write");

        let port = self.port.clone();
        let io_err = |e: io::Error| RoboNuiError::Transport {
            port: port.clone(),
            details: e.to_string(),
        };
        let Some(link) = self.link.as_mut() else {
            return Ok(vec![0; expected]);
        };
        link.write_all(&bytes).map_err(io_err)?;
        link.flush().map_err(io_err)?;

        if expected == 0 {
            return Ok(Vec::new());
        }
        let response = read_exact_within(link.as_mut(), &self.port, expected, self.read_timeout)?;
        debug!(port = %self.port, rx = %hex(&response), "servo read");
        Ok(response)
    }

    fn center_all(&mut self) {
        if self.channels.is_empty() {
            return;
        }
        let centering = self.protocol.centering(self.channels.clone());
        self.send_command(centering.as_ref());
    }
}

impl Drop for ServoTransport {
    fn drop(&mut self) {
        if self.link.is_some() {
            self.center_all();
            self.link = None;
            info!(port = %self.port, "servo transport closed");
        }
    }
}

/// Read exactly `expected` bytes, giving up once `timeout` has elapsed.
fn read_exact_within(
    link: &mut dyn ServoLink,
    port: &str,
    expected: usize,
    timeout: Duration,
) -> Result<Vec<u8>, RoboNuiError> {
    let deadline = Instant::now() + timeout;
    let mut buf = vec![0u8; expected];
    let mut filled = 0;
    while filled < expected {
        if Instant::now() >= deadline {
            return Err(RoboNuiError::ProtocolTimeout { expected });
        }
        match link.read(&mut buf[filled..]) {
            Ok(0) => return Err(RoboNuiError::ProtocolTimeout { expected }),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
                ) =>
            {
                return Err(RoboNuiError::ProtocolTimeout { expected });
            }
            Err(e) => {
                return Err(RoboNuiError::Transport {
                    port: port.to_string(),
                    details: e.to_string(),
                });
            }
        }
    }
    Ok(buf)
}
