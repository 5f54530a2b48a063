//! Servo-controller wire protocols.
//!
//! Every physical message is a [`ServoCommandGroup`]: a command type, an
//! ordered list of per-channel sub-commands and the number of response bytes
//! the controller will send back. The two supported framings live in
//! [`ssc32`] (ASCII, multi-channel, with queries) and [`minissc`] (3-byte
//! binary frames, write-only). New command types are added by implementing
//! the trait, not by extending a shared type.
//!
//! [`ServoProtocol`] selects a framing at run time and builds the command
//! groups the rest of the stack needs.

pub mod minissc;
pub mod ssc32;

use std::fmt;

use robonui_types::{PulseWidthConstants, RoboNuiError};
use serde::{Deserialize, Serialize};

/// Highest addressable servo channel.
pub const MAX_CHANNEL: u8 = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoCommandType {
    Movement,
    QueryPulseWidth,
    QueryMovementStatus,
}

/// One framed message for a servo controller.
pub trait ServoCommandGroup: fmt::Debug + Send {
    fn command_type(&self) -> ServoCommandType;

    /// The exact bytes to write to the wire.
    fn command_bytes(&self) -> Vec<u8>;

    /// Number of bytes the controller answers with; `0` when it does not
    /// answer.
    fn expected_response_length(&self) -> usize;
}

/// Target for one channel within a movement command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTarget {
    pub channel: u8,
    pub pulse_width: u32,
    /// Per-channel speed limit in µs/s. `0` means unlimited.
    pub speed: u32,
}

impl ChannelTarget {
    pub fn new(channel: u8, pulse_width: u32) -> Self {
        Self {
            channel,
            pulse_width,
            speed: 0,
        }
    }

    pub fn with_speed(mut self, speed: u32) -> Self {
        self.speed = speed;
        self
    }
}

/// The physical protocol spoken on a serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServoProtocol {
    /// Lynxmotion SSC-32 ASCII protocol.
    #[default]
    Ssc32,
    /// Mini-SSC II binary protocol.
    #[serde(rename = "mini_ssc2")]
    MiniSsc2,
}

impl ServoProtocol {
    pub fn baud_rate(self) -> u32 {
        match self {
            ServoProtocol::Ssc32 => 115_200,
            ServoProtocol::MiniSsc2 => 9_600,
        }
    }

    pub fn constants(self) -> PulseWidthConstants {
        match self {
            ServoProtocol::Ssc32 => PulseWidthConstants::SSC32,
            ServoProtocol::MiniSsc2 => PulseWidthConstants::MINI_SSC2,
        }
    }

    /// Whether the controller answers pulse-width and status queries.
    pub fn supports_queries(self) -> bool {
        matches!(self, ServoProtocol::Ssc32)
    }

    pub fn movement(self, targets: Vec<ChannelTarget>) -> Box<dyn ServoCommandGroup> {
        match self {
            ServoProtocol::Ssc32 => Box::new(ssc32::MovementCommand::new(targets)),
            ServoProtocol::MiniSsc2 => Box::new(minissc::MovementCommand::new(targets)),
        }
    }

    /// Drive every listed channel to the neutral pulse width.
    pub fn centering(self, channels: impl IntoIterator<Item = u8>) -> Box<dyn ServoCommandGroup> {
        let center = self.constants().center;
        self.movement(
            channels
                .into_iter()
                .map(|channel| ChannelTarget::new(channel, center))
                .collect(),
        )
    }

    pub fn query_pulse_widths(
        self,
        channels: Vec<u8>,
    ) -> Result<Box<dyn ServoCommandGroup>, RoboNuiError> {
        match self {
            ServoProtocol::Ssc32 => Ok(Box::new(ssc32::QueryPulseWidth::new(channels))),
            ServoProtocol::MiniSsc2 => Err(self.unsupported("pulse-width query")),
        }
    }

    pub fn query_movement_status(self) -> Result<Box<dyn ServoCommandGroup>, RoboNuiError> {
        match self {
            ServoProtocol::Ssc32 => Ok(Box::new(ssc32::QueryMovementStatus)),
            ServoProtocol::MiniSsc2 => Err(self.unsupported("movement-status query")),
        }
    }

    fn unsupported(self, operation: &str) -> RoboNuiError {
        RoboNuiError::Unsupported {
            operation: operation.to_string(),
            target: self.to_string(),
        }
    }
}

impl fmt::Display for ServoProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServoProtocol::Ssc32 => write!(f, "ssc32"),
            ServoProtocol::MiniSsc2 => write!(f, "mini_ssc2"),
        }
    }
}

/// Lowercase hex rendering for wire-level debug logs.
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}
