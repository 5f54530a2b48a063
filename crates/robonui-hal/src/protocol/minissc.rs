//! Mini-SSC II binary framing: `[0xFF, channel, position]` per channel.
//! The controller never answers.

use super::{ChannelTarget, ServoCommandGroup, ServoCommandType};

pub const SYNC: u8 = 0xFF;

/// Largest position byte; `0xFF` would be read as a sync byte.
pub const MAX_POSITION: u8 = 254;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementCommand {
    targets: Vec<ChannelTarget>,
}

impl MovementCommand {
    /// Speeds are ignored; the protocol has no speed control.
    pub fn new(targets: Vec<ChannelTarget>) -> Self {
        Self { targets }
    }
}

impl ServoCommandGroup for MovementCommand {
    fn command_type(&self) -> ServoCommandType {
        ServoCommandType::Movement
    }

    fn command_bytes(&self) -> Vec<u8> {
        self.targets
            .iter()
            .flat_map(|t| {
                let position = t.pulse_width.min(u32::from(MAX_POSITION)) as u8;
                [SYNC, t.channel, position]
            })
            .collect()
    }

    fn expected_response_length(&self) -> usize {
        0
    }
}
