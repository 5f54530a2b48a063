//! SSC-32 ASCII framing.
//!
//! ```text
//! movement        #<ch> P<pw>[ S<speed>] ... [T<ms> ]\r
//! pulse width     QP<ch> QP<ch> ... \r        -> one byte per channel, pw/10
//! status          Q \r                        -> '.' when finished
//! ```
//!
//! Every token is followed by a single space.

use super::{ChannelTarget, ServoCommandGroup, ServoCommandType};

/// Carriage return terminating every command.
pub const CR: u8 = 0x0D;

/// Status byte meaning "all movements complete".
pub const MOVEMENT_COMPLETE: u8 = b'.';

/// Move one or more channels, optionally bounded by a group travel time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementCommand {
    targets: Vec<ChannelTarget>,
    total_time_ms: u32,
}

impl MovementCommand {
    pub fn new(targets: Vec<ChannelTarget>) -> Self {
        Self {
            targets,
            total_time_ms: 0,
        }
    }

    /// Time in ms for the whole group to arrive. `0` omits the qualifier.
    pub fn with_total_time(mut self, total_time_ms: u32) -> Self {
        self.total_time_ms = total_time_ms;
        self
    }

    pub fn targets(&self) -> &[ChannelTarget] {
        &self.targets
    }
}

impl ServoCommandGroup for MovementCommand {
    fn command_type(&self) -> ServoCommandType {
        ServoCommandType::Movement
    }

    fn command_bytes(&self) -> Vec<u8> {
        let mut line = String::new();
        for target in &self.targets {
            line.push_str(&format!("#{} P{}", target.channel, target.pulse_width));
            if target.speed > 0 {
                line.push_str(&format!(" S{}", target.speed));
            }
            line.push(' ');
        }
        if self.total_time_ms > 0 {
            line.push_str(&format!("T{} ", self.total_time_ms));
        }
        let mut bytes = line.into_bytes();
        bytes.push(CR);
        bytes
    }

    fn expected_response_length(&self) -> usize {
        0
    }
}

/// Ask for the current pulse width of each listed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPulseWidth {
    channels: Vec<u8>,
}

impl QueryPulseWidth {
    pub fn new(channels: Vec<u8>) -> Self {
        Self { channels }
    }

    pub fn channels(&self) -> &[u8] {
        &self.channels
    }
}

impl ServoCommandGroup for QueryPulseWidth {
    fn command_type(&self) -> ServoCommandType {
        ServoCommandType::QueryPulseWidth
    }

    fn command_bytes(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = self
            .channels
            .iter()
            .flat_map(|ch| format!("QP{ch} ").into_bytes())
            .collect();
        bytes.push(CR);
        bytes
    }

    fn expected_response_length(&self) -> usize {
        self.channels.len()
    }
}

/// Ask whether the previous movement has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryMovementStatus;

impl ServoCommandGroup for QueryMovementStatus {
    fn command_type(&self) -> ServoCommandType {
        ServoCommandType::QueryMovementStatus
    }

    fn command_bytes(&self) -> Vec<u8> {
        vec![b'Q', b' ', CR]
    }

    fn expected_response_length(&self) -> usize {
        1
    }
}

/// Each response byte is a pulse width divided by ten.
pub fn decode_pulse_widths(response: &[u8]) -> Vec<u32> {
    response.iter().map(|b| u32::from(*b) * 10).collect()
}

pub fn decode_movement_status(response: &[u8]) -> bool {
    response.first() == Some(&MOVEMENT_COMPLETE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_channel_without_speed() {
        let cmd = MovementCommand::new(vec![ChannelTarget::new(3, 1800)]);
        assert_eq!(cmd.command_bytes(), b"#3 P1800 \r".to_vec());
        assert_eq!(cmd.expected_response_length(), 0);
        assert_eq!(cmd.command_type(), ServoCommandType::Movement);
    }

    #[test]
    fn speed_term_only_when_nonzero() {
        let cmd = MovementCommand::new(vec![ChannelTarget::new(3, 1800).with_speed(50)]);
        assert_eq!(cmd.command_bytes(), b"#3 P1800 S50 \r".to_vec());
    }

    #[test]
    fn group_with_total_time() {
        let cmd = MovementCommand::new(vec![
            ChannelTarget::new(0, 1500),
            ChannelTarget::new(1, 1500),
        ])
        .with_total_time(1000);
        assert_eq!(cmd.command_bytes(), b"#0 P1500 #1 P1500 T1000 \r".to_vec());
    }

    #[test]
    fn pulse_width_query_framing_and_length() {
        let q = QueryPulseWidth::new(vec![3, 4]);
        assert_eq!(q.command_bytes(), b"QP3 QP4 \r".to_vec());
        assert_eq!(q.expected_response_length(), 2);
    }

    #[test]
    fn status_query_framing() {
        assert_eq!(QueryMovementStatus.command_bytes(), b"Q \r".to_vec());
        assert_eq!(QueryMovementStatus.expected_response_length(), 1);
    }

    #[test]
    fn decode_pulse_width_bytes() {
        assert_eq!(decode_pulse_widths(&[10, 20]), vec![100, 200]);
        assert_eq!(decode_pulse_widths(&[150]), vec![1500]);
    }

    #[test]
    fn decode_status_byte() {
        assert!(decode_movement_status(&[0x2E]));
        assert!(!decode_movement_status(&[0x00]));
        assert!(!decode_movement_status(&[b'+']));
        assert!(!decode_movement_status(&[]));
    }
}
