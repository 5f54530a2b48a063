//! In-memory serial link for running the stack without a servo controller.
//!
//! [`SimServoLink`] stands in for a serial port. Clones share state, so a
//! test can keep one handle while the transport owns another.
//!
//! - **Scripted** (`SimServoLink::new`): records every written byte and
//!   answers reads from a queue filled with [`queue_response`][SimServoLink::queue_response].
//! - **Emulating** (`SimServoLink::emulating`): additionally parses the
//!   written commands and answers queries the way the real controller
//!   would, tracking each channel's last commanded pulse width.
//!
//! An empty response queue reads as [`io::ErrorKind::TimedOut`], the same
//! error a real port reports when its read timeout expires.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::protocol::{ServoProtocol, minissc, ssc32};

#[derive(Default)]
struct SimState {
    written: Vec<u8>,
    responses: VecDeque<u8>,
    emulate: Option<ServoProtocol>,
    pending: Vec<u8>,
    pulse_widths: BTreeMap<u8, u32>,
}

#[derive(Clone, Default)]
pub struct SimServoLink {
    state: Arc<Mutex<SimState>>,
}

impl SimServoLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A link that behaves like a controller speaking `protocol`.
    pub fn emulating(protocol: ServoProtocol) -> Self {
        let link = Self::default();
        link.lock().emulate = Some(protocol);
        link
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Bytes the next reads will return.
    pub fn queue_response(&self, bytes: &[u8]) {
        self.lock().responses.extend(bytes.iter().copied());
    }

    /// Everything written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Everything written so far, clearing the record.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    /// Last pulse width commanded on `channel` (emulating links only).
    pub fn pulse_width(&self, channel: u8) -> Option<u32> {
        self.lock().pulse_widths.get(&channel).copied()
    }
}

impl SimState {
    fn emulate(&mut self, buf: &[u8]) {
        let mode = self.emulate;
        match mode {
            Some(ServoProtocol::Ssc32) => {
                self.pending.extend_from_slice(buf);
                while let Some(end) = self.pending.iter().position(|b| *b == ssc32::CR) {
                    let line: Vec<u8> = self.pending.drain(..=end).collect();
                    self.run_ascii_line(&String::from_utf8_lossy(&line));
                }
            }
            Some(ServoProtocol::MiniSsc2) => {
                self.pending.extend_from_slice(buf);
                while let Some(start) = self.pending.iter().position(|b| *b == minissc::SYNC) {
                    if self.pending.len() < start + 3 {
                        break;
                    }
                    let frame: Vec<u8> = self.pending.drain(..start + 3).skip(start).collect();
                    self.pulse_widths.insert(frame[1], u32::from(frame[2]));
                }
            }
            None => {}
        }
    }

    fn run_ascii_line(&mut self, line: &str) {
        let mut channel: Option<u8> = None;
        for token in line.split_whitespace() {
            if let Some(ch) = token.strip_prefix("QP") {
                if let Ok(ch) = ch.parse::<u8>() {
                    let pw = self.pulse_widths.get(&ch).copied().unwrap_or(0);
                    self.responses.push_back((pw / 10).min(255) as u8);
                }
            } else if token == "Q" {
                self.responses.push_back(ssc32::MOVEMENT_COMPLETE);
            } else if let Some(ch) = token.strip_prefix('#') {
                channel = ch.parse().ok();
            } else if let Some(pw) = token.strip_prefix('P')
                && let (Some(ch), Ok(pw)) = (channel, pw.parse::<u32>())
            {
                self.pulse_widths.insert(ch, pw);
            }
        }
    }
}

impl io::Read for SimServoLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if state.responses.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no response queued"));
        }
        let n = buf.len().min(state.responses.len());
        for (slot, byte) in buf.iter_mut().zip(state.responses.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl io::Write for SimServoLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        state.written.extend_from_slice(buf);
        state.emulate(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn scripted_link_records_and_replays() {
        let mut link = SimServoLink::new();
        link.write_all(b"Q \r").unwrap();
        assert_eq!(link.written(), b"Q \r".to_vec());

        link.queue_response(&[b'.']);
        let mut buf = [0u8; 1];
        link.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [b'.']);
    }

    #[test]
    fn empty_queue_times_out() {
        let mut link = SimServoLink::new();
        let mut buf = [0u8; 1];
        let err = link.read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[test]
    fn ascii_emulation_answers_queries() {
        let mut link = SimServoLink::emulating(ServoProtocol::Ssc32);
        link.write_all(b"#3 P1800 S50 #4 P900 T500 \r").unwrap();
        assert_eq!(link.pulse_width(3), Some(1800));

        link.write_all(b"QP3 QP4 \r").unwrap();
        let mut buf = [0u8; 2];
        link.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [180, 90]);

        link.write_all(b"Q \r").unwrap();
        let mut status = [0u8; 1];
        link.read_exact(&mut status).unwrap();
        assert_eq!(status, [b'.']);
    }

    #[test]
    fn binary_emulation_tracks_split_frames() {
        let mut link = SimServoLink::emulating(ServoProtocol::MiniSsc2);
        link.write_all(&[0xFF, 0x05]).unwrap();
        assert_eq!(link.pulse_width(5), None);
        link.write_all(&[0xC8, 0xFF, 0x01, 0x80]).unwrap();
        assert_eq!(link.pulse_width(5), Some(200));
        assert_eq!(link.pulse_width(1), Some(128));
    }

    #[test]
    fn clones_share_state() {
        let observer = SimServoLink::new();
        let mut owner = observer.clone();
        owner.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(observer.take_written(), vec![1, 2, 3]);
        assert!(observer.written().is_empty());
    }
}
