//! Protocol-generic servo controller.
//!
//! One [`ServoController`] type drives either robot: it is parameterised by
//! the robot kind, the channel map, a default per-channel speed and a
//! [`TransportHandle`] whose protocol decides the framing. As a
//! [`Consumer<AngleSet>`] it converts every received angle set into a
//! movement command and hands it to the transport worker without blocking.

use std::collections::{BTreeMap, BTreeSet};

use robonui_middleware::Consumer;
use robonui_types::{AngleSet, RoboNuiError, RoboticAngle, ServoControllerKind};
use tracing::{debug, trace, warn};

use crate::protocol::{ChannelTarget, MAX_CHANNEL, ssc32};
use crate::worker::TransportHandle;

/// Check that `channels` is a usable bijection for `kind`: non-empty, every
/// angle belongs to `kind`'s robot, every channel is in range and unique.
pub fn validate_channel_map(
    kind: ServoControllerKind,
    channels: &BTreeMap<RoboticAngle, u8>,
) -> Result<(), RoboNuiError> {
    if channels.is_empty() {
        return Err(RoboNuiError::Configuration(format!(
            "{kind} controller has an empty channel map"
        )));
    }
    let mut seen = BTreeSet::new();
    for (angle, channel) in channels {
        if angle.robot() != kind {
            return Err(RoboNuiError::Configuration(format!(
                "{angle} belongs to the {} robot, not the {kind}",
                angle.robot()
            )));
        }
        if *channel > MAX_CHANNEL {
            return Err(RoboNuiError::Configuration(format!(
                "{kind} channel {channel} for {angle} is outside 0-{MAX_CHANNEL}"
            )));
        }
        if !seen.insert(*channel) {
            return Err(RoboNuiError::Configuration(format!(
                "{kind} channel {channel} is mapped more than once"
            )));
        }
    }
    Ok(())
}

pub struct ServoController {
    kind: ServoControllerKind,
    channels: BTreeMap<RoboticAngle, u8>,
    speed: u32,
    transport: TransportHandle,
}

impl ServoController {
    /// # Errors
    ///
    /// [`RoboNuiError::Configuration`] if the channel map is not valid for
    /// `kind`.
    pub fn new(
        kind: ServoControllerKind,
        channels: BTreeMap<RoboticAngle, u8>,
        speed: u32,
        transport: TransportHandle,
    ) -> Result<Self, RoboNuiError> {
        validate_channel_map(kind, &channels)?;
        Ok(Self {
            kind,
            channels,
            speed,
            transport,
        })
    }

    pub fn kind(&self) -> ServoControllerKind {
        self.kind
    }

    pub fn channels(&self) -> &BTreeMap<RoboticAngle, u8> {
        &self.channels
    }

    pub fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    fn channel_of(&self, angle: RoboticAngle) -> Result<u8, RoboNuiError> {
        self.channels
            .get(&angle)
            .copied()
            .ok_or(RoboNuiError::UnmappedAngle {
                angle,
                controller: self.kind,
            })
    }

    /// Queue a movement to `angles`.
    ///
    /// Angles of this robot without a channel are skipped. An angle of the
    /// other robot rejects the whole set.
    pub fn move_to(&self, angles: &AngleSet) -> Result<(), RoboNuiError> {
        let protocol = self.transport.protocol();
        let constants = protocol.constants();
        let mut targets = Vec::with_capacity(angles.len());
        for (angle, radians) in angles.iter() {
            if angle.robot() != self.kind {
                return Err(RoboNuiError::UnmappedAngle {
                    angle,
                    controller: self.kind,
                });
            }
            match self.channels.get(&angle) {
                Some(channel) => targets.push(
                    ChannelTarget::new(*channel, constants.angle_to_pulse_width(radians))
                        .with_speed(self.speed),
                ),
                None => trace!(%angle, controller = %self.kind, "no channel; angle skipped"),
            }
        }
        if targets.is_empty() {
            return Ok(());
        }
        self.transport.submit(protocol.movement(targets));
        Ok(())
    }

    /// Current positions of `angles`, read back from the controller.
    ///
    /// `Ok(None)` when the controller did not answer in time.
    ///
    /// # Errors
    ///
    /// [`RoboNuiError::Unsupported`] on protocols without queries,
    /// [`RoboNuiError::UnmappedAngle`] for an angle without a channel.
    pub fn positions(&self, angles: &[RoboticAngle]) -> Result<Option<AngleSet>, RoboNuiError> {
        let protocol = self.transport.protocol();
        let channels = angles
            .iter()
            .map(|angle| self.channel_of(*angle))
            .collect::<Result<Vec<_>, _>>()?;
        let query = protocol.query_pulse_widths(channels)?;

        let Some(response) = self.transport.request(query) else {
            warn!(controller = %self.kind, "pulse-width query unanswered");
            return Ok(None);
        };
        let widths = ssc32::decode_pulse_widths(&response);
        debug!(controller = %self.kind, ?widths, "pulse widths read");
        Ok(Some(AngleSet::from_pulse_widths(
            angles.iter().copied().zip(widths),
            &protocol.constants(),
        )))
    }

    /// Whether the last movement has finished. `Ok(None)` on timeout.
    pub fn is_movement_finished(&self) -> Result<Option<bool>, RoboNuiError> {
        let query = self.transport.protocol().query_movement_status()?;
        Ok(self
            .transport
            .request(query)
            .map(|response| ssc32::decode_movement_status(&response)))
    }
}

impl Consumer<AngleSet> for ServoController {
    fn update(&self, value: &AngleSet) -> Result<(), RoboNuiError> {
        self.move_to(value)
    }
}
