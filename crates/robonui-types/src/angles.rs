//! Actuator degrees of freedom, [`AngleSet`] and the pulse-width codec.
//!
//! Servo controllers position a channel by pulse width. The codec maps a
//! signed angle in radians onto that unit with a linear law
//!
//! ```text
//! pulse_width = clamp(round(angle · M) + C, 0, max)
//! angle       = (pulse_width − C) / M
//! ```
//!
//! where `M` (multiplier), `C` (center) and `max` come from a
//! [`PulseWidthConstants`] value. Round-tripping an in-range angle loses at
//! most one pulse-width unit to rounding.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::ServoControllerKind;

/// One controllable degree of freedom of a specific robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoboticAngle {
    // Robotic arm
    ArmBaseRotate,
    ArmShoulderLift,
    ArmElbowBend,
    ArmWristTilt,
    ArmWristRotate,
    ArmHandGrasp,

    // Robotic marionette
    HeadLift,
    LeftArmLift,
    RightArmLift,
    RearLift,
    CurtainOpen,
}

impl RoboticAngle {
    pub const ARM: [RoboticAngle; 6] = [
        RoboticAngle::ArmBaseRotate,
        RoboticAngle::ArmShoulderLift,
        RoboticAngle::ArmElbowBend,
        RoboticAngle::ArmWristTilt,
        RoboticAngle::ArmWristRotate,
        RoboticAngle::ArmHandGrasp,
    ];

    pub const MARIONETTE: [RoboticAngle; 5] = [
        RoboticAngle::HeadLift,
        RoboticAngle::LeftArmLift,
        RoboticAngle::RightArmLift,
        RoboticAngle::RearLift,
        RoboticAngle::CurtainOpen,
    ];

    /// The robot this degree of freedom belongs to.
    pub fn robot(self) -> ServoControllerKind {
        match self {
            RoboticAngle::ArmBaseRotate
            | RoboticAngle::ArmShoulderLift
            | RoboticAngle::ArmElbowBend
            | RoboticAngle::ArmWristTilt
            | RoboticAngle::ArmWristRotate
            | RoboticAngle::ArmHandGrasp => ServoControllerKind::Arm,
            RoboticAngle::HeadLift
            | RoboticAngle::LeftArmLift
            | RoboticAngle::RightArmLift
            | RoboticAngle::RearLift
            | RoboticAngle::CurtainOpen => ServoControllerKind::Marionette,
        }
    }

    /// Every degree of freedom of `robot`.
    pub fn all_for(robot: ServoControllerKind) -> &'static [RoboticAngle] {
        match robot {
            ServoControllerKind::Arm => &Self::ARM,
            ServoControllerKind::Marionette => &Self::MARIONETTE,
        }
    }
}

impl fmt::Display for RoboticAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pulse-width codec
// ────────────────────────────────────────────────────────────────────────────

/// Linear mapping between radians and a device's pulse-width unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PulseWidthConstants {
    /// Pulse-width units per radian (`M`).
    pub multiplier: f64,
    /// Pulse width of the neutral (zero-angle) position (`C`).
    pub center: u32,
    /// Largest pulse width the device accepts.
    pub max: u32,
}

impl PulseWidthConstants {
    /// SSC-32 ASCII protocol: microseconds, 1500 µs center, ±π spans 0–3000.
    pub const SSC32: PulseWidthConstants = PulseWidthConstants {
        multiplier: 1500.0 / PI,
        center: 1500,
        max: 3000,
    };

    /// Mini-SSC II binary protocol: one position byte, 128 center.
    /// `0xFF` is the frame sync byte, so positions stop at 254.
    pub const MINI_SSC2: PulseWidthConstants = PulseWidthConstants {
        multiplier: 126.0 / PI,
        center: 128,
        max: 254,
    };

    /// `clamp(round(angle · M) + C, 0, max)`.
    ///
    /// Negative results are clamped to zero before any unsigned value is
    /// produced. A non-finite angle maps to the center position.
    pub fn angle_to_pulse_width(&self, angle: f64) -> u32 {
        if !angle.is_finite() {
            return self.center;
        }
        let raw = (angle * self.multiplier).round() + f64::from(self.center);
        raw.clamp(0.0, f64::from(self.max)) as u32
    }

    /// `(pulse_width − C) / M`.
    pub fn pulse_width_to_angle(&self, pulse_width: u32) -> f64 {
        (f64::from(pulse_width) - f64::from(self.center)) / self.multiplier
    }

    /// Angle represented by one pulse-width unit.
    pub fn resolution(&self) -> f64 {
        1.0 / self.multiplier
    }
}

// ────────────────────────────────────────────────────────────────────────────
// AngleSet
// ────────────────────────────────────────────────────────────────────────────

/// Target actuator angles for one robot, in radians (conventionally
/// `[-π, π]`, `0` = neutral).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleSet {
    angles: BTreeMap<RoboticAngle, f64>,
}

impl AngleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// All of `robot`'s degrees of freedom at zero.
    pub fn neutral(robot: ServoControllerKind) -> Self {
        RoboticAngle::all_for(robot)
            .iter()
            .map(|angle| (*angle, 0.0))
            .collect()
    }

    pub fn insert(&mut self, angle: RoboticAngle, radians: f64) {
        self.angles.insert(angle, radians);
    }

    pub fn get(&self, angle: RoboticAngle) -> Option<f64> {
        self.angles.get(&angle).copied()
    }

    pub fn contains(&self, angle: RoboticAngle) -> bool {
        self.angles.contains_key(&angle)
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RoboticAngle, f64)> + '_ {
        self.angles.iter().map(|(a, r)| (*a, *r))
    }

    /// The derived pulse-width mapping under `constants`.
    pub fn pulse_widths(&self, constants: &PulseWidthConstants) -> BTreeMap<RoboticAngle, u32> {
        self.iter()
            .map(|(angle, radians)| (angle, constants.angle_to_pulse_width(radians)))
            .collect()
    }

    /// Inverse of [`pulse_widths`][Self::pulse_widths].
    pub fn from_pulse_widths(
        widths: impl IntoIterator<Item = (RoboticAngle, u32)>,
        constants: &PulseWidthConstants,
    ) -> Self {
        widths
            .into_iter()
            .map(|(angle, pw)| (angle, constants.pulse_width_to_angle(pw)))
            .collect()
    }
}

impl FromIterator<(RoboticAngle, f64)> for AngleSet {
    fn from_iter<I: IntoIterator<Item = (RoboticAngle, f64)>>(iter: I) -> Self {
        AngleSet {
            angles: iter.into_iter().collect(),
        }
    }
}
