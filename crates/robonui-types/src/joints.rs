//! Human-controller joints and the [`JointSet`] snapshot.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::command::Side;
use crate::error::RoboNuiError;
use crate::position::Position3d;

/// One trackable point on the human controller's body.
///
/// The first twenty variants are the skeletal tracker's body joints; the last
/// two are derived by the hand tracker from the depth image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ControllerJoint {
    HipCenter,
    Spine,
    ShoulderCenter,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    /// Tip of the most extended finger.
    Fingertip,
    /// Base of the most extended finger.
    FingerBase,
}

impl ControllerJoint {
    /// Shoulder, elbow, wrist and hand of one side, in that order.
    pub fn arm_chain(side: Side) -> [ControllerJoint; 4] {
        match side {
            Side::Left => [
                ControllerJoint::ShoulderLeft,
                ControllerJoint::ElbowLeft,
                ControllerJoint::WristLeft,
                ControllerJoint::HandLeft,
            ],
            Side::Right => [
                ControllerJoint::ShoulderRight,
                ControllerJoint::ElbowRight,
                ControllerJoint::WristRight,
                ControllerJoint::HandRight,
            ],
        }
    }
}

impl fmt::Display for ControllerJoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Observed positions of the joints a consumer declared interest in.
///
/// A missing key means "not currently observed". It is never equivalent to a
/// joint at the origin; use [`JointSet::require`] to turn absence into an
/// error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JointSet {
    joints: BTreeMap<ControllerJoint, Position3d>,
}

impl JointSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `position` for `joint`, replacing any earlier observation.
    pub fn insert(&mut self, joint: ControllerJoint, position: Position3d) {
        self.joints.insert(joint, position);
    }

    pub fn get(&self, joint: ControllerJoint) -> Option<Position3d> {
        self.joints.get(&joint).copied()
    }

    /// Like [`get`][Self::get] but reports absence as
    /// [`RoboNuiError::MissingJoint`].
    pub fn require(&self, joint: ControllerJoint) -> Result<Position3d, RoboNuiError> {
        self.get(joint).ok_or(RoboNuiError::MissingJoint(joint))
    }

    pub fn contains(&self, joint: ControllerJoint) -> bool {
        self.joints.contains_key(&joint)
    }

    /// A copy holding only the joints listed in `interested`.
    pub fn restricted_to(&self, interested: &[ControllerJoint]) -> JointSet {
        let joints = self
            .joints
            .iter()
            .filter(|(joint, _)| interested.contains(joint))
            .map(|(joint, pos)| (*joint, *pos))
            .collect();
        JointSet { joints }
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Iterate in joint order.
    pub fn iter(&self) -> impl Iterator<Item = (ControllerJoint, Position3d)> + '_ {
        self.joints.iter().map(|(j, p)| (*j, *p))
    }
}

impl FromIterator<(ControllerJoint, Position3d)> for JointSet {
    fn from_iter<I: IntoIterator<Item = (ControllerJoint, Position3d)>>(iter: I) -> Self {
        JointSet {
            joints: iter.into_iter().collect(),
        }
    }
}
