//! Kinematic models: joint positions in, actuator angles out.
//!
//! A [`RoboticModel`] declares which joints it needs and turns a
//! [`JointSet`] holding them into an [`AngleSet`] for one robot. Models are
//! strategies the orchestrator selects explicitly; nothing downstream
//! inspects their concrete type.
//!
//! Coordinates follow the depth sensor: `x` to the sensor's right, `y` up,
//! `z` away from the sensor, in metres.

use std::f64::consts::PI;

use robonui_types::{
    AngleSet, ControllerJoint, JointSet, Position3d, RoboNuiError, RoboticAngle,
    ServoControllerKind, Side,
};

pub trait RoboticModel: Send + Sync {
    fn name(&self) -> &str;

    /// The robot whose angles this model produces.
    fn robot(&self) -> ServoControllerKind;

    /// Joints [`translate`][Self::translate] requires.
    fn needed_joints(&self) -> Vec<ControllerJoint>;

    /// Joints used when observed but not required.
    fn optional_joints(&self) -> Vec<ControllerJoint> {
        Vec::new()
    }

    /// Everything a joint source should deliver for this model.
    fn interested_joints(&self) -> Vec<ControllerJoint> {
        let mut joints = self.needed_joints();
        joints.extend(self.optional_joints());
        joints
    }

    /// # Errors
    ///
    /// [`RoboNuiError::MissingJoint`] if a needed joint is absent.
    fn translate(&self, joints: &JointSet) -> Result<AngleSet, RoboNuiError>;

    /// The neutral pose: every angle of the robot at zero.
    fn reset(&self) -> AngleSet {
        AngleSet::neutral(self.robot())
    }
}

fn clamp_angle(radians: f64) -> f64 {
    if radians.is_finite() {
        radians.clamp(-PI, PI)
    } else {
        0.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Arm
// ────────────────────────────────────────────────────────────────────────────

/// Mirrors one human arm onto the robotic arm.
///
/// | Angle | Derived from |
/// |---|---|
/// | base-rotate | azimuth of the upper arm in the horizontal plane, 0 = pointing sideways |
/// | shoulder-lift | elevation of the upper arm above horizontal |
/// | elbow-bend | deflection of the forearm from the upper arm |
/// | wrist-tilt | deflection of the hand from the forearm |
/// | wrist-rotate | roll of the finger around the forearm, 0 = finger up |
/// | hand-grasp | deflection of the finger from the forearm |
///
/// The last two need the optional fingertip and finger-base points; without
/// them they are left out and the servos hold position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmModel {
    side: Side,
    name: &'static str,
}

impl ArmModel {
    pub fn new(side: Side) -> Self {
        let name = match side {
            Side::Left => "arm (left)",
            Side::Right => "arm (right)",
        };
        Self { side, name }
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

impl RoboticModel for ArmModel {
    fn name(&self) -> &str {
        self.name
    }

    fn robot(&self) -> ServoControllerKind {
        ServoControllerKind::Arm
    }

    fn needed_joints(&self) -> Vec<ControllerJoint> {
        let mut joints = vec![ControllerJoint::ShoulderCenter];
        joints.extend(ControllerJoint::arm_chain(self.side));
        joints
    }

    fn optional_joints(&self) -> Vec<ControllerJoint> {
        vec![ControllerJoint::Fingertip, ControllerJoint::FingerBase]
    }

    fn translate(&self, joints: &JointSet) -> Result<AngleSet, RoboNuiError> {
        joints.require(ControllerJoint::ShoulderCenter)?;
        let [shoulder, elbow, wrist, hand] = ControllerJoint::arm_chain(self.side);
        let shoulder = joints.require(shoulder)?;
        let elbow = joints.require(elbow)?;
        let wrist = joints.require(wrist)?;
        let hand = joints.require(hand)?;

        let upper = elbow - shoulder;
        let fore = wrist - elbow;
        let palm = hand - wrist;

        // Mirror the left arm so both sides read the same.
        let outward = match self.side {
            Side::Left => -upper.x,
            Side::Right => upper.x,
        };

        let mut angles = AngleSet::new();
        angles.insert(RoboticAngle::ArmBaseRotate, clamp_angle(upper.z.atan2(outward)));
        angles.insert(
            RoboticAngle::ArmShoulderLift,
            clamp_angle(upper.y.atan2(upper.x.hypot(upper.z))),
        );
        angles.insert(RoboticAngle::ArmElbowBend, clamp_angle(upper.angle_between(fore)));
        angles.insert(RoboticAngle::ArmWristTilt, clamp_angle(fore.angle_between(palm)));

        if let (Some(tip), Some(base)) = (
            joints.get(ControllerJoint::Fingertip),
            joints.get(ControllerJoint::FingerBase),
        ) {
            let finger = tip - base;
            angles.insert(RoboticAngle::ArmHandGrasp, clamp_angle(fore.angle_between(finger)));
            angles.insert(RoboticAngle::ArmWristRotate, clamp_angle(roll_about(fore, finger)));
        }
        Ok(angles)
    }
}

/// Signed angle of `v` around `axis`, measured from world-up projected onto
/// the plane normal to `axis`.
fn roll_about(axis: Position3d, v: Position3d) -> f64 {
    let length = axis.magnitude();
    if length == 0.0 {
        return 0.0;
    }
    let a = axis * (1.0 / length);
    let up = Position3d::new(0.0, 1.0, 0.0);
    let up_flat = up - a * up.dot(a);
    let v_flat = v - a * v.dot(a);
    if up_flat.magnitude() == 0.0 || v_flat.magnitude() == 0.0 {
        return 0.0;
    }
    a.dot(up_flat.cross(v_flat)).atan2(up_flat.dot(v_flat))
}

// ────────────────────────────────────────────────────────────────────────────
// Marionette
// ────────────────────────────────────────────────────────────────────────────

/// Lifts each marionette string by how high the matching body part is above
/// the floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarionetteModel;

impl MarionetteModel {
    /// Radians per metre above the floor.
    pub const SCALE: f64 = 0.5;
    /// Offset so a standing person maps near neutral.
    pub const OFFSET: f64 = -1.0;

    fn lift(height: f64) -> f64 {
        clamp_angle(height * Self::SCALE + Self::OFFSET)
    }
}

impl RoboticModel for MarionetteModel {
    fn name(&self) -> &str {
        "marionette"
    }

    fn robot(&self) -> ServoControllerKind {
        ServoControllerKind::Marionette
    }

    fn needed_joints(&self) -> Vec<ControllerJoint> {
        vec![
            ControllerJoint::Head,
            ControllerJoint::HandLeft,
            ControllerJoint::HandRight,
            ControllerJoint::HipCenter,
            ControllerJoint::FootLeft,
            ControllerJoint::FootRight,
        ]
    }

    fn translate(&self, joints: &JointSet) -> Result<AngleSet, RoboNuiError> {
        let floor = (joints.require(ControllerJoint::FootLeft)?.y
            + joints.require(ControllerJoint::FootRight)?.y)
            / 2.0;
        let height = |joint| joints.require(joint).map(|p| p.y - floor);

        let mut angles = AngleSet::new();
        angles.insert(RoboticAngle::HeadLift, Self::lift(height(ControllerJoint::Head)?));
        angles.insert(RoboticAngle::LeftArmLift, Self::lift(height(ControllerJoint::HandLeft)?));
        angles.insert(RoboticAngle::RightArmLift, Self::lift(height(ControllerJoint::HandRight)?));
        angles.insert(RoboticAngle::RearLift, Self::lift(height(ControllerJoint::HipCenter)?));
        Ok(angles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-6;

    /// Right arm held straight out to the side at shoulder height.
    fn right_arm_straight_out() -> JointSet {
        [
            (ControllerJoint::ShoulderCenter, Position3d::new(0.0, 1.4, 2.0)),
            (ControllerJoint::ShoulderRight, Position3d::new(0.2, 1.4, 2.0)),
            (ControllerJoint::ElbowRight, Position3d::new(0.5, 1.4, 2.0)),
            (ControllerJoint::WristRight, Position3d::new(0.8, 1.4, 2.0)),
            (ControllerJoint::HandRight, Position3d::new(0.9, 1.4, 2.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn straight_arm_is_neutral() {
        let angles = ArmModel::new(Side::Right)
            .translate(&right_arm_straight_out())
            .unwrap();
        for angle in [
            RoboticAngle::ArmBaseRotate,
            RoboticAngle::ArmShoulderLift,
            RoboticAngle::ArmElbowBend,
            RoboticAngle::ArmWristTilt,
        ] {
            assert!(angles.get(angle).unwrap().abs() < EPS, "{angle} not neutral");
        }
        assert!(!angles.contains(RoboticAngle::ArmHandGrasp));
        assert!(!angles.contains(RoboticAngle::ArmWristRotate));
    }

    #[test]
    fn forearm_raised_bends_elbow_by_right_angle() {
        let mut joints = right_arm_straight_out();
        joints.insert(ControllerJoint::WristRight, Position3d::new(0.5, 1.7, 2.0));
        joints.insert(ControllerJoint::HandRight, Position3d::new(0.5, 1.8, 2.0));

        let angles = ArmModel::new(Side::Right).translate(&joints).unwrap();
        assert!((angles.get(RoboticAngle::ArmElbowBend).unwrap() - FRAC_PI_2).abs() < EPS);
        assert!(angles.get(RoboticAngle::ArmWristTilt).unwrap().abs() < EPS);
    }

    #[test]
    fn raised_upper_arm_lifts_shoulder() {
        let mut joints = right_arm_straight_out();
        joints.insert(ControllerJoint::ElbowRight, Position3d::new(0.2, 1.7, 2.0));
        let angles = ArmModel::new(Side::Right).translate(&joints).unwrap();
        assert!((angles.get(RoboticAngle::ArmShoulderLift).unwrap() - FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn left_arm_is_mirrored() {
        let joints: JointSet = [
            (ControllerJoint::ShoulderCenter, Position3d::new(0.0, 1.4, 2.0)),
            (ControllerJoint::ShoulderLeft, Position3d::new(-0.2, 1.4, 2.0)),
            (ControllerJoint::ElbowLeft, Position3d::new(-0.5, 1.4, 2.0)),
            (ControllerJoint::WristLeft, Position3d::new(-0.8, 1.4, 2.0)),
            (ControllerJoint::HandLeft, Position3d::new(-0.9, 1.4, 2.0)),
        ]
        .into_iter()
        .collect();
        let angles = ArmModel::new(Side::Left).translate(&joints).unwrap();
        assert!(angles.get(RoboticAngle::ArmBaseRotate).unwrap().abs() < EPS);
    }

    #[test]
    fn finger_points_add_grasp_and_rotate() {
        let mut joints = right_arm_straight_out();
        joints.insert(ControllerJoint::FingerBase, Position3d::new(0.9, 1.4, 2.0));
        joints.insert(ControllerJoint::Fingertip, Position3d::new(0.9, 1.5, 2.0));

        let angles = ArmModel::new(Side::Right).translate(&joints).unwrap();
        assert!((angles.get(RoboticAngle::ArmHandGrasp).unwrap() - FRAC_PI_2).abs() < EPS);
        assert!(angles.get(RoboticAngle::ArmWristRotate).unwrap().abs() < EPS);
    }

    #[test]
    fn missing_needed_joint_is_an_error_not_zero() {
        let mut joints = right_arm_straight_out();
        joints = joints.restricted_to(&[
            ControllerJoint::ShoulderCenter,
            ControllerJoint::ShoulderRight,
            ControllerJoint::ElbowRight,
            ControllerJoint::WristRight,
        ]);
        assert_eq!(
            ArmModel::new(Side::Right).translate(&joints),
            Err(RoboNuiError::MissingJoint(ControllerJoint::HandRight))
        );
    }

    #[test]
    fn arm_needs_the_selected_side() {
        let needed = ArmModel::new(Side::Left).needed_joints();
        assert!(needed.contains(&ControllerJoint::ElbowLeft));
        assert!(!needed.contains(&ControllerJoint::ElbowRight));
        assert_eq!(needed.len(), 5);

        let interested = ArmModel::new(Side::Left).interested_joints();
        assert!(interested.contains(&ControllerJoint::Fingertip));
        assert_eq!(MarionetteModel.interested_joints(), MarionetteModel.needed_joints());
    }

    #[test]
    fn marionette_lifts_by_height_above_floor() {
        let joints: JointSet = [
            (ControllerJoint::Head, Position3d::new(0.0, 1.7, 2.0)),
            (ControllerJoint::HandLeft, Position3d::new(-0.3, 2.0, 2.0)),
            (ControllerJoint::HandRight, Position3d::new(0.3, 0.8, 2.0)),
            (ControllerJoint::HipCenter, Position3d::new(0.0, 1.0, 2.0)),
            (ControllerJoint::FootLeft, Position3d::new(-0.1, -0.1, 2.0)),
            (ControllerJoint::FootRight, Position3d::new(0.1, 0.1, 2.0)),
        ]
        .into_iter()
        .collect();

        let angles = MarionetteModel.translate(&joints).unwrap();
        assert!((angles.get(RoboticAngle::HeadLift).unwrap() - (1.7 * 0.5 - 1.0)).abs() < EPS);
        assert!((angles.get(RoboticAngle::LeftArmLift).unwrap() - 0.0).abs() < EPS);
        assert!((angles.get(RoboticAngle::RightArmLift).unwrap() - (0.8 * 0.5 - 1.0)).abs() < EPS);
        assert!((angles.get(RoboticAngle::RearLift).unwrap() - (-0.5)).abs() < EPS);
        assert!(!angles.contains(RoboticAngle::CurtainOpen));
    }

    #[test]
    fn marionette_clamps_extreme_heights() {
        let mut joints: JointSet = MarionetteModel
            .needed_joints()
            .into_iter()
            .map(|j| (j, Position3d::zero()))
            .collect();
        joints.insert(ControllerJoint::Head, Position3d::new(0.0, 100.0, 0.0));
        let angles = MarionetteModel.translate(&joints).unwrap();
        assert_eq!(angles.get(RoboticAngle::HeadLift), Some(PI));
    }

    #[test]
    fn reset_is_neutral_for_the_robot() {
        let pose = ArmModel::new(Side::Right).reset();
        assert_eq!(pose, AngleSet::neutral(ServoControllerKind::Arm));
        assert_eq!(MarionetteModel.reset().len(), RoboticAngle::MARIONETTE.len());
    }
}
