//! [`RoboNuiError`] – the workspace-wide error type.
//!
//! Propagation policy: transport- and protocol-level failures are recovered
//! where they happen and degrade to neutral/no-op behaviour, configuration and
//! missing-model errors surface immediately. Nothing here is meant to
//! terminate the process; the worst outcome is a command with no effect.

use thiserror::Error;

use crate::angles::RoboticAngle;
use crate::command::ServoControllerKind;
use crate::joints::ControllerJoint;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoboNuiError {
    /// A required model, channel map or setting is missing or invalid.
    #[error("Configuration Error: {0}")]
    Configuration(String),

    /// The serial port could not be opened; the controller runs degraded.
    #[error("Could not open servo controller port {port}: {details}")]
    TransportOpen { port: String, details: String },

    /// An I/O failure on an already-open transport.
    #[error("Transport Error on {port}: {details}")]
    Transport { port: String, details: String },

    /// No response arrived within the read timeout.
    #[error("No response within timeout (expected {expected} byte(s))")]
    ProtocolTimeout { expected: usize },

    /// An unrecognised command tag or argument.
    #[error("Unknown Command: {0}")]
    UnknownCommand(String),

    /// The translator received joints without a kinematic model configured.
    #[error("No robotic model configured")]
    MissingModel,

    /// A model needed a joint the set did not contain.
    #[error("Joint {0} not observed")]
    MissingJoint(ControllerJoint),

    /// An angle has no channel in the controller's channel map.
    #[error("No channel mapped for {angle} on the {controller} controller")]
    UnmappedAngle {
        angle: RoboticAngle,
        controller: ServoControllerKind,
    },

    /// The operation is not offered by this protocol or controller.
    #[error("{operation} is not supported by {target}")]
    Unsupported { operation: String, target: String },

    /// One or more consumers failed during a single fan-out.
    #[error("{} consumer(s) failed during delivery: {}", .failures.len(), summarize(.failures))]
    Delivery { failures: Vec<RoboNuiError> },
}

fn summarize(failures: &[RoboNuiError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = RoboNuiError::TransportOpen {
            port: "/dev/ttyUSB0".to_string(),
            details: "no such device".to_string(),
        };
        assert!(err.to_string().contains("/dev/ttyUSB0"));

        let err = RoboNuiError::UnmappedAngle {
            angle: RoboticAngle::HeadLift,
            controller: ServoControllerKind::Marionette,
        };
        assert_eq!(
            err.to_string(),
            "No channel mapped for HeadLift on the marionette controller"
        );
    }

    #[test]
    fn delivery_error_lists_every_failure() {
        let err = RoboNuiError::Delivery {
            failures: vec![
                RoboNuiError::MissingModel,
                RoboNuiError::MissingJoint(ControllerJoint::Head),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("2 consumer(s) failed"));
        assert!(text.contains("No robotic model configured"));
        assert!(text.contains("Joint Head not observed"));
    }
}
