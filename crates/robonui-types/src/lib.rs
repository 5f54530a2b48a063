//! `robonui-types` – shared vocabulary of the RoboNUI control plane.
//!
//! Every other crate in the workspace speaks in these types:
//!
//! - [`position`] – [`Position3d`], a rectangular 3-D point with vector algebra
//!   and spherical / cylindrical views.
//! - [`joints`] – [`ControllerJoint`] and [`JointSet`], a snapshot of the
//!   human controller's observed joints.
//! - [`angles`] – [`RoboticAngle`], [`AngleSet`] and the pulse-width codec
//!   ([`PulseWidthConstants`]).
//! - [`command`] – [`StateCommand`], the orchestrator's command vocabulary.
//! - [`error`] – [`RoboNuiError`], the workspace-wide error type.

pub mod angles;
pub mod command;
pub mod error;
pub mod joints;
pub mod position;

pub use angles::{AngleSet, PulseWidthConstants, RoboticAngle};
pub use command::{ServoControllerKind, Side, StateCommand};
pub use error::RoboNuiError;
pub use joints::{ControllerJoint, JointSet};
pub use position::Position3d;
