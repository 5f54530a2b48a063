//! [`StateCommand`] – the orchestrator's command vocabulary.
//!
//! Commands come from the voice interpreter, the GUI or the operator console.
//! Each variant carries exactly the argument type its tag needs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RoboNuiError;

/// The physical robots a servo controller can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServoControllerKind {
    Arm,
    Marionette,
}

impl fmt::Display for ServoControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServoControllerKind::Arm => write!(f, "arm"),
            ServoControllerKind::Marionette => write!(f, "marionette"),
        }
    }
}

impl FromStr for ServoControllerKind {
    type Err = RoboNuiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "arm" => Ok(ServoControllerKind::Arm),
            "marionette" => Ok(ServoControllerKind::Marionette),
            other => Err(RoboNuiError::UnknownCommand(format!(
                "unknown servo controller '{other}'"
            ))),
        }
    }
}

/// Which of the human controller's sides drives the robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    #[default]
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

impl FromStr for Side {
    type Err = RoboNuiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Side::Left),
            "right" => Ok(Side::Right),
            other => Err(RoboNuiError::UnknownCommand(format!("unknown side '{other}'"))),
        }
    }
}

/// A command to the State Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", content = "argument")]
pub enum StateCommand {
    /// Turn the whole pipeline on (`true`) or off (`false`).
    Activation(bool),
    /// Select which tracked human is the controller.
    ControllerIdSelect(i32),
    /// Route angles to the arm or the marionette.
    ServoControllerSelect(ServoControllerKind),
    /// Select which arm of the human drives the robot.
    SideSelection(Side),
}

impl fmt::Display for StateCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateCommand::Activation(true) => write!(f, "activate"),
            StateCommand::Activation(false) => write!(f, "deactivate"),
            StateCommand::ControllerIdSelect(id) => write!(f, "track {id}"),
            StateCommand::ServoControllerSelect(kind) => write!(f, "{kind}"),
            StateCommand::SideSelection(side) => write!(f, "side {side}"),
        }
    }
}

/// Parses the operator phrasing produced by [`Display`][fmt::Display]:
/// `activate`, `deactivate`, `arm`, `marionette`, `track <id>`,
/// `side left|right`.
impl FromStr for StateCommand {
    type Err = RoboNuiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut words = s.split_whitespace();
        let head = words
            .next()
            .ok_or_else(|| RoboNuiError::UnknownCommand("empty command".to_string()))?
            .to_ascii_lowercase();
        let arg = words.next();
        if words.next().is_some() {
            return Err(RoboNuiError::UnknownCommand(format!(
                "too many arguments in '{}'",
                s.trim()
            )));
        }

        match (head.as_str(), arg) {
            ("activate" | "start", None) => Ok(StateCommand::Activation(true)),
            ("deactivate" | "stop", None) => Ok(StateCommand::Activation(false)),
            ("arm" | "marionette", None) => Ok(StateCommand::ServoControllerSelect(head.parse()?)),
            ("controller", Some(kind)) => Ok(StateCommand::ServoControllerSelect(kind.parse()?)),
            ("track", Some(id)) => id
                .parse::<i32>()
                .map(StateCommand::ControllerIdSelect)
                .map_err(|e| RoboNuiError::UnknownCommand(format!("bad track id '{id}': {e}"))),
            ("side", Some(side)) => Ok(StateCommand::SideSelection(side.parse()?)),
            _ => Err(RoboNuiError::UnknownCommand(format!(
                "unrecognised command '{}'",
                s.trim()
            ))),
        }
    }
}
