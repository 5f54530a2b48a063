//! `robonui-kernel` – The Brain
//!
//! Turns observed human joints into robot angles and decides where they go.
//!
//! # Modules
//!
//! - [`model`] – [`RoboticModel`] kinematic strategies ([`ArmModel`],
//!   [`MarionetteModel`]).
//! - [`translator`] – [`JointAngleTranslator`], the joint-to-angle pipeline
//!   stage.
//! - [`source`] – the [`JointSource`] contract for sensor drivers and the
//!   reusable [`JointFeed`].
//! - [`state_manager`] – [`StateManager`], which owns pipeline wiring and
//!   the active flag and executes [`StateCommand`][robonui_types::StateCommand]s.
//! - [`recorder`] – [`Recorder`], a bounded history of published angles.

pub mod model;
pub mod recorder;
pub mod source;
pub mod state_manager;
pub mod translator;

pub use model::{ArmModel, MarionetteModel, RoboticModel};
pub use recorder::{Recorder, Recording};
pub use source::{ANY_CONTROLLER, CANDIDATE_EXPIRY, JointFeed, JointSource};
pub use state_manager::{ModelFactory, PipelineStatus, StateManager};
pub use translator::JointAngleTranslator;
