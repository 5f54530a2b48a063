//! `robonui-runtime` – puts the pieces together.
//!
//! # Modules
//!
//! - [`config`] – [`SystemConfig`][config::SystemConfig], loaded from
//!   `~/.robonui/config.toml` with `ROBONUI_*` environment overrides.
//! - [`system`] – [`RoboNuiSystem`][system::RoboNuiSystem]: start-up wiring
//!   of transports, controllers, the translator and the orchestrator, and
//!   ordered shutdown.
//! - [`commands`] – [`CommandSource`][commands::CommandSource], the entry
//!   point for operator commands.
//! - [`skeleton`] – [`SimulatedSkeleton`][skeleton::SimulatedSkeleton], a
//!   timer-driven joint source standing in for a depth sensor.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: the global
//!   `tracing` subscriber with optional OTLP span export.

pub mod commands;
pub mod config;
pub mod skeleton;
pub mod system;
pub mod telemetry;

pub use commands::CommandSource;
pub use config::{ControllerConfig, SystemConfig};
pub use skeleton::SimulatedSkeleton;
pub use system::RoboNuiSystem;
pub use telemetry::{TracerProviderGuard, init_tracing};
