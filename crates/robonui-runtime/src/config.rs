//! System configuration – reads/writes `~/.robonui/config.toml`.
//!
//! ```toml
//! read_timeout_ms = 1000
//!
//! [arm]
//! port = "/dev/ttyUSB0"
//! protocol = "ssc32"
//! speed = 1000
//!
//! [arm.channels]
//! arm_base_rotate = 0
//! arm_shoulder_lift = 1
//!
//! [marionette]
//! port = "sim"
//! protocol = "mini_ssc2"
//!
//! [sensor]
//! period_ms = 33
//!
//! [startup]
//! controller = "arm"
//! side = "right"
//! activate = false
//! ```
//!
//! A port named [`SIMULATED_PORT`] is served by an in-memory controller
//! emulation instead of a serial device.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use robonui_hal::{ServoProtocol, validate_channel_map};
use robonui_types::{RoboNuiError, RoboticAngle, ServoControllerKind, Side};
use serde::{Deserialize, Serialize};

/// Port name that selects the built-in controller emulation.
pub const SIMULATED_PORT: &str = "sim";

/// One servo controller board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default)]
    pub protocol: ServoProtocol,

    /// Movement speed passed to protocols that support one; `0` means as
    /// fast as possible.
    #[serde(default)]
    pub speed: u32,

    /// Robot angle to servo channel (0–31).
    #[serde(default)]
    pub channels: BTreeMap<RoboticAngle, u8>,
}

impl ControllerConfig {
    pub fn is_simulated(&self) -> bool {
        self.port == SIMULATED_PORT
    }

    fn arm_defaults() -> Self {
        Self {
            port: default_port(),
            protocol: ServoProtocol::Ssc32,
            speed: 0,
            channels: sequential(&RoboticAngle::ARM),
        }
    }

    fn marionette_defaults() -> Self {
        Self {
            port: default_port(),
            protocol: ServoProtocol::MiniSsc2,
            speed: 0,
            channels: sequential(&RoboticAngle::MARIONETTE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Whether the simulated skeleton stands in for a depth sensor.
    #[serde(default = "default_true")]
    pub simulated: bool,

    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            simulated: true,
            period_ms: default_period_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartupConfig {
    #[serde(default = "default_controller")]
    pub controller: ServoControllerKind,

    #[serde(default)]
    pub side: Side,

    /// Issue `Activation(true)` right after wiring.
    #[serde(default)]
    pub activate: bool,
}

impl Default for StartupConfig {
    fn default() -> Self {
        Self {
            controller: default_controller(),
            side: Side::default(),
            activate: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "ControllerConfig::arm_defaults")]
    pub arm: ControllerConfig,

    #[serde(default = "ControllerConfig::marionette_defaults")]
    pub marionette: ControllerConfig,

    #[serde(default)]
    pub sensor: SensorConfig,

    #[serde(default)]
    pub startup: StartupConfig,
}

fn default_port() -> String {
    SIMULATED_PORT.to_string()
}
fn default_true() -> bool {
    true
}
fn default_period_ms() -> u64 {
    33
}
fn default_controller() -> ServoControllerKind {
    ServoControllerKind::Arm
}
fn default_read_timeout_ms() -> u64 {
    1000
}

fn sequential(angles: &[RoboticAngle]) -> BTreeMap<RoboticAngle, u8> {
    angles.iter().copied().zip(0u8..).collect()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            arm: ControllerConfig::arm_defaults(),
            marionette: ControllerConfig::marionette_defaults(),
            sensor: SensorConfig::default(),
            startup: StartupConfig::default(),
        }
    }
}

impl SystemConfig {
    pub fn controller(&self, kind: ServoControllerKind) -> &ControllerConfig {
        match kind {
            ServoControllerKind::Arm => &self.arm,
            ServoControllerKind::Marionette => &self.marionette,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn sensor_period(&self) -> Duration {
        Duration::from_millis(self.sensor.period_ms)
    }

    /// Check every invariant the system relies on before anything is opened.
    ///
    /// # Errors
    ///
    /// [`RoboNuiError::Configuration`] naming the first violation.
    pub fn validate(&self) -> Result<(), RoboNuiError> {
        if self.read_timeout_ms == 0 {
            return Err(RoboNuiError::Configuration(
                "read_timeout_ms must be positive".to_string(),
            ));
        }
        if self.sensor.period_ms == 0 {
            return Err(RoboNuiError::Configuration(
                "sensor.period_ms must be positive".to_string(),
            ));
        }

        let mut ports = BTreeSet::new();
        for kind in [ServoControllerKind::Arm, ServoControllerKind::Marionette] {
            let cfg = self.controller(kind);
            if cfg.channels.is_empty() {
                if kind == self.startup.controller {
                    return Err(RoboNuiError::Configuration(format!(
                        "start-up controller {kind} has no channels"
                    )));
                }
                continue;
            }
            validate_channel_map(kind, &cfg.channels)?;
            if cfg.port.trim().is_empty() {
                return Err(RoboNuiError::Configuration(format!("{kind} port is empty")));
            }
            if !cfg.is_simulated() && !ports.insert(cfg.port.as_str()) {
                return Err(RoboNuiError::Configuration(format!(
                    "port {} is assigned to more than one controller",
                    cfg.port
                )));
            }
        }
        Ok(())
    }
}

/// Return the path to `~/.robonui/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".robonui").join("config.toml")
}

/// Load the config from the default path. `Ok(None)` if the file does not
/// exist.
pub fn load() -> Result<Option<SystemConfig>, RoboNuiError> {
    load_from(&config_path())
}

/// Load, apply environment overrides and validate.
pub fn load_from(path: &Path) -> Result<Option<SystemConfig>, RoboNuiError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        RoboNuiError::Configuration(format!("failed to read {}: {e}", path.display()))
    })?;
    let mut cfg: SystemConfig = toml::from_str(&raw).map_err(|e| {
        RoboNuiError::Configuration(format!("failed to parse {}: {e}", path.display()))
    })?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Apply `ROBONUI_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `ROBONUI_ARM_PORT` | `arm.port` |
/// | `ROBONUI_MARIONETTE_PORT` | `marionette.port` |
/// | `ROBONUI_SENSOR_PERIOD_MS` | `sensor.period_ms` |
///
/// Values that do not parse are ignored.
pub fn apply_env_overrides(cfg: &mut SystemConfig) {
    if let Ok(v) = std::env::var("ROBONUI_ARM_PORT") {
        cfg.arm.port = v;
    }
    if let Ok(v) = std::env::var("ROBONUI_MARIONETTE_PORT") {
        cfg.marionette.port = v;
    }
    if let Ok(v) = std::env::var("ROBONUI_SENSOR_PERIOD_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.sensor.period_ms = ms;
    }
}

/// Save the config, creating the parent directory if necessary.
pub fn save_to(cfg: &SystemConfig, path: &Path) -> Result<(), RoboNuiError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            RoboNuiError::Configuration(format!("failed to create {}: {e}", parent.display()))
        })?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| RoboNuiError::Configuration(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        RoboNuiError::Configuration(format!("failed to write {}: {e}", path.display()))
    })
}
