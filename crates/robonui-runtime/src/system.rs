//! [`RoboNuiSystem`] – assembles the pipeline from a [`SystemConfig`] and
//! tears it down again.
//!
//! Start-up order: validate the configuration, open one transport worker per
//! configured controller, register controllers and joint sources with the
//! [`StateManager`], wire the pipeline and optionally activate it.
//!
//! Shutdown runs in the reverse direction: sensors stop first, the
//! orchestrator returns the robot to neutral and unwires, then every worker
//! drains its queue and its transport centres the channels and closes.

use std::collections::BTreeMap;
use std::sync::Arc;

use robonui_hal::{
    DEFAULT_QUEUE_DEPTH, ServoController, ServoTransport, SimServoLink, TransportWorker,
};
use robonui_kernel::{
    ArmModel, JointAngleTranslator, MarionetteModel, PipelineStatus, Recorder, RoboticModel,
    StateManager,
};
use robonui_middleware::Publisher;
use robonui_types::{RoboNuiError, ServoControllerKind, Side, StateCommand};
use tracing::info;

use crate::commands::CommandSource;
use crate::config::{ControllerConfig, SystemConfig};
use crate::skeleton::SimulatedSkeleton;

/// Angle sets kept by the built-in recorder.
pub const RECORDER_CAPACITY: usize = 256;

fn model_for(kind: ServoControllerKind) -> impl Fn(Side) -> Arc<dyn RoboticModel> + Send + Sync {
    move |side| -> Arc<dyn RoboticModel> {
        match kind {
            ServoControllerKind::Arm => Arc::new(ArmModel::new(side)),
            ServoControllerKind::Marionette => Arc::new(MarionetteModel),
        }
    }
}

pub struct RoboNuiSystem {
    config: SystemConfig,
    manager: Arc<StateManager>,
    commands: CommandSource,
    controllers: BTreeMap<ServoControllerKind, Arc<ServoController>>,
    sim_links: BTreeMap<ServoControllerKind, SimServoLink>,
    workers: Vec<TransportWorker>,
    skeleton: Option<Arc<SimulatedSkeleton>>,
    recorder: Arc<Recorder>,
    running: bool,
}

impl RoboNuiSystem {
    /// Build and wire everything `config` describes.
    ///
    /// # Errors
    ///
    /// [`RoboNuiError::Configuration`] if the configuration is invalid.
    /// An unreachable serial port is not an error; that controller runs
    /// degraded.
    pub fn start(config: SystemConfig) -> Result<Self, RoboNuiError> {
        config.validate()?;

        let translator = Arc::new(JointAngleTranslator::new());
        let manager = Arc::new(StateManager::new(translator));

        let mut controllers = BTreeMap::new();
        let mut sim_links = BTreeMap::new();
        let mut workers = Vec::new();
        for kind in [ServoControllerKind::Arm, ServoControllerKind::Marionette] {
            let cfg = config.controller(kind);
            if cfg.channels.is_empty() {
                info!(controller = %kind, "no channels configured; controller skipped");
                continue;
            }
            let (transport, link) = open_transport(cfg, &config);
            let worker = TransportWorker::spawn(transport, DEFAULT_QUEUE_DEPTH)?;
            let controller = Arc::new(ServoController::new(
                kind,
                cfg.channels.clone(),
                cfg.speed,
                worker.handle(),
            )?);
            manager.register_controller(kind, controller.clone(), model_for(kind));
            controllers.insert(kind, controller);
            if let Some(link) = link {
                sim_links.insert(kind, link);
            }
            workers.push(worker);
        }

        let skeleton = if config.sensor.simulated {
            let skeleton = Arc::new(SimulatedSkeleton::start(config.sensor_period())?);
            manager.register_joint_source(skeleton.clone());
            Some(skeleton)
        } else {
            None
        };

        let commands = CommandSource::new();
        commands.add_consumer(manager.clone());
        commands.activate();

        manager.startup(config.startup.controller)?;
        let recorder = Arc::new(Recorder::new(RECORDER_CAPACITY));
        manager.translator().add_consumer(recorder.clone());

        let system = Self {
            config,
            manager,
            commands,
            controllers,
            sim_links,
            workers,
            skeleton,
            recorder,
            running: true,
        };
        if system.config.startup.side != Side::default() {
            system
                .commands
                .issue(StateCommand::SideSelection(system.config.startup.side))?;
        }
        if system.config.startup.activate {
            system.commands.issue(StateCommand::Activation(true))?;
        }
        info!(
            controller = %system.config.startup.controller,
            controllers = system.controllers.len(),
            "robonui system running"
        );
        Ok(system)
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<StateManager> {
        &self.manager
    }

    pub fn commands(&self) -> &CommandSource {
        &self.commands
    }

    pub fn controller(&self, kind: ServoControllerKind) -> Option<&Arc<ServoController>> {
        self.controllers.get(&kind)
    }

    /// The in-memory link behind a controller configured with the simulated
    /// port.
    pub fn sim_link(&self, kind: ServoControllerKind) -> Option<&SimServoLink> {
        self.sim_links.get(&kind)
    }

    pub fn recorder(&self) -> &Arc<Recorder> {
        &self.recorder
    }

    pub fn status(&self) -> PipelineStatus {
        self.manager.status()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop sensors, return the robot to neutral, then release the
    /// transports. Idempotent.
    pub fn shutdown(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        if let Some(skeleton) = &self.skeleton {
            skeleton.stop();
        }
        self.commands.deactivate();
        self.manager.shutdown();
        for worker in &mut self.workers {
            worker.shutdown();
        }
        info!("robonui system stopped");
    }
}

impl Drop for RoboNuiSystem {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn open_transport(
    cfg: &ControllerConfig,
    config: &SystemConfig,
) -> (ServoTransport, Option<SimServoLink>) {
    let channels: Vec<u8> = cfg.channels.values().copied().collect();
    if cfg.is_simulated() {
        let link = SimServoLink::emulating(cfg.protocol);
        let transport = ServoTransport::with_link(
            &cfg.port,
            cfg.protocol,
            channels,
            config.read_timeout(),
            Box::new(link.clone()),
        );
        (transport, Some(link))
    } else {
        (
            ServoTransport::open(&cfg.port, cfg.protocol, channels, config.read_timeout()),
            None,
        )
    }
}
