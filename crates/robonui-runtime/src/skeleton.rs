//! [`SimulatedSkeleton`] – a joint source that needs no depth sensor.
//!
//! A timer thread publishes one synthetic person per sensor period: standing
//! two metres from the sensor, waving the selected arm, with a slight head
//! bob so the marionette has something to follow too.
//!
//! The person carries [`SIMULATED_TRACK_ID`] and is offered as a candidate
//! like any tracked human, so `track 1` keeps following it and any other id
//! leaves the robot idle.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use robonui_kernel::{JointFeed, JointSource};
use robonui_middleware::{Provider, Publisher};
use robonui_types::{ControllerJoint, JointSet, Position3d, RoboNuiError, Side};
use tracing::{debug, info, warn};

/// Track id of the one simulated person.
pub const SIMULATED_TRACK_ID: i32 = 1;

/// Seconds per full wave.
const WAVE_PERIOD: f64 = 2.0;

/// The simulated person at `t` seconds, waving with `side`.
pub fn pose_at(t: f64, side: Side) -> JointSet {
    let phase = (TAU * t / WAVE_PERIOD).sin();
    let p = |x: f64, y: f64, z: f64| Position3d::new(x, y, z);

    let mut joints: JointSet = [
        (ControllerJoint::HipCenter, p(0.0, 1.0, 2.0)),
        (ControllerJoint::Spine, p(0.0, 1.2, 2.0)),
        (ControllerJoint::ShoulderCenter, p(0.0, 1.45, 2.0)),
        (ControllerJoint::Head, p(0.0, 1.7 + 0.03 * phase, 2.0)),
        (ControllerJoint::HipLeft, p(-0.1, 0.95, 2.0)),
        (ControllerJoint::KneeLeft, p(-0.1, 0.5, 2.0)),
        (ControllerJoint::AnkleLeft, p(-0.1, 0.08, 2.0)),
        (ControllerJoint::FootLeft, p(-0.1, 0.0, 1.95)),
        (ControllerJoint::HipRight, p(0.1, 0.95, 2.0)),
        (ControllerJoint::KneeRight, p(0.1, 0.5, 2.0)),
        (ControllerJoint::AnkleRight, p(0.1, 0.08, 2.0)),
        (ControllerJoint::FootRight, p(0.1, 0.0, 1.95)),
    ]
    .into_iter()
    .collect();

    for arm in [Side::Left, Side::Right] {
        let out = match arm {
            Side::Left => -1.0,
            Side::Right => 1.0,
        };
        let [shoulder, elbow, wrist, hand] = ControllerJoint::arm_chain(arm);
        let s = p(0.2 * out, 1.4, 2.0);
        let e;
        let forearm;
        if arm == side {
            // Upper arm out to the side, forearm sweeping up and down.
            e = s + p(0.25 * out, 0.0, -0.05);
            let lift = 0.8 + 0.5 * phase;
            forearm = p(out * lift.cos(), lift.sin(), -0.1);
        } else {
            e = s + p(0.02 * out, -0.28, 0.0);
            forearm = p(0.0, -1.0, 0.0);
        }
        let dir = forearm * (1.0 / forearm.magnitude());
        let w = e + dir * 0.25;
        let h = w + dir * 0.08;
        joints.insert(shoulder, s);
        joints.insert(elbow, e);
        joints.insert(wrist, w);
        joints.insert(hand, h);

        if arm == side {
            joints.insert(ControllerJoint::FingerBase, h);
            joints.insert(ControllerJoint::Fingertip, h + p(0.0, 0.04, -0.04 * (1.0 + phase)));
        }
    }
    joints
}

pub struct SimulatedSkeleton {
    feed: Arc<JointFeed>,
    period: Duration,
    stop: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl SimulatedSkeleton {
    /// Start publishing every `period`.
    pub fn start(period: Duration) -> Result<Self, RoboNuiError> {
        let feed = Arc::new(JointFeed::new("simulated-skeleton", true));
        let stop = Arc::new(AtomicBool::new(false));

        let thread = {
            let feed = feed.clone();
            let stop = stop.clone();
            thread::Builder::new()
                .name("simulated-skeleton".to_string())
                .spawn(move || {
                    let mut tick: u64 = 0;
                    while !stop.load(Ordering::SeqCst) {
                        let t = tick as f64 * period.as_secs_f64();
                        let frame = pose_at(t, feed.side());
                        if let Err(e) = feed.publish(SIMULATED_TRACK_ID, &frame) {
                            debug!(error = %e, "simulated frame not delivered");
                        }
                        tick = tick.wrapping_add(1);
                        thread::sleep(period);
                    }
                })
                .map_err(|e| {
                    RoboNuiError::Configuration(format!("failed to spawn simulated skeleton: {e}"))
                })?
        };
        info!(period_ms = period.as_millis() as u64, "simulated skeleton started");

        Ok(Self {
            feed,
            period,
            stop,
            thread: Mutex::new(Some(thread)),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop the timer thread and wait for it. Idempotent.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let thread = self
            .thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(thread) = thread {
            if thread.join().is_err() {
                warn!("simulated skeleton thread panicked");
            }
            info!("simulated skeleton stopped");
        }
    }
}

impl Drop for SimulatedSkeleton {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Publisher<JointSet> for SimulatedSkeleton {
    fn provider(&self) -> &Provider<JointSet> {
        self.feed.provider()
    }
}

impl JointSource for SimulatedSkeleton {
    fn name(&self) -> &str {
        self.feed.name()
    }

    fn interested_joints(&self) -> Vec<ControllerJoint> {
        self.feed.interested_joints()
    }

    fn set_interested_joints(&self, joints: &[ControllerJoint]) {
        self.feed.set_interested_joints(joints);
    }

    fn controller_track_id(&self) -> i32 {
        self.feed.controller_track_id()
    }

    fn set_controller_track_id(&self, id: i32) {
        self.feed.set_controller_track_id(id);
    }

    fn tracks_multiple(&self) -> bool {
        self.feed.tracks_multiple()
    }

    fn possible_track_ids(&self) -> Vec<i32> {
        self.feed.possible_track_ids()
    }

    fn set_side(&self, side: Side) {
        self.feed.set_side(side);
    }
}
