//! Joint sources: anything that publishes [`JointSet`]s.
//!
//! Sensor drivers implement [`JointSource`] so the orchestrator can tell them
//! which joints to deliver and which tracked person to follow. Most drivers
//! embed a [`JointFeed`], which holds that state and does the filtering.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use robonui_middleware::{Provider, Publisher};
use robonui_types::{ControllerJoint, JointSet, RoboNuiError, Side};
use tracing::trace;

/// Track id meaning "whoever is observed".
pub const ANY_CONTROLLER: i32 = -1;

/// A candidate not seen in this many published frames is forgotten.
pub const CANDIDATE_EXPIRY: u64 = 90;

pub trait JointSource: Publisher<JointSet> {
    fn name(&self) -> &str;

    fn interested_joints(&self) -> Vec<ControllerJoint>;

    /// Only these joints are published from now on.
    fn set_interested_joints(&self, joints: &[ControllerJoint]);

    fn controller_track_id(&self) -> i32;

    fn set_controller_track_id(&self, id: i32);

    /// Whether the source observes several candidate people.
    fn tracks_multiple(&self) -> bool {
        false
    }

    /// Track ids seen recently.
    fn possible_track_ids(&self) -> Vec<i32> {
        Vec::new()
    }

    /// Which of the controller's arms is in use. Ignored by sources without
    /// handedness.
    fn set_side(&self, _side: Side) {}
}

struct FeedState {
    interested: Vec<ControllerJoint>,
    track_id: i32,
    /// Track id to the frame number it was last seen in.
    candidates: BTreeMap<i32, u64>,
    frame: u64,
    side: Side,
}

/// Shared plumbing for a [`JointSource`].
pub struct JointFeed {
    provider: Provider<JointSet>,
    multiple: bool,
    state: Mutex<FeedState>,
}

impl JointFeed {
    pub fn new(name: impl Into<String>, tracks_multiple: bool) -> Self {
        Self {
            provider: Provider::new(name),
            multiple: tracks_multiple,
            state: Mutex::new(FeedState {
                interested: Vec::new(),
                track_id: ANY_CONTROLLER,
                candidates: BTreeMap::new(),
                frame: 0,
                side: Side::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn side(&self) -> Side {
        self.lock().side
    }

    /// Publish one observed frame for person `track_id`.
    ///
    /// The frame is dropped if it belongs to someone other than the selected
    /// controller or if no joints are of interest. Otherwise exactly the
    /// interested joints that were observed are sent.
    ///
    /// The feed stays locked until delivery returns, so the interested
    /// joints and the track id cannot change under a frame in flight.
    pub fn publish(&self, track_id: i32, observed: &JointSet) -> Result<usize, RoboNuiError> {
        let mut state = self.lock();
        if self.multiple {
            state.saw(track_id);
        }
        if state.track_id != ANY_CONTROLLER && state.track_id != track_id {
            trace!(source = %self.provider.name(), track_id, "frame from another person");
            return Ok(0);
        }
        if state.interested.is_empty() {
            return Ok(0);
        }
        self.provider.send(&observed.restricted_to(&state.interested))
    }
}

impl FeedState {
    fn saw(&mut self, track_id: i32) {
        self.frame = self.frame.wrapping_add(1);
        let now = self.frame;
        self.candidates.insert(track_id, now);
        self.candidates.retain(|_, seen| now.wrapping_sub(*seen) < CANDIDATE_EXPIRY);
    }
}

impl Publisher<JointSet> for JointFeed {
    fn provider(&self) -> &Provider<JointSet> {
        &self.provider
    }
}

impl JointSource for JointFeed {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn interested_joints(&self) -> Vec<ControllerJoint> {
        self.lock().interested.clone()
    }

    fn set_interested_joints(&self, joints: &[ControllerJoint]) {
        let mut state = self.lock();
        state.interested = joints.to_vec();
        state.interested.sort();
        state.interested.dedup();
    }

    fn controller_track_id(&self) -> i32 {
        self.lock().track_id
    }

    fn set_controller_track_id(&self, id: i32) {
        self.lock().track_id = id;
    }

    fn tracks_multiple(&self) -> bool {
        self.multiple
    }

    fn possible_track_ids(&self) -> Vec<i32> {
        self.lock().candidates.keys().copied().collect()
    }

    fn set_side(&self, side: Side) {
        self.lock().side = side;
    }
}
