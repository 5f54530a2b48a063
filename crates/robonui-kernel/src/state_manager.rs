//! [`StateManager`] – owns the pipeline wiring and the system on/off state.
//!
//! ```text
//!  JointSource ─┐
//!  JointSource ─┼─► joint consumer (translator) ══ angle provider ─► angle consumer (servo controller)
//!  JointSource ─┘
//! ```
//!
//! Two orthogonal pieces of state:
//!
//! - **active**: gates delivery on every wired provider.
//! - **wiring**: which providers and consumers are installed and which
//!   kinematic model the translator runs.
//!
//! Every mutation happens under one mutex and follows the same rewiring
//! protocol when a provider is swapped:
//!
//! 1. clear the old provider's consumers and, if active, deactivate it;
//! 2. install the new provider;
//! 3. register the current consumer on it;
//! 4. if active, activate it.
//!
//! A consumer swap removes the old consumer from every wired provider before
//! registering the new one, so a provider never holds two pipeline
//! consumers.
//!
//! Selecting a model sets the translator's strategy and every wired joint
//! source's interested joints as one step. While active, the joint sources
//! are paused for the duration so no frame meets a mismatched model.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use robonui_middleware::{Consumer, Publisher};
use robonui_types::{AngleSet, JointSet, RoboNuiError, ServoControllerKind, Side, StateCommand};
use tracing::{info, warn};

use crate::model::RoboticModel;
use crate::source::JointSource;
use crate::translator::JointAngleTranslator;

/// Builds the model a controller needs for the selected side.
pub type ModelFactory = Box<dyn Fn(Side) -> Arc<dyn RoboticModel> + Send + Sync>;

struct ControllerEntry {
    consumer: Arc<dyn Consumer<AngleSet>>,
    model: ModelFactory,
}

#[derive(Default)]
struct Wiring {
    active: bool,
    side: Side,
    track_id: Option<i32>,
    controller: Option<ServoControllerKind>,
    model: Option<Arc<dyn RoboticModel>>,

    sources: Vec<Arc<dyn JointSource>>,
    controllers: BTreeMap<ServoControllerKind, ControllerEntry>,

    joint_providers: Vec<Arc<dyn JointSource>>,
    joint_consumer: Option<Arc<dyn Consumer<JointSet>>>,
    angle_provider: Option<Arc<dyn Publisher<AngleSet>>>,
    angle_consumer: Option<Arc<dyn Consumer<AngleSet>>>,
}

/// A point-in-time view of the pipeline, for status displays.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStatus {
    pub active: bool,
    pub side: Side,
    pub controller: Option<ServoControllerKind>,
    pub model: Option<String>,
    /// The selected person, `None` until a track id has been chosen.
    pub track_id: Option<i32>,
    pub possible_controller_ids: Vec<i32>,
    pub joint_providers: usize,
    pub joint_consumer: bool,
    pub angle_provider: bool,
    pub angle_consumer: bool,
}

fn same<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

pub struct StateManager {
    translator: Arc<JointAngleTranslator>,
    wiring: Mutex<Wiring>,
}

impl StateManager {
    pub fn new(translator: Arc<JointAngleTranslator>) -> Self {
        Self {
            translator,
            wiring: Mutex::new(Wiring::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Wiring> {
        self.wiring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn translator(&self) -> &Arc<JointAngleTranslator> {
        &self.translator
    }

    // ── Registration ────────────────────────────────────────────────────────

    /// Make `source` available to [`startup`][Self::startup].
    pub fn register_joint_source(&self, source: Arc<dyn JointSource>) {
        self.lock().sources.push(source);
    }

    /// Make a pre-built controller selectable, together with the model that
    /// feeds it.
    pub fn register_controller(
        &self,
        kind: ServoControllerKind,
        consumer: Arc<dyn Consumer<AngleSet>>,
        model: impl Fn(Side) -> Arc<dyn RoboticModel> + Send + Sync + 'static,
    ) {
        self.lock().controllers.insert(
            kind,
            ControllerEntry {
                consumer,
                model: Box::new(model),
            },
        );
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn side(&self) -> Side {
        self.lock().side
    }

    pub fn controller(&self) -> Option<ServoControllerKind> {
        self.lock().controller
    }

    pub fn model(&self) -> Option<Arc<dyn RoboticModel>> {
        self.lock().model.clone()
    }

    /// Track ids the multi-person sources currently observe, merged and
    /// sorted.
    pub fn possible_controller_ids(&self) -> Vec<i32> {
        Self::candidates(&self.lock())
    }

    fn candidates(w: &Wiring) -> Vec<i32> {
        let mut seen: Vec<&Arc<dyn JointSource>> = Vec::new();
        let mut ids = BTreeSet::new();
        for source in w.sources.iter().chain(&w.joint_providers) {
            if seen.iter().any(|s| same(s, source)) {
                continue;
            }
            seen.push(source);
            ids.extend(source.possible_track_ids());
        }
        ids.into_iter().collect()
    }

    pub fn status(&self) -> PipelineStatus {
        let w = self.lock();
        PipelineStatus {
            active: w.active,
            side: w.side,
            controller: w.controller,
            model: w.model.as_ref().map(|m| m.name().to_string()),
            track_id: w.track_id,
            possible_controller_ids: Self::candidates(&w),
            joint_providers: w.joint_providers.len(),
            joint_consumer: w.joint_consumer.is_some(),
            angle_provider: w.angle_provider.is_some(),
            angle_consumer: w.angle_consumer.is_some(),
        }
    }

    // ── Rewiring ────────────────────────────────────────────────────────────

    /// Add a joint source alongside the ones already wired. No-op if it is
    /// already wired.
    pub fn add_joint_provider(&self, source: Arc<dyn JointSource>) {
        let mut w = self.lock();
        Self::wire_joint_provider(&mut w, source);
    }

    /// Unwire `source`, leaving it with no consumers. Returns whether it was
    /// wired.
    pub fn remove_joint_provider(&self, source: &Arc<dyn JointSource>) -> bool {
        let mut w = self.lock();
        let Some(index) = w.joint_providers.iter().position(|p| same(p, source)) else {
            return false;
        };
        let old = w.joint_providers.remove(index);
        Self::retire_provider::<JointSet, _>(w.active, old.as_ref());
        true
    }

    /// Replace every wired joint source with `source`.
    pub fn set_joint_provider(&self, source: Option<Arc<dyn JointSource>>) {
        let mut w = self.lock();
        for old in std::mem::take(&mut w.joint_providers) {
            Self::retire_provider::<JointSet, _>(w.active, old.as_ref());
        }
        if let Some(source) = source {
            Self::wire_joint_provider(&mut w, source);
        }
    }

    pub fn set_joint_consumer(&self, consumer: Option<Arc<dyn Consumer<JointSet>>>) {
        let mut w = self.lock();
        Self::swap_joint_consumer(&mut w, consumer);
    }

    pub fn set_angle_provider(&self, provider: Option<Arc<dyn Publisher<AngleSet>>>) {
        let mut w = self.lock();
        Self::swap_angle_provider(&mut w, provider);
    }

    pub fn set_angle_consumer(&self, consumer: Option<Arc<dyn Consumer<AngleSet>>>) {
        let mut w = self.lock();
        Self::swap_angle_consumer(&mut w, consumer);
    }

    /// Set the translator's model and every wired joint source's interested
    /// joints together.
    pub fn select_model(&self, model: Arc<dyn RoboticModel>) {
        let mut w = self.lock();
        Self::pause_joints(&w);
        self.install_model(&mut w, model);
        Self::resume_joints(&w);
    }

    fn retire_provider<T, P: Publisher<T> + ?Sized>(active: bool, provider: &P) {
        provider.clear_all_consumers();
        if active {
            provider.deactivate();
        }
    }

    fn wire_joint_provider(w: &mut Wiring, source: Arc<dyn JointSource>) {
        if w.joint_providers.iter().any(|p| same(p, &source)) {
            return;
        }
        source.clear_all_consumers();
        if let Some(model) = &w.model {
            source.set_interested_joints(&model.interested_joints());
        }
        if let Some(id) = w.track_id
            && source.tracks_multiple()
        {
            source.set_controller_track_id(id);
        }
        source.set_side(w.side);
        if let Some(consumer) = &w.joint_consumer {
            source.add_consumer(consumer.clone());
        }
        if w.active {
            source.activate();
        }
        info!(source = source.name(), "joint source wired");
        w.joint_providers.push(source);
    }

    fn swap_joint_consumer(w: &mut Wiring, consumer: Option<Arc<dyn Consumer<JointSet>>>) {
        if let Some(old) = w.joint_consumer.take() {
            for provider in &w.joint_providers {
                provider.remove_consumer(&old);
            }
        }
        if let Some(new) = &consumer {
            for provider in &w.joint_providers {
                provider.add_consumer(new.clone());
            }
        }
        w.joint_consumer = consumer;
    }

    fn swap_angle_provider(w: &mut Wiring, provider: Option<Arc<dyn Publisher<AngleSet>>>) {
        if let Some(old) = w.angle_provider.take() {
            Self::retire_provider::<AngleSet, _>(w.active, old.as_ref());
        }
        if let Some(new) = &provider {
            if let Some(consumer) = &w.angle_consumer {
                new.add_consumer(consumer.clone());
            }
            if w.active {
                new.activate();
            }
        }
        w.angle_provider = provider;
    }

    fn swap_angle_consumer(w: &mut Wiring, consumer: Option<Arc<dyn Consumer<AngleSet>>>) {
        if let (Some(old), Some(provider)) = (w.angle_consumer.take(), &w.angle_provider) {
            provider.remove_consumer(&old);
        }
        if let (Some(new), Some(provider)) = (&consumer, &w.angle_provider) {
            provider.add_consumer(new.clone());
        }
        w.angle_consumer = consumer;
    }

    fn pause_joints(w: &Wiring) {
        if w.active {
            for provider in &w.joint_providers {
                provider.deactivate();
            }
        }
    }

    fn resume_joints(w: &Wiring) {
        if w.active {
            for provider in &w.joint_providers {
                provider.activate();
            }
        }
    }

    fn install_model(&self, w: &mut Wiring, model: Arc<dyn RoboticModel>) {
        let interested = model.interested_joints();
        for provider in &w.joint_providers {
            provider.set_interested_joints(&interested);
        }
        self.translator.set_model(Some(model.clone()));
        w.model = Some(model);
    }

    /// Route angles to `kind`'s controller and select its model for the
    /// current side.
    fn select_controller(
        &self,
        w: &mut Wiring,
        kind: ServoControllerKind,
    ) -> Result<(), RoboNuiError> {
        let Some(entry) = w.controllers.get(&kind) else {
            return Err(RoboNuiError::Configuration(format!(
                "no {kind} controller registered"
            )));
        };
        let consumer = entry.consumer.clone();
        let model = (entry.model)(w.side);

        Self::pause_joints(w);
        Self::swap_angle_consumer(w, Some(consumer));
        self.install_model(w, model);
        w.controller = Some(kind);
        Self::resume_joints(w);
        info!(controller = %kind, "servo controller selected");
        Ok(())
    }

    fn set_active(w: &mut Wiring, active: bool) {
        w.active = active;
        for provider in &w.joint_providers {
            if active {
                provider.activate();
            } else {
                provider.deactivate();
            }
        }
        if let Some(provider) = &w.angle_provider {
            if active {
                provider.activate();
            } else {
                provider.deactivate();
            }
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Wire the translator between every registered joint source and
    /// `kind`'s controller. Activation is a separate step.
    ///
    /// # Errors
    ///
    /// [`RoboNuiError::Configuration`] if no controller is registered for
    /// `kind`.
    pub fn startup(&self, kind: ServoControllerKind) -> Result<(), RoboNuiError> {
        let mut w = self.lock();
        if !w.controllers.contains_key(&kind) {
            return Err(RoboNuiError::Configuration(format!(
                "no {kind} controller registered"
            )));
        }
        Self::swap_joint_consumer(&mut w, Some(self.translator.clone()));
        Self::swap_angle_provider(&mut w, Some(self.translator.clone()));
        for source in w.sources.clone() {
            Self::wire_joint_provider(&mut w, source);
        }
        self.select_controller(&mut w, kind)?;
        info!(controller = %kind, sources = w.joint_providers.len(), "pipeline started");
        Ok(())
    }

    /// Return the robot to neutral if active, then deactivate and unwire
    /// everything. Registrations are kept.
    pub fn shutdown(&self) {
        let mut w = self.lock();
        if w.active && w.model.is_some() {
            Self::pause_joints(&w);
            if let Err(e) = self.translator.publish_reset() {
                warn!(error = %e, "neutral pose not delivered");
            }
        }
        Self::set_active(&mut w, false);
        for old in std::mem::take(&mut w.joint_providers) {
            old.clear_all_consumers();
        }
        if let Some(old) = w.angle_provider.take() {
            old.clear_all_consumers();
        }
        w.joint_consumer = None;
        w.angle_consumer = None;
        w.controller = None;
        w.model = None;
        self.translator.set_model(None);
        info!("pipeline shut down");
    }

    // ── Commands ────────────────────────────────────────────────────────────

    /// Apply one command. Commands that cannot be honoured are logged and
    /// have no effect.
    pub fn handle(&self, command: StateCommand) {
        let mut w = self.lock();
        match command {
            StateCommand::Activation(active) => {
                Self::set_active(&mut w, active);
                info!(active, "activation changed");
            }
            StateCommand::ControllerIdSelect(id) => {
                w.track_id = Some(id);
                for source in w.sources.iter().chain(&w.joint_providers) {
                    if source.tracks_multiple() {
                        source.set_controller_track_id(id);
                    }
                }
                info!(track_id = id, "controller person selected");
            }
            StateCommand::ServoControllerSelect(kind) => {
                if let Err(e) = self.select_controller(&mut w, kind) {
                    warn!(error = %e, "servo controller selection ignored");
                }
            }
            StateCommand::SideSelection(side) => {
                w.side = side;
                for source in w.sources.iter().chain(&w.joint_providers) {
                    source.set_side(side);
                }
                let model = w
                    .controller
                    .and_then(|kind| w.controllers.get(&kind))
                    .map(|entry| (entry.model)(side));
                if let Some(model) = model {
                    Self::pause_joints(&w);
                    self.install_model(&mut w, model);
                    Self::resume_joints(&w);
                }
                info!(%side, "controller side selected");
            }
        }
    }
}

impl Consumer<StateCommand> for StateManager {
    fn update(&self, command: &StateCommand) -> Result<(), RoboNuiError> {
        self.handle(*command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArmModel, MarionetteModel};
    use crate::source::JointFeed;
    use robonui_middleware::Provider;
    use robonui_types::{ControllerJoint, Position3d};

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct MockController {
        received: Mutex<Vec<AngleSet>>,
    }

    impl MockController {
        fn count(&self) -> usize {
            self.received.lock().unwrap().len()
        }
    }

    impl Consumer<AngleSet> for MockController {
        fn update(&self, value: &AngleSet) -> Result<(), RoboNuiError> {
            self.received.lock().unwrap().push(value.clone());
            Ok(())
        }
    }

    struct Rig {
        manager: StateManager,
        feed: Arc<JointFeed>,
        arm: Arc<MockController>,
        marionette: Arc<MockController>,
    }

    fn rig() -> Rig {
        let manager = StateManager::new(Arc::new(JointAngleTranslator::new()));
        let feed = Arc::new(JointFeed::new("skeleton", true));
        let arm = Arc::new(MockController::default());
        let marionette = Arc::new(MockController::default());
        manager.register_joint_source(feed.clone());
        manager.register_controller(ServoControllerKind::Arm, arm.clone(), |side| {
            Arc::new(ArmModel::new(side))
        });
        manager.register_controller(ServoControllerKind::Marionette, marionette.clone(), |_| {
            Arc::new(MarionetteModel)
        });
        Rig {
            manager,
            feed,
            arm,
            marionette,
        }
    }

    fn everyone() -> JointSet {
        [
            (ControllerJoint::HipCenter, Position3d::new(0.0, 1.0, 2.0)),
            (ControllerJoint::ShoulderCenter, Position3d::new(0.0, 1.4, 2.0)),
            (ControllerJoint::Head, Position3d::new(0.0, 1.7, 2.0)),
            (ControllerJoint::ShoulderLeft, Position3d::new(-0.2, 1.4, 2.0)),
            (ControllerJoint::ElbowLeft, Position3d::new(-0.4, 1.2, 2.0)),
            (ControllerJoint::WristLeft, Position3d::new(-0.5, 1.0, 2.0)),
            (ControllerJoint::HandLeft, Position3d::new(-0.55, 0.9, 2.0)),
            (ControllerJoint::ShoulderRight, Position3d::new(0.2, 1.4, 2.0)),
            (ControllerJoint::ElbowRight, Position3d::new(0.5, 1.4, 1.9)),
            (ControllerJoint::WristRight, Position3d::new(0.7, 1.6, 1.8)),
            (ControllerJoint::HandRight, Position3d::new(0.75, 1.7, 1.8)),
            (ControllerJoint::FootLeft, Position3d::new(-0.1, 0.0, 2.0)),
            (ControllerJoint::FootRight, Position3d::new(0.1, 0.0, 2.0)),
        ]
        .into_iter()
        .collect()
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn initial_state_is_inactive_and_unwired() {
        let rig = rig();
        let status = rig.manager.status();
        assert!(!status.active);
        assert_eq!(status.joint_providers, 0);
        assert!(!status.joint_consumer && !status.angle_provider && !status.angle_consumer);
        assert!(rig.manager.model().is_none());
    }

    #[test]
    fn end_to_end_delivers_one_translation() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        rig.manager.handle(StateCommand::Activation(true));

        let frame = everyone();
        rig.feed.publish(0, &frame).unwrap();

        let received = rig.arm.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let needed = ArmModel::new(Side::Right).interested_joints();
        let expected = ArmModel::new(Side::Right)
            .translate(&frame.restricted_to(&needed))
            .unwrap();
        assert_eq!(received[0], expected);
        assert_eq!(rig.marionette.count(), 0);
    }

    #[test]
    fn nothing_flows_until_activated() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        rig.feed.publish(0, &everyone()).unwrap();
        assert_eq!(rig.arm.count(), 0);

        rig.manager.handle(StateCommand::Activation(true));
        rig.manager.handle(StateCommand::Activation(false));
        rig.feed.publish(0, &everyone()).unwrap();
        assert_eq!(rig.arm.count(), 0);
    }

    #[test]
    fn double_activation_does_not_double_deliver() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Marionette).unwrap();
        rig.manager.handle(StateCommand::Activation(true));
        rig.manager.handle(StateCommand::Activation(true));

        rig.feed.publish(0, &everyone()).unwrap();
        assert_eq!(rig.marionette.count(), 1);
    }

    #[test]
    fn controller_select_swaps_consumer_and_model() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        rig.manager.handle(StateCommand::Activation(true));
        rig.manager
            .handle(StateCommand::ServoControllerSelect(ServoControllerKind::Marionette));

        assert_eq!(rig.manager.controller(), Some(ServoControllerKind::Marionette));
        assert_eq!(rig.feed.interested_joints().len(), 6);
        assert_eq!(rig.manager.translator().provider().consumer_count(), 1);

        rig.feed.publish(0, &everyone()).unwrap();
        assert_eq!(rig.arm.count(), 0);
        assert_eq!(rig.marionette.count(), 1);
        let received = rig.marionette.received.lock().unwrap();
        assert!(received[0].contains(robonui_types::RoboticAngle::HeadLift));
    }

    #[test]
    fn swapping_joint_provider_moves_the_single_consumer() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        rig.manager.handle(StateCommand::Activation(true));

        let replacement: Arc<JointFeed> = Arc::new(JointFeed::new("hand", false));
        rig.manager.set_joint_provider(Some(replacement.clone()));

        assert_eq!(rig.feed.provider().consumer_count(), 0);
        assert!(!rig.feed.is_active());
        assert_eq!(replacement.provider().consumer_count(), 1);
        assert!(replacement.is_active());
        assert_eq!(
            replacement.interested_joints().len(),
            ArmModel::new(Side::Right).interested_joints().len()
        );

        // Wiring the same source again changes nothing.
        rig.manager.add_joint_provider(replacement.clone());
        assert_eq!(replacement.provider().consumer_count(), 1);
        assert_eq!(rig.manager.status().joint_providers, 1);
    }

    #[test]
    fn several_sources_feed_the_same_translator() {
        let rig = rig();
        let hand = Arc::new(JointFeed::new("hand", false));
        rig.manager.register_joint_source(hand.clone());
        rig.manager.startup(ServoControllerKind::Marionette).unwrap();
        rig.manager.handle(StateCommand::Activation(true));

        assert_eq!(rig.manager.status().joint_providers, 2);
        rig.feed.publish(0, &everyone()).unwrap();
        hand.publish(0, &everyone()).unwrap();
        assert_eq!(rig.marionette.count(), 2);

        let hand_source: Arc<dyn JointSource> = hand.clone();
        assert!(rig.manager.remove_joint_provider(&hand_source));
        assert_eq!(hand.provider().consumer_count(), 0);
        assert!(!rig.manager.remove_joint_provider(&hand_source));
    }

    #[test]
    fn replacing_the_joint_consumer_keeps_one_registration() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();

        let other: Arc<JointAngleTranslator> = Arc::new(JointAngleTranslator::new());
        rig.manager.set_joint_consumer(Some(other.clone()));
        assert_eq!(rig.feed.provider().consumer_count(), 1);

        let as_consumer: Arc<dyn Consumer<JointSet>> = other;
        assert_eq!(rig.feed.provider().registrations_of(&as_consumer), 1);
    }

    #[test]
    fn replacing_the_angle_provider_follows_the_protocol() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        rig.manager.handle(StateCommand::Activation(true));

        let stage: Arc<Provider<AngleSet>> = Arc::new(Provider::new("relay"));
        rig.manager.set_angle_provider(Some(stage.clone()));

        let translator = rig.manager.translator();
        assert_eq!(translator.provider().consumer_count(), 0);
        assert!(!translator.is_active());
        assert_eq!(stage.provider().consumer_count(), 1);
        assert!(stage.is_active());
    }

    #[test]
    fn side_selection_rebuilds_the_arm_model() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        rig.manager.handle(StateCommand::SideSelection(Side::Left));

        assert_eq!(rig.manager.side(), Side::Left);
        assert_eq!(rig.feed.side(), Side::Left);
        assert!(
            rig.feed
                .interested_joints()
                .contains(&ControllerJoint::ElbowLeft)
        );
        assert_eq!(
            rig.manager.model().map(|m| m.name().to_string()),
            Some("arm (left)".to_string())
        );
    }

    #[test]
    fn controller_id_reaches_multi_person_sources() {
        let rig = rig();
        let single = Arc::new(JointFeed::new("single", false));
        rig.manager.register_joint_source(single.clone());
        rig.manager.handle(StateCommand::ControllerIdSelect(4));

        assert_eq!(rig.feed.controller_track_id(), 4);
        assert_eq!(single.controller_track_id(), crate::source::ANY_CONTROLLER);
    }

    #[test]
    fn possible_controller_ids_merge_every_source() {
        let rig = rig();
        let second = Arc::new(JointFeed::new("second", true));
        rig.manager.register_joint_source(second.clone());
        rig.manager.startup(ServoControllerKind::Arm).unwrap();

        rig.feed.publish(3, &everyone()).unwrap();
        rig.feed.publish(5, &everyone()).unwrap();
        second.publish(5, &everyone()).unwrap();
        second.publish(8, &everyone()).unwrap();
        assert_eq!(rig.manager.possible_controller_ids(), vec![3, 5, 8]);

        rig.manager.handle(StateCommand::ControllerIdSelect(5));
        let status = rig.manager.status();
        assert_eq!(status.track_id, Some(5));
        assert_eq!(status.possible_controller_ids, vec![3, 5, 8]);
    }

    #[test]
    fn unknown_controller_is_ignored() {
        let manager = StateManager::new(Arc::new(JointAngleTranslator::new()));
        assert!(manager.startup(ServoControllerKind::Arm).is_err());

        manager.handle(StateCommand::ServoControllerSelect(ServoControllerKind::Arm));
        assert_eq!(manager.controller(), None);
        assert!(manager.update(&StateCommand::Activation(true)).is_ok());
    }

    #[test]
    fn model_selection_is_atomic_for_sources() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        rig.manager.handle(StateCommand::Activation(true));

        rig.manager.select_model(Arc::new(MarionetteModel));
        assert_eq!(
            rig.feed.interested_joints().len(),
            MarionetteModel.needed_joints().len()
        );
        assert!(rig.feed.is_active());
        assert_eq!(
            rig.manager.model().map(|m| m.name().to_string()),
            Some("marionette".to_string())
        );
    }

    #[test]
    fn shutdown_sends_neutral_pose_and_unwires() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Marionette).unwrap();
        rig.manager.handle(StateCommand::Activation(true));
        rig.manager.shutdown();

        {
            let received = rig.marionette.received.lock().unwrap();
            assert_eq!(received.len(), 1);
            assert_eq!(
                received[0],
                AngleSet::neutral(ServoControllerKind::Marionette)
            );
        }
        let status = rig.manager.status();
        assert!(!status.active);
        assert_eq!(status.joint_providers, 0);
        assert_eq!(rig.feed.provider().consumer_count(), 0);

        // Registrations survive; the pipeline can be started again.
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        assert_eq!(rig.manager.status().joint_providers, 1);
    }

    #[test]
    fn shutdown_while_inactive_sends_nothing() {
        let rig = rig();
        rig.manager.startup(ServoControllerKind::Arm).unwrap();
        rig.manager.shutdown();
        assert_eq!(rig.arm.count(), 0);
    }
}
