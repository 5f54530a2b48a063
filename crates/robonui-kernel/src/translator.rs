//! [`JointAngleTranslator`] – the pipeline stage between joint sources and
//! servo controllers.
//!
//! It consumes [`JointSet`]s, runs them through the currently selected
//! [`RoboticModel`] and publishes the resulting [`AngleSet`]s.

use std::sync::{Arc, PoisonError, RwLock};

use robonui_middleware::{Consumer, Provider, Publisher};
use robonui_types::{AngleSet, JointSet, RoboNuiError};
use tracing::{debug, info};

use crate::model::RoboticModel;

pub struct JointAngleTranslator {
    provider: Provider<AngleSet>,
    model: RwLock<Option<Arc<dyn RoboticModel>>>,
}

impl Default for JointAngleTranslator {
    fn default() -> Self {
        Self::new()
    }
}

impl JointAngleTranslator {
    pub fn new() -> Self {
        Self {
            provider: Provider::new("joint-angle-translator"),
            model: RwLock::new(None),
        }
    }

    /// Replace the kinematic strategy. `None` makes every update fail with
    /// [`RoboNuiError::MissingModel`].
    pub fn set_model(&self, model: Option<Arc<dyn RoboticModel>>) {
        info!(model = model.as_ref().map(|m| m.name()), "translator model selected");
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = model;
    }

    pub fn model(&self) -> Option<Arc<dyn RoboticModel>> {
        self.model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publish the model's neutral pose.
    ///
    /// # Errors
    ///
    /// [`RoboNuiError::MissingModel`] without a model; otherwise any
    /// delivery failure.
    pub fn publish_reset(&self) -> Result<usize, RoboNuiError> {
        let model = self.model().ok_or(RoboNuiError::MissingModel)?;
        self.provider.send(&model.reset())
    }
}

impl Publisher<AngleSet> for JointAngleTranslator {
    fn provider(&self) -> &Provider<AngleSet> {
        &self.provider
    }
}

impl Consumer<JointSet> for JointAngleTranslator {
    fn update(&self, joints: &JointSet) -> Result<(), RoboNuiError> {
        // Clone the Arc so the lock is not held across delivery.
        let model = self.model().ok_or(RoboNuiError::MissingModel)?;
        let angles = model.translate(joints)?;
        debug!(model = model.name(), angles = angles.len(), "joints translated");
        self.provider.send(&angles).map(|_| ())
    }
}
