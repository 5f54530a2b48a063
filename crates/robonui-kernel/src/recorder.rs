//! [`Recorder`] – a bounded, timestamped history of published angle sets.
//!
//! Attach it as an extra consumer on the translator to inspect what the
//! robot was told to do.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use robonui_middleware::Consumer;
use robonui_types::{AngleSet, RoboNuiError};

#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    pub at: DateTime<Utc>,
    pub angles: AngleSet,
}

pub struct Recorder {
    capacity: usize,
    entries: Mutex<VecDeque<Recording>>,
}

impl Recorder {
    /// Keeps at most `capacity` recordings, dropping the oldest. A capacity
    /// of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Recording>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn latest(&self) -> Option<Recording> {
        self.lock().back().cloned()
    }

    /// Oldest first.
    pub fn snapshot(&self) -> Vec<Recording> {
        self.lock().iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Consumer<AngleSet> for Recorder {
    fn update(&self, angles: &AngleSet) -> Result<(), RoboNuiError> {
        let mut entries = self.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(Recording {
            at: Utc::now(),
            angles: angles.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use robonui_types::{RoboticAngle, ServoControllerKind};

    fn pose(value: f64) -> AngleSet {
        [(RoboticAngle::HeadLift, value)].into_iter().collect()
    }

    #[test]
    fn keeps_the_newest_entries() {
        let recorder = Recorder::new(2);
        for v in [0.1, 0.2, 0.3] {
            recorder.update(&pose(v)).unwrap();
        }
        let values: Vec<_> = recorder
            .snapshot()
            .iter()
            .map(|r| r.angles.get(RoboticAngle::HeadLift).unwrap())
            .collect();
        assert_eq!(values, vec![0.2, 0.3]);
        assert_eq!(recorder.latest().unwrap().angles, pose(0.3));
    }

    #[test]
    fn timestamps_are_monotonic() {
        let recorder = Recorder::new(8);
        recorder.update(&pose(0.0)).unwrap();
        recorder
            .update(&AngleSet::neutral(ServoControllerKind::Marionette))
            .unwrap();
        let entries = recorder.snapshot();
        assert!(entries[0].at <= entries[1].at);
    }

    #[test]
    fn zero_capacity_still_records_one() {
        let recorder = Recorder::new(0);
        assert_eq!(recorder.capacity(), 1);
        assert!(recorder.is_empty());
        recorder.update(&pose(1.0)).unwrap();
        recorder.update(&pose(2.0)).unwrap();
        assert_eq!(recorder.len(), 1);

        recorder.clear();
        assert!(recorder.latest().is_none());
    }
}
