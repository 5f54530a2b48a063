//! Typed publish/subscribe primitives.
//!
//! A [`Provider<T>`] fans each value out to an ordered list of registered
//! [`Consumer<T>`]s, gated by an active flag. Pipeline stages that receive one
//! type and re-publish another implement both [`Consumer<In>`] and
//! [`Publisher<Out>`]; [`ProviderConsumer`] names that combination.
//!
//! # Concurrency
//!
//! Producers call [`Provider::send`] from their own threads (a sensor driver's
//! frame callback, for example) while the orchestrator rewires the pipeline
//! from the command thread. Every provider serialises delivery and wiring
//! mutation behind one mutex, so a consumer is never added, removed or
//! deactivated halfway through a fan-out.
//!
//! A consumer must not rewire the provider that is currently delivering to it.
//!
//! # Delivery
//!
//! | Provider state | `send` behaviour |
//! |---|---|
//! | inactive | value dropped, `Ok(0)` |
//! | active, no consumers | value dropped, `Ok(0)` |
//! | active | every consumer updated once, in registration order |
//!
//! A failing consumer does not stop delivery to the ones after it; all
//! failures come back together as [`RoboNuiError::Delivery`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use robonui_types::RoboNuiError;
use tracing::{trace, warn};

/// Receives values from a [`Provider`].
pub trait Consumer<T>: Send + Sync {
    /// Consume one value. Implementations may update internal state and/or
    /// re-publish derived values.
    ///
    /// # Errors
    ///
    /// Any domain error; the provider reports it to its caller without
    /// interrupting delivery to other consumers.
    fn update(&self, value: &T) -> Result<(), RoboNuiError>;
}

/// Identity of a registered consumer: the address of the shared allocation.
fn same_consumer<T>(a: &Arc<dyn Consumer<T>>, b: &Arc<dyn Consumer<T>>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// ────────────────────────────────────────────────────────────────────────────
// Provider
// ────────────────────────────────────────────────────────────────────────────

struct ProviderState<T> {
    consumers: Vec<Arc<dyn Consumer<T>>>,
    active: bool,
}

/// Fan-out of `T` values to registered consumers.
///
/// Concrete producers embed a `Provider` and expose it through
/// [`Publisher`]; only the owning producer calls [`send`][Provider::send].
pub struct Provider<T> {
    name: String,
    state: Mutex<ProviderState<T>>,
}

impl<T> Provider<T> {
    /// Create an inactive provider with no consumers. `name` is used in logs.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ProviderState {
                consumers: Vec::new(),
                active: false,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) -> MutexGuard<'_, ProviderState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `consumer` to the delivery list. Duplicates are permitted and
    /// receive one delivery per registration.
    pub fn add_consumer(&self, consumer: Arc<dyn Consumer<T>>) {
        self.lock().consumers.push(consumer);
    }

    /// Remove the first registration of `consumer`. Returns whether one was
    /// found.
    pub fn remove_consumer(&self, consumer: &Arc<dyn Consumer<T>>) -> bool {
        let mut state = self.lock();
        match state.consumers.iter().position(|c| same_consumer(c, consumer)) {
            Some(index) => {
                state.consumers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear_all_consumers(&self) {
        self.lock().consumers.clear();
    }

    /// Allow delivery. Idempotent.
    pub fn activate(&self) {
        self.lock().active = true;
    }

    /// Stop delivery. Values sent while inactive are dropped, not queued.
    pub fn deactivate(&self) {
        self.lock().active = false;
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn consumer_count(&self) -> usize {
        self.lock().consumers.len()
    }

    /// Number of registrations of `consumer`.
    pub fn registrations_of(&self, consumer: &Arc<dyn Consumer<T>>) -> usize {
        self.lock()
            .consumers
            .iter()
            .filter(|c| same_consumer(c, consumer))
            .count()
    }

    /// Deliver `value` to every consumer in registration order.
    ///
    /// Returns the number of consumers that accepted the value. Holds the
    /// provider's lock for the whole fan-out.
    ///
    /// # Errors
    ///
    /// [`RoboNuiError::Delivery`] listing every consumer failure, after all
    /// consumers have been offered the value.
    pub fn send(&self, value: &T) -> Result<usize, RoboNuiError> {
        let state = self.lock();
        if !state.active {
            trace!(provider = %self.name, "inactive; value dropped");
            return Ok(0);
        }

        let mut delivered = 0;
        let mut failures = Vec::new();
        for consumer in &state.consumers {
            match consumer.update(value) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(provider = %self.name, error = %e, "consumer update failed");
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            Ok(delivered)
        } else {
            Err(RoboNuiError::Delivery { failures })
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Publisher
// ────────────────────────────────────────────────────────────────────────────

/// Wiring interface of anything that publishes `T` through a [`Provider`].
///
/// This is the view the orchestrator holds: it can register consumers and
/// toggle delivery but never produces values itself.
pub trait Publisher<T>: Send + Sync {
    /// The embedded provider.
    fn provider(&self) -> &Provider<T>;

    fn add_consumer(&self, consumer: Arc<dyn Consumer<T>>) {
        self.provider().add_consumer(consumer);
    }

    fn remove_consumer(&self, consumer: &Arc<dyn Consumer<T>>) -> bool {
        self.provider().remove_consumer(consumer)
    }

    fn clear_all_consumers(&self) {
        self.provider().clear_all_consumers();
    }

    fn activate(&self) {
        self.provider().activate();
    }

    fn deactivate(&self) {
        self.provider().deactivate();
    }

    fn is_active(&self) -> bool {
        self.provider().is_active()
    }
}

impl<T> Publisher<T> for Provider<T> {
    fn provider(&self) -> &Provider<T> {
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Provider + Consumer combinator
// ────────────────────────────────────────────────────────────────────────────

/// A pipeline stage: consumes `In`, publishes `Out`.
pub trait ProviderConsumer<In, Out>: Consumer<In> + Publisher<Out> {}

impl<In, Out, S> ProviderConsumer<In, Out> for S where S: Consumer<In> + Publisher<Out> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    // ------------------------------------------------------------------
    // Test doubles
    // ------------------------------------------------------------------

    /// Records every value it receives, tagged with its own label, into a
    /// log that may be shared between several consumers.
    struct Recording {
        label: &'static str,
        log: Arc<Mutex<Vec<(&'static str, i32)>>>,
    }

    impl Consumer<i32> for Recording {
        fn update(&self, value: &i32) -> Result<(), RoboNuiError> {
            self.log.lock().unwrap().push((self.label, *value));
            Ok(())
        }
    }

    struct Failing;

    impl Consumer<i32> for Failing {
        fn update(&self, _value: &i32) -> Result<(), RoboNuiError> {
            Err(RoboNuiError::MissingModel)
        }
    }

    type Log = Arc<Mutex<Vec<(&'static str, i32)>>>;

    fn recording(label: &'static str, log: &Log) -> Arc<dyn Consumer<i32>> {
        Arc::new(Recording {
            label,
            log: log.clone(),
        })
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[test]
    fn new_provider_is_inactive_and_empty() {
        let provider: Provider<i32> = Provider::new("test");
        assert!(!provider.is_active());
        assert_eq!(provider.consumer_count(), 0);
        assert_eq!(provider.send(&1).unwrap(), 0);
    }

    #[test]
    fn active_send_delivers_once_each_in_registration_order() {
        let log = Log::default();
        let provider = Provider::new("test");
        provider.add_consumer(recording("a", &log));
        provider.add_consumer(recording("b", &log));
        provider.add_consumer(recording("c", &log));
        provider.activate();

        assert_eq!(provider.send(&42).unwrap(), 3);
        assert_eq!(*log.lock().unwrap(), vec![("a", 42), ("b", 42), ("c", 42)]);
    }

    #[test]
    fn inactive_send_drops_value() {
        let log = Log::default();
        let provider = Provider::new("test");
        provider.add_consumer(recording("a", &log));

        assert_eq!(provider.send(&1).unwrap(), 0);
        provider.activate();
        provider.deactivate();
        assert_eq!(provider.send(&2).unwrap(), 0);

        // Nothing was queued while inactive.
        provider.activate();
        provider.send(&3).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![("a", 3)]);
    }

    #[test]
    fn double_activate_does_not_double_deliver() {
        let log = Log::default();
        let provider = Provider::new("test");
        provider.add_consumer(recording("a", &log));
        provider.activate();
        provider.activate();

        provider.send(&5).unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_registration_delivers_per_registration() {
        let log = Log::default();
        let consumer = recording("dup", &log);
        let provider = Provider::new("test");
        provider.add_consumer(consumer.clone());
        provider.add_consumer(consumer.clone());
        provider.activate();

        assert_eq!(provider.registrations_of(&consumer), 2);
        assert_eq!(provider.send(&9).unwrap(), 2);
    }

    #[test]
    fn remove_consumer_removes_first_instance_only() {
        let log = Log::default();
        let a = recording("a", &log);
        let b = recording("b", &log);
        let provider = Provider::new("test");
        provider.add_consumer(a.clone());
        provider.add_consumer(b.clone());
        provider.add_consumer(a.clone());
        provider.activate();

        assert!(provider.remove_consumer(&a));
        provider.send(&1).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![("b", 1), ("a", 1)]);

        let stranger = recording("x", &log);
        assert!(!provider.remove_consumer(&stranger));
    }

    #[test]
    fn clear_all_consumers_empties_the_list() {
        let log = Log::default();
        let provider = Provider::new("test");
        provider.add_consumer(recording("a", &log));
        provider.add_consumer(recording("b", &log));
        provider.clear_all_consumers();
        provider.activate();

        assert_eq!(provider.send(&1).unwrap(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_consumer_does_not_block_the_rest() {
        let log = Log::default();
        let provider = Provider::new("test");
        provider.add_consumer(recording("before", &log));
        provider.add_consumer(Arc::new(Failing));
        provider.add_consumer(recording("after", &log));
        provider.add_consumer(Arc::new(Failing));
        provider.activate();

        let err = provider.send(&7).unwrap_err();
        match err {
            RoboNuiError::Delivery { failures } => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(*log.lock().unwrap(), vec![("before", 7), ("after", 7)]);
    }

    #[test]
    fn publisher_view_wires_the_embedded_provider() {
        let log = Log::default();
        let provider = Provider::new("test");
        let view: &dyn Publisher<i32> = &provider;
        view.add_consumer(recording("a", &log));
        view.activate();
        assert!(view.is_active());

        provider.send(&3).unwrap();
        view.clear_all_consumers();
        provider.send(&4).unwrap();
        assert_eq!(*log.lock().unwrap(), vec![("a", 3)]);
    }

    #[test]
    fn concurrent_send_and_rewire_never_double_delivers() {
        let log = Log::default();
        let provider = Arc::new(Provider::new("contended"));
        let consumer = recording("c", &log);
        provider.activate();

        let sender = {
            let provider = provider.clone();
            thread::spawn(move || {
                for i in 0..2_000 {
                    let _ = provider.send(&i);
                }
            })
        };

        for _ in 0..2_000 {
            provider.add_consumer(consumer.clone());
            assert_eq!(provider.registrations_of(&consumer), 1);
            provider.clear_all_consumers();
        }
        sender.join().unwrap();

        // Each value was delivered at most once.
        let log = log.lock().unwrap();
        let mut values: Vec<i32> = log.iter().map(|(_, v)| *v).collect();
        let total = values.len();
        values.dedup();
        assert_eq!(values.len(), total);
    }
}
