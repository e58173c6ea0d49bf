//! Per-block dependents and their thread-safe registry.
//!
//! A [`Dependent`] is notified at the start of every block, before the
//! graph's user update hook and before any output is pulled. The
//! scheduler, property animators and tempo clocks are all dependents.
//!
//! The registry is written from control threads and read from the audio
//! thread, so it keeps the list in an [`ArcSwap`]: the audio thread loads
//! a consistent snapshot wait-free, writers swap in a new list via RCU
//! and never block the reader.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::time::SampleClock;

/// An object notified once per block from the audio thread.
///
/// Implementations are shared (`Arc`) between the registering thread and
/// the audio thread; mutable state lives behind interior mutability that
/// is uncontended in steady state (atomics or a `parking_lot` mutex only
/// the audio thread locks).
pub trait Dependent: Send + Sync {
    /// Called when the dependent is added to a graph.
    fn attach(&self) {}

    /// Called when the dependent is removed from a graph.
    fn detach(&self) {}

    /// Called at the start of every block, in registration order.
    fn update(&self, clock: &SampleClock);
}

/// Registry of dependents attached to a graph.
///
/// Cloning the handle shares the registry; adds and removes are safe
/// from any thread and take effect at the next block boundary.
#[derive(Clone)]
pub struct Dependents {
    list: Arc<ArcSwap<Vec<Arc<dyn Dependent>>>>,
}

impl Default for Dependents {
    fn default() -> Self {
        Self::new()
    }
}

impl Dependents {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            list: Arc::new(ArcSwap::from_pointee(Vec::new())),
        }
    }

    /// Appends a dependent and calls its [`attach`](Dependent::attach) hook.
    pub fn add(&self, dependent: Arc<dyn Dependent>) {
        dependent.attach();
        self.list.rcu(|list| {
            let mut next = Vec::with_capacity(list.len() + 1);
            next.extend(list.iter().cloned());
            next.push(dependent.clone());
            next
        });
    }

    /// Removes a dependent by identity and calls its
    /// [`detach`](Dependent::detach) hook. Removing an unregistered
    /// dependent is a no-op.
    pub fn remove(&self, dependent: &Arc<dyn Dependent>) {
        // Compare data pointers, not fat pointers: the same object can
        // carry distinct vtable pointers across codegen units.
        let target = Arc::as_ptr(dependent).cast::<()>();
        let mut removed = false;
        self.list.rcu(|list| {
            let next: Vec<_> = list
                .iter()
                .filter(|d| Arc::as_ptr(d).cast::<()>() != target)
                .cloned()
                .collect();
            removed = next.len() != list.len();
            next
        });
        if removed {
            dependent.detach();
        }
    }

    /// Number of registered dependents.
    pub fn len(&self) -> usize {
        self.list.load().len()
    }

    /// True when no dependents are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every dependent's update, in registration order.
    pub(crate) fn update_all(&self, clock: &SampleClock) {
        let snapshot = self.list.load();
        for dependent in snapshot.iter() {
            dependent.update(clock);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        updates: AtomicUsize,
        attached: AtomicUsize,
    }

    impl Counter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                updates: AtomicUsize::new(0),
                attached: AtomicUsize::new(0),
            })
        }
    }

    impl Dependent for Counter {
        fn attach(&self) {
            self.attached.fetch_add(1, Ordering::SeqCst);
        }
        fn detach(&self) {
            self.attached.fetch_sub(1, Ordering::SeqCst);
        }
        fn update(&self, _clock: &SampleClock) {
            self.updates.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn add_update_remove_lifecycle() {
        let deps = Dependents::new();
        let counter = Counter::new();
        let handle: Arc<dyn Dependent> = counter.clone();

        deps.add(handle.clone());
        assert_eq!(counter.attached.load(Ordering::SeqCst), 1);

        let clock = SampleClock::new(0, 48000.0, 64);
        deps.update_all(&clock);
        deps.update_all(&clock);
        assert_eq!(counter.updates.load(Ordering::SeqCst), 2);

        deps.remove(&handle);
        assert_eq!(counter.attached.load(Ordering::SeqCst), 0);
        deps.update_all(&clock);
        assert_eq!(counter.updates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn remove_unregistered_is_noop() {
        let deps = Dependents::new();
        let counter = Counter::new();
        let handle: Arc<dyn Dependent> = counter;
        deps.remove(&handle);
        assert!(deps.is_empty());
    }
}
