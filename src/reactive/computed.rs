//! Memoized derived values with dependency tracking.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use super::observable::Callback;
use super::{Observable, Subscription};

type Evaluate<T> = Box<dyn Fn(&mut Tracker) -> T + Send + Sync>;
type Write<T> = Box<dyn Fn(T) + Send + Sync>;
type OnChange = Arc<dyn Fn() + Send + Sync>;

/// A source a [`Computed`] can depend on.
pub trait Dependency: Send + Sync {
    /// Stable identity used to de-duplicate dependencies.
    fn identity(&self) -> usize;

    /// Runs `on_change` whenever the source changes.
    fn watch(&self, on_change: OnChange) -> Subscription;
}

impl<T> Dependency for Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn identity(&self) -> usize {
        self.address()
    }

    fn watch(&self, on_change: OnChange) -> Subscription {
        self.subscribe(move |_| on_change())
    }
}

impl<T> Dependency for Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    fn identity(&self) -> usize {
        Arc::as_ptr(&self.shared).cast::<()>() as usize
    }

    fn watch(&self, on_change: OnChange) -> Subscription {
        self.subscribe(move |_| on_change())
    }
}

/// Records the dependencies read while evaluating a [`Computed`].
#[derive(Default)]
pub struct Tracker {
    dependencies: Vec<Box<dyn Dependency>>,
}

impl Tracker {
    /// Records `dependency`; repeated reads of the same source count once.
    pub fn track(&mut self, dependency: impl Dependency + 'static) {
        let identity = dependency.identity();
        if self.dependencies.iter().all(|d| d.identity() != identity) {
            self.dependencies.push(Box::new(dependency));
        }
    }

    /// Returns the number of distinct dependencies recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    fn watch(self, on_change: &OnChange) -> Vec<Subscription> {
        self.dependencies
            .iter()
            .map(|dependency| dependency.watch(Arc::clone(on_change)))
            .collect()
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

struct State<T> {
    cached: Option<T>,
    dirty: bool,
    version: u64,
    dependencies: Vec<Subscription>,
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

struct Shared<T> {
    state: RwLock<State<T>>,
    evaluate: Evaluate<T>,
    write: Option<Write<T>>,
}

/// A value computed from other reactive values.
///
/// Evaluation is lazy: the function runs on the first [`get`](Self::get) and
/// again only after a recorded dependency changed. While the computed has
/// subscribers, a dependency change re-evaluates eagerly and notifies them
/// if the result differs.
///
/// # Example
///
/// ```rust
/// use reactive_resource::reactive::{Computed, Observable};
///
/// let first = Observable::new("Ada".to_string());
/// let last = Observable::new("Lovelace".to_string());
///
/// let (f, l) = (first.clone(), last.clone());
/// let full = Computed::new(move |tracker| {
///     tracker.track(f.clone());
///     tracker.track(l.clone());
///     format!("{} {}", f.get(), l.get())
/// });
///
/// assert_eq!(full.get(), "Ada Lovelace");
/// last.set("Byron".to_string());
/// assert_eq!(full.get(), "Ada Byron");
/// ```
pub struct Computed<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Creates a read-only computed value.
    pub fn new(evaluate: impl Fn(&mut Tracker) -> T + Send + Sync + 'static) -> Self {
        Self::build(Box::new(evaluate), None)
    }

    /// Creates a computed value whose writes are forwarded to `write`.
    pub fn with_writer(
        evaluate: impl Fn(&mut Tracker) -> T + Send + Sync + 'static,
        write: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self::build(Box::new(evaluate), Some(Box::new(write)))
    }

    fn build(evaluate: Evaluate<T>, write: Option<Write<T>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(State {
                    cached: None,
                    dirty: true,
                    version: 0,
                    dependencies: Vec::new(),
                    next_id: 0,
                    subscribers: Vec::new(),
                }),
                evaluate,
                write,
            }),
        }
    }

    /// Returns the current value, re-evaluating if a dependency changed.
    #[must_use]
    pub fn get(&self) -> T {
        {
            let state = self.shared.state.read();
            if !state.dirty {
                if let Some(value) = &state.cached {
                    return value.clone();
                }
            }
        }
        self.refresh()
    }

    /// Returns `true` if writes are accepted.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.shared.write.is_some()
    }

    /// Forwards `value` to the writer.
    ///
    /// Returns `false` without doing anything if the computed is read-only.
    pub fn set(&self, value: T) -> bool {
        match &self.shared.write {
            Some(write) => {
                write(value);
                true
            }
            None => false,
        }
    }

    /// Marks the value stale so the next read re-evaluates.
    pub fn invalidate(&self) {
        self.dependency_changed();
    }

    /// Returns the number of times the computed value changed.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.shared.state.read().version
    }

    /// Registers `callback` to run with the new value after every change.
    ///
    /// Subscribing evaluates the value so its dependencies are tracked.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let _ = self.get();

        let id = {
            let mut state = self.shared.state.write();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, Arc::new(callback)));
            id
        };

        let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared
                    .state
                    .write()
                    .subscribers
                    .retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Returns `true` if both handles point to the same computed value.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn refresh(&self) -> T {
        let mut tracker = Tracker::default();
        let value = (self.shared.evaluate)(&mut tracker);

        let weak = Arc::downgrade(&self.shared);
        let on_change: OnChange = Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                Self { shared }.dependency_changed();
            }
        });
        let subscriptions = tracker.watch(&on_change);

        let stale = {
            let mut state = self.shared.state.write();
            if state.cached.as_ref() != Some(&value) {
                state.version += 1;
            }
            state.cached = Some(value.clone());
            state.dirty = false;
            std::mem::replace(&mut state.dependencies, subscriptions)
        };
        drop(stale);

        value
    }

    fn dependency_changed(&self) {
        let (previous, callbacks): (Option<T>, Vec<Callback<T>>) = {
            let mut state = self.shared.state.write();
            state.dirty = true;
            (
                state.cached.clone(),
                state
                    .subscribers
                    .iter()
                    .map(|(_, callback)| Arc::clone(callback))
                    .collect(),
            )
        };

        if callbacks.is_empty() {
            return;
        }

        let value = self.refresh();
        if previous.as_ref() != Some(&value) {
            for callback in callbacks {
                callback(&value);
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.read();
        f.debug_struct("Computed")
            .field("cached", &state.cached)
            .field("dirty", &state.dirty)
            .field("writable", &self.shared.write.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn doubled(source: &Observable<i32>, runs: &Arc<AtomicUsize>) -> Computed<i32> {
        let source = source.clone();
        let runs = Arc::clone(runs);
        Computed::new(move |tracker| {
            runs.fetch_add(1, Ordering::SeqCst);
            tracker.track(source.clone());
            source.get() * 2
        })
    }

    #[test]
    fn test_get_is_memoized_until_dependency_changes() {
        let source = Observable::new(2);
        let runs = Arc::new(AtomicUsize::new(0));
        let computed = doubled(&source, &runs);

        assert_eq!(computed.get(), 4);
        assert_eq!(computed.get(), 4);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        source.set(5);
        assert_eq!(computed.get(), 10);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscribers_see_recomputed_value() {
        let source = Observable::new(1);
        let runs = Arc::new(AtomicUsize::new(0));
        let computed = doubled(&source, &runs);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _s = computed.subscribe(move |v: &i32| sink.lock().unwrap().push(*v));

        source.set(3);
        source.set(4);
        assert_eq!(*seen.lock().unwrap(), vec![6, 8]);
    }

    #[test]
    fn test_unchanged_result_does_not_notify() {
        let source = Observable::new(3);
        let parity = {
            let source = source.clone();
            Computed::new(move |tracker| {
                tracker.track(source.clone());
                source.get() % 2
            })
        };

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _s = parity.subscribe(move |_: &i32| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        source.set(5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        source.set(6);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chained_computed_values() {
        let source = Observable::new(1);
        let runs = Arc::new(AtomicUsize::new(0));
        let inner = doubled(&source, &runs);
        let outer = {
            let inner = inner.clone();
            Computed::new(move |tracker| {
                tracker.track(inner.clone());
                inner.get() + 1
            })
        };

        assert_eq!(outer.get(), 3);
        source.set(10);
        assert_eq!(outer.get(), 21);
    }

    #[test]
    fn test_writer_receives_writes() {
        let source = Observable::new(0);
        let computed = {
            let (read_source, write_source) = (source.clone(), source.clone());
            Computed::with_writer(
                move |tracker| {
                    tracker.track(read_source.clone());
                    read_source.get()
                },
                move |value| {
                    write_source.set(value);
                },
            )
        };

        assert!(computed.is_writable());
        assert!(computed.set(9));
        assert_eq!(source.get(), 9);
        assert_eq!(computed.get(), 9);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let computed = Computed::new(|_| 1);
        assert!(!computed.is_writable());
        assert!(!computed.set(2));
        assert_eq!(computed.get(), 1);
    }

    #[test]
    fn test_tracker_deduplicates_dependencies() {
        let source = Observable::new(1);
        let mut tracker = Tracker::default();
        tracker.track(source.clone());
        tracker.track(source.clone());
        assert_eq!(tracker.len(), 1);
    }
}
