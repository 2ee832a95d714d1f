//! Reactive value primitives backing attribute containers.
//!
//! - [`Observable`]: A shared, version-tracked value holder with change
//!   notification via subscriber callbacks.
//! - [`Computed`]: A memoized value derived from an evaluation function.
//!   Dependencies read during evaluation are recorded through a
//!   [`Tracker`]; a change to any of them marks the value dirty.
//! - [`Subscription`]: Guard that unsubscribes its callback on drop.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order, after the lock on the
//!    value has been released, so callbacks may read the value again.
//! 3. Setting a value equal to the current value is a no-op (no version
//!    bump, no notifications).
//! 4. `Computed::get()` never returns a stale value.
//!
//! All types are `Send + Sync`. State sits behind `parking_lot::RwLock`,
//! which never poisons.

mod computed;
mod observable;

pub use computed::{Computed, Dependency, Tracker};
pub use observable::{Observable, Subscription};
