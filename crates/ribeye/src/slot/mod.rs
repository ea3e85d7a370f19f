//! Capacity-bounded, mutex-guarded resource slots.
//!
//! Two families:
//! - `DisposableSlot` (weight or piece): one generation of stock. Killed when
//!   superseded; a killed slot never mutates again.
//! - `PackSlot`: reusable collection of concrete entries with a version that
//!   moves by exactly one per committed mutation.
//!
//! Mutation happens inside a single critical section per slot and never
//! suspends while holding the lock.

mod disposable;
mod pack;

use std::sync::{Arc, Mutex, MutexGuard};

pub use disposable::DisposableSlot;
pub use pack::PackSlot;

/// A slot as held by storage.
#[derive(Clone)]
pub enum Slot {
    Disposable(Arc<DisposableSlot>),
    Pack(Arc<PackSlot>),
}

/// Lock a slot mutex. On poison: log and keep going with the inner state,
/// which is only ever mutated by infallible in-memory code.
pub(crate) fn lock_slot<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!("Slot mutex poisoned - recovering inner state");
            poisoned.into_inner()
        }
    }
}
