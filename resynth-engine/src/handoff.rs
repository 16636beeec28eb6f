//! Lock-free snapshot hand-off between control threads and the audio thread.
//!
//! Writers build a complete new value and swap it in atomically; the reader
//! only ever sees a whole old value or a whole new one. `ArcSwap::load` is
//! wait-free for the reader, so the audio thread never blocks on a writer.

use std::sync::Arc;

use arc_swap::{ArcSwap, Guard};

#[derive(Debug)]
pub struct Snapshot<T> {
    cell: ArcSwap<T>,
}

impl<T> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Self { cell: ArcSwap::from_pointee(value) }
    }

    /// Replace the current value.
    #[inline]
    pub fn publish(&self, value: T) {
        self.cell.store(Arc::new(value));
    }

    /// Read-modify-write. `f` may run more than once if writers race, so it
    /// must be pure. Returns the value that was replaced.
    #[inline]
    pub fn update<F>(&self, mut f: F) -> Arc<T>
    where
        F: FnMut(&T) -> T,
    {
        self.cell.rcu(|cur| Arc::new(f(&**cur)))
    }

    /// Borrow the current value. Keep the guard short-lived on the audio thread.
    #[inline]
    pub fn load(&self) -> Guard<Arc<T>> {
        self.cell.load()
    }

    #[inline]
    pub fn load_full(&self) -> Arc<T> {
        self.cell.load_full()
    }
}

impl<T: Copy> Snapshot<T> {
    /// Copy out the current value.
    #[inline]
    pub fn get(&self) -> T {
        **self.cell.load()
    }
}
