//! Ordered callback registry.
//!
//! Callbacks are keyed by a monotonically increasing handle. Since handles
//! only grow, iterating the map in key order is registration order, and a
//! handle is never handed out twice by the same registry.

use std::collections::BTreeMap;
use std::fmt;

/// Handle identifying a registered callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackHandle(u64);

impl CallbackHandle {
    /// Raw handle value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Callback<T> = Box<dyn FnMut() -> T + Send>;

/// A collection of zero-argument callbacks run in registration order.
pub struct CallbackRegistry<T> {
    callbacks: BTreeMap<CallbackHandle, Callback<T>>,
    next: u64,
}

impl<T> CallbackRegistry<T> {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            callbacks: BTreeMap::new(),
            next: 0,
        }
    }

    /// Register a callback and return its handle.
    pub fn register<F>(&mut self, callback: F) -> CallbackHandle
    where
        F: FnMut() -> T + Send + 'static,
    {
        let handle = CallbackHandle(self.next);
        self.next += 1;
        self.callbacks.insert(handle, Box::new(callback));
        handle
    }

    /// Remove a callback. Returns `false` if the handle was not registered.
    pub fn unregister(&mut self, handle: CallbackHandle) -> bool {
        self.callbacks.remove(&handle).is_some()
    }

    /// Whether `handle` is currently registered.
    #[must_use]
    pub fn contains(&self, handle: CallbackHandle) -> bool {
        self.callbacks.contains_key(&handle)
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Whether no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Run every callback in registration order and collect the results.
    ///
    /// A panicking callback unwinds out of this call; callbacks after it do
    /// not run.
    pub fn run_all(&mut self) -> Vec<T> {
        self.callbacks.values_mut().map(|callback| callback()).collect()
    }
}

impl<T, E> CallbackRegistry<Result<T, E>> {
    /// Run callbacks in registration order until one fails.
    ///
    /// Callbacks before the failing one have already run when the error is
    /// returned.
    pub fn try_run_all(&mut self) -> Result<Vec<T>, E> {
        self.callbacks.values_mut().map(|callback| callback()).collect()
    }
}

impl<T> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for CallbackRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.callbacks.len())
            .field("next", &self.next)
            .finish()
    }
}
