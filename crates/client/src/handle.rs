//! Lazily-populated, memoized slot for a sub-client.
//!
//! Each handle carries its own mutex, so unrelated services never contend.
//! The initializer runs with the lock released; concurrent callers wait on
//! the condvar until the slot leaves `Initializing`. A failed or panicking
//! initializer puts the slot back to `Uninitialized` so a later call retries.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

enum HandleState<T> {
    Uninitialized,
    Initializing,
    Initialized(Arc<T>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleStatus {
    Uninitialized,
    Initializing,
    Initialized,
}

pub struct ServiceHandle<T> {
    state: Mutex<HandleState<T>>,
    ready: Condvar,
}

impl<T> Default for ServiceHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for ServiceHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ServiceHandle").field(&self.status()).finish()
    }
}

impl<T> ServiceHandle<T> {
    pub const fn new() -> Self {
        Self { state: Mutex::new(HandleState::Uninitialized), ready: Condvar::new() }
    }

    pub fn status(&self) -> HandleStatus {
        match &*self.lock() {
            HandleState::Uninitialized => HandleStatus::Uninitialized,
            HandleState::Initializing => HandleStatus::Initializing,
            HandleState::Initialized(_) => HandleStatus::Initialized,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.status() == HandleStatus::Initialized
    }

    /// Current instance, without waiting or initializing.
    pub fn get(&self) -> Option<Arc<T>> {
        match &*self.lock() {
            HandleState::Initialized(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Wait out any in-flight initialization, then return the instance if one exists.
    pub fn settle(&self) -> Option<Arc<T>> {
        let mut state = self.lock();
        while matches!(*state, HandleState::Initializing) {
            state = self.ready.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        match &*state {
            HandleState::Initialized(value) => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Return the memoized instance, running `init` if the slot is empty.
    ///
    /// At most one `init` runs at a time per handle; on `Err` the slot is left
    /// `Uninitialized` and the error is returned to this caller only.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let mut state = self.lock();
        loop {
            if let HandleState::Initialized(value) = &*state {
                return Ok(Arc::clone(value));
            }
            if matches!(*state, HandleState::Initializing) {
                state = self.ready.wait(state).unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            break;
        }
        *state = HandleState::Initializing;
        drop(state);

        let guard = InitGuard { handle: self, finished: false };
        match init() {
            Ok(value) => {
                let value = Arc::new(value);
                guard.finish(HandleState::Initialized(Arc::clone(&value)));
                Ok(value)
            }
            Err(e) => {
                guard.finish(HandleState::Uninitialized);
                Err(e)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HandleState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, next: HandleState<T>) {
        *self.lock() = next;
        self.ready.notify_all();
    }
}

/// Resets the slot if the initializer unwinds.
struct InitGuard<'a, T> {
    handle: &'a ServiceHandle<T>,
    finished: bool,
}

impl<T> InitGuard<'_, T> {
    fn finish(mut self, next: HandleState<T>) {
        self.finished = true;
        self.handle.publish(next);
    }
}

impl<T> Drop for InitGuard<'_, T> {
    fn drop(&mut self) {
        if !self.finished {
            self.handle.publish(HandleState::Uninitialized);
        }
    }
}
