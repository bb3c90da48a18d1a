//! Stale-response guard
//!
//! A view owns a [`ViewScope`]; async continuations carry a [`ViewGuard`]
//! and check it before touching shared state. Closing or dropping the scope
//! turns every outstanding guard inactive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Lifetime marker owned by a mounted view
#[derive(Debug)]
pub struct ViewScope {
    active: Arc<AtomicBool>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewScope {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Hand a guard to an async continuation
    pub fn guard(&self) -> ViewGuard {
        ViewGuard {
            active: Arc::clone(&self.active),
        }
    }

    /// The view went away
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cheap handle checked by continuations before mutating state
#[derive(Clone, Debug)]
pub struct ViewGuard {
    active: Arc<AtomicBool>,
}

impl ViewGuard {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
