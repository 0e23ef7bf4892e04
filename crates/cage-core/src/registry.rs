//! Process-local registry mapping a caller's network address to its
//! assigned branch.
//!
//! Reads (one per `/git` request) must not block each other; writes (one
//! per pod lifecycle event) are rare. `std::sync::RwLock` gives readers
//! concurrent access and excludes them only briefly during a write, the
//! same primitive `skilllite-sandbox`'s `network_proxy` module uses to
//! share its filtering config across connections.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `caller_address` to `branch`, overwriting silently if already
    /// present.
    pub fn put(&self, caller_address: &str, branch: &str) {
        let mut guard = self.inner.write().expect("registry lock poisoned");
        guard.insert(caller_address.to_string(), branch.to_string());
    }

    /// Remove a binding. Returns the branch that was assigned, if any.
    pub fn delete(&self, caller_address: &str) -> Option<String> {
        let mut guard = self.inner.write().expect("registry lock poisoned");
        guard.remove(caller_address)
    }

    /// Look up the branch assigned to a caller.
    pub fn lookup(&self, caller_address: &str) -> Option<String> {
        let guard = self.inner.read().expect("registry lock poisoned");
        guard.get(caller_address).cloned()
    }

    /// Snapshot the full registry (diagnostic use only).
    pub fn list(&self) -> HashMap<String, String> {
        let guard = self.inner.read().expect("registry lock poisoned");
        guard.clone()
    }
}
