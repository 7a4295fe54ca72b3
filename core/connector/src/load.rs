//! FILENAME: core/connector/src/load.rs
//! PURPOSE: Tags in-flight loads so a late response cannot overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one fetch. Only the most recently issued token is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadToken(u64);

impl LoadToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct LoadTracker {
    latest: AtomicU64,
}

impl LoadTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a load; every earlier token becomes stale.
    pub fn begin(&self) -> LoadToken {
        LoadToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: LoadToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    pub fn latest(&self) -> Option<LoadToken> {
        match self.latest.load(Ordering::SeqCst) {
            0 => None,
            n => Some(LoadToken(n)),
        }
    }
}
