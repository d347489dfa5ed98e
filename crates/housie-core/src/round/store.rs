// Round state store: holds the current snapshot and notifies subscribers.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use super::snapshot::RoundSnapshot;

pub type SnapshotReceiver = watch::Receiver<Option<Arc<RoundSnapshot>>>;

/// Single-writer holder of the current `RoundSnapshot`.
///
/// Only the controller writes. Readers subscribe and see each replacement
/// as soon as `replace` returns.
pub struct RoundStore {
    tx: watch::Sender<Option<Arc<RoundSnapshot>>>,
    retired: bool,
}

impl RoundStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        RoundStore { tx, retired: false }
    }

    pub fn get(&self) -> Option<Arc<RoundSnapshot>> {
        self.tx.borrow().clone()
    }

    /// Swap in a new snapshot. Refused once the store has been retired, so a
    /// result that lands after unmount is dropped.
    pub fn replace(&mut self, snapshot: RoundSnapshot) -> bool {
        if self.retired {
            debug!("Dropping snapshot for retired round store");
            return false;
        }
        self.tx.send_replace(Some(Arc::new(snapshot)));
        true
    }

    /// Forget the snapshot (start of a remount).
    pub fn clear(&mut self) {
        if !self.retired {
            self.tx.send_replace(None);
        }
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }

    /// Mark the owning view as gone. Subscribers keep the last value.
    pub fn retire(&mut self) {
        self.retired = true;
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

impl Default for RoundStore {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
