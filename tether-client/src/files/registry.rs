//! Transfer registry - the source of truth for active transfers
//!
//! One mutex guards the map of active transfers. Every operation is a plain
//! lookup, insert, or remove; no I/O ever happens while the lock is held.
//! Id allocation and insertion share a single critical section, so two
//! concurrent registrations can never produce a duplicate id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use rand::RngExt;

use tether_common::protocol::TransferId;

use super::transfer::ActiveTransfer;

/// Registry of currently active transfers, keyed by id
pub struct TransferRegistry {
    transfers: Mutex<HashMap<TransferId, Arc<ActiveTransfer>>>,
}

impl TransferRegistry {
    pub fn new() -> Self {
        Self {
            transfers: Mutex::new(HashMap::new()),
        }
    }

    /// Draw a random id that no active transfer currently uses
    ///
    /// Ids are positive and fit in 32 bits for friendlier display. Callers
    /// that go on to register must use [`register`](Self::register) instead;
    /// this is for one-shot error snapshots that never enter the registry.
    pub fn draw_id(&self) -> TransferId {
        let transfers = self.transfers.lock().expect("transfer registry poisoned");
        Self::free_id(&transfers)
    }

    fn free_id(transfers: &HashMap<TransferId, Arc<ActiveTransfer>>) -> TransferId {
        let mut rng = rand::rng();
        loop {
            let id = TransferId::new(rng.random_range(1..=u64::from(u32::MAX)));
            if !transfers.contains_key(&id) {
                return id;
            }
        }
    }

    /// Allocate a unique id and insert the transfer built from it
    ///
    /// The id draw and the insert happen under one lock acquisition.
    pub fn register<F>(&self, build: F) -> Arc<ActiveTransfer>
    where
        F: FnOnce(TransferId) -> ActiveTransfer,
    {
        let mut transfers = self.transfers.lock().expect("transfer registry poisoned");
        let id = Self::free_id(&transfers);
        let transfer = Arc::new(build(id));
        transfers.insert(id, Arc::clone(&transfer));
        transfer
    }

    pub fn find(&self, id: TransferId) -> Option<Arc<ActiveTransfer>> {
        self.transfers
            .lock()
            .expect("transfer registry poisoned")
            .get(&id)
            .cloned()
    }

    pub fn contains(&self, id: TransferId) -> bool {
        self.transfers
            .lock()
            .expect("transfer registry poisoned")
            .contains_key(&id)
    }

    /// Remove a transfer, returning it so the caller can close its handle
    ///
    /// Closing is async and therefore cannot happen under this sync lock;
    /// by the time `remove` returns the entry is invisible to every other
    /// component, so the caller-side close races with nothing.
    pub fn remove(&self, id: TransferId) -> Option<Arc<ActiveTransfer>> {
        self.transfers
            .lock()
            .expect("transfer registry poisoned")
            .remove(&id)
    }

    /// Atomically empty the registry, returning the former entries
    pub fn drain(&self) -> Vec<Arc<ActiveTransfer>> {
        self.transfers
            .lock()
            .expect("transfer registry poisoned")
            .drain()
            .map(|(_, transfer)| transfer)
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.transfers
            .lock()
            .expect("transfer registry poisoned")
            .len()
    }
}

impl Default for TransferRegistry {
    fn default() -> Self {
        Self::new()
    }
}
