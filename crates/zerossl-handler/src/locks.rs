//! Per-domain enrollment locks.

use crate::cache::DomainSet;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

type Slot = Arc<AsyncMutex<()>>;

/// Serializes enrollments that share a domain.
///
/// Locks are taken in the sorted order of the [`DomainSet`], so two
/// overlapping sets can never wait on each other in a cycle.
#[derive(Debug, Default)]
pub struct DomainLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

/// Held locks of one domain set, released on drop.
#[derive(Debug)]
pub struct DomainGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl DomainLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock of every domain in `domains`.
    pub async fn acquire(&self, domains: &DomainSet) -> DomainGuard {
        let slots: Vec<Slot> = {
            let mut table = self.table();
            // unused slots are only referenced by the table
            table.retain(|_, slot| Arc::strong_count(slot) > 1);
            domains
                .names()
                .iter()
                .map(|name| Arc::clone(table.entry(name.clone()).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(slots.len());
        for slot in slots {
            guards.push(slot.lock_owned().await);
        }

        trace!(domains = %domains, "Domain locks acquired");
        DomainGuard { _guards: guards }
    }

    /// Number of domains with a live lock slot.
    pub fn tracked(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
