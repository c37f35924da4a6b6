//! At-most-once admission of account identities
//!
//! Two sets live behind one lock so that the membership check and the
//! in-flight insert are a single atomic step:
//!
//! - **known**: identities that were seen and finished (accepted, filtered
//!   out, malformed, or seeded by reconciliation). Grows for the lifetime of
//!   the process; there is no eviction.
//! - **in-flight**: identities currently owned by one handler invocation.
//!
//! [`Admission`] is the RAII form of `try_begin`: it must be resolved with
//! `commit()` or `release()`, and a dropped admission releases itself so an
//! identity is never stranded in-flight.

use parking_lot::Mutex;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct Sets {
    known: HashSet<Pubkey>,
    in_flight: HashSet<Pubkey>,
}

/// Process-lifetime dedup state shared by every listing handler
#[derive(Debug, Default)]
pub struct DedupTracker {
    sets: Mutex<Sets>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit `id` if it is neither known nor in flight
    pub fn try_begin(&self, id: &Pubkey) -> bool {
        let mut sets = self.sets.lock();
        if sets.known.contains(id) || sets.in_flight.contains(id) {
            return false;
        }
        sets.in_flight.insert(*id);
        true
    }

    /// Move `id` from in-flight to known (idempotent)
    pub fn commit_known(&self, id: &Pubkey) {
        let mut sets = self.sets.lock();
        sets.in_flight.remove(id);
        sets.known.insert(*id);
    }

    /// Drop `id` from in-flight without marking it known
    pub fn release(&self, id: &Pubkey) {
        self.sets.lock().in_flight.remove(id);
    }

    /// Mark pre-existing accounts as known; returns how many were new
    ///
    /// Identities currently in flight are left alone: their handler decides
    /// the final state.
    pub fn seed_known<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = Pubkey>,
    {
        let mut sets = self.sets.lock();
        let mut added = 0;
        for id in ids {
            if sets.in_flight.contains(&id) {
                continue;
            }
            if sets.known.insert(id) {
                added += 1;
            }
        }
        debug!(added, known = sets.known.len(), "Seeded known accounts");
        added
    }

    pub fn is_known(&self, id: &Pubkey) -> bool {
        self.sets.lock().known.contains(id)
    }

    pub fn is_in_flight(&self, id: &Pubkey) -> bool {
        self.sets.lock().in_flight.contains(id)
    }

    pub fn known_len(&self) -> usize {
        self.sets.lock().known.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.sets.lock().in_flight.len()
    }

    /// RAII variant of [`Self::try_begin`]
    pub fn admit(self: &Arc<Self>, id: Pubkey) -> Option<Admission> {
        if self.try_begin(&id) {
            Some(Admission {
                tracker: Arc::clone(self),
                id,
                resolved: false,
            })
        } else {
            None
        }
    }
}

/// How an admitted identity left the in-flight set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Committed,
    Released,
}

/// Exclusive ownership of one in-flight identity
#[derive(Debug)]
pub struct Admission {
    tracker: Arc<DedupTracker>,
    id: Pubkey,
    resolved: bool,
}

impl Admission {
    pub fn id(&self) -> &Pubkey {
        &self.id
    }

    pub fn resolve(mut self, resolution: Resolution) {
        match resolution {
            Resolution::Committed => self.tracker.commit_known(&self.id),
            Resolution::Released => self.tracker.release(&self.id),
        }
        self.resolved = true;
    }

    pub fn commit(self) {
        self.resolve(Resolution::Committed);
    }

    pub fn release(self) {
        self.resolve(Resolution::Released);
    }
}

impl Drop for Admission {
    fn drop(&mut self) {
        if !self.resolved {
            debug!(account = %self.id, "Admission dropped unresolved, releasing");
            self.tracker.release(&self.id);
        }
    }
}
