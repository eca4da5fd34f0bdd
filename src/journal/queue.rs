//! Journal queue
//!
//! Appends entries and hands them out for replay.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use super::{JournalEntry, PendingWrite};

/// Ordered queue of writes waiting for the relational store
pub struct PendingJournal {
    entries: Mutex<VecDeque<JournalEntry>>,

    /// Next sequence number (atomic, lock-free)
    next_seq: AtomicU64,
}

impl PendingJournal {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Queue a write, returning its sequence number
    pub fn append(&self, write: PendingWrite) -> u64 {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        debug!(seq, kind = write.kind(), username = ?write.username(), "queued pending write");
        self.entries.lock().push_back(JournalEntry::new(seq, write));
        seq
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Copy of the queued entries, oldest first
    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// Oldest entry, left in place
    pub(crate) fn front(&self) -> Option<JournalEntry> {
        self.entries.lock().front().cloned()
    }

    /// Remove the oldest entry if it is still `seq`
    pub(crate) fn pop_if(&self, seq: u64) {
        let mut entries = self.entries.lock();
        if entries.front().map(|entry| entry.seq) == Some(seq) {
            entries.pop_front();
        }
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl Default for PendingJournal {
    fn default() -> Self {
        Self::new()
    }
}
