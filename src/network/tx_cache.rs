//! Synchronized flagged transaction cache
//!
//! Both ends of a relay connection maintain one of these per direction, in
//! lockstep: every admission and eviction follows deterministically from the
//! byte stream, so a two-byte external index names the same transaction on
//! both sides.
//!
//! Entries are ordered by a monotone insertion id; the index a peer sees is
//! `insertion_id - offset`, where `offset` counts entries removed so far.
//! Removing an entry renumbers the strictly-older side up by one and bumps
//! `offset`, which keeps the live indices dense and contiguous from zero and
//! makes the common FIFO-eviction path O(1).

use std::collections::HashMap;

struct CacheEntry {
    payload: Vec<u8>,
    flag: bool,
}

/// Bounded ordered set of `(payload, flag)` entries with stable, dense
/// external indices.
///
/// Identity is the payload bytes alone; the flag marks an entry as oversize
/// for quota accounting and never affects lookup. Overflow evicts strictly
/// oldest-first.
pub struct FlaggedTxCache {
    capacity: usize,
    /// payload -> insertion id
    ids: HashMap<Vec<u8>, u64>,
    /// insertion id -> entry; live ids are dense in `offset..offset + len`
    entries: HashMap<u64, CacheEntry>,
    offset: u64,
    next_id: u64,
    flag_count: usize,
}

impl FlaggedTxCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ids: HashMap::new(),
            entries: HashMap::new(),
            offset: 0,
            next_id: 0,
            flag_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of present entries whose flag is set.
    pub fn flag_count(&self) -> usize {
        self.flag_count
    }

    pub fn contains(&self, payload: &[u8]) -> bool {
        self.ids.contains_key(payload)
    }

    /// External index of a present payload, as the peer would name it.
    pub fn get_index(&self, payload: &[u8]) -> Option<usize> {
        self.ids.get(payload).map(|id| (id - self.offset) as usize)
    }

    /// Payload at an external index received from the peer.
    pub fn get_by_index(&self, index: usize) -> Option<&[u8]> {
        let id = self.offset.checked_add(index as u64)?;
        self.entries.get(&id).map(|entry| entry.payload.as_slice())
    }

    /// Append a payload, evicting oldest entries first if the cache is full.
    ///
    /// Returns false (and changes nothing) if the payload is already present.
    pub fn add(&mut self, payload: Vec<u8>, flag: bool) -> bool {
        if self.contains(&payload) {
            return false;
        }
        while self.len() >= self.capacity {
            self.evict_oldest();
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert(payload.clone(), id);
        self.entries.insert(id, CacheEntry { payload, flag });
        if flag {
            self.flag_count += 1;
        }
        true
    }

    /// Remove a payload. Silent no-op when absent.
    pub fn remove(&mut self, payload: &[u8]) {
        if let Some(id) = self.ids.remove(payload) {
            self.detach(id);
        }
    }

    fn evict_oldest(&mut self) {
        if let Some(entry) = self.entries.remove(&self.offset) {
            self.ids.remove(&entry.payload);
            if entry.flag {
                self.flag_count -= 1;
            }
        }
        self.offset += 1;
    }

    /// Drop the entry at `id` and restore index density by shifting every
    /// strictly-older entry up one id, then advancing `offset`. Entries newer
    /// than `id` keep their ids and end up one index lower, exactly matching
    /// the splice the peer performs.
    fn detach(&mut self, id: u64) {
        if let Some(entry) = self.entries.remove(&id) {
            if entry.flag {
                self.flag_count -= 1;
            }
        }
        let mut i = id;
        while i > self.offset {
            i -= 1;
            if let Some(entry) = self.entries.remove(&i) {
                if let Some(slot) = self.ids.get_mut(&entry.payload) {
                    *slot = i + 1;
                }
                self.entries.insert(i + 1, entry);
            }
        }
        self.offset += 1;
    }
}
