//! Circular table of in-flight bundles awaiting acknowledgment.
//!
//! Slots are addressed by custody id modulo the table size, so lookup,
//! insertion, and removal are O(1). Two monotone counters bound the window
//! of outstanding CIDs: `oldest_cid` trails behind acknowledgments and
//! retransmissions, `newest_cid` is the next id to hand out. Both are plain
//! `u64`s that never wrap; only the slot index is reduced modulo the size.

use bp6_core::types::BpVal;
use bp6_storage::Sid;

/// One in-flight bundle: where it lives in storage, when it was last
/// transmitted, and the custody id it carries on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveBundle {
    pub sid: Sid,
    pub retx: BpVal,
    pub cid: BpVal,
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ActiveTableError {
    #[error("custody id {0} is already tracked")]
    DuplicateCid(BpVal),

    #[error("slot for custody id {cid} is held by custody id {occupant}")]
    SlotOccupied { cid: BpVal, occupant: BpVal },
}

/// Fixed-capacity circular ledger of in-flight bundles.
#[derive(Debug)]
pub struct ActiveTable {
    slots: Vec<Option<ActiveBundle>>,
    occupied: usize,
    oldest_cid: BpVal,
    newest_cid: BpVal,
}

impl ActiveTable {
    /// Custody ids start at 1; id 0 is never assigned.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![None; size.max(1)],
            occupied: 0,
            oldest_cid: 1,
            newest_cid: 1,
        }
    }

    fn index(&self, cid: BpVal) -> usize {
        (cid % self.slots.len() as u64) as usize
    }

    /// Track a bundle at the slot its CID maps to.
    ///
    /// Without `overwrite`, an occupied slot is an error — a matching CID is
    /// a duplicate, a differing CID means the window wrapped onto an
    /// unacknowledged bundle. Successful non-overwriting adds move
    /// `newest_cid` past the added CID.
    pub fn add(&mut self, bundle: ActiveBundle, overwrite: bool) -> Result<(), ActiveTableError> {
        let i = self.index(bundle.cid);
        if !overwrite {
            if let Some(existing) = self.slots[i] {
                if existing.cid == bundle.cid {
                    return Err(ActiveTableError::DuplicateCid(bundle.cid));
                }
                return Err(ActiveTableError::SlotOccupied {
                    cid: bundle.cid,
                    occupant: existing.cid,
                });
            }
        }
        if self.slots[i].is_none() {
            self.occupied += 1;
        }
        self.slots[i] = Some(bundle);
        if !overwrite {
            self.newest_cid = bundle.cid + 1;
        }
        Ok(())
    }

    /// The oldest tracked bundle, skipping `oldest_cid` past vacated slots.
    pub fn next(&mut self) -> Option<ActiveBundle> {
        while self.oldest_cid != self.newest_cid {
            let i = self.index(self.oldest_cid);
            match self.slots[i] {
                Some(bundle) => return Some(bundle),
                None => self.oldest_cid += 1,
            }
        }
        None
    }

    /// Stop tracking `cid`. Fails silently (returns `None`) when the slot is
    /// vacant or holds a different CID.
    pub fn remove(&mut self, cid: BpVal) -> Option<ActiveBundle> {
        let i = self.index(cid);
        match self.slots[i] {
            Some(bundle) if bundle.cid == cid => {
                self.slots[i] = None;
                self.occupied -= 1;
                Some(bundle)
            }
            _ => None,
        }
    }

    /// Whether the slot `cid` maps to is free to take a new entry.
    pub fn available(&self, cid: BpVal) -> bool {
        self.slots[self.index(cid)].is_none()
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.occupied
    }

    // ------------------------------------------------------------------ //
    // Window surface used by the channel engine
    // ------------------------------------------------------------------ //

    pub fn oldest_cid(&self) -> BpVal {
        self.oldest_cid
    }

    pub fn newest_cid(&self) -> BpVal {
        self.newest_cid
    }

    /// Slide the window past the oldest CID.
    pub fn advance_oldest(&mut self) {
        self.oldest_cid += 1;
    }

    /// Whatever occupies the slot `cid` maps to, matching or not.
    pub fn occupant(&self, cid: BpVal) -> Option<ActiveBundle> {
        self.slots[self.index(cid)]
    }

    /// Refresh the retransmit timestamp of a tracked bundle.
    pub fn touch(&mut self, cid: BpVal, retx: BpVal) -> bool {
        let i = self.index(cid);
        match self.slots[i] {
            Some(ref mut bundle) if bundle.cid == cid => {
                bundle.retx = retx;
                true
            }
            _ => false,
        }
    }

    /// Empty every slot, closing the window. Returns the number of entries
    /// dropped; `drop_entry` sees each one before it goes.
    pub fn drain(&mut self, mut drop_entry: impl FnMut(ActiveBundle)) -> usize {
        let mut dropped = 0;
        for slot in &mut self.slots {
            if let Some(bundle) = slot.take() {
                drop_entry(bundle);
                dropped += 1;
            }
        }
        self.occupied = 0;
        self.oldest_cid = self.newest_cid;
        dropped
    }
}
