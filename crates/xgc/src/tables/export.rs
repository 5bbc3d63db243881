//! Export Table - local objects reachable from the peer
//!
//! Slot lifecycle:
//! ```text
//!            export(obj)               unlink
//!   Free ───────────────▶ Live(obj) ─────────▶ Detached
//!    ▲                      │  ▲                 │
//!    │      release         │  └──── repair ─────┘
//!    └──────────────────────┘         or re-export
//! ```
//! A `Detached` slot is one the collection manager severed: the table no
//! longer holds the object, but the slot number stays reserved so a later
//! repair can put the same object back at the same index.
//!
//! A slot released by the peer while detached is quarantined rather than
//! reused: a repair record made before the release may still name it, and
//! handing the slot to a new object would make that record look broken.
//! Quarantined slots join the free list when the next repair pass ends.

use super::ExportIndex;
use crate::error::Result;
use crate::object::ObjId;
use rustc_hash::FxHashMap;
use xgc_util::IndexVec;

/// State of one export slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportSlot {
    /// Unused; never traced
    Free,
    /// Severed by Unlink, awaiting repair or re-export
    Detached,
    /// Holds a strong reference
    Live(ObjId),
}

/// Export table with reverse index
#[derive(Debug, Clone, Default)]
pub struct ExportTable {
    slots: IndexVec<ExportIndex, ExportSlot>,

    /// Reverse index: object -> slot, for live slots only
    index_of: FxHashMap<ObjId, ExportIndex>,

    /// Free slots ready for reuse (stack)
    free: Vec<ExportIndex>,

    /// Released while detached; freed at the end of the next repair
    quarantine: Vec<ExportIndex>,

    /// Objects severed by the last Unlink, by identity
    unlinked: Option<FxHashMap<ObjId, ExportIndex>>,

    /// Set once the collection manager has taken over `export`
    overrides_installed: bool,
}

impl ExportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of slots ever allocated
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: ExportIndex) -> Option<ExportSlot> {
        self.slots.get(index).copied()
    }

    /// Object in a live slot
    pub fn object(&self, index: ExportIndex) -> Option<ObjId> {
        match self.slots.get(index) {
            Some(ExportSlot::Live(obj)) => Some(*obj),
            _ => None,
        }
    }

    /// Slot currently holding `obj`
    pub fn index_of(&self, obj: ObjId) -> Option<ExportIndex> {
        self.index_of.get(&obj).copied()
    }

    /// Export `obj`, returning its slot
    ///
    /// Once overrides are installed, an object severed by the last Unlink
    /// is first reinstated at its old slot if that slot is still detached.
    /// If the slot was meanwhile reused the object gets a fresh slot.
    pub fn export(&mut self, obj: ObjId) -> Result<ExportIndex> {
        if self.overrides_installed {
            if let Some(index) = self.find_unlinked(obj) {
                return Ok(index);
            }
        }
        if let Some(index) = self.index_of(obj) {
            return Ok(index);
        }

        self.index_of.try_reserve(1)?;
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.try_reserve(1)?;
                self.slots.push(ExportSlot::Free)
            }
        };
        self.slots[index] = ExportSlot::Live(obj);
        self.index_of.insert(obj, index);
        Ok(index)
    }

    /// Reinstate `obj` if the last Unlink severed it
    fn find_unlinked(&mut self, obj: ObjId) -> Option<ExportIndex> {
        let index = self.unlinked.as_mut()?.remove(&obj)?;
        match self.slots.get(index).copied() {
            Some(ExportSlot::Detached) => {
                self.restore(index, obj);
                log::trace!("re-export reinstated {} at {}", obj, index);
                Some(index)
            }
            Some(ExportSlot::Live(current)) if current == obj => Some(index),
            // already reused
            _ => None,
        }
    }

    /// Sever a live slot; returns the object it held
    pub fn detach(&mut self, index: ExportIndex) -> Option<ObjId> {
        let obj = self.object(index)?;
        self.slots[index] = ExportSlot::Detached;
        self.index_of.remove(&obj);
        Some(obj)
    }

    /// Put `obj` back into `index`
    pub fn restore(&mut self, index: ExportIndex, obj: ObjId) {
        self.slots.ensure_contains(index, || ExportSlot::Free);
        self.slots[index] = ExportSlot::Live(obj);
        self.index_of.insert(obj, index);
    }

    /// Return a slot to the free list after the peer dropped its proxy
    ///
    /// Returns the object the slot held, if it was live.
    pub fn release(&mut self, index: ExportIndex) -> Option<ObjId> {
        match self.slots.get(index).copied()? {
            ExportSlot::Live(obj) => {
                self.slots[index] = ExportSlot::Free;
                self.index_of.remove(&obj);
                self.free.push(index);
                Some(obj)
            }
            ExportSlot::Detached => {
                self.slots[index] = ExportSlot::Free;
                self.quarantine.push(index);
                None
            }
            ExportSlot::Free => None,
        }
    }

    /// Reinstate the object the last Unlink severed from `index`
    ///
    /// Used when the peer hands slot `index` back while it is detached.
    /// Returns `None` if the slot is not detached or no pending Unlink
    /// covers it.
    pub fn reinstate_unlinked(&mut self, index: ExportIndex) -> Option<ObjId> {
        if self.slot(index) != Some(ExportSlot::Detached) {
            return None;
        }
        let unlinked = self.unlinked.as_mut()?;
        let obj = unlinked
            .iter()
            .find_map(|(&obj, &at)| (at == index).then_some(obj))?;
        unlinked.remove(&obj);
        self.restore(index, obj);
        log::trace!("returned slot {} reinstated {}", index, obj);
        Some(obj)
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    pub fn live_objects(&self) -> impl Iterator<Item = (ExportIndex, ObjId)> + '_ {
        self.slots.iter_enumerated().filter_map(|(i, slot)| match slot {
            ExportSlot::Live(obj) => Some((i, *obj)),
            _ => None,
        })
    }

    pub fn live_indices(&self) -> Vec<ExportIndex> {
        self.live_objects().map(|(i, _)| i).collect()
    }

    pub fn detached_indices(&self) -> Vec<ExportIndex> {
        self.slots
            .iter_enumerated()
            .filter(|(_, slot)| **slot == ExportSlot::Detached)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.index_of.len()
    }

    // ========================================================================
    // Unlink bookkeeping
    // ========================================================================

    /// Record the objects severed by an Unlink pass
    pub fn set_unlinked(&mut self, unlinked: FxHashMap<ObjId, ExportIndex>) {
        self.unlinked = Some(unlinked);
    }

    pub fn unlinked_len(&self) -> usize {
        self.unlinked.as_ref().map_or(0, |m| m.len())
    }

    /// Forget the last Unlink and free quarantined slots
    pub fn finish_repair(&mut self) {
        self.unlinked = None;
        self.free.append(&mut self.quarantine);
    }

    pub fn install_overrides(&mut self) {
        self.overrides_installed = true;
    }

    pub fn overrides_installed(&self) -> bool {
        self.overrides_installed
    }
}
