//! Import Table - weak handles to peer objects
//!
//! Slot `j` holds a weak reference to the local proxy for the peer's export
//! slot `j`. The table never keeps a proxy alive; once the local collector
//! frees it the slot is a zombie until [`ImportTable::scavenge`] clears it
//! and the index is reported back to the peer for release.

use super::ImportIndex;
use crate::error::Result;
use crate::heap::Heap;
use crate::marker::ObjectGraph;
use crate::object::{ObjId, WeakRef};
use xgc_util::IndexVec;

/// State of one import slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportSlot {
    Empty,
    /// Primitive placeholder; never dereferenced
    Reserved(i64),
    Weak(WeakRef),
}

#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    slots: IndexVec<ImportIndex, ImportSlot>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: ImportIndex) -> Option<ImportSlot> {
        self.slots.get(index).copied()
    }

    /// Proxy for peer export slot `index`, creating it if needed
    pub fn import(&mut self, heap: &mut Heap, index: ImportIndex) -> Result<ObjId> {
        if let Some(proxy) = self.get(heap, index) {
            return Ok(proxy);
        }
        let needed = (usize::from(index) + 1).saturating_sub(self.slots.len());
        self.slots.try_reserve(needed)?;
        self.slots.ensure_contains(index, || ImportSlot::Empty);

        let proxy = heap.alloc_proxy(index)?;
        self.slots[index] = ImportSlot::Weak(WeakRef::new(proxy));
        log::trace!("imported peer slot {} as {}", index, proxy);
        Ok(proxy)
    }

    /// Live proxy in slot `index`
    pub fn get<G: ObjectGraph + ?Sized>(&self, graph: &G, index: ImportIndex) -> Option<ObjId> {
        match self.slots.get(index)? {
            ImportSlot::Weak(weak) => weak.get(graph),
            _ => None,
        }
    }

    /// Overwrite slot `index` with a primitive
    pub fn set_reserved(&mut self, index: ImportIndex, value: i64) {
        self.slots.ensure_contains(index, || ImportSlot::Empty);
        self.slots[index] = ImportSlot::Reserved(value);
    }

    /// Every slot whose proxy is still alive, in slot order
    pub fn live_proxies<G: ObjectGraph + ?Sized>(&self, graph: &G) -> Vec<(ImportIndex, ObjId)> {
        self.slots
            .iter_enumerated()
            .filter_map(|(i, slot)| match slot {
                ImportSlot::Weak(weak) => weak.get(graph).map(|p| (i, p)),
                _ => None,
            })
            .collect()
    }

    /// Zombie slots: the proxy has been collected locally
    pub fn dead_references<G: ObjectGraph + ?Sized>(&self, graph: &G) -> Vec<ImportIndex> {
        self.slots
            .iter_enumerated()
            .filter_map(|(i, slot)| match slot {
                ImportSlot::Weak(weak) if weak.get(graph).is_none() => Some(i),
                _ => None,
            })
            .collect()
    }

    /// Clear zombie slots and return their indices
    pub fn scavenge<G: ObjectGraph + ?Sized>(&mut self, graph: &G) -> Vec<ImportIndex> {
        let dead = self.dead_references(graph);
        for &index in &dead {
            self.slots[index] = ImportSlot::Empty;
        }
        dead
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_reuses_live_proxy() {
        let mut heap = Heap::new();
        let mut table = ImportTable::new();
        let p = table.import(&mut heap, ImportIndex(3)).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.import(&mut heap, ImportIndex(3)).unwrap(), p);
        assert_eq!(heap.proxy(p).map(|d| d.remote_id), Some(ImportIndex(3)));
        assert_eq!(table.slot(ImportIndex(0)), Some(ImportSlot::Empty));
    }

    #[test]
    fn test_zombie_and_scavenge() {
        let mut heap = Heap::new();
        let mut table = ImportTable::new();
        let kept = table.import(&mut heap, ImportIndex(0)).unwrap();
        table.import(&mut heap, ImportIndex(1)).unwrap();
        heap.add_root(kept);
        heap.collect(&[]);

        assert_eq!(table.dead_references(&heap), vec![ImportIndex(1)]);
        assert_eq!(table.live_proxies(&heap), vec![(ImportIndex(0), kept)]);
        assert_eq!(table.scavenge(&heap), vec![ImportIndex(1)]);
        assert!(table.dead_references(&heap).is_empty());
        assert_eq!(table.slot(ImportIndex(1)), Some(ImportSlot::Empty));
    }

    #[test]
    fn test_reimport_after_collection_creates_new_proxy() {
        let mut heap = Heap::new();
        let mut table = ImportTable::new();
        let old = table.import(&mut heap, ImportIndex(0)).unwrap();
        heap.collect(&[]);
        let new = table.import(&mut heap, ImportIndex(0)).unwrap();
        assert_ne!(old, new);
        assert!(heap.is_alive(new));
    }

    #[test]
    fn test_reserved_slot_is_not_live() {
        let mut heap = Heap::new();
        let mut table = ImportTable::new();
        table.import(&mut heap, ImportIndex(0)).unwrap();
        table.set_reserved(ImportIndex(0), -1);
        assert_eq!(table.get(&heap, ImportIndex(0)), None);
        assert!(table.live_proxies(&heap).is_empty());
        assert!(table.dead_references(&heap).is_empty());
    }
}
