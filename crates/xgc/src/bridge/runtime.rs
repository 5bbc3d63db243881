//! Runtime - one side of a bridge
//!
//! A runtime owns a heap and its two reference tables. Values cross the
//! bridge as [`WireValue`]s: an object is exported on the sending side and
//! imported on the receiving side, except that a proxy sent back to its
//! owner travels as the owner's own slot number.

use crate::config::GraphMode;
use crate::error::{Result, XgcError};
use crate::graph::{make_by_batch_propagation, simply_make, BuildOptions, EdgeGraph};
use crate::heap::{CollectOutcome, Heap};
use crate::object::{ObjId, Value};
use crate::tables::{ExportIndex, ExportSlot, ExportTable, ImportIndex, ImportTable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A value in transit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireValue {
    Nil,
    Int(i64),
    /// Sender's export slot; the receiver imports it
    Exported(u32),
    /// Receiver's own export slot, sent back through a proxy
    Returned(u32),
}

/// Planned repair: slot restores plus the proxies whose records are spent
#[derive(Debug, Default)]
pub(crate) struct RepairPlan {
    pub restores: IndexMap<ExportIndex, ObjId>,
    pub proxies: Vec<ObjId>,
}

/// Runtime - heap plus export and import tables
#[derive(Debug, Default)]
pub struct Runtime {
    name: String,
    pub(crate) heap: Heap,
    pub(crate) exports: ExportTable,
    pub(crate) imports: ImportTable,
}

impl Runtime {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    pub fn exports(&self) -> &ExportTable {
        &self.exports
    }

    pub fn exports_mut(&mut self) -> &mut ExportTable {
        &mut self.exports
    }

    pub fn imports(&self) -> &ImportTable {
        &self.imports
    }

    pub fn imports_mut(&mut self) -> &mut ImportTable {
        &mut self.imports
    }

    /// Export and import tables, for graph builders and inspection
    pub fn tables(&self) -> (&ExportTable, &ImportTable) {
        (&self.exports, &self.imports)
    }

    pub fn export(&mut self, obj: ObjId) -> Result<ExportIndex> {
        if !self.heap.is_alive(obj) {
            return Err(XgcError::InvalidHandle(format!("{}: cannot export dead {}", self.name, obj)));
        }
        self.exports.export(obj)
    }

    /// Proxy for peer export slot `index`
    pub fn import(&mut self, index: ImportIndex) -> Result<ObjId> {
        self.imports.import(&mut self.heap, index)
    }

    // ========================================================================
    // Wire conversion
    // ========================================================================

    /// Convert an outgoing value
    pub fn encode(&mut self, value: Value) -> Result<WireValue> {
        match value {
            Value::Nil => Ok(WireValue::Nil),
            Value::Int(n) => Ok(WireValue::Int(n)),
            Value::Ref(obj) if self.heap.proxy(obj).is_some() => {
                let remote_id = self.export_remote_ref(obj)?;
                Ok(WireValue::Returned(remote_id.0))
            }
            Value::Ref(obj) => Ok(WireValue::Exported(self.export(obj)?.0)),
        }
    }

    /// Convert an incoming value
    pub fn decode(&mut self, wire: WireValue) -> Result<Value> {
        match wire {
            WireValue::Nil => Ok(Value::Nil),
            WireValue::Int(n) => Ok(Value::Int(n)),
            WireValue::Exported(i) => Ok(Value::Ref(self.import(ImportIndex(i))?)),
            WireValue::Returned(i) => {
                let index = ExportIndex(i);
                if self.exports.slot(index) == Some(ExportSlot::Detached)
                    && self.exports.reinstate_unlinked(index).is_none()
                {
                    self.repair_all()?;
                }
                self.exports.object(index).map(Value::Ref).ok_or_else(|| {
                    XgcError::InvalidHandle(format!("{}: export slot {} is not live", self.name, index))
                })
            }
        }
    }

    /// Hand a proxy back to its owner
    ///
    /// Any repair record on the proxy is applied first, so the slots it
    /// kept alive are live again before the owner sees the reference.
    pub fn export_remote_ref(&mut self, proxy: ObjId) -> Result<ImportIndex> {
        let remote_id = self
            .remote_id(proxy)
            .ok_or_else(|| XgcError::InvalidHandle(format!("{}: {} is not a proxy", self.name, proxy)))?;
        self.repair_proxy(proxy)?;
        Ok(remote_id)
    }

    // ========================================================================
    // Proxy accessors
    // ========================================================================

    /// The proxy itself, if `obj` is a live proxy
    pub fn self_reference(&self, obj: ObjId) -> Option<ObjId> {
        self.heap.proxy(obj).map(|_| obj)
    }

    /// Peer export slot a proxy stands for
    pub fn remote_id(&self, obj: ObjId) -> Option<ImportIndex> {
        self.heap.proxy(obj).map(|data| data.remote_id)
    }

    // ========================================================================
    // Reference bookkeeping
    // ========================================================================

    /// Import slots whose proxy has been collected locally
    pub fn dead_references(&self) -> Vec<ImportIndex> {
        self.imports.dead_references(&self.heap)
    }

    /// Clear zombie import slots and return them for the peer to release
    pub fn scavenge_references(&mut self) -> Vec<ImportIndex> {
        self.imports.scavenge(&self.heap)
    }

    /// Release export slots the peer no longer references
    pub fn release_exports(&mut self, indices: &[ExportIndex]) -> usize {
        let released = indices
            .iter()
            .filter(|&&index| self.exports.slot(index).map_or(false, |s| s != ExportSlot::Free))
            .count();
        for &index in indices {
            self.exports.release(index);
        }
        log::debug!("{}: released {} export slots", self.name, released);
        released
    }

    /// Run the native collector; live export slots are roots
    pub fn native_gc(&mut self) -> CollectOutcome {
        let roots: Vec<ObjId> = self.exports.live_objects().map(|(_, obj)| obj).collect();
        self.heap.collect(&roots)
    }

    /// Build this side's edge graph
    pub fn build_edge_graph(&self, mode: GraphMode, options: &BuildOptions) -> Result<EdgeGraph> {
        match mode {
            GraphMode::Exact => simply_make(&self.heap, &self.exports, &self.imports, options),
            GraphMode::Approximate => {
                make_by_batch_propagation(&self.heap, &self.exports, &self.imports, options)
            }
        }
    }

    // ========================================================================
    // Repair
    // ========================================================================

    /// Plan restores for the records held by `proxies`
    ///
    /// Fails without side effects if a recorded slot now holds another
    /// object. Released slots are skipped.
    pub(crate) fn plan_repair(&self, proxies: impl IntoIterator<Item = ObjId>) -> Result<RepairPlan> {
        let mut plan = RepairPlan::default();
        for proxy in proxies {
            let Some(record) = self.heap.proxy(proxy).and_then(|data| data.record.as_ref()) else {
                continue;
            };
            plan.proxies.push(proxy);
            for (&index, &obj) in record.indexes.iter().zip(&record.objects) {
                match self.exports.slot(index) {
                    Some(ExportSlot::Detached) => match plan.restores.get(&index) {
                        Some(&planned) if planned != obj => {
                            return Err(XgcError::BrokenExportIndex { index: index.into() });
                        }
                        _ => {
                            plan.restores.insert(index, obj);
                        }
                    },
                    Some(ExportSlot::Live(current)) if current == obj => {}
                    Some(ExportSlot::Live(_)) => {
                        return Err(XgcError::BrokenExportIndex { index: index.into() });
                    }
                    Some(ExportSlot::Free) | None => {}
                }
            }
        }
        Ok(plan)
    }

    pub(crate) fn commit_repair(&mut self, plan: RepairPlan) -> usize {
        for (&index, &obj) in &plan.restores {
            self.exports.restore(index, obj);
            log::trace!("{}: repaired export slot {} -> {}", self.name, index, obj);
        }
        for proxy in plan.proxies {
            if let Some(data) = self.heap.proxy_mut(proxy) {
                data.record = None;
            }
        }
        plan.restores.len()
    }

    /// Apply one proxy's repair record
    pub fn repair_proxy(&mut self, proxy: ObjId) -> Result<usize> {
        let plan = self.plan_repair(Some(proxy))?;
        Ok(self.commit_repair(plan))
    }

    /// Apply the records of every live proxy and close the unlink window
    pub fn repair_all(&mut self) -> Result<usize> {
        let proxies = self.imports.live_proxies(&self.heap).into_iter().map(|(_, p)| p);
        let plan = self.plan_repair(proxies)?;
        let repaired = self.commit_repair(plan);
        self.exports.finish_repair();
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::RepairRecord;

    fn with_record(rt: &mut Runtime, indexes: &[u32], objects: &[ObjId]) -> ObjId {
        let proxy = rt.import(ImportIndex(0)).unwrap();
        rt.heap.add_root(proxy);
        rt.heap.proxy_mut(proxy).unwrap().record = Some(RepairRecord {
            indexes: indexes.iter().copied().map(ExportIndex).collect(),
            objects: objects.to_vec(),
        });
        proxy
    }

    #[test]
    fn test_encode_decode_objects() {
        let mut a = Runtime::new("a");
        let mut b = Runtime::new("b");
        let obj = a.heap.alloc_plain(vec![]);

        let wire = a.encode(Value::Ref(obj)).unwrap();
        assert_eq!(wire, WireValue::Exported(0));
        let proxy = b.decode(wire).unwrap().as_obj().unwrap();
        assert_eq!(b.remote_id(proxy), Some(ImportIndex(0)));
        assert_eq!(b.self_reference(proxy), Some(proxy));

        let back = b.encode(Value::Ref(proxy)).unwrap();
        assert_eq!(back, WireValue::Returned(0));
        assert_eq!(a.decode(back).unwrap(), Value::Ref(obj));

        assert_eq!(a.encode(Value::Int(3)).unwrap(), WireValue::Int(3));
        assert_eq!(b.decode(WireValue::Nil).unwrap(), Value::Nil);
    }

    #[test]
    fn test_decode_returned_free_slot_is_invalid() {
        let mut a = Runtime::new("a");
        assert!(matches!(
            a.decode(WireValue::Returned(4)),
            Err(XgcError::InvalidHandle(_))
        ));
    }

    #[test]
    fn test_decode_returned_unlinked_slot_reinstates() {
        let mut rt = Runtime::new("remote");
        let obj = rt.heap.alloc_plain(vec![]);
        rt.heap.add_root(obj);
        let i = rt.export(obj).unwrap();
        rt.exports.detach(i);
        let mut unlinked = rustc_hash::FxHashMap::default();
        unlinked.insert(obj, i);
        rt.exports.set_unlinked(unlinked);

        assert_eq!(rt.decode(WireValue::Returned(i.0)).unwrap(), Value::Ref(obj));
        assert_eq!(rt.exports.slot(i), Some(ExportSlot::Live(obj)));
        assert_eq!(rt.exports.index_of(obj), Some(i));
    }

    #[test]
    fn test_repair_proxy_restores_detached() {
        let mut rt = Runtime::new("remote");
        let obj = rt.heap.alloc_plain(vec![]);
        let i = rt.export(obj).unwrap();
        rt.exports.detach(i);
        let proxy = with_record(&mut rt, &[i.0], &[obj]);

        assert_eq!(rt.repair_proxy(proxy).unwrap(), 1);
        assert_eq!(rt.exports.object(i), Some(obj));
        assert!(rt.heap.proxy(proxy).unwrap().record.is_none());
    }

    #[test]
    fn test_repair_detects_reused_slot() {
        let mut rt = Runtime::new("remote");
        let obj = rt.heap.alloc_plain(vec![]);
        let other = rt.heap.alloc_plain(vec![]);
        let i = rt.export(obj).unwrap();
        rt.exports.detach(i);
        rt.exports.restore(i, other);
        let proxy = with_record(&mut rt, &[i.0], &[obj]);

        let err = rt.repair_proxy(proxy).unwrap_err();
        assert!(matches!(err, XgcError::BrokenExportIndex { index: 0 }));
        // nothing applied
        assert!(rt.heap.proxy(proxy).unwrap().record.is_some());
        assert_eq!(rt.exports.object(i), Some(other));
    }

    #[test]
    fn test_repair_skips_released_slot() {
        let mut rt = Runtime::new("remote");
        let obj = rt.heap.alloc_plain(vec![]);
        let i = rt.export(obj).unwrap();
        rt.exports.detach(i);
        rt.exports.release(i);
        with_record(&mut rt, &[i.0], &[obj]);

        assert_eq!(rt.repair_all().unwrap(), 0);
        assert_eq!(rt.exports.slot(i), Some(ExportSlot::Free));
    }

    #[test]
    fn test_native_gc_keeps_exports_and_records() {
        let mut rt = Runtime::new("remote");
        let exported = rt.heap.alloc_plain(vec![]);
        let recorded = rt.heap.alloc_plain(vec![]);
        let garbage = rt.heap.alloc_plain(vec![]);
        rt.export(exported).unwrap();
        let i = rt.export(recorded).unwrap();
        rt.exports.detach(i);
        with_record(&mut rt, &[i.0], &[recorded]);

        let outcome = rt.native_gc();
        assert_eq!(outcome.freed, 1);
        assert!(rt.heap.is_alive(exported));
        assert!(rt.heap.is_alive(recorded));
        assert!(!rt.heap.is_alive(garbage));
    }

    #[test]
    fn test_release_exports_counts_occupied_slots() {
        let mut rt = Runtime::new("local");
        let a = rt.heap.alloc_plain(vec![]);
        let b = rt.heap.alloc_plain(vec![]);
        let ia = rt.export(a).unwrap();
        let ib = rt.export(b).unwrap();
        rt.exports.detach(ib);
        assert_eq!(rt.release_exports(&[ia, ib, ExportIndex(9)]), 2);
        assert_eq!(rt.exports.live_count(), 0);
    }
}
