//! Exact edge-graph builder
//!
//! Two bitmaps over heap slots:
//! - ROOT: everything reachable from the true root set;
//! - REF: everything reached from the current export slot, cleared after
//!   each slot.
//!
//! A ROOT-marked object is never entered from an export slot: whatever it
//! reaches is already covered by `"root"`. This is also why root-reachable
//! export slots have no entry of their own.
//!
//! Cost is one trace per live export slot, bounded by the ROOT cut.

use super::{BuildOptions, EdgeGraph};
use crate::error::Result;
use crate::marker::{MarkBitmap, ObjectGraph, Tracer};
use crate::object::ObjId;
use crate::tables::{ExportTable, ImportIndex, ImportTable};
use rustc_hash::FxHashMap;

/// Build the exact edge graph of `graph`
///
/// Every reported edge is real and no real edge is missing. Successor
/// lists are in discovery order.
pub fn simply_make<G>(
    graph: &G,
    exports: &ExportTable,
    imports: &ImportTable,
    options: &BuildOptions,
) -> Result<EdgeGraph>
where
    G: ObjectGraph + ?Sized,
{
    let live_proxies = imports.live_proxies(graph);
    let mut proxies: FxHashMap<ObjId, ImportIndex> = FxHashMap::default();
    proxies.try_reserve(live_proxies.len())?;
    proxies.extend(live_proxies.iter().map(|&(j, proxy)| (proxy, j)));

    let mut tracer = Tracer::with_capacity(graph, options.opaque, options.queue_capacity);

    // ROOT
    let mut root_marks = MarkBitmap::new(graph.slot_capacity());
    tracer.offer_roots(|id| root_marks.mark(id.slot()))?;
    tracer.drain(|_, child| root_marks.mark(child.slot()))?;

    let mut result = EdgeGraph::new();
    result.root = live_proxies
        .iter()
        .filter(|(_, proxy)| root_marks.is_marked(proxy.slot()))
        .map(|&(j, _)| j)
        .collect();

    // REF, once per export slot
    let mut ref_marks = MarkBitmap::new(graph.slot_capacity());
    for (i, obj) in exports.live_objects() {
        let mut successors = Vec::new();
        tracer.trace_from(Some(obj), |id| {
            if root_marks.is_marked(id.slot()) || !ref_marks.mark(id.slot()) {
                return false;
            }
            if let Some(&j) = proxies.get(&id) {
                successors.push(j);
            }
            true
        })?;
        ref_marks.clear();
        result.insert(i, successors);
    }

    log::debug!(
        "exact edge graph: {} roots, {} keys, {} edges",
        result.root_count(),
        result.edges.len(),
        result.edge_count()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;
    use crate::object::{ClassId, Value};
    use crate::tables::ExportIndex;

    fn sorted(xs: Option<&[ImportIndex]>) -> Vec<u32> {
        let mut v: Vec<u32> = xs.unwrap_or_default().iter().map(|j| j.0).collect();
        v.sort_unstable();
        v
    }

    #[test]
    fn test_export_reaching_proxies() {
        let mut heap = Heap::new();
        let mut exports = ExportTable::new();
        let mut imports = ImportTable::new();
        let p0 = imports.import(&mut heap, ImportIndex(0)).unwrap();
        let p1 = imports.import(&mut heap, ImportIndex(1)).unwrap();
        let inner = heap.alloc_plain(vec![Value::Ref(p1)]);
        let obj = heap.alloc_plain(vec![Value::Ref(p0), Value::Ref(inner)]);
        exports.export(obj).unwrap();

        let graph = simply_make(&heap, &exports, &imports, &BuildOptions::default()).unwrap();
        assert!(graph.root.is_empty());
        assert_eq!(sorted(graph.successors(ExportIndex(0))), vec![0, 1]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_rooted_export_has_no_entry() {
        let mut heap = Heap::new();
        let mut exports = ExportTable::new();
        let mut imports = ImportTable::new();
        let p0 = imports.import(&mut heap, ImportIndex(0)).unwrap();
        let obj = heap.alloc_plain(vec![Value::Ref(p0)]);
        heap.add_root(obj);
        exports.export(obj).unwrap();

        let graph = simply_make(&heap, &exports, &imports, &BuildOptions::default()).unwrap();
        assert_eq!(graph.root, vec![ImportIndex(0)]);
        assert_eq!(graph.successors(ExportIndex(0)), None);
    }

    #[test]
    fn test_opaque_wrapper_hides_proxy() {
        let mut heap = Heap::new();
        let mut exports = ExportTable::new();
        let mut imports = ImportTable::new();
        let p0 = imports.import(&mut heap, ImportIndex(0)).unwrap();
        let hidden = heap.alloc_object(ClassId::HIDDEN_REF, vec![Value::Ref(p0)]);
        let obj = heap.alloc_plain(vec![Value::Ref(hidden)]);
        exports.export(obj).unwrap();

        let graph = simply_make(&heap, &exports, &imports, &BuildOptions::default()).unwrap();
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_weak_edge_not_followed() {
        let mut heap = Heap::new();
        let mut exports = ExportTable::new();
        let mut imports = ImportTable::new();
        let p0 = imports.import(&mut heap, ImportIndex(0)).unwrap();
        let weak = heap.alloc_weak(p0);
        let obj = heap.alloc_plain(vec![Value::Ref(weak)]);
        exports.export(obj).unwrap();

        let graph = simply_make(&heap, &exports, &imports, &BuildOptions::default()).unwrap();
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_cycle_through_export_terminates() {
        let mut heap = Heap::new();
        let mut exports = ExportTable::new();
        let mut imports = ImportTable::new();
        let p0 = imports.import(&mut heap, ImportIndex(0)).unwrap();
        let a = heap.alloc_plain(vec![Value::Ref(p0)]);
        let b = heap.alloc_plain(vec![Value::Ref(a)]);
        heap.push_field(a, Value::Ref(b)).unwrap();
        exports.export(a).unwrap();
        exports.export(b).unwrap();

        let graph = simply_make(&heap, &exports, &imports, &BuildOptions::default()).unwrap();
        assert_eq!(sorted(graph.successors(ExportIndex(0))), vec![0]);
        assert_eq!(sorted(graph.successors(ExportIndex(1))), vec![0]);
    }
}
