//! Approximate edge-graph builder (batch propagation)
//!
//! Every heap slot carries one [`BloomFilter64`] summarizing which export
//! slots reach it. Two passes over one shared worklist:
//!
//! 1. Roots are offered with the sticky (all-ones) filter. Everything they
//!    reach becomes sticky and is reported under `"root"`.
//! 2. Every live export slot `i` is offered with `singleton(i)`. Filters
//!    flow along edges until nothing changes; an object is re-queued only
//!    when its filter grows.
//!
//! Import proxy `j` is then a successor of export `i` if its filter
//! includes `singleton(i)`. A filter never loses bits, so a real edge is
//! never missed; a saturated filter only adds edges.

use super::{BuildOptions, EdgeGraph};
use crate::error::Result;
use crate::marker::{BloomFilter64, ObjectGraph, Tracer};
use crate::tables::{ExportTable, ImportIndex, ImportTable};

/// Per-slot filters
struct Filters(Vec<BloomFilter64>);

impl Filters {
    fn new(slot_count: usize) -> Result<Self> {
        let mut filters = Vec::new();
        filters.try_reserve_exact(slot_count)?;
        filters.resize(slot_count, BloomFilter64::EMPTY);
        Ok(Self(filters))
    }

    #[inline]
    fn get(&self, slot: usize) -> BloomFilter64 {
        self.0.get(slot).copied().unwrap_or_default()
    }

    /// Merge `prop` into `slot`; returns true if the filter grew
    fn propagate(&mut self, slot: usize, prop: BloomFilter64) -> bool {
        if slot >= self.0.len() {
            self.0.resize(slot + 1, BloomFilter64::EMPTY);
        }
        let old = self.0[slot];
        let new = old | prop;
        if old.includes(new) {
            return false;
        }
        self.0[slot] = new;
        true
    }
}

/// Build an edge graph by Bloom-filter propagation
///
/// The result covers the exact graph: same `"root"` set or larger, and
/// every exact successor present. Successor lists are in slot order.
pub fn make_by_batch_propagation<G>(
    graph: &G,
    exports: &ExportTable,
    imports: &ImportTable,
    options: &BuildOptions,
) -> Result<EdgeGraph>
where
    G: ObjectGraph + ?Sized,
{
    let seed = options.bloom_seed;
    let mut filters = Filters::new(graph.slot_capacity())?;
    let mut tracer = Tracer::with_capacity(graph, options.opaque, options.queue_capacity);

    tracer.offer_roots(|id| filters.propagate(id.slot(), BloomFilter64::STICKY))?;
    tracer.drain(|parent, child| {
        let prop = filters.get(parent.slot());
        filters.propagate(child.slot(), prop)
    })?;

    let live_exports: Vec<_> = exports.live_objects().collect();
    for &(i, obj) in &live_exports {
        let prop = BloomFilter64::singleton(u64::from(i.0), seed);
        tracer.offer(obj, |id| filters.propagate(id.slot(), prop))?;
    }
    tracer.drain(|parent, child| {
        let prop = filters.get(parent.slot());
        filters.propagate(child.slot(), prop)
    })?;

    let mut result = EdgeGraph::new();
    let mut candidates: Vec<(ImportIndex, BloomFilter64)> = Vec::new();
    for (j, proxy) in imports.live_proxies(graph) {
        let filter = filters.get(proxy.slot());
        if filter.is_sticky() {
            result.root.push(j);
        } else if !filter.is_empty() {
            candidates.push((j, filter));
        }
    }

    for &(i, _) in &live_exports {
        let key = BloomFilter64::singleton(u64::from(i.0), seed);
        let successors: Vec<ImportIndex> = candidates
            .iter()
            .filter(|(_, filter)| filter.includes(key))
            .map(|&(j, _)| j)
            .collect();
        result.insert(i, successors);
    }

    log::debug!(
        "approximate edge graph: {} roots, {} keys, {} edges",
        result.root_count(),
        result.edges.len(),
        result.edge_count()
    );
    Ok(result)
}
