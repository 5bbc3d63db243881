//! Tracer - breadth-first walk with an opacity marker
//!
//! The tracer owns only the worklist. Marks belong to the caller, which
//! decides per object whether it is newly reached; this lets the exact
//! builder keep three bitmaps and the approximate builder keep filters
//! while sharing one traversal.

use super::{MarkBitmap, ObjectGraph, WorkQueue, QUEUE_SIZE};
use crate::error::Result;
use crate::object::{ClassId, ObjId};

/// Tracer - worklist plus the opacity class
pub struct Tracer<'g, G: ObjectGraph + ?Sized> {
    graph: &'g G,
    opaque: ClassId,
    queue: WorkQueue<ObjId>,
}

impl<'g, G: ObjectGraph + ?Sized> Tracer<'g, G> {
    pub fn new(graph: &'g G, opaque: ClassId) -> Self {
        Self::with_capacity(graph, opaque, QUEUE_SIZE)
    }

    pub fn with_capacity(graph: &'g G, opaque: ClassId, capacity: usize) -> Self {
        Self {
            graph,
            opaque,
            queue: WorkQueue::with_capacity(capacity),
        }
    }

    /// Check if `id` is reached but never expanded
    #[inline]
    pub fn is_opaque(&self, id: ObjId) -> bool {
        self.graph.class_of(id) == Some(self.opaque)
    }

    /// Offer a seed object
    ///
    /// `visit` decides whether the object is newly reached; if so and the
    /// object is not opaque, it is queued for expansion. Unmarkable ids are
    /// skipped without calling `visit`.
    pub fn offer<F>(&mut self, id: ObjId, visit: F) -> Result<()>
    where
        F: FnOnce(ObjId) -> bool,
    {
        if self.graph.is_markable(id) && visit(id) && !self.is_opaque(id) {
            self.queue.enqueue(id)?;
        }
        Ok(())
    }

    /// Offer every root of the graph
    pub fn offer_roots<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(ObjId) -> bool,
    {
        let mut roots = Vec::new();
        self.graph.for_each_root(&mut |id| roots.push(id));
        for id in roots {
            self.offer(id, &mut visit)?;
        }
        Ok(())
    }

    /// Expand queued objects until the worklist is empty
    ///
    /// `visit(parent, child)` is called for every markable child of every
    /// expanded object.
    pub fn drain<F>(&mut self, mut visit: F) -> Result<()>
    where
        F: FnMut(ObjId, ObjId) -> bool,
    {
        let graph = self.graph;
        let opaque = self.opaque;
        while let Some(parent) = self.queue.dequeue() {
            let queue = &mut self.queue;
            let mut failed = None;
            graph.for_each_child(parent, &mut |child| {
                if failed.is_some() || !graph.is_markable(child) {
                    return;
                }
                if visit(parent, child) && graph.class_of(child) != Some(opaque) {
                    if let Err(err) = queue.enqueue(child) {
                        failed = Some(err);
                    }
                }
            });
            if let Some(err) = failed {
                self.queue.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Offer `seeds` and drain, with one mark predicate for both
    pub fn trace_from<I, F>(&mut self, seeds: I, mut visit: F) -> Result<()>
    where
        I: IntoIterator<Item = ObjId>,
        F: FnMut(ObjId) -> bool,
    {
        for id in seeds {
            self.offer(id, &mut visit)?;
        }
        self.drain(|_, child| visit(child))
    }
}

/// Test whether `target` is reachable from `from`
///
/// Opaque objects are reached but their contents are not; weak
/// references are never followed.
///
/// ```rust
/// use xgc::heap::Heap;
/// use xgc::marker::reachable;
/// use xgc::object::{ClassId, Value};
///
/// let mut heap = Heap::new();
/// let elem = heap.alloc_plain(vec![]);
/// let array = heap.alloc_plain(vec![Value::Ref(elem)]);
/// assert!(reachable(&heap, array, elem, ClassId::HIDDEN_REF).unwrap());
/// assert!(!reachable(&heap, elem, array, ClassId::HIDDEN_REF).unwrap());
/// ```
pub fn reachable<G>(graph: &G, from: ObjId, target: ObjId, opaque: ClassId) -> Result<bool>
where
    G: ObjectGraph + ?Sized,
{
    if !graph.is_markable(target) {
        return Ok(false);
    }
    let mut marks = MarkBitmap::new(graph.slot_capacity());
    let mut tracer = Tracer::new(graph, opaque);
    tracer.trace_from(Some(from), |id| marks.mark(id.slot()))?;
    Ok(marks.is_marked(target.slot()))
}

/// Test whether `target` is reachable from the root set
pub fn reachable_from_root<G>(graph: &G, target: ObjId, opaque: ClassId) -> Result<bool>
where
    G: ObjectGraph + ?Sized,
{
    if !graph.is_markable(target) {
        return Ok(false);
    }
    let mut marks = MarkBitmap::new(graph.slot_capacity());
    let mut tracer = Tracer::new(graph, opaque);
    tracer.offer_roots(|id| marks.mark(id.slot()))?;
    tracer.drain(|_, child| marks.mark(child.slot()))?;
    Ok(marks.is_marked(target.slot()))
}
