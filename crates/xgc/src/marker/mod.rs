//! Marker Module - Local Reachability Tracing
//!
//! This module walks the local object graph. It is used three ways:
//! - as an inspection tool (`reachable`, `reachable_from_root`),
//! - by the exact edge-graph builder (ROOT and REF bitmaps),
//! - by the approximate builder (Bloom-filter propagation).
//!
//! Two kinds of edges are never followed:
//! - weak references, which the heap never reports as children,
//! - the contents of any object whose class is the chosen opacity marker.
//!   Such an object is itself reached and marked, but not expanded.
//!
//! Traversal is breadth-first over an explicit [`WorkQueue`], so deep
//! chains never recurse.

pub mod bitmap;
pub mod bloom;
pub mod queue;
pub mod tracer;

pub use bitmap::MarkBitmap;
pub use bloom::BloomFilter64;
pub use queue::{WorkQueue, QUEUE_SIZE};
pub use tracer::{reachable, reachable_from_root, Tracer};

use crate::object::{ClassId, ObjId};

/// Walker contract for a host heap
///
/// Anything that can enumerate its roots and the strong children of an
/// object can be traced. Weak edges must not be reported by
/// `for_each_child`.
pub trait ObjectGraph {
    /// Upper bound of `ObjId::slot` for live objects; sizes mark tables
    fn slot_capacity(&self) -> usize;

    /// Whether `id` names an object that can carry a mark
    fn is_markable(&self, id: ObjId) -> bool;

    fn class_of(&self, id: ObjId) -> Option<ClassId>;

    /// Visit every root (globals, stack stand-ins)
    fn for_each_root(&self, f: &mut dyn FnMut(ObjId));

    /// Visit every strong child of `id`
    fn for_each_child(&self, id: ObjId, f: &mut dyn FnMut(ObjId));
}
