//! Heap Module - Arena Heap and Native Collector
//!
//! Each runtime side owns one `Heap`. Objects live in arena slots; a slot
//! freed by the native collector bumps its generation before reuse, so
//! ids held by weak references and identity-keyed maps go stale instead of
//! pointing at the new occupant.
//!
//! Heap Structure:
//! ```text
//! slots:  [ #0.0 obj ][ #1.2 free ][ #2.0 obj ][ #3.1 obj ] ...
//! free:   [1]
//! roots:  [ Some(#0.0), None, Some(#3.1) ]   (indexed by RootHandle)
//! ```
//!
//! The root set is the list of registered root handles. They stand in for
//! globals and stack slots of a real runtime. The export and import tables
//! are *not* roots; the owning side passes its live export slots to
//! [`Heap::collect`] as extra roots instead.

use crate::error::{Result, XgcError};
use crate::marker::{MarkBitmap, ObjectGraph};
use crate::object::{ClassId, HeapObject, ObjId, ObjectKind, ProxyData, Value};
use crate::tables::ImportIndex;

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    object: Option<HeapObject>,
}

/// Handle to a registered root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootHandle(usize);

impl RootHandle {
    pub fn id(&self) -> usize {
        self.0
    }
}

/// Result of one native collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectOutcome {
    /// Objects that survived
    pub marked: usize,
    /// Objects reclaimed
    pub freed: usize,
}

/// Heap - arena of objects plus the root set
#[derive(Debug, Clone, Default)]
pub struct Heap {
    slots: Vec<Slot>,
    free: Vec<u32>,
    roots: Vec<Option<ObjId>>,
    free_roots: Vec<usize>,
    live: usize,
}

impl Heap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an object
    ///
    /// # Panics
    ///
    /// If every one of the `u32::MAX + 1` slot numbers is in use. Use
    /// [`try_alloc`](Self::try_alloc) to get an error instead.
    pub fn alloc(&mut self, object: HeapObject) -> ObjId {
        match self.try_alloc(object) {
            Ok(id) => id,
            Err(err) => panic!("{}", err),
        }
    }

    /// Allocate an object, failing once slot numbers run out
    pub fn try_alloc(&mut self, object: HeapObject) -> Result<ObjId> {
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.object = Some(object);
            self.live += 1;
            return Ok(ObjId::new(slot, entry.generation));
        }
        let slot = next_slot(self.slots.len())?;
        self.slots.try_reserve(1)?;
        self.slots.push(Slot {
            generation: 0,
            object: Some(object),
        });
        self.live += 1;
        Ok(ObjId::new(slot, 0))
    }

    /// Allocate an ordinary object with the given fields
    pub fn alloc_plain(&mut self, fields: Vec<Value>) -> ObjId {
        self.alloc(HeapObject::plain(ClassId::OBJECT, fields))
    }

    /// Allocate a plain-layout object of an arbitrary class
    ///
    /// `ClassId::HIDDEN_REF` here gives an opacity wrapper.
    pub fn alloc_object(&mut self, class: ClassId, fields: Vec<Value>) -> ObjId {
        self.alloc(HeapObject::plain(class, fields))
    }

    pub fn alloc_weak(&mut self, target: ObjId) -> ObjId {
        self.alloc(HeapObject::weak(target))
    }

    pub fn alloc_proxy(&mut self, remote_id: ImportIndex) -> Result<ObjId> {
        self.try_alloc(HeapObject::proxy(remote_id))
    }

    /// Check whether `id` still names a live object
    #[inline]
    pub fn is_alive(&self, id: ObjId) -> bool {
        self.slots
            .get(id.slot())
            .map_or(false, |s| s.generation == id.generation() && s.object.is_some())
    }

    pub fn get(&self, id: ObjId) -> Option<&HeapObject> {
        let slot = self.slots.get(id.slot())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn get_mut(&mut self, id: ObjId) -> Option<&mut HeapObject> {
        let slot = self.slots.get_mut(id.slot())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_mut()
    }

    pub fn class_of(&self, id: ObjId) -> Option<ClassId> {
        self.get(id).map(|o| o.class)
    }

    pub fn fields(&self, id: ObjId) -> Option<&[Value]> {
        self.get(id)?.fields()
    }

    /// Read field `index` of a plain object
    pub fn field(&self, id: ObjId, index: usize) -> Option<Value> {
        self.fields(id)?.get(index).copied()
    }

    /// Overwrite field `index` of a plain object
    pub fn set_field(&mut self, id: ObjId, index: usize, value: Value) -> Result<()> {
        match self.get_mut(id).map(|o| &mut o.kind) {
            Some(ObjectKind::Plain(fields)) => match fields.get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    Ok(())
                }
                None => Err(XgcError::InvalidHandle(format!(
                    "{} has no field {}",
                    id, index
                ))),
            },
            Some(_) => Err(XgcError::InvalidHandle(format!("{} is not a plain object", id))),
            None => Err(XgcError::InvalidHandle(format!("{} is dead", id))),
        }
    }

    /// Append a field to a plain object
    pub fn push_field(&mut self, id: ObjId, value: Value) -> Result<()> {
        match self.get_mut(id).map(|o| &mut o.kind) {
            Some(ObjectKind::Plain(fields)) => {
                fields.push(value);
                Ok(())
            }
            Some(_) => Err(XgcError::InvalidHandle(format!("{} is not a plain object", id))),
            None => Err(XgcError::InvalidHandle(format!("{} is dead", id))),
        }
    }

    pub fn proxy(&self, id: ObjId) -> Option<&ProxyData> {
        self.get(id)?.proxy_data()
    }

    pub fn proxy_mut(&mut self, id: ObjId) -> Option<&mut ProxyData> {
        match &mut self.get_mut(id)?.kind {
            ObjectKind::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }

    /// Target of a weak-reference object, if both are alive
    pub fn weak_target(&self, id: ObjId) -> Option<ObjId> {
        match &self.get(id)?.kind {
            ObjectKind::Weak(weak) => weak.get(self),
            _ => None,
        }
    }

    // ========================================================================
    // Roots
    // ========================================================================

    /// Register `id` as a root
    pub fn add_root(&mut self, id: ObjId) -> RootHandle {
        if let Some(slot) = self.free_roots.pop() {
            self.roots[slot] = Some(id);
            return RootHandle(slot);
        }
        self.roots.push(Some(id));
        RootHandle(self.roots.len() - 1)
    }

    /// Point an existing root at another object, or clear it
    pub fn set_root(&mut self, handle: RootHandle, id: Option<ObjId>) {
        if let Some(slot) = self.roots.get_mut(handle.0) {
            *slot = id;
        }
    }

    pub fn remove_root(&mut self, handle: RootHandle) {
        if let Some(slot) = self.roots.get_mut(handle.0) {
            if slot.take().is_some() || !self.free_roots.contains(&handle.0) {
                self.free_roots.push(handle.0);
            }
        }
    }

    pub fn roots(&self) -> impl Iterator<Item = ObjId> + '_ {
        self.roots.iter().flatten().copied()
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    /// Number of live objects
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of arena slots ever allocated
    pub fn slot_capacity(&self) -> usize {
        self.slots.len()
    }

    // ========================================================================
    // Native collection
    // ========================================================================

    /// Run the native mark-sweep collector
    ///
    /// Marks from registered roots plus `extra_roots`, never through weak
    /// references, then frees everything unmarked. Stale ids in
    /// `extra_roots` are ignored.
    pub fn collect(&mut self, extra_roots: &[ObjId]) -> CollectOutcome {
        let mut marks = MarkBitmap::new(self.slots.len());
        let mut stack: Vec<ObjId> = Vec::new();

        for id in self.roots().chain(extra_roots.iter().copied()) {
            if self.is_alive(id) && marks.mark(id.slot()) {
                stack.push(id);
            }
        }

        while let Some(id) = stack.pop() {
            if let Some(object) = self.get(id) {
                object.for_each_strong(|child| {
                    if self.is_alive(child) && marks.mark(child.slot()) {
                        stack.push(child);
                    }
                });
            }
        }

        let mut outcome = CollectOutcome::default();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.object.is_none() {
                continue;
            }
            if marks.is_marked(index) {
                outcome.marked += 1;
            } else {
                slot.object = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(index as u32);
                outcome.freed += 1;
            }
        }
        self.live -= outcome.freed;

        log::debug!(
            "native collection: {} marked, {} freed",
            outcome.marked,
            outcome.freed
        );
        outcome
    }
}

impl ObjectGraph for Heap {
    fn slot_capacity(&self) -> usize {
        self.slots.len()
    }

    fn is_markable(&self, id: ObjId) -> bool {
        self.is_alive(id)
    }

    fn class_of(&self, id: ObjId) -> Option<ClassId> {
        Heap::class_of(self, id)
    }

    fn for_each_root(&self, f: &mut dyn FnMut(ObjId)) {
        for id in self.roots() {
            f(id);
        }
    }

    fn for_each_child(&self, id: ObjId, f: &mut dyn FnMut(ObjId)) {
        if let Some(object) = self.get(id) {
            object.for_each_strong(|child| f(child));
        }
    }
}

/// Slot number for a fresh slot appended at `len`
fn next_slot(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| XgcError::exhausted("heap slot numbers"))
}
