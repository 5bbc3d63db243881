//! Object Module - Host heap object model
//!
//! This module defines the objects that live in a [`Heap`](crate::heap::Heap).
//!
//! Every object carries a [`ClassId`] and one of three layouts:
//! - plain objects hold a vector of [`Value`] fields,
//! - weak references hold one target that is never traced,
//! - proxies stand for an object owned by the peer runtime.
//!
//! Objects are addressed by [`ObjId`]. An id names an arena slot together
//! with the generation the slot had when the object was allocated, so an id
//! that outlives its object is detectably stale instead of silently
//! aliasing whatever reuses the slot.

pub mod weak;

pub use weak::WeakRef;

use crate::tables::{ExportIndex, ImportIndex};
use std::fmt;

/// Identity of a heap object: arena slot plus allocation generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjId {
    slot: u32,
    generation: u32,
}

impl ObjId {
    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Arena slot, used as the bit position in per-cycle mark tables
    #[inline]
    pub fn slot(self) -> usize {
        self.slot as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.slot, self.generation)
    }
}

/// Class of a heap object
///
/// The tracer compares classes to decide opacity, so any class can serve
/// as the "do not look inside" marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub u32);

impl ClassId {
    /// Ordinary object
    pub const OBJECT: ClassId = ClassId(0);
    /// Opacity marker; wraps bookkeeping containers
    pub const HIDDEN_REF: ClassId = ClassId(1);
    /// Weak reference
    pub const WEAK_REF: ClassId = ClassId(2);
    /// Handle for an object owned by the peer runtime
    pub const PROXY: ClassId = ClassId(3);

    /// First id available for embedder-defined classes
    pub const FIRST_USER: u32 = 16;

    /// Embedder-defined class `n`
    pub const fn user(n: u32) -> ClassId {
        ClassId(Self::FIRST_USER + n)
    }
}

/// Field value of a plain object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Nil,
    /// Immediate integer; never traced
    Int(i64),
    Ref(ObjId),
}

impl Value {
    /// Referenced object, if this value is a reference
    #[inline]
    pub fn as_obj(&self) -> Option<ObjId> {
        match self {
            Value::Ref(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<ObjId> for Value {
    fn from(id: ObjId) -> Self {
        Value::Ref(id)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Successor slots a proxy keeps alive across an Unlink
///
/// Filled in by the liveness check of the collection manager and consumed
/// by Repair. `objects[k]` is the object that sat in `indexes[k]` when the
/// record was made; the proxy holds these objects strongly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairRecord {
    pub indexes: Vec<ExportIndex>,
    pub objects: Vec<ObjId>,
}

/// Proxy payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyData {
    /// Slot in the owner's export table (and in our import table)
    pub remote_id: ImportIndex,
    pub record: Option<RepairRecord>,
}

/// Object layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Plain(Vec<Value>),
    /// Weak reference; the target is not a child
    Weak(WeakRef),
    Proxy(ProxyData),
}

/// A heap object: class plus layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapObject {
    pub class: ClassId,
    pub kind: ObjectKind,
}

impl HeapObject {
    pub fn plain(class: ClassId, fields: Vec<Value>) -> Self {
        Self {
            class,
            kind: ObjectKind::Plain(fields),
        }
    }

    pub fn weak(target: ObjId) -> Self {
        Self {
            class: ClassId::WEAK_REF,
            kind: ObjectKind::Weak(WeakRef::new(target)),
        }
    }

    pub fn proxy(remote_id: ImportIndex) -> Self {
        Self {
            class: ClassId::PROXY,
            kind: ObjectKind::Proxy(ProxyData {
                remote_id,
                record: None,
            }),
        }
    }

    /// Strong references held by this object
    ///
    /// Weak targets are excluded. A proxy's repair record counts as strong.
    pub fn for_each_strong(&self, mut f: impl FnMut(ObjId)) {
        match &self.kind {
            ObjectKind::Plain(fields) => {
                for id in fields.iter().filter_map(Value::as_obj) {
                    f(id);
                }
            }
            ObjectKind::Weak(_) => {}
            ObjectKind::Proxy(proxy) => {
                if let Some(record) = &proxy.record {
                    for &id in &record.objects {
                        f(id);
                    }
                }
            }
        }
    }

    pub fn fields(&self) -> Option<&[Value]> {
        match &self.kind {
            ObjectKind::Plain(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn proxy_data(&self) -> Option<&ProxyData> {
        match &self.kind {
            ObjectKind::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }
}
