//! Weak References Support
//!
//! A weak reference names an object without keeping it alive. Because an
//! [`ObjId`] carries its slot generation, a weak reference needs no clearing
//! pass: once the referent is swept, every lookup through the reference
//! reports it as gone.

use super::ObjId;
use crate::marker::ObjectGraph;

/// WeakReference - a reference that doesn't prevent collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeakRef {
    referent: ObjId,
}

impl WeakRef {
    pub fn new(referent: ObjId) -> Self {
        Self { referent }
    }

    /// Get referent
    ///
    /// Returns None if the referent has been collected.
    pub fn get<G: ObjectGraph + ?Sized>(&self, graph: &G) -> Option<ObjId> {
        graph.is_markable(self.referent).then_some(self.referent)
    }

    /// Check if the referent is still alive
    pub fn is_alive<G: ObjectGraph + ?Sized>(&self, graph: &G) -> bool {
        graph.is_markable(self.referent)
    }

    /// Referent id without a liveness check
    pub fn referent(&self) -> ObjId {
        self.referent
    }
}
