//! Test Utilities for the XGC Integration Suite
//!
//! Two fixtures:
//! - [`Chains`]: one runtime whose export slots head chains of wrappers
//!   ending in import proxies, for the edge-graph builders;
//! - [`Pair`]: a local and a remote runtime wired by hand, for the
//!   collection manager. Values cross with `encode`/`decode` only, so no
//!   scheduler runs behind the test's back.

#![allow(dead_code)]

use xgc::bridge::Runtime;
use xgc::object::{ObjId, Value};
use xgc::remote::{CollectionManager, ManagerReport};
use xgc::tables::{ExportIndex, ImportIndex};

/// Chain length cap for large fixtures
pub const SHORT_CHAIN: usize = 40;

/// ============================================================================
/// CHAIN FIXTURE
/// ============================================================================

/// Export slots heading chains of one-field wrappers
///
/// Chain `i` is `min(i, max_len)` wrappers ending in the proxy for import
/// slot `i`; chain 0 is the proxy itself. Chain `i` is exported at slot
/// `i`. On top of the plain chains:
/// - chain 4: its third wrapper points at a pair of its fourth wrapper and
///   proxy 6, so export 4 reaches imports 4 and 6;
/// - chain 3: its third wrapper is a heap root;
/// - chain 8: its head is a heap root;
/// - chain 9: its third wrapper is cut off from the proxy.
pub struct Chains {
    pub runtime: Runtime,
    pub heads: Vec<ObjId>,
}

/// Build the chain fixture; `count` must be at least 10
pub fn make_chains(count: usize, max_len: usize) -> Chains {
    assert!(count >= 10 && max_len >= 4);
    let mut runtime = Runtime::new("local");

    let mut heads = Vec::with_capacity(count);
    for i in 0..count {
        let mut obj = runtime.import(ImportIndex(i as u32)).unwrap();
        for _ in 0..i.min(max_len) {
            obj = runtime.heap_mut().alloc_plain(vec![Value::Ref(obj)]);
        }
        heads.push(obj);
    }
    for (i, &head) in heads.iter().enumerate() {
        assert_eq!(runtime.export(head).unwrap(), ExportIndex(i as u32));
    }

    let third = follow(&runtime, heads[4], 2);
    let fourth = follow(&runtime, heads[4], 3);
    let proxy6 = runtime.import(ImportIndex(6)).unwrap();
    let pair = runtime
        .heap_mut()
        .alloc_plain(vec![Value::Ref(fourth), Value::Ref(proxy6)]);
    runtime.heap_mut().set_field(third, 0, Value::Ref(pair)).unwrap();

    let rooted = follow(&runtime, heads[3], 2);
    runtime.heap_mut().add_root(rooted);
    runtime.heap_mut().add_root(heads[8]);

    let cut = follow(&runtime, heads[9], 2);
    runtime.heap_mut().set_field(cut, 0, Value::Nil).unwrap();

    Chains { runtime, heads }
}

/// Follow field 0 `steps` times
pub fn follow(runtime: &Runtime, mut obj: ObjId, steps: usize) -> ObjId {
    for _ in 0..steps {
        obj = runtime
            .heap()
            .field(obj, 0)
            .and_then(|v| v.as_obj())
            .expect("chain link");
    }
    obj
}

/// ============================================================================
/// RUNTIME PAIR
/// ============================================================================

/// Local side builds graphs, remote side runs the collection manager
pub struct Pair {
    pub local: Runtime,
    pub remote: Runtime,
    pub manager: CollectionManager,
}

impl Pair {
    pub fn new() -> Self {
        Self {
            local: Runtime::new("local"),
            remote: Runtime::new("remote"),
            manager: CollectionManager::new(),
        }
    }

    pub fn to_remote(&mut self, value: Value) -> Value {
        let wire = self.local.encode(value).unwrap();
        self.remote.decode(wire).unwrap()
    }

    pub fn to_local(&mut self, value: Value) -> Value {
        let wire = self.remote.encode(value).unwrap();
        self.local.decode(wire).unwrap()
    }

    /// Fresh local object with no fields
    pub fn local_object(&mut self) -> ObjId {
        self.local.heap_mut().alloc_plain(vec![])
    }

    /// Pass `value` to the remote side, wrap it there and send the wrapper
    /// back; returns the wrapper and its local proxy
    pub fn remote_wrapper(&mut self, value: Value) -> (ObjId, ObjId) {
        let arrived = self.to_remote(value);
        let wrapper = self.remote.heap_mut().alloc_plain(vec![arrived]);
        let proxy = self.to_local(Value::Ref(wrapper)).as_obj().expect("proxy");
        (wrapper, proxy)
    }

    /// Hand `obj` to the remote side and wrap it there
    ///
    /// The remote wrapper is sent back and held by a new local object:
    /// ```text
    /// obj ◀── proxy ◀── wrapper ◀── proxy ◀── returned local object
    ///   local      remote       remote     local
    /// ```
    /// Returns the new local object and the remote wrapper.
    pub fn wrap(&mut self, obj: ObjId) -> (ObjId, ObjId) {
        let (wrapper, proxy) = self.remote_wrapper(Value::Ref(obj));
        let holder = self.local.heap_mut().alloc_plain(vec![Value::Ref(proxy)]);
        (holder, wrapper)
    }

    /// Start from a fresh local object and wrap `n` times
    pub fn wrap_chain(&mut self, n: usize) -> (ObjId, Vec<ObjId>) {
        let mut obj = self.local_object();
        let mut wrappers = Vec::with_capacity(n);
        for _ in 0..n {
            let (holder, wrapper) = self.wrap(obj);
            obj = holder;
            wrappers.push(wrapper);
        }
        (obj, wrappers)
    }

    pub fn gc(&mut self, json: &str) -> ManagerReport {
        self.manager.collect(&mut self.remote, json).unwrap()
    }

    pub fn remote_live_exports(&self) -> Vec<u32> {
        raw_exports(self.remote.exports().live_indices())
    }

    pub fn remote_detached_exports(&self) -> Vec<u32> {
        raw_exports(self.remote.exports().detached_indices())
    }

    pub fn remote_live_imports(&self) -> Vec<u32> {
        let (_, imports) = self.remote.tables();
        imports
            .live_proxies(self.remote.heap())
            .into_iter()
            .map(|(j, _)| j.0)
            .collect()
    }

    pub fn remote_zombie_imports(&self) -> Vec<u32> {
        raw_imports(self.remote.dead_references())
    }
}

impl Default for Pair {
    fn default() -> Self {
        Self::new()
    }
}

/// ============================================================================
/// INDEX HELPERS
/// ============================================================================

pub fn raw_exports(indices: Vec<ExportIndex>) -> Vec<u32> {
    indices.into_iter().map(|i| i.0).collect()
}

pub fn raw_imports(indices: Vec<ImportIndex>) -> Vec<u32> {
    indices.into_iter().map(|j| j.0).collect()
}

pub fn sorted(indices: &[ImportIndex]) -> Vec<u32> {
    let mut raw: Vec<u32> = indices.iter().map(|j| j.0).collect();
    raw.sort_unstable();
    raw
}
