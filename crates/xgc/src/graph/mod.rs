//! Edge Graph - per-cycle reachability summary sent to the peer
//!
//! Built on the local side, consumed once by the peer's collection manager.
//!
//! Wire format (JSON, integers only, key order irrelevant):
//! ```text
//! { "root": [2, 5], "2": [3, 7] }
//!
//!   export slot       import slots
//!        2     reaches   3 and 7
//!      root    reaches   2 and 5
//! ```
//! Keys are local export slots. `"root"` and every successor list hold
//! local import slots, which are the peer's export slots. A missing key
//! means no known edges from that slot.
//!
//! Two builders produce this shape:
//! - [`simply_make`]: exact, one trace per export slot;
//! - [`make_by_batch_propagation`]: bounded cost with Bloom filters; may
//!   report extra edges but never drops a real one.

pub mod approx;
pub mod exact;

pub use approx::make_by_batch_propagation;
pub use exact::simply_make;

use crate::config::{XgcConfig, DEFAULT_BLOOM_SEED, DEFAULT_QUEUE_CAPACITY};
use crate::error::Result;
use crate::object::ClassId;
use crate::tables::{ExportIndex, ImportIndex};
use indexmap::IndexMap;
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Key of the root entry
pub const ROOT_KEY: &str = "root";

/// Options shared by both builders
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    /// Class whose instances are reached but never expanded
    pub opaque: ClassId,
    /// Initial work queue capacity
    pub queue_capacity: usize,
    /// Bloom filter seed (approximate builder only)
    pub bloom_seed: u64,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            opaque: ClassId::HIDDEN_REF,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            bloom_seed: DEFAULT_BLOOM_SEED,
        }
    }
}

impl From<&XgcConfig> for BuildOptions {
    fn from(config: &XgcConfig) -> Self {
        Self {
            opaque: ClassId::HIDDEN_REF,
            queue_capacity: config.queue_capacity,
            bloom_seed: config.bloom_seed,
        }
    }
}

/// EdgeGraph - export slot -> reachable import slots, plus the root entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeGraph {
    /// Import slots reachable from the true root set
    pub root: Vec<ImportIndex>,
    /// Non-empty successor lists, in insertion order
    pub edges: IndexMap<ExportIndex, Vec<ImportIndex>>,
}

impl EdgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record successors of `from`; empty lists are dropped
    pub fn insert(&mut self, from: ExportIndex, successors: Vec<ImportIndex>) {
        if !successors.is_empty() {
            self.edges.insert(from, successors);
        }
    }

    pub fn successors(&self, from: ExportIndex) -> Option<&[ImportIndex]> {
        self.edges.get(&from).map(Vec::as_slice)
    }

    /// Number of top-level entries, counting `"root"`
    pub fn len(&self) -> usize {
        self.edges.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty() && self.edges.is_empty()
    }

    /// Import slots reachable from the root set
    pub fn root_count(&self) -> usize {
        self.root.len()
    }

    /// Sum of all successor list lengths
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Check that every root and every edge of `other` is also in `self`
    ///
    /// An approximate graph covers the exact graph of the same heap.
    pub fn covers(&self, other: &EdgeGraph) -> bool {
        other.root.iter().all(|j| self.root.contains(j))
            && other.edges.iter().all(|(i, succ)| {
                self.successors(*i)
                    .map_or(false, |mine| succ.iter().all(|j| mine.contains(j)))
            })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl Serialize for EdgeGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        map.serialize_entry(ROOT_KEY, &RawIndexes(&self.root))?;
        for (from, successors) in &self.edges {
            map.serialize_entry(&from.0.to_string(), &RawIndexes(successors))?;
        }
        map.end()
    }
}

struct RawIndexes<'a>(&'a [ImportIndex]);

impl Serialize for RawIndexes<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(|j| j.0))
    }
}

impl<'de> Deserialize<'de> for EdgeGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(EdgeGraphVisitor)
    }
}

struct EdgeGraphVisitor;

impl<'de> Visitor<'de> for EdgeGraphVisitor {
    type Value = EdgeGraph;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with a \"root\" key and decimal slot keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<EdgeGraph, A::Error> {
        let mut root: Option<Vec<u32>> = None;
        let mut edges = IndexMap::new();
        while let Some(key) = access.next_key::<String>()? {
            if key == ROOT_KEY {
                if root.is_some() {
                    return Err(de::Error::duplicate_field(ROOT_KEY));
                }
                root = Some(access.next_value()?);
                continue;
            }
            let from = parse_slot_key(&key)
                .ok_or_else(|| de::Error::custom(format!("invalid slot key {:?}", key)))?;
            let successors: Vec<u32> = access.next_value()?;
            let successors: Vec<ImportIndex> = successors.into_iter().map(ImportIndex).collect();
            if edges.insert(ExportIndex(from), successors).is_some() {
                return Err(de::Error::custom(format!("duplicate slot key {}", from)));
            }
        }
        let root = root.ok_or_else(|| de::Error::missing_field(ROOT_KEY))?;
        Ok(EdgeGraph {
            root: root.into_iter().map(ImportIndex).collect(),
            edges,
        })
    }
}

/// Slot keys are plain decimal: no sign, no leading zero
fn parse_slot_key(key: &str) -> Option<u32> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn imports(xs: &[u32]) -> Vec<ImportIndex> {
        xs.iter().copied().map(ImportIndex).collect()
    }

    #[test]
    fn test_json_shape() {
        let mut graph = EdgeGraph::new();
        graph.root = imports(&[2, 5]);
        graph.insert(ExportIndex(2), imports(&[3, 7]));
        graph.insert(ExportIndex(4), vec![]);
        assert_eq!(graph.to_json().unwrap(), r#"{"root":[2,5],"2":[3,7]}"#);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.root_count(), 2);
    }

    #[test]
    fn test_parse_any_key_order() {
        let graph = EdgeGraph::from_json(r#"{ "3": [1, 0], "root": [2], "2": [0] }"#).unwrap();
        assert_eq!(graph.root, imports(&[2]));
        assert_eq!(graph.successors(ExportIndex(3)), Some(&imports(&[1, 0])[..]));
        assert_eq!(graph.successors(ExportIndex(2)), Some(&imports(&[0])[..]));
        assert_eq!(graph.successors(ExportIndex(9)), None);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(EdgeGraph::from_json(r#"{ "0": [1] }"#).is_err());
        assert!(EdgeGraph::from_json(r#"{ "root": [1.5] }"#).is_err());
        assert!(EdgeGraph::from_json(r#"{ "root": [-1] }"#).is_err());
        assert!(EdgeGraph::from_json(r#"{ "root": [], "x": [1] }"#).is_err());
        assert!(EdgeGraph::from_json(r#"{ "root": [], "root": [] }"#).is_err());
        assert!(EdgeGraph::from_json("[]").is_err());
    }

    #[test]
    fn test_parse_rejects_non_canonical_keys() {
        for key in ["+1", "01", "007", "", " 1", "4294967296"] {
            let json = format!(r#"{{ "root": [], "{}": [0] }}"#, key);
            let err = EdgeGraph::from_json(&json).unwrap_err().to_string();
            assert!(err.contains("invalid slot key"), "{:?}: {}", key, err);
        }
        let err = EdgeGraph::from_json(r#"{ "root": [], "1": [0], "01": [2] }"#)
            .unwrap_err()
            .to_string();
        assert!(err.contains("invalid slot key"), "{}", err);

        let graph = EdgeGraph::from_json(r#"{ "root": [], "0": [1], "10": [2] }"#).unwrap();
        assert_eq!(graph.successors(ExportIndex(10)), Some(&imports(&[2])[..]));
        assert_eq!(graph.to_json().unwrap(), r#"{"root":[],"0":[1],"10":[2]}"#);
    }

    #[test]
    fn test_empty_graph() {
        let graph = EdgeGraph::from_json(r#"{ "root": [] }"#).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.to_json().unwrap(), r#"{"root":[]}"#);
    }

    #[test]
    fn test_covers() {
        let exact = EdgeGraph::from_json(r#"{"root":[3],"4":[4,6]}"#).unwrap();
        let wider = EdgeGraph::from_json(r#"{"root":[3,8],"4":[6,4,9],"5":[5]}"#).unwrap();
        assert!(wider.covers(&exact));
        assert!(!exact.covers(&wider));
        assert!(exact.covers(&exact));
    }
}
