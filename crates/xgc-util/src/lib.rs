//! xgc-util - Foundation Types for the Cross-Heap Collector
//!
//! Small, dependency-free building blocks shared by the `xgc` crates.
//!
//! The export and import tables of a bridge are both addressed by plain slot
//! numbers, but the two number spaces must never be mixed: export slot 3 on
//! one side is import slot 3 on the other. [`index_vec`] gives each space its
//! own index type so the compiler catches a swapped index.
//!
//! ```
//! use xgc_util::define_idx;
//! use xgc_util::index_vec::IndexVec;
//!
//! define_idx!(SlotId);
//!
//! let mut slots: IndexVec<SlotId, &str> = IndexVec::new();
//! let id = slots.push("live");
//! assert_eq!(slots[id], "live");
//! ```

pub mod index_vec;

pub use index_vec::{Idx, IndexVec};
