//! Reference Tables - Export and Import Slots
//!
//! Every runtime side keeps two tables:
//! - the **export table**: local objects handed to the peer, addressed by
//!   slot, held strongly;
//! - the **import table**: proxies for peer objects, addressed by the
//!   peer's export slot, held weakly.
//!
//! The numbers line up across the bridge:
//! ```text
//!      local side                     remote side
//!  export slot i  (object)  ────▶  import slot i  (proxy)
//!  import slot j  (proxy)   ◀────  export slot j  (object)
//! ```
//! [`ExportIndex`] and [`ImportIndex`] are distinct types so a slot number
//! is only ever reinterpreted explicitly, with [`ExportIndex::across`] or
//! [`ImportIndex::across`].

pub mod export;
pub mod import;

pub use export::{ExportSlot, ExportTable};
pub use import::{ImportSlot, ImportTable};

use xgc_util::define_idx;

define_idx!(
    /// Slot in an export table
    ExportIndex
);

define_idx!(
    /// Slot in an import table
    ImportIndex
);

impl ExportIndex {
    /// The same slot number as seen by the peer's import table
    #[inline]
    pub fn across(self) -> ImportIndex {
        ImportIndex(self.0)
    }
}

impl ImportIndex {
    /// The same slot number as seen by the peer's export table
    #[inline]
    pub fn across(self) -> ExportIndex {
        ExportIndex(self.0)
    }
}
