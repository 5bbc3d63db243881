//! Mark Bitmap - Tracking Marked Objects
//!
//! One bit per arena slot. A bitmap is sized from
//! `ObjectGraph::slot_capacity` at the start of a trace and lives only for
//! that trace.
//!
//! Bitmap Structure:
//! ```text
//! slot 70:
//! - Word index: 70 / 64 = 1
//! - Bit offset: 70 % 64 = 6
//! ```

/// MarkBitmap - one mark bit per heap slot
#[derive(Debug, Clone, Default)]
pub struct MarkBitmap {
    bits: Vec<u64>,

    /// Set by `mark`, so clearing an untouched bitmap is free
    dirty: bool,
}

impl MarkBitmap {
    /// Create bitmap covering `slot_count` slots
    pub fn new(slot_count: usize) -> Self {
        Self {
            bits: vec![0; (slot_count + 63) / 64],
            dirty: false,
        }
    }

    /// Mark slot; returns true if it was not marked before
    ///
    /// Slots beyond the covered range grow the bitmap.
    #[inline]
    pub fn mark(&mut self, slot: usize) -> bool {
        let (word, bit) = (slot / 64, slot % 64);
        if word >= self.bits.len() {
            self.bits.resize(word + 1, 0);
        }
        let mask = 1u64 << bit;
        let was_marked = self.bits[word] & mask != 0;
        self.bits[word] |= mask;
        self.dirty = true;
        !was_marked
    }

    #[inline]
    pub fn is_marked(&self, slot: usize) -> bool {
        self.bits
            .get(slot / 64)
            .map_or(false, |word| word & (1u64 << (slot % 64)) != 0)
    }

    /// Clear all marks
    pub fn clear(&mut self) {
        if self.dirty {
            self.bits.fill(0);
            self.dirty = false;
        }
    }

    /// Count marked slots
    pub fn count_marked(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_once() {
        let mut bitmap = MarkBitmap::new(128);
        assert!(bitmap.mark(70));
        assert!(!bitmap.mark(70));
        assert!(bitmap.is_marked(70));
        assert!(!bitmap.is_marked(71));
        assert_eq!(bitmap.count_marked(), 1);
    }

    #[test]
    fn test_mark_beyond_range_grows() {
        let mut bitmap = MarkBitmap::new(1);
        assert!(!bitmap.is_marked(500));
        assert!(bitmap.mark(500));
        assert!(bitmap.is_marked(500));
    }

    #[test]
    fn test_clear() {
        let mut bitmap = MarkBitmap::new(64);
        bitmap.mark(3);
        bitmap.mark(63);
        bitmap.clear();
        assert_eq!(bitmap.count_marked(), 0);
        assert!(bitmap.mark(3));
    }
}
