//! Bloom Filter - 64-bit Probabilistic Set
//!
//! A fixed-width set summary with `N = 64` bits and `K = 5` hash positions.
//! Membership has one-sided error: an inserted element is always reported,
//! an absent one is reported with probability about
//! `(1 - (1 - K/N)^i)^K` after `i` insertions.
//!
//! Insertion derives K distinct bit positions from a xorshift sequence
//! seeded with `x ^ seed`:
//! ```text
//! ys[0] = x ^ seed, ys[i] = xorshift(ys[i-1])
//! ys[i] %= N - i                        (shrinking ranges)
//! for i in (0..K).rev(), j > i:         (lift later picks past earlier ones)
//!     if ys[j] >= ys[i] { ys[j] += 1 }
//! ```
//! so every singleton filter has popcount exactly K.
//!
//! The all-ones filter is "sticky": it includes every other filter and is
//! used to mean "reachable from the root set".

use std::fmt;

/// Bits per filter
pub const N: u32 = 64;

/// Positions set per inserted element
pub const K: usize = 5;

#[inline]
fn xorshift_64_1(mut x: u64) -> u64 {
    x ^= x << 29;
    x ^= x >> 27;
    x ^= x << 37;
    x
}

#[inline]
fn xorshift_64_2(mut x: u64) -> u64 {
    x ^= x << 12;
    x ^= x >> 3;
    x ^= x << 13;
    x
}

/// Advance a seed to the next value of its xorshift sequence
///
/// Filters built with different seeds must never be unioned.
pub fn next_seed(seed: u64) -> u64 {
    xorshift_64_1(seed)
}

/// BloomFilter64 - 64-bit Bloom filter value
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BloomFilter64(u64);

impl BloomFilter64 {
    /// Empty filter
    pub const EMPTY: BloomFilter64 = BloomFilter64(0);

    /// All-ones filter
    pub const STICKY: BloomFilter64 = BloomFilter64(!0);

    pub fn new() -> Self {
        Self::EMPTY
    }

    /// Filter containing exactly `x`
    pub fn singleton(x: u64, seed: u64) -> Self {
        let mut filter = Self::EMPTY;
        filter.insert(x, seed);
        filter
    }

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    /// Insert `x`
    pub fn insert(&mut self, x: u64, seed: u64) {
        let mut ys = [0u64; K];
        ys[0] = x ^ seed;
        for i in 1..K {
            ys[i] = xorshift_64_2(ys[i - 1]);
        }
        for (i, y) in ys.iter_mut().enumerate() {
            *y %= (N as u64) - i as u64;
        }
        for i in (0..K).rev() {
            for j in i + 1..K {
                if ys[j] >= ys[i] {
                    ys[j] += 1;
                }
            }
        }
        for y in ys {
            self.0 |= 1u64 << y;
        }
    }

    #[inline]
    pub fn union(self, other: BloomFilter64) -> BloomFilter64 {
        BloomFilter64(self.0 | other.0)
    }

    /// Superset test: every bit of `other` is set in `self`
    #[inline]
    pub fn includes(self, other: BloomFilter64) -> bool {
        (self.0 | other.0) == self.0
    }

    /// Membership test for a single element
    pub fn contains(self, x: u64, seed: u64) -> bool {
        self.includes(Self::singleton(x, seed))
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn make_sticky(&mut self) {
        self.0 = !0;
    }

    #[inline]
    pub fn is_sticky(self) -> bool {
        self.0 == !0
    }

    pub fn popcount(self) -> u32 {
        self.0.count_ones()
    }
}

impl std::ops::BitOr for BloomFilter64 {
    type Output = BloomFilter64;

    fn bitor(self, rhs: BloomFilter64) -> BloomFilter64 {
        self.union(rhs)
    }
}

impl fmt::Display for BloomFilter64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:064b}", self.0)
    }
}

impl fmt::Debug for BloomFilter64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BloomFilter64({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_BLOOM_SEED as SEED;
    use quickcheck_macros::quickcheck;
    use rand::seq::SliceRandom;
    use rand::{rngs::StdRng, SeedableRng};

    const COUNT: u64 = 64;

    fn filters() -> Vec<BloomFilter64> {
        (0..COUNT).map(|i| BloomFilter64::singleton(i, SEED)).collect()
    }

    #[test]
    fn test_num_bits() {
        for f in filters() {
            assert_eq!(f.popcount(), K as u32);
        }
    }

    #[test]
    fn test_reproducibility() {
        let fs = filters();
        for i in 0..COUNT {
            assert_eq!(BloomFilter64::singleton(i, SEED), fs[i as usize]);
        }
    }

    #[test]
    fn test_seed_changes_positions() {
        let other = next_seed(SEED);
        assert_ne!(other, SEED);
        let differing = (0..COUNT)
            .filter(|&i| BloomFilter64::singleton(i, SEED) != BloomFilter64::singleton(i, other))
            .count();
        assert!(differing > 0);
    }

    #[test]
    fn test_sticky_and_empty() {
        let mut f = BloomFilter64::new();
        assert!(f.is_empty());
        assert!(!f.is_sticky());
        f.make_sticky();
        assert!(f.is_sticky());
        assert!(f.includes(BloomFilter64::singleton(12345, SEED)));
        assert_eq!(f.popcount(), 64);
        f.clear();
        assert!(f.is_empty());
    }

    #[test]
    fn test_display_is_binary() {
        let f = BloomFilter64::from_bits(0b101);
        let s = f.to_string();
        assert_eq!(s.len(), 64);
        assert!(s.ends_with("101"));
        assert!(s.starts_with("000"));
    }

    #[test]
    fn test_false_positive_rate_between_singletons() {
        let fs = filters();
        let mut count = 0;
        for (i, a) in fs.iter().enumerate() {
            for (j, b) in fs.iter().enumerate() {
                if i != j && a.includes(*b) {
                    count += 1;
                }
            }
        }
        // P(count >= 3) < 0.001 for N = 64, K = 5
        assert!(count < 3, "{} singleton collisions", count);
    }

    #[test]
    fn test_union_false_positive_rate() {
        let fs = filters();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let all: Vec<usize> = (0..COUNT as usize).collect();
        for (i, rounds) in [(2usize, 10usize), (3, 20), (5, 50), (7, 100), (10, 200)] {
            let mut count = 0usize;
            for _ in 0..rounds {
                let xs: Vec<usize> = all.choose_multiple(&mut rng, i).copied().collect();
                let ys: Vec<usize> = all.iter().copied().filter(|y| !xs.contains(y)).collect();
                let u = xs.iter().fold(BloomFilter64::EMPTY, |u, &x| u | fs[x]);
                for &y in ys.choose_multiple(&mut rng, 50) {
                    if u.includes(fs[y]) {
                        count += 1;
                    }
                }
            }
            let n = (rounds * 50) as f64;
            let p = (1.0 - (1.0 - K as f64 / N as f64).powi(i as i32)).powi(K as i32);
            let mean = n * p;
            // distinct positions fill slightly faster than the analytic model
            let bound = 1.5 * mean + 4.0 * mean.sqrt() + 3.0;
            assert!(
                (count as f64) < bound,
                "i = {}: {} false positives, expected ~{:.1}",
                i,
                count,
                mean
            );
        }
    }

    #[quickcheck]
    fn prop_union_includes_members(xs: Vec<u64>, ys: Vec<u64>) -> bool {
        let mut a = BloomFilter64::new();
        for &x in &xs {
            a.insert(x, SEED);
        }
        let mut b = BloomFilter64::new();
        for &y in &ys {
            b.insert(y, SEED);
        }
        let u = a | b;
        xs.iter().chain(ys.iter()).all(|&x| u.contains(x, SEED))
            && u.includes(a)
            && u.includes(b)
    }

    #[quickcheck]
    fn prop_singleton_has_k_bits(x: u64, seed: u64) -> bool {
        BloomFilter64::singleton(x, seed).popcount() == K as u32
    }
}
