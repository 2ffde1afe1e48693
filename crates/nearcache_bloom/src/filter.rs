// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nearcache_tier::{FilterSnapshot, HashFamily, bit_position};

use crate::Xxh3HashFamily;

const WORD_BITS: u64 = 64;

/// A concurrent bloom filter with a generation counter.
///
/// All operations take `&self`. [`add`](Self::add) and [`test`](Self::test) are lock-free.
/// [`reset`](Self::reset) is not atomic with respect to concurrent adds: an add that
/// overlaps a reset may lose its bits, which callers detect by comparing
/// [`generation`](Self::generation) before and after.
pub struct MembershipFilter {
    words: Box<[AtomicU64]>,
    bit_count: u64,
    generation: AtomicU64,
    family: Arc<dyn HashFamily>,
}

impl MembershipFilter {
    /// Smallest bit array a filter is built with.
    pub const MIN_BITS: u64 = 64;

    /// Bits allocated per expected entry by [`for_capacity`](Self::for_capacity).
    pub const BITS_PER_ENTRY: u64 = 4;

    /// Creates a filter of at least `bit_count` bits using `family`.
    ///
    /// The bit count is raised to [`MIN_BITS`](Self::MIN_BITS) and rounded up to a whole
    /// number of 64-bit words.
    #[must_use]
    pub fn new(bit_count: u64, family: Arc<dyn HashFamily>) -> Self {
        let word_count = bit_count.max(Self::MIN_BITS).div_ceil(WORD_BITS);
        let words: Box<[AtomicU64]> = (0..word_count).map(|_| AtomicU64::new(0)).collect();

        Self {
            bit_count: word_count * WORD_BITS,
            words,
            generation: AtomicU64::new(0),
            family,
        }
    }

    /// Creates a filter sized for a local tier holding at most `capacity` entries.
    #[must_use]
    pub fn for_capacity(capacity: u64, family: Arc<dyn HashFamily>) -> Self {
        Self::new(capacity.saturating_mul(Self::BITS_PER_ENTRY), family)
    }

    /// Creates a filter sized for `capacity` entries using [`Xxh3HashFamily::default`].
    #[must_use]
    pub fn for_capacity_with_default_hashes(capacity: u64) -> Self {
        Self::for_capacity(capacity, Arc::new(Xxh3HashFamily::default()))
    }

    /// Records `bytes` as possibly present.
    pub fn add(&self, bytes: &[u8]) {
        for index in 0..self.family.hash_count() {
            let (word, mask) = self.locate(index, bytes);
            word.fetch_or(mask, Ordering::AcqRel);
        }
    }

    /// Returns `false` only if `bytes` was definitely not added since the last reset.
    #[must_use]
    pub fn test(&self, bytes: &[u8]) -> bool {
        (0..self.family.hash_count()).all(|index| {
            let (word, mask) = self.locate(index, bytes);
            word.load(Ordering::Acquire) & mask != 0
        })
    }

    /// Clears every bit.
    ///
    /// The generation is bumped before the bits are cleared.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        for word in &self.words {
            word.store(0, Ordering::Release);
        }
    }

    /// Creates an empty filter with the same size and hash family.
    ///
    /// Used to rebuild the contents off to the side before [`publish`](Self::publish).
    #[must_use]
    pub fn empty_like(&self) -> Self {
        Self::new(self.bit_count, Arc::clone(&self.family))
    }

    /// Replaces the bits of this filter with those of `rebuilt` and bumps the generation.
    ///
    /// Words are stored one at a time, so callers must keep concurrent adders out while
    /// publishing. Filters of a different size are rejected and leave `self` unchanged.
    ///
    /// Returns `true` if the bits were replaced.
    pub fn publish(&self, rebuilt: &Self) -> bool {
        if rebuilt.bit_count != self.bit_count {
            return false;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        for (word, source) in self.words.iter().zip(rebuilt.words.iter()) {
            word.store(source.load(Ordering::Acquire), Ordering::Release);
        }
        true
    }

    /// Returns the number of resets and publishes performed so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Returns the size of the bit array.
    #[must_use]
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Returns the number of hash functions.
    #[must_use]
    pub fn hash_count(&self) -> u32 {
        self.family.hash_count()
    }

    /// Returns the number of set bits.
    ///
    /// Density grows with churn; a dense filter lets more invalidations through.
    #[must_use]
    pub fn set_bits(&self) -> u64 {
        self.words
            .iter()
            .map(|word| u64::from(word.load(Ordering::Relaxed).count_ones()))
            .sum()
    }

    /// Returns the hash family shared with the server.
    #[must_use]
    pub fn family(&self) -> &Arc<dyn HashFamily> {
        &self.family
    }

    /// Copies the current bits into an immutable snapshot.
    ///
    /// Bits set concurrently with the copy may or may not be included.
    #[must_use]
    pub fn snapshot(&self) -> FilterSnapshot {
        let generation = self.generation();
        let words: Vec<u64> = self.words.iter().map(|word| word.load(Ordering::Acquire)).collect();
        FilterSnapshot::new(generation, self.hash_count(), self.bit_count, words)
    }

    fn locate(&self, index: u32, bytes: &[u8]) -> (&AtomicU64, u64) {
        let position = bit_position(self.family.hash(index, bytes), self.bit_count);
        // position < bit_count == words.len() * 64, so the word index is in bounds
        #[expect(clippy::cast_possible_truncation, reason = "word index is bounded by the slice length")]
        let word = &self.words[(position / WORD_BITS) as usize];
        (word, 1 << (position % WORD_BITS))
    }
}

impl fmt::Debug for MembershipFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MembershipFilter")
            .field("bit_count", &self.bit_count)
            .field("hash_count", &self.hash_count())
            .field("generation", &self.generation())
            .field("set_bits", &self.set_bits())
            .field("family", &self.family)
            .finish()
    }
}
