// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use crate::{HashFamily, bit_position};

/// An immutable image of a membership filter.
///
/// Snapshots are what a client publishes to the server. The server evaluates
/// [`might_contain`](FilterSnapshot::might_contain) with the same [`HashFamily`] to decide
/// whether an invalidation event is worth sending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterSnapshot {
    generation: u64,
    hash_count: u32,
    bit_count: u64,
    words: Arc<[u64]>,
}

impl FilterSnapshot {
    /// Creates a snapshot from its parts.
    ///
    /// `words` holds the bit array, least significant bit first, 64 bits per word.
    #[must_use]
    pub fn new(generation: u64, hash_count: u32, bit_count: u64, words: impl Into<Arc<[u64]>>) -> Self {
        Self {
            generation,
            hash_count,
            bit_count,
            words: words.into(),
        }
    }

    /// Returns the filter generation the snapshot was taken at.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the number of hash functions the filter uses.
    #[must_use]
    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    /// Returns the size of the bit array.
    #[must_use]
    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    /// Returns the bit array words.
    #[must_use]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns the number of set bits.
    #[must_use]
    pub fn set_bits(&self) -> u64 {
        self.words.iter().map(|word| u64::from(word.count_ones())).sum()
    }

    /// Returns `true` if every bit is clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|word| *word == 0)
    }

    /// Returns `false` only if `bytes` was definitely never added to the filter.
    #[must_use]
    pub fn might_contain(&self, bytes: &[u8], family: &dyn HashFamily) -> bool {
        (0..self.hash_count).all(|index| {
            let position = bit_position(family.hash(index, bytes), self.bit_count);
            self.is_set(position)
        })
    }

    /// Encodes the bit array as little-endian bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|word| word.to_le_bytes()).collect()
    }

    fn is_set(&self, position: u64) -> bool {
        let word = usize::try_from(position / 64).ok().and_then(|index| self.words.get(index));
        word.is_some_and(|word| word & (1 << (position % 64)) != 0)
    }
}
