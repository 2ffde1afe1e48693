// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;

/// A family of independent hash functions over canonical key bytes.
///
/// Membership filters set one bit per function. The client and the server must evaluate
/// the same family for a pushed filter to be meaningful.
pub trait HashFamily: Send + Sync + Debug {
    /// Returns the number of functions in the family.
    fn hash_count(&self) -> u32;

    /// Evaluates function `index` over `bytes`.
    ///
    /// `index` is always less than [`hash_count`](HashFamily::hash_count).
    fn hash(&self, index: u32, bytes: &[u8]) -> u64;
}

/// Maps a hash to a bit index of a filter holding `bit_count` bits.
///
/// A `bit_count` of zero is treated as one.
#[must_use]
pub fn bit_position(hash: u64, bit_count: u64) -> u64 {
    hash % bit_count.max(1)
}
