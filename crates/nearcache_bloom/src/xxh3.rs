// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use nearcache_tier::HashFamily;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Hash family built from seeded xxh3.
///
/// Function `i` is xxh3 seeded with `seed + i`, which gives independent functions from a
/// single primitive. The server evaluates pushed filters with the same family, so the seed
/// and hash count must match on both sides.
///
/// # Examples
///
/// ```
/// use nearcache_bloom::Xxh3HashFamily;
/// use nearcache_tier::HashFamily;
///
/// let family = Xxh3HashFamily::default();
/// assert_eq!(family.hash_count(), 3);
/// assert_ne!(family.hash(0, b"key"), family.hash(1, b"key"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Xxh3HashFamily {
    hash_count: u32,
    seed: u64,
}

impl Xxh3HashFamily {
    /// Number of functions in the default family.
    pub const DEFAULT_HASH_COUNT: u32 = 3;

    /// Creates a family of `hash_count` functions starting at `seed`.
    ///
    /// A `hash_count` of zero is raised to one.
    #[must_use]
    pub fn new(hash_count: u32, seed: u64) -> Self {
        Self {
            hash_count: hash_count.max(1),
            seed,
        }
    }

    /// Returns the base seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Default for Xxh3HashFamily {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HASH_COUNT, 0)
    }
}

impl HashFamily for Xxh3HashFamily {
    fn hash_count(&self) -> u32 {
        self.hash_count
    }

    fn hash(&self, index: u32, bytes: &[u8]) -> u64 {
        xxh3_64_with_seed(bytes, self.seed.wrapping_add(u64::from(index)))
    }
}
