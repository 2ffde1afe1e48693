// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    hash::{BuildHasher, Hash},
    sync::atomic::{AtomicU64, Ordering},
};

use foldhash::fast::RandomState;

const STRIPES: u64 = 64;

/// Striped per-key invalidation counters.
///
/// A stamp is bumped before every local removal that stems from a write or an
/// invalidation. A fetch records the stamp of its key before going remote and compares it
/// when admitting: a moved stamp means something invalidated the key in between. Keys
/// sharing a stripe only cause extra, harmless abandonments.
#[derive(Debug)]
pub(crate) struct Stamps {
    stripes: Box<[AtomicU64]>,
    hasher: RandomState,
}

impl Stamps {
    pub(crate) fn new() -> Self {
        Self {
            stripes: (0..STRIPES).map(|_| AtomicU64::new(0)).collect(),
            hasher: RandomState::default(),
        }
    }

    pub(crate) fn current<K: Hash>(&self, key: &K) -> u64 {
        self.stripe(key).load(Ordering::Acquire)
    }

    pub(crate) fn bump<K: Hash>(&self, key: &K) {
        self.stripe(key).fetch_add(1, Ordering::AcqRel);
    }

    fn stripe<K: Hash>(&self, key: &K) -> &AtomicU64 {
        #[expect(clippy::cast_possible_truncation, reason = "reduced modulo the stripe count first")]
        let index = (self.hasher.hash_one(key) % STRIPES) as usize;
        &self.stripes[index]
    }
}
