// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory tiers.
//!
//! This module provides a builder API for `InMemoryTier` that abstracts the underlying moka
//! configuration, providing a stable API surface without exposing moka's types.

use std::hash::Hash;
use std::marker::PhantomData;

use nearcache_tier::Capacity;

use crate::tier::InMemoryTier;

/// Builder for configuring an `InMemoryTier`.
///
/// # Examples
///
/// ```
/// use nearcache_memory::InMemoryTier;
///
/// let tier = InMemoryTier::<String, i32>::builder()
///     .max_capacity(1000)
///     .initial_capacity(100)
///     .name("orders")
///     .build();
/// ```
#[derive(Debug)]
pub struct InMemoryTierBuilder<K, V> {
    pub(crate) capacity: Capacity,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<(K, V)>,
}

impl<K, V> Default for InMemoryTierBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> InMemoryTierBuilder<K, V> {
    /// Creates a new builder for an unbounded tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            capacity: Capacity::Unbounded,
            initial_capacity: None,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Sets the entry bound of the tier.
    ///
    /// Once a bounded tier holds more entries than its bound, the least recently used
    /// entries are evicted.
    ///
    /// # Examples
    ///
    /// ```
    /// use nearcache_memory::InMemoryTier;
    /// use nearcache_tier::Capacity;
    ///
    /// let tier = InMemoryTier::<String, i32>::builder()
    ///     .capacity(Capacity::Unbounded)
    ///     .build();
    /// ```
    #[must_use]
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Shorthand for `capacity(Capacity::Bounded(max))`.
    #[must_use]
    pub fn max_capacity(self, max: u64) -> Self {
        self.capacity(Capacity::Bounded(max))
    }

    /// Sets the initial capacity (pre-allocation hint) for the tier.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets a name for the tier.
    ///
    /// This name may appear in logs or debugging output from the underlying cache.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured `InMemoryTier`.
    #[must_use]
    pub fn build(self) -> InMemoryTier<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        InMemoryTier::from_builder(&self)
    }
}
