// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Lock-free membership filter for near caches.
//!
//! [`MembershipFilter`] is a bloom filter over the canonical bytes of the keys a near cache
//! holds. It never reports a held key as absent; it may report an absent key as present.
//! Bits live in `AtomicU64` words and are set with `fetch_or`, so admissions on many
//! threads never contend on a lock.
//!
//! The filter carries a generation counter. [`MembershipFilter::reset`] bumps it before
//! clearing the bits, which lets callers detect that a reset overlapped with an admission
//! they were performing.
//!
//! # Examples
//!
//! ```
//! use nearcache_bloom::MembershipFilter;
//!
//! let filter = MembershipFilter::for_capacity_with_default_hashes(1000);
//! filter.add(b"user:1");
//!
//! assert!(filter.test(b"user:1"));
//! let generation = filter.generation();
//!
//! filter.reset();
//! assert!(!filter.test(b"user:1"));
//! assert_eq!(filter.generation(), generation + 1);
//! ```

mod filter;
mod xxh3;

#[doc(inline)]
pub use filter::MembershipFilter;
#[doc(inline)]
pub use xxh3::Xxh3HashFamily;
