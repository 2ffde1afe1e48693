// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Service pattern integration for near cache remote backends.
//!
//! This crate provides [`ServiceRemote`] to convert any `Service<RemoteOperation>` into a
//! [`RemoteCache`](nearcache_tier::RemoteCache), so a transport client composed with
//! middleware (retry, timeout, circuit breaker) can sit underneath a near cache.
//!
//! # Overview
//!
//! - **Service → Remote**: wrap a service with [`ServiceRemote`] and hand it to a near cache
//! - **Near cache → Service**: the `nearcache` crate (feature `service`) implements
//!   `Service<RemoteOperation>` for its decorator, so a near cache can itself be layered
//!
//! # Quick Start
//!
//! ```ignore
//! // Any Service<RemoteOperation> can become a remote cache
//! let remote = ServiceRemote::new(hotrod_client);
//! ```

pub mod adapter;
pub mod request;

#[doc(inline)]
pub use adapter::ServiceRemote;
#[doc(inline)]
pub use request::{GetRequest, PutRequest, RemoteOperation, RemoteResponse, RemoveRequest, VersionedPutRequest, VersionedRemoveRequest};
