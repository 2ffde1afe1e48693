// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
pub(crate) const NEAR_CACHE_NAME: &str = "near_cache.name";

#[cfg(any(feature = "metrics", test))]
pub(crate) const NEAR_CACHE_ACTIVITY: &str = "near_cache.activity";

#[cfg(test)]
pub(crate) const NEAR_CACHE_EVENT: &str = "near_cache.event";
