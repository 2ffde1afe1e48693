// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Configuration errors.

/// A near cache configuration was rejected.
///
/// Configuration faults are fatal: they surface when a near cache is built, never on the
/// data path.
///
/// # Examples
///
/// ```
/// use nearcache::ConfigError;
///
/// let error = ConfigError::caused_by("orders", "max_entries is required");
/// assert!(error.to_string().contains("orders"));
/// ```
#[ohno::error]
#[display("invalid near cache configuration for cache '{cache_name}'")]
pub struct ConfigError {
    cache_name: String,
}

impl ConfigError {
    /// Returns the name of the cache whose configuration was rejected.
    #[must_use]
    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }
}
