// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Near cache configuration.
//!
//! A [`NearCacheConfig`] describes one near cache. A [`ClientNearCacheConfig`] holds the
//! client-wide default plus per-cache overrides, and decides which configuration applies to
//! a given cache name.

use std::collections::HashMap;

use nearcache_tier::Capacity;
use regex::Regex;

use crate::ConfigError;

/// Property prefix of the client-wide near cache settings.
pub const NEAR_CACHE_PREFIX: &str = "infinispan.client.hotrod.near_cache.";

/// Property prefix of per-cache settings.
pub const CACHE_PREFIX: &str = "infinispan.client.hotrod.cache.";

const NEAR_CACHE_SEGMENT: &str = ".near_cache.";

/// Whether a near cache is attached to a remote cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NearCacheMode {
    /// Every operation goes straight to the remote cache.
    #[default]
    Disabled,
    /// Reads are served locally and kept consistent through invalidation events.
    Invalidated,
}

impl NearCacheMode {
    /// Returns `true` for [`NearCacheMode::Invalidated`].
    #[must_use]
    pub fn enabled(self) -> bool {
        matches!(self, Self::Invalidated)
    }

    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("disabled") {
            Some(Self::Disabled)
        } else if raw.eq_ignore_ascii_case("invalidated") {
            Some(Self::Invalidated)
        } else {
            None
        }
    }
}

/// Configuration of a single near cache.
///
/// # Examples
///
/// ```
/// use nearcache::{NearCacheConfig, NearCacheMode};
/// use nearcache_tier::Capacity;
///
/// let config = NearCacheConfig::builder()
///     .mode(NearCacheMode::Invalidated)
///     .max_entries(Capacity::Bounded(1_000))
///     .bloom_filter(true)
///     .build();
///
/// assert!(config.validate("orders").is_ok());
/// ```
#[derive(Clone, Debug, Default)]
pub struct NearCacheConfig {
    mode: NearCacheMode,
    max_entries: Option<Capacity>,
    bloom_filter: bool,
    cache_name_pattern: Option<NamePattern>,
    filter_resync_threshold: Option<u64>,
    stampede_protection: bool,
}

impl NearCacheConfig {
    /// Creates a builder for a disabled configuration.
    #[must_use]
    pub fn builder() -> NearCacheConfigBuilder {
        NearCacheConfigBuilder::default()
    }

    /// Returns a configuration with near caching disabled.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Returns the configured mode.
    #[must_use]
    pub fn mode(&self) -> NearCacheMode {
        self.mode
    }

    /// Returns the local entry bound, if configured.
    #[must_use]
    pub fn max_entries(&self) -> Option<Capacity> {
        self.max_entries
    }

    /// Returns `true` if a membership filter is published to the server.
    #[must_use]
    pub fn bloom_filter(&self) -> bool {
        self.bloom_filter
    }

    /// Returns the pattern cache names must fully match, if configured.
    #[must_use]
    pub fn cache_name_pattern(&self) -> Option<&str> {
        self.cache_name_pattern.as_ref().map(|pattern| pattern.source.as_str())
    }

    /// Returns the churn after which the filter is considered out of date.
    ///
    /// Defaults to the capacity bound.
    #[must_use]
    pub fn filter_resync_threshold(&self) -> Option<u64> {
        self.filter_resync_threshold
            .or_else(|| self.max_entries.and_then(Capacity::bound))
    }

    /// Returns `true` if concurrent misses for one key share a single remote fetch.
    #[must_use]
    pub fn stampede_protection(&self) -> bool {
        self.stampede_protection
    }

    /// Returns `true` if the name pattern is absent or fully matches `cache_name`.
    #[must_use]
    pub fn matches(&self, cache_name: &str) -> bool {
        self.cache_name_pattern
            .as_ref()
            .is_none_or(|pattern| pattern.anchored.is_match(cache_name))
    }

    /// Checks the configuration for `cache_name`.
    ///
    /// # Errors
    ///
    /// Returns an error when near caching is enabled without a capacity, or when the bloom
    /// filter is requested without a bounded capacity.
    pub fn validate(&self, cache_name: &str) -> Result<(), ConfigError> {
        if !self.mode.enabled() {
            return Ok(());
        }

        match self.max_entries {
            None => Err(ConfigError::caused_by(
                cache_name,
                "max_entries is required when the near cache is enabled",
            )),
            Some(Capacity::Unbounded) if self.bloom_filter => Err(ConfigError::caused_by(
                cache_name,
                "the bloom filter requires a bounded max_entries",
            )),
            Some(_) => Ok(()),
        }
    }
}

/// Builder for [`NearCacheConfig`].
#[derive(Clone, Debug, Default)]
pub struct NearCacheConfigBuilder {
    config: NearCacheConfig,
}

impl NearCacheConfigBuilder {
    /// Sets the mode.
    #[must_use]
    pub fn mode(mut self, mode: NearCacheMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Sets the local entry bound.
    #[must_use]
    pub fn max_entries(mut self, capacity: Capacity) -> Self {
        self.config.max_entries = Some(capacity);
        self
    }

    /// Sets the local entry bound from its raw form, where `-1` means unbounded.
    ///
    /// # Errors
    ///
    /// Returns an error for negative values other than `-1`.
    pub fn max_entries_raw(self, raw: i64) -> Result<Self, ConfigError> {
        let capacity = Capacity::from_raw(raw)
            .ok_or_else(|| ConfigError::caused_by("*", format!("max_entries must be -1 or non-negative, got {raw}")))?;
        Ok(self.max_entries(capacity))
    }

    /// Enables or disables the membership filter.
    #[must_use]
    pub fn bloom_filter(mut self, enabled: bool) -> Self {
        self.config.bloom_filter = enabled;
        self
    }

    /// Restricts the configuration to caches whose name fully matches `pattern`.
    ///
    /// # Errors
    ///
    /// Returns an error if `pattern` is not a valid regular expression.
    pub fn cache_name_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.config.cache_name_pattern = Some(NamePattern::new("*", pattern)?);
        Ok(self)
    }

    /// Sets the churn after which the filter is considered out of date.
    #[must_use]
    pub fn filter_resync_threshold(mut self, threshold: u64) -> Self {
        self.config.filter_resync_threshold = Some(threshold);
        self
    }

    /// Merges concurrent misses for one key into a single remote fetch.
    #[must_use]
    pub fn stampede_protection(mut self, enabled: bool) -> Self {
        self.config.stampede_protection = enabled;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> NearCacheConfig {
        self.config
    }
}

/// A cache name pattern compiled for whole-name matching.
#[derive(Clone, Debug)]
struct NamePattern {
    source: String,
    anchored: Regex,
}

impl NamePattern {
    fn new(cache_name: &str, source: &str) -> Result<Self, ConfigError> {
        let anchored = Regex::new(&format!("^(?:{source})$")).map_err(|error| ConfigError::caused_by(cache_name, error))?;
        Ok(Self {
            source: source.to_string(),
            anchored,
        })
    }
}

/// Client-wide near cache settings: a default plus per-cache overrides.
///
/// # Examples
///
/// ```
/// use nearcache::{ClientNearCacheConfig, NearCacheMode};
///
/// let config = ClientNearCacheConfig::from_properties([
///     ("infinispan.client.hotrod.near_cache.mode", "INVALIDATED"),
///     ("infinispan.client.hotrod.near_cache.max_entries", "100"),
///     ("infinispan.client.hotrod.near_cache.name_pattern", "orders.*"),
/// ])?;
///
/// assert_eq!(config.resolve("orders-eu").mode(), NearCacheMode::Invalidated);
/// assert_eq!(config.resolve("users").mode(), NearCacheMode::Disabled);
/// # Ok::<(), nearcache::ConfigError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct ClientNearCacheConfig {
    default: NearCacheConfig,
    per_cache: HashMap<String, NearCacheConfig>,
}

impl ClientNearCacheConfig {
    /// Creates settings with the given client-wide default.
    #[must_use]
    pub fn new(default: NearCacheConfig) -> Self {
        Self {
            default,
            per_cache: HashMap::new(),
        }
    }

    /// Adds an override for one cache.
    #[must_use]
    pub fn with_cache(mut self, cache_name: impl Into<String>, config: NearCacheConfig) -> Self {
        self.per_cache.insert(cache_name.into(), config);
        self
    }

    /// Returns the client-wide default.
    #[must_use]
    pub fn default_config(&self) -> &NearCacheConfig {
        &self.default
    }

    /// Returns the configuration that applies to `cache_name`.
    ///
    /// A per-cache override wins. Otherwise the default applies when its name pattern
    /// matches, and near caching is disabled when it does not.
    #[must_use]
    pub fn resolve(&self, cache_name: &str) -> NearCacheConfig {
        if let Some(config) = self.per_cache.get(cache_name) {
            return config.clone();
        }

        if self.default.matches(cache_name) {
            self.default.clone()
        } else {
            NearCacheConfig::disabled()
        }
    }

    /// Parses client properties.
    ///
    /// Client-wide keys live under [`NEAR_CACHE_PREFIX`]; per-cache keys have the form
    /// `infinispan.client.hotrod.cache.<name>.near_cache.<setting>`, where `<name>` may be
    /// wrapped in brackets when it contains dots. The recognised settings are `mode`,
    /// `max_entries`, `name_pattern` and `bloom_filter`. Unrelated keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error when a recognised setting has a malformed value.
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut default = NearCacheConfig::default();
        let mut per_cache: HashMap<String, NearCacheConfig> = HashMap::new();

        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref().trim());

            if let Some(setting) = key.strip_prefix(NEAR_CACHE_PREFIX) {
                apply_setting(&mut default, "*", setting, value)?;
            } else if let Some((cache_name, setting)) = split_cache_key(key) {
                let config = per_cache.entry(cache_name.to_string()).or_default();
                apply_setting(config, cache_name, setting, value)?;
            }
        }

        Ok(Self { default, per_cache })
    }
}

fn split_cache_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix(CACHE_PREFIX)?;
    let split = rest.rfind(NEAR_CACHE_SEGMENT)?;
    let (name, setting) = (&rest[..split], &rest[split + NEAR_CACHE_SEGMENT.len()..]);
    let name = name
        .strip_prefix('[')
        .and_then(|name| name.strip_suffix(']'))
        .unwrap_or(name);
    Some((name, setting))
}

fn apply_setting(config: &mut NearCacheConfig, cache_name: &str, setting: &str, value: &str) -> Result<(), ConfigError> {
    match setting {
        "mode" => {
            config.mode = NearCacheMode::parse(value)
                .ok_or_else(|| ConfigError::caused_by(cache_name, format!("unknown near cache mode '{value}'")))?;
        }
        "max_entries" => {
            let capacity = value
                .parse::<i64>()
                .ok()
                .and_then(Capacity::from_raw)
                .ok_or_else(|| ConfigError::caused_by(cache_name, format!("max_entries must be -1 or non-negative, got '{value}'")))?;
            config.max_entries = Some(capacity);
        }
        "name_pattern" => {
            config.cache_name_pattern = Some(NamePattern::new(cache_name, value)?);
        }
        "bloom_filter" => {
            config.bloom_filter = value
                .parse::<bool>()
                .map_err(|error| ConfigError::caused_by(cache_name, error))?;
        }
        _ => {}
    }
    Ok(())
}
