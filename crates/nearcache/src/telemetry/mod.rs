// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Near cache telemetry.
//!
//! With the `metrics` feature every protocol activity increments the
//! `near_cache.event.count` counter and the local size is reported through the
//! `near_cache.size` gauge. With the `logs` feature each activity is also emitted as a
//! structured `tracing` event.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::metrics::MeterProvider;
#[cfg(any(feature = "logs", feature = "metrics", test))]
use recorder::TelemetryInner;
#[cfg(any(feature = "logs", feature = "metrics", test))]
use thread_aware::{Arc, PerCore};

pub(crate) mod attributes;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(any(feature = "logs", feature = "metrics", test))]
mod recorder;
#[cfg(test)]
pub(crate) mod testing;

/// Telemetry settings of a near cache.
///
/// Everything is disabled by default. Pass the configured value to
/// `NearCacheServiceBuilder::telemetry`.
///
/// # Examples
///
/// ```ignore
/// let telemetry = TelemetryConfig::new().with_logs().with_metrics(&meter_provider);
/// ```
#[derive(Clone, Debug, Default)]
pub struct TelemetryConfig {
    #[cfg(any(feature = "logs", test))]
    logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    meter: Option<opentelemetry::metrics::Meter>,
}

impl TelemetryConfig {
    /// Creates settings with everything disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits every protocol activity as a structured `tracing` event.
    #[cfg(any(feature = "logs", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "logs")))]
    #[must_use]
    pub fn with_logs(mut self) -> Self {
        self.logs_enabled = true;
        self
    }

    /// Records activity counts and the local size with OpenTelemetry.
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn with_metrics(mut self, provider: &dyn MeterProvider) -> Self {
        self.meter = Some(metrics::create_meter(provider));
        self
    }

    pub(crate) fn build(self) -> Telemetry {
        #[cfg(not(any(feature = "logs", feature = "metrics", test)))]
        {
            return Telemetry {};
        }

        #[cfg(any(feature = "logs", feature = "metrics", test))]
        {
            Telemetry {
                inner: Arc::from_unaware(TelemetryInner {
                    #[cfg(any(feature = "logs", test))]
                    logs_enabled: self.logs_enabled,
                    #[cfg(any(feature = "metrics", test))]
                    event_counter: self.meter.as_ref().map(metrics::create_event_counter),
                    #[cfg(any(feature = "metrics", test))]
                    size_gauge: self.meter.as_ref().map(metrics::create_size_gauge),
                }),
            }
        }
    }
}

/// Records protocol activities.
#[derive(Clone, Debug)]
pub(crate) struct Telemetry {
    #[cfg(any(feature = "logs", feature = "metrics", test))]
    inner: Arc<TelemetryInner, PerCore>,
}

impl Telemetry {
    #[inline]
    pub(crate) fn record(&self, cache_name: &str, activity: Activity) {
        #[cfg(any(feature = "logs", feature = "metrics", test))]
        self.inner.record(cache_name, activity);

        #[cfg(not(any(feature = "logs", feature = "metrics", test)))]
        let _ = (cache_name, activity);
    }

    #[inline]
    pub(crate) fn record_size(&self, cache_name: &str, size: u64) {
        #[cfg(any(feature = "metrics", test))]
        self.inner.record_size(cache_name, size);

        #[cfg(not(any(feature = "metrics", test)))]
        let _ = (cache_name, size);
    }
}

/// What the near cache just did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Activity {
    Hit,
    Miss,
    Admitted,
    Abandoned,
    PreemptiveRemove,
    Invalidated,
    FullReset,
    FilterSync,
    FilterSyncFailed,
    ConnectionLost,
    Reconnected,
}

impl Activity {
    #[cfg(any(feature = "logs", feature = "metrics", test))]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "near_cache.hit",
            Self::Miss => "near_cache.miss",
            Self::Admitted => "near_cache.admitted",
            Self::Abandoned => "near_cache.abandoned",
            Self::PreemptiveRemove => "near_cache.preemptive_remove",
            Self::Invalidated => "near_cache.invalidated",
            Self::FullReset => "near_cache.full_reset",
            Self::FilterSync => "near_cache.filter_sync",
            Self::FilterSyncFailed => "near_cache.filter_sync_failed",
            Self::ConnectionLost => "near_cache.connection_lost",
            Self::Reconnected => "near_cache.reconnected",
        }
    }

    #[cfg(any(feature = "logs", test))]
    pub fn level(self) -> tracing::Level {
        match self {
            Self::Hit | Self::Miss | Self::Admitted | Self::Abandoned | Self::PreemptiveRemove | Self::Invalidated => {
                tracing::Level::DEBUG
            }
            Self::FullReset | Self::FilterSync | Self::ConnectionLost | Self::Reconnected => tracing::Level::INFO,
            Self::FilterSyncFailed => tracing::Level::WARN,
        }
    }
}
