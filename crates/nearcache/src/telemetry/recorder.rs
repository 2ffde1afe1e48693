// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#[cfg(any(feature = "metrics", test))]
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Gauge},
};

#[cfg(any(feature = "metrics", test))]
use crate::telemetry::attributes;
use crate::telemetry::Activity;

#[derive(Clone, Debug)]
pub(crate) struct TelemetryInner {
    #[cfg(any(feature = "logs", test))]
    pub(crate) logs_enabled: bool,
    #[cfg(any(feature = "metrics", test))]
    pub(crate) event_counter: Option<Counter<u64>>,
    #[cfg(any(feature = "metrics", test))]
    pub(crate) size_gauge: Option<Gauge<u64>>,
}

impl TelemetryInner {
    pub(crate) fn record(&self, cache_name: &str, activity: Activity) {
        #[cfg(any(feature = "metrics", test))]
        if let Some(counter) = &self.event_counter {
            counter.add(
                1,
                &[
                    KeyValue::new(attributes::NEAR_CACHE_NAME, cache_name.to_owned()),
                    KeyValue::new(attributes::NEAR_CACHE_ACTIVITY, activity.as_str()),
                ],
            );
        }

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            emit(cache_name, activity);
        }
    }

    #[cfg(any(feature = "metrics", test))]
    pub(crate) fn record_size(&self, cache_name: &str, size: u64) {
        if let Some(gauge) = &self.size_gauge {
            gauge.record(size, &[KeyValue::new(attributes::NEAR_CACHE_NAME, cache_name.to_owned())]);
        }
    }
}

#[cfg(any(feature = "logs", test))]
fn emit(cache_name: &str, activity: Activity) {
    let activity_name = activity.as_str();

    // The level of a tracing event must be a constant. Field names mirror attributes.rs.
    macro_rules! emit_event {
        ($level:ident) => {
            tracing::$level!(near_cache.name = cache_name, near_cache.activity = activity_name, "near_cache.event")
        };
    }

    match activity.level() {
        tracing::Level::WARN => emit_event!(warn),
        tracing::Level::INFO => emit_event!(info),
        _ => emit_event!(debug),
    }
}

#[cfg(test)]
mod tests {
    use opentelemetry::KeyValue;

    use super::*;
    use crate::telemetry::{
        TelemetryConfig,
        testing::{LogCapture, MetricTester},
    };

    #[test]
    fn record_counts_activity_with_attributes() {
        let tester = MetricTester::new();
        let telemetry = TelemetryConfig::new().with_metrics(tester.meter_provider()).build();

        telemetry.record("orders", Activity::Miss);

        tester.assert_attributes_contain(&[
            KeyValue::new(attributes::NEAR_CACHE_NAME, "orders"),
            KeyValue::new(attributes::NEAR_CACHE_ACTIVITY, Activity::Miss.as_str()),
        ]);
    }

    #[test]
    fn record_size_reports_cache_name() {
        let tester = MetricTester::new();
        let telemetry = TelemetryConfig::new().with_metrics(tester.meter_provider()).build();

        telemetry.record_size("sized", 12);

        tester.assert_attributes_contain(&[KeyValue::new(attributes::NEAR_CACHE_NAME, "sized")]);
    }

    #[test]
    fn logs_carry_name_and_activity() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        TelemetryConfig::new().with_logs().build().record("users", Activity::Invalidated);

        capture.assert_contains(attributes::NEAR_CACHE_NAME);
        capture.assert_contains(attributes::NEAR_CACHE_ACTIVITY);
        capture.assert_contains(attributes::NEAR_CACHE_EVENT);
        capture.assert_contains("users");
        capture.assert_contains(Activity::Invalidated.as_str());
    }

    #[test]
    fn logs_use_activity_level() {
        for (activity, level) in [
            (Activity::Hit, "DEBUG"),
            (Activity::FullReset, "INFO"),
            (Activity::FilterSyncFailed, "WARN"),
        ] {
            let capture = LogCapture::new();
            let _guard = tracing::subscriber::set_default(capture.subscriber());
            emit("cache", activity);
            capture.assert_contains(level);
        }
    }

    #[test]
    fn metrics_only_config_emits_no_logs() {
        let tester = MetricTester::new();
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        TelemetryConfig::new()
            .with_metrics(tester.meter_provider())
            .build()
            .record("quiet", Activity::Hit);

        assert!(capture.output().is_empty());
    }
}
