// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use opentelemetry::{
    InstrumentationScope,
    metrics::{Counter, Gauge, Meter, MeterProvider},
};

const METER_NAME: &str = "nearcache";
const VERSION: &str = "v0.1.0";
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";
const EVENT_COUNT_NAME: &str = "near_cache.event.count";
const SIZE_NAME: &str = "near_cache.size";

pub(crate) fn create_meter(meter_provider: &dyn MeterProvider) -> Meter {
    meter_provider.meter_with_scope(
        InstrumentationScope::builder(METER_NAME)
            .with_version(VERSION)
            .with_schema_url(SCHEMA_URL)
            .build(),
    )
}

pub(crate) fn create_event_counter(meter: &Meter) -> Counter<u64> {
    meter
        .u64_counter(EVENT_COUNT_NAME)
        .with_description("Near cache protocol events")
        .with_unit("{event}")
        .build()
}

pub(crate) fn create_size_gauge(meter: &Meter) -> Gauge<u64> {
    meter
        .u64_gauge(SIZE_NAME)
        .with_description("Number of entries held by the near cache")
        .with_unit("{entry}")
        .build()
}
