//! HTTP route latency and request volume.
//!
//! Read from the `request_duration_seconds` histogram of the http family. Only
//! its `_sum` and `_count` series are used; buckets are ignored.

use serde::Serialize;

use super::Grouped;
use crate::classify::Classified;

/// Histogram sum, within the http family
pub const DURATION_SUM: &str = "request_duration_seconds_sum";
/// Histogram count, within the http family
pub const DURATION_COUNT: &str = "request_duration_seconds_count";

/// Mean latency of one route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteTiming {
    /// The `method` label
    pub method: String,
    /// The `route` label
    pub route: String,
    /// Total seconds spent serving the route
    pub sum: f64,
    /// Requests served
    pub count: f64,
    /// `sum / count` in milliseconds, `0.0` before the first request
    pub average_ms: f64,
}

/// Requests served by one route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteRequests {
    /// `"METHOD route"`
    pub route: String,
    /// Requests served
    pub count: f64,
}

/// The `limit` slowest routes by mean latency.
///
/// Samples without both a `method` and a `route` label are skipped. Ties are
/// ordered by method, then route.
#[must_use]
pub fn route_latency(classified: &Classified, limit: usize) -> Vec<RouteTiming> {
    let mut routes = Grouped::new();
    let series = classified
        .http(DURATION_SUM)
        .map(|s| (s, true))
        .chain(classified.http(DURATION_COUNT).map(|s| (s, false)));
    for (sample, is_sum) in series {
        let Some(labels) = sample.labels.as_ref() else {
            continue;
        };
        let (Some(method), Some(route)) = (labels.get("method"), labels.get("route")) else {
            continue;
        };
        let timing = routes.entry(&format!("{method} {route}"), || RouteTiming {
            method: method.to_string(),
            route: route.to_string(),
            sum: 0.0,
            count: 0.0,
            average_ms: 0.0,
        });
        if is_sum {
            timing.sum = sample.value;
        } else {
            timing.count = sample.value;
        }
    }

    let mut rows = routes.into_rows();
    for row in &mut rows {
        row.average_ms = if row.count == 0.0 {
            0.0
        } else {
            row.sum / row.count * 1000.0
        };
    }
    rows.sort_by(|a, b| {
        b.average_ms
            .total_cmp(&a.average_ms)
            .then_with(|| a.method.cmp(&b.method))
            .then_with(|| a.route.cmp(&b.route))
    });
    rows.truncate(limit);
    rows
}

/// Request counts of the first `limit` routes, in the order they appear.
#[must_use]
pub fn route_request_counts(classified: &Classified, limit: usize) -> Vec<RouteRequests> {
    classified
        .http(DURATION_COUNT)
        .take(limit)
        .map(|sample| RouteRequests {
            route: format!("{} {}", sample.label("method"), sample.label("route")),
            count: sample.value,
        })
        .collect()
}
