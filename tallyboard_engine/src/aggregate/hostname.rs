//! Traffic share per upstream hostname.

use serde::Serialize;

use super::{Grouped, percentage};
use crate::classify::Classified;

/// Metric name, within the application family
pub const PROVIDER_HOSTNAME: &str = "provider_hostname_count";

/// Requests sent to one hostname
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostStats {
    /// The `hostname` label
    pub hostname: String,
    /// Requests, summed over every sample for this hostname
    pub count: f64,
    /// Share of all hostname requests, as a percentage
    pub percentage: f64,
}

/// Requests per hostname, busiest first, ties broken by hostname.
#[must_use]
pub fn hostname_traffic(classified: &Classified) -> Vec<HostStats> {
    let mut hosts = Grouped::new();
    for sample in classified.application(PROVIDER_HOSTNAME) {
        let hostname = sample.label("hostname");
        hosts
            .entry(hostname, || HostStats {
                hostname: hostname.to_string(),
                count: 0.0,
                percentage: 0.0,
            })
            .count += sample.value;
    }

    let mut rows = hosts.into_rows();
    let total: f64 = rows.iter().map(|h| h.count).sum();
    for row in &mut rows {
        row.percentage = percentage(row.count, total);
    }
    rows.sort_by(|a, b| {
        b.count
            .total_cmp(&a.count)
            .then_with(|| a.hostname.cmp(&b.hostname))
    });
    rows
}

/// Number of distinct hostnames seen.
#[must_use]
pub fn distinct_hostnames(classified: &Classified) -> usize {
    let mut hosts = Grouped::new();
    for sample in classified.application(PROVIDER_HOSTNAME) {
        hosts.entry(sample.label("hostname"), || ());
    }
    hosts.into_rows().len()
}
