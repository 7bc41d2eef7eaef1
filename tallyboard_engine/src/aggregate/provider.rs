//! Per-provider request outcomes.
//!
//! Built from the application's `provider_status_count` counter, one series per
//! `provider_id` and `status`. Counters are cumulative, so a sample's value is
//! the provider's total for that status and replaces, rather than adds to, any
//! earlier value.

use std::cmp::Ordering;

use serde::Serialize;

use super::{Grouped, percentage};
use crate::classify::Classified;

/// Metric name, within the application family
pub const PROVIDER_STATUS: &str = "provider_status_count";

/// Outcome counts and success rate of one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStats {
    /// The `provider_id` label
    pub provider: String,
    /// Successful requests
    pub success: f64,
    /// Failed requests
    pub failed: f64,
    /// Requests for media the provider did not have
    pub notfound: f64,
    /// `success + failed + notfound`
    pub total: f64,
    /// `success / total` as a percentage
    pub success_rate: f64,
}

/// A provider's share of failed requests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFailure {
    /// The `provider_id` label
    pub provider: String,
    /// `failed / total` as a percentage
    pub failure_rate: f64,
    /// Successful requests
    pub success: f64,
    /// Failed requests
    pub failed: f64,
    /// Not-found requests
    pub notfound: f64,
}

/// Outcome counts summed over every provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusTotals {
    /// Successful requests
    pub success: f64,
    /// Failed requests
    pub failed: f64,
    /// Not-found requests
    pub notfound: f64,
}

#[derive(Debug)]
struct Counts {
    provider: String,
    success: f64,
    failed: f64,
    notfound: f64,
}

fn fold(classified: &Classified) -> Vec<Counts> {
    let mut providers = Grouped::new();
    for sample in classified.application(PROVIDER_STATUS) {
        let provider = sample.label("provider_id");
        let counts = providers.entry(provider, || Counts {
            provider: provider.to_string(),
            success: 0.0,
            failed: 0.0,
            notfound: 0.0,
        });
        match sample.label("status") {
            "success" => counts.success = sample.value,
            "failed" => counts.failed = sample.value,
            "notfound" => counts.notfound = sample.value,
            _ => {}
        }
    }
    providers.into_rows()
}

/// Outcome counts per provider, most requested first.
///
/// Ties are broken by provider id so the order is stable.
#[must_use]
pub fn provider_status_summary(classified: &Classified) -> Vec<ProviderStats> {
    let mut stats: Vec<ProviderStats> = fold(classified)
        .into_iter()
        .map(|c| {
            let total = c.success + c.failed + c.notfound;
            ProviderStats {
                success_rate: percentage(c.success, total),
                provider: c.provider,
                success: c.success,
                failed: c.failed,
                notfound: c.notfound,
                total,
            }
        })
        .collect();
    stats.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.provider.cmp(&b.provider))
    });
    stats
}

/// The `limit` providers with the highest failure rate.
#[must_use]
pub fn provider_failure_ranking(classified: &Classified, limit: usize) -> Vec<ProviderFailure> {
    let mut ranking: Vec<ProviderFailure> = provider_status_summary(classified)
        .into_iter()
        .map(|s| ProviderFailure {
            failure_rate: percentage(s.failed, s.total),
            provider: s.provider,
            success: s.success,
            failed: s.failed,
            notfound: s.notfound,
        })
        .collect();
    ranking.sort_by(|a, b| match b.failure_rate.total_cmp(&a.failure_rate) {
        Ordering::Equal => a.provider.cmp(&b.provider),
        ord => ord,
    });
    ranking.truncate(limit);
    ranking
}

/// Outcome counts summed over all providers.
#[must_use]
pub fn status_totals(classified: &Classified) -> StatusTotals {
    fold(classified)
        .iter()
        .fold(StatusTotals::default(), |acc, c| StatusTotals {
            success: acc.success + c.success,
            failed: acc.failed + c.failed,
            notfound: acc.notfound + c.notfound,
        })
}
