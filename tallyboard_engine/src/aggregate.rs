//! Reducers from classified samples to derived views.
//!
//! Every reducer is a pure function of a [`crate::Classified`]: it reads the
//! samples, folds them into a fresh view and returns it. No reducer consumes
//! another's output and none keeps state between calls.
//!
//! Rates are percentages in `0.0..=100.0`. A rate whose denominator is zero is
//! `0.0`, never NaN or infinite.

use rustc_hash::FxHashMap;

pub mod hostname;
pub mod media;
pub mod overview;
pub mod provider;
pub mod route;
pub mod tool;

pub use hostname::{HostStats, hostname_traffic};
pub use media::{
    MediaFilter, MediaStats, MediaType, ProviderAttempt, WatchWindow, media_watch_attribution,
};
pub use overview::{Overview, overview};
pub use provider::{
    ProviderFailure, ProviderStats, StatusTotals, provider_failure_ranking,
    provider_status_summary, status_totals,
};
pub use route::{RouteRequests, RouteTiming, route_latency, route_request_counts};
pub use tool::{ToolUsage, provider_tool_usage};

/// `part / whole` as a percentage, `0.0` when `whole` is zero.
#[must_use]
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}

/// Rows keyed by a string, kept in first-encounter order.
///
/// Iteration order is the order keys were first seen, never hash order, so
/// views built from it are reproducible.
#[derive(Debug)]
pub(crate) struct Grouped<V> {
    index: FxHashMap<String, usize>,
    rows: Vec<V>,
}

impl<V> Grouped<V> {
    pub(crate) fn new() -> Self {
        Self {
            index: FxHashMap::default(),
            rows: Vec::new(),
        }
    }

    /// The row for `key`, created with `init` on first sight.
    pub(crate) fn entry(&mut self, key: &str, init: impl FnOnce() -> V) -> &mut V {
        let idx = if let Some(&idx) = self.index.get(key) {
            idx
        } else {
            let idx = self.rows.len();
            self.rows.push(init());
            self.index.insert(key.to_string(), idx);
            idx
        };
        &mut self.rows[idx]
    }

    pub(crate) fn rows(&self) -> &[V] {
        &self.rows
    }

    pub(crate) fn into_rows(self) -> Vec<V> {
        self.rows
    }
}
