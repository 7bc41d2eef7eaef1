//! One snapshot of every derived view.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error,
    aggregate::{
        self, HostStats, MediaFilter, MediaStats, Overview, ProviderFailure, ProviderStats,
        RouteRequests, RouteTiming, StatusTotals, ToolUsage, WatchWindow,
    },
    classify::{Classified, Prefixes, classify},
    parser::parse,
};

/// Table size preset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Short tables for narrow terminals
    Compact,
    /// Full size tables
    #[default]
    Wide,
}

/// Maximum rows per truncated view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Limits {
    /// Provider failure ranking
    pub failures: usize,
    /// Tool usage
    pub tools: usize,
    /// Media attribution, when no filter is active
    pub media: usize,
    /// Route latency
    pub routes: usize,
    /// Route request counts
    pub route_requests: usize,
}

impl Limits {
    /// Ten failing providers.
    #[must_use]
    pub fn compact() -> Self {
        Self {
            failures: 10,
            ..Self::wide()
        }
    }

    /// Twenty failing providers.
    #[must_use]
    pub fn wide() -> Self {
        Self {
            failures: 20,
            tools: 10,
            media: 20,
            routes: 10,
            route_requests: 10,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::wide()
    }
}

impl From<Layout> for Limits {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Compact => Self::compact(),
            Layout::Wide => Self::wide(),
        }
    }
}

/// Parameters of a dashboard build
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewOptions {
    /// Family prefixes for classification
    pub prefixes: Prefixes,
    /// Row limits
    pub limits: Limits,
    /// Media title filter
    pub media_filter: MediaFilter,
    /// Which watch counter feeds the media view
    pub watch_window: WatchWindow,
}

/// Every view derived from one payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    /// Samples the parser produced, classified or not
    pub samples: usize,
    /// Headline numbers
    pub overview: Overview,
    /// Outcomes per provider
    pub provider_status: Vec<ProviderStats>,
    /// Outcomes over all providers
    pub status_totals: StatusTotals,
    /// Providers by failure rate
    pub provider_failures: Vec<ProviderFailure>,
    /// Tool invocations
    pub tool_usage: Vec<ToolUsage>,
    /// Requests per hostname
    pub hostnames: Vec<HostStats>,
    /// Watch attempts per title
    pub media: Vec<MediaStats>,
    /// Slowest routes
    pub route_latency: Vec<RouteTiming>,
    /// Requests per route
    pub route_requests: Vec<RouteRequests>,
    /// The classified samples every view was built from
    pub classified: Classified,
}

impl Dashboard {
    /// Parse `text` and build every view from it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyInput`] when `text` is empty or only whitespace.
    pub fn build(text: &str, options: &ViewOptions) -> Result<Self, Error> {
        let samples = parse(text)?;
        let classified = classify(&samples, &options.prefixes);
        debug!(
            samples = samples.len(),
            classified = classified.len(),
            "building dashboard"
        );
        Ok(Self::from_classified(samples.len(), classified, options))
    }

    fn from_classified(samples: usize, classified: Classified, options: &ViewOptions) -> Self {
        let limits = options.limits;
        Self {
            samples,
            overview: aggregate::overview(&classified),
            provider_status: aggregate::provider_status_summary(&classified),
            status_totals: aggregate::status_totals(&classified),
            provider_failures: aggregate::provider_failure_ranking(&classified, limits.failures),
            tool_usage: aggregate::provider_tool_usage(&classified, limits.tools),
            hostnames: aggregate::hostname_traffic(&classified),
            media: aggregate::media_watch_attribution(
                &classified,
                options.watch_window,
                &options.media_filter,
                limits.media,
            ),
            route_latency: aggregate::route_latency(&classified, limits.routes),
            route_requests: aggregate::route_request_counts(&classified, limits.route_requests),
            classified,
        }
    }
}
