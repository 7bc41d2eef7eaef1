//! Watch attempts per title, broken down by provider.
//!
//! Each `media_watch_count` series counts attempts to watch one title
//! (`tmdb_full_id`) through one provider, split by whether the attempt
//! succeeded. Titles accumulate their providers' counts as samples arrive and
//! recompute their success rate after every sample.

use serde::{Deserialize, Serialize};

use super::{Grouped, percentage};
use crate::classify::Classified;

/// Metric name, within the application family
pub const MEDIA_WATCH: &str = "media_watch_count";

/// Which watch counter to read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchWindow {
    /// `media_watch_count`, all attempts since the process started
    #[default]
    Lifetime,
    /// `media_watch_count_daily`
    Daily,
    /// `media_watch_count_weekly`
    Weekly,
    /// `media_watch_count_monthly`
    Monthly,
}

impl WatchWindow {
    /// Name of the counter for this window, within the application family.
    #[must_use]
    pub fn metric(self) -> &'static str {
        match self {
            Self::Lifetime => MEDIA_WATCH,
            Self::Daily => "media_watch_count_daily",
            Self::Weekly => "media_watch_count_weekly",
            Self::Monthly => "media_watch_count_monthly",
        }
    }
}

/// Restricts which titles are reported
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MediaFilter {
    /// Every title, truncated to the row limit
    #[default]
    None,
    /// Titles whose title contains this text, ignoring case
    Title(String),
    /// Titles this provider served successfully at least once
    Provider(String),
}

impl MediaFilter {
    /// A blank search term filters nothing.
    fn is_active(&self) -> bool {
        match self {
            Self::None => false,
            Self::Title(term) | Self::Provider(term) => !term.trim().is_empty(),
        }
    }

    fn admits(&self, stats: &MediaStats) -> bool {
        if !self.is_active() {
            return true;
        }
        match self {
            Self::None => true,
            Self::Title(needle) => stats
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            Self::Provider(id) => stats
                .attempts
                .iter()
                .any(|a| a.provider_id == *id && a.success_count > 0.0),
        }
    }
}

/// Whether a title is a movie or a show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    /// Id starts with `movie-`
    Movie,
    /// Anything else
    Show,
}

impl MediaType {
    fn of(tmdb_id: &str) -> Self {
        if tmdb_id.starts_with("movie-") {
            Self::Movie
        } else {
            Self::Show
        }
    }
}

/// Attempts to watch one title through one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderAttempt {
    /// The `provider_id` label
    pub provider_id: String,
    /// `success_count + failure_count`
    pub count: f64,
    /// Attempts labelled `success="true"`
    pub success_count: f64,
    /// All other attempts
    pub failure_count: f64,
}

/// Watch attempts for one title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaStats {
    /// The `title` label of the first sample seen for this title
    pub title: String,
    /// The `tmdb_full_id` label
    pub tmdb_id: String,
    /// Derived from the id
    pub media_type: MediaType,
    /// Per provider, in first-encounter order
    pub attempts: Vec<ProviderAttempt>,
    /// Attempts over all providers
    pub total_count: f64,
    /// Successful attempts over `total_count`, as a percentage
    pub success_rate: f64,
}

#[derive(Debug)]
struct Title {
    stats: MediaStats,
    providers: Grouped<ProviderAttempt>,
}

impl Title {
    fn record(&mut self, provider_id: &str, success: bool, value: f64) {
        let attempt = self.providers.entry(provider_id, || ProviderAttempt {
            provider_id: provider_id.to_string(),
            count: 0.0,
            success_count: 0.0,
            failure_count: 0.0,
        });
        if success {
            attempt.success_count += value;
        } else {
            attempt.failure_count += value;
        }
        attempt.count += value;

        self.stats.total_count += value;
        let successes: f64 = self.providers.rows().iter().map(|a| a.success_count).sum();
        self.stats.success_rate = percentage(successes, self.stats.total_count);
    }

    fn finish(self) -> MediaStats {
        MediaStats {
            attempts: self.providers.into_rows(),
            ..self.stats
        }
    }
}

/// Watch attempts per title, most watched first.
///
/// Without a filter at most `limit` titles are returned. An active filter
/// returns every matching title.
#[must_use]
pub fn media_watch_attribution(
    classified: &Classified,
    window: WatchWindow,
    filter: &MediaFilter,
    limit: usize,
) -> Vec<MediaStats> {
    let mut titles = Grouped::new();
    for sample in classified.application(window.metric()) {
        let tmdb_id = sample.label("tmdb_full_id");
        let title = titles.entry(tmdb_id, || Title {
            stats: MediaStats {
                title: sample.label("title").to_string(),
                tmdb_id: tmdb_id.to_string(),
                media_type: MediaType::of(tmdb_id),
                attempts: Vec::new(),
                total_count: 0.0,
                success_rate: 0.0,
            },
            providers: Grouped::new(),
        });
        title.record(
            sample.label("provider_id"),
            sample.label("success") == "true",
            sample.value,
        );
    }

    let mut rows: Vec<MediaStats> = titles
        .into_rows()
        .into_iter()
        .map(Title::finish)
        .filter(|stats| filter.admits(stats))
        .collect();
    rows.sort_by(|a, b| {
        b.total_count
            .total_cmp(&a.total_count)
            .then_with(|| a.tmdb_id.cmp(&b.tmdb_id))
    });
    if !filter.is_active() {
        rows.truncate(limit);
    }
    rows
}
