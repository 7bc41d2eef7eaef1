//! Headline numbers shown above every other view.

use serde::Serialize;

use super::{hostname, media::MEDIA_WATCH};
use crate::classify::Classified;

/// Connected users, within the application family
pub const USER_COUNT: &str = "user_count";
/// Event loop lag in seconds, within the runtime family
pub const EVENT_LOOP_LAG: &str = "eventloop_lag_seconds";

/// Headline scalars
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    /// Sum of every lifetime watch counter
    pub total_watch_requests: f64,
    /// Distinct upstream hostnames
    pub distinct_hostnames: usize,
    /// First user count sample, `0` when absent
    pub active_users: f64,
    /// Event loop lag in seconds to three decimals, `"0.000"` when absent
    pub event_loop_lag: String,
}

/// Compute the headline scalars.
#[must_use]
pub fn overview(classified: &Classified) -> Overview {
    let lag = classified
        .runtime(EVENT_LOOP_LAG)
        .next()
        .map_or(0.0, |s| s.value);
    Overview {
        total_watch_requests: classified.application(MEDIA_WATCH).map(|s| s.value).sum(),
        distinct_hostnames: hostname::distinct_hostnames(classified),
        active_users: classified
            .application(USER_COUNT)
            .next()
            .map_or(0.0, |s| s.value),
        event_loop_lag: format!("{lag:.3}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{classify::Prefixes, classify::classify, parser::parse};

    #[test]
    fn headline_numbers() {
        let samples = parse(
            "mw_media_watch_count{tmdb_full_id=\"movie-1\"} 3\n\
             mw_media_watch_count{tmdb_full_id=\"tv-2\"} 4\n\
             mw_media_watch_count_daily{tmdb_full_id=\"tv-2\"} 100\n\
             mw_provider_hostname_count{hostname=\"a\"} 1\n\
             mw_provider_hostname_count{hostname=\"b\"} 1\n\
             mw_provider_hostname_count{hostname=\"a\"} 1\n\
             mw_user_count 17\n\
             nodejs_eventloop_lag_seconds 0.0042\n",
        )
        .expect("not empty");
        let overview = overview(&classify(&samples, &Prefixes::default()));
        assert_eq!(
            overview,
            Overview {
                total_watch_requests: 7.0,
                distinct_hostnames: 2,
                active_users: 17.0,
                event_loop_lag: "0.004".to_string(),
            }
        );
    }

    #[test]
    fn defaults_when_absent() {
        let samples = parse("process_cpu_seconds_total 1\n").expect("not empty");
        let overview = overview(&classify(&samples, &Prefixes::default()));
        assert_eq!(overview.total_watch_requests, 0.0);
        assert_eq!(overview.distinct_hostnames, 0);
        assert_eq!(overview.active_users, 0.0);
        assert_eq!(overview.event_loop_lag, "0.000");
    }
}
