//! Plain text and JSON renderings of a [`Dashboard`].

use std::fmt::{self, Write};

use tallyboard_engine::{Dashboard, aggregate::MediaType, format::format_count};

/// Output format of the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Human readable tables
    #[default]
    Text,
    /// The whole dashboard as pretty printed JSON
    Json,
}

/// Render `dashboard` in `format`.
///
/// # Errors
///
/// Only JSON serialization can fail.
pub fn render(dashboard: &Dashboard, format: Format) -> Result<String, serde_json::Error> {
    match format {
        Format::Json => serde_json::to_string_pretty(dashboard),
        Format::Text => Ok(text(dashboard)),
    }
}

/// Render `dashboard` as text tables.
#[must_use]
pub fn text(dashboard: &Dashboard) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = write_text(&mut out, dashboard);
    out
}

fn write_text(out: &mut String, d: &Dashboard) -> fmt::Result {
    let o = &d.overview;
    writeln!(out, "Overview")?;
    writeln!(
        out,
        "  watch requests {}  hosts {}  active users {}  event loop lag {}s",
        format_count(o.total_watch_requests),
        o.distinct_hostnames,
        format_count(o.active_users),
        o.event_loop_lag
    )?;
    writeln!(
        out,
        "  samples {} ({} classified)",
        d.samples,
        d.classified.len()
    )?;

    let t = &d.status_totals;
    writeln!(out, "\nProvider status")?;
    writeln!(
        out,
        "  success {}  failed {}  not found {}",
        format_count(t.success),
        format_count(t.failed),
        format_count(t.notfound)
    )?;
    for p in &d.provider_status {
        writeln!(
            out,
            "  {:<24} {:>8} {:>8} {:>8} {:>8} {:>6.1}%",
            p.provider,
            format_count(p.success),
            format_count(p.failed),
            format_count(p.notfound),
            format_count(p.total),
            p.success_rate
        )?;
    }

    writeln!(out, "\nHighest failure rates")?;
    for f in &d.provider_failures {
        writeln!(out, "  {:<24} {:>6.1}%", f.provider, f.failure_rate)?;
    }

    writeln!(out, "\nTool usage")?;
    for t in &d.tool_usage {
        writeln!(out, "  {:<24} {:>8}", t.tool, format_count(t.count))?;
    }

    writeln!(out, "\nHostnames")?;
    for h in &d.hostnames {
        writeln!(
            out,
            "  {:<32} {:>8} {:>6.1}%",
            h.hostname,
            format_count(h.count),
            h.percentage
        )?;
    }

    writeln!(out, "\nMost watched")?;
    for m in &d.media {
        let kind = match m.media_type {
            MediaType::Movie => "movie",
            MediaType::Show => "show",
        };
        writeln!(
            out,
            "  {:<32} {:<6} {:>8} {:>6.1}%",
            m.title,
            kind,
            format_count(m.total_count),
            m.success_rate
        )?;
        for a in &m.attempts {
            writeln!(
                out,
                "      {:<24} ok {:>6}  failed {:>6}",
                a.provider_id,
                format_count(a.success_count),
                format_count(a.failure_count)
            )?;
        }
    }

    writeln!(out, "\nSlowest routes")?;
    for r in &d.route_latency {
        writeln!(
            out,
            "  {:<8} {:<32} {:>10.1}ms",
            r.method, r.route, r.average_ms
        )?;
    }

    writeln!(out, "\nRequests per route")?;
    for r in &d.route_requests {
        writeln!(out, "  {:<40} {:>8}", r.route, format_count(r.count))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallyboard_engine::ViewOptions;

    const PAYLOAD: &str = r#"
mw_provider_status_count{provider_id="alpha",status="success"} 80
mw_provider_status_count{provider_id="alpha",status="failed"} 20
mw_media_watch_count{tmdb_full_id="movie-1",title="Heat",provider_id="alpha",success="true"} 1500
http_request_duration_seconds_sum{method="GET",route="/x"} 4.5
http_request_duration_seconds_count{method="GET",route="/x"} 3
"#;

    fn dashboard() -> Dashboard {
        Dashboard::build(PAYLOAD, &ViewOptions::default()).expect("valid payload")
    }

    #[test]
    fn text_contains_every_section() {
        let out = text(&dashboard());
        for heading in [
            "Overview",
            "Provider status",
            "Highest failure rates",
            "Tool usage",
            "Hostnames",
            "Most watched",
            "Slowest routes",
            "Requests per route",
        ] {
            assert!(out.contains(heading), "missing {heading}");
        }
        assert!(out.contains("watch requests 1.5K"));
        assert!(out.contains("80.0%"));
        assert!(out.contains("1500.0ms"));
        assert!(out.contains("GET /x"));
    }

    #[test]
    fn json_round_trips_through_serde_json() {
        let out = render(&dashboard(), Format::Json).expect("serializable");
        let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(value["media"][0]["media_type"], "movie");
        assert_eq!(value["route_latency"][0]["average_ms"], 1500.0);
    }
}
