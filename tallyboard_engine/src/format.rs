//! Human readable counts.

/// Abbreviate a count: `1.5M`, `2.3K`, `42`.
///
/// NaN and infinities read `"Invalid number"`.
#[must_use]
pub fn format_count(value: f64) -> String {
    if !value.is_finite() {
        return "Invalid number".to_string();
    }
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}
