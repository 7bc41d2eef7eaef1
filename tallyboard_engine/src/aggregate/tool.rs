//! How often each provider tool was invoked.

use serde::Serialize;

use super::Grouped;
use crate::classify::Classified;

/// Metric name, within the application family
pub const PROVIDER_TOOL: &str = "provider_tool_count";

/// Invocation count of one tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolUsage {
    /// The `tool` label
    pub tool: String,
    /// Sum of every sample carrying this tool
    pub count: f64,
}

/// Tool invocation counts, the first `limit` tools in the order they appear.
///
/// Rows are not ranked by count: a busy tool that first appears late in the
/// payload can fall outside the limit.
#[must_use]
pub fn provider_tool_usage(classified: &Classified, limit: usize) -> Vec<ToolUsage> {
    let mut tools = Grouped::new();
    for sample in classified.application(PROVIDER_TOOL) {
        let tool = sample.label("tool");
        tools
            .entry(tool, || ToolUsage {
                tool: tool.to_string(),
                count: 0.0,
            })
            .count += sample.value;
    }
    let mut rows = tools.into_rows();
    rows.truncate(limit);
    rows
}
