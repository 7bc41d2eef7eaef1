//! Prometheus text format parser
//!
//! This module provides a single pass, best-effort parser for the Prometheus
//! text exposition format.
//! <https://github.com/prometheus/docs/blob/main/content/docs/instrumenting/exposition_formats.md>
//!
//! Lines that cannot be understood never abort a parse. They are dropped with a
//! [`Skip`] reason, which is logged at trace level and otherwise discarded.

use std::{fmt, str::FromStr};

use serde::Serialize;
use tracing::{debug, trace};

use crate::{Error, labels::Labels};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Prometheus metric types
pub enum MetricKind {
    /// A cumulative, monotonically increasing value
    Counter,
    /// A single value that can arbitrarily go up and down
    Gauge,
    /// Observations counted in configurable buckets
    Histogram,
    /// Observations summarized as quantiles
    Summary,
    /// No type directive, or one this parser does not know
    #[default]
    Untyped,
}

impl FromStr for MetricKind {
    type Err = Skip;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "counter" => Ok(Self::Counter),
            "gauge" => Ok(Self::Gauge),
            "histogram" => Ok(Self::Histogram),
            "summary" => Ok(Self::Summary),
            "untyped" => Ok(Self::Untyped),
            _ => Err(Skip::UnknownMetricKind(s.to_string())),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
            Self::Untyped => "untyped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
/// Reasons a line contributed no sample
pub enum Skip {
    /// Unknown metric type in a TYPE line
    #[error("unknown metric type: {0}")]
    UnknownMetricKind(String),
    /// Invalid format in the line
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// Value that cannot be parsed as a number
    #[error("invalid value: {0}")]
    InvalidValue(String),
    /// Value parsed but is NaN or infinite
    #[error("non-finite value: {0}")]
    NonFinite(String),
    /// Missing value in metric line
    #[error("missing value")]
    MissingValue,
    /// Missing name in metric line
    #[error("missing name")]
    MissingName,
    /// Invalid label block
    #[error("invalid label: {0}")]
    InvalidLabel(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// One observation from the exposition text
pub struct MetricSample {
    /// The metric name, taken from the data line itself
    pub name: String,
    /// The type declared by the most recent TYPE line of this family
    pub kind: MetricKind,
    /// The text of the most recent HELP line
    pub description: String,
    /// The sample value, always finite
    pub value: f64,
    /// The labels, `None` when the line carried no label block
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    /// Optional timestamp in milliseconds since Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

impl MetricSample {
    /// Read a label of this sample, `"unknown"` when absent.
    #[must_use]
    pub fn label(&self, key: &str) -> &str {
        crate::labels::label_or_unknown(self.labels.as_ref(), key)
    }
}

/// Metadata from HELP and TYPE lines waiting for the data lines they describe.
#[derive(Debug, Default)]
struct Pending {
    name: Option<String>,
    kind: Option<MetricKind>,
    description: Option<String>,
}

impl Pending {
    fn is_for(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    fn help(&mut self, name: &str, description: String) {
        if !self.is_for(name) {
            self.kind = None;
            self.name = Some(name.to_string());
        }
        self.description = Some(description);
    }

    fn kind(&mut self, name: &str, kind: MetricKind) {
        if !self.is_for(name) {
            self.description = None;
            self.name = Some(name.to_string());
        }
        self.kind = Some(kind);
    }
}

#[derive(Debug, Default)]
/// Parser for Prometheus text exposition format
pub struct Parser {
    pending: Pending,
}

/// Parse a complete exposition payload into samples, in line order.
///
/// # Errors
///
/// Returns [`Error::EmptyInput`] if `text` is empty or only whitespace.
/// Malformed lines are dropped and never produce an error.
pub fn parse(text: &str) -> Result<Vec<MetricSample>, Error> {
    if text.trim().is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut parser = Parser::new();
    let mut samples = Vec::new();
    let mut dropped = 0_usize;
    for result in parser.parse_text(text) {
        match result {
            Ok(sample) => samples.push(sample),
            Err(skip) => {
                dropped += 1;
                trace!("dropped exposition line: {skip}");
            }
        }
    }
    debug!(
        samples = samples.len(),
        dropped, "parsed exposition payload"
    );
    Ok(samples)
}

impl Parser {
    /// Create a new parser instance
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every line of `text`, one result per data line.
    pub fn parse_text(&mut self, text: &str) -> Vec<Result<MetricSample, Skip>> {
        text.lines()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    /// Parse a single line of Prometheus text format
    ///
    /// Returns `None` for blank and comment lines, which only ever update the
    /// pending metadata.
    pub fn parse_line(&mut self, line: &str) -> Option<Result<MetricSample, Skip>> {
        let line = line.trim();

        if line.is_empty() {
            return None;
        }

        if let Some(comment) = line.strip_prefix('#') {
            if let Err(skip) = self.parse_comment(comment) {
                trace!("ignored directive: {skip}");
            }
            return None;
        }

        Some(self.parse_metric_line(line))
    }

    fn parse_comment(&mut self, comment: &str) -> Result<(), Skip> {
        let mut parts = comment.split_whitespace();
        match parts.next() {
            Some("HELP") => {
                let name = parts.next().ok_or_else(|| {
                    Skip::InvalidFormat("missing metric name in HELP line".to_string())
                })?;
                let description = parts.collect::<Vec<_>>().join(" ");
                self.pending.help(name, description);
            }
            Some("TYPE") => {
                let name = parts.next().ok_or_else(|| {
                    Skip::InvalidFormat("missing metric name in TYPE line".to_string())
                })?;
                let kind = parts.next().ok_or_else(|| {
                    Skip::InvalidFormat("missing metric type in TYPE line".to_string())
                })?;
                let kind = kind.parse().unwrap_or_else(|skip| {
                    trace!("treating as untyped: {skip}");
                    MetricKind::Untyped
                });
                self.pending.kind(name, kind);
            }
            // Free-form comment.
            _ => {}
        }
        Ok(())
    }

    fn parse_metric_line(&self, line: &str) -> Result<MetricSample, Skip> {
        let split = line
            .find(|c: char| c == '{' || c.is_whitespace())
            .ok_or(Skip::MissingValue)?;
        let (name, rest) = line.split_at(split);
        if name.is_empty() {
            return Err(Skip::MissingName);
        }
        if name.contains('}') {
            return Err(Skip::InvalidFormat(format!(
                "unexpected '}}' in metric name: {name}"
            )));
        }

        let (labels, value_part) = match rest.strip_prefix('{') {
            Some(block) => {
                let (labels, after) = Self::parse_labels(block)?;
                (Some(labels), after)
            }
            None => (None, rest),
        };
        let (value, timestamp) = Self::parse_value_and_timestamp(value_part)?;

        // The line's own name is authoritative; metadata is whatever came last.
        Ok(MetricSample {
            name: name.to_string(),
            kind: self.pending.kind.unwrap_or_default(),
            description: self.pending.description.clone().unwrap_or_default(),
            value,
            labels,
            timestamp,
        })
    }

    /// Scan a label block, `block` starting just past the opening brace.
    ///
    /// Returns the labels and the text following the closing brace. Quoted
    /// values may hold any character; `\"`, `\\` and `\n` are unescaped.
    fn parse_labels(block: &str) -> Result<(Labels, &str), Skip> {
        let mut labels = Labels::new();
        let mut chars = block.char_indices().peekable();

        loop {
            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

            let key_start = match chars.peek() {
                Some(&(idx, '}')) => return Ok((labels, &block[idx + 1..])),
                Some(&(idx, _)) => idx,
                None => return Err(Skip::InvalidLabel("unclosed label block".to_string())),
            };

            let key_end = loop {
                match chars.next() {
                    Some((idx, '=')) => break idx,
                    Some((_, '"' | ',' | '}')) => {
                        return Err(Skip::InvalidLabel(format!(
                            "label missing '=': {}",
                            &block[key_start..]
                        )));
                    }
                    Some(_) => {}
                    None => return Err(Skip::InvalidLabel("unclosed label block".to_string())),
                }
            };
            let key = block[key_start..key_end].trim();
            if key.is_empty() {
                return Err(Skip::InvalidLabel("empty label key".to_string()));
            }

            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
            if chars.next().map(|(_, c)| c) != Some('"') {
                return Err(Skip::InvalidLabel(format!(
                    "value of label {key} must be quoted"
                )));
            }

            let mut value = String::new();
            loop {
                match chars.next() {
                    Some((_, '\\')) => match chars.next() {
                        Some((_, '\\')) => value.push('\\'),
                        Some((_, '"')) => value.push('"'),
                        Some((_, 'n')) => value.push('\n'),
                        Some((_, c)) => {
                            return Err(Skip::InvalidLabel(format!(
                                "invalid escape sequence: \\{c}"
                            )));
                        }
                        None => {
                            return Err(Skip::InvalidLabel(
                                "backslash at end of label value".to_string(),
                            ));
                        }
                    },
                    Some((_, '"')) => break,
                    Some((_, c)) => value.push(c),
                    None => {
                        return Err(Skip::InvalidLabel(format!(
                            "unterminated value for label {key}"
                        )));
                    }
                }
            }

            if labels.insert(key, value).is_some() {
                return Err(Skip::InvalidLabel(format!("duplicate label key: {key}")));
            }

            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
            match chars.next() {
                Some((_, ',')) => {}
                Some((idx, '}')) => return Ok((labels, &block[idx + 1..])),
                Some((_, c)) => {
                    return Err(Skip::InvalidLabel(format!(
                        "expected ',' or '}}' after label {key}, found {c:?}"
                    )));
                }
                None => return Err(Skip::InvalidLabel("unclosed label block".to_string())),
            }
        }
    }

    fn parse_value_and_timestamp(value_str: &str) -> Result<(f64, Option<i64>), Skip> {
        let mut parts = value_str.split_whitespace();

        let value_part = parts.next().ok_or(Skip::MissingValue)?;
        let value = value_part
            .parse::<f64>()
            .map_err(|_| Skip::InvalidValue(value_part.to_string()))?;
        if !value.is_finite() {
            return Err(Skip::NonFinite(value_part.to_string()));
        }

        let timestamp = parts
            .next()
            .map(|ts_str| {
                ts_str
                    .parse::<i64>()
                    .map_err(|_| Skip::InvalidFormat(format!("invalid timestamp: {ts_str}")))
            })
            .transpose()?;

        if let Some(extra) = parts.next() {
            return Err(Skip::InvalidFormat(format!(
                "unexpected trailing token: {extra}"
            )));
        }

        Ok((value, timestamp))
    }
}
