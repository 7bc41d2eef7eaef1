//! The tallyboard metrics engine.
//!
//! This library turns one Prometheus text exposition payload into the derived
//! views of the tallyboard dashboard: raw text is parsed into samples, samples
//! are classified by name prefix, and a set of pure reducers builds each view
//! from the classified samples. Nothing here performs I/O; fetching payloads is
//! the business of the `tallyboard` crate.

#![deny(clippy::all)]
#![deny(clippy::cargo)]
#![deny(clippy::pedantic)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
#![deny(clippy::dbg_macro)]
#![deny(unused_extern_crates)]
#![deny(unused_allocation)]
#![deny(unused_assignments)]
#![deny(unused_comparisons)]
#![deny(unreachable_pub)]
#![deny(missing_docs)]
#![deny(missing_copy_implementations)]
#![deny(missing_debug_implementations)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::multiple_crate_versions)]

pub mod aggregate;
pub mod classify;
pub mod dashboard;
pub mod format;
pub mod labels;
pub mod parser;

pub use classify::{Classified, Prefixes, classify};
pub use dashboard::{Dashboard, Layout, Limits, ViewOptions};
pub use labels::Labels;
pub use parser::{MetricKind, MetricSample, parse};

/// Errors produced by the engine
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The payload was empty or only whitespace
    #[error("No metrics data provided")]
    EmptyInput,
}
