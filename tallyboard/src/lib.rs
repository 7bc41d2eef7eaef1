//! The tallyboard runtime.
//!
//! This library fetches Prometheus text exposition payloads from a live
//! endpoint or a file, runs them through `tallyboard_engine` and keeps the
//! freshest [`tallyboard_engine::Dashboard`] available to consumers. The
//! `tallyboard` binary is a thin command line front end over it.

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

pub mod config;
pub mod export;
pub mod fetch;
pub mod refresh;
pub mod render;
pub mod source;
