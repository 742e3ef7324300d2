//! # Taxi Dashboard
//!
//! Command line front end for the taxi trip pipeline: store setup and
//! ingestion, exploratory queries against the store, and filtered
//! dashboard reports with CSV and chart exports.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod cli;
pub mod commands;
pub mod config;

pub use cli::Cli;
pub use config::{Config, LogFormat};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
