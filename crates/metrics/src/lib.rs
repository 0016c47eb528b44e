//! Metrics collection and export for herald.
//!
//! Every crate records through the `metrics` facade; nothing is collected
//! until a recorder is installed. With the `prometheus` feature the binary
//! installs an exporter serving the scrape endpoint.
//!
//! ```rust,ignore
//! use herald_metrics::{counter, publisher};
//!
//! counter!(publisher::CHUNKS_SENT_TOTAL).increment(1);
//! ```

mod definitions;
mod error;
mod recorder;

pub use {
    definitions::*,
    error::{Error, Result},
    recorder::{MetricsRecorderConfig, init_metrics},
};

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge};
