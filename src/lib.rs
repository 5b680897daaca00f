//! SoulBrowser adaptive replay
//!
//! Wires the replay engine crates into a runnable session: configuration,
//! concrete executors, the judgment service client, metrics and the
//! `soulreplay` command line.

pub mod cli;
pub mod config;
pub mod errors;
pub mod executors;
pub mod llm;
pub mod metrics;
pub mod session;

pub use config::Config;
pub use errors::ReplayError;
pub use metrics::{MetricsListener, ReplayMetrics};
pub use session::ReplaySession;
