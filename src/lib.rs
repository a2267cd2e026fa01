//! Shellkeep - offline shell cache for a web calculator
//!
//! Precaches the application shell into a versioned namespace, answers
//! same-origin assets cache-first and API calls network-first, and replaces
//! the previous namespace when a new build activates.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod journal;
pub mod lifecycle;
pub mod router;
pub mod store;
pub mod strategy;
pub mod ui;

pub use error::{ShellkeepError, ShellkeepResult};
