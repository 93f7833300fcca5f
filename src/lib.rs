pub mod api;
pub mod cache;
pub mod config;
pub mod input;
pub mod logger;
pub mod orchestrator;
pub mod output;
pub mod prompt;

// Re-export tests for integration testing
#[cfg(test)]
pub mod tests;

// Re-export key types and functions for easier access
pub use crate::api::{
    Account, LobstrClient, Record, RunStats, RunStatus, Squid, SquidApi,
    LINKEDIN_PROFILE_CRAWLER_ID,
};
pub use crate::cache::SquidCache;
pub use crate::config::Config;
pub use crate::input::{load_urls, InputSource};
pub use crate::orchestrator::{run, RunOptions, RunOutcome};
pub use crate::output::{OutputPaths, RunLog};
