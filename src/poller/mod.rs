//! The welcome run: load watermark, fetch, filter, notify, persist.
//!
//! Accounts are welcomed oldest first and the watermark is advanced after
//! every successful send, so an aborted run leaves the watermark at the last
//! account that was actually welcomed.

mod filter;
mod runner;

pub use filter::{filter_eligible, render_welcome, EligibleAccount, DEFAULT_WELCOME_TEMPLATE};
pub use runner::{PollerOptions, RunSummary, WatermarkPoller, DEFAULT_SEND_INTERVAL};

use thiserror::Error;

use crate::config::ConfigError;
use crate::connectors::ApiError;
use crate::watermark::WatermarkError;

/// Fatal errors. Any of these ends the run.
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to fetch accounts: {0}")]
    Fetch(#[source] ApiError),

    #[error("Failed to welcome @{username} (id {id}): {source}")]
    Send {
        id: String,
        username: String,
        #[source]
        source: ApiError,
    },

    #[error("Failed to persist watermark: {0}")]
    Persist(#[source] WatermarkError),
}
