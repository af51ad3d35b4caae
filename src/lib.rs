//! Welcome bot for Mastodon-compatible instances.
//!
//! Each invocation polls the admin accounts API, sends a one-time welcome
//! direct message to every newly approved account, and records a watermark
//! so no account is welcomed twice.
//!
//! # Pipeline
//!
//! - **Watermark**: creation time of the newest welcomed account, kept in a
//!   plain-text file and rewritten after every successful send
//! - **Fetch**: a single page from `GET /api/v1/admin/accounts`
//! - **Filter**: approved accounts created strictly after the watermark,
//!   oldest first
//! - **Notify**: `POST /api/v1/statuses` with direct visibility, paced by a
//!   fixed interval
//!
//! The run is sequential and stops at the first failure; the next scheduled
//! run resumes from the persisted watermark.
//!
//! # Usage
//!
//! ```no_run
//! use welcome_bot::config::Settings;
//! use welcome_bot::poller::WatermarkPoller;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_lookup(|key| std::env::var(key).ok())?;
//!     let poller = WatermarkPoller::from_settings(&settings)?;
//!     let summary = poller.run().await?;
//!     println!("welcomed {} account(s)", summary.notified);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connectors;
pub mod poller;
pub mod utils;
pub mod watermark;

// Re-export commonly used types
pub use config::{ConfigError, EnvFileOverlay, Settings};
pub use connectors::{AdminAccount, ApiCredentials, ApiError, MastodonClient};
pub use poller::{PollerError, RunSummary, WatermarkPoller};
pub use watermark::{FileWatermarkStore, Watermark};
