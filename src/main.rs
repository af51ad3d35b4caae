//! Welcome bot - batch entry point.
//!
//! Meant to be triggered periodically by an external scheduler. Takes no
//! arguments; exits 0 when every eligible account was welcomed and non-zero
//! on the first fatal error.

use anyhow::Context;
use tracing::{error, info};

use welcome_bot::config::{EnvFileOverlay, LogFormat, Settings};
use welcome_bot::poller::WatermarkPoller;
use welcome_bot::utils::init_with_format;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Local key=value overlay; WELCOME_BOT_DISABLE_ENV_FILE turns it off
    let overlay = EnvFileOverlay::from_env();
    let lookup = |key: &str| overlay.lookup(key);

    init_with_format(LogFormat::from_lookup(lookup));
    overlay.log_summary();

    let settings = Settings::from_lookup(lookup)
        .inspect_err(|e| error!("Invalid configuration: {}", e))
        .context("invalid configuration")?;

    let poller = WatermarkPoller::from_settings(&settings)
        .inspect_err(|e| error!("Failed to build HTTP client: {}", e))
        .context("failed to build HTTP client")?;

    let summary = poller
        .run()
        .await
        .inspect_err(|e| error!("Run aborted: {}", e))
        .context("welcome run aborted")?;

    info!(
        "Done: {} of {} eligible account(s) welcomed, watermark {}",
        summary.notified, summary.eligible, summary.watermark
    );
    Ok(())
}
