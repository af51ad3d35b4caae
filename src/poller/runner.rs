//! Orchestrates a single welcome run.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{ConfigError, Settings};
use crate::connectors::{AdminAccount, ApiError, MastodonClient, StatusRequest};
use crate::watermark::{FileWatermarkStore, Watermark, WatermarkError};

use super::filter::{filter_eligible, render_welcome, DEFAULT_WELCOME_TEMPLATE};
use super::PollerError;

/// Pause between consecutive sends.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(1);

/// Behavioural knobs for the poller.
#[derive(Debug, Clone)]
pub struct PollerOptions {
    pub welcome_template: String,
    pub send_interval: Duration,
    /// Lookback used when no watermark is stored.
    pub initial_lookback: chrono::Duration,
}

impl Default for PollerOptions {
    fn default() -> Self {
        Self {
            welcome_template: DEFAULT_WELCOME_TEMPLATE.to_string(),
            send_interval: DEFAULT_SEND_INTERVAL,
            initial_lookback: Watermark::default_lookback(),
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub fetched: usize,
    pub eligible: usize,
    pub notified: usize,
    pub watermark: Watermark,
}

/// Polls for newly approved accounts and welcomes each one exactly once.
pub struct WatermarkPoller {
    client: MastodonClient,
    store: FileWatermarkStore,
    options: PollerOptions,
}

impl WatermarkPoller {
    pub fn new(client: MastodonClient, store: FileWatermarkStore, options: PollerOptions) -> Self {
        Self {
            client,
            store,
            options,
        }
    }

    /// Builds the client, store and options described by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ApiError> {
        let client =
            MastodonClient::with_timeout(settings.credentials.clone(), settings.request_timeout)?;
        let store = FileWatermarkStore::new(settings.watermark_path.clone());
        let options = PollerOptions {
            welcome_template: settings.welcome_template.clone(),
            send_interval: settings.send_interval,
            ..PollerOptions::default()
        };
        Ok(Self::new(client, store, options))
    }

    /// Reads the stored watermark, defaulting to the lookback window.
    ///
    /// A missing, blank or unreadable file falls back to the default. A file
    /// holding something that is not a timestamp is a configuration error:
    /// defaulting there would welcome every account again.
    pub fn load_watermark(&self) -> Result<Watermark, PollerError> {
        self.load_watermark_at(Utc::now())
    }

    pub fn load_watermark_at(&self, now: DateTime<Utc>) -> Result<Watermark, PollerError> {
        match self.store.load() {
            Ok(Some(watermark)) => Ok(watermark),
            Ok(None) => {
                let fallback = Watermark::lookback_from(now, self.options.initial_lookback);
                info!("No stored watermark, starting from {}", fallback);
                Ok(fallback)
            }
            Err(WatermarkError::Corrupt { path, value }) => {
                Err(ConfigError::CorruptWatermark { path, value }.into())
            }
            Err(e) => {
                let fallback = Watermark::lookback_from(now, self.options.initial_lookback);
                warn!("{}; starting from {}", e, fallback);
                Ok(fallback)
            }
        }
    }

    /// Fetches candidate accounts. `since` is informational; the admin API
    /// is read as a single unfiltered page.
    pub async fn fetch_candidates(
        &self,
        since: &Watermark,
    ) -> Result<Vec<AdminAccount>, PollerError> {
        debug!("Fetching accounts (watermark {})", since);
        let accounts = self
            .client
            .get_admin_accounts()
            .await
            .map_err(PollerError::Fetch)?;
        info!(
            "Fetched {} account(s) from {}",
            accounts.len(),
            self.client.base_url()
        );
        Ok(accounts)
    }

    /// Sends the welcome direct message to one account.
    pub async fn notify(&self, account: &AdminAccount) -> Result<(), PollerError> {
        let message = render_welcome(&self.options.welcome_template, &account.username);
        self.client
            .post_status(&StatusRequest::direct(message))
            .await
            .map_err(|source| PollerError::Send {
                id: account.id.clone(),
                username: account.username.clone(),
                source,
            })?;
        info!("Welcomed @{} (id {})", account.username, account.id);
        Ok(())
    }

    /// Persists `to` as the new watermark.
    pub fn advance_watermark(&self, to: &Watermark) -> Result<(), PollerError> {
        self.store.save(to).map_err(PollerError::Persist)
    }

    /// Runs the whole pipeline once. Stops at the first failure.
    pub async fn run(&self) -> Result<RunSummary, PollerError> {
        let mut watermark = self.load_watermark()?;
        info!("Welcome run starting (watermark {})", watermark);

        let accounts = self.fetch_candidates(&watermark).await?;
        let fetched = accounts.len();

        let eligible = filter_eligible(accounts, &watermark);
        info!("{} account(s) to welcome", eligible.len());

        let mut pacer = SendPacer::new(self.options.send_interval);
        let mut notified = 0;
        for entry in &eligible {
            pacer.wait().await;

            self.notify(&entry.account).await?;
            self.advance_watermark(&entry.created)?;
            watermark = entry.created.clone();
            notified += 1;
        }

        info!(
            "Welcome run finished: {} fetched, {} welcomed, watermark {}",
            fetched, notified, watermark
        );

        Ok(RunSummary {
            fetched,
            eligible: eligible.len(),
            notified,
            watermark,
        })
    }
}

/// Spaces consecutive sends by a fixed interval. The first send is not delayed.
struct SendPacer {
    interval: Duration,
    started: bool,
}

impl SendPacer {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            started: false,
        }
    }

    async fn wait(&mut self) {
        if self.started && !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
        self.started = true;
    }
}

impl std::fmt::Debug for WatermarkPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkPoller")
            .field("client", &self.client)
            .field("watermark_path", &self.store.path())
            .field("send_interval", &self.options.send_interval)
            .finish()
    }
}
