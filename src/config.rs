//! Run configuration.
//!
//! Settings are resolved once at startup and handed to the poller by value.
//! Values come from the process environment first, then from an optional
//! local key=value file (see [`EnvFileOverlay`]). Nothing outside this module
//! reads the environment.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::connectors::{ApiCredentials, DEFAULT_REQUEST_TIMEOUT};
use crate::poller::{DEFAULT_SEND_INTERVAL, DEFAULT_WELCOME_TEMPLATE};

pub const BASE_URL_KEY: &str = "MASTODON_BASE_URL";
pub const ACCESS_TOKEN_KEY: &str = "MASTODON_ACCESS_TOKEN";
pub const WATERMARK_FILE_KEY: &str = "WATERMARK_FILE";
pub const WELCOME_MESSAGE_KEY: &str = "WELCOME_MESSAGE";
pub const SEND_INTERVAL_KEY: &str = "SEND_INTERVAL_MS";
pub const REQUEST_TIMEOUT_KEY: &str = "REQUEST_TIMEOUT_SECS";
pub const LOG_FORMAT_KEY: &str = "LOG_FORMAT";
pub const ENV_FILE_KEY: &str = "WELCOME_BOT_ENV_FILE";
pub const DISABLE_ENV_FILE_KEY: &str = "WELCOME_BOT_DISABLE_ENV_FILE";

const DEFAULT_WATERMARK_FILE: &str = "last_check.txt";
const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("Stored watermark in {path} is not a valid timestamp: {value:?}")]
    CorruptWatermark { path: PathBuf, value: String },
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    /// Reads `LOG_FORMAT`. Unknown values fall back to pretty output, since
    /// this is resolved before logging exists to report it.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(LOG_FORMAT_KEY).as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Immutable configuration for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: ApiCredentials,
    pub watermark_path: PathBuf,
    pub welcome_template: String,
    pub send_interval: Duration,
    pub request_timeout: Duration,
}

impl Settings {
    /// Resolves settings through `lookup`, which maps a key to its value.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials = ApiCredentials::from_lookup(&lookup)?;

        let watermark_path = lookup(WATERMARK_FILE_KEY)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WATERMARK_FILE));

        let welcome_template =
            lookup(WELCOME_MESSAGE_KEY).unwrap_or_else(|| DEFAULT_WELCOME_TEMPLATE.to_string());

        let send_interval = match lookup(SEND_INTERVAL_KEY) {
            Some(raw) => Duration::from_millis(parse_u64(SEND_INTERVAL_KEY, &raw)?),
            None => DEFAULT_SEND_INTERVAL,
        };

        let request_timeout = match lookup(REQUEST_TIMEOUT_KEY) {
            Some(raw) => {
                let secs = parse_u64(REQUEST_TIMEOUT_KEY, &raw)?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        key: REQUEST_TIMEOUT_KEY,
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        info!(
            "Configuration loaded: instance={}, watermark={}, send_interval={}ms",
            credentials.base_url,
            watermark_path.display(),
            send_interval.as_millis()
        );

        Ok(Self {
            credentials,
            watermark_path,
            welcome_template,
            send_interval,
            request_timeout,
        })
    }
}

fn parse_u64(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("{:?} is not a non-negative integer ({})", raw, e),
    })
}

/// Optional local key=value file layered under the process environment.
///
/// Comment lines, blank lines and malformed lines are skipped. The process
/// environment is never modified; callers resolve keys through [`lookup`].
///
/// [`lookup`]: EnvFileOverlay::lookup
#[derive(Debug, Clone, Default)]
pub struct EnvFileOverlay {
    values: HashMap<String, String>,
    source: Option<PathBuf>,
    skipped_lines: usize,
}

impl EnvFileOverlay {
    /// An overlay that contributes nothing.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Builds the overlay the way a normal run does: disabled when
    /// `WELCOME_BOT_DISABLE_ENV_FILE` is set, otherwise read from
    /// `WELCOME_BOT_ENV_FILE` (default `.env`).
    pub fn from_env() -> Self {
        let disabled = std::env::var(DISABLE_ENV_FILE_KEY)
            .map(|v| !v.trim().is_empty())
            .unwrap_or(false);
        if disabled {
            return Self::disabled();
        }

        let path = std::env::var(ENV_FILE_KEY)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_ENV_FILE));
        Self::load(&path)
    }

    /// Reads `path`. A missing or unreadable file yields an empty overlay.
    ///
    /// Each line is parsed on its own, so an unterminated quote costs only
    /// that line instead of swallowing the rest of the file.
    pub fn load(path: &Path) -> Self {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(_) => return Self::disabled(),
        };

        let mut values = HashMap::new();
        let mut skipped_lines = 0;
        for line in contents.lines() {
            for item in dotenvy::from_read_iter(line.as_bytes()) {
                match item {
                    Ok((key, value)) => {
                        values.entry(key).or_insert(value);
                    }
                    Err(_) => {
                        skipped_lines += 1;
                        break;
                    }
                }
            }
        }

        Self {
            values,
            source: Some(path.to_path_buf()),
            skipped_lines,
        }
    }

    /// Value of `key` from the process environment, else from the file.
    /// An empty environment value does not hide the file's value.
    pub fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.get(key).map(str::to_string))
    }

    /// Value of `key` from the file only.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    /// Reports what was loaded. Called once logging is up.
    pub fn log_summary(&self) {
        match &self.source {
            Some(path) => {
                info!(
                    "Loaded {} setting(s) from {}",
                    self.values.len(),
                    path.display()
                );
                if self.skipped_lines > 0 {
                    debug!(
                        "Skipped {} malformed line(s) in {}",
                        self.skipped_lines,
                        path.display()
                    );
                }
            }
            None => debug!("No local env file in use"),
        }
    }
}
