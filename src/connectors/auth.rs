//! Bearer-token credentials for the instance API.

use crate::config::{ConfigError, ACCESS_TOKEN_KEY, BASE_URL_KEY};

/// Instance location and access token.
#[derive(Clone)]
pub struct ApiCredentials {
    pub base_url: String,
    pub access_token: String,
}

impl ApiCredentials {
    /// Creates credentials from explicit values. Trailing slashes are
    /// stripped from the base URL so endpoint paths can be appended.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self {
            base_url,
            access_token: access_token.into().trim().to_string(),
        }
    }

    /// Reads both required values through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(BASE_URL_KEY).ok_or(ConfigError::Missing(BASE_URL_KEY))?;
        let access_token = lookup(ACCESS_TOKEN_KEY).ok_or(ConfigError::Missing(ACCESS_TOKEN_KEY))?;

        let scheme_ok = ["http://", "https://"]
            .iter()
            .any(|scheme| base_url.trim().starts_with(scheme));
        if !scheme_ok {
            return Err(ConfigError::Invalid {
                key: BASE_URL_KEY,
                reason: format!("{:?} is not an http(s) URL", base_url),
            });
        }

        Ok(Self::new(base_url, access_token))
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Absolute URL for an API path such as `/api/v1/statuses`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("base_url", &self.base_url)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}
