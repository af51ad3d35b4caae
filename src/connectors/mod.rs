//! Connectors for the instance REST API.
//!
//! Wire types live here and are consumed as-is by the poller; the only
//! normalization is timestamp parsing, done in the watermark module.

mod auth;
mod mastodon;

pub use auth::ApiCredentials;
pub use mastodon::{
    AdminAccount, ApiError, MastodonClient, StatusRequest, Visibility, DEFAULT_REQUEST_TIMEOUT,
};
