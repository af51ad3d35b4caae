//! Eligibility filtering and the welcome message template.

use tracing::{debug, warn};

use crate::connectors::AdminAccount;
use crate::watermark::Watermark;

/// Message sent when `WELCOME_MESSAGE` is not configured.
pub const DEFAULT_WELCOME_TEMPLATE: &str = "@{username} Welcome aboard! We're glad you're here. \
Have a look at the server rules, fill in your profile, and say hello with the #introductions \
hashtag whenever you're ready.";

const USERNAME_PLACEHOLDER: &str = "{username}";

/// An approved account created after the watermark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleAccount {
    pub account: AdminAccount,
    /// Parsed `created_at`; becomes the watermark once this account is welcomed.
    pub created: Watermark,
}

/// Keeps approved accounts whose `created_at` parses and is strictly after
/// `watermark`, ordered oldest first.
///
/// The sort is stable, so accounts with equal creation times keep the order
/// the API returned them in.
pub fn filter_eligible(
    accounts: Vec<AdminAccount>,
    watermark: &Watermark,
) -> Vec<EligibleAccount> {
    let mut eligible: Vec<EligibleAccount> = accounts
        .into_iter()
        .filter_map(|account| {
            let Some(created) = Watermark::parse(&account.created_at) else {
                warn!(
                    "Skipping @{} (id {}): unparseable created_at {:?}",
                    account.username, account.id, account.created_at
                );
                return None;
            };

            if !account.is_approved() {
                debug!("Skipping @{}: not approved", account.username);
                return None;
            }

            if created.at() <= watermark.at() {
                return None;
            }

            Some(EligibleAccount { account, created })
        })
        .collect();

    eligible.sort_by_key(|e| e.created.at());
    eligible
}

/// Fills the `{username}` placeholder.
pub fn render_welcome(template: &str, username: &str) -> String {
    template.replace(USERNAME_PLACEHOLDER, username)
}
