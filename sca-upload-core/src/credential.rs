//! API key format and expiry check, run before any network call.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate};
use regex::Regex;
use tracing::{error, info, warn};

use crate::error::{Result, RunError};

/// `sca<YYYY-MM-DD>tool<token>`
static API_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sca(\d{4}-\d{2}-\d{2})tool([a-zA-Z0-9_-]+)$").unwrap());

/// Keys expiring within this many days (inclusive) trigger a warning.
pub const EXPIRY_WARNING_DAYS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStatus {
    pub expires_on: NaiveDate,
    pub expires_soon: bool,
}

/// Validate `key` against `today`. Time of day plays no part.
pub fn validate_key(key: &str, today: NaiveDate) -> Result<KeyStatus> {
    if key.is_empty() {
        error!("[KEY] No API key provided");
        return Err(RunError::MissingApiKey);
    }

    let expires_on = API_KEY_PATTERN
        .captures(key)
        .and_then(|caps| caps.get(1))
        .and_then(|date| NaiveDate::parse_from_str(date.as_str(), "%Y-%m-%d").ok())
        .ok_or_else(|| {
            error!("[KEY] API key does not match the expected format");
            RunError::MalformedApiKey
        })?;

    if expires_on < today {
        error!(%expires_on, "[KEY] API key has expired");
        return Err(RunError::ExpiredApiKey {
            expired_on: expires_on,
        });
    }

    let warn_until = today
        .checked_add_days(Days::new(EXPIRY_WARNING_DAYS))
        .unwrap_or(NaiveDate::MAX);
    let expires_soon = expires_on <= warn_until;
    if expires_soon {
        warn!(
            %expires_on,
            "Warning: API key will expire soon on {expires_on}. Consider renewing it to make sure your integration keeps running."
        );
    }

    info!("API key is still valid.");
    Ok(KeyStatus {
        expires_on,
        expires_soon,
    })
}

/// Local calendar date.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// [`validate_key`] against [`today`].
pub fn validate_key_now(key: &str) -> Result<KeyStatus> {
    validate_key(key, today())
}
