//! OAuth client-credentials exchange.
//!
//! Tokens normally live 3600 seconds. By default every operation fetches a
//! fresh one; `ClientConfig::cache_tokens` turns on reuse until shortly
//! before expiry.

use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::error::DarajaError;

pub(crate) const TOKEN_PATH: &str = "/oauth/v1/generate";
const DEFAULT_EXPIRY_SECS: u64 = 3600;
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Bearer token with the instant it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    expires_at: Instant,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            token: token.into(),
            expires_at: Instant::now() + expires_in,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn into_string(self) -> String {
        self.token
    }

    /// True while more than a minute of validity remains.
    pub fn is_fresh(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// GET `{base_url}/oauth/v1/generate` with HTTP Basic auth.
///
/// Any non-2xx answer is `Authentication`; the body is discarded.
pub(crate) fn fetch_token(
    http: &reqwest::blocking::Client,
    base_url: &str,
    consumer_key: &str,
    consumer_secret: &str,
) -> Result<AccessToken, DarajaError> {
    let url = format!("{}{}", base_url, TOKEN_PATH);
    let response = http
        .get(&url)
        .query(&[("grant_type", "client_credentials")])
        .basic_auth(consumer_key, Some(consumer_secret))
        .send()
        .map_err(|e| DarajaError::Transport(e.to_string()))?;

    let status = response.status();
    log::debug!("GET {} -> {}", TOKEN_PATH, status.as_u16());
    if !status.is_success() {
        return Err(DarajaError::Authentication);
    }

    let body: serde_json::Value = response.json().map_err(|_| DarajaError::Authentication)?;
    let token = body["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or(DarajaError::Authentication)?;

    // Daraja sends expires_in as a string ("3599"); accept numbers too.
    let expires_in = body["expires_in"]
        .as_u64()
        .or_else(|| body["expires_in"].as_str().and_then(|s| s.parse().ok()))
        .unwrap_or(DEFAULT_EXPIRY_SECS);

    Ok(AccessToken::new(token, Duration::from_secs(expires_in)))
}

/// Single-slot token cache. The lock is held across a refresh so
/// concurrent callers wait for one fetch instead of racing.
#[derive(Default)]
pub(crate) struct TokenCache {
    slot: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub(crate) fn get_or_fetch(
        &self,
        fetch: impl FnOnce() -> Result<AccessToken, DarajaError>,
    ) -> Result<AccessToken, DarajaError> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = slot.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.clone());
        }
        let token = fetch()?;
        *slot = Some(token.clone());
        Ok(token)
    }

    pub(crate) fn clear(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
