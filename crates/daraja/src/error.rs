//! Error type for Daraja operations.

use std::path::PathBuf;

/// Everything that can go wrong between building a request and reading
/// the provider's reply.
///
/// A 2xx reply is never an error, even when its body reports a business
/// failure (`ResponseCode != "0"`). Use [`crate::response_code`] to inspect it.
#[derive(Debug, thiserror::Error)]
pub enum DarajaError {
    /// Token endpoint answered non-2xx, or 2xx without an `access_token`.
    #[error("failed to authenticate with the M-Pesa API")]
    Authentication,

    /// Certificate file missing, unreadable, or not an RSA public key.
    #[error("certificate error ({}): {reason}", .path.display())]
    Certificate { path: PathBuf, reason: String },

    /// RSA encryption failed (e.g. plaintext too long for the key).
    #[error("encryption failed: {0}")]
    Crypto(String),

    /// Could not reach the provider, or the HTTP client could not be built.
    #[error("network error: {0}")]
    Transport(String),

    /// Operation endpoint answered non-2xx. `body` is the provider's JSON
    /// error, or the raw text as a JSON string when it was not JSON.
    #[error("M-Pesa API returned HTTP {status}: {body}")]
    Provider { status: u16, body: serde_json::Value },

    /// 2xx response whose body is not JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// Configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DarajaError {
    pub(crate) fn certificate(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        DarajaError::Certificate {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status for provider errors, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            DarajaError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}
