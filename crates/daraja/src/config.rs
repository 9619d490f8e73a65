//! Client configuration.
//!
//! Loaded from a TOML file (`ClientConfig::load`) or from `MPESA_*`
//! environment variables (`ClientConfig::from_env`). Every field has a
//! default so partial files parse.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DarajaError;

pub const PRODUCTION_BASE_URL: &str = "https://api.safaricom.co.ke";
pub const SANDBOX_BASE_URL: &str = "https://sandbox.safaricom.co.ke";

/// Daraja deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Sandbox,
    Production,
}

impl Environment {
    /// Only the exact string `production` selects production. Anything else,
    /// including typos and the empty string, is sandbox.
    pub fn from_setting(value: &str) -> Self {
        if value == "production" {
            Environment::Production
        } else {
            Environment::Sandbox
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Production => PRODUCTION_BASE_URL,
            Environment::Sandbox => SANDBOX_BASE_URL,
        }
    }
}

/// Result/timeout callback pair for asynchronous operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultUrls {
    /// Sent as `ResultURL`
    pub result: String,
    /// Sent as `QueueTimeOutURL`
    pub timeout: String,
}

impl ResultUrls {
    pub fn new(result: impl Into<String>, timeout: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            timeout: timeout.into(),
        }
    }
}

/// Callback URLs passed to the provider, per operation.
///
/// The provider posts asynchronous results to these; serving them is the
/// application's job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackUrls {
    /// STK push `CallBackURL`
    pub stk_push: String,
    pub c2b_confirmation: String,
    pub c2b_validation: String,
    pub b2c: ResultUrls,
    pub b2c_topup: ResultUrls,
    pub transaction_status: ResultUrls,
    pub account_balance: ResultUrls,
    pub reversal: ResultUrls,
    pub tax_remittance: ResultUrls,
    /// Business pay bill and business buy goods
    pub b2b: ResultUrls,
    pub b2b_express: String,
    /// M-Pesa Ratiba (standing order) `CallBackURL`
    pub standing_order: String,
}

/// Everything the client needs. Immutable once handed to the client.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// `production` or `sandbox`. Unknown values fall back to sandbox.
    pub environment: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    /// Paybill or till number
    pub shortcode: String,
    /// Lipa Na M-Pesa Online passkey
    pub passkey: String,
    /// Initiator password. Encrypted with the certificate before sending.
    pub security_credential: String,
    /// Initiator username for B2C/B2B/reversal/balance operations
    pub initiator: String,
    /// Provider public certificate (PEM or DER)
    pub certificate_path: PathBuf,
    /// Leading segment of generated OriginatorConversationIDs
    pub conversation_prefix: String,
    pub callbacks: CallbackUrls,
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
    /// Offset applied to STK timestamps; `None` uses the local time zone.
    /// Daraja expects East Africa Time (180).
    pub utc_offset_minutes: Option<i32>,
    /// Reuse access tokens until shortly before they expire.
    pub cache_tokens: bool,
    /// Send the STK query `Password` as plain base64 (the STK push form)
    /// instead of encrypting it with the certificate.
    pub stk_query_base64_password: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            consumer_key: String::new(),
            consumer_secret: String::new(),
            shortcode: String::new(),
            passkey: String::new(),
            security_credential: String::new(),
            initiator: "testapi".to_string(),
            certificate_path: PathBuf::from("mpesa/cert.cer"),
            conversation_prefix: "VAPOR".to_string(),
            callbacks: CallbackUrls::default(),
            connect_timeout_secs: 10,
            timeout_secs: 30,
            utc_offset_minutes: None,
            cache_tokens: false,
            stk_query_base64_password: false,
        }
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("environment", &self.environment)
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &redact(&self.consumer_secret))
            .field("shortcode", &self.shortcode)
            .field("passkey", &redact(&self.passkey))
            .field("security_credential", &redact(&self.security_credential))
            .field("initiator", &self.initiator)
            .field("certificate_path", &self.certificate_path)
            .field("conversation_prefix", &self.conversation_prefix)
            .field("callbacks", &self.callbacks)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("timeout_secs", &self.timeout_secs)
            .field("utc_offset_minutes", &self.utc_offset_minutes)
            .field("cache_tokens", &self.cache_tokens)
            .field("stk_query_base64_password", &self.stk_query_base64_password)
            .finish()
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}

impl ClientConfig {
    pub fn environment(&self) -> Environment {
        Environment::from_setting(&self.environment)
    }

    pub fn base_url(&self) -> &'static str {
        self.environment().base_url()
    }

    /// Parse a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, DarajaError> {
        toml::from_str(contents).map_err(|e| DarajaError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, DarajaError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DarajaError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            DarajaError::Config(format!("invalid TOML in {}: {}", path.display(), e))
        })
    }

    /// Build from `MPESA_*` environment variables. Unset or empty
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self, DarajaError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DarajaError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        let strings: [(&str, &mut String); 7] = [
            ("MPESA_ENV", &mut config.environment),
            ("MPESA_CONSUMER_KEY", &mut config.consumer_key),
            ("MPESA_CONSUMER_SECRET", &mut config.consumer_secret),
            ("MPESA_SHORTCODE", &mut config.shortcode),
            ("MPESA_PASSKEY", &mut config.passkey),
            ("MPESA_SECURITY_CREDENTIAL", &mut config.security_credential),
            ("MPESA_INITIATOR", &mut config.initiator),
        ];
        for (name, slot) in strings {
            if let Some(v) = get(name) {
                *slot = v;
            }
        }

        if let Some(v) = get("MPESA_CERT_PATH") {
            config.certificate_path = PathBuf::from(v);
        }
        if let Some(v) = get("MPESA_CONVERSATION_PREFIX") {
            config.conversation_prefix = v;
        }

        let cb = &mut config.callbacks;
        let singles: [(&str, &mut String); 5] = [
            ("MPESA_STK_CALLBACK", &mut cb.stk_push),
            ("MPESA_C2B_CONFIRMATION", &mut cb.c2b_confirmation),
            ("MPESA_C2B_VALIDATION", &mut cb.c2b_validation),
            ("MPESA_B2B_EXPRESS_CALLBACK", &mut cb.b2b_express),
            ("MPESA_RATIBA_CALLBACK", &mut cb.standing_order),
        ];
        for (name, slot) in singles {
            if let Some(v) = get(name) {
                *slot = v;
            }
        }

        let pairs: [(&str, &mut ResultUrls); 7] = [
            ("B2C", &mut cb.b2c),
            ("B2C_TOPUP", &mut cb.b2c_topup),
            ("TRANSACTION", &mut cb.transaction_status),
            ("BALANCE", &mut cb.account_balance),
            ("REVERSAL", &mut cb.reversal),
            ("TAX", &mut cb.tax_remittance),
            ("B2B", &mut cb.b2b),
        ];
        for (stem, urls) in pairs {
            if let Some(v) = get(&format!("MPESA_{}_RESULT", stem)) {
                urls.result = v;
            }
            if let Some(v) = get(&format!("MPESA_{}_TIMEOUT", stem)) {
                urls.timeout = v;
            }
        }

        if let Some(v) = get("MPESA_CONNECT_TIMEOUT") {
            config.connect_timeout_secs = parse_env("MPESA_CONNECT_TIMEOUT", &v)?;
        }
        if let Some(v) = get("MPESA_TIMEOUT") {
            config.timeout_secs = parse_env("MPESA_TIMEOUT", &v)?;
        }
        if let Some(v) = get("MPESA_UTC_OFFSET_MINUTES") {
            config.utc_offset_minutes = Some(parse_env("MPESA_UTC_OFFSET_MINUTES", &v)?);
        }
        if let Some(v) = get("MPESA_CACHE_TOKENS") {
            config.cache_tokens = parse_env("MPESA_CACHE_TOKENS", &v)?;
        }
        if let Some(v) = get("MPESA_STK_QUERY_BASE64_PASSWORD") {
            config.stk_query_base64_password = parse_env("MPESA_STK_QUERY_BASE64_PASSWORD", &v)?;
        }

        Ok(config)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, DarajaError>
where
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e| DarajaError::Config(format!("{}={:?}: {}", name, value, e)))
}
