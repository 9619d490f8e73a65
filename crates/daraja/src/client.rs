//! Daraja HTTP client.
//!
//! Blocking reqwest client (no Tokio runtime required). Every operation is
//! the same round trip: fetch a token, build the body, POST it, hand back
//! the parsed JSON.

use std::time::Duration;

use serde_json::Value;

use crate::auth::{self, AccessToken, TokenCache};
use crate::config::{ClientConfig, Environment};
use crate::credential::{self, KeyCache};
use crate::error::DarajaError;
use crate::ids;
use crate::payload::{self, B2bCommand, Endpoint};
use crate::request::{
    B2bExpress, B2cPayment, BusinessPayment, C2bSimulate, DynamicQr, Reversal, ResponseType,
    StandingOrder, StkPush, TaxRemittance, TransactionStatus,
};

const USER_AGENT: &str = concat!("daraja/", env!("CARGO_PKG_VERSION"));

/// M-Pesa API client (blocking).
///
/// The configuration is fixed at construction. Safe to share across
/// threads; the token and key caches are the only mutable state.
pub struct DarajaClient {
    http: reqwest::blocking::Client,
    config: ClientConfig,
    base_url: String,
    tokens: TokenCache,
    keys: KeyCache,
}

impl DarajaClient {
    /// Create a client for the configured environment.
    ///
    /// `environment = "production"` selects the production host. Any other
    /// value selects sandbox, with a warning if it was not `sandbox`.
    pub fn new(config: ClientConfig) -> Result<Self, DarajaError> {
        let environment = config.environment();
        if environment == Environment::Sandbox && config.environment != "sandbox" {
            log::warn!(
                "unrecognised M-Pesa environment {:?}, falling back to sandbox",
                config.environment,
            );
        }
        Self::with_base_url(config, environment.base_url())
    }

    /// Create a client against an explicit host (proxies, tests).
    pub fn with_base_url(
        config: ClientConfig,
        base_url: impl Into<String>,
    ) -> Result<Self, DarajaError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DarajaError::Transport(format!("failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        log::debug!("M-Pesa client using {}", base_url);

        Ok(Self {
            http,
            config,
            base_url,
            tokens: TokenCache::default(),
            keys: KeyCache::default(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ── Building blocks ─────────────────────────────────────────────

    /// Fetch an access token with the consumer key and secret.
    pub fn authorize(&self) -> Result<String, DarajaError> {
        self.access_token().map(AccessToken::into_string)
    }

    /// Like [`Self::authorize`], keeping the expiry alongside the token.
    pub fn access_token(&self) -> Result<AccessToken, DarajaError> {
        let fetch = || {
            auth::fetch_token(
                &self.http,
                &self.base_url,
                &self.config.consumer_key,
                &self.config.consumer_secret,
            )
        };
        if self.config.cache_tokens {
            self.tokens.get_or_fetch(fetch)
        } else {
            fetch()
        }
    }

    /// Drop a cached token, e.g. after the provider rejected it.
    pub fn clear_token_cache(&self) {
        self.tokens.clear();
    }

    /// Encrypt `plaintext` with the configured certificate, base64-encoded.
    pub fn generate_security_credential(&self, plaintext: &str) -> Result<String, DarajaError> {
        let key = self.keys.get(&self.config.certificate_path)?;
        credential::encrypt(&key, plaintext)
    }

    pub fn generate_originator_conversation_id(&self) -> String {
        ids::originator_conversation_id(&self.config.conversation_prefix)
    }

    fn timestamp(&self) -> String {
        ids::timestamp(self.config.utc_offset_minutes)
    }

    // ── Customer-facing collections ─────────────────────────────────

    /// Prompt the customer's phone for their PIN (Lipa Na M-Pesa Online).
    pub fn stk_push(&self, req: &StkPush) -> Result<Value, DarajaError> {
        self.submit(Endpoint::StkPush, || {
            payload::stk_push(&self.config, req, &self.timestamp())
        })
    }

    /// Status of an STK push, by the `CheckoutRequestID` it returned.
    ///
    /// The `Password` is shortcode + passkey + timestamp encrypted with the
    /// certificate, unless `stk_query_base64_password` is set.
    pub fn stk_query(&self, checkout_request_id: &str) -> Result<Value, DarajaError> {
        let timestamp = self.timestamp();
        let config = &self.config;
        let build = |password: &str| {
            payload::stk_query(config, checkout_request_id, password, &timestamp)
        };

        if config.stk_query_base64_password {
            self.submit(Endpoint::StkQuery, || {
                build(&ids::stk_password(&config.shortcode, &config.passkey, &timestamp))
            })
        } else {
            let input = ids::stk_password_input(&config.shortcode, &config.passkey, &timestamp);
            self.submit_with_credential(Endpoint::StkQuery, &input, build)
        }
    }

    /// Generate a dynamic M-Pesa QR code.
    pub fn dynamic_qr(&self, req: &DynamicQr) -> Result<Value, DarajaError> {
        self.submit(Endpoint::DynamicQr, || payload::dynamic_qr(&self.config, req))
    }

    /// Register the configured C2B confirmation and validation URLs.
    pub fn c2b_register_url(&self, response_type: ResponseType) -> Result<Value, DarajaError> {
        self.submit(Endpoint::C2bRegisterUrl, || {
            payload::c2b_register_url(&self.config, response_type)
        })
    }

    /// Simulate a customer payment (sandbox only on the provider side).
    pub fn c2b_simulate(&self, req: &C2bSimulate) -> Result<Value, DarajaError> {
        self.submit(Endpoint::C2bSimulate, || payload::c2b_simulate(&self.config, req))
    }

    pub fn b2b_express(&self, req: &B2bExpress) -> Result<Value, DarajaError> {
        self.submit(Endpoint::B2bExpress, || payload::b2b_express(&self.config, req))
    }

    pub fn create_standing_order(&self, req: &StandingOrder) -> Result<Value, DarajaError> {
        self.submit(Endpoint::StandingOrder, || {
            payload::standing_order(&self.config, req)
        })
    }

    // ── Initiator operations (encrypted credential) ─────────────────

    /// Pay out from the shortcode to a phone number.
    pub fn b2c_payment(&self, req: &B2cPayment) -> Result<Value, DarajaError> {
        let password = &self.config.security_credential;
        self.submit_with_credential(Endpoint::B2cPayment, password, |cred| {
            let conversation_id = self.generate_originator_conversation_id();
            payload::b2c_payment(&self.config, req, cred, &conversation_id)
        })
    }

    pub fn transaction_status(&self, req: &TransactionStatus) -> Result<Value, DarajaError> {
        let password = &req.initiator_password;
        self.submit_with_credential(Endpoint::TransactionStatus, password, |cred| {
            payload::transaction_status(&self.config, req, cred)
        })
    }

    pub fn account_balance(&self) -> Result<Value, DarajaError> {
        let password = &self.config.security_credential;
        self.submit_with_credential(Endpoint::AccountBalance, password, |cred| {
            payload::account_balance(&self.config, cred)
        })
    }

    pub fn reversal(&self, req: &Reversal) -> Result<Value, DarajaError> {
        let password = &self.config.security_credential;
        self.submit_with_credential(Endpoint::Reversal, password, |cred| {
            payload::reversal(&self.config, req, cred)
        })
    }

    pub fn tax_remittance(&self, req: &TaxRemittance) -> Result<Value, DarajaError> {
        let password = &self.config.security_credential;
        self.submit_with_credential(Endpoint::TaxRemittance, password, |cred| {
            payload::tax_remittance(&self.config, req, cred)
        })
    }

    /// Pay a paybill number from the business account.
    pub fn business_paybill(&self, req: &BusinessPayment) -> Result<Value, DarajaError> {
        self.b2b(req, B2bCommand::BusinessPayBill)
    }

    /// Pay a till, store, or merchant HO from the business account.
    pub fn business_buy_goods(&self, req: &BusinessPayment) -> Result<Value, DarajaError> {
        self.b2b(req, B2bCommand::BusinessBuyGoods)
    }

    /// Load funds into a B2C shortcode for disbursement.
    pub fn b2c_topup(&self, req: &BusinessPayment) -> Result<Value, DarajaError> {
        self.b2b(req, B2bCommand::BusinessPayToBulk)
    }

    fn b2b(&self, req: &BusinessPayment, command: B2bCommand) -> Result<Value, DarajaError> {
        let callbacks = &self.config.callbacks;
        let urls = match command {
            B2bCommand::BusinessPayToBulk => &callbacks.b2c_topup,
            B2bCommand::BusinessPayBill | B2bCommand::BusinessBuyGoods => &callbacks.b2b,
        };
        let password = &self.config.security_credential;
        self.submit_with_credential(Endpoint::B2bPayment, password, |cred| {
            payload::business_payment(&self.config, req, cred, command, urls)
        })
    }

    // ── Internal helpers ────────────────────────────────────────────

    /// Authorize, then build and POST. The body is only built once a
    /// token is in hand.
    fn submit(
        &self,
        endpoint: Endpoint,
        build: impl FnOnce() -> Value,
    ) -> Result<Value, DarajaError> {
        let token = self.access_token()?;
        let body = build();
        self.post(endpoint, token.as_str(), &body)
    }

    /// Like [`Self::submit`], with `password` encrypted into a security
    /// credential before the body is built.
    fn submit_with_credential(
        &self,
        endpoint: Endpoint,
        password: &str,
        build: impl FnOnce(&str) -> Value,
    ) -> Result<Value, DarajaError> {
        let token = self.access_token()?;
        let credential = self.generate_security_credential(password)?;
        let body = build(&credential);
        self.post(endpoint, token.as_str(), &body)
    }

    fn post(&self, endpoint: Endpoint, token: &str, body: &Value) -> Result<Value, DarajaError> {
        let url = format!("{}{}", self.base_url, endpoint.path());
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(body)
            .send()
            .map_err(|e| DarajaError::Transport(e.to_string()))?;

        let status = response.status();
        log::debug!("POST {} -> {}", endpoint.path(), status.as_u16());

        let text = response
            .text()
            .map_err(|e| DarajaError::Transport(e.to_string()))?;

        if !status.is_success() {
            let body = match serde_json::from_str(&text) {
                Ok(json) => json,
                Err(_) => Value::String(text),
            };
            return Err(DarajaError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&text).map_err(|e| DarajaError::Decode(e.to_string()))
    }
}

// ── Free functions ──────────────────────────────────────────────────

/// Business result code from a response body: `ResponseCode` on accepted
/// requests, `errorCode` on rejected ones.
pub fn response_code(body: &Value) -> Option<&str> {
    body["ResponseCode"]
        .as_str()
        .or_else(|| body["errorCode"].as_str())
}

/// True when the provider accepted the request (`ResponseCode == "0"`).
/// Acceptance only means queued; the outcome arrives on the callback URL.
pub fn is_accepted(body: &Value) -> bool {
    body["ResponseCode"].as_str() == Some("0")
}
