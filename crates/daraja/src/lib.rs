//! Safaricom M-Pesa (Daraja) API client.
//!
//! One method per Daraja operation: STK push and query, dynamic QR, C2B
//! registration and simulation, B2C payments, transaction status, account
//! balance, reversals, KRA tax remittance, B2B pay bill / buy goods /
//! express checkout, B2C top-up, and Ratiba standing orders.
//!
//! Each call fetches a bearer token, encrypts the initiator password where
//! the operation needs one, POSTs a JSON body and returns the provider's
//! JSON reply unmodified. Inbound result callbacks are the application's
//! business.
//!
//! ```no_run
//! use daraja::{ClientConfig, DarajaClient, StkPush};
//!
//! let config = ClientConfig::load(std::path::Path::new("mpesa.toml"))?;
//! let client = DarajaClient::new(config)?;
//! let reply = client.stk_push(&StkPush::new(10, "254708374149", "INV-1", "Order 1"))?;
//! if !daraja::is_accepted(&reply) {
//!     eprintln!("rejected: {}", reply);
//! }
//! # Ok::<(), daraja::DarajaError>(())
//! ```

mod auth;
mod client;
mod config;
mod credential;
mod error;
mod ids;
mod payload;
mod request;

pub use auth::AccessToken;
pub use client::{is_accepted, response_code, DarajaClient};
pub use config::{
    CallbackUrls, ClientConfig, Environment, ResultUrls, PRODUCTION_BASE_URL, SANDBOX_BASE_URL,
};
pub use credential::{encrypt, generate_security_credential, load_public_key};
pub use error::DarajaError;
pub use ids::{
    originator_conversation_id, stk_password, stk_password_input, timestamp, TIMESTAMP_FORMAT,
};
pub use payload::{Endpoint, KRA_SHORTCODE};
pub use request::{
    B2bExpress, B2cCommand, B2cPayment, BusinessPayment, C2bCommand, C2bSimulate, DynamicQr,
    Frequency, QrTransactionCode, ResponseType, Reversal, StandingOrder, StkPush, TaxRemittance,
    TransactionStatus,
};
