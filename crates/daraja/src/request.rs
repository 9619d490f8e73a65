//! Caller-supplied arguments for each operation.
//!
//! Nothing here is validated locally. Bad phone numbers, zero amounts or
//! reversed standing-order dates come back as provider errors.

use chrono::NaiveDate;

// ── Command identifiers ─────────────────────────────────────────────

/// `CommandID` for C2B simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum C2bCommand {
    #[default]
    CustomerPayBillOnline,
    CustomerBuyGoodsOnline,
}

impl C2bCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            C2bCommand::CustomerPayBillOnline => "CustomerPayBillOnline",
            C2bCommand::CustomerBuyGoodsOnline => "CustomerBuyGoodsOnline",
        }
    }
}

/// `CommandID` for B2C payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum B2cCommand {
    #[default]
    SalaryPayment,
    BusinessPayment,
    PromotionPayment,
}

impl B2cCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            B2cCommand::SalaryPayment => "SalaryPayment",
            B2cCommand::BusinessPayment => "BusinessPayment",
            B2cCommand::PromotionPayment => "PromotionPayment",
        }
    }
}

/// What M-Pesa does when the validation URL cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    #[default]
    Completed,
    Cancelled,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::Completed => "Completed",
            ResponseType::Cancelled => "Cancelled",
        }
    }
}

/// Dynamic QR `TrxCode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrTransactionCode {
    #[default]
    BuyGoods,
    WithdrawAgent,
    PayBill,
    SendMoney,
    SendToBusiness,
}

impl QrTransactionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrTransactionCode::BuyGoods => "BG",
            QrTransactionCode::WithdrawAgent => "WA",
            QrTransactionCode::PayBill => "PB",
            QrTransactionCode::SendMoney => "SM",
            QrTransactionCode::SendToBusiness => "SB",
        }
    }
}

/// M-Pesa Ratiba schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    OneOff,
    Daily,
    Weekly,
    Monthly,
    BiMonthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl Frequency {
    /// Numeric code the API expects (sent as a string).
    pub fn code(&self) -> u8 {
        match self {
            Frequency::OneOff => 1,
            Frequency::Daily => 2,
            Frequency::Weekly => 3,
            Frequency::Monthly => 4,
            Frequency::BiMonthly => 5,
            Frequency::Quarterly => 6,
            Frequency::HalfYearly => 7,
            Frequency::Yearly => 8,
        }
    }
}

// ── Requests ────────────────────────────────────────────────────────

/// Lipa Na M-Pesa Online (STK push).
#[derive(Debug, Clone, PartialEq)]
pub struct StkPush {
    pub amount: u64,
    /// `2547XXXXXXXX`; used for both PartyA and PhoneNumber
    pub phone_number: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

impl StkPush {
    pub fn new(
        amount: u64,
        phone_number: impl Into<String>,
        account_reference: impl Into<String>,
        transaction_desc: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            phone_number: phone_number.into(),
            account_reference: account_reference.into(),
            transaction_desc: transaction_desc.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DynamicQr {
    pub merchant_name: String,
    pub reference: String,
    pub amount: u64,
    pub trx_code: QrTransactionCode,
    /// Image size in pixels
    pub size: u32,
}

impl DynamicQr {
    pub fn new(
        merchant_name: impl Into<String>,
        reference: impl Into<String>,
        amount: u64,
    ) -> Self {
        Self {
            merchant_name: merchant_name.into(),
            reference: reference.into(),
            amount,
            trx_code: QrTransactionCode::default(),
            size: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct C2bSimulate {
    pub amount: u64,
    pub phone_number: String,
    pub bill_ref_number: String,
    pub command: C2bCommand,
}

impl C2bSimulate {
    pub fn new(
        amount: u64,
        phone_number: impl Into<String>,
        bill_ref_number: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            phone_number: phone_number.into(),
            bill_ref_number: bill_ref_number.into(),
            command: C2bCommand::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct B2cPayment {
    pub phone_number: String,
    pub amount: u64,
    pub remarks: String,
    /// Defaults to the remarks
    pub occasion: Option<String>,
    pub command: B2cCommand,
}

impl B2cPayment {
    pub fn new(phone_number: impl Into<String>, amount: u64) -> Self {
        Self {
            phone_number: phone_number.into(),
            amount,
            remarks: "Salary Payment".to_string(),
            occasion: None,
            command: B2cCommand::default(),
        }
    }
}

/// Transaction status query. Initiator and password are per call, not
/// taken from the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStatus {
    pub initiator: String,
    /// Plaintext initiator password; encrypted before sending
    pub initiator_password: String,
    pub transaction_id: String,
    pub originator_conversation_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reversal {
    pub transaction_id: String,
    pub amount: u64,
    pub remarks: String,
}

impl Reversal {
    pub fn new(transaction_id: impl Into<String>, amount: u64) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            amount,
            remarks: "OK".to_string(),
        }
    }
}

/// Remit tax to the Kenya Revenue Authority.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxRemittance {
    pub amount: u64,
    /// Payment registration number issued by KRA
    pub prn: String,
    pub remarks: String,
}

impl TaxRemittance {
    pub fn new(amount: u64, prn: impl Into<String>) -> Self {
        Self {
            amount,
            prn: prn.into(),
            remarks: "OK".to_string(),
        }
    }
}

/// Business-to-business transfer: pay bill, buy goods, or B2C top-up.
#[derive(Debug, Clone, PartialEq)]
pub struct BusinessPayment {
    /// Receiving paybill, till, or B2C shortcode
    pub party_b: String,
    pub amount: u64,
    pub account_reference: String,
    /// Consumer phone number on whose behalf the business pays
    pub requester: Option<String>,
    pub remarks: String,
}

impl BusinessPayment {
    pub fn new(
        party_b: impl Into<String>,
        amount: u64,
        account_reference: impl Into<String>,
    ) -> Self {
        Self {
            party_b: party_b.into(),
            amount,
            account_reference: account_reference.into(),
            requester: None,
            remarks: "OK".to_string(),
        }
    }
}

/// USSD push to a merchant's till (B2B Express Checkout).
#[derive(Debug, Clone, PartialEq)]
pub struct B2bExpress {
    /// Paying merchant's till
    pub primary_short_code: String,
    pub partner_name: String,
    pub amount: u64,
    /// Used for both paymentRef and RequestRefID
    pub payment_ref: String,
}

/// M-Pesa Ratiba standing order.
#[derive(Debug, Clone, PartialEq)]
pub struct StandingOrder {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub amount: u64,
    /// Customer phone number debited on each run
    pub party_a: String,
    pub account_reference: String,
    pub transaction_desc: String,
    pub frequency: Frequency,
}
