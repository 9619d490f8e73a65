//! Request bodies, one builder per operation.
//!
//! Builders are pure: configuration + request + already-computed values
//! (timestamp, encrypted credential, conversation ID) in, JSON out. Field
//! names and spellings follow the Daraja wire format exactly, including
//! `RecieverIdentifierType`.

use serde_json::{json, Map, Value};

use crate::config::{ClientConfig, ResultUrls};
use crate::ids;
use crate::request::{
    B2bExpress, B2cPayment, BusinessPayment, C2bSimulate, DynamicQr, Reversal, ResponseType,
    StandingOrder, StkPush, TaxRemittance, TransactionStatus,
};

/// KRA's collection shortcode.
pub const KRA_SHORTCODE: &str = "572572";

/// `IdentifierType` 4: organisation shortcode.
const SHORTCODE_IDENTIFIER: &str = "4";
/// `IdentifierType` 11: organisation for reversals.
const REVERSAL_IDENTIFIER: &str = "11";

// ── Endpoints ───────────────────────────────────────────────────────

/// Operation endpoint, relative to the environment's base URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    StkPush,
    StkQuery,
    DynamicQr,
    C2bRegisterUrl,
    C2bSimulate,
    B2cPayment,
    TransactionStatus,
    AccountBalance,
    Reversal,
    TaxRemittance,
    /// Business pay bill, business buy goods and B2C top-up share this
    B2bPayment,
    B2bExpress,
    StandingOrder,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::StkPush => "/mpesa/stkpush/v1/processrequest",
            Endpoint::StkQuery => "/mpesa/stkpushquery/v1/query",
            Endpoint::DynamicQr => "/mpesa/qrcode/v1/generate",
            Endpoint::C2bRegisterUrl => "/mpesa/c2b/v1/registerurl",
            Endpoint::C2bSimulate => "/mpesa/c2b/v1/simulate",
            Endpoint::B2cPayment => "/mpesa/b2c/v3/paymentrequest",
            Endpoint::TransactionStatus => "/mpesa/transactionstatus/v1/query",
            Endpoint::AccountBalance => "/mpesa/accountbalance/v1/query",
            Endpoint::Reversal => "/mpesa/reversal/v1/request",
            Endpoint::TaxRemittance => "/mpesa/b2b/v1/remittax",
            Endpoint::B2bPayment => "/mpesa/b2b/v1/paymentrequest",
            Endpoint::B2bExpress => "/v1/ussdpush/get-msisdn",
            Endpoint::StandingOrder => "/standingorder/v1/createStandingOrderExternal",
        }
    }
}

/// `CommandID` for the shared B2B payment endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum B2bCommand {
    BusinessPayBill,
    BusinessBuyGoods,
    BusinessPayToBulk,
}

impl B2bCommand {
    fn as_str(&self) -> &'static str {
        match self {
            B2bCommand::BusinessPayBill => "BusinessPayBill",
            B2bCommand::BusinessBuyGoods => "BusinessBuyGoods",
            B2bCommand::BusinessPayToBulk => "BusinessPayToBulk",
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Prefix `fields` with the Initiator / SecurityCredential / CommandID
/// triple every initiator-authenticated operation starts with.
fn initiator_body(initiator: &str, credential: &str, command_id: &str, fields: Value) -> Value {
    let mut body = Map::new();
    body.insert("Initiator".into(), Value::String(initiator.to_string()));
    body.insert("SecurityCredential".into(), Value::String(credential.to_string()));
    body.insert("CommandID".into(), Value::String(command_id.to_string()));
    if let Value::Object(rest) = fields {
        body.extend(rest);
    }
    Value::Object(body)
}

fn result_urls(urls: &ResultUrls) -> Value {
    json!({
        "ResultURL": urls.result,
        "QueueTimeOutURL": urls.timeout,
    })
}

fn merge(mut base: Value, extra: Value) -> Value {
    if let (Value::Object(base), Value::Object(extra)) = (&mut base, extra) {
        base.extend(extra);
    }
    base
}

// ── Builders ────────────────────────────────────────────────────────

pub(crate) fn stk_push(config: &ClientConfig, req: &StkPush, timestamp: &str) -> Value {
    json!({
        "BusinessShortCode": config.shortcode,
        "Password": ids::stk_password(&config.shortcode, &config.passkey, timestamp),
        "Timestamp": timestamp,
        "TransactionType": "CustomerPayBillOnline",
        "Amount": req.amount,
        "PartyA": req.phone_number,
        "PartyB": config.shortcode,
        "PhoneNumber": req.phone_number,
        "CallBackURL": config.callbacks.stk_push,
        "AccountReference": req.account_reference,
        "TransactionDesc": req.transaction_desc,
    })
}

// `password` is the certificate-encrypted STK password input, or its plain
// base64 form when the client is configured for that.
pub(crate) fn stk_query(
    config: &ClientConfig,
    checkout_request_id: &str,
    password: &str,
    timestamp: &str,
) -> Value {
    json!({
        "BusinessShortCode": config.shortcode,
        "Password": password,
        "Timestamp": timestamp,
        "CheckoutRequestID": checkout_request_id,
    })
}

pub(crate) fn dynamic_qr(config: &ClientConfig, req: &DynamicQr) -> Value {
    json!({
        "MerchantName": req.merchant_name,
        "RefNo": req.reference,
        "Amount": req.amount,
        "TrxCode": req.trx_code.as_str(),
        "CPI": config.shortcode,
        "Size": req.size.to_string(),
    })
}

pub(crate) fn c2b_register_url(config: &ClientConfig, response_type: ResponseType) -> Value {
    json!({
        "ShortCode": config.shortcode,
        "ResponseType": response_type.as_str(),
        "ConfirmationURL": config.callbacks.c2b_confirmation,
        "ValidationURL": config.callbacks.c2b_validation,
    })
}

pub(crate) fn c2b_simulate(config: &ClientConfig, req: &C2bSimulate) -> Value {
    json!({
        "ShortCode": config.shortcode,
        "CommandID": req.command.as_str(),
        "Amount": req.amount,
        "Msisdn": req.phone_number,
        "BillRefNumber": req.bill_ref_number,
    })
}

// B2C v3 names the initiator field `InitiatorName`, so no initiator_body here.
pub(crate) fn b2c_payment(
    config: &ClientConfig,
    req: &B2cPayment,
    credential: &str,
    conversation_id: &str,
) -> Value {
    let urls = &config.callbacks.b2c;
    json!({
        "OriginatorConversationID": conversation_id,
        "InitiatorName": config.initiator,
        "SecurityCredential": credential,
        "CommandID": req.command.as_str(),
        "Amount": req.amount,
        "PartyA": config.shortcode,
        "PartyB": req.phone_number,
        "Remarks": req.remarks,
        "QueueTimeOutURL": urls.timeout,
        "ResultURL": urls.result,
        "Occasion": req.occasion.as_deref().unwrap_or(&req.remarks),
    })
}

pub(crate) fn transaction_status(
    config: &ClientConfig,
    req: &TransactionStatus,
    credential: &str,
) -> Value {
    initiator_body(
        &req.initiator,
        credential,
        "TransactionStatusQuery",
        merge(
            json!({
                "TransactionID": req.transaction_id,
                "OriginatorConversationID": req.originator_conversation_id,
                "PartyA": config.shortcode,
                "IdentifierType": SHORTCODE_IDENTIFIER,
                "Remarks": "OK",
                "Occasion": "OK",
            }),
            result_urls(&config.callbacks.transaction_status),
        ),
    )
}

pub(crate) fn account_balance(config: &ClientConfig, credential: &str) -> Value {
    initiator_body(
        &config.initiator,
        credential,
        "AccountBalance",
        merge(
            json!({
                "PartyA": config.shortcode,
                "IdentifierType": SHORTCODE_IDENTIFIER,
                "Remarks": "OK",
            }),
            result_urls(&config.callbacks.account_balance),
        ),
    )
}

pub(crate) fn reversal(config: &ClientConfig, req: &Reversal, credential: &str) -> Value {
    initiator_body(
        &config.initiator,
        credential,
        "TransactionReversal",
        merge(
            json!({
                "TransactionID": req.transaction_id,
                "Amount": req.amount,
                "ReceiverParty": config.shortcode,
                "RecieverIdentifierType": REVERSAL_IDENTIFIER,
                "Remarks": req.remarks,
                "Occasion": req.remarks,
            }),
            result_urls(&config.callbacks.reversal),
        ),
    )
}

pub(crate) fn tax_remittance(
    config: &ClientConfig,
    req: &TaxRemittance,
    credential: &str,
) -> Value {
    initiator_body(
        &config.initiator,
        credential,
        "PayTaxToKRA",
        merge(
            json!({
                "SenderIdentifierType": SHORTCODE_IDENTIFIER,
                "RecieverIdentifierType": SHORTCODE_IDENTIFIER,
                "Amount": req.amount,
                "PartyA": config.shortcode,
                "PartyB": KRA_SHORTCODE,
                "AccountReference": req.prn,
                "Remarks": req.remarks,
            }),
            result_urls(&config.callbacks.tax_remittance),
        ),
    )
}

pub(crate) fn business_payment(
    config: &ClientConfig,
    req: &BusinessPayment,
    credential: &str,
    command: B2bCommand,
    urls: &ResultUrls,
) -> Value {
    let mut fields = json!({
        "SenderIdentifierType": SHORTCODE_IDENTIFIER,
        "RecieverIdentifierType": SHORTCODE_IDENTIFIER,
        "Amount": req.amount,
        "PartyA": config.shortcode,
        "PartyB": req.party_b,
        "AccountReference": req.account_reference,
        "Remarks": req.remarks,
    });
    if let Some(requester) = &req.requester {
        fields["Requester"] = Value::String(requester.clone());
    }
    initiator_body(
        &config.initiator,
        credential,
        command.as_str(),
        merge(fields, result_urls(urls)),
    )
}

pub(crate) fn b2b_express(config: &ClientConfig, req: &B2bExpress) -> Value {
    json!({
        "primaryShortCode": req.primary_short_code,
        "receiverShortCode": config.shortcode,
        "amount": req.amount,
        "paymentRef": req.payment_ref,
        "callbackUrl": config.callbacks.b2b_express,
        "partnerName": req.partner_name,
        "RequestRefID": req.payment_ref,
    })
}

// Ratiba takes every value as a string.
pub(crate) fn standing_order(config: &ClientConfig, req: &StandingOrder) -> Value {
    json!({
        "StandingOrderName": req.name,
        "StartDate": req.start_date.format("%Y%m%d").to_string(),
        "EndDate": req.end_date.format("%Y%m%d").to_string(),
        "BusinessShortCode": config.shortcode,
        "TransactionType": "Standing Order Customer Pay Bill",
        "ReceiverPartyIdentifierType": SHORTCODE_IDENTIFIER,
        "Amount": req.amount.to_string(),
        "PartyA": req.party_a,
        "CallBackURL": config.callbacks.standing_order,
        "AccountReference": req.account_reference,
        "TransactionDesc": req.transaction_desc,
        "Frequency": req.frequency.code().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{B2cCommand, C2bCommand, Frequency, QrTransactionCode};
    use base64::Engine;
    use chrono::NaiveDate;

    fn config() -> ClientConfig {
        let mut config = ClientConfig {
            shortcode: "174379".into(),
            passkey: "passkey".into(),
            initiator: "apiop".into(),
            ..Default::default()
        };
        config.callbacks.stk_push = "https://example.com/stk".into();
        config.callbacks.b2c =
            ResultUrls::new("https://example.com/b2c/result", "https://example.com/b2c/timeout");
        config.callbacks.b2b =
            ResultUrls::new("https://example.com/b2b/result", "https://example.com/b2b/timeout");
        config.callbacks.b2c_topup = ResultUrls::new(
            "https://example.com/topup/result",
            "https://example.com/topup/timeout",
        );
        config.callbacks.reversal =
            ResultUrls::new("https://example.com/rev/result", "https://example.com/rev/timeout");
        config
    }

    fn keys(v: &Value) -> Vec<&str> {
        let mut k: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        k.sort_unstable();
        k
    }

    #[test]
    fn test_endpoint_paths_are_absolute() {
        let all = [
            Endpoint::StkPush,
            Endpoint::StkQuery,
            Endpoint::DynamicQr,
            Endpoint::C2bRegisterUrl,
            Endpoint::C2bSimulate,
            Endpoint::B2cPayment,
            Endpoint::TransactionStatus,
            Endpoint::AccountBalance,
            Endpoint::Reversal,
            Endpoint::TaxRemittance,
            Endpoint::B2bPayment,
            Endpoint::B2bExpress,
            Endpoint::StandingOrder,
        ];
        for e in all {
            assert!(e.path().starts_with('/'), "{:?}", e);
        }
    }

    #[test]
    fn test_stk_push_payload() {
        let req = StkPush::new(10, "254700000000", "INV1", "Test");
        let body = stk_push(&config(), &req, "20240101120000");

        let expected_pw =
            base64::engine::general_purpose::STANDARD.encode("174379passkey20240101120000");
        assert_eq!(body["Password"], expected_pw);
        assert_eq!(body["Timestamp"], "20240101120000");
        assert_eq!(body["BusinessShortCode"], "174379");
        assert_eq!(body["PartyB"], "174379");
        assert_eq!(body["PartyA"], "254700000000");
        assert_eq!(body["PhoneNumber"], "254700000000");
        assert_eq!(body["Amount"], 10);
        assert_eq!(body["TransactionType"], "CustomerPayBillOnline");
        assert_eq!(body["CallBackURL"], "https://example.com/stk");
        assert_eq!(body["AccountReference"], "INV1");
        assert_eq!(body["TransactionDesc"], "Test");
    }

    #[test]
    fn test_stk_query_payload() {
        let query = stk_query(&config(), "ws_CO_123", "ENCRYPTED==", "20240101120000");
        assert_eq!(query["Password"], "ENCRYPTED==");
        assert_eq!(query["Timestamp"], "20240101120000");
        assert_eq!(query["BusinessShortCode"], "174379");
        assert_eq!(query["CheckoutRequestID"], "ws_CO_123");
        assert_eq!(
            keys(&query),
            ["BusinessShortCode", "CheckoutRequestID", "Password", "Timestamp"]
        );
    }

    #[test]
    fn test_dynamic_qr_payload() {
        let mut req = DynamicQr::new("Shop", "INV9", 250);
        req.trx_code = QrTransactionCode::PayBill;
        let body = dynamic_qr(&config(), &req);
        assert_eq!(body["TrxCode"], "PB");
        assert_eq!(body["CPI"], "174379");
        assert_eq!(body["Size"], "500");
        assert_eq!(body["Amount"], 250);
    }

    #[test]
    fn test_c2b_payloads() {
        let mut cfg = config();
        cfg.callbacks.c2b_confirmation = "https://example.com/confirm".into();
        cfg.callbacks.c2b_validation = "https://example.com/validate".into();

        let reg = c2b_register_url(&cfg, ResponseType::Cancelled);
        assert_eq!(reg["ResponseType"], "Cancelled");
        assert_eq!(reg["ConfirmationURL"], "https://example.com/confirm");
        assert_eq!(reg["ValidationURL"], "https://example.com/validate");

        let mut sim = C2bSimulate::new(5, "254708374149", "acc");
        sim.command = C2bCommand::CustomerBuyGoodsOnline;
        let body = c2b_simulate(&cfg, &sim);
        assert_eq!(body["CommandID"], "CustomerBuyGoodsOnline");
        assert_eq!(body["Msisdn"], "254708374149");
        assert_eq!(body["BillRefNumber"], "acc");
    }

    #[test]
    fn test_b2c_payload() {
        let mut req = B2cPayment::new("254708374149", 500);
        req.command = B2cCommand::BusinessPayment;
        let body = b2c_payment(&config(), &req, "ENCRYPTED==", "VAPOR-ABCDEFGH-1700000000");

        assert_eq!(body["SecurityCredential"], "ENCRYPTED==");
        assert_eq!(body["InitiatorName"], "apiop");
        assert_eq!(body["CommandID"], "BusinessPayment");
        assert_eq!(body["OriginatorConversationID"], "VAPOR-ABCDEFGH-1700000000");
        assert_eq!(body["PartyA"], "174379");
        assert_eq!(body["PartyB"], "254708374149");
        assert_eq!(body["Occasion"], "Salary Payment");
        assert_eq!(body["ResultURL"], "https://example.com/b2c/result");
        assert_eq!(body["QueueTimeOutURL"], "https://example.com/b2c/timeout");
        assert!(body.get("Initiator").is_none());
    }

    #[test]
    fn test_initiator_operations_lead_with_credential_triple() {
        let cfg = config();
        let status = transaction_status(
            &cfg,
            &TransactionStatus {
                initiator: "ops-user".into(),
                initiator_password: "pw".into(),
                transaction_id: "OEI2AK4Q16".into(),
                originator_conversation_id: "VAPOR-X-1".into(),
            },
            "CRED",
        );
        assert_eq!(status["Initiator"], "ops-user");
        assert_eq!(status["CommandID"], "TransactionStatusQuery");
        assert_eq!(status["IdentifierType"], "4");

        let balance = account_balance(&cfg, "CRED");
        assert_eq!(balance["Initiator"], "apiop");
        assert_eq!(balance["CommandID"], "AccountBalance");
        assert_eq!(
            keys(&balance),
            [
                "CommandID",
                "IdentifierType",
                "Initiator",
                "PartyA",
                "QueueTimeOutURL",
                "Remarks",
                "ResultURL",
                "SecurityCredential",
            ]
        );

        let rev = reversal(&cfg, &Reversal::new("OEI2AK4Q16", 100), "CRED");
        assert_eq!(rev["CommandID"], "TransactionReversal");
        assert_eq!(rev["RecieverIdentifierType"], "11");
        assert_eq!(rev["ReceiverParty"], "174379");
        assert_eq!(rev["ResultURL"], "https://example.com/rev/result");

        let tax = tax_remittance(&cfg, &TaxRemittance::new(239, "PRN1234XN"), "CRED");
        assert_eq!(tax["CommandID"], "PayTaxToKRA");
        assert_eq!(tax["PartyB"], KRA_SHORTCODE);
        assert_eq!(tax["AccountReference"], "PRN1234XN");
    }

    #[test]
    fn test_business_payment_requester_optional() {
        let cfg = config();
        let urls = &cfg.callbacks.b2b;
        let mut req = BusinessPayment::new("000000", 100, "353353");
        let body = business_payment(&cfg, &req, "CRED", B2bCommand::BusinessPayBill, urls);
        assert_eq!(body["CommandID"], "BusinessPayBill");
        assert!(body.get("Requester").is_none());
        assert_eq!(body["ResultURL"], "https://example.com/b2b/result");

        req.requester = Some("254700000000".into());
        let body = business_payment(&cfg, &req, "CRED", B2bCommand::BusinessBuyGoods, urls);
        assert_eq!(body["CommandID"], "BusinessBuyGoods");
        assert_eq!(body["Requester"], "254700000000");
    }

    #[test]
    fn test_b2c_topup_payload() {
        let cfg = config();
        let req = BusinessPayment::new("600000", 239, "353353");
        let urls = &cfg.callbacks.b2c_topup;
        let body = business_payment(&cfg, &req, "CRED", B2bCommand::BusinessPayToBulk, urls);
        assert_eq!(body["CommandID"], "BusinessPayToBulk");
        assert_eq!(body["PartyB"], "600000");
        assert_eq!(body["ResultURL"], "https://example.com/topup/result");
        assert_eq!(body["QueueTimeOutURL"], "https://example.com/topup/timeout");
    }

    #[test]
    fn test_b2b_express_payload() {
        let body = b2b_express(
            &config(),
            &B2bExpress {
                primary_short_code: "000001".into(),
                partner_name: "Vendor".into(),
                amount: 100,
                payment_ref: "paymentRef".into(),
            },
        );
        assert_eq!(body["receiverShortCode"], "174379");
        assert_eq!(body["paymentRef"], "paymentRef");
        assert_eq!(body["RequestRefID"], "paymentRef");
    }

    #[test]
    fn test_standing_order_payload() {
        let body = standing_order(
            &config(),
            &StandingOrder {
                name: "Rent".into(),
                start_date: NaiveDate::from_ymd_opt(2025, 1, 5).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2025, 12, 5).unwrap(),
                amount: 4500,
                party_a: "254708374149".into(),
                account_reference: "HSE-7".into(),
                transaction_desc: "rent".into(),
                frequency: Frequency::Monthly,
            },
        );
        assert_eq!(body["StartDate"], "20250105");
        assert_eq!(body["EndDate"], "20251205");
        assert_eq!(body["Frequency"], "4");
        assert_eq!(body["Amount"], "4500");
        assert_eq!(body["PartyA"], "254708374149");
        assert_eq!(body["ReceiverPartyIdentifierType"], "4");
    }
}
