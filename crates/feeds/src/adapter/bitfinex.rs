//! Bitfinex v2 authenticated channel parsing.
//!
//! Every inbound text frame is either a JSON object (system frame) or a
//! positional array `[CHANNEL, TAG, PAYLOAD]` (data frame). The payload
//! layout is fixed per tag; this module is the only place that indexes into
//! it, so short or mistyped payloads turn into a single
//! [`FeedError::MalformedPayload`] instead of panics scattered across the
//! formatters.

use crate::{Credentials, FeedError};
use bfxgram_core::{
    Balance, Event, FundingInfo, FundingLoan, FundingOffer, FundingTrade, MarginInfo,
    Notification, Order, Position, Trade, TypeTag, UserAlert, Wallet,
};
use compact_str::CompactString;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha384;

type HmacSha384 = Hmac<Sha384>;

pub struct BitfinexAdapter;

/// One inbound frame, before payload parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    System(SystemFrame),
    Data(DataFrame),
}

/// Key/value frame such as `{"event":"info","version":2}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SystemFrame {
    pub event: String,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Positional frame. `payload` is absent on heartbeats (`[0,"hb"]`).
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    pub channel: i64,
    pub tag: String,
    pub payload: Option<Value>,
}

impl BitfinexAdapter {
    /// Split a raw text frame into its system or data shape.
    pub fn parse_frame(text: &str) -> Result<Frame, FeedError> {
        let value: Value = serde_json::from_str(text)?;
        match value {
            Value::Object(_) => Ok(Frame::System(serde_json::from_value(value)?)),
            Value::Array(mut items) => {
                if items.len() < 2 {
                    return Err(FeedError::ParseError(format!(
                        "data frame needs at least 2 elements, got {}",
                        items.len()
                    )));
                }
                let channel = items[0]
                    .as_i64()
                    .ok_or_else(|| FeedError::ParseError("channel id is not an integer".into()))?;
                let tag = items[1]
                    .as_str()
                    .ok_or_else(|| FeedError::ParseError("type tag is not a string".into()))?
                    .to_string();
                let payload = if items.len() > 2 {
                    Some(items.swap_remove(2))
                } else {
                    None
                };
                Ok(Frame::Data(DataFrame {
                    channel,
                    tag,
                    payload,
                }))
            }
            other => Err(FeedError::ParseError(format!(
                "unexpected frame shape: {}",
                other
            ))),
        }
    }

    /// Parse the payload of a known tag into its typed event.
    pub fn parse_event(tag: TypeTag, payload: &Value) -> Result<Event, FeedError> {
        let name = tag.as_str();
        let event = match tag {
            TypeTag::OrderSnapshot | TypeTag::HistoricalOrders => {
                Event::Orders(parse_list(name, payload, parse_order)?)
            }
            TypeTag::OrderNew | TypeTag::OrderUpdate | TypeTag::OrderCancel => {
                Event::Order(parse_order(Fields::new(name, payload)?)?)
            }
            TypeTag::OrderNewRequest
            | TypeTag::OrderUpdateRequest
            | TypeTag::OrderCancelRequest
            | TypeTag::OrderCancelMultiRequest
            | TypeTag::WalletTransfer => {
                let fields = Fields::new(name, payload)?;
                let notification = parse_notification(&fields)?;
                let order = fields
                    .get(4)
                    .and_then(|info| Fields::new(name, info).ok())
                    .and_then(|info| parse_order(info).ok());
                Event::Request {
                    notification,
                    order,
                }
            }
            TypeTag::PositionSnapshot => Event::Positions(parse_list(name, payload, parse_position)?),
            TypeTag::PositionNew | TypeTag::PositionUpdate | TypeTag::PositionClose => {
                Event::Position(parse_position(Fields::new(name, payload)?)?)
            }
            TypeTag::WalletSnapshot => Event::Wallets(parse_list(name, payload, parse_wallet)?),
            TypeTag::WalletUpdate => Event::Wallet(parse_wallet(Fields::new(name, payload)?)?),
            TypeTag::BalanceUpdate => {
                let f = Fields::new(name, payload)?;
                f.require(2)?;
                Event::Balance(Balance {
                    total: f.f64(0)?,
                    net: f.f64(1)?,
                })
            }
            TypeTag::MarginInfoUpdate => Event::MarginInfo(parse_margin_info(Fields::new(name, payload)?)?),
            TypeTag::FundingInfoUpdate => {
                Event::FundingInfo(parse_funding_info(Fields::new(name, payload)?)?)
            }
            TypeTag::TradeExecuted | TypeTag::TradeUpdate => {
                Event::Trade(parse_trade(Fields::new(name, payload)?)?)
            }
            TypeTag::FundingTradeExecuted | TypeTag::FundingTradeUpdate => {
                Event::FundingTrade(parse_funding_trade(Fields::new(name, payload)?)?)
            }
            TypeTag::HistoricalFundingTrades => {
                Event::FundingTrades(parse_list(name, payload, parse_funding_trade)?)
            }
            TypeTag::FundingOfferSnapshot | TypeTag::HistoricalFundingOffers => {
                Event::Offers(parse_list(name, payload, parse_offer)?)
            }
            TypeTag::FundingOfferNew | TypeTag::FundingOfferUpdate | TypeTag::FundingOfferCancel => {
                Event::Offer(parse_offer(Fields::new(name, payload)?)?)
            }
            TypeTag::FundingCreditSnapshot
            | TypeTag::FundingLoanSnapshot
            | TypeTag::HistoricalFundingCredits
            | TypeTag::HistoricalFundingLoans => Event::Loans(parse_list(name, payload, parse_loan)?),
            TypeTag::FundingCreditNew
            | TypeTag::FundingCreditUpdate
            | TypeTag::FundingCreditClose
            | TypeTag::FundingLoanNew
            | TypeTag::FundingLoanUpdate
            | TypeTag::FundingLoanClose => Event::Loan(parse_loan(Fields::new(name, payload)?)?),
            TypeTag::Notification => {
                Event::Notification(parse_notification(&Fields::new(name, payload)?)?)
            }
            TypeTag::UserCustomAlert => {
                let fields = Fields::new(name, payload)?;
                fields.require(5)?;
                let info = Fields::new(name, fields.value(4)?)?;
                Event::UserAlert(parse_user_alert(info)?)
            }
            TypeTag::Heartbeat => {
                return Err(FeedError::malformed(name, "heartbeats carry no event"));
            }
        };
        Ok(event)
    }

    /// Notification header of an `n` payload, without its embedded info.
    pub fn parse_notification(payload: &Value) -> Result<Notification, FeedError> {
        parse_notification(&Fields::new(TypeTag::Notification.as_str(), payload)?)
    }

    /// Build the auth handshake for the given nonce.
    ///
    /// The signature is `hex(HMAC-SHA384(secret, "AUTH" + nonce))`.
    pub fn auth_message(credentials: &Credentials, nonce: u64) -> Result<String, FeedError> {
        let payload = format!("AUTH{}", nonce);
        let mut mac = HmacSha384::new_from_slice(credentials.api_secret.as_bytes())
            .map_err(|e| FeedError::AuthenticationFailed(format!("HMAC error: {}", e)))?;
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(json!({
            "event": "auth",
            "apiKey": credentials.api_key,
            "authSig": signature,
            "authNonce": nonce,
            "authPayload": payload,
        })
        .to_string())
    }

    /// Nonce for a fresh handshake; must increase between sessions.
    pub fn auth_nonce() -> u64 {
        chrono::Utc::now().timestamp_micros().max(0) as u64
    }

    /// Build a `calc` request asking the exchange to push fresh values.
    ///
    /// Each request is a prefix like `margin_sym_tBTCUSD`,
    /// `position_tIOTUSD` or `wallet_exchange_USD`.
    pub fn calc_message(requests: &[String]) -> String {
        let requests: Vec<[&str; 1]> = requests.iter().map(|r| [r.as_str()]).collect();
        json!([0, "calc", null, requests]).to_string()
    }
}

/// Positional view over one payload array.
struct Fields<'a> {
    tag: &'a str,
    items: &'a [Value],
}

impl<'a> Fields<'a> {
    fn new(tag: &'a str, value: &'a Value) -> Result<Self, FeedError> {
        match value.as_array() {
            Some(items) => Ok(Self { tag, items }),
            None => Err(FeedError::malformed(tag, "payload is not an array")),
        }
    }

    fn require(&self, len: usize) -> Result<(), FeedError> {
        if self.items.len() < len {
            return Err(FeedError::malformed(
                self.tag,
                format!("expected at least {} fields, got {}", len, self.items.len()),
            ));
        }
        Ok(())
    }

    fn get(&self, idx: usize) -> Option<&'a Value> {
        self.items.get(idx).filter(|v| !v.is_null())
    }

    fn value(&self, idx: usize) -> Result<&'a Value, FeedError> {
        self.get(idx)
            .ok_or_else(|| FeedError::malformed(self.tag, format!("field {} is missing", idx)))
    }

    fn f64(&self, idx: usize) -> Result<f64, FeedError> {
        self.value(idx)?
            .as_f64()
            .ok_or_else(|| FeedError::malformed(self.tag, format!("field {} is not a number", idx)))
    }

    fn opt_f64(&self, idx: usize) -> Option<f64> {
        self.get(idx).and_then(Value::as_f64)
    }

    fn i64(&self, idx: usize) -> Result<i64, FeedError> {
        let value = self.value(idx)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .ok_or_else(|| FeedError::malformed(self.tag, format!("field {} is not an integer", idx)))
    }

    fn opt_i64(&self, idx: usize) -> Option<i64> {
        self.get(idx).and_then(Value::as_i64)
    }

    fn str(&self, idx: usize) -> Result<&'a str, FeedError> {
        self.value(idx)?
            .as_str()
            .ok_or_else(|| FeedError::malformed(self.tag, format!("field {} is not a string", idx)))
    }

    fn opt_str(&self, idx: usize) -> Option<&'a str> {
        self.get(idx).and_then(Value::as_str)
    }
}

fn parse_list<T>(
    tag: &str,
    payload: &Value,
    parse: fn(Fields<'_>) -> Result<T, FeedError>,
) -> Result<Vec<T>, FeedError> {
    let outer = Fields::new(tag, payload)?;
    outer
        .items
        .iter()
        .map(|entry| parse(Fields::new(tag, entry)?))
        .collect()
}

// [ID, GID, CID, SYMBOL, MTS_CREATE, MTS_UPDATE, AMOUNT, AMOUNT_ORIG, TYPE,
//  TYPE_PREV, MTS_TIF, _, FLAGS, STATUS, _, _, PRICE, PRICE_AVG, ...]
fn parse_order(f: Fields<'_>) -> Result<Order, FeedError> {
    f.require(17)?;
    Ok(Order {
        id: f.i64(0)?,
        symbol: f.str(3)?.into(),
        amount: f.f64(6)?,
        amount_orig: f.f64(7)?,
        order_type: f.str(8)?.into(),
        status: f.str(13)?.to_string(),
        price: f.f64(16)?,
        price_avg: f.opt_f64(17),
    })
}

// [SYMBOL, STATUS, AMOUNT, BASE_PRICE, MARGIN_FUNDING, MARGIN_FUNDING_TYPE,
//  PL, PL_PERC, PRICE_LIQ, LEVERAGE, ...]
fn parse_position(f: Fields<'_>) -> Result<Position, FeedError> {
    f.require(10)?;
    Ok(Position {
        symbol: f.str(0)?.into(),
        status: f.opt_str(1).unwrap_or_default().into(),
        amount: f.opt_f64(2),
        base_price: f.opt_f64(3),
        funding: f.opt_f64(4),
        pl: f.opt_f64(6),
        pl_perc: f.opt_f64(7),
        liquidation: f.opt_f64(8),
        leverage: f.opt_f64(9),
    })
}

// [WALLET_TYPE, CURRENCY, BALANCE, UNSETTLED_INTEREST, BALANCE_AVAILABLE]
fn parse_wallet(f: Fields<'_>) -> Result<Wallet, FeedError> {
    f.require(3)?;
    Ok(Wallet {
        wallet_type: f.str(0)?.into(),
        currency: f.str(1)?.into(),
        balance: f.f64(2)?,
        available: f.opt_f64(4),
    })
}

// [ID, SYMBOL, MTS, ORDER_ID, EXEC_AMOUNT, EXEC_PRICE, ORDER_TYPE,
//  ORDER_PRICE, MAKER, FEE, FEE_CURRENCY]
fn parse_trade(f: Fields<'_>) -> Result<Trade, FeedError> {
    f.require(7)?;
    Ok(Trade {
        id: f.i64(0)?,
        symbol: f.str(1)?.into(),
        mts: f.i64(2)?,
        order_id: f.i64(3)?,
        exec_amount: f.f64(4)?,
        exec_price: f.f64(5)?,
        order_type: f.str(6)?.into(),
        fee: f.opt_f64(9),
        fee_currency: f.opt_str(10).map(CompactString::from),
    })
}

// [ID, SYMBOL, MTS_CREATE, OFFER_ID, AMOUNT, RATE, PERIOD, MAKER]
fn parse_funding_trade(f: Fields<'_>) -> Result<FundingTrade, FeedError> {
    f.require(7)?;
    Ok(FundingTrade {
        id: f.i64(0)?,
        symbol: f.str(1)?.into(),
        mts: f.i64(2)?,
        offer_id: f.i64(3)?,
        amount: f.f64(4)?,
        rate: f.f64(5)?,
        period: f.i64(6)?,
    })
}

// [ID, SYMBOL, MTS_CREATED, MTS_UPDATED, AMOUNT, AMOUNT_ORIG, TYPE, _, _,
//  FLAGS, STATUS, _, _, _, RATE, PERIOD, ...]
fn parse_offer(f: Fields<'_>) -> Result<FundingOffer, FeedError> {
    f.require(16)?;
    Ok(FundingOffer {
        id: f.i64(0)?,
        symbol: f.str(1)?.into(),
        amount: f.f64(4)?,
        amount_orig: f.f64(5)?,
        offer_type: f.str(6)?.into(),
        status: f.str(10)?.to_string(),
        rate: f.f64(14)?,
        period: f.i64(15)?,
    })
}

// [ID, SYMBOL, SIDE, MTS_CREATE, MTS_UPDATE, AMOUNT, FLAGS, STATUS, _, _, _,
//  RATE, PERIOD, ...]
fn parse_loan(f: Fields<'_>) -> Result<FundingLoan, FeedError> {
    f.require(13)?;
    Ok(FundingLoan {
        id: f.i64(0)?,
        symbol: f.str(1)?.into(),
        side: f.i64(2)?,
        amount: f.f64(5)?,
        status: f.str(7)?.to_string(),
        rate: f.f64(11)?,
        period: f.i64(12)?,
    })
}

// [MTS, TYPE, MESSAGE_ID, _, NOTIFY_INFO, CODE, STATUS, TEXT]
fn parse_notification(f: &Fields<'_>) -> Result<Notification, FeedError> {
    f.require(8)?;
    Ok(Notification {
        mts: f.i64(0)?,
        kind: f.str(1)?.to_string(),
        code: f.opt_i64(5),
        status: f.opt_str(6).unwrap_or_default().into(),
        text: f.opt_str(7).unwrap_or_default().to_string(),
    })
}

// NOTIFY_INFO of a `uca`: [KEY, TYPE, SYMBOL, PRICE, DELTA, COUNT]
fn parse_user_alert(f: Fields<'_>) -> Result<UserAlert, FeedError> {
    f.require(6)?;
    Ok(UserAlert {
        key: f.str(0)?.to_string(),
        alert_type: f.str(1)?.into(),
        symbol: f.str(2)?.into(),
        price: f.f64(3)?,
        delta: f.f64(4)?,
        count: f.i64(5)?,
    })
}

// ["base", [USER_PL, USER_SWAPS, MARGIN_BALANCE, MARGIN_NET, MARGIN_REQUIRED]]
// ["sym", SYMBOL, [TRADABLE_BALANCE, GROSS_BALANCE, BUY, SELL]]
fn parse_margin_info(f: Fields<'_>) -> Result<MarginInfo, FeedError> {
    f.require(2)?;
    match f.str(0)? {
        "base" => {
            let v = Fields::new(f.tag, f.value(1)?)?;
            v.require(5)?;
            Ok(MarginInfo::Base {
                pl: v.f64(0)?,
                swaps: v.f64(1)?,
                balance: v.f64(2)?,
                net: v.f64(3)?,
                required: v.f64(4)?,
            })
        }
        "sym" => {
            f.require(3)?;
            let v = Fields::new(f.tag, f.value(2)?)?;
            v.require(2)?;
            Ok(MarginInfo::Symbol {
                symbol: f.str(1)?.into(),
                tradable: v.f64(0)?,
                gross: v.f64(1)?,
                buy: v.opt_f64(2),
                sell: v.opt_f64(3),
            })
        }
        other => Err(FeedError::malformed(f.tag, format!("unknown margin info kind '{}'", other))),
    }
}

// ["sym", SYMBOL, [YIELD_LOAN, YIELD_LEND, DURATION_LOAN, DURATION_LEND]]
fn parse_funding_info(f: Fields<'_>) -> Result<FundingInfo, FeedError> {
    f.require(3)?;
    let v = Fields::new(f.tag, f.value(2)?)?;
    v.require(4)?;
    Ok(FundingInfo {
        symbol: f.str(1)?.into(),
        yield_loan: v.f64(0)?,
        yield_lend: v.f64(1)?,
        duration_loan: v.f64(2)?,
        duration_lend: v.f64(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ORDER: &str = r#"[5,null,1234,"tIOTUSD",1537092000000,1537092000001,10,-10,"LIMIT",null,null,null,0,"CANCELED",null,null,0.5,0,0,0,null,null,null,0,0,null]"#;

    #[test]
    fn test_parse_info_frame() {
        let frame = BitfinexAdapter::parse_frame(r#"{"event":"info","version":2,"serverId":"x","platform":{"status":1}}"#).unwrap();
        match frame {
            Frame::System(sys) => {
                assert_eq!(sys.event, "info");
                assert_eq!(sys.version, Some(2));
                assert_eq!(sys.code, None);
            }
            _ => panic!("Expected system frame"),
        }
    }

    #[test]
    fn test_parse_info_code_frame() {
        let frame = BitfinexAdapter::parse_frame(r#"{"event":"info","code":20051,"msg":"Stopping. Please try to reconnect"}"#).unwrap();
        assert!(matches!(frame, Frame::System(SystemFrame { code: Some(20051), .. })));
    }

    #[test]
    fn test_parse_heartbeat_frame() {
        let frame = BitfinexAdapter::parse_frame(r#"[0,"hb"]"#).unwrap();
        assert_eq!(
            frame,
            Frame::Data(DataFrame {
                channel: 0,
                tag: "hb".to_string(),
                payload: None
            })
        );
    }

    #[test]
    fn test_parse_frame_rejects_bad_shapes() {
        assert!(BitfinexAdapter::parse_frame("[0]").is_err());
        assert!(BitfinexAdapter::parse_frame(r#"["x","on"]"#).is_err());
        assert!(BitfinexAdapter::parse_frame(r#"[0,[1,2]]"#).is_err());
        assert!(BitfinexAdapter::parse_frame("42").is_err());
        assert!(BitfinexAdapter::parse_frame("not json").is_err());
    }

    #[test]
    fn test_parse_order() {
        let payload: Value = serde_json::from_str(ORDER).unwrap();
        let event = BitfinexAdapter::parse_event(TypeTag::OrderCancel, &payload).unwrap();
        match event {
            Event::Order(order) => {
                assert_eq!(order.id, 5);
                assert_eq!(order.pair(), "IOTUSD");
                assert_eq!(order.amount, 10.0);
                assert_eq!(order.amount_orig, -10.0);
                assert_eq!(order.order_type, "LIMIT");
                assert_eq!(order.status, "CANCELED");
                assert_eq!(order.price, 0.5);
            }
            other => panic!("Expected order, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_short_order_is_malformed() {
        let payload = json!([5, null, 1234, "tIOTUSD"]);
        let err = BitfinexAdapter::parse_event(TypeTag::OrderNew, &payload).unwrap_err();
        assert!(matches!(err, FeedError::MalformedPayload { ref tag, .. } if tag == "on"));
    }

    #[test]
    fn test_parse_order_wrong_types_is_malformed() {
        let mut payload: Value = serde_json::from_str(ORDER).unwrap();
        payload[6] = json!("ten");
        assert!(BitfinexAdapter::parse_event(TypeTag::OrderNew, &payload).is_err());
        assert!(BitfinexAdapter::parse_event(TypeTag::OrderNew, &json!("x")).is_err());
    }

    #[test]
    fn test_parse_order_snapshot() {
        let order: Value = serde_json::from_str(ORDER).unwrap();
        let payload = json!([order.clone(), order]);
        match BitfinexAdapter::parse_event(TypeTag::OrderSnapshot, &payload).unwrap() {
            Event::Orders(orders) => assert_eq!(orders.len(), 2),
            other => panic!("Expected orders, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_position_with_nulls() {
        let payload = json!(["tBTCUSD", "ACTIVE", 0.5, 6500, null, 0, null, null, null, null]);
        match BitfinexAdapter::parse_event(TypeTag::PositionUpdate, &payload).unwrap() {
            Event::Position(p) => {
                assert_eq!(p.amount, Some(0.5));
                assert_eq!(p.pl, None);
                assert!(!p.is_complete());
            }
            other => panic!("Expected position, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_wallet_without_available() {
        let payload = json!(["exchange", "USD", 1500.25, 0]);
        match BitfinexAdapter::parse_event(TypeTag::WalletUpdate, &payload).unwrap() {
            Event::Wallet(w) => {
                assert_eq!(w.wallet_type, "exchange");
                assert_eq!(w.currency, "USD");
                assert_eq!(w.balance, 1500.25);
                assert_eq!(w.available, None);
            }
            other => panic!("Expected wallet, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_request_notification() {
        let order: Value = serde_json::from_str(ORDER).unwrap();
        let payload = json!([1575289447641i64, "on-req", null, null, order, null, "SUCCESS", "Submitting limit buy order for 10 IOT."]);
        match BitfinexAdapter::parse_event(TypeTag::OrderNewRequest, &payload).unwrap() {
            Event::Request {
                notification,
                order,
            } => {
                assert_eq!(notification.kind, "on-req");
                assert_eq!(notification.status, "SUCCESS");
                assert_eq!(order.map(|o| o.id), Some(5));
            }
            other => panic!("Expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_user_alert() {
        let payload = json!([1575289447641i64, "uca", null, null, ["price:tIOTUSD:0.6", "price", "tIOTUSD", 0.6, 0.05, 2], null, "SUCCESS", "alert"]);
        match BitfinexAdapter::parse_event(TypeTag::UserCustomAlert, &payload).unwrap() {
            Event::UserAlert(alert) => {
                assert_eq!(alert.pair(), "IOTUSD");
                assert_eq!(alert.direction(), "above");
                assert_eq!(alert.count, 2);
            }
            other => panic!("Expected alert, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_margin_info() {
        let base = json!(["base", [-13.0, 0, 49331.9, 49318.9, 27]]);
        assert!(matches!(
            BitfinexAdapter::parse_event(TypeTag::MarginInfoUpdate, &base).unwrap(),
            Event::MarginInfo(MarginInfo::Base { required, .. }) if required == 27.0
        ));

        let sym = json!(["sym", "tETHUSD", [149361.1, 149361.1, 149361.1, null]]);
        assert!(matches!(
            BitfinexAdapter::parse_event(TypeTag::MarginInfoUpdate, &sym).unwrap(),
            Event::MarginInfo(MarginInfo::Symbol { buy: Some(_), sell: None, .. })
        ));

        let bad = json!(["other", []]);
        assert!(BitfinexAdapter::parse_event(TypeTag::MarginInfoUpdate, &bad).is_err());
    }

    #[test]
    fn test_auth_message() {
        let creds = Credentials::new("key", "secret");
        let msg = BitfinexAdapter::auth_message(&creds, 1_537_092_000_000_000).unwrap();
        let value: Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(value["event"], "auth");
        assert_eq!(value["apiKey"], "key");
        assert_eq!(value["authPayload"], "AUTH1537092000000000");
        assert_eq!(value["authNonce"], 1_537_092_000_000_000u64);
        // SHA-384 hex digest is 96 characters
        assert_eq!(value["authSig"].as_str().unwrap().len(), 96);
    }

    #[test]
    fn test_auth_signature_is_deterministic() {
        let creds = Credentials::new("key", "secret");
        let a = BitfinexAdapter::auth_message(&creds, 1).unwrap();
        let b = BitfinexAdapter::auth_message(&creds, 1).unwrap();
        let c = BitfinexAdapter::auth_message(&creds, 2).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_calc_message() {
        let msg = BitfinexAdapter::calc_message(&["margin_sym_tBTCUSD".to_string(), "position_tIOTUSD".to_string()]);
        assert_eq!(msg, r#"[0,"calc",null,[["margin_sym_tBTCUSD"],["position_tIOTUSD"]]]"#);
    }
}
