//! Typed account events.
//!
//! Each data frame on the authenticated channel is parsed into one
//! [`Event`]. Records only keep the fields something downstream renders;
//! positional layouts live in the feeds adapter.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Strip the leading trading (`t`) or funding (`f`) marker from a symbol.
///
/// `tIOTUSD` becomes `IOTUSD`, `fUSD` becomes `USD`. Anything else is
/// returned untouched.
pub fn strip_symbol_marker(symbol: &str) -> &str {
    match symbol.as_bytes() {
        [b't' | b'f', rest @ ..] if !rest.is_empty() => &symbol[1..],
        _ => symbol,
    }
}

/// An order as reported on `os`/`on`/`ou`/`oc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub symbol: CompactString,
    /// Remaining amount; negative for sells.
    pub amount: f64,
    /// Amount the order was placed with.
    pub amount_orig: f64,
    pub order_type: CompactString,
    /// Terminal or current status string, e.g. `ACTIVE`, `CANCELED`,
    /// `EXECUTED @ 0.5(10.0)`.
    pub status: String,
    pub price: f64,
    pub price_avg: Option<f64>,
}

impl Order {
    pub fn pair(&self) -> &str {
        strip_symbol_marker(&self.symbol)
    }

    pub fn is_canceled(&self) -> bool {
        self.status == "CANCELED"
    }

    /// Volume shown when the order leaves the book.
    ///
    /// A plain cancel reports what was still open; a fill (full or
    /// partial) reports the original size.
    pub fn closing_amount(&self) -> f64 {
        if self.is_canceled() {
            self.amount
        } else {
            self.amount_orig
        }
    }
}

/// A margin position as reported on `ps`/`pn`/`pu`/`pc`.
///
/// Every numeric field is optional: the exchange sends `null` until the
/// values have been calculated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: CompactString,
    pub status: CompactString,
    pub amount: Option<f64>,
    pub base_price: Option<f64>,
    pub funding: Option<f64>,
    pub pl: Option<f64>,
    pub pl_perc: Option<f64>,
    pub liquidation: Option<f64>,
    pub leverage: Option<f64>,
}

impl Position {
    pub fn pair(&self) -> &str {
        strip_symbol_marker(&self.symbol)
    }

    /// True when every rendered field carries a non-zero value.
    pub fn is_complete(&self) -> bool {
        !self.symbol.is_empty()
            && [
                self.amount,
                self.base_price,
                self.funding,
                self.pl,
                self.pl_perc,
                self.liquidation,
                self.leverage,
            ]
            .iter()
            .all(|v| matches!(v, Some(x) if *x != 0.0))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// `exchange`, `margin` or `funding`.
    pub wallet_type: CompactString,
    pub currency: CompactString,
    pub balance: f64,
    pub available: Option<f64>,
}

/// Total and net assets under management (`bu`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub total: f64,
    pub net: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub symbol: CompactString,
    /// Execution time, milliseconds since epoch.
    pub mts: i64,
    pub order_id: i64,
    pub exec_amount: f64,
    pub exec_price: f64,
    pub order_type: CompactString,
    /// Only present on `tu`.
    pub fee: Option<f64>,
    pub fee_currency: Option<CompactString>,
}

impl Trade {
    pub fn pair(&self) -> &str {
        strip_symbol_marker(&self.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingTrade {
    pub id: i64,
    pub symbol: CompactString,
    pub mts: i64,
    pub offer_id: i64,
    pub amount: f64,
    /// Daily rate as a fraction (0.0002 = 0.02%).
    pub rate: f64,
    /// Period in days.
    pub period: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingOffer {
    pub id: i64,
    pub symbol: CompactString,
    pub amount: f64,
    pub amount_orig: f64,
    pub offer_type: CompactString,
    pub status: String,
    pub rate: f64,
    pub period: i64,
}

/// Funding credits (`fc*`) and loans (`fl*`) share one layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingLoan {
    pub id: i64,
    pub symbol: CompactString,
    /// 1 lender, 0 both, -1 borrower.
    pub side: i64,
    pub amount: f64,
    pub status: String,
    pub rate: f64,
    pub period: i64,
}

impl FundingLoan {
    pub fn side_label(&self) -> &'static str {
        match self.side {
            s if s > 0 => "lender",
            s if s < 0 => "borrower",
            _ => "both",
        }
    }
}

/// Header of an `n` notification frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub mts: i64,
    /// Embedded type tag, kept raw since it may be outside the known set.
    pub kind: String,
    pub code: Option<i64>,
    /// `SUCCESS`, `ERROR`, `FAILURE`, `INFO`...
    pub status: CompactString,
    pub text: String,
}

/// A user custom price alert that fired (`uca`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAlert {
    pub key: String,
    pub alert_type: CompactString,
    pub symbol: CompactString,
    pub price: f64,
    /// Distance between the market and the trigger when the alert was set.
    pub delta: f64,
    /// Number of times the alert may still fire.
    pub count: i64,
}

impl UserAlert {
    pub fn pair(&self) -> &str {
        strip_symbol_marker(&self.symbol)
    }

    pub fn direction(&self) -> &'static str {
        if self.delta > 0.0 {
            "above"
        } else {
            "under"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarginInfo {
    Base {
        pl: f64,
        swaps: f64,
        balance: f64,
        net: f64,
        required: f64,
    },
    Symbol {
        symbol: CompactString,
        tradable: f64,
        gross: f64,
        /// `None` while the exchange is still calculating.
        buy: Option<f64>,
        sell: Option<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundingInfo {
    pub symbol: CompactString,
    pub yield_loan: f64,
    pub yield_lend: f64,
    pub duration_loan: f64,
    pub duration_lend: f64,
}

/// Parsed payload of one data frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    Orders(Vec<Order>),
    Order(Order),
    /// Result of an order/transfer request, delivered inside `n`.
    Request {
        notification: Notification,
        order: Option<Order>,
    },
    Positions(Vec<Position>),
    Position(Position),
    Wallets(Vec<Wallet>),
    Wallet(Wallet),
    Balance(Balance),
    MarginInfo(MarginInfo),
    FundingInfo(FundingInfo),
    Trade(Trade),
    FundingTrades(Vec<FundingTrade>),
    FundingTrade(FundingTrade),
    Offers(Vec<FundingOffer>),
    Offer(FundingOffer),
    Loans(Vec<FundingLoan>),
    Loan(FundingLoan),
    Notification(Notification),
    UserAlert(UserAlert),
}
