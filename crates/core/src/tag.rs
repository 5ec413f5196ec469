//! Type tags of the authenticated account channel.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a wire tag is not part of the known set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown type tag: {0}")]
pub struct UnknownTag(pub String);

/// Kind of account event carried by a data frame.
///
/// The set is closed on purpose: anything the exchange adds later is
/// dropped by the dispatcher until it gets a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeTag {
    // Orders
    OrderSnapshot,
    OrderNew,
    OrderNewRequest,
    OrderUpdate,
    OrderUpdateRequest,
    OrderCancel,
    OrderCancelRequest,
    OrderCancelMultiRequest,

    // Positions
    PositionSnapshot,
    PositionNew,
    PositionUpdate,
    PositionClose,

    // Wallets and account info
    WalletSnapshot,
    WalletUpdate,
    WalletTransfer,
    BalanceUpdate,
    MarginInfoUpdate,
    FundingInfoUpdate,

    // Trades
    TradeExecuted,
    TradeUpdate,
    FundingTradeExecuted,
    FundingTradeUpdate,

    // Funding offers, credits and loans
    FundingOfferSnapshot,
    FundingOfferNew,
    FundingOfferUpdate,
    FundingOfferCancel,
    FundingCreditSnapshot,
    FundingCreditNew,
    FundingCreditUpdate,
    FundingCreditClose,
    FundingLoanSnapshot,
    FundingLoanNew,
    FundingLoanUpdate,
    FundingLoanClose,

    // Historical snapshots
    HistoricalOrders,
    HistoricalFundingOffers,
    HistoricalFundingCredits,
    HistoricalFundingLoans,
    HistoricalFundingTrades,

    Notification,
    Heartbeat,
    UserCustomAlert,
}

impl TypeTag {
    /// Every known tag, in display order.
    pub const ALL: [TypeTag; 42] = [
        TypeTag::OrderSnapshot,
        TypeTag::OrderNew,
        TypeTag::OrderNewRequest,
        TypeTag::OrderUpdate,
        TypeTag::OrderUpdateRequest,
        TypeTag::OrderCancel,
        TypeTag::OrderCancelRequest,
        TypeTag::OrderCancelMultiRequest,
        TypeTag::PositionSnapshot,
        TypeTag::PositionNew,
        TypeTag::PositionUpdate,
        TypeTag::PositionClose,
        TypeTag::WalletSnapshot,
        TypeTag::WalletUpdate,
        TypeTag::WalletTransfer,
        TypeTag::BalanceUpdate,
        TypeTag::MarginInfoUpdate,
        TypeTag::FundingInfoUpdate,
        TypeTag::TradeExecuted,
        TypeTag::TradeUpdate,
        TypeTag::FundingTradeExecuted,
        TypeTag::FundingTradeUpdate,
        TypeTag::FundingOfferSnapshot,
        TypeTag::FundingOfferNew,
        TypeTag::FundingOfferUpdate,
        TypeTag::FundingOfferCancel,
        TypeTag::FundingCreditSnapshot,
        TypeTag::FundingCreditNew,
        TypeTag::FundingCreditUpdate,
        TypeTag::FundingCreditClose,
        TypeTag::FundingLoanSnapshot,
        TypeTag::FundingLoanNew,
        TypeTag::FundingLoanUpdate,
        TypeTag::FundingLoanClose,
        TypeTag::HistoricalOrders,
        TypeTag::HistoricalFundingOffers,
        TypeTag::HistoricalFundingCredits,
        TypeTag::HistoricalFundingLoans,
        TypeTag::HistoricalFundingTrades,
        TypeTag::Notification,
        TypeTag::Heartbeat,
        TypeTag::UserCustomAlert,
    ];

    /// Wire representation (the second element of a data frame).
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::OrderSnapshot => "os",
            TypeTag::OrderNew => "on",
            TypeTag::OrderNewRequest => "on-req",
            TypeTag::OrderUpdate => "ou",
            TypeTag::OrderUpdateRequest => "ou-req",
            TypeTag::OrderCancel => "oc",
            TypeTag::OrderCancelRequest => "oc-req",
            TypeTag::OrderCancelMultiRequest => "oc_multi-req",
            TypeTag::PositionSnapshot => "ps",
            TypeTag::PositionNew => "pn",
            TypeTag::PositionUpdate => "pu",
            TypeTag::PositionClose => "pc",
            TypeTag::WalletSnapshot => "ws",
            TypeTag::WalletUpdate => "wu",
            TypeTag::WalletTransfer => "wallet_transfer",
            TypeTag::BalanceUpdate => "bu",
            TypeTag::MarginInfoUpdate => "miu",
            TypeTag::FundingInfoUpdate => "fiu",
            TypeTag::TradeExecuted => "te",
            TypeTag::TradeUpdate => "tu",
            TypeTag::FundingTradeExecuted => "fte",
            TypeTag::FundingTradeUpdate => "ftu",
            TypeTag::FundingOfferSnapshot => "fos",
            TypeTag::FundingOfferNew => "fon",
            TypeTag::FundingOfferUpdate => "fou",
            TypeTag::FundingOfferCancel => "foc",
            TypeTag::FundingCreditSnapshot => "fcs",
            TypeTag::FundingCreditNew => "fcn",
            TypeTag::FundingCreditUpdate => "fcu",
            TypeTag::FundingCreditClose => "fcc",
            TypeTag::FundingLoanSnapshot => "fls",
            TypeTag::FundingLoanNew => "fln",
            TypeTag::FundingLoanUpdate => "flu",
            TypeTag::FundingLoanClose => "flc",
            TypeTag::HistoricalOrders => "hos",
            TypeTag::HistoricalFundingOffers => "hfos",
            TypeTag::HistoricalFundingCredits => "hfcs",
            TypeTag::HistoricalFundingLoans => "hfls",
            TypeTag::HistoricalFundingTrades => "hfts",
            TypeTag::Notification => "n",
            TypeTag::Heartbeat => "hb",
            TypeTag::UserCustomAlert => "uca",
        }
    }

    /// Look up a wire tag. Returns `None` for tags outside the known set.
    pub fn from_wire(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == tag)
    }

    /// Short human description, used by the chat `/types` listing.
    pub fn description(self) -> &'static str {
        match self {
            TypeTag::OrderSnapshot => "order snapshot",
            TypeTag::OrderNew => "order placed",
            TypeTag::OrderNewRequest => "order request result",
            TypeTag::OrderUpdate => "order updated",
            TypeTag::OrderUpdateRequest => "order update request result",
            TypeTag::OrderCancel => "order cancelled / filled",
            TypeTag::OrderCancelRequest => "cancel request result",
            TypeTag::OrderCancelMultiRequest => "multi cancel request result",
            TypeTag::PositionSnapshot => "position snapshot",
            TypeTag::PositionNew => "position opened",
            TypeTag::PositionUpdate => "position update",
            TypeTag::PositionClose => "position closed",
            TypeTag::WalletSnapshot => "wallet snapshot",
            TypeTag::WalletUpdate => "wallet update",
            TypeTag::WalletTransfer => "wallet transfer",
            TypeTag::BalanceUpdate => "balance update",
            TypeTag::MarginInfoUpdate => "margin info",
            TypeTag::FundingInfoUpdate => "funding info",
            TypeTag::TradeExecuted => "trade executed",
            TypeTag::TradeUpdate => "trade update",
            TypeTag::FundingTradeExecuted => "funding trade executed",
            TypeTag::FundingTradeUpdate => "funding trade update",
            TypeTag::FundingOfferSnapshot => "funding offer snapshot",
            TypeTag::FundingOfferNew => "funding offer new",
            TypeTag::FundingOfferUpdate => "funding offer update",
            TypeTag::FundingOfferCancel => "funding offer cancel",
            TypeTag::FundingCreditSnapshot => "funding credit snapshot",
            TypeTag::FundingCreditNew => "funding credit new",
            TypeTag::FundingCreditUpdate => "funding credit update",
            TypeTag::FundingCreditClose => "funding credit close",
            TypeTag::FundingLoanSnapshot => "funding loan snapshot",
            TypeTag::FundingLoanNew => "funding loan new",
            TypeTag::FundingLoanUpdate => "funding loan update",
            TypeTag::FundingLoanClose => "funding loan close",
            TypeTag::HistoricalOrders => "historical orders",
            TypeTag::HistoricalFundingOffers => "historical funding offers",
            TypeTag::HistoricalFundingCredits => "historical funding credits",
            TypeTag::HistoricalFundingLoans => "historical funding loans",
            TypeTag::HistoricalFundingTrades => "historical funding trades",
            TypeTag::Notification => "exchange notification",
            TypeTag::Heartbeat => "heartbeat",
            TypeTag::UserCustomAlert => "price alert",
        }
    }

    /// Tags that only ever arrive embedded in an `n` notification.
    pub fn is_request_result(self) -> bool {
        matches!(
            self,
            TypeTag::OrderNewRequest
                | TypeTag::OrderUpdateRequest
                | TypeTag::OrderCancelRequest
                | TypeTag::OrderCancelMultiRequest
                | TypeTag::WalletTransfer
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_wire(s).ok_or_else(|| UnknownTag(s.to_string()))
    }
}
