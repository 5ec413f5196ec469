//! Per-tag text rendering of account events.
//!
//! Formatters are plain functions collected in a table built once by
//! [`formatters`]. They return the message body; the dispatcher wraps it
//! in a `<pre>` block for fixed-width rendering. Returning `None` means
//! "nothing worth sending" (e.g. a position update whose values are still
//! being calculated).

use bfxgram_core::{
    strip_symbol_marker, Event, FundingInfo, FundingLoan, FundingOffer, FundingTrade, MarginInfo,
    Notification, Order, Position, Trade, TypeTag, Wallet,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders one event of the given tag.
pub type Formatter = fn(TypeTag, &Event) -> Option<String>;

/// Build the tag → formatter table. Every known tag except `hb` has an entry.
pub fn formatters() -> HashMap<TypeTag, Formatter> {
    let mut table: HashMap<TypeTag, Formatter> = HashMap::with_capacity(TypeTag::ALL.len());
    for tag in TypeTag::ALL {
        let formatter: Formatter = match tag {
            TypeTag::Heartbeat => continue,
            TypeTag::OrderSnapshot | TypeTag::HistoricalOrders => format_orders,
            TypeTag::OrderNew | TypeTag::OrderUpdate => format_order_change,
            TypeTag::OrderCancel => format_order_closed,
            TypeTag::OrderNewRequest
            | TypeTag::OrderUpdateRequest
            | TypeTag::OrderCancelRequest
            | TypeTag::OrderCancelMultiRequest
            | TypeTag::WalletTransfer => format_request,
            TypeTag::PositionSnapshot => format_positions,
            TypeTag::PositionNew | TypeTag::PositionClose => format_position_change,
            TypeTag::PositionUpdate => format_position_update,
            TypeTag::WalletSnapshot | TypeTag::WalletUpdate => format_wallets,
            TypeTag::BalanceUpdate => format_balance,
            TypeTag::MarginInfoUpdate => format_margin_info,
            TypeTag::FundingInfoUpdate => format_funding_info,
            TypeTag::TradeExecuted | TypeTag::TradeUpdate => format_trade,
            TypeTag::FundingTradeExecuted
            | TypeTag::FundingTradeUpdate
            | TypeTag::HistoricalFundingTrades => format_funding_trades,
            TypeTag::FundingOfferSnapshot
            | TypeTag::FundingOfferNew
            | TypeTag::FundingOfferUpdate
            | TypeTag::FundingOfferCancel
            | TypeTag::HistoricalFundingOffers => format_offers,
            TypeTag::FundingCreditSnapshot
            | TypeTag::FundingCreditNew
            | TypeTag::FundingCreditUpdate
            | TypeTag::FundingCreditClose
            | TypeTag::FundingLoanSnapshot
            | TypeTag::FundingLoanNew
            | TypeTag::FundingLoanUpdate
            | TypeTag::FundingLoanClose
            | TypeTag::HistoricalFundingCredits
            | TypeTag::HistoricalFundingLoans => format_loans,
            TypeTag::Notification => format_notification,
            TypeTag::UserCustomAlert => format_user_alert,
        };
        table.insert(tag, formatter);
    }
    table
}

/// `+10` for positive values, `-10` / `0` otherwise.
fn signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{}", value)
    } else {
        value.to_string()
    }
}

fn percent(rate: f64) -> String {
    format!("{:.4}%", rate * 100.0)
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn timestamp(mts: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(mts)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| mts.to_string())
}

fn order_line(order: &Order) -> String {
    format!(
        "Order {} {} {} {} @ {}",
        order.id,
        order.pair(),
        order.order_type,
        signed(order.amount),
        order.price
    )
}

fn format_orders(tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Orders(orders) = event else {
        return None;
    };
    let title = if tag == TypeTag::HistoricalOrders {
        "Order history"
    } else {
        "Open orders"
    };
    if orders.is_empty() {
        return Some(format!("{}: none", title));
    }
    let mut out = format!("{}:", title);
    for order in orders {
        let _ = write!(out, "\n{} {}", order_line(order), order.status);
    }
    Some(out)
}

fn format_order_change(tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Order(order) = event else {
        return None;
    };
    let verb = if tag == TypeTag::OrderNew {
        "PLACED"
    } else {
        "UPDATED"
    };
    Some(format!("{} {}", order_line(order), verb))
}

fn format_order_closed(_tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Order(order) = event else {
        return None;
    };
    Some(format!(
        "Order {} {} {} {} @ {} was {}",
        order.id,
        order.pair(),
        order.order_type,
        signed(order.closing_amount()),
        order.price,
        order.status
    ))
}

fn format_request(tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Request {
        notification,
        order,
    } = event
    else {
        return None;
    };
    let mut out = format!("{} {}", tag.description(), notification.status);
    if !notification.text.is_empty() {
        let _ = write!(out, "\n{}", notification.text);
    }
    if let Some(order) = order {
        let _ = write!(out, "\n{}", order_line(order));
    }
    Some(out)
}

fn position_line(position: &Position) -> String {
    format!(
        "{} {} {} @ {} P/L {}",
        position.pair(),
        position.status,
        opt(position.amount),
        opt(position.base_price),
        opt(position.pl)
    )
}

fn format_positions(_tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Positions(positions) = event else {
        return None;
    };
    if positions.is_empty() {
        return Some("Positions: none".to_string());
    }
    let mut out = String::from("Positions:");
    for position in positions {
        let _ = write!(out, "\n{}", position_line(position));
    }
    Some(out)
}

fn format_position_change(tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Position(position) = event else {
        return None;
    };
    let verb = if tag == TypeTag::PositionNew {
        "OPENED"
    } else {
        "CLOSED"
    };
    Some(format!("Position {} {}", position_line(position), verb))
}

fn format_position_update(_tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Position(p) = event else {
        return None;
    };
    if !p.is_complete() {
        return None;
    }
    Some(format!(
        "Pair         : {}\n\
         Amount       : {}\n\
         Base Price   : {}\n\
         Funding Cost : {}\n\
         Profit/Loss  : {} {}%\n\
         Liquidation  : {}\n\
         Leverage     : {}",
        p.pair(),
        opt(p.amount),
        opt(p.base_price),
        opt(p.funding),
        opt(p.pl),
        opt(p.pl_perc),
        opt(p.liquidation),
        opt(p.leverage)
    ))
}

fn wallet_line(wallet: &Wallet) -> String {
    let mut line = format!(
        "Wallet {} {} balance {}",
        wallet.wallet_type, wallet.currency, wallet.balance
    );
    if let Some(available) = wallet.available {
        let _ = write!(line, " (available {})", available);
    }
    line
}

fn format_wallets(_tag: TypeTag, event: &Event) -> Option<String> {
    match event {
        Event::Wallet(wallet) => Some(wallet_line(wallet)),
        Event::Wallets(wallets) if wallets.is_empty() => Some("Wallets: none".to_string()),
        Event::Wallets(wallets) => Some(
            wallets
                .iter()
                .map(wallet_line)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

fn format_balance(_tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Balance(balance) = event else {
        return None;
    };
    Some(format!(
        "Total assets : {}\nNet assets   : {}",
        balance.total, balance.net
    ))
}

fn format_margin_info(_tag: TypeTag, event: &Event) -> Option<String> {
    let Event::MarginInfo(info) = event else {
        return None;
    };
    Some(match info {
        MarginInfo::Base {
            pl,
            swaps,
            balance,
            net,
            required,
        } => format!(
            "Margin P/L      : {}\n\
             Swaps           : {}\n\
             Margin Balance  : {}\n\
             Net Value       : {}\n\
             Margin Required : {}",
            pl, swaps, balance, net, required
        ),
        MarginInfo::Symbol {
            symbol,
            tradable,
            gross,
            buy,
            sell,
        } => format!(
            "Margin {}\n\
             Tradable : {}\n\
             Gross    : {}\n\
             Buy      : {}\n\
             Sell     : {}",
            strip_symbol_marker(symbol),
            tradable,
            gross,
            opt(*buy),
            opt(*sell)
        ),
    })
}

fn format_funding_info(_tag: TypeTag, event: &Event) -> Option<String> {
    let Event::FundingInfo(FundingInfo {
        symbol,
        yield_loan,
        yield_lend,
        duration_loan,
        duration_lend,
    }) = event
    else {
        return None;
    };
    Some(format!(
        "Funding {}\n\
         Yield Loan    : {}\n\
         Yield Lend    : {}\n\
         Duration Loan : {}\n\
         Duration Lend : {}",
        strip_symbol_marker(symbol),
        percent(*yield_loan),
        percent(*yield_lend),
        duration_loan,
        duration_lend
    ))
}

fn format_trade(tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Trade(trade) = event else {
        return None;
    };
    let Trade {
        order_id,
        exec_amount,
        exec_price,
        order_type,
        mts,
        ..
    } = trade;
    let mut out = format!(
        "Trade {} {} {} @ {} (order {}) at {}",
        trade.pair(),
        order_type,
        signed(*exec_amount),
        exec_price,
        order_id,
        timestamp(*mts)
    );
    if tag == TypeTag::TradeUpdate {
        if let Some(fee) = trade.fee {
            let _ = write!(
                out,
                "\nFee {} {}",
                fee,
                trade.fee_currency.as_deref().unwrap_or_default()
            );
        }
    }
    Some(out)
}

fn funding_trade_line(trade: &FundingTrade) -> String {
    format!(
        "Funding trade {} {} @ {} for {} days (offer {}) at {}",
        strip_symbol_marker(&trade.symbol),
        signed(trade.amount),
        percent(trade.rate),
        trade.period,
        trade.offer_id,
        timestamp(trade.mts)
    )
}

fn format_funding_trades(_tag: TypeTag, event: &Event) -> Option<String> {
    match event {
        Event::FundingTrade(trade) => Some(funding_trade_line(trade)),
        Event::FundingTrades(trades) if trades.is_empty() => {
            Some("Funding trades: none".to_string())
        }
        Event::FundingTrades(trades) => Some(
            trades
                .iter()
                .map(funding_trade_line)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

fn offer_line(offer: &FundingOffer) -> String {
    format!(
        "Offer {} {} {} {} @ {} for {} days",
        offer.id,
        strip_symbol_marker(&offer.symbol),
        offer.offer_type,
        signed(offer.amount),
        percent(offer.rate),
        offer.period
    )
}

fn format_offers(tag: TypeTag, event: &Event) -> Option<String> {
    match event {
        Event::Offer(offer) => Some(match tag {
            TypeTag::FundingOfferNew => format!("{} PLACED", offer_line(offer)),
            TypeTag::FundingOfferUpdate => format!("{} UPDATED", offer_line(offer)),
            _ => format!("{} was {}", offer_line(offer), offer.status),
        }),
        Event::Offers(offers) => {
            let title = if tag == TypeTag::HistoricalFundingOffers {
                "Funding offer history"
            } else {
                "Funding offers"
            };
            if offers.is_empty() {
                return Some(format!("{}: none", title));
            }
            let mut out = format!("{}:", title);
            for offer in offers {
                let _ = write!(out, "\n{} {}", offer_line(offer), offer.status);
            }
            Some(out)
        }
        _ => None,
    }
}

fn loan_line(kind: &str, loan: &FundingLoan) -> String {
    format!(
        "{} {} {} {} {} @ {} for {} days {}",
        kind,
        loan.id,
        strip_symbol_marker(&loan.symbol),
        loan.side_label(),
        signed(loan.amount),
        percent(loan.rate),
        loan.period,
        loan.status
    )
}

fn format_loans(tag: TypeTag, event: &Event) -> Option<String> {
    let kind = match tag {
        TypeTag::FundingCreditSnapshot
        | TypeTag::FundingCreditNew
        | TypeTag::FundingCreditUpdate
        | TypeTag::FundingCreditClose
        | TypeTag::HistoricalFundingCredits => "Credit",
        _ => "Loan",
    };
    match event {
        Event::Loan(loan) => Some(loan_line(kind, loan)),
        Event::Loans(loans) if loans.is_empty() => Some(format!("{}s: none", kind)),
        Event::Loans(loans) => Some(
            loans
                .iter()
                .map(|loan| loan_line(kind, loan))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    }
}

/// Generic rendering for notifications without a dedicated formatter.
pub fn notification_text(notification: &Notification) -> String {
    let mut out = format!("{} {}", notification.status, notification.kind);
    if let Some(code) = notification.code {
        let _ = write!(out, " ({})", code);
    }
    if !notification.text.is_empty() {
        let _ = write!(out, "\n{}", notification.text);
    }
    out
}

fn format_notification(_tag: TypeTag, event: &Event) -> Option<String> {
    let Event::Notification(notification) = event else {
        return None;
    };
    Some(notification_text(notification))
}

fn format_user_alert(_tag: TypeTag, event: &Event) -> Option<String> {
    let Event::UserAlert(alert) = event else {
        return None;
    };
    Some(format!(
        "Price alert {} went {} {}\nalerts left: {}",
        alert.pair(),
        alert.direction(),
        alert.price,
        alert.count
    ))
}
