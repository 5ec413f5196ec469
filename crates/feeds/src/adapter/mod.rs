//! Exchange wire format adapters.
//!
//! Adapters turn raw websocket text into frames and typed events, and
//! build the outbound handshake/request messages.

mod bitfinex;

pub use bitfinex::{BitfinexAdapter, DataFrame, Frame, SystemFrame};
