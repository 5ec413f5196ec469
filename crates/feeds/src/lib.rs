//! Bitfinex authenticated account feed.
//!
//! This crate keeps one authenticated WebSocket session to the exchange
//! alive and turns its frames into chat-ready text.
//!
//! ## Architecture
//!
//! - `adapter/` - Bitfinex wire format: frames, typed events, auth and calc messages
//! - `connection` - Lifecycle actor owning the transport and the heartbeat timer
//! - `dispatcher` - Frame classification and per-tag routing
//! - `format` - Per-tag text formatters
//! - `runner/` - Feeds transport frames to the dispatcher in arrival order
//! - `websocket` - tokio-tungstenite transport

pub mod adapter;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod format;
pub mod runner;
pub mod websocket;

pub use adapter::{BitfinexAdapter, DataFrame, Frame, SystemFrame};
pub use config::*;
pub use connection::*;
pub use dispatcher::*;
pub use error::*;
pub use runner::*;
pub use websocket::*;
