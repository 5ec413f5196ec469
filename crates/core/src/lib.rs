//! Core data types for the Bitfinex account feed.

pub mod event;
pub mod html;
pub mod info;
pub mod tag;

pub use event::*;
pub use html::*;
pub use info::*;
pub use tag::*;
