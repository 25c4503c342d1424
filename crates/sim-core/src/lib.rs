//! Deterministic matching core: price-time-priority order book and
//! matching engine.
//!
//! The book keeps two `BTreeMap` price ladders with FIFO queues per level
//! plus two indices (`by_id`, `by_trader`) that stay mutually consistent
//! after every public operation. The engine repeatedly crosses the best
//! bid against the best ask, preventing self-trades and executing at the
//! maker's resting price.

mod error;
mod matching;
mod order_book;

pub use error::{BookError, Result};
pub use matching::MatchingEngine;
pub use order_book::{OrderBook, PriceLevel};
