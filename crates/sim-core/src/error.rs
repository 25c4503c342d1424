//! Error types for book operations.

use std::fmt;
use types::{OrderId, Price};

/// Result type for book operations.
pub type Result<T> = std::result::Result<T, BookError>;

/// Errors that can occur while mutating the order book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    /// The requested order is not resting in the book.
    OrderNotFound(OrderId),
    /// An order with this id is already resting.
    DuplicateOrder(OrderId),
    /// Invalid order: zero quantity or remaining != original on insert.
    BadQuantity,
    /// Invalid order: price non-positive or off the tick grid.
    BadPrice(Price),
}

impl fmt::Display for BookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookError::OrderNotFound(id) => write!(f, "order not found: {id}"),
            BookError::DuplicateOrder(id) => write!(f, "duplicate order id: {id}"),
            BookError::BadQuantity => write!(f, "order quantity must be positive and untouched"),
            BookError::BadPrice(p) => write!(f, "price {p} is not a positive tick multiple"),
        }
    }
}

impl std::error::Error for BookError {}
