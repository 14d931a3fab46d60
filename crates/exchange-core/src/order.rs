//! Order representation used inside the book.
//!
//! An order is write-once except for its remaining size: identity, owner,
//! side, kind and arrival time are fixed at construction, and `remaining`
//! is only ever decremented through [`Order::fill`]. Keeping the mutable
//! part private makes that invariant checkable at the crate boundary.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::side::Side;

/// Unique, monotonically increasing order identifier.
pub type OrderId = u64;

/// Plain tag for the three order kinds, carried on executed trades.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
    Stop,
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Limit => f.write_str("limit"),
            OrderType::Market => f.write_str("market"),
            OrderType::Stop => f.write_str("stop"),
        }
    }
}

/// Kind of an order, carrying only the fields that variant needs.
///
/// A limit order knows the worst price it will accept; a market order has
/// no price and demands immediate execution; a stop order rests in the
/// stop book until a trade crosses its trigger, then becomes a market
/// order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "orderType", rename_all = "lowercase")]
pub enum OrderKind {
    Limit { price: u64 },
    Market,
    Stop {
        #[serde(rename = "stopPrice")]
        stop_price: u64,
    },
}

impl OrderKind {
    pub fn order_type(self) -> OrderType {
        match self {
            OrderKind::Limit { .. } => OrderType::Limit,
            OrderKind::Market => OrderType::Market,
            OrderKind::Stop { .. } => OrderType::Stop,
        }
    }
}

/// A single order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Engine-assigned identifier, unique for the process lifetime.
    #[serde(rename = "orderId")]
    pub id: OrderId,

    /// Username of the submitter.
    pub owner: String,

    pub side: Side,

    #[serde(flatten)]
    pub kind: OrderKind,

    /// Arrival time in milliseconds since the Unix epoch; only used to
    /// break ties within a price level.
    pub created_at: u64,

    /// Unfilled quantity. The one mutable field; see [`Order::fill`].
    remaining: u64,
}

impl Order {
    /// Construct a limit order arriving now.
    pub fn limit(id: OrderId, owner: impl Into<String>, side: Side, size: u64, price: u64) -> Self {
        Order::new(id, owner, side, OrderKind::Limit { price }, size)
    }

    /// Construct a market order arriving now.
    pub fn market(id: OrderId, owner: impl Into<String>, side: Side, size: u64) -> Self {
        Order::new(id, owner, side, OrderKind::Market, size)
    }

    /// Construct a stop order arriving now.
    pub fn stop(id: OrderId, owner: impl Into<String>, side: Side, size: u64, stop_price: u64) -> Self {
        Order::new(id, owner, side, OrderKind::Stop { stop_price }, size)
    }

    fn new(id: OrderId, owner: impl Into<String>, side: Side, kind: OrderKind, size: u64) -> Self {
        Order {
            id,
            owner: owner.into(),
            side,
            kind,
            created_at: current_timestamp_ms(),
            remaining: size,
        }
    }

    /// Unfilled quantity.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Returns `true` once the order is fully filled.
    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    /// Fill up to `qty` units; returns the quantity actually filled
    /// (`min(qty, remaining)`).
    pub fn fill(&mut self, qty: u64) -> u64 {
        let filled = qty.min(self.remaining);
        self.remaining -= filled;
        filled
    }

    /// Convert a triggered stop order into its synthetic market order.
    ///
    /// Identity, owner, side, unfilled size and arrival time are reused;
    /// only the kind changes, so the result can never rest in the book.
    pub fn into_triggered_market(self) -> Order {
        Order {
            kind: OrderKind::Market,
            ..self
        }
    }

    /// The limit price, if this is a limit order.
    pub fn limit_price(&self) -> Option<u64> {
        match self.kind {
            OrderKind::Limit { price } => Some(price),
            _ => None,
        }
    }

    /// The trigger price, if this is a stop order.
    pub fn stop_price(&self) -> Option<u64> {
        match self.kind {
            OrderKind::Stop { stop_price } => Some(stop_price),
            _ => None,
        }
    }
}

/// Current time in milliseconds since the Unix epoch.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
