//! Logical wire messages.
//!
//! Requests arrive as `{"operation": "...", "values": {...}}`; responses
//! are either a status (`{"response": code, "errorMessage": "..."}`) or
//! an order-id reply (`{"orderId": n}`). Trade notifications go out as
//! `{"notification": "closedTrade", "data": {...}}` datagrams.

use exchange_core::{ExecutedTrade, Side};
use serde::{Deserialize, Serialize};

/// A client request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "values", rename_all = "camelCase")]
pub enum Request {
    Register {
        username: String,
        password: String,
    },
    Login {
        username: String,
        password: String,
    },
    #[serde(rename_all = "camelCase")]
    UpdateCredentials {
        username: String,
        old_password: String,
        new_password: String,
    },
    Logout {},
    /// Registers the UDP port this client listens on for notifications.
    UdpConnection {
        port: u16,
    },
    Help {
        #[serde(default)]
        command: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    InsertLimitOrder {
        /// Order side; the wire calls this field `type`.
        #[serde(rename = "type")]
        side: Side,
        size: u64,
        price: u64,
    },
    #[serde(rename_all = "camelCase")]
    InsertMarketOrder {
        #[serde(rename = "type")]
        side: Side,
        size: u64,
    },
    #[serde(rename_all = "camelCase")]
    InsertStopOrder {
        #[serde(rename = "type")]
        side: Side,
        size: u64,
        stop_price: u64,
    },
    #[serde(rename_all = "camelCase")]
    CancelOrder {
        order_id: u64,
    },
}

/// A server reply. Order insertions answer with an order id (`-1` on
/// rejection); everything else answers with a numeric status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    OrderId {
        #[serde(rename = "orderId")]
        order_id: i64,
    },
    Status {
        response: u16,
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

/// Status codes, as the original service numbered them.
pub mod codes {
    pub const OK: u16 = 100;
    pub const FAILURE: u16 = 101;
    pub const UNAVAILABLE: u16 = 102;
    pub const MALFORMED: u16 = 103;
    pub const MISSING_CREDENTIALS: u16 = 105;
}

impl Response {
    pub fn ok(message: impl Into<String>) -> Self {
        Response::status(codes::OK, message)
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Response::Status {
            response: code,
            error_message: message.into(),
        }
    }

    pub fn order_id(order_id: i64) -> Self {
        Response::OrderId { order_id }
    }

    /// The rejection sentinel: negative id, no trades.
    pub fn rejected_order() -> Self {
        Response::OrderId { order_id: -1 }
    }
}

/// UDP datagram sent to both counterparties of a closed trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeNotification {
    pub notification: String,
    pub data: ExecutedTrade,
}

impl TradeNotification {
    pub fn closed_trade(trade: ExecutedTrade) -> Self {
        TradeNotification {
            notification: "closedTrade".to_string(),
            data: trade,
        }
    }
}
