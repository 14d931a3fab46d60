//! Executed trade record.

use serde::{Deserialize, Serialize};

use crate::order::OrderType;
use crate::side::Side;

/// Immutable record of one match between an aggressing and a resting order.
///
/// The price is always the resting (maker) order's price. `order_type` and
/// `aggressor_side` describe the aggressing order; trades produced by a
/// triggered stop order carry [`OrderType::Stop`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutedTrade {
    /// Username on the buy side of the fill.
    pub buyer: String,

    /// Username on the sell side of the fill.
    pub seller: String,

    pub order_type: OrderType,

    /// Side of the order that initiated the trade. Serialized as
    /// `"side"`, the name the notification payload uses.
    #[serde(rename = "side")]
    pub aggressor_side: Side,

    pub size: u64,
    pub price: u64,

    /// Execution time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}
