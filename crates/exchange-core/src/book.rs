//! Shared order book with price-time priority.
//!
//! - Limit bids: best = highest price; limit asks: best = lowest price.
//! - FIFO within each price level.
//! - Stop orders rest in a separate pair of maps keyed by trigger price:
//!   bid stops fire when a trade prints at or above their key, ask stops
//!   when it prints at or below.
//!
//! A price level is removed the moment it empties, and every resting
//! order is tracked in an id index pointing at its bucket, so removal is
//! an O(1) lookup plus a scan of one (typically short) level.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::order::{Order, OrderId, OrderKind};
use crate::persist::BookSnapshot;
use crate::side::Side;

/// Where in the book an order currently rests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrderLocation {
    side: Side,
    slot: Slot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Resting in the tradable limit book at this price level.
    Limit(u64),
    /// Resting in the stop book at this trigger level.
    Stop(u64),
}

/// One fill produced while consuming the book.
#[derive(Debug, Clone)]
pub(crate) struct Fill {
    /// Owner of the resting order that was hit.
    pub maker_owner: String,
    pub size: u64,
    /// The resting order's price (price-maker gets their price).
    pub price: u64,
}

/// The book: limit levels per side, stop levels per side, id index and
/// the order-id counter.
#[derive(Debug, Default)]
pub struct Book {
    limit_bids: BTreeMap<u64, VecDeque<Order>>,
    limit_asks: BTreeMap<u64, VecDeque<Order>>,
    stop_bids: BTreeMap<u64, VecDeque<Order>>,
    stop_asks: BTreeMap<u64, VecDeque<Order>>,

    /// Every resting order (limit or stop), keyed by id.
    index: HashMap<OrderId, OrderLocation>,

    last_order_id: OrderId,
}

impl Book {
    pub fn new() -> Self {
        Book::default()
    }

    /// Next unique order id. Strictly increasing, never reused.
    ///
    /// All calls are serialized through the engine task, so a plain
    /// counter is enough.
    pub fn next_order_id(&mut self) -> OrderId {
        self.last_order_id += 1;
        self.last_order_id
    }

    /// Bump the id counter past an id restored from persistence.
    pub(crate) fn note_restored_id(&mut self, id: OrderId) {
        self.last_order_id = self.last_order_id.max(id);
    }

    /// Rest a limit order at its price level, preserving time priority.
    ///
    /// Precondition (enforced by the engine): the order is a limit order
    /// with positive price and remaining size.
    pub(crate) fn insert_limit(&mut self, order: Order) {
        let price = match order.kind {
            OrderKind::Limit { price } => price,
            _ => return,
        };
        let side = order.side;
        self.index.insert(
            order.id,
            OrderLocation {
                side,
                slot: Slot::Limit(price),
            },
        );
        self.limit_levels_mut(side)
            .entry(price)
            .or_default()
            .push_back(order);
    }

    /// Rest a stop order at its trigger level.
    pub(crate) fn insert_stop(&mut self, order: Order) {
        let stop_price = match order.kind {
            OrderKind::Stop { stop_price } => stop_price,
            _ => return,
        };
        let side = order.side;
        self.index.insert(
            order.id,
            OrderLocation {
                side,
                slot: Slot::Stop(stop_price),
            },
        );
        self.stop_levels_mut(side)
            .entry(stop_price)
            .or_default()
            .push_back(order);
    }

    /// Detach an order from whichever structure holds it.
    ///
    /// Returns the order if it was resting, `None` otherwise. Used for
    /// cancellation and internally when an order fills or triggers.
    pub fn remove(&mut self, order_id: OrderId) -> Option<Order> {
        let loc = self.index.remove(&order_id)?;
        let (levels, price) = match loc.slot {
            Slot::Limit(price) => (self.limit_levels_mut(loc.side), price),
            Slot::Stop(price) => (self.stop_levels_mut(loc.side), price),
        };

        let bucket = levels.get_mut(&price)?;
        let pos = bucket.iter().position(|o| o.id == order_id)?;
        let order = bucket.remove(pos);
        if bucket.is_empty() {
            levels.remove(&price);
        }
        order
    }

    /// Whether an order with this id is currently resting anywhere.
    pub fn contains(&self, order_id: OrderId) -> bool {
        self.index.contains_key(&order_id)
    }

    /// Best tradable price on a side (highest bid / lowest ask).
    pub fn best_limit_price(&self, side: Side) -> Option<u64> {
        let levels = self.limit_levels(side);
        match side {
            Side::Bid => levels.keys().next_back().copied(),
            Side::Ask => levels.keys().next().copied(),
        }
    }

    /// Consume resting limit orders on the side opposite `incoming`,
    /// walking price levels in favorable order.
    ///
    /// `limit_price` is the incoming order's limit, or `None` for a
    /// market order (no crossing check). Levels are visited best-first,
    /// and the walk stops at the first level that fails the crossing
    /// condition: level order is monotonic, so no later level can cross.
    pub(crate) fn fill_against(&mut self, incoming: &mut Order, limit_price: Option<u64>) -> Vec<Fill> {
        let maker_side = incoming.side.opposite();
        let mut fills = Vec::new();

        while incoming.remaining() > 0 {
            let level_price = match self.best_limit_price(maker_side) {
                Some(p) => p,
                None => break,
            };

            let crosses = match (limit_price, incoming.side) {
                (None, _) => true,
                (Some(limit), Side::Bid) => limit >= level_price,
                (Some(limit), Side::Ask) => limit <= level_price,
            };
            if !crosses {
                break;
            }

            let mut filled_ids = Vec::new();
            {
                let levels = self.limit_levels_mut(maker_side);
                let bucket = match levels.get_mut(&level_price) {
                    Some(b) => b,
                    None => break,
                };

                // Head-first within the level (time priority).
                while incoming.remaining() > 0 {
                    let maker = match bucket.front_mut() {
                        Some(m) => m,
                        None => break,
                    };
                    let size = incoming.remaining().min(maker.remaining());
                    incoming.fill(size);
                    maker.fill(size);
                    fills.push(Fill {
                        maker_owner: maker.owner.clone(),
                        size,
                        price: level_price,
                    });
                    if maker.is_filled() {
                        if let Some(filled) = bucket.pop_front() {
                            filled_ids.push(filled.id);
                        }
                    }
                }

                let emptied = bucket.is_empty();
                if emptied {
                    levels.remove(&level_price);
                }
            }

            for id in &filled_ids {
                self.index.remove(id);
            }
        }

        fills
    }

    /// Drain every stop order whose trigger is crossed by `last_price`.
    ///
    /// Bid stops are examined from the lowest key upward while
    /// `last_price >= key`; ask stops from the highest key downward while
    /// `last_price <= key`. Ascending (resp. descending) keys guarantee
    /// the scan can stop at the first level that does not trigger.
    /// Returned orders keep their stop kind; the engine converts them.
    pub(crate) fn take_triggered_stops(&mut self, last_price: u64) -> Vec<Order> {
        let mut triggered = Vec::new();

        let bid_keys: Vec<u64> = self
            .stop_bids
            .keys()
            .take_while(|&&key| last_price >= key)
            .copied()
            .collect();
        for key in bid_keys {
            if let Some(bucket) = self.stop_bids.remove(&key) {
                triggered.extend(bucket);
            }
        }

        let ask_keys: Vec<u64> = self
            .stop_asks
            .keys()
            .rev()
            .take_while(|&&key| last_price <= key)
            .copied()
            .collect();
        for key in ask_keys {
            if let Some(bucket) = self.stop_asks.remove(&key) {
                triggered.extend(bucket);
            }
        }

        for order in &triggered {
            self.index.remove(&order.id);
        }
        triggered
    }

    /// Flat snapshot of all resting orders, for the persistence gateway.
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            limit_bids: flatten(&self.limit_bids),
            limit_asks: flatten(&self.limit_asks),
            stop_bids: flatten(&self.stop_bids),
            stop_asks: flatten(&self.stop_asks),
        }
    }

    /// Resting limit levels for one side (read-only view).
    pub fn limit_levels(&self, side: Side) -> &BTreeMap<u64, VecDeque<Order>> {
        match side {
            Side::Bid => &self.limit_bids,
            Side::Ask => &self.limit_asks,
        }
    }

    /// Resting stop levels for one side (read-only view).
    pub fn stop_levels(&self, side: Side) -> &BTreeMap<u64, VecDeque<Order>> {
        match side {
            Side::Bid => &self.stop_bids,
            Side::Ask => &self.stop_asks,
        }
    }

    fn limit_levels_mut(&mut self, side: Side) -> &mut BTreeMap<u64, VecDeque<Order>> {
        match side {
            Side::Bid => &mut self.limit_bids,
            Side::Ask => &mut self.limit_asks,
        }
    }

    fn stop_levels_mut(&mut self, side: Side) -> &mut BTreeMap<u64, VecDeque<Order>> {
        match side {
            Side::Bid => &mut self.stop_bids,
            Side::Ask => &mut self.stop_asks,
        }
    }
}

/// Levels map -> flat order list, best-to-worst irrelevant here: FIFO
/// within a level is all that must survive a save/load round trip.
fn flatten(levels: &BTreeMap<u64, VecDeque<Order>>) -> Vec<Order> {
    levels.values().flatten().cloned().collect()
}
