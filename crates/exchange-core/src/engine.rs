//! Matching engine: id generation, limit/market matching, stop
//! triggering, cancellation, startup restore.
//!
//! One instance owns the [`Book`] and the persistence gateway. All
//! mutating calls are expected to be funneled through a single owner (a
//! lock or an actor task), which makes each public operation atomic as
//! observed from outside; the engine itself contains no synchronization.

use crate::book::{Book, Fill};
use crate::error::EngineError;
use crate::order::{current_timestamp_ms, Order, OrderId, OrderKind, OrderType};
use crate::persist::{BookSnapshot, NullGateway, PersistenceGateway};
use crate::side::Side;
use crate::trade::ExecutedTrade;

pub struct MatchingEngine {
    book: Book,
    gateway: Box<dyn PersistenceGateway + Send>,
}

impl MatchingEngine {
    /// Engine with no durable storage (tests, embedding).
    pub fn new() -> Self {
        MatchingEngine::with_gateway(Box::new(NullGateway))
    }

    /// Engine backed by a persistence gateway.
    pub fn with_gateway(gateway: Box<dyn PersistenceGateway + Send>) -> Self {
        MatchingEngine {
            book: Book::new(),
            gateway,
        }
    }

    /// Draw the next order id for a caller-constructed order.
    pub fn next_order_id(&mut self) -> OrderId {
        self.book.next_order_id()
    }

    /// Read-only access to the book, for views and tests.
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Re-insert previously resting orders before serving traffic.
    ///
    /// Preserves original ids and arrival times so time priority
    /// survives a restart, and moves the id counter past the highest
    /// restored id. Single-threaded startup only.
    pub fn restore(&mut self, snapshot: BookSnapshot) {
        let BookSnapshot {
            limit_bids,
            limit_asks,
            stop_bids,
            stop_asks,
        } = snapshot;

        for order in limit_bids.into_iter().chain(limit_asks) {
            if order.is_filled() {
                continue;
            }
            self.book.note_restored_id(order.id);
            self.book.insert_limit(order);
        }
        for order in stop_bids.into_iter().chain(stop_asks) {
            if order.is_filled() {
                continue;
            }
            self.book.note_restored_id(order.id);
            self.book.insert_stop(order);
        }
    }

    /// Match an incoming limit order; any residual rests in the book.
    ///
    /// Returned trades are in execution order, with trades from the stop
    /// cascade appended after the trades that caused the trigger.
    pub fn match_limit(&mut self, order: Order) -> Result<Vec<ExecutedTrade>, EngineError> {
        let price = match order.kind {
            OrderKind::Limit { price } => price,
            _ => return Err(EngineError::InvalidOrder("expected a limit order".into())),
        };
        if price == 0 {
            return Err(EngineError::InvalidOrder("limit price must be positive".into()));
        }
        self.validate_common(&order)?;

        let mut incoming = order;
        let mut trades = self.match_pass(&mut incoming, Some(price), OrderType::Limit);
        if !incoming.is_filled() {
            self.book.insert_limit(incoming);
        }
        self.run_stop_cascade(&mut trades);
        self.persist(&trades);
        Ok(trades)
    }

    /// Match an incoming market order against available liquidity only.
    ///
    /// Any unfilled remainder is discarded; market orders never rest.
    pub fn match_market(&mut self, order: Order) -> Result<Vec<ExecutedTrade>, EngineError> {
        if order.kind != OrderKind::Market {
            return Err(EngineError::InvalidOrder("expected a market order".into()));
        }
        self.validate_common(&order)?;

        let mut incoming = order;
        let mut trades = self.match_pass(&mut incoming, None, OrderType::Market);
        self.run_stop_cascade(&mut trades);
        self.persist(&trades);
        Ok(trades)
    }

    /// Rest a stop order until a trade crosses its trigger price.
    pub fn insert_stop(&mut self, order: Order) -> Result<(), EngineError> {
        let stop_price = match order.kind {
            OrderKind::Stop { stop_price } => stop_price,
            _ => return Err(EngineError::InvalidOrder("expected a stop order".into())),
        };
        if stop_price == 0 {
            return Err(EngineError::InvalidOrder("stop price must be positive".into()));
        }
        self.validate_common(&order)?;

        self.book.insert_stop(order);
        self.gateway.snapshot_resting(&self.book.snapshot());
        Ok(())
    }

    /// Cancel a resting order by id. Returns whether it was found.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let found = self.book.remove(order_id).is_some();
        if found {
            self.gateway.snapshot_resting(&self.book.snapshot());
        }
        found
    }

    fn validate_common(&self, order: &Order) -> Result<(), EngineError> {
        if order.remaining() == 0 {
            return Err(EngineError::InvalidOrder("size must be positive".into()));
        }
        if self.book.contains(order.id) {
            return Err(EngineError::InvalidOrder("duplicate order id".into()));
        }
        Ok(())
    }

    /// One walk of the opposite book; converts raw fills into trades.
    fn match_pass(
        &mut self,
        incoming: &mut Order,
        limit_price: Option<u64>,
        order_type: OrderType,
    ) -> Vec<ExecutedTrade> {
        let aggressor_side = incoming.side;
        let aggressor_owner = incoming.owner.clone();
        let fills = self.book.fill_against(incoming, limit_price);
        fills
            .into_iter()
            .map(|fill| trade_from_fill(fill, &aggressor_owner, aggressor_side, order_type))
            .collect()
    }

    /// Work-list stop cascade.
    ///
    /// Each pass drains every stop whose trigger the last traded price
    /// crosses, matches the resulting synthetic market orders, and
    /// re-checks with the new last price. Terminates because the stop
    /// book only shrinks.
    fn run_stop_cascade(&mut self, trades: &mut Vec<ExecutedTrade>) {
        let mut last_price = match trades.last() {
            Some(t) => t.price,
            None => return,
        };

        loop {
            let triggered = self.book.take_triggered_stops(last_price);
            if triggered.is_empty() {
                break;
            }
            for stop in triggered {
                let mut synthetic = stop.into_triggered_market();
                let new_trades = self.match_pass(&mut synthetic, None, OrderType::Stop);
                if let Some(t) = new_trades.last() {
                    last_price = t.price;
                }
                trades.extend(new_trades);
                // Unfilled remainder is discarded, market-order semantics.
            }
        }
    }

    /// Record trades and the new resting state through the gateway.
    fn persist(&mut self, trades: &[ExecutedTrade]) {
        for trade in trades {
            self.gateway.append_trade(trade);
        }
        self.gateway.snapshot_resting(&self.book.snapshot());
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        MatchingEngine::new()
    }
}

impl std::fmt::Debug for MatchingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchingEngine")
            .field("book", &self.book)
            .finish_non_exhaustive()
    }
}

fn trade_from_fill(
    fill: Fill,
    aggressor_owner: &str,
    aggressor_side: Side,
    order_type: OrderType,
) -> ExecutedTrade {
    let (buyer, seller) = match aggressor_side {
        Side::Bid => (aggressor_owner.to_string(), fill.maker_owner),
        Side::Ask => (fill.maker_owner, aggressor_owner.to_string()),
    };
    ExecutedTrade {
        buyer,
        seller,
        order_type,
        aggressor_side,
        size: fill.size,
        price: fill.price,
        timestamp: current_timestamp_ms(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_size_and_zero_price() {
        let mut engine = MatchingEngine::new();
        let id = engine.next_order_id();
        let err = engine.match_limit(Order::limit(id, "a", Side::Bid, 0, 10));
        assert!(matches!(err, Err(EngineError::InvalidOrder(_))));
        let err = engine.match_limit(Order::limit(id, "a", Side::Bid, 10, 0));
        assert!(matches!(err, Err(EngineError::InvalidOrder(_))));
        // Nothing rested.
        assert!(engine.book().limit_levels(Side::Bid).is_empty());
    }

    #[test]
    fn rejects_kind_mismatch() {
        let mut engine = MatchingEngine::new();
        let id = engine.next_order_id();
        let err = engine.match_market(Order::limit(id, "a", Side::Bid, 10, 50));
        assert!(matches!(err, Err(EngineError::InvalidOrder(_))));
        let err = engine.insert_stop(Order::market(id, "a", Side::Bid, 10));
        assert!(matches!(err, Err(EngineError::InvalidOrder(_))));
    }

    #[test]
    fn order_ids_strictly_increase() {
        let mut engine = MatchingEngine::new();
        let a = engine.next_order_id();
        let b = engine.next_order_id();
        assert!(b > a);
    }

    #[test]
    fn restore_moves_id_counter_past_loaded_orders() {
        let mut engine = MatchingEngine::new();
        engine.restore(BookSnapshot {
            limit_bids: vec![Order::limit(41, "a", Side::Bid, 5, 100)],
            stop_asks: vec![Order::stop(57, "b", Side::Ask, 5, 90)],
            ..Default::default()
        });
        assert!(engine.book().contains(41));
        assert!(engine.book().contains(57));
        assert_eq!(engine.next_order_id(), 58);
    }
}
