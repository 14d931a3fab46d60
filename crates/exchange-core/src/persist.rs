//! Persistence seam between the engine and durable storage.
//!
//! The engine calls out through [`PersistenceGateway`] after every
//! mutating operation; it never reads the store back except at startup
//! (see [`MatchingEngine::restore`](crate::engine::MatchingEngine::restore)).
//! The gateway owns its failure handling: it is expected to log write
//! errors itself, and the engine's in-memory state is never rolled back
//! on a persistence failure.

use serde::{Deserialize, Serialize};

use crate::order::Order;
use crate::trade::ExecutedTrade;

/// Flat snapshot of every resting order, split by book and side.
///
/// This is the shape the store persists after each mutation and feeds
/// back at startup. Orders appear in per-level FIFO order, which is the
/// only ordering that has to survive a round trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub limit_bids: Vec<Order>,
    pub limit_asks: Vec<Order>,
    pub stop_bids: Vec<Order>,
    pub stop_asks: Vec<Order>,
}

impl BookSnapshot {
    pub fn is_empty(&self) -> bool {
        self.limit_bids.is_empty()
            && self.limit_asks.is_empty()
            && self.stop_bids.is_empty()
            && self.stop_asks.is_empty()
    }
}

/// Durable storage for trades and resting orders.
pub trait PersistenceGateway {
    /// Record one executed trade in the trade ledger.
    fn append_trade(&mut self, trade: &ExecutedTrade);

    /// Replace the persisted resting-order snapshot.
    fn snapshot_resting(&mut self, snapshot: &BookSnapshot);
}

/// Gateway that drops everything. Used in tests and by
/// [`MatchingEngine::new`](crate::engine::MatchingEngine::new).
#[derive(Debug, Default)]
pub struct NullGateway;

impl PersistenceGateway for NullGateway {
    fn append_trade(&mut self, _trade: &ExecutedTrade) {}

    fn snapshot_resting(&mut self, _snapshot: &BookSnapshot) {}
}
