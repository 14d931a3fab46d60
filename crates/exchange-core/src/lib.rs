//! exchange-core
//!
//! Pure matching engine logic:
//! - order and trade representations
//! - the shared order book (limit and stop sides)
//! - the matching engine with stop-trigger cascade
//! - the persistence-gateway seam

pub mod book;
pub mod engine;
pub mod error;
pub mod order;
pub mod persist;
pub mod side;
pub mod trade;

pub use book::Book;
pub use engine::MatchingEngine;
pub use error::EngineError;
pub use order::{Order, OrderId, OrderKind, OrderType};
pub use persist::{BookSnapshot, NullGateway, PersistenceGateway};
pub use side::Side;
pub use trade::ExecutedTrade;
