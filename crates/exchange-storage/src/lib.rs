//! exchange-storage
//!
//! File-backed persistence for the exchange:
//! - [`JsonOrderStore`]: the engine's persistence gateway (trade ledger
//!   plus resting-order snapshots) and the startup loaders.
//! - [`JsonUserStore`]: user credentials.
//!
//! Everything is plain JSON on disk so the files stay inspectable.

pub mod error;
pub mod order_store;
pub mod user_store;

pub use error::StorageError;
pub use order_store::JsonOrderStore;
pub use user_store::JsonUserStore;
