//! Shared types for the exchange TCP server.
//!
//! - `ClientId`: a lightweight handle for connected clients
//! - channel aliases between clients and the engine loop
//! - `EngineRequest` / `OrderCommand`: order traffic flowing from an
//!   authenticated client into the engine task

use std::collections::HashMap;
use std::sync::Arc;

use exchange_core::{OrderId, Side};
use exchange_protocol::Response;
use tokio::sync::{mpsc, RwLock};

/// Identifier for a connected client.
///
/// Opaque; unique over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Outbound responses from the server to a given client.
pub type OutboundTx = mpsc::UnboundedSender<Response>;
pub type OutboundRx = mpsc::UnboundedReceiver<Response>;

/// Registry of connected clients and their outbound channels.
pub type ClientRegistry = Arc<RwLock<HashMap<ClientId, OutboundTx>>>;

/// An order operation, already authenticated and validated at the
/// protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCommand {
    Limit { side: Side, size: u64, price: u64 },
    Market { side: Side, size: u64 },
    Stop { side: Side, size: u64, stop_price: u64 },
    Cancel { order_id: OrderId },
}

/// Message flowing from a client task into the central engine task.
#[derive(Debug)]
pub struct EngineRequest {
    pub client_id: ClientId,
    /// Logged-in username of the submitter; orders are owned and trades
    /// are notified by username, not by connection.
    pub username: String,
    pub cmd: OrderCommand,
}

/// Channel from clients to the engine task.
pub type EngineTx = mpsc::UnboundedSender<EngineRequest>;
pub type EngineRx = mpsc::UnboundedReceiver<EngineRequest>;
