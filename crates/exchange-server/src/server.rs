//! TCP listener and top-level server wiring.
//!
//! This module:
//! - opens the storage and restores the book from the last snapshot,
//! - spawns the single central engine task that owns `MatchingEngine`,
//! - accepts TCP connections and spawns a per-client task for each.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use exchange_core::MatchingEngine;
use exchange_storage::{JsonOrderStore, JsonUserStore};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use crate::client;
use crate::config::Config;
use crate::engine_task;
use crate::notifier::Notifier;
use crate::types::{ClientId, ClientRegistry, EngineRx, EngineTx, OutboundRx, OutboundTx};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

fn next_client_id() -> ClientId {
    ClientId(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
}

/// Run the exchange server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    // Storage: restore resting orders before accepting any traffic.
    let order_store = JsonOrderStore::open(&config.data_dir)?;
    let resting = order_store.load_resting()?;
    if !resting.is_empty() {
        info!(
            limit_bids = resting.limit_bids.len(),
            limit_asks = resting.limit_asks.len(),
            stop_bids = resting.stop_bids.len(),
            stop_asks = resting.stop_asks.len(),
            "restoring resting orders from snapshot"
        );
    }
    let mut engine = MatchingEngine::with_gateway(Box::new(order_store));
    engine.restore(resting);

    let users = Arc::new(Mutex::new(JsonUserStore::open(&config.data_dir)?));
    let notifier = Arc::new(Notifier::bind().await?);

    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    // Shared registry of clients -> outbound channels.
    let clients: ClientRegistry = Arc::new(tokio::sync::RwLock::new(Default::default()));

    // Channel from clients -> engine task.
    let (engine_tx, engine_rx): (EngineTx, EngineRx) = mpsc::unbounded_channel();

    // Spawn the central engine task.
    {
        let clients = clients.clone();
        let notifier = notifier.clone();
        tokio::spawn(async move {
            engine_task::run_engine_loop(engine, engine_rx, clients, notifier).await;
        });
    }

    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let connected = {
            let guard = clients.read().await;
            guard.len()
        };

        if connected >= config.max_clients {
            warn!(%peer_addr, max_clients = config.max_clients, "rejecting connection: limit reached");
            // Drop the stream; client sees the connection closed.
            continue;
        }

        let client_id = next_client_id();
        info!(client = client_id.0, %peer_addr, "accepted connection");

        let (out_tx, out_rx): (OutboundTx, OutboundRx) = mpsc::unbounded_channel();
        {
            let mut guard = clients.write().await;
            guard.insert(client_id, out_tx);
        }

        let clients = clients.clone();
        let engine_tx = engine_tx.clone();
        let users = users.clone();
        let notifier = notifier.clone();

        tokio::spawn(async move {
            match client::run_client(client_id, stream, engine_tx, out_rx, clients, users, notifier)
                .await
            {
                Ok(()) => info!(client = client_id.0, "disconnected"),
                Err(e) => warn!(client = client_id.0, error = %e, "client task failed"),
            }
        });
    }
}
