//! Central engine loop.
//!
//! This task owns the `MatchingEngine` and processes all
//! `EngineRequest`s coming from client tasks, one at a time: the actor
//! form of the "whole operation is atomic" rule, so the book never
//! shows a partially matched state.
//!
//! Routing:
//! - order-id / cancel responses go only to the originating client;
//! - closed-trade notifications go to both counterparties via the UDP
//!   notifier, in execution order.

use std::sync::Arc;

use exchange_core::{ExecutedTrade, MatchingEngine, Order};
use exchange_protocol::{wire_types::codes, Response};
use tracing::{info, warn};

use crate::notifier::Notifier;
use crate::types::{ClientId, ClientRegistry, EngineRx, OrderCommand};

/// Run the central engine processing loop.
pub async fn run_engine_loop(
    mut engine: MatchingEngine,
    mut engine_rx: EngineRx,
    clients: ClientRegistry,
    notifier: Arc<Notifier>,
) {
    while let Some(req) = engine_rx.recv().await {
        let (response, trades) = process_command(&mut engine, &req.username, req.cmd);

        for trade in &trades {
            notifier.notify_trade(trade).await;
        }

        respond(&clients, req.client_id, response).await;
    }

    info!("engine loop shutting down (request channel closed)");
}

/// Apply one command to the engine; returns the reply for the
/// originating client and the trades to fan out.
fn process_command(
    engine: &mut MatchingEngine,
    username: &str,
    cmd: OrderCommand,
) -> (Response, Vec<ExecutedTrade>) {
    match cmd {
        OrderCommand::Limit { side, size, price } => {
            let id = engine.next_order_id();
            match engine.match_limit(Order::limit(id, username, side, size, price)) {
                Ok(trades) => (Response::order_id(id as i64), trades),
                Err(e) => {
                    warn!(user = username, error = %e, "limit order rejected");
                    (Response::rejected_order(), Vec::new())
                }
            }
        }
        OrderCommand::Market { side, size } => {
            let id = engine.next_order_id();
            match engine.match_market(Order::market(id, username, side, size)) {
                Ok(trades) => (Response::order_id(id as i64), trades),
                Err(e) => {
                    warn!(user = username, error = %e, "market order rejected");
                    (Response::rejected_order(), Vec::new())
                }
            }
        }
        OrderCommand::Stop {
            side,
            size,
            stop_price,
        } => {
            let id = engine.next_order_id();
            match engine.insert_stop(Order::stop(id, username, side, size, stop_price)) {
                Ok(()) => (Response::order_id(id as i64), Vec::new()),
                Err(e) => {
                    warn!(user = username, error = %e, "stop order rejected");
                    (Response::rejected_order(), Vec::new())
                }
            }
        }
        OrderCommand::Cancel { order_id } => {
            if engine.cancel(order_id) {
                (Response::ok("OK"), Vec::new())
            } else {
                (
                    Response::status(codes::FAILURE, "order not found"),
                    Vec::new(),
                )
            }
        }
    }
}

async fn respond(clients: &ClientRegistry, client_id: ClientId, response: Response) {
    let guard = clients.read().await;
    if let Some(tx) = guard.get(&client_id) {
        let _ = tx.send(response);
    }
}
