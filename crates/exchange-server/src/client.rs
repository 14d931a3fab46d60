//! Per-connection I/O and session handling.
//!
//! Each connection gets a reader loop (this module) and a writer task
//! draining the client's outbound channel. Account operations are
//! resolved here against the shared user store; order operations
//! require a logged-in session and are forwarded to the engine task.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use exchange_protocol::{
    format_response, json_codec, wire_types::codes, Request, Response,
};
use exchange_storage::JsonUserStore;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::notifier::Notifier;
use crate::types::{ClientId, ClientRegistry, EngineRequest, EngineTx, OrderCommand, OutboundRx};

/// Run the I/O loop for a single connection until it closes.
pub async fn run_client(
    client_id: ClientId,
    stream: TcpStream,
    engine_tx: EngineTx,
    mut out_rx: OutboundRx,
    clients: ClientRegistry,
    users: Arc<Mutex<JsonUserStore>>,
    notifier: Arc<Notifier>,
) -> anyhow::Result<()> {
    let peer_addr = stream.peer_addr()?;
    let (read_half, write_half) = stream.into_split();

    // Writer task: drain responses onto the socket, one JSON per line.
    let writer = tokio::spawn(async move {
        let mut write_half = write_half;
        while let Some(response) = out_rx.recv().await {
            let mut line = format_response(&response);
            line.push('\n');
            if let Err(e) = write_half.write_all(line.as_bytes()).await {
                debug!(client = client_id.0, error = %e, "write failed");
                break;
            }
        }
    });

    let mut session = Session {
        client_id,
        peer_addr,
        username: None,
    };

    let mut lines = BufReader::new(read_half).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = match json_codec::parse_request_line(&line) {
            Ok(req) => req,
            Err(e) => {
                debug!(client = client_id.0, error = %e, "bad request line");
                send(&clients, client_id, Response::status(codes::MALFORMED, "invalid JSON request")).await;
                continue;
            }
        };

        handle_request(&mut session, request, &engine_tx, &clients, &users, &notifier).await;
    }

    // Disconnect: drop registrations so no one routes to a dead socket.
    if let Some(username) = session.username.take() {
        notifier.unregister(&username).await;
    }
    {
        let mut guard = clients.write().await;
        guard.remove(&client_id);
    }
    writer.abort();

    Ok(())
}

struct Session {
    client_id: ClientId,
    peer_addr: SocketAddr,
    username: Option<String>,
}

async fn handle_request(
    session: &mut Session,
    request: Request,
    engine_tx: &EngineTx,
    clients: &ClientRegistry,
    users: &Arc<Mutex<JsonUserStore>>,
    notifier: &Arc<Notifier>,
) {
    let client_id = session.client_id;
    match request {
        Request::Register { username, password } => {
            let response = if username.trim().is_empty() {
                Response::status(codes::MALFORMED, "empty username")
            } else if password.is_empty() {
                Response::status(codes::FAILURE, "invalid password")
            } else {
                let store = users.lock().await;
                match store.register(username.trim(), &sha256_hex(&password)) {
                    Ok(true) => Response::ok("OK"),
                    Ok(false) => Response::status(codes::UNAVAILABLE, "username not available"),
                    Err(e) => {
                        warn!(error = %e, "user store failure on register");
                        Response::status(codes::FAILURE, "internal error")
                    }
                }
            };
            send(clients, client_id, response).await;
        }

        Request::Login { username, password } => {
            let response = if username.trim().is_empty() || password.is_empty() {
                Response::status(codes::MALFORMED, "missing username or password")
            } else if session.username.is_some() {
                Response::status(codes::FAILURE, "already logged in")
            } else {
                let store = users.lock().await;
                match store.login(username.trim(), &sha256_hex(&password)) {
                    Ok(true) => {
                        session.username = Some(username.trim().to_string());
                        info!(client = client_id.0, user = username.trim(), "login");
                        Response::ok("OK")
                    }
                    Ok(false) => {
                        Response::status(codes::FAILURE, "unknown username or wrong password")
                    }
                    Err(e) => {
                        warn!(error = %e, "user store failure on login");
                        Response::status(codes::FAILURE, "internal error")
                    }
                }
            };
            send(clients, client_id, response).await;
        }

        Request::UpdateCredentials {
            username,
            old_password,
            new_password,
        } => {
            let response = if username.trim().is_empty() || old_password.is_empty() {
                Response::status(codes::MISSING_CREDENTIALS, "missing username or old password")
            } else if new_password.is_empty() {
                Response::status(codes::FAILURE, "invalid new password")
            } else if old_password == new_password {
                Response::status(codes::MALFORMED, "new password equals the old one")
            } else {
                let store = users.lock().await;
                match store.update_credentials(
                    username.trim(),
                    &sha256_hex(&old_password),
                    &sha256_hex(&new_password),
                ) {
                    Ok(true) => Response::ok("OK"),
                    Ok(false) => {
                        Response::status(codes::UNAVAILABLE, "unknown username or wrong password")
                    }
                    Err(e) => {
                        warn!(error = %e, "user store failure on update");
                        Response::status(codes::FAILURE, "internal error")
                    }
                }
            };
            send(clients, client_id, response).await;
        }

        Request::Logout {} => {
            let response = match session.username.take() {
                Some(username) => {
                    notifier.unregister(&username).await;
                    info!(client = client_id.0, user = %username, "logout");
                    Response::ok("OK")
                }
                None => Response::status(codes::FAILURE, "not logged in"),
            };
            send(clients, client_id, response).await;
        }

        Request::UdpConnection { port } => {
            let response = match &session.username {
                Some(username) => {
                    let addr = SocketAddr::new(session.peer_addr.ip(), port);
                    notifier.register(username, addr).await;
                    Response::ok("UDP connection registered")
                }
                None => Response::status(codes::FAILURE, "not logged in"),
            };
            send(clients, client_id, response).await;
        }

        Request::Help { command } => {
            send(clients, client_id, Response::ok(help_text(command.as_deref()))).await;
        }

        Request::InsertLimitOrder { side, size, price } => {
            forward_order(session, clients, engine_tx, OrderCommand::Limit { side, size, price }).await;
        }
        Request::InsertMarketOrder { side, size } => {
            forward_order(session, clients, engine_tx, OrderCommand::Market { side, size }).await;
        }
        Request::InsertStopOrder {
            side,
            size,
            stop_price,
        } => {
            forward_order(
                session,
                clients,
                engine_tx,
                OrderCommand::Stop {
                    side,
                    size,
                    stop_price,
                },
            )
            .await;
        }
        Request::CancelOrder { order_id } => {
            match &session.username {
                Some(username) => {
                    let req = EngineRequest {
                        client_id,
                        username: username.clone(),
                        cmd: OrderCommand::Cancel { order_id },
                    };
                    if engine_tx.send(req).is_err() {
                        warn!("engine channel closed");
                    }
                }
                None => {
                    send(clients, client_id, Response::status(codes::FAILURE, "not logged in")).await;
                }
            }
        }
    }
}

/// Order insertions answer with an order id, so a session failure uses
/// the `-1` sentinel rather than a status code.
async fn forward_order(
    session: &Session,
    clients: &ClientRegistry,
    engine_tx: &EngineTx,
    cmd: OrderCommand,
) {
    match &session.username {
        Some(username) => {
            let req = EngineRequest {
                client_id: session.client_id,
                username: username.clone(),
                cmd,
            };
            if engine_tx.send(req).is_err() {
                warn!("engine channel closed");
            }
        }
        None => {
            send(clients, session.client_id, Response::rejected_order()).await;
        }
    }
}

async fn send(clients: &ClientRegistry, client_id: ClientId, response: Response) {
    let guard = clients.read().await;
    if let Some(tx) = guard.get(&client_id) {
        let _ = tx.send(response);
    }
}

fn help_text(command: Option<&str>) -> String {
    let topics: BTreeMap<&str, &str> = BTreeMap::from([
        ("help", "help -> show this message or info on a command (e.g. help login)"),
        ("register", "register <user> <pwd> -> create a new account"),
        ("login", "login <user> <pwd> -> log into an account"),
        ("limit", "limit <bid/ask> <size> <price> -> insert a limit order"),
        ("market", "market <bid/ask> <size> -> insert a market order"),
        ("stop", "stop <bid/ask> <size> <stopPrice> -> insert a stop order"),
        ("cancel", "cancel <orderId> -> cancel a resting order"),
        ("logout", "logout -> disconnect the session"),
    ]);

    match command {
        Some(cmd) => match topics.get(cmd.to_ascii_lowercase().as_str()) {
            Some(text) => format!("=== HELP: {} ===\n{}", cmd, text),
            None => format!("unknown command: {}; send 'help' for the full list", cmd),
        },
        None => {
            let mut out = String::from("=== AVAILABLE COMMANDS ===\n");
            for text in topics.values() {
                out.push_str(text);
                out.push('\n');
            }
            out.trim_end().to_string()
        }
    }
}

fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn help_lists_all_commands() {
        let all = help_text(None);
        for cmd in ["register", "login", "limit", "market", "stop", "cancel"] {
            assert!(all.contains(cmd));
        }
        assert!(help_text(Some("limit")).contains("limit order"));
        assert!(help_text(Some("warp")).contains("unknown command"));
    }
}
