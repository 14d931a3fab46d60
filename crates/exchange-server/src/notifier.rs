//! UDP trade notification fan-out.
//!
//! Clients announce the UDP port they listen on (`udpConnection`); the
//! notifier keeps a `username -> address` registry and sends each
//! closed-trade datagram to both counterparties. A counterparty that is
//! offline is simply skipped; a send failure drops the stale
//! registration.

use std::collections::HashMap;
use std::net::SocketAddr;

use exchange_core::ExecutedTrade;
use exchange_protocol::{format_notification, TradeNotification};
use tokio::net::UdpSocket;
use tokio::sync::RwLock;
use tracing::{debug, warn};

pub struct Notifier {
    socket: UdpSocket,
    registry: RwLock<HashMap<String, SocketAddr>>,
}

impl Notifier {
    /// Bind the shared outbound socket on an ephemeral port.
    pub async fn bind() -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Notifier {
            socket,
            registry: RwLock::new(HashMap::new()),
        })
    }

    /// Record (or replace) where a user receives notifications.
    pub async fn register(&self, username: &str, addr: SocketAddr) {
        self.registry
            .write()
            .await
            .insert(username.to_string(), addr);
    }

    /// Forget a user's notification address (logout / disconnect).
    pub async fn unregister(&self, username: &str) {
        self.registry.write().await.remove(username);
    }

    /// Notify buyer and seller of one closed trade.
    pub async fn notify_trade(&self, trade: &ExecutedTrade) {
        let payload = format_notification(&TradeNotification::closed_trade(trade.clone()));
        self.send_to_user(&trade.buyer, &payload).await;
        self.send_to_user(&trade.seller, &payload).await;
    }

    async fn send_to_user(&self, username: &str, payload: &str) {
        let addr = {
            let registry = self.registry.read().await;
            registry.get(username).copied()
        };
        let addr = match addr {
            Some(a) => a,
            None => {
                debug!(user = username, "no UDP registration, notification skipped");
                return;
            }
        };
        if let Err(e) = self.socket.send_to(payload.as_bytes(), addr).await {
            warn!(user = username, error = %e, "notification send failed, dropping registration");
            self.unregister(username).await;
        }
    }
}
