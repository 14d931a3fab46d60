//! Configuration for the exchange server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `EXCHANGE_BIND_ADDR`   (default: "0.0.0.0")
//! - `EXCHANGE_PORT`        (default: "9000")
//! - `EXCHANGE_MAX_CLIENTS` (default: "1024")
//! - `EXCHANGE_DATA_DIR`    (default: "data")

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously connected clients.
    pub max_clients: usize,

    /// Directory for the trade ledger, order snapshots and user file.
    pub data_dir: PathBuf,
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to reasonable defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env::var("EXCHANGE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = read_env_or_default("EXCHANGE_PORT", 9000u16)?;
        let max_clients = read_env_or_default("EXCHANGE_MAX_CLIENTS", 1024usize)?;
        let data_dir = env::var("EXCHANGE_DATA_DIR").unwrap_or_else(|_| "data".to_string());

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            data_dir: PathBuf::from(data_dir),
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => Ok(val.parse::<T>()?),
        Err(_) => Ok(default),
    }
}
