//! Trade ledger and resting-order snapshots on disk.
//!
//! Layout inside the data directory:
//! - `executed_trades.jsonl`: append-only, one trade per line.
//! - `pending_limit_orders.json`: whole-file snapshot of resting limit
//!   orders, rewritten after every mutation.
//! - `pending_stop_orders.json`: same for stop orders.
//!
//! The gateway methods log write failures and carry on: the engine's
//! in-memory book is the source of truth and is never rolled back on a
//! persistence failure.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use exchange_core::{BookSnapshot, ExecutedTrade, Order, PersistenceGateway};

use crate::error::StorageError;

const EXECUTED_TRADES_FILE: &str = "executed_trades.jsonl";
const PENDING_LIMIT_FILE: &str = "pending_limit_orders.json";
const PENDING_STOP_FILE: &str = "pending_stop_orders.json";

/// On-disk shape of one pending-order snapshot file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PendingOrders {
    bids: Vec<Order>,
    asks: Vec<Order>,
}

/// JSON-file persistence gateway.
#[derive(Debug)]
pub struct JsonOrderStore {
    dir: PathBuf,
}

impl JsonOrderStore {
    /// Open (and create if needed) the data directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(JsonOrderStore { dir })
    }

    /// Load the resting orders persisted by a previous run.
    ///
    /// Missing files mean a fresh start and yield an empty snapshot;
    /// unreadable files are reported so the operator can decide.
    pub fn load_resting(&self) -> Result<BookSnapshot, StorageError> {
        let limits = self.load_pending(PENDING_LIMIT_FILE)?;
        let stops = self.load_pending(PENDING_STOP_FILE)?;
        Ok(BookSnapshot {
            limit_bids: limits.bids,
            limit_asks: limits.asks,
            stop_bids: stops.bids,
            stop_asks: stops.asks,
        })
    }

    /// Read back the full trade ledger (tooling and tests; the engine
    /// never consumes this).
    pub fn load_executed_trades(&self) -> Result<Vec<ExecutedTrade>, StorageError> {
        let path = self.dir.join(EXECUTED_TRADES_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&path)?);
        let mut trades = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            trades.push(serde_json::from_str(&line)?);
        }
        Ok(trades)
    }

    fn load_pending(&self, file: &str) -> Result<PendingOrders, StorageError> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(PendingOrders::default());
        }
        let reader = BufReader::new(File::open(&path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    fn try_append_trade(&self, trade: &ExecutedTrade) -> Result<(), StorageError> {
        let path = self.dir.join(EXECUTED_TRADES_FILE);
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut line = serde_json::to_string(trade)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn try_snapshot(&self, snapshot: &BookSnapshot) -> Result<(), StorageError> {
        write_json(
            &self.dir.join(PENDING_LIMIT_FILE),
            &PendingOrders {
                bids: snapshot.limit_bids.clone(),
                asks: snapshot.limit_asks.clone(),
            },
        )?;
        write_json(
            &self.dir.join(PENDING_STOP_FILE),
            &PendingOrders {
                bids: snapshot.stop_bids.clone(),
                asks: snapshot.stop_asks.clone(),
            },
        )?;
        Ok(())
    }
}

impl PersistenceGateway for JsonOrderStore {
    fn append_trade(&mut self, trade: &ExecutedTrade) {
        if let Err(e) = self.try_append_trade(trade) {
            error!(error = %e, "failed to append executed trade");
        }
    }

    fn snapshot_resting(&mut self, snapshot: &BookSnapshot) {
        if let Err(e) = self.try_snapshot(snapshot) {
            error!(error = %e, "failed to write resting-order snapshot");
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let text = serde_json::to_string_pretty(value)?;
    if let Err(e) = fs::write(path, text) {
        warn!(path = %path.display(), "snapshot write failed");
        return Err(e.into());
    }
    Ok(())
}
