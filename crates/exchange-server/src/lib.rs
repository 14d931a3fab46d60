//! exchange-server
//!
//! Multi-client async TCP server for the exchange, plus the UDP trade
//! notifier. One task per connection; one central engine task owns the
//! matching engine, so every book mutation is observed as atomic.

pub mod config;
pub mod server;
pub mod types;

// Internal modules, not re-exported.
mod client;
mod engine_task;
mod notifier;
