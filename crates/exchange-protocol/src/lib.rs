//! exchange-protocol
//!
//! Wire-level encoding/decoding for the exchange.
//!
//! The transport is newline-delimited JSON over TCP for requests and
//! responses, and single JSON datagrams over UDP for trade
//! notifications. This crate only turns logical messages into text and
//! back; sockets live in `exchange-server`.

pub mod json_codec;
pub mod wire_types;

pub use json_codec::{format_notification, format_response, parse_request_line, ProtocolError};
pub use wire_types::{Request, Response, TradeNotification};
