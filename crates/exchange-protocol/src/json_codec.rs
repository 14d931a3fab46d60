//! Line-oriented JSON codec.
//!
//! One request or response per line on the TCP side; one notification
//! per datagram on the UDP side. Encoding never fails for the types we
//! produce, so the fallible direction is parsing only.

use crate::wire_types::{Request, Response, TradeNotification};

/// Error produced while decoding a request line.
#[derive(Debug)]
pub enum ProtocolError {
    /// The line was not valid JSON, or not a known operation shape.
    Malformed(serde_json::Error),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::Malformed(e) => write!(f, "malformed request: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Parse one request line.
pub fn parse_request_line(line: &str) -> Result<Request, ProtocolError> {
    serde_json::from_str(line.trim()).map_err(ProtocolError::Malformed)
}

/// Encode a response as a single line (no trailing newline).
pub fn format_response(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| {
        // Response contains only strings and integers; serialization
        // cannot fail in practice.
        String::from("{\"response\":101,\"errorMessage\":\"internal error\"}")
    })
}

/// Encode a trade notification datagram.
pub fn format_notification(notification: &TradeNotification) -> String {
    serde_json::to_string(notification)
        .unwrap_or_else(|_| String::from("{\"notification\":\"closedTrade\"}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use exchange_core::{ExecutedTrade, OrderType, Side};

    #[test]
    fn parses_limit_order_request() {
        let line = r#"{"operation":"insertLimitOrder","values":{"type":"bid","size":10,"price":55}}"#;
        let req = parse_request_line(line).unwrap();
        assert_eq!(
            req,
            Request::InsertLimitOrder {
                side: Side::Bid,
                size: 10,
                price: 55
            }
        );
    }

    #[test]
    fn parses_stop_and_cancel_requests() {
        let line = r#"{"operation":"insertStopOrder","values":{"type":"ask","size":5,"stopPrice":90}}"#;
        assert_eq!(
            parse_request_line(line).unwrap(),
            Request::InsertStopOrder {
                side: Side::Ask,
                size: 5,
                stop_price: 90
            }
        );

        let line = r#"{"operation":"cancelOrder","values":{"orderId":42}}"#;
        assert_eq!(
            parse_request_line(line).unwrap(),
            Request::CancelOrder { order_id: 42 }
        );
    }

    #[test]
    fn parses_auth_requests() {
        let line = r#"{"operation":"login","values":{"username":"alice","password":"secret"}}"#;
        assert_eq!(
            parse_request_line(line).unwrap(),
            Request::Login {
                username: "alice".into(),
                password: "secret".into()
            }
        );

        let line = r#"{"operation":"logout","values":{}}"#;
        assert_eq!(parse_request_line(line).unwrap(), Request::Logout {});
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_request_line("not json").is_err());
        assert!(parse_request_line(r#"{"operation":"warp","values":{}}"#).is_err());
    }

    #[test]
    fn formats_responses() {
        assert_eq!(
            format_response(&Response::order_id(7)),
            r#"{"orderId":7}"#
        );
        assert_eq!(
            format_response(&Response::rejected_order()),
            r#"{"orderId":-1}"#
        );
        let status = format_response(&Response::ok("OK"));
        assert_eq!(status, r#"{"response":100,"errorMessage":"OK"}"#);
    }

    #[test]
    fn notification_carries_original_field_names() {
        let trade = ExecutedTrade {
            buyer: "alice".into(),
            seller: "bob".into(),
            order_type: OrderType::Limit,
            aggressor_side: Side::Bid,
            size: 4,
            price: 50,
            timestamp: 1,
        };
        let text = format_notification(&TradeNotification::closed_trade(trade));
        assert!(text.contains(r#""notification":"closedTrade""#));
        assert!(text.contains(r#""orderType":"limit""#));
        assert!(text.contains(r#""side":"bid""#));
        assert!(text.contains(r#""buyer":"alice""#));
    }
}
