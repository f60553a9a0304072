//! Minimal SignalR JSON hub-protocol framing.
//!
//! The Easee stream hub speaks the JSON flavor of the SignalR hub protocol:
//! every record is a JSON document terminated by an ASCII record separator
//! (0x1E), starting with a handshake exchange. Only the message types the
//! subscriber needs are modeled; everything else surfaces as
//! [`HubMessage::Other`] and is ignored upstream.

use serde_json::{json, Value};

use crate::error::{EaseeError, Result};

pub const RECORD_SEPARATOR: char = '\u{1e}';

const TYPE_INVOCATION: i64 = 1;
const TYPE_COMPLETION: i64 = 3;
const TYPE_PING: i64 = 6;
const TYPE_CLOSE: i64 = 7;

/// The client side of the protocol negotiation, sent immediately after the
/// socket opens.
pub fn handshake_request() -> String {
    format!("{}{}", json!({ "protocol": "json", "version": 1 }), RECORD_SEPARATOR)
}

/// An outbound hub invocation with positional arguments.
pub fn invocation(invocation_id: u64, target: &str, arguments: Value) -> String {
    format!(
        "{}{}",
        json!({
            "type": TYPE_INVOCATION,
            "invocationId": invocation_id.to_string(),
            "target": target,
            "arguments": arguments,
        }),
        RECORD_SEPARATOR
    )
}

/// One inbound hub record, decoded just far enough to route it.
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    /// Server's answer to the handshake; an error message means the
    /// negotiation failed and the connection is useless.
    HandshakeResponse { error: Option<String> },
    Invocation { target: String, arguments: Vec<Value> },
    Completion,
    Ping,
    Close { error: Option<String> },
    Other(i64),
}

/// Split a websocket text frame into its hub records. Frames may carry
/// several records and the trailing separator produces an empty fragment,
/// which is skipped.
pub fn split_records(frame: &str) -> impl Iterator<Item = &str> {
    frame
        .split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
}

pub fn parse_message(record: &str) -> Result<HubMessage> {
    let value: Value = serde_json::from_str(record)
        .map_err(|err| EaseeError::Stream(format!("bad hub record: {err}")))?;

    let Some(message_type) = value.get("type").and_then(Value::as_i64) else {
        // Untyped records only occur during the handshake exchange.
        let error = value
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Ok(HubMessage::HandshakeResponse { error });
    };

    match message_type {
        TYPE_INVOCATION => {
            let target = value
                .get("target")
                .and_then(Value::as_str)
                .ok_or_else(|| EaseeError::Stream("invocation without target".to_string()))?
                .to_string();
            let arguments = value
                .get("arguments")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            Ok(HubMessage::Invocation { target, arguments })
        }
        TYPE_COMPLETION => Ok(HubMessage::Completion),
        TYPE_PING => Ok(HubMessage::Ping),
        TYPE_CLOSE => Ok(HubMessage::Close {
            error: value
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        other => Ok(HubMessage::Other(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_is_terminated() {
        let handshake = handshake_request();
        assert!(handshake.ends_with(RECORD_SEPARATOR));
        assert!(handshake.contains("\"protocol\":\"json\""));
    }

    #[test]
    fn handshake_response_parses() {
        assert_eq!(
            parse_message("{}").unwrap(),
            HubMessage::HandshakeResponse { error: None }
        );
        assert_eq!(
            parse_message("{\"error\":\"unsupported protocol\"}").unwrap(),
            HubMessage::HandshakeResponse {
                error: Some("unsupported protocol".to_string())
            }
        );
    }

    #[test]
    fn invocation_round_trip() {
        let frame = invocation(7, "SubscribeWithCurrentState", json!(["EH000001", true]));
        let record = split_records(&frame).next().unwrap();
        match parse_message(record).unwrap() {
            HubMessage::Invocation { target, arguments } => {
                assert_eq!(target, "SubscribeWithCurrentState");
                assert_eq!(arguments, vec![json!("EH000001"), json!(true)]);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn multiple_records_per_frame() {
        let frame = format!("{{\"type\":6}}{sep}{{\"type\":6}}{sep}", sep = RECORD_SEPARATOR);
        let messages: Vec<_> = split_records(&frame)
            .map(|r| parse_message(r).unwrap())
            .collect();
        assert_eq!(messages, vec![HubMessage::Ping, HubMessage::Ping]);
    }

    #[test]
    fn close_carries_error() {
        let message = parse_message("{\"type\":7,\"error\":\"going away\"}").unwrap();
        assert_eq!(
            message,
            HubMessage::Close {
                error: Some("going away".to_string())
            }
        );
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(parse_message("{nope").is_err());
    }
}
