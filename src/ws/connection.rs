//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! answering subscription commands and forwarding matching dispatches.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::Dispatch;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and answers them.
/// - Forwards dispatches from the [`broadcast::Receiver`] whose target the
///   client subscribed to.
pub async fn run_connection(socket: WebSocket, mut dispatch_rx: broadcast::Receiver<Dispatch>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            dispatch = dispatch_rx.recv() => {
                match dispatch {
                    Ok(dispatch) => {
                        if !subs.matches(&dispatch.target) {
                            continue;
                        }
                        let payload = serde_json::to_value(&dispatch).unwrap_or_default();
                        let msg = WsMessage::server(WsMessageType::Event, payload);
                        let json = serde_json::to_string(&msg).unwrap_or_default();
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return error_reply(String::new(), 400, "malformed JSON");
    };
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return error_reply(msg.id, 404, "unknown command");
    };

    let payload = match command {
        WsCommand::Subscribe { targets } => {
            let added = subs.subscribe(&targets);
            serde_json::json!({
                "subscribed": added,
                "count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Unsubscribe { targets } => {
            subs.unsubscribe(&targets);
            serde_json::json!({
                "unsubscribed": targets,
                "remaining_count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Ping => serde_json::json!({ "pong": true }),
    };
    serde_json::to_string(&WsMessage::reply(msg.id, WsMessageType::Response, payload)).ok()
}

fn error_reply(id: String, code: u16, message: &str) -> Option<String> {
    let err = WsMessage::reply(
        id,
        WsMessageType::Error,
        serde_json::json!({ "code": code, "message": message }),
    );
    serde_json::to_string(&err).ok()
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::NotifyTarget;

    fn reply(text: &str, subs: &mut SubscriptionManager) -> serde_json::Value {
        let Some(json) = handle_text_message(text, subs) else {
            panic!("expected a reply");
        };
        let Ok(value) = serde_json::from_str(&json) else {
            panic!("reply should be JSON");
        };
        value
    }

    #[test]
    fn subscribe_then_match() {
        let mut subs = SubscriptionManager::new();
        let value = reply(
            r#"{"id":"1","type":"command","timestamp":"2025-01-01T00:00:00Z",
                "payload":{"command":"subscribe","targets":["chan-9"]}}"#,
            &mut subs,
        );
        assert_eq!(value.get("type").and_then(|t| t.as_str()), Some("response"));
        assert_eq!(value.get("id").and_then(|t| t.as_str()), Some("1"));
        assert!(subs.matches(&NotifyTarget::from("chan-9")));
    }

    #[test]
    fn malformed_and_unknown_are_errors() {
        let mut subs = SubscriptionManager::new();
        let value = reply("not json", &mut subs);
        assert_eq!(value.get("type").and_then(|t| t.as_str()), Some("error"));

        let value = reply(
            r#"{"id":"2","type":"command","timestamp":"2025-01-01T00:00:00Z",
                "payload":{"command":"teleport"}}"#,
            &mut subs,
        );
        assert_eq!(
            value.pointer("/payload/code").and_then(serde_json::Value::as_u64),
            Some(404)
        );
    }
}
