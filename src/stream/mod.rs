//! Streaming subscriber for charger telemetry.
//!
//! Connects to the Easee SignalR hub over a websocket, subscribes to one
//! charger's state and forwards the three inbound message classes as
//! [`StreamEvent`]s on an mpsc channel: product updates and command
//! responses pass through, charger updates go through the observation
//! decoder first.
//!
//! The connection lifecycle is `disconnected → connecting → connected` with
//! a fixed-interval reconnect from any failure, suppressed once
//! [`StreamHandle::shutdown`] sets the closing flag. Token freshness is
//! entirely the token manager's problem: every (re)connect starts with
//! `ensure_authenticated`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::auth::{AuthApi, TokenManager};
use crate::config::EaseeConfig;
use crate::error::{EaseeError, Result};
use crate::observations::{parse_observation, MatchMode, ParsedObservation, RawObservation};

mod signalr;

use signalr::HubMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Connected,
}

/// Everything the subscriber emits, consumable by an adapter layer.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Status(StreamState),
    /// Product update, forwarded as-is.
    ProductUpdate(Value),
    /// One decoded charger observation plus the charger it belongs to.
    ChargerUpdate {
        charger_id: Option<String>,
        observation: ParsedObservation,
    },
    /// Response to a charger command, forwarded as-is.
    CommandResponse(Value),
}

/// Derive the websocket URL from the configured hub URL and attach the
/// bearer token the way the SignalR websocket transport expects it.
fn hub_url(stream_url: &str, access_token: &str) -> String {
    let ws = if let Some(rest) = stream_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = stream_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        stream_url.to_string()
    };
    let separator = if ws.contains('?') { '&' } else { '?' };
    format!("{ws}{separator}access_token={access_token}")
}

/// Route one hub invocation to its event, decoding charger updates.
fn route_invocation(target: &str, arguments: Vec<Value>) -> Option<StreamEvent> {
    let mut arguments = arguments.into_iter();
    let first = arguments.next()?;
    match target {
        "ProductUpdate" => Some(StreamEvent::ProductUpdate(first)),
        "ChargerUpdate" => {
            let charger_id = first
                .get("mid")
                .and_then(Value::as_str)
                .map(str::to_string);
            let raw: RawObservation = match serde_json::from_value(first) {
                Ok(raw) => raw,
                Err(err) => {
                    log::warn!("Easee: undecodable charger update: {}", err);
                    return None;
                }
            };
            Some(StreamEvent::ChargerUpdate {
                charger_id,
                observation: parse_observation(&raw, MatchMode::Id),
            })
        }
        "CommandResponse" => Some(StreamEvent::CommandResponse(first)),
        other => {
            log::debug!("Easee: ignoring hub target {}", other);
            None
        }
    }
}

pub struct StreamSubscriber<A: AuthApi> {
    config: EaseeConfig,
    tokens: Arc<TokenManager<A>>,
    events: mpsc::Sender<StreamEvent>,
    closing: Arc<AtomicBool>,
}

impl<A: AuthApi> StreamSubscriber<A> {
    pub fn new(
        config: EaseeConfig,
        tokens: Arc<TokenManager<A>>,
    ) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (events, receiver) = mpsc::channel(64);
        (
            Self {
                config,
                tokens,
                events,
                closing: Arc::new(AtomicBool::new(false)),
            },
            receiver,
        )
    }

    fn is_closing(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }

    /// Connection loop: connect, run until the connection dies, then
    /// reconnect after the configured interval unless closing.
    pub async fn run(&self, charger_id: &str) {
        let reconnect = Duration::from_secs(self.config.reconnect_interval_secs);

        while !self.is_closing() {
            self.emit_status(StreamState::Connecting).await;
            match self.connect_and_run(charger_id).await {
                Ok(()) => log::info!("Easee: stream connection closed"),
                Err(err) => log::warn!("Easee: stream error: {}", err),
            }
            self.emit_status(StreamState::Disconnected).await;

            if self.is_closing() {
                break;
            }
            log::info!("Easee: reconnecting stream in {:?}", reconnect);
            tokio::time::sleep(reconnect).await;
        }
    }

    async fn connect_and_run(&self, charger_id: &str) -> Result<()> {
        if !self.tokens.ensure_authenticated().await {
            return Err(EaseeError::NotAuthenticated);
        }
        let token = self
            .tokens
            .access_token()
            .await
            .ok_or(EaseeError::NotAuthenticated)?;

        let url = hub_url(&self.config.stream_url, &token);
        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|err| EaseeError::Stream(format!("connect failed: {err}")))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        // Protocol negotiation comes first on the wire.
        ws_tx
            .send(Message::Text(signalr::handshake_request()))
            .await
            .map_err(|err| EaseeError::Stream(format!("handshake send failed: {err}")))?;

        let mut handshaken = false;
        let mut invocation_id: u64 = 0;

        while let Some(message) = ws_rx.next().await {
            let message =
                message.map_err(|err| EaseeError::Stream(format!("receive failed: {err}")))?;
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => {
                    log::info!("Easee: stream closed by server");
                    return Ok(());
                }
                // Pings and pongs are handled by the websocket layer.
                _ => continue,
            };

            for record in signalr::split_records(&text) {
                match signalr::parse_message(record)? {
                    HubMessage::HandshakeResponse { error: Some(error) } => {
                        return Err(EaseeError::Stream(format!(
                            "handshake rejected: {error}"
                        )));
                    }
                    HubMessage::HandshakeResponse { error: None } => {
                        if !handshaken {
                            handshaken = true;
                            self.emit_status(StreamState::Connected).await;
                            // Subscribe as soon as the hub accepts us.
                            invocation_id += 1;
                            ws_tx
                                .send(Message::Text(signalr::invocation(
                                    invocation_id,
                                    "SubscribeWithCurrentState",
                                    json!([charger_id, true]),
                                )))
                                .await
                                .map_err(|err| {
                                    EaseeError::Stream(format!("subscribe failed: {err}"))
                                })?;
                            log::info!("Easee: subscribed to charger {}", charger_id);
                        }
                    }
                    HubMessage::Invocation { target, arguments } => {
                        if let Some(event) = route_invocation(&target, arguments) {
                            if self.config.log_observations {
                                log::info!("Easee: stream event {:?}", event);
                            }
                            self.emit(event).await;
                        }
                    }
                    HubMessage::Close { error } => {
                        log::info!("Easee: hub close received: {:?}", error);
                        return Ok(());
                    }
                    HubMessage::Ping | HubMessage::Completion | HubMessage::Other(_) => {}
                }
            }
        }

        Ok(())
    }

    async fn emit_status(&self, state: StreamState) {
        self.emit(StreamEvent::Status(state)).await;
    }

    async fn emit(&self, event: StreamEvent) {
        if self.events.send(event).await.is_err() {
            // Receiver gone; shutting down is the only sensible reaction.
            self.closing.store(true, Ordering::SeqCst);
        }
    }
}

impl<A: AuthApi + 'static> StreamSubscriber<A> {
    /// Run the connection loop as a task. The returned handle is the single
    /// shutdown surface for the subscriber.
    pub fn spawn(self, charger_id: String) -> StreamHandle {
        let closing = self.closing.clone();
        let task = tokio::spawn(async move {
            self.run(&charger_id).await;
        });
        StreamHandle { closing, task }
    }
}

/// Owner's handle to a spawned subscriber.
pub struct StreamHandle {
    closing: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl StreamHandle {
    /// Stop reconnecting and cancel the connection task. The closing flag
    /// keeps a race between abort and reconnect harmless.
    pub fn shutdown(self) {
        self.closing.store(true, Ordering::SeqCst);
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{TokenResponse, TokenSettings};
    use crate::observations::DataType;

    #[test]
    fn hub_url_swaps_scheme_and_appends_token() {
        let url = hub_url("https://streams.easee.com/hubs/chargers", "tok123");
        assert_eq!(
            url,
            "wss://streams.easee.com/hubs/chargers?access_token=tok123"
        );

        let url = hub_url("http://localhost:8080/hubs/chargers?x=1", "t");
        assert_eq!(url, "ws://localhost:8080/hubs/chargers?x=1&access_token=t");
    }

    #[test]
    fn charger_update_is_decoded() {
        let argument = json!({
            "mid": "EH000001",
            "id": 109,
            "dataType": 4,
            "value": "3",
        });
        match route_invocation("ChargerUpdate", vec![argument]) {
            Some(StreamEvent::ChargerUpdate {
                charger_id,
                observation,
            }) => {
                assert_eq!(charger_id.as_deref(), Some("EH000001"));
                assert_eq!(observation.name, Some("ChargerOpMode"));
                assert_eq!(observation.data_type, Some(DataType::Integer));
                assert_eq!(observation.display_text, Some("Charging"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn product_update_passes_through() {
        let argument = json!({ "anything": true });
        match route_invocation("ProductUpdate", vec![argument.clone()]) {
            Some(StreamEvent::ProductUpdate(value)) => assert_eq!(value, argument),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn command_response_passes_through() {
        let argument = json!({ "id": 48, "accepted": true });
        match route_invocation("CommandResponse", vec![argument.clone()]) {
            Some(StreamEvent::CommandResponse(value)) => assert_eq!(value, argument),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_targets_are_dropped() {
        assert!(route_invocation("SomethingElse", vec![json!(1)]).is_none());
        // An invocation without arguments has nothing to forward.
        assert!(route_invocation("ProductUpdate", vec![]).is_none());
    }

    /// Account API that is never expected to be reached.
    struct UnreachableApi;

    impl AuthApi for UnreachableApi {
        async fn login(
            &self,
            _username: &str,
            _password: &str,
        ) -> crate::error::Result<TokenResponse> {
            Err(EaseeError::Network("unreachable".to_string()))
        }

        async fn refresh(
            &self,
            _access_token: &str,
            _refresh_token: &str,
        ) -> crate::error::Result<TokenResponse> {
            Err(EaseeError::Network("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn shutdown_stops_the_reconnect_loop() {
        let config = EaseeConfig {
            username: String::new(),
            password: String::new(),
            rest_base_url: "http://127.0.0.1:9".to_string(),
            stream_url: "http://127.0.0.1:9/hubs/chargers".to_string(),
            charger_id: Some("EH000001".to_string()),
            site_id: None,
            circuit_id: None,
            http_timeout_secs: 1,
            reconnect_interval_secs: 1,
            log_observations: false,
            log_commands: false,
        };
        // No credentials, so every connect attempt fails before any I/O and
        // the loop sits in its reconnect cycle.
        let tokens = Arc::new(TokenManager::new(
            UnreachableApi,
            None,
            TokenSettings::default(),
        ));
        let (subscriber, mut events) = StreamSubscriber::new(config, tokens);
        let handle = subscriber.spawn("EH000001".to_string());

        let first = events.recv().await;
        assert!(matches!(
            first,
            Some(StreamEvent::Status(StreamState::Connecting))
        ));

        handle.shutdown();
        // The cancelled task drops the sender; the channel drains and closes.
        while events.recv().await.is_some() {}
    }
}
