//! Real-time Push Channel
//!
//! `/ws/orbits` streams catalog state and alerts to every connected client.
//!
//! # Messages
//!
//! | Type | Direction | Payload | When |
//! |------|-----------|---------|------|
//! | `initial` | server → client | `objects`, `alerts` | Once, on connect |
//! | `update` | server → client | `objects`, `alerts` | Every catalog tick |
//! | `alert` | server → client | `alert` | Once per new alert |
//! | `pong` | server → client | `timestamp` | Reply to any client text |
//!
//! The [`AlertHub`] fans serialized messages out over a broadcast channel. The
//! gateway's own dashboard reads it back through [`HubTransport`], the same
//! way a remote client would.

use std::future::Future;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use chrono::Utc;
use futures::StreamExt;
use orbit_tracking::alerts::FrameStream;
use orbit_tracking::{AlertEvent, AlertStreamHandler, AlertTransport, TrackedObject};
use rand::Rng;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, error, info, warn};

use crate::AppState;

const HUB_CAPACITY: usize = 256;

/// Delay before the dashboard feed re-attaches after its stream ends
const REATTACH_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// Wire messages
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundMessage {
    Initial {
        objects: Vec<TrackedObject>,
        alerts: Vec<AlertEvent>,
    },
    Update {
        objects: Vec<TrackedObject>,
        alerts: Vec<AlertEvent>,
    },
    Alert {
        alert: AlertEvent,
    },
    Pong {
        timestamp: String,
    },
}

impl OutboundMessage {
    pub fn pong() -> Self {
        Self::Pong {
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn to_text(&self) -> String {
        // Every variant is plain data; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ============================================================================
// Hub
// ============================================================================

#[derive(Clone)]
pub struct AlertHub {
    tx: broadcast::Sender<String>,
}

impl Default for AlertHub {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(HUB_CAPACITY);
        Self { tx }
    }

    /// Returns how many subscribers received the message
    pub fn publish(&self, message: &OutboundMessage) -> usize {
        self.tx.send(message.to_text()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

/// Hub subscription as an alert stream connection
#[derive(Clone)]
pub struct HubTransport {
    hub: AlertHub,
}

impl HubTransport {
    pub fn new(hub: AlertHub) -> Self {
        Self { hub }
    }
}

impl AlertTransport for HubTransport {
    fn connect(&self) -> impl Future<Output = orbit_tracking::Result<FrameStream>> + Send {
        let rx = self.hub.subscribe();
        async move {
            let frames: FrameStream = BroadcastStream::new(rx)
                .filter_map(|frame| async move {
                    match frame {
                        Ok(text) => Some(Ok(text)),
                        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                            warn!("Dashboard feed lagged, {} messages skipped", skipped);
                            None
                        }
                    }
                })
                .boxed();
            Ok(frames)
        }
    }
}

// ============================================================================
// WebSocket endpoint
// ============================================================================

pub async fn ws_orbits(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    // Subscribe before the snapshot so nothing published in between is lost
    let mut updates = state.hub.subscribe();

    let initial = {
        let catalog = state.catalog.read().await;
        OutboundMessage::Initial {
            objects: catalog.objects().to_vec(),
            alerts: catalog.alerts(),
        }
    };
    if socket.send(Message::Text(initial.to_text())).await.is_err() {
        return;
    }
    info!("Client connected to /ws/orbits");

    loop {
        tokio::select! {
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    debug!("Client says: {}", text);
                    if socket.send(Message::Text(OutboundMessage::pong().to_text())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Socket error: {}", e);
                    break;
                }
            },
            outbound = updates.recv() => match outbound {
                Ok(text) => {
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Client lagged, {} messages skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    info!("Client disconnected");
}

// ============================================================================
// Background tasks
// ============================================================================

/// Next tick delay: `base` plus up to 1.5x `base` of jitter
pub fn next_tick(base: Duration) -> Duration {
    let base_ms = base.as_millis() as u64;
    let jitter_ms = rand::thread_rng().gen_range(0..=base_ms * 3 / 2);
    Duration::from_millis(base_ms + jitter_ms)
}

/// One catalog tick: advance, then publish the update and each new alert
pub async fn tick(state: &AppState) -> usize {
    let (objects, history, raised) = {
        let mut catalog = state.catalog.write().await;
        let raised = catalog.update(Utc::now());
        (catalog.objects().to_vec(), catalog.alerts(), raised)
    };

    state.hub.publish(&OutboundMessage::Update {
        objects,
        alerts: history,
    });
    for alert in &raised {
        state.hub.publish(&OutboundMessage::Alert { alert: alert.clone() });
    }
    raised.len()
}

pub async fn run_update_loop(state: AppState, base: Duration) {
    info!("Catalog updates every {:?} to {:?}", base, base * 5 / 2);
    loop {
        tokio::time::sleep(next_tick(base)).await;
        let raised = tick(&state).await;
        if raised > 0 {
            debug!("Tick raised {} alerts", raised);
        }
    }
}

/// Keep the dashboard's alert handler attached to `transport`: the local hub,
/// or the remote backend's stream in remote mode
pub async fn run_dashboard_feed<T>(mut handler: AlertStreamHandler, transport: T)
where
    T: AlertTransport + Send + Sync + 'static,
{
    loop {
        match handler.run(&transport).await {
            Ok(()) => info!("Dashboard feed closed, re-attaching"),
            Err(e) => error!("Dashboard feed failed: {}", e),
        }
        tokio::time::sleep(REATTACH_DELAY).await;
    }
}

/// Log each alert the dashboard log accepts; returns how many once the
/// handler is gone
pub async fn run_alert_notifier(mut notifications: broadcast::Receiver<AlertEvent>) -> usize {
    let mut seen = 0;
    loop {
        match notifications.recv().await {
            Ok(alert) => {
                seen += 1;
                info!("🚨 Dashboard alert {} [{:?}]: {}", alert.id, alert.severity, alert.message);
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Alert notifier lagged, {} alerts skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use futures::SinkExt;
    use orbit_tracking::{ConnectionState, Severity, StreamMessage};
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    fn parse(message: WsMessage) -> serde_json::Value {
        match message {
            WsMessage::Text(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[test]
    fn test_outbound_wire_shape() {
        let alert = AlertEvent::new("a1", Utc::now(), "close pass", Severity::Critical, Some("25544".into()));
        let json: serde_json::Value =
            serde_json::from_str(&OutboundMessage::Alert { alert: alert.clone() }.to_text()).unwrap();

        assert_eq!(json["type"], "alert");
        assert_eq!(json["alert"]["id"], "a1");
        assert_eq!(json["alert"]["severity"], "critical");

        // The dashboard parser reads our own alert messages
        let parsed = StreamMessage::parse(&OutboundMessage::Alert { alert: alert.clone() }.to_text()).unwrap();
        assert_eq!(parsed, StreamMessage::Alert { alert });

        let pong: serde_json::Value = serde_json::from_str(&OutboundMessage::pong().to_text()).unwrap();
        assert_eq!(pong["type"], "pong");
        assert!(pong["timestamp"].is_string());
    }

    #[test]
    fn test_next_tick_range() {
        let base = Duration::from_millis(2000);
        for _ in 0..100 {
            let d = next_tick(base);
            assert!(d >= Duration::from_millis(2000) && d <= Duration::from_millis(5000));
        }
    }

    #[tokio::test]
    async fn test_hub_transport_feeds_handler() {
        let hub = AlertHub::new();
        let mut handler = AlertStreamHandler::new();
        let mut feed = handler.subscribe();
        let transport = HubTransport::new(hub.clone());

        let run = tokio::spawn(async move { handler.run(&transport).await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while feed.connection_state() != ConnectionState::Connected {
                feed.state.changed().await.unwrap();
            }

            for n in 1..=3 {
                let alert = AlertEvent::new(n.to_string(), Utc::now(), "m", Severity::Warning, None);
                hub.publish(&OutboundMessage::Update { objects: vec![], alerts: vec![] });
                hub.publish(&OutboundMessage::Alert { alert });
            }

            while feed.current_log().len() < 3 {
                feed.log.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        let ids: Vec<String> = feed.current_log().iter().map(|a| a.id.clone()).collect();
        assert_eq!(ids, vec!["3", "2", "1"]);
        run.abort();
    }

    #[tokio::test]
    async fn test_tick_publishes_update_then_alerts() {
        let (state, _handler) = AppState::new(Catalog::seeded(Utc::now()));
        let mut rx = state.hub.subscribe();

        let raised = tick(&state).await;

        let first: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(first["type"], "update");
        assert_eq!(first["objects"].as_array().unwrap().len(), 5);
        for _ in 0..raised {
            let next: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
            assert_eq!(next["type"], "alert");
        }
    }

    #[tokio::test]
    async fn test_ws_orbits_initial_pong_and_forwarding() {
        let (state, _handler) = AppState::new(Catalog::seeded(Utc::now()));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = crate::app(state.clone());
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/orbits"))
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            let initial = parse(socket.next().await.unwrap().unwrap());
            assert_eq!(initial["type"], "initial");
            assert_eq!(initial["objects"].as_array().unwrap().len(), 5);
            assert!(initial["alerts"].is_array());

            socket.send(WsMessage::Text("ping".to_string())).await.unwrap();
            let pong = parse(socket.next().await.unwrap().unwrap());
            assert_eq!(pong["type"], "pong");
            assert!(pong["timestamp"].is_string());

            let alert = AlertEvent::new("hub-1", Utc::now(), "close pass", Severity::Warning, None);
            assert_eq!(state.hub.publish(&OutboundMessage::Alert { alert }), 1);
            let forwarded = parse(socket.next().await.unwrap().unwrap());
            assert_eq!(forwarded["type"], "alert");
            assert_eq!(forwarded["alert"]["id"], "hub-1");
        })
        .await
        .unwrap();

        server.abort();
    }

    #[tokio::test]
    async fn test_notifier_counts_accepted_alerts() {
        let hub = AlertHub::new();
        let mut handler = AlertStreamHandler::new();
        let mut feed = handler.subscribe();
        let notifier = tokio::spawn(run_alert_notifier(feed.notifications()));
        let transport = HubTransport::new(hub.clone());

        let run = tokio::spawn(async move {
            let _ = handler.run(&transport).await;
            handler
        });
        while feed.connection_state() != ConnectionState::Connected {
            feed.state.changed().await.unwrap();
        }

        let alert = AlertEvent::new("n1", Utc::now(), "m", Severity::Info, None);
        hub.publish(&OutboundMessage::Alert { alert: alert.clone() });
        hub.publish(&OutboundMessage::Alert { alert });
        while feed.current_log().is_empty() {
            feed.log.changed().await.unwrap();
        }

        // Dropping the handler closes the notification channel
        run.abort();
        let _ = run.await;
        let seen = tokio::time::timeout(Duration::from_secs(5), notifier).await.unwrap().unwrap();
        assert_eq!(seen, 1);
    }
}
