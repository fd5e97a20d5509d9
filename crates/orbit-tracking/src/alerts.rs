//! Alert Stream Handler
//!
//! Consumes the push channel and maintains the bounded live alert log.
//!
//! # Connection states
//!
//! ```text
//! Disconnected ──▶ Connecting ──▶ Connected ──▶ Disconnected
//!        ▲              │                            │
//!        └──────────────┴──── connect error / close ─┘
//! ```
//!
//! - Nothing is replayed on entering `Connected`
//! - Only `{"type": "alert"}` messages touch the log; other types are ignored
//! - Malformed payloads are logged and dropped; the stream keeps going
//! - On disconnect the last log stays as it is
//!
//! The handler is the log's only writer. Readers hold an [`AlertFeed`] with
//! watch receivers for the log snapshot and connection state, plus a
//! broadcast receiver that fires once per newly appended alert.

use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::error::{Result, TrackingError};
use crate::model::AlertEvent;

/// Most alerts kept in the live log
pub const ALERT_LOG_CAPACITY: usize = 50;

/// Buffered notifications per reader before it starts lagging
const NOTIFY_BUFFER: usize = 128;

/// Ids remembered per log slot, so re-sent alerts stay out after eviction
const SEEN_IDS_PER_SLOT: usize = 4;

/// Bounded alert log, most recent first
#[derive(Debug, Clone)]
pub struct AlertLog {
    entries: VecDeque<AlertEvent>,
    capacity: usize,
    /// Recently accepted ids, oldest first; bounded at `capacity * SEEN_IDS_PER_SLOT`
    seen_order: VecDeque<String>,
    seen: HashSet<String>,
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertLog {
    pub fn new() -> Self {
        Self::with_capacity(ALERT_LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity + 1),
            capacity,
            seen_order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Prepend `alert`, evicting the oldest beyond capacity.
    ///
    /// Returns `false` without touching the log if the id was accepted
    /// recently. That covers every retained entry plus the last
    /// `3 * capacity` evicted ones; older ids are forgotten and accepted again.
    pub fn push(&mut self, alert: AlertEvent) -> bool {
        if self.seen.contains(&alert.id) {
            return false;
        }

        self.remember(alert.id.clone());
        self.entries.push_front(alert);
        self.entries.truncate(self.capacity);
        true
    }

    fn remember(&mut self, id: String) {
        self.seen.insert(id.clone());
        self.seen_order.push_back(id);
        while self.seen_order.len() > self.capacity * SEEN_IDS_PER_SLOT {
            if let Some(old) = self.seen_order.pop_front() {
                self.seen.remove(&old);
            }
        }
    }

    /// Whether an alert with `id` is currently in the log
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|a| a.id == id)
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &AlertEvent> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&AlertEvent> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn snapshot(&self) -> Arc<[AlertEvent]> {
        self.entries.iter().cloned().collect()
    }
}

/// Inbound push-channel message, tagged by `type`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Alert { alert: AlertEvent },
    /// Any other message type; consumed by other subsystems
    #[serde(other)]
    Other,
}

impl StreamMessage {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Text frames from one connection, in arrival order
pub type FrameStream = BoxStream<'static, Result<String>>;

/// Source of push-channel connections.
///
/// Each `connect` yields a fresh connection. Reconnect policy belongs to
/// whoever calls [`AlertStreamHandler::run`].
pub trait AlertTransport {
    fn connect(&self) -> impl Future<Output = Result<FrameStream>> + Send;
}

/// Read side of the handler
pub struct AlertFeed {
    pub log: watch::Receiver<Arc<[AlertEvent]>>,
    pub state: watch::Receiver<ConnectionState>,
    notify: broadcast::Receiver<AlertEvent>,
}

impl Clone for AlertFeed {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
            state: self.state.clone(),
            notify: self.notify.resubscribe(),
        }
    }
}

impl AlertFeed {
    /// Fresh receiver for alerts appended from now on. Closes once the
    /// handler is dropped.
    pub fn notifications(&self) -> broadcast::Receiver<AlertEvent> {
        self.notify.resubscribe()
    }

    pub fn current_log(&self) -> Arc<[AlertEvent]> {
        self.log.borrow().clone()
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

pub struct AlertStreamHandler {
    log: AlertLog,
    state: ConnectionState,
    log_tx: watch::Sender<Arc<[AlertEvent]>>,
    state_tx: watch::Sender<ConnectionState>,
    notify_tx: broadcast::Sender<AlertEvent>,
}

impl Default for AlertStreamHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStreamHandler {
    pub fn new() -> Self {
        Self::with_log(AlertLog::new())
    }

    pub fn with_log(log: AlertLog) -> Self {
        let (log_tx, _) = watch::channel(log.snapshot());
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (notify_tx, _) = broadcast::channel(NOTIFY_BUFFER);

        Self {
            log,
            state: ConnectionState::Disconnected,
            log_tx,
            state_tx,
            notify_tx,
        }
    }

    pub fn subscribe(&self) -> AlertFeed {
        AlertFeed {
            log: self.log_tx.subscribe(),
            state: self.state_tx.subscribe(),
            notify: self.notify_tx.subscribe(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn log(&self) -> &AlertLog {
        &self.log
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            info!("Alert stream {:?} -> {:?}", self.state, next);
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }

    /// Apply one inbound frame.
    ///
    /// Returns the alert if it was appended. Frames arriving while not
    /// connected are ignored.
    pub fn handle_frame(&mut self, text: &str) -> Result<Option<AlertEvent>> {
        if self.state != ConnectionState::Connected {
            debug!("Ignoring frame while {:?}", self.state);
            return Ok(None);
        }

        match StreamMessage::parse(text)? {
            StreamMessage::Alert { alert } => {
                if !self.log.push(alert.clone()) {
                    debug!("Alert {} already logged", alert.id);
                    return Ok(None);
                }

                self.log_tx.send_replace(self.log.snapshot());
                // No readers is fine
                let _ = self.notify_tx.send(alert.clone());
                Ok(Some(alert))
            }
            StreamMessage::Other => Ok(None),
        }
    }

    /// Attach to one fresh connection and consume it until it closes.
    ///
    /// The log survives the call. Alerts already in the log are not appended
    /// again if the new connection resends them.
    pub async fn run<T>(&mut self, transport: &T) -> Result<()>
    where
        T: AlertTransport + Sync,
    {
        self.set_state(ConnectionState::Connecting);

        let mut frames = match transport.connect().await {
            Ok(frames) => frames,
            Err(e) => {
                warn!("Alert stream unreachable: {}", e);
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        };

        self.set_state(ConnectionState::Connected);

        let outcome = loop {
            match frames.next().await {
                Some(Ok(text)) => match self.handle_frame(&text) {
                    Ok(Some(alert)) => debug!("Logged alert {} ({:?})", alert.id, alert.severity),
                    Ok(None) => {}
                    Err(e) => warn!("Dropping frame: {}", e),
                },
                Some(Err(e)) => {
                    warn!("Alert stream dropped: {}", e);
                    break Err(match e {
                        TrackingError::Connection(_) => e,
                        other => TrackingError::Connection(other.to_string()),
                    });
                }
                None => break Ok(()),
            }
        };

        self.set_state(ConnectionState::Disconnected);
        outcome
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::model::Severity;
    use chrono::Utc;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        // Log never exceeds capacity and holds the newest alerts in reverse order
        #[test]
        fn fuzz_alert_log_bound(n in 0usize..200) {
            let mut log = AlertLog::new();
            for i in 1..=n {
                log.push(AlertEvent::new(i.to_string(), Utc::now(), "m", Severity::Info, None));
                prop_assert!(log.len() <= ALERT_LOG_CAPACITY);
            }

            let got: Vec<usize> = log.iter().map(|a| a.id.parse().unwrap()).collect();
            let expected: Vec<usize> = (1..=n).rev().take(ALERT_LOG_CAPACITY).collect();
            prop_assert_eq!(got, expected);
        }
    }
}
