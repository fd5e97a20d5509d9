//! WebSocket client for the backend push channel
//!
//! Connects to [`BackendConfig::stream_url`] and yields its text frames.
//! Control frames are handled by the socket; a close frame ends the stream.

use std::future::Future;

use futures::{future, StreamExt};
use reqwest::Url;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

use crate::alerts::{AlertTransport, FrameStream};
use crate::config::BackendConfig;
use crate::error::{Result, TrackingError};

#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: Url,
}

impl WebSocketTransport {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            url: config.stream_url(),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl AlertTransport for WebSocketTransport {
    fn connect(&self) -> impl Future<Output = Result<FrameStream>> + Send {
        let url = self.url.clone();

        async move {
            let (socket, response) = connect_async(url.as_str())
                .await
                .map_err(|e| TrackingError::Connection(format!("{url}: {e}")))?;
            debug!("Attached to {} ({})", url, response.status());

            let frames: FrameStream = socket
                .take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)))))
                .filter_map(|message| {
                    future::ready(match message {
                        Ok(Message::Text(text)) => Some(Ok(text)),
                        Ok(_) => None,
                        Err(e) => Some(Err(TrackingError::Connection(e.to_string()))),
                    })
                })
                .boxed();
            Ok(frames)
        }
    }
}
