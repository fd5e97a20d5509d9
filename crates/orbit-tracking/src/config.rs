//! Backend endpoint configuration
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ASTROALERT_BACKEND_URL` | `ws://localhost:8000` |
//! | `ASTROALERT_PREDICTION_TIMEOUT_MS` | `5000` |
//!
//! The base URL may use any of `ws`, `wss`, `http` or `https`. The push channel
//! always goes over `ws`/`wss` and prediction requests over `http`/`https`.

use std::time::Duration;

use reqwest::Url;

use crate::error::{Result, TrackingError};

pub const DEFAULT_BACKEND_URL: &str = "ws://localhost:8000";
pub const STREAM_PATH: &str = "/ws/orbits";
pub const DEFAULT_PREDICTION_TIMEOUT: Duration = Duration::from_millis(5000);

pub const BACKEND_URL_VAR: &str = "ASTROALERT_BACKEND_URL";
pub const PREDICTION_TIMEOUT_VAR: &str = "ASTROALERT_PREDICTION_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// `http`/`https` form of the backend URL; path prefix without a trailing
    /// slash, query kept, fragment dropped
    base: Url,
    request_timeout: Duration,
}

fn invalid(url: &str, reason: impl std::fmt::Display) -> TrackingError {
    TrackingError::InvalidConfig(format!("backend URL {url:?}: {reason}"))
}

impl BackendConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys take their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base = lookup(BACKEND_URL_VAR).unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let mut config = Self::with_base_url(&base)?;

        if let Some(raw) = lookup(PREDICTION_TIMEOUT_VAR) {
            let ms: u64 = raw
                .trim()
                .parse()
                .map_err(|_| TrackingError::InvalidConfig(format!("{PREDICTION_TIMEOUT_VAR}={raw} is not a millisecond count")))?;
            config.request_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    pub fn with_base_url(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let mut base = Url::parse(raw).map_err(|e| invalid(raw, e))?;

        let http_scheme = match base.scheme() {
            "ws" | "http" => "http",
            "wss" | "https" => "https",
            other => return Err(invalid(raw, format!("unsupported scheme {other:?}"))),
        };
        if base.host_str().map_or(true, str::is_empty) {
            return Err(invalid(raw, "no host"));
        }

        base.set_scheme(http_scheme)
            .map_err(|_| invalid(raw, format!("cannot use as {http_scheme}")))?;
        let prefix = base.path().trim_end_matches('/').to_string();
        base.set_path(&prefix);
        base.set_fragment(None);

        Ok(Self {
            base,
            request_timeout: DEFAULT_PREDICTION_TIMEOUT,
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// `path` under the backend's prefix, keeping its query
    fn at(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let prefix = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{prefix}/{}", path.trim_start_matches('/')));
        url
    }

    /// Push channel endpoint
    pub fn stream_url(&self) -> Url {
        let mut url = self.at(STREAM_PATH);
        let ws = if url.scheme() == "https" { "wss" } else { "ws" };
        // http(s) -> ws(s) stays within the special schemes
        let _ = url.set_scheme(ws);
        url
    }

    /// Prediction request target for `path`
    pub fn http_url(&self, path: &str) -> Url {
        self.at(path)
    }

    /// REST base for prediction requests, always ending in `/`
    pub fn http_base(&self) -> Url {
        self.at("")
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}
