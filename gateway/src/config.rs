//! Gateway configuration from the environment
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `ORBIT_GATEWAY_PORT` / `PORT` | `8000` | Listen port |
//! | `ASTROALERT_UPDATE_INTERVAL_MS` | `2000` | Minimum catalog tick period |
//! | `ASTROALERT_PREDICTION_MODE` | `local` | `local` scores in-process, `remote` calls the backend |
//! | `ASTROALERT_BACKEND_URL` | `ws://localhost:8000` | Remote prediction target |
//! | `ASTROALERT_PREDICTION_TIMEOUT_MS` | `5000` | Remote prediction timeout |

use std::time::Duration;

use anyhow::{bail, Context, Result};
use orbit_tracking::BackendConfig;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionMode {
    Local,
    Remote,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub update_interval: Duration,
    pub prediction_mode: PredictionMode,
    pub backend: BackendConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let port = match lookup("ORBIT_GATEWAY_PORT").or_else(|| lookup("PORT")) {
            Some(raw) => raw.trim().parse().with_context(|| format!("invalid port {raw:?}"))?,
            None => DEFAULT_PORT,
        };

        let update_interval = match lookup("ASTROALERT_UPDATE_INTERVAL_MS") {
            Some(raw) => {
                let ms: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid update interval {raw:?}"))?;
                if ms == 0 {
                    bail!("update interval must be positive");
                }
                Duration::from_millis(ms)
            }
            None => DEFAULT_UPDATE_INTERVAL,
        };

        let prediction_mode = match lookup("ASTROALERT_PREDICTION_MODE").as_deref().map(str::trim) {
            None | Some("local") => PredictionMode::Local,
            Some("remote") => PredictionMode::Remote,
            Some(other) => bail!("unknown prediction mode {other:?}"),
        };

        let backend = BackendConfig::from_lookup(&lookup)?;

        Ok(Self {
            port,
            update_interval,
            prediction_mode,
            backend,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<GatewayConfig> {
        let map: HashMap<&str, &str> = pairs.iter().copied().collect();
        GatewayConfig::from_lookup(|key: &str| map.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();

        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8000");
        assert_eq!(cfg.update_interval, Duration::from_secs(2));
        assert_eq!(cfg.prediction_mode, PredictionMode::Local);
        assert_eq!(cfg.backend.http_base().as_str(), "http://localhost:8000/");
    }

    #[test]
    fn test_port_precedence() {
        assert_eq!(config(&[("PORT", "9100")]).unwrap().port, 9100);
        assert_eq!(
            config(&[("PORT", "9100"), ("ORBIT_GATEWAY_PORT", "9200")]).unwrap().port,
            9200
        );
    }

    #[test]
    fn test_remote_mode_with_backend() {
        let cfg = config(&[
            ("ASTROALERT_PREDICTION_MODE", "remote"),
            ("ASTROALERT_BACKEND_URL", "wss://alerts.example.org"),
        ])
        .unwrap();

        assert_eq!(cfg.prediction_mode, PredictionMode::Remote);
        assert_eq!(cfg.backend.http_base().as_str(), "https://alerts.example.org/");
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("ASTROALERT_UPDATE_INTERVAL_MS", "0")]).is_err());
        assert!(config(&[("ASTROALERT_PREDICTION_MODE", "cloud")]).is_err());
        assert!(config(&[("ASTROALERT_BACKEND_URL", "localhost")]).is_err());
    }
}
