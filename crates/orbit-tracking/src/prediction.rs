//! Risk-prediction client
//!
//! The prediction service is request/response: post the features of the
//! selected object, get back a [`RiskPrediction`]. Every failure mode
//! collapses into [`TrackingError::PredictionRequest`] so the dashboard can
//! show "no prediction available" and retry on the next selection.

use std::future::Future;

use chrono::Utc;
use collision_avoidance::{ManeuverFeatures, RiskPrediction};
use orbital_mechanics::StateVector;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use crate::config::BackendConfig;
use crate::error::{Result, TrackingError};
use crate::model::TrackedObject;

pub trait RiskPredictor {
    fn predict(&self, object: &TrackedObject) -> impl Future<Output = Result<RiskPrediction>> + Send;
}

/// Request body for `object`.
///
/// Geometry comes from the object's state; conjunction distance and lead time
/// keep the service defaults since the dashboard has no pairing of its own.
pub fn features_for(object: &TrackedObject) -> ManeuverFeatures {
    let state = StateVector::new(object.position, object.velocity, Utc::now());

    ManeuverFeatures {
        object_id: object.id.clone(),
        velocity_kmps: state.speed() / 1000.0,
        altitude: state.altitude_m() / 1000.0,
        inclination: state.inclination_deg(),
        ..ManeuverFeatures::default()
    }
}

#[derive(Debug, Clone)]
pub struct HttpRiskPredictor {
    client: Client,
    backend: BackendConfig,
}

impl HttpRiskPredictor {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("orbit-tracking/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TrackingError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            client,
            backend: config.clone(),
        })
    }

    pub fn endpoint(&self, object_id: &str) -> Url {
        self.backend.http_url(&format!("/objects/{object_id}/suggest_maneuver"))
    }

    async fn request(&self, object_id: String, features: ManeuverFeatures) -> Result<RiskPrediction> {
        let url = self.endpoint(&object_id);
        debug!("Requesting prediction: {}", url);

        let response = self
            .client
            .post(url)
            .json(&features)
            .send()
            .await
            .map_err(|e| TrackingError::prediction(&object_id, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Prediction for {} returned {}", object_id, status);
            return Err(TrackingError::prediction(&object_id, format!("service returned {status}")));
        }

        response
            .json::<RiskPrediction>()
            .await
            .map_err(|e| TrackingError::prediction(&object_id, e))
    }
}

impl RiskPredictor for HttpRiskPredictor {
    fn predict(&self, object: &TrackedObject) -> impl Future<Output = Result<RiskPrediction>> + Send {
        let object_id = object.id.clone();
        let features = features_for(object);
        self.request(object_id, features)
    }
}
