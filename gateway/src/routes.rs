use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use collision_avoidance::{CollisionError, ManeuverFeatures, RiskModel, RiskPrediction};
use orbit_tracking::{features_for, AlertEvent, TrackedObject};
use serde::Deserialize;
use tracing::info;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/objects", get(list_objects))
        .route("/objects/:id", get(get_object))
        .route("/objects/:id/suggest_maneuver", post(suggest_maneuver))
        .route("/alerts", get(list_alerts))
}

pub(crate) fn not_found(id: &str) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("Object not found: {}", id))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "orbit-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_objects(State(state): State<AppState>) -> Json<Vec<TrackedObject>> {
    let objects = state.catalog.read().await.objects().to_vec();
    Json(objects)
}

async fn get_object(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrackedObject>, (StatusCode, String)> {
    let object = state.catalog.read().await.get(&id).cloned();
    object.map(Json).ok_or_else(|| not_found(&id))
}

/// Posted maneuver features. Omitted fields come from the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManeuverRequest {
    pub distance_km: Option<f64>,
    pub velocity_kmps: Option<f64>,
    pub altitude: Option<f64>,
    pub inclination: Option<f64>,
    pub time_to_conjunction: Option<f64>,
}

impl ManeuverRequest {
    /// Posted values win over `fallback`
    fn over(self, fallback: ManeuverFeatures) -> ManeuverFeatures {
        ManeuverFeatures {
            object_id: fallback.object_id,
            distance_km: self.distance_km.unwrap_or(fallback.distance_km),
            velocity_kmps: self.velocity_kmps.unwrap_or(fallback.velocity_kmps),
            altitude: self.altitude.unwrap_or(fallback.altitude),
            inclination: self.inclination.unwrap_or(fallback.inclination),
            time_to_conjunction: self.time_to_conjunction.unwrap_or(fallback.time_to_conjunction),
        }
    }
}

/// Score the posted features. Missing fields are taken from the object's
/// orbit and its closest live conjunction.
async fn suggest_maneuver(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ManeuverRequest>,
) -> Result<Json<RiskPrediction>, (StatusCode, String)> {
    let features = {
        let catalog = state.catalog.read().await;
        let object = catalog.get(&id).ok_or_else(|| not_found(&id))?;
        request.over(catalog.maneuver_features(&id, features_for(object)))
    };

    let prediction = RiskModel::new().predict(&features).map_err(|e| match e {
        CollisionError::InvalidFeature { .. } => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
    })?;

    info!("Maneuver for {}: {} ({:.2})", id, prediction.risk_level, prediction.probability);
    Ok(Json(prediction))
}

async fn list_alerts(State(state): State<AppState>) -> Json<Vec<AlertEvent>> {
    let alerts = state.catalog.read().await.alerts();
    Json(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use collision_avoidance::RiskLevel;
    use tower::ServiceExt;

    fn app() -> Router {
        let (state, _handler) = AppState::new(Catalog::seeded(Utc::now()));
        crate::app(state)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "healthy");
    }

    #[tokio::test]
    async fn test_objects_and_lookup() {
        let app = app();

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/objects").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let objects = body_json(response).await;
        assert_eq!(objects.as_array().unwrap().len(), 5);
        assert_eq!(objects[0]["type"], "satellite");
        assert_eq!(objects[0]["position"].as_array().unwrap().len(), 3);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/objects/48274").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "COSMOS 2251 DEB");

        let response = app
            .oneshot(Request::builder().uri("/objects/00000").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    async fn post_maneuver(id: &str, body: serde_json::Value) -> axum::response::Response {
        app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/objects/{id}/suggest_maneuver"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_suggest_maneuver_scores_posted_features() {
        let body = serde_json::json!({
            "object_id": "25544",
            "distance_km": 0.0,
            "velocity_kmps": 10.0,
            "altitude": 408.0,
            "inclination": 51.6,
            "time_to_conjunction": 0.0
        });

        let response = post_maneuver("25544", body).await;

        assert_eq!(response.status(), StatusCode::OK);
        let prediction: RiskPrediction = serde_json::from_value(body_json(response).await).unwrap();
        assert!(prediction.probability >= 0.0 && prediction.probability <= 1.0);
        assert_ne!(prediction.maneuver_suggestion, "");
        assert_eq!(prediction.feature_importance.len(), 5);
        assert_eq!(prediction.risk_level, RiskLevel::High);
    }

    #[tokio::test]
    async fn test_suggest_maneuver_fills_missing_from_live_conjunction() {
        // The co-orbiting debris closes at well under 1 m/s
        let response = post_maneuver("25544", serde_json::json!({})).await;

        assert_eq!(response.status(), StatusCode::OK);
        let prediction: RiskPrediction = serde_json::from_value(body_json(response).await).unwrap();
        assert_eq!(prediction.risk_level, RiskLevel::Low);
    }

    #[tokio::test]
    async fn test_suggest_maneuver_rejects_negative_distance() {
        let response = post_maneuver("25544", serde_json::json!({ "distance_km": -1.0 })).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_posted_fields_win_over_fallback() {
        let request = ManeuverRequest {
            distance_km: Some(2.0),
            altitude: Some(550.0),
            ..ManeuverRequest::default()
        };
        let fallback = ManeuverFeatures {
            object_id: "25544".into(),
            ..ManeuverFeatures::default()
        };

        let features = request.over(fallback.clone());
        assert_eq!(features.object_id, "25544");
        assert_eq!(features.distance_km, 2.0);
        assert_eq!(features.altitude, 550.0);
        assert_eq!(features.velocity_kmps, fallback.velocity_kmps);
        assert_eq!(features.time_to_conjunction, fallback.time_to_conjunction);
    }

    #[tokio::test]
    async fn test_suggest_maneuver_unknown_object() {
        let response = post_maneuver("nope", serde_json::json!({})).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_alerts_start_empty() {
        let response = app()
            .oneshot(Request::builder().uri("/alerts").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(body_json(response).await, serde_json::json!([]));
    }
}
