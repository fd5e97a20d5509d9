//! Operator Dashboard API
//!
//! Drives the tracking core the way the dashboard UI does: one filter, one
//! trajectory cache, one selection, and an alert log fed by the push channel.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/dashboard/filter` | GET, PUT | Read or replace the filter |
//! | `/dashboard/filter/orbit/:class` | POST | Toggle one orbit class |
//! | `/dashboard/objects` | GET | Visible objects with their classification |
//! | `/dashboard/objects/:id/trajectory` | GET | Sampled animation window |
//! | `/dashboard/frame` | GET | Draw commands for the visible set |
//! | `/dashboard/alerts` | GET | Live alert log and connection state |
//! | `/dashboard/selection` | GET, POST, DELETE | Selected object, timeline, prediction |

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use collision_avoidance::RiskModel;
use nalgebra::Vector3;
use orbital_mechanics::{GeodeticPosition, StateVector};
use orbit_tracking::prediction::features_for;
use orbit_tracking::render::{DrawDirective, PathStyle, PointStyle, RenderSurface};
use orbit_tracking::{
    classify, filter_objects, AlertEvent, AlertFeed, Classification, ConnectionState, FilterState,
    HttpRiskPredictor, OrbitClass, PositionSample, RiskPrediction, RiskPredictor, Selection,
    SelectionController, TrackedObject, TrackingError, TrackingPipeline,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::routes::not_found;
use crate::AppState;

// ============================================================================
// Prediction
// ============================================================================

/// Scores the object's closest live conjunction in-process
#[derive(Clone)]
pub struct ModelRiskPredictor {
    catalog: Arc<RwLock<Catalog>>,
    model: RiskModel,
}

impl ModelRiskPredictor {
    pub fn new(catalog: Arc<RwLock<Catalog>>) -> Self {
        Self {
            catalog,
            model: RiskModel::new(),
        }
    }
}

impl RiskPredictor for ModelRiskPredictor {
    fn predict(&self, object: &TrackedObject) -> impl Future<Output = orbit_tracking::Result<RiskPrediction>> + Send {
        let catalog = Arc::clone(&self.catalog);
        let model = self.model;
        let object_id = object.id.clone();
        let base = features_for(object);

        async move {
            let features = catalog.read().await.maneuver_features(&object_id, base);
            model
                .predict(&features)
                .map_err(|e| TrackingError::prediction(&object_id, e))
        }
    }
}

pub enum DashboardPredictor {
    Local(ModelRiskPredictor),
    Remote(HttpRiskPredictor),
}

impl RiskPredictor for DashboardPredictor {
    fn predict(&self, object: &TrackedObject) -> impl Future<Output = orbit_tracking::Result<RiskPrediction>> + Send {
        async move {
            match self {
                Self::Local(p) => p.predict(object).await,
                Self::Remote(p) => p.predict(object).await,
            }
        }
    }
}

// ============================================================================
// State
// ============================================================================

pub struct DashboardState {
    pub filter: RwLock<FilterState>,
    pub pipeline: Mutex<TrackingPipeline>,
    pub selection: Mutex<SelectionController>,
    pub alerts: AlertFeed,
    pub predictor: DashboardPredictor,
}

impl DashboardState {
    pub fn new(alerts: AlertFeed, predictor: DashboardPredictor) -> Self {
        Self {
            filter: RwLock::new(FilterState::new()),
            pipeline: Mutex::new(TrackingPipeline::default()),
            selection: Mutex::new(SelectionController::default()),
            alerts,
            predictor,
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/filter", get(get_filter).put(put_filter))
        .route("/filter/orbit/:class", post(toggle_orbit_class))
        .route("/objects", get(visible_objects))
        .route("/objects/:id/trajectory", get(trajectory))
        .route("/frame", get(frame))
        .route("/alerts", get(alerts))
        .route(
            "/selection",
            get(current_selection).post(select_object).delete(clear_selection),
        )
}

// ============================================================================
// Filter
// ============================================================================

async fn get_filter(State(state): State<AppState>) -> Json<FilterState> {
    let filter = state.dashboard.filter.read().await.clone();
    Json(filter)
}

async fn put_filter(State(state): State<AppState>, Json(filter): Json<FilterState>) -> Json<FilterState> {
    *state.dashboard.filter.write().await = filter.clone();
    debug!("Filter replaced: {:?}", filter);
    Json(filter)
}

async fn toggle_orbit_class(
    State(state): State<AppState>,
    Path(class): Path<String>,
) -> Result<Json<FilterState>, (StatusCode, String)> {
    let class: OrbitClass = class.parse().map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let mut filter = state.dashboard.filter.write().await;
    filter.toggle_orbit_class(class);
    Ok(Json(filter.clone()))
}

// ============================================================================
// Objects and trajectories
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ObjectQuery {
    pub search: Option<String>,
    /// Comma-separated orbit classes, e.g. `LEO,MEO`
    pub orbit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ClassifiedObject {
    #[serde(flatten)]
    pub object: TrackedObject,
    pub altitude_km: f64,
    /// Sub-satellite point; absent for a non-finite state
    pub ground_track: Option<GeodeticPosition>,
    pub classification: Classification,
}

impl ClassifiedObject {
    fn new(object: &TrackedObject) -> Self {
        let state = StateVector::new(object.position, object.velocity, Utc::now());
        let ground_track = match state.ground_track() {
            Ok(track) => Some(track),
            Err(e) => {
                debug!("No ground track for {}: {}", object.id, e);
                None
            }
        };

        Self {
            altitude_km: object.altitude_m() / 1000.0,
            ground_track,
            classification: classify(object),
            object: object.clone(),
        }
    }
}

fn parse_orbit_classes(raw: &str) -> Result<BTreeSet<OrbitClass>, (StatusCode, String)> {
    raw.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| part.parse::<OrbitClass>().map_err(|e| (StatusCode::BAD_REQUEST, e)))
        .collect()
}

/// Stored filter with any query overrides applied
async fn effective_filter(state: &AppState, query: &ObjectQuery) -> Result<FilterState, (StatusCode, String)> {
    let mut filter = state.dashboard.filter.read().await.clone();
    if let Some(search) = &query.search {
        filter.set_search(search.clone());
    }
    if let Some(orbit) = &query.orbit {
        filter.set_orbit_classes(parse_orbit_classes(orbit)?);
    }
    Ok(filter)
}

async fn visible_objects(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
) -> Result<Json<Vec<ClassifiedObject>>, (StatusCode, String)> {
    let filter = effective_filter(&state, &query).await?;
    let catalog = state.catalog.read().await;

    let visible = filter_objects(catalog.objects(), &filter)
        .into_iter()
        .map(ClassifiedObject::new)
        .collect();

    Ok(Json(visible))
}

#[derive(Debug, Serialize)]
pub struct TrajectoryView {
    pub object_id: String,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub position: Option<Vector3<f64>>,
    pub samples: Vec<PositionSample>,
}

async fn trajectory(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TrajectoryView>, (StatusCode, String)> {
    let object = state.catalog.read().await.get(&id).cloned();
    let object = object.ok_or_else(|| not_found(&id))?;

    let now = Utc::now();
    let mut pipeline = state.dashboard.pipeline.lock().await;
    let trajectory = pipeline.trajectory(&object, now);
    let (valid_from, valid_until) = trajectory.validity();

    Ok(Json(TrajectoryView {
        object_id: id,
        valid_from,
        valid_until,
        position: trajectory.position_at(now),
        samples: trajectory.samples().to_vec(),
    }))
}

// ============================================================================
// Frame
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DrawCommand {
    pub object_id: String,
    pub label: String,
    pub point: PointStyle,
    pub path: PathStyle,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub position: Option<Vector3<f64>>,
    pub samples: Vec<PositionSample>,
}

/// Records draw directives as JSON-ready commands
struct JsonSurface {
    now: DateTime<Utc>,
    commands: Vec<DrawCommand>,
}

impl RenderSurface for JsonSurface {
    fn clear(&mut self) {
        self.commands.clear();
    }

    fn draw(&mut self, directive: DrawDirective<'_>) {
        let (valid_from, valid_until) = directive.trajectory.validity();
        self.commands.push(DrawCommand {
            object_id: directive.object_id.to_string(),
            label: directive.label.to_string(),
            point: directive.point,
            path: directive.path,
            valid_from,
            valid_until,
            position: directive.trajectory.position_at(self.now),
            samples: directive.trajectory.samples().to_vec(),
        });
    }
}

#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub timestamp: DateTime<Utc>,
    pub drawn: usize,
    pub commands: Vec<DrawCommand>,
}

async fn frame(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
) -> Result<Json<FrameResponse>, (StatusCode, String)> {
    let filter = effective_filter(&state, &query).await?;
    let objects = state.catalog.read().await.objects().to_vec();

    let now = Utc::now();
    let mut surface = JsonSurface {
        now,
        commands: Vec::new(),
    };
    let drawn = state
        .dashboard
        .pipeline
        .lock()
        .await
        .render_frame(&objects, &filter, now, &mut surface);

    Ok(Json(FrameResponse {
        timestamp: now,
        drawn,
        commands: surface.commands,
    }))
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DashboardAlerts {
    pub connection: ConnectionState,
    pub alerts: Vec<AlertEvent>,
}

async fn alerts(State(state): State<AppState>) -> Json<DashboardAlerts> {
    let feed = &state.dashboard.alerts;
    Json(DashboardAlerts {
        connection: feed.connection_state(),
        alerts: feed.current_log().to_vec(),
    })
}

// ============================================================================
// Selection
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub object_id: String,
}

#[derive(Debug, Serialize)]
pub struct SelectionResponse {
    /// False when a newer selection superseded this request
    pub applied: bool,
    pub selection: Option<Selection>,
}

async fn current_selection(State(state): State<AppState>) -> Json<Option<Selection>> {
    let selection = state.dashboard.selection.lock().await.current().cloned();
    Json(selection)
}

async fn select_object(
    State(state): State<AppState>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<SelectionResponse>, (StatusCode, String)> {
    let object = state.catalog.read().await.get(&request.object_id).cloned();
    let object = object.ok_or_else(|| not_found(&request.object_id))?;

    let ticket = state.dashboard.selection.lock().await.select(&object, Utc::now());

    // Lock released while the predictor runs
    let result = state.dashboard.predictor.predict(&object).await;

    let mut selection = state.dashboard.selection.lock().await;
    let applied = selection.complete(&ticket, result);
    info!("Selected {} (prediction applied: {})", object.id, applied);

    Ok(Json(SelectionResponse {
        applied,
        selection: selection.current().cloned(),
    }))
}

async fn clear_selection(State(state): State<AppState>) -> StatusCode {
    state.dashboard.selection.lock().await.clear();
    StatusCode::NO_CONTENT
}
