use anyhow::{Context, Result};
use axum::{routing::get, Router};
use chrono::Utc;
use orbit_tracking::{AlertStreamHandler, HttpRiskPredictor, WebSocketTransport};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod catalog;
mod config;
mod dashboard_routes;
mod realtime;
mod routes;

use catalog::Catalog;
use config::{GatewayConfig, PredictionMode};
use dashboard_routes::{DashboardPredictor, DashboardState, ModelRiskPredictor};
use realtime::{AlertHub, HubTransport};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<RwLock<Catalog>>,
    pub hub: AlertHub,
    pub dashboard: Arc<DashboardState>,
}

impl AppState {
    /// State scoring predictions in-process. The returned handler must be
    /// driven for the dashboard alert log to fill.
    pub fn new(catalog: Catalog) -> (Self, AlertStreamHandler) {
        let catalog = Arc::new(RwLock::new(catalog));
        let predictor = DashboardPredictor::Local(ModelRiskPredictor::new(Arc::clone(&catalog)));
        Self::build(catalog, predictor)
    }

    pub fn with_remote_predictor(catalog: Catalog, predictor: HttpRiskPredictor) -> (Self, AlertStreamHandler) {
        Self::build(Arc::new(RwLock::new(catalog)), DashboardPredictor::Remote(predictor))
    }

    fn build(catalog: Arc<RwLock<Catalog>>, predictor: DashboardPredictor) -> (Self, AlertStreamHandler) {
        let handler = AlertStreamHandler::new();
        let dashboard = DashboardState::new(handler.subscribe(), predictor);

        let state = Self {
            catalog,
            hub: AlertHub::new(),
            dashboard: Arc::new(dashboard),
        };
        (state, handler)
    }
}

pub fn app(state: AppState) -> Router {
    routes::router()
        .route("/ws/orbits", get(realtime::ws_orbits))
        .nest("/dashboard", dashboard_routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "orbit_gateway=debug,orbit_tracking=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env()?;

    let catalog = Catalog::seeded(Utc::now());
    tracing::info!("   Catalog seeded with {} objects", catalog.objects().len());

    let state = match config.prediction_mode {
        PredictionMode::Local => {
            let (state, handler) = AppState::new(catalog);
            tokio::spawn(realtime::run_dashboard_feed(handler, HubTransport::new(state.hub.clone())));
            state
        }
        PredictionMode::Remote => {
            let predictor = HttpRiskPredictor::new(&config.backend).context("building prediction client")?;
            let transport = WebSocketTransport::new(&config.backend);
            tracing::info!("   Predictions from {}", config.backend.http_base());
            tracing::info!("   Dashboard alerts from {}", transport.url());

            let (state, handler) = AppState::with_remote_predictor(catalog, predictor);
            tokio::spawn(realtime::run_dashboard_feed(handler, transport));
            state
        }
    };

    tokio::spawn(realtime::run_alert_notifier(state.dashboard.alerts.notifications()));
    tokio::spawn(realtime::run_update_loop(state.clone(), config.update_interval));

    let app = app(state);

    let addr = config.bind_addr();
    tracing::info!("🛰️  AstroAlert gateway listening on {}", addr);
    tracing::info!("   Push channel: ws://{}/ws/orbits", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
