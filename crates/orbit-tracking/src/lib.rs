//! Orbit Tracking Core
//!
//! Real-time object tracking and risk alerting for the AstroAlert operator
//! dashboard:
//! - Position sampling of short animation windows per tracked object
//! - Search and orbit-class filtering of the visible catalog
//! - Risk and orbit-class classification for display
//! - A bounded, most-recent-first alert log fed by the push channel
//! - Forecast timelines of collision probability for the selected object
//! - A WebSocket client for a remote backend's push channel
//!
//! # Data Flow
//!
//! ```text
//! TrackedObject set ─▶ filter ─▶ sampler ─▶ RenderSurface
//! push channel ─▶ AlertStreamHandler ─▶ AlertLog ─▶ watch/broadcast readers
//! selection ─▶ SelectionController ─▶ timeline + RiskPredictor
//! ```
//!
//! Everything here is single-owner and driven from one task. Readers get
//! snapshots through channels rather than shared mutable state.

pub mod alerts;
pub mod classifier;
pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod pipeline;
pub mod prediction;
pub mod render;
pub mod sampler;
pub mod selection;
pub mod timeline;
pub mod transport;

pub use alerts::{AlertFeed, AlertLog, AlertStreamHandler, AlertTransport, ConnectionState, StreamMessage};
pub use classifier::{classify, Classification, OrbitClass, SeverityColor};
pub use collision_avoidance::{RiskLevel, RiskPrediction};
pub use config::BackendConfig;
pub use error::{Result, TrackingError};
pub use filter::filter_objects;
pub use model::{AlertEvent, FilterState, ObjectType, PositionSample, Severity, TimelinePoint, TrackedObject};
pub use pipeline::TrackingPipeline;
pub use prediction::{features_for, HttpRiskPredictor, RiskPredictor};
pub use render::{DrawDirective, PathStyle, PointStyle, RenderSurface};
pub use sampler::{PositionSampler, SampledTrajectory, SamplerConfig, TrajectoryCache};
pub use selection::{PredictionState, Selection, SelectionController, SelectionTicket};
pub use timeline::RiskTimelineGenerator;
pub use transport::WebSocketTransport;
