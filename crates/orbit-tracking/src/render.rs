//! Rendering surface binding
//!
//! The globe itself is an external collaborator. It receives one
//! [`DrawDirective`] per visible object per frame.

use std::time::Duration;

use crate::classifier::{risk_color, SeverityColor};
use crate::model::{ObjectType, TrackedObject};
use crate::sampler::SampledTrajectory;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointStyle {
    pub pixel_size: u32,
    pub color: SeverityColor,
    pub outline: bool,
}

/// Trailing path drawn behind (and ahead of) the moving point
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathStyle {
    pub width: f64,
    pub lead_time: Duration,
    pub trail_time: Duration,
    pub color: SeverityColor,
}

#[derive(Debug, Clone, Copy)]
pub struct DrawDirective<'a> {
    pub object_id: &'a str,
    pub label: &'a str,
    pub trajectory: &'a SampledTrajectory,
    pub point: PointStyle,
    pub path: PathStyle,
}

pub trait RenderSurface {
    /// Remove everything drawn by the previous frame
    fn clear(&mut self);

    fn draw(&mut self, directive: DrawDirective<'_>);
}

pub fn point_style(object: &TrackedObject) -> PointStyle {
    PointStyle {
        pixel_size: match object.object_type {
            ObjectType::Satellite => 10,
            ObjectType::Debris => 6,
        },
        color: risk_color(object.risk_level),
        outline: object.object_type == ObjectType::Satellite,
    }
}

pub fn path_style(object: &TrackedObject) -> PathStyle {
    PathStyle {
        width: 1.5,
        lead_time: Duration::ZERO,
        trail_time: Duration::from_secs(300),
        color: risk_color(object.risk_level),
    }
}

pub fn directive_for<'a>(object: &'a TrackedObject, trajectory: &'a SampledTrajectory) -> DrawDirective<'a> {
    DrawDirective {
        object_id: &object.id,
        label: &object.name,
        trajectory,
        point: point_style(object),
        path: path_style(object),
    }
}
