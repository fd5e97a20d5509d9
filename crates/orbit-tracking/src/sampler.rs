//! Position Sampler
//!
//! Produces the animation window for one tracked object: a strictly
//! time-ordered run of samples under linear extrapolation from a base
//! position and velocity.
//!
//! ```text
//! sample(i) = P0 + V · (i / velocity_time_scale)      i = 0, step, ..., window
//! ```
//!
//! With the defaults (360 s window, 30 s step, 30 s time scale) a window holds
//! 13 samples. This is a short-horizon visual approximation; it is not orbital
//! propagation.
//!
//! A trajectory is never patched. When an object's base state changes, or its
//! window runs out, the whole sequence is regenerated from the new base.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use nalgebra::Vector3;
use serde::Serialize;
use tracing::debug;

use crate::model::{PositionSample, TrackedObject};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerConfig {
    /// Forward duration covered by one trajectory
    pub window: Duration,
    /// Spacing between samples
    pub step: Duration,
    /// Velocity is applied once per this much elapsed time
    pub velocity_time_scale: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            window: Duration::seconds(360),
            step: Duration::seconds(30),
            velocity_time_scale: Duration::seconds(30),
        }
    }
}

/// The `(P0, V)` a trajectory was generated from
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BaseState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

/// Interpolatable position over a validity interval
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampledTrajectory {
    object_id: String,
    base: BaseState,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    samples: Vec<PositionSample>,
}

impl SampledTrajectory {
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    pub fn base(&self) -> &BaseState {
        &self.base
    }

    pub fn samples(&self) -> &[PositionSample] {
        &self.samples
    }

    /// `[start, end]`; outside it the object is not drawn
    pub fn validity(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start, self.end)
    }

    pub fn is_valid_at(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.end
    }

    /// Linear interpolation between the bracketing samples
    pub fn position_at(&self, t: DateTime<Utc>) -> Option<Vector3<f64>> {
        if !self.is_valid_at(t) {
            return None;
        }

        // First sample strictly after t; t itself lies in [prev, next)
        let next = self.samples.partition_point(|s| s.timestamp <= t);
        if next == 0 {
            return None;
        }
        let prev = &self.samples[next - 1];
        let Some(after) = self.samples.get(next) else {
            return Some(prev.position);
        };

        let span = (after.timestamp - prev.timestamp).num_milliseconds() as f64;
        let into = (t - prev.timestamp).num_milliseconds() as f64;
        let frac = if span > 0.0 { into / span } else { 0.0 };

        Some(prev.position.lerp(&after.position, frac))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PositionSampler {
    config: SamplerConfig,
}

impl PositionSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Sample `[t0, t0 + window]`. Same inputs always yield the same trajectory.
    pub fn sample(
        &self,
        object_id: &str,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        t0: DateTime<Utc>,
    ) -> SampledTrajectory {
        let window_ms = self.config.window.num_milliseconds().max(0);
        let step_ms = self.config.step.num_milliseconds().max(1);
        let scale_s = self.config.velocity_time_scale.num_milliseconds().max(1) as f64 / 1000.0;

        let samples = (0..=window_ms)
            .step_by(step_ms as usize)
            .map(|offset_ms| {
                let offset_s = offset_ms as f64 / 1000.0;
                PositionSample {
                    timestamp: t0 + Duration::milliseconds(offset_ms),
                    position: position + velocity * (offset_s / scale_s),
                }
            })
            .collect();

        SampledTrajectory {
            object_id: object_id.to_string(),
            base: BaseState { position, velocity },
            start: t0,
            end: t0 + Duration::milliseconds(window_ms),
            samples,
        }
    }

    pub fn sample_object(&self, object: &TrackedObject, t0: DateTime<Utc>) -> SampledTrajectory {
        self.sample(&object.id, object.position, object.velocity, t0)
    }
}

/// One trajectory per visible object, owned by the render binding
#[derive(Debug, Default)]
pub struct TrajectoryCache {
    sampler: PositionSampler,
    trajectories: HashMap<String, SampledTrajectory>,
}

impl TrajectoryCache {
    pub fn new(sampler: PositionSampler) -> Self {
        Self {
            sampler,
            trajectories: HashMap::new(),
        }
    }

    /// Current trajectory for `object`, regenerated from `now` when the base
    /// state changed or the window expired.
    pub fn refresh(&mut self, object: &TrackedObject, now: DateTime<Utc>) -> &SampledTrajectory {
        let base = BaseState {
            position: object.position,
            velocity: object.velocity,
        };

        let stale = match self.trajectories.get(&object.id) {
            Some(existing) => existing.base != base || existing.is_expired(now),
            None => true,
        };

        if stale {
            debug!("Regenerating trajectory for {}", object.id);
            let trajectory = self.sampler.sample_object(object, now);
            self.trajectories.insert(object.id.clone(), trajectory);
        }

        &self.trajectories[&object.id]
    }

    pub fn get(&self, object_id: &str) -> Option<&SampledTrajectory> {
        self.trajectories.get(object_id)
    }

    /// Drop bindings for objects no longer visible
    pub fn retain<'a>(&mut self, visible_ids: impl IntoIterator<Item = &'a str>) {
        let keep: std::collections::HashSet<&str> = visible_ids.into_iter().collect();
        self.trajectories.retain(|id, _| keep.contains(id.as_str()));
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}
