//! Frame pipeline: catalog → filter → sampler → surface

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::filter::filter_objects;
use crate::model::{FilterState, TrackedObject};
use crate::render::{directive_for, RenderSurface};
use crate::sampler::{PositionSampler, SampledTrajectory, TrajectoryCache};

#[derive(Debug, Default)]
pub struct TrackingPipeline {
    trajectories: TrajectoryCache,
}

impl TrackingPipeline {
    pub fn new(sampler: PositionSampler) -> Self {
        Self {
            trajectories: TrajectoryCache::new(sampler),
        }
    }

    pub fn trajectories(&self) -> &TrajectoryCache {
        &self.trajectories
    }

    /// Current trajectory for one object, sampled on demand
    pub fn trajectory(&mut self, object: &TrackedObject, now: DateTime<Utc>) -> &SampledTrajectory {
        self.trajectories.refresh(object, now)
    }

    /// Redraw the visible subset; returns how many objects were drawn.
    pub fn render_frame<S: RenderSurface>(
        &mut self,
        objects: &[TrackedObject],
        filter: &FilterState,
        now: DateTime<Utc>,
        surface: &mut S,
    ) -> usize {
        let visible = filter_objects(objects, filter);
        self.trajectories.retain(visible.iter().map(|o| o.id.as_str()));

        surface.clear();
        for object in &visible {
            let trajectory = self.trajectories.refresh(object, now);
            surface.draw(directive_for(object, trajectory));
        }

        debug!("Rendered {}/{} objects", visible.len(), objects.len());
        visible.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::OrbitClass;
    use crate::model::ObjectType;
    use crate::render::DrawDirective;
    use chrono::Duration;
    use collision_avoidance::RiskLevel;
    use nalgebra::Vector3;
    use orbital_mechanics::EARTH_RADIUS_M;

    #[derive(Default)]
    struct RecordingSurface {
        clears: usize,
        drawn: Vec<(String, usize, DateTime<Utc>)>,
    }

    impl RenderSurface for RecordingSurface {
        fn clear(&mut self) {
            self.clears += 1;
            self.drawn.clear();
        }

        fn draw(&mut self, directive: DrawDirective<'_>) {
            self.drawn.push((
                directive.object_id.to_string(),
                directive.trajectory.samples().len(),
                directive.trajectory.validity().0,
            ));
        }
    }

    fn objects() -> Vec<TrackedObject> {
        vec![
            TrackedObject::new(
                "25544",
                "ISS (ZARYA)",
                "25544",
                ObjectType::Satellite,
                RiskLevel::Low,
                Vector3::new(EARTH_RADIUS_M + 408_000.0, 0.0, 0.0),
                Vector3::new(0.0, 7_660.0, 0.0),
            ),
            TrackedObject::new(
                "37753",
                "GPS IIF-2",
                "37753",
                ObjectType::Satellite,
                RiskLevel::Low,
                Vector3::new(EARTH_RADIUS_M + 20_200_000.0, 0.0, 0.0),
                Vector3::new(0.0, 3_870.0, 0.0),
            ),
        ]
    }

    #[test]
    fn test_render_frame_draws_filtered_subset() {
        let mut pipeline = TrackingPipeline::default();
        let mut surface = RecordingSurface::default();
        let now = Utc::now();

        let all = pipeline.render_frame(&objects(), &FilterState::new(), now, &mut surface);
        assert_eq!(all, 2);
        assert_eq!(pipeline.trajectories().len(), 2);

        let leo = FilterState::new().with_orbit_classes([OrbitClass::Leo]);
        let drawn = pipeline.render_frame(&objects(), &leo, now, &mut surface);

        assert_eq!(drawn, 1);
        assert_eq!(surface.clears, 2);
        assert_eq!(surface.drawn.len(), 1);
        assert_eq!(surface.drawn[0].0, "25544");
        assert_eq!(surface.drawn[0].1, 13);
        assert_eq!(pipeline.trajectories().len(), 1);
    }

    #[test]
    fn test_render_frame_keeps_window_until_state_changes() {
        let mut pipeline = TrackingPipeline::default();
        let mut surface = RecordingSurface::default();
        let now = Utc::now();
        let mut catalog = objects();

        pipeline.render_frame(&catalog, &FilterState::new(), now, &mut surface);
        pipeline.render_frame(&catalog, &FilterState::new(), now + Duration::seconds(10), &mut surface);
        assert!(surface.drawn.iter().all(|(_, _, start)| *start == now));

        let later = now + Duration::seconds(20);
        catalog[0].update_state(Vector3::new(EARTH_RADIUS_M + 408_000.0, 1_000.0, 0.0), Vector3::new(-1.0, 7_660.0, 0.0));
        pipeline.render_frame(&catalog, &FilterState::new(), later, &mut surface);

        assert_eq!(surface.drawn[0].2, later);
        assert_eq!(surface.drawn[1].2, now);
    }
}
