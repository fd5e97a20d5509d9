//! Simulated Tracked-Object Catalog
//!
//! Stands in for a live tracking feed. Objects move on circular orbits,
//! every tick re-screens all pairs for conjunctions, and each object's risk
//! level is its worst current conjunction.
//!
//! | NORAD | Name | Type | Alt (km) | Inc (deg) |
//! |-------|------|------|----------|-----------|
//! | 25544 | ISS (ZARYA) | satellite | 408 | 51.6 |
//! | 48274 | COSMOS 2251 DEB | debris | 408.5 | 51.6 |
//! | 33692 | FENGYUN 1C DEB | debris | 420 | 98.5 |
//! | 37753 | GPS IIF-2 | satellite | 20,200 | 55.0 |
//! | 26824 | INTELSAT 901 | satellite | 35,787 | 0.0 |
//!
//! COSMOS 2251 DEB trails the ISS by a few kilometers so the dashboard has a
//! live conjunction to show.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use collision_avoidance::{ConjunctionEvent, ConjunctionScreen, ManeuverFeatures, RiskLevel, SpaceObject};
use orbit_tracking::{AlertEvent, ObjectType, Severity, TrackedObject};
use orbital_mechanics::propagation::{advance_circular, circular_state};
use orbital_mechanics::StateVector;
use tracing::{debug, info, warn};

/// Server-side alert history cap
pub const ALERT_HISTORY_LIMIT: usize = 100;

/// Minimum spacing between generated alerts
pub const ALERT_COOLDOWN_S: i64 = 10;

struct Seed {
    id: &'static str,
    name: &'static str,
    object_type: ObjectType,
    altitude_km: f64,
    inclination_deg: f64,
    raan_deg: f64,
    arg_latitude_deg: f64,
}

const SEEDS: [Seed; 5] = [
    Seed {
        id: "25544",
        name: "ISS (ZARYA)",
        object_type: ObjectType::Satellite,
        altitude_km: 408.0,
        inclination_deg: 51.6,
        raan_deg: 0.0,
        arg_latitude_deg: 0.05,
    },
    Seed {
        id: "48274",
        name: "COSMOS 2251 DEB",
        object_type: ObjectType::Debris,
        altitude_km: 408.5,
        inclination_deg: 51.6,
        raan_deg: 0.0,
        arg_latitude_deg: 0.0,
    },
    Seed {
        id: "33692",
        name: "FENGYUN 1C DEB",
        object_type: ObjectType::Debris,
        altitude_km: 420.0,
        inclination_deg: 98.5,
        raan_deg: 40.0,
        arg_latitude_deg: 120.0,
    },
    Seed {
        id: "37753",
        name: "GPS IIF-2",
        object_type: ObjectType::Satellite,
        altitude_km: 20_200.0,
        inclination_deg: 55.0,
        raan_deg: 120.0,
        arg_latitude_deg: 0.0,
    },
    Seed {
        id: "26824",
        name: "INTELSAT 901",
        object_type: ObjectType::Satellite,
        altitude_km: 35_787.0,
        inclination_deg: 0.0,
        raan_deg: 0.0,
        arg_latitude_deg: 300.0,
    },
];

pub struct Catalog {
    objects: Vec<TrackedObject>,
    conjunctions: Vec<ConjunctionEvent>,
    alerts: VecDeque<AlertEvent>,
    last_alert: Option<DateTime<Utc>>,
    screen: ConjunctionScreen,
    epoch: DateTime<Utc>,
}

impl Catalog {
    /// The built-in demo catalog at `now`
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let objects = SEEDS
            .iter()
            .map(|seed| {
                let state = circular_state(
                    seed.altitude_km * 1000.0,
                    seed.inclination_deg,
                    seed.raan_deg,
                    seed.arg_latitude_deg,
                    now,
                );
                TrackedObject::new(
                    seed.id,
                    seed.name,
                    seed.id,
                    seed.object_type,
                    RiskLevel::Low,
                    state.position,
                    state.velocity,
                )
            })
            .collect();

        Self::from_objects(objects, now)
    }

    pub fn from_objects(objects: Vec<TrackedObject>, now: DateTime<Utc>) -> Self {
        let mut catalog = Self {
            objects,
            conjunctions: Vec::new(),
            alerts: VecDeque::new(),
            last_alert: None,
            screen: ConjunctionScreen::default(),
            epoch: now,
        };
        catalog.rescreen(now);
        info!("Catalog loaded with {} objects", catalog.objects.len());
        catalog
    }

    pub fn objects(&self) -> &[TrackedObject] {
        &self.objects
    }

    pub fn get(&self, id: &str) -> Option<&TrackedObject> {
        self.objects.iter().find(|o| o.id == id)
    }

    pub fn conjunctions(&self) -> &[ConjunctionEvent] {
        &self.conjunctions
    }

    /// History, oldest first
    pub fn alerts(&self) -> Vec<AlertEvent> {
        self.alerts.iter().cloned().collect()
    }

    pub fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    pub fn closest_conjunction(&self, object_id: &str) -> Option<&ConjunctionEvent> {
        self.conjunctions
            .iter()
            .filter(|c| c.involves(object_id))
            .min_by(|a, b| a.miss_distance_km.total_cmp(&b.miss_distance_km))
    }

    /// Fill conjunction geometry from the closest live conjunction, if any
    pub fn maneuver_features(&self, object_id: &str, mut features: ManeuverFeatures) -> ManeuverFeatures {
        features.object_id = object_id.to_string();
        if let Some(c) = self.closest_conjunction(object_id) {
            features.distance_km = c.miss_distance_km;
            features.velocity_kmps = c.relative_velocity_km_s;
            features.time_to_conjunction = c.time_to_conjunction_h;
        }
        features
    }

    /// Advance every object to `now` and re-screen.
    ///
    /// Returns the alerts generated by this tick.
    pub fn update(&mut self, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let dt = now - self.epoch;
        if dt > Duration::zero() {
            for object in &mut self.objects {
                let state = StateVector::new(object.position, object.velocity, self.epoch);
                match advance_circular(&state, dt) {
                    Ok(next) => object.update_state(next.position, next.velocity),
                    Err(e) => warn!("Cannot advance {}: {}", object.id, e),
                }
            }
            self.epoch = now;
        }

        self.rescreen(now);
        self.raise_alerts(now)
    }

    fn rescreen(&mut self, now: DateTime<Utc>) {
        let space_objects: Vec<SpaceObject> = self
            .objects
            .iter()
            .map(|o| SpaceObject {
                id: o.id.clone(),
                name: o.name.clone(),
                state: StateVector::new(o.position, o.velocity, now),
            })
            .collect();

        self.conjunctions = self.screen.screen(&space_objects, now);

        for object in &mut self.objects {
            object.risk_level = self
                .conjunctions
                .iter()
                .filter(|c| c.involves(&object.id))
                .map(|c| c.risk_level)
                .max()
                .unwrap_or(RiskLevel::Low);
        }
        debug!("Screened {} conjunctions", self.conjunctions.len());
    }

    fn raise_alerts(&mut self, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut raised = Vec::new();

        for conjunction in &self.conjunctions {
            let severity = match conjunction.risk_level {
                RiskLevel::High => Severity::Critical,
                RiskLevel::Medium => Severity::Warning,
                RiskLevel::Low => continue,
            };

            let cooling_down = self
                .last_alert
                .is_some_and(|last| (now - last).num_seconds() < ALERT_COOLDOWN_S);
            if cooling_down {
                break;
            }

            let name_of = |id: &str| self.get(id).map(|o| o.name.clone()).unwrap_or_else(|| id.to_string());
            let message = format!(
                "Potential collision between {} and {}. Distance: {:.2} km, Time to conjunction: {:.2} hours.",
                name_of(&conjunction.primary_object),
                name_of(&conjunction.secondary_object),
                conjunction.miss_distance_km,
                conjunction.time_to_conjunction_h,
            );

            let mut alert = AlertEvent::new(
                uuid::Uuid::new_v4().to_string(),
                now,
                message,
                severity,
                Some(conjunction.primary_object.clone()),
            );
            alert.object_ids = vec![conjunction.primary_object.clone(), conjunction.secondary_object.clone()];

            info!("Alert {} ({:?}): {}", alert.id, severity, alert.message);
            self.last_alert = Some(now);
            raised.push(alert);
        }

        for alert in &raised {
            self.alerts.push_back(alert.clone());
        }
        while self.alerts.len() > ALERT_HISTORY_LIMIT {
            self.alerts.pop_front();
        }

        raised
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nalgebra::Vector3;
    use orbit_tracking::OrbitClass;
    use orbital_mechanics::EARTH_RADIUS_M;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_seeded_catalog_spans_orbit_classes() {
        let catalog = Catalog::seeded(t0());

        assert_eq!(catalog.objects().len(), 5);
        let classes: Vec<OrbitClass> = catalog.objects().iter().map(|o| o.orbit_class()).collect();
        assert_eq!(
            classes,
            vec![OrbitClass::Leo, OrbitClass::Leo, OrbitClass::Leo, OrbitClass::Meo, OrbitClass::Geo]
        );
        assert!(catalog.get("25544").is_some());
        assert!(catalog.get("99999").is_none());
    }

    #[test]
    fn test_close_pair_is_high_risk() {
        let catalog = Catalog::seeded(t0());

        assert_eq!(catalog.get("25544").unwrap().risk_level, RiskLevel::High);
        assert_eq!(catalog.get("48274").unwrap().risk_level, RiskLevel::High);
        assert_eq!(catalog.get("37753").unwrap().risk_level, RiskLevel::Low);

        let closest = catalog.closest_conjunction("25544").unwrap();
        assert!(closest.involves("48274"));
        assert!(closest.miss_distance_km < 20.0);
    }

    #[test]
    fn test_update_advances_and_rate_limits_alerts() {
        let mut catalog = Catalog::seeded(t0());
        let before = catalog.get("37753").unwrap().position;

        let first = catalog.update(t0() + Duration::seconds(5));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].severity, Severity::Critical);
        assert!(first[0].concerns("25544") && first[0].concerns("48274"));
        assert_ne!(catalog.get("37753").unwrap().position, before);

        assert!(catalog.update(t0() + Duration::seconds(9)).is_empty());
        assert_eq!(catalog.update(t0() + Duration::seconds(16)).len(), 1);
        assert_eq!(catalog.alerts().len(), 2);
    }

    #[test]
    fn test_history_is_capped() {
        let mut catalog = Catalog::seeded(t0());
        for i in 1..=150 {
            catalog.update(t0() + Duration::seconds(i * ALERT_COOLDOWN_S));
        }
        assert!(catalog.alerts().len() <= ALERT_HISTORY_LIMIT);
    }

    #[test]
    fn test_maneuver_features_use_closest_conjunction() {
        let catalog = Catalog::seeded(t0());

        let features = catalog.maneuver_features("25544", ManeuverFeatures::default());
        assert_eq!(features.object_id, "25544");
        assert!(features.distance_km < 20.0);

        let lonely = catalog.maneuver_features("26824", ManeuverFeatures::default());
        assert_eq!(lonely.distance_km, 50.0);
    }

    #[test]
    fn test_isolated_objects_are_low_risk() {
        let far = |id: &str, x: f64| {
            TrackedObject::new(
                id,
                id,
                id,
                ObjectType::Debris,
                RiskLevel::High,
                Vector3::new(EARTH_RADIUS_M + x, 0.0, 0.0),
                Vector3::new(0.0, 7_500.0, 0.0),
            )
        };
        let mut catalog = Catalog::from_objects(vec![far("a", 400_000.0), far("b", 900_000.0)], t0());

        assert!(catalog.objects().iter().all(|o| o.risk_level == RiskLevel::Low));
        assert!(catalog.update(t0() + Duration::seconds(30)).is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Ticks keep every orbit radius and never raise more than one alert
        #[test]
        fn fuzz_update_ticks(steps in proptest::collection::vec(1i64..600, 1..40)) {
            let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
            let mut catalog = Catalog::seeded(t0);
            let radii: Vec<f64> = catalog.objects().iter().map(|o| o.position.norm()).collect();

            let mut now = t0;
            for step in steps {
                now += Duration::seconds(step);
                let raised = catalog.update(now);
                prop_assert!(raised.len() <= 1);
                prop_assert!(catalog.alerts().len() <= ALERT_HISTORY_LIMIT);
            }

            for (object, r0) in catalog.objects().iter().zip(radii) {
                prop_assert!((object.position.norm() - r0).abs() < 1.0, "{} drifted", object.id);
            }
        }
    }
}
