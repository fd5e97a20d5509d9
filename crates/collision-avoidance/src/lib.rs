//! Collision Avoidance Library
//!
//! Pairwise conjunction screening over the tracked catalog and the heuristic
//! collision-risk model behind the maneuver-suggestion API.
//!
//! The risk model is a fixed scoring function, not a trained estimator. Its
//! request and response types are the wire contract shared by the gateway
//! (which serves predictions) and the dashboard core (which consumes them).

use chrono::{DateTime, Duration, Utc};
use orbital_mechanics::StateVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollisionError {
    #[error("Invalid feature {name}: {value}")]
    InvalidFeature { name: &'static str, value: f64 },
}

pub type Result<T> = std::result::Result<T, CollisionError>;

/// Coarse collision-risk category.
///
/// Serialized as `"Low" | "Medium" | "High"`; lowercase spellings are accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RiskLevel {
    #[serde(alias = "low")]
    Low,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "high")]
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// An object as seen by the screener
#[derive(Debug, Clone)]
pub struct SpaceObject {
    pub id: String,
    pub name: String,
    pub state: StateVector,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConjunctionEvent {
    pub primary_object: String,
    pub secondary_object: String,
    pub tca: DateTime<Utc>,
    pub miss_distance_km: f64,
    pub relative_velocity_km_s: f64,
    pub time_to_conjunction_h: f64,
    pub risk_level: RiskLevel,
}

impl ConjunctionEvent {
    /// Whether `object_id` is either party of this conjunction
    pub fn involves(&self, object_id: &str) -> bool {
        self.primary_object == object_id || self.secondary_object == object_id
    }
}

/// Risk of a close approach from its miss distance and lead time
pub fn conjunction_risk(miss_distance_km: f64, time_to_conjunction_h: f64) -> RiskLevel {
    if miss_distance_km < 20.0 && time_to_conjunction_h < 2.0 {
        RiskLevel::High
    } else if miss_distance_km < 50.0 && time_to_conjunction_h < 12.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Pairwise proximity screen
pub struct ConjunctionScreen {
    threshold_km: f64,
}

impl Default for ConjunctionScreen {
    fn default() -> Self {
        Self {
            threshold_km: 100.0,
        }
    }
}

impl ConjunctionScreen {
    /// Minimum lead time reported for any conjunction (hours)
    const MIN_LEAD_TIME_H: f64 = 0.1;

    pub fn new(threshold_km: f64) -> Self {
        Self { threshold_km }
    }

    pub fn threshold_km(&self) -> f64 {
        self.threshold_km
    }

    /// Screen every pair once; events are ordered by (primary, secondary) catalog index.
    pub fn screen(&self, objects: &[SpaceObject], now: DateTime<Utc>) -> Vec<ConjunctionEvent> {
        let mut events = Vec::new();

        for (i, primary) in objects.iter().enumerate() {
            for secondary in &objects[i + 1..] {
                let distance_km = (primary.state.position - secondary.state.position).norm() / 1000.0;
                if !(distance_km < self.threshold_km) {
                    continue;
                }

                // Closing speed approximated by the difference in orbital speed
                let rel_velocity_km_s = (primary.state.speed() - secondary.state.speed()).abs() / 1000.0;
                let lead_s = distance_km / (rel_velocity_km_s + 0.001);
                let time_to_conjunction_h = (lead_s / 3600.0).max(Self::MIN_LEAD_TIME_H);

                events.push(ConjunctionEvent {
                    primary_object: primary.id.clone(),
                    secondary_object: secondary.id.clone(),
                    tca: now + Duration::milliseconds((time_to_conjunction_h * 3_600_000.0) as i64),
                    miss_distance_km: distance_km,
                    relative_velocity_km_s: rel_velocity_km_s,
                    time_to_conjunction_h,
                    risk_level: conjunction_risk(distance_km, time_to_conjunction_h),
                });
            }
        }

        events
    }
}

pub mod risk_model {
    //! Heuristic collision-risk model
    //!
    //! ```text
    //! score = clamp(10 · v / ((d + 1)(t + 1)), 0, 1)
    //! ```
    //!
    //! | Level  | Score   | Reported probability |
    //! |--------|---------|----------------------|
    //! | High   | > 0.6   | score                |
    //! | Medium | > 0.2   | 0.5 + score / 2      |
    //! | Low    | <= 0.2  | 1 - score            |
    //!
    //! The reported probability is the model's confidence in the level it
    //! assigned, not a raw collision probability.

    use super::*;

    /// Features of one candidate conjunction, as posted to `suggest_maneuver`
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct ManeuverFeatures {
        #[serde(default)]
        pub object_id: String,
        pub distance_km: f64,
        pub velocity_kmps: f64,
        pub altitude: f64,
        pub inclination: f64,
        pub time_to_conjunction: f64,
    }

    impl Default for ManeuverFeatures {
        fn default() -> Self {
            Self {
                object_id: String::new(),
                distance_km: 50.0,
                velocity_kmps: 7.5,
                altitude: 400.0,
                inclination: 0.0,
                time_to_conjunction: 48.0,
            }
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct FeatureImportance {
        pub name: String,
        pub importance: f64,
    }

    /// Response of the risk-prediction service
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    pub struct RiskPrediction {
        pub probability: f64,
        pub risk_level: RiskLevel,
        pub maneuver_suggestion: String,
        pub explanation: String,
        #[serde(default)]
        pub feature_importance: Vec<FeatureImportance>,
    }

    #[derive(Debug, Default, Clone, Copy)]
    pub struct RiskModel;

    impl RiskModel {
        pub fn new() -> Self {
            Self
        }

        pub fn score(&self, features: &ManeuverFeatures) -> f64 {
            let raw = (1.0 / (features.distance_km + 1.0))
                * features.velocity_kmps
                * (1.0 / (features.time_to_conjunction + 1.0));
            (raw * 10.0).clamp(0.0, 1.0)
        }

        pub fn predict(&self, features: &ManeuverFeatures) -> Result<RiskPrediction> {
            validate(features)?;

            let score = self.score(features);
            let risk_level = if score > 0.6 {
                RiskLevel::High
            } else if score > 0.2 {
                RiskLevel::Medium
            } else {
                RiskLevel::Low
            };

            let probability = match risk_level {
                RiskLevel::High => score,
                RiskLevel::Medium => 0.5 + score / 2.0,
                RiskLevel::Low => 1.0 - score,
            };

            Ok(RiskPrediction {
                probability,
                risk_level,
                maneuver_suggestion: maneuver_suggestion(risk_level, features),
                explanation: explanation(risk_level, features),
                feature_importance: feature_importance(),
            })
        }
    }

    fn validate(features: &ManeuverFeatures) -> Result<()> {
        let checks = [
            ("distance_km", features.distance_km),
            ("velocity_kmps", features.velocity_kmps),
            ("time_to_conjunction", features.time_to_conjunction),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(CollisionError::InvalidFeature { name, value });
            }
        }
        Ok(())
    }

    pub fn maneuver_suggestion(level: RiskLevel, features: &ManeuverFeatures) -> String {
        let d = features.distance_km;
        let t = features.time_to_conjunction;

        match level {
            RiskLevel::Low => "No maneuver required. Continue monitoring.".to_string(),
            RiskLevel::Medium if t < 12.0 => {
                format!("Consider altitude adjustment of +{:.1}km within 12 hours.", d / 20.0)
            }
            RiskLevel::Medium => {
                format!("Consider altitude adjustment of +{:.1}km within 48 hours.", d / 40.0)
            }
            RiskLevel::High if t < 6.0 => format!(
                "URGENT: Immediate evasive maneuver required: +{:.1}km altitude change.",
                d / 10.0
            ),
            RiskLevel::High => format!(
                "Critical: Execute evasive maneuver of +{:.1}km within {:.1} hours.",
                d / 15.0,
                (t / 2.0).min(24.0)
            ),
        }
    }

    pub fn explanation(level: RiskLevel, features: &ManeuverFeatures) -> String {
        let d = features.distance_km;
        let v = features.velocity_kmps;
        let t = features.time_to_conjunction;

        match level {
            RiskLevel::Low => format!(
                "Low collision risk. Separation of {:.1}km with {:.1} hours to conjunction indicates minimal risk.",
                d, t
            ),
            RiskLevel::Medium => format!(
                "Medium collision risk. Watch the separation of {:.1}km and relative velocity of {:.1}km/s.",
                d, v
            ),
            RiskLevel::High => format!(
                "High collision risk. Separation of {:.1}km with only {:.1} hours to conjunction. Immediate action recommended.",
                d, t
            ),
        }
    }

    /// Fixed relative weight of each input feature
    pub fn feature_importance() -> Vec<FeatureImportance> {
        [
            ("distance_km", 0.4),
            ("velocity_kmps", 0.3),
            ("time_to_conjunction", 0.2),
            ("altitude", 0.05),
            ("inclination", 0.05),
        ]
        .into_iter()
        .map(|(name, importance)| FeatureImportance {
            name: name.to_string(),
            importance,
        })
        .collect()
    }
}

pub use risk_model::{FeatureImportance, ManeuverFeatures, RiskModel, RiskPrediction};
