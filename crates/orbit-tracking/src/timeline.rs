//! Risk Timeline Generator
//!
//! Synthesizes a 24-hour collision-probability forecast for the selected
//! object. It is an operator-facing illustration, not a model output.
//!
//! | Risk   | Baseline | Shaped hours | Shaped range   |
//! |--------|----------|--------------|----------------|
//! | Low    | 0.01     | none         |                |
//! | Medium | 0.10     | 12 to 14     | [0.30, 0.50]   |
//! | High   | 0.50     | 8 to 10      | [0.70, 0.90]   |
//!
//! Unshaped hours jitter by ±0.02 around the baseline. Distance tracks
//! probability inversely: `100 - 100·p ± 5 km`, never negative.

use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Utc};
use collision_avoidance::RiskLevel;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::TimelinePoint;

pub const TIMELINE_HOURS: usize = 24;

const PROBABILITY_JITTER: f64 = 0.02;
const DISTANCE_JITTER_KM: f64 = 5.0;

const HIGH_PEAK_HOURS: RangeInclusive<usize> = 8..=10;
const MEDIUM_PEAK_HOURS: RangeInclusive<usize> = 12..=14;

pub fn baseline_probability(risk: RiskLevel) -> f64 {
    match risk {
        RiskLevel::Low => 0.01,
        RiskLevel::Medium => 0.10,
        RiskLevel::High => 0.50,
    }
}

/// Shaped probability band for `hour`, if the risk level has one there
fn peak_band(risk: RiskLevel, hour: usize) -> Option<RangeInclusive<f64>> {
    match risk {
        RiskLevel::High if HIGH_PEAK_HOURS.contains(&hour) => Some(0.70..=0.90),
        RiskLevel::Medium if MEDIUM_PEAK_HOURS.contains(&hour) => Some(0.30..=0.50),
        _ => None,
    }
}

pub struct RiskTimelineGenerator<R: Rng = StdRng> {
    rng: R,
}

impl RiskTimelineGenerator<StdRng> {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible series for a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RiskTimelineGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> RiskTimelineGenerator<R> {
    pub fn from_rng(rng: R) -> Self {
        Self { rng }
    }

    /// 24 hourly points; point `i` sits at `start + i h`
    pub fn generate(&mut self, risk: RiskLevel, start: DateTime<Utc>) -> Vec<TimelinePoint> {
        let baseline = baseline_probability(risk);

        (0..TIMELINE_HOURS)
            .map(|hour| {
                let raw = match peak_band(risk, hour) {
                    Some(band) => self.rng.gen_range(band),
                    None => baseline + self.rng.gen_range(-PROBABILITY_JITTER..=PROBABILITY_JITTER),
                };
                let probability = raw.clamp(0.0, 1.0);

                let distance_km = (100.0 - 100.0 * probability
                    + self.rng.gen_range(-DISTANCE_JITTER_KM..=DISTANCE_JITTER_KM))
                .max(0.0);

                let time = start + Duration::hours(hour as i64);
                TimelinePoint {
                    label: time.format("%H:00").to_string(),
                    time,
                    probability,
                    distance_km,
                }
            })
            .collect()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn risk_strategy() -> impl Strategy<Value = RiskLevel> {
        prop_oneof![Just(RiskLevel::Low), Just(RiskLevel::Medium), Just(RiskLevel::High)]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn fuzz_timeline_bounds(seed in any::<u64>(), risk in risk_strategy(), offset_h in 0i64..10_000) {
            let start = DateTime::<Utc>::UNIX_EPOCH + Duration::hours(offset_h);
            let points = RiskTimelineGenerator::with_seed(seed).generate(risk, start);

            prop_assert_eq!(points.len(), TIMELINE_HOURS);
            for p in &points {
                prop_assert!((0.0..=1.0).contains(&p.probability));
                prop_assert!(p.distance_km >= 0.0);
            }
            if risk == RiskLevel::High {
                prop_assert!(points[8..=10].iter().any(|p| p.probability >= 0.70));
            }
        }
    }
}
