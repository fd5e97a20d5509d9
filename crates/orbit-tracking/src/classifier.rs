//! Risk Classifier
//!
//! Maps an object's risk level to a display color and its altitude to an
//! orbit class. Both mappings are total over their inputs.
//!
//! | Altitude (m)              | Class |
//! |---------------------------|-------|
//! | < 2,000,000               | LEO   |
//! | 2,000,000 .. < 35,786,000 | MEO   |
//! | >= 35,786,000             | GEO   |

use std::fmt;
use std::str::FromStr;

use nalgebra::Vector3;
use orbital_mechanics::EARTH_RADIUS_M;
use serde::{Deserialize, Serialize};

use crate::model::TrackedObject;
use collision_avoidance::RiskLevel;

/// Upper bound (exclusive) of low Earth orbit
pub const LEO_CEILING_M: f64 = 2_000_000.0;

/// Geostationary altitude; everything at or above it is GEO
pub const GEO_ALTITUDE_M: f64 = 35_786_000.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrbitClass {
    Leo,
    Meo,
    Geo,
}

impl OrbitClass {
    pub const ALL: [OrbitClass; 3] = [OrbitClass::Leo, OrbitClass::Meo, OrbitClass::Geo];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrbitClass::Leo => "LEO",
            OrbitClass::Meo => "MEO",
            OrbitClass::Geo => "GEO",
        }
    }
}

impl fmt::Display for OrbitClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrbitClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LEO" => Ok(OrbitClass::Leo),
            "MEO" => Ok(OrbitClass::Meo),
            "GEO" => Ok(OrbitClass::Geo),
            other => Err(format!("Unknown orbit class: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SeverityColor {
    Green,
    Yellow,
    Red,
}

impl SeverityColor {
    pub fn hex(&self) -> &'static str {
        match self {
            SeverityColor::Green => "#22c55e",
            SeverityColor::Yellow => "#eab308",
            SeverityColor::Red => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Classification {
    pub color: SeverityColor,
    pub orbit_class: OrbitClass,
}

/// Height above the mean Earth sphere
pub fn altitude_m(position: &Vector3<f64>) -> f64 {
    position.norm() - EARTH_RADIUS_M
}

/// Non-finite altitudes fall through to GEO.
pub fn orbit_class_for_altitude(altitude_m: f64) -> OrbitClass {
    if altitude_m < LEO_CEILING_M {
        OrbitClass::Leo
    } else if altitude_m < GEO_ALTITUDE_M {
        OrbitClass::Meo
    } else {
        OrbitClass::Geo
    }
}

pub fn orbit_class(position: &Vector3<f64>) -> OrbitClass {
    orbit_class_for_altitude(altitude_m(position))
}

pub fn risk_color(level: RiskLevel) -> SeverityColor {
    match level {
        RiskLevel::Low => SeverityColor::Green,
        RiskLevel::Medium => SeverityColor::Yellow,
        RiskLevel::High => SeverityColor::Red,
    }
}

pub fn classify(object: &TrackedObject) -> Classification {
    Classification {
        color: risk_color(object.risk_level),
        orbit_class: object.orbit_class(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObjectType;

    fn at_altitude(altitude_m: f64) -> Vector3<f64> {
        Vector3::new(0.0, EARTH_RADIUS_M + altitude_m, 0.0)
    }

    #[test]
    fn test_orbit_class_bands() {
        assert_eq!(orbit_class(&at_altitude(450_000.0)), OrbitClass::Leo);
        assert_eq!(orbit_class(&at_altitude(20_200_000.0)), OrbitClass::Meo);
        assert_eq!(orbit_class(&at_altitude(40_000_000.0)), OrbitClass::Geo);
    }

    #[test]
    fn test_orbit_class_boundaries_belong_to_upper_band() {
        assert_eq!(orbit_class_for_altitude(1_999_999.999), OrbitClass::Leo);
        assert_eq!(orbit_class_for_altitude(2_000_000.0), OrbitClass::Meo);
        assert_eq!(orbit_class_for_altitude(35_785_999.999), OrbitClass::Meo);
        assert_eq!(orbit_class_for_altitude(35_786_000.0), OrbitClass::Geo);
    }

    #[test]
    fn test_orbit_class_total_for_odd_inputs() {
        assert_eq!(orbit_class_for_altitude(-1_000.0), OrbitClass::Leo);
        assert_eq!(orbit_class_for_altitude(f64::NAN), OrbitClass::Geo);
        assert_eq!(orbit_class_for_altitude(f64::INFINITY), OrbitClass::Geo);
    }

    #[test]
    fn test_risk_colors() {
        assert_eq!(risk_color(RiskLevel::Low), SeverityColor::Green);
        assert_eq!(risk_color(RiskLevel::Medium), SeverityColor::Yellow);
        assert_eq!(risk_color(RiskLevel::High), SeverityColor::Red);
        assert_eq!(SeverityColor::Red.hex(), "#ef4444");
    }

    #[test]
    fn test_classify_high_risk_leo() {
        let obj = TrackedObject::new(
            "d1",
            "Debris A",
            "D12345",
            ObjectType::Debris,
            RiskLevel::High,
            at_altitude(450_000.0),
            Vector3::new(7_640.0, 0.0, 0.0),
        );
        let c = classify(&obj);
        assert_eq!(c.orbit_class, OrbitClass::Leo);
        assert_eq!(c.color, SeverityColor::Red);
    }

    #[test]
    fn test_orbit_class_parse() {
        assert_eq!("leo".parse::<OrbitClass>().unwrap(), OrbitClass::Leo);
        assert_eq!(" GEO ".parse::<OrbitClass>().unwrap(), OrbitClass::Geo);
        assert!("HEO".parse::<OrbitClass>().is_err());
        assert_eq!(serde_json::to_string(&OrbitClass::Meo).unwrap(), "\"MEO\"");
    }
}
