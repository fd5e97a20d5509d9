//! Dashboard data model
//!
//! Vectors are Earth-centered, positions in meters and velocities in m/s.
//! They serialize as `[x, y, z]`.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Deserializer, Serialize};

use crate::classifier::{self, OrbitClass};
use collision_avoidance::RiskLevel;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Satellite,
    Debris,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrackedObject {
    pub id: String,
    pub name: String,
    pub catalog_id: String,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub risk_level: RiskLevel,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl TrackedObject {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        catalog_id: impl Into<String>,
        object_type: ObjectType,
        risk_level: RiskLevel,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            catalog_id: catalog_id.into(),
            object_type,
            risk_level,
            position,
            velocity,
        }
    }

    /// Replace position and velocity together
    pub fn update_state(&mut self, position: Vector3<f64>, velocity: Vector3<f64>) {
        self.position = position;
        self.velocity = velocity;
    }

    pub fn altitude_m(&self) -> f64 {
        classifier::altitude_m(&self.position)
    }

    pub fn orbit_class(&self) -> OrbitClass {
        classifier::orbit_class(&self.position)
    }
}

/// One point of an object's animation window
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PositionSample {
    pub timestamp: DateTime<Utc>,
    pub position: Vector3<f64>,
}

/// Alert urgency, ordered `Info < Warning < Critical`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "low")]
    Info,
    #[serde(alias = "medium")]
    Warning,
    #[serde(alias = "high")]
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "iso_instant")]
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Both parties of a conjunction alert
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_ids: Vec<String>,
}

impl AlertEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
        severity: Severity,
        object_id: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            message: message.into(),
            severity,
            object_id,
            object_ids: Vec::new(),
        }
    }

    /// Whether the alert references `object_id` through either field
    pub fn concerns(&self, object_id: &str) -> bool {
        self.object_id.as_deref() == Some(object_id) || self.object_ids.iter().any(|id| id == object_id)
    }
}

/// Accepts `"17"` and `17` alike
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// RFC 3339, or a naive ISO instant taken as UTC
fn iso_instant<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    if let Ok(ts) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(serde::de::Error::custom)
}

/// One hour of a selected object's forecast
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimelinePoint {
    /// `HH:00` of `time`
    pub label: String,
    pub time: DateTime<Utc>,
    pub probability: f64,
    pub distance_km: f64,
}

/// Search text plus active orbit-class filters.
///
/// Empty search and no active classes means everything is visible.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterState {
    #[serde(default)]
    pub orbit_classes: BTreeSet<OrbitClass>,
    #[serde(default)]
    pub search: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = search.into();
        self
    }

    pub fn with_orbit_classes(mut self, classes: impl IntoIterator<Item = OrbitClass>) -> Self {
        self.orbit_classes = classes.into_iter().collect();
        self
    }

    /// Flip one class on or off; returns whether it is now active
    pub fn toggle_orbit_class(&mut self, class: OrbitClass) -> bool {
        if self.orbit_classes.remove(&class) {
            false
        } else {
            self.orbit_classes.insert(class);
            true
        }
    }

    pub fn set_orbit_classes(&mut self, classes: impl IntoIterator<Item = OrbitClass>) {
        self.orbit_classes = classes.into_iter().collect();
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn clear(&mut self) {
        self.orbit_classes.clear();
        self.search.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.orbit_classes.is_empty() && self.search.is_empty()
    }
}
