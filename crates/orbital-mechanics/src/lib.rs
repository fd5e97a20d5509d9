//! Orbital Mechanics Library
//!
//! Earth constants, Earth-centered state vectors and coordinate transforms
//! shared by the tracking core and the gateway's simulated catalog.
//!
//! Propagation here is deliberately simple: circular orbits stepped by a
//! rigid rotation about the angular-momentum axis. It exists to animate the
//! catalog, not to predict real ephemerides.

use chrono::{DateTime, Duration, Utc};
use nalgebra::{Rotation3, Unit, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Earth gravitational parameter μ in m³/s²
pub const MU_EARTH_M3_S2: f64 = 3.986_004_418e14;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Position (m) and velocity (m/s) in an Earth-centered inertial frame
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct StateVector {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub epoch: DateTime<Utc>,
}

/// Latitude/longitude in degrees over the mean Earth sphere
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeodeticPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
}

impl StateVector {
    pub fn new(position: Vector3<f64>, velocity: Vector3<f64>, epoch: DateTime<Utc>) -> Self {
        Self {
            position,
            velocity,
            epoch,
        }
    }

    /// Height above the mean Earth sphere in meters
    pub fn altitude_m(&self) -> f64 {
        altitude_m(&self.position)
    }

    /// Speed in m/s
    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    /// Inclination of the instantaneous orbit plane, degrees in [0, 180]
    pub fn inclination_deg(&self) -> f64 {
        let h = self.position.cross(&self.velocity);
        let norm = h.norm();
        if norm == 0.0 {
            return 0.0;
        }
        (h.z / norm).clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Sub-satellite point and height, ignoring Earth rotation
    pub fn ground_track(&self) -> Result<GeodeticPosition> {
        transforms::eci_to_geodetic(&self.position)
    }
}

/// Height of an Earth-centered position above the mean Earth sphere
pub fn altitude_m(position: &Vector3<f64>) -> f64 {
    position.norm() - EARTH_RADIUS_M
}

pub mod propagation {
    use super::*;

    /// Period of a circular orbit with the given radius, in seconds
    pub fn orbital_period_s(radius_m: f64) -> f64 {
        2.0 * std::f64::consts::PI * (radius_m.powi(3) / MU_EARTH_M3_S2).sqrt()
    }

    /// Mean motion of a circular orbit, rad/s
    pub fn mean_motion(radius_m: f64) -> f64 {
        (MU_EARTH_M3_S2 / radius_m.powi(3)).sqrt()
    }

    /// Build the state of a circular orbit from its plane and phase.
    ///
    /// `arg_latitude_deg` is the angle from the ascending node along the orbit.
    pub fn circular_state(
        altitude_m: f64,
        inclination_deg: f64,
        raan_deg: f64,
        arg_latitude_deg: f64,
        epoch: DateTime<Utc>,
    ) -> StateVector {
        let radius = EARTH_RADIUS_M + altitude_m;
        let speed = (MU_EARTH_M3_S2 / radius).sqrt();
        let u = arg_latitude_deg.to_radians();

        let in_plane_position = Vector3::new(radius * u.cos(), radius * u.sin(), 0.0);
        let in_plane_velocity = Vector3::new(-speed * u.sin(), speed * u.cos(), 0.0);

        let orientation = Rotation3::from_axis_angle(&Vector3::z_axis(), raan_deg.to_radians())
            * Rotation3::from_axis_angle(&Vector3::x_axis(), inclination_deg.to_radians());

        StateVector {
            position: orientation * in_plane_position,
            velocity: orientation * in_plane_velocity,
            epoch,
        }
    }

    /// Advance a (near) circular state by `dt`, rotating position and velocity
    /// about the angular-momentum axis at the circular mean motion.
    pub fn advance_circular(state: &StateVector, dt: Duration) -> Result<StateVector> {
        let radius = state.position.norm();
        if !radius.is_finite() || radius <= 0.0 {
            return Err(OrbitalError::PropagationFailed(format!(
                "degenerate radius {}",
                radius
            )));
        }

        let h = state.position.cross(&state.velocity);
        if h.norm() == 0.0 || !h.norm().is_finite() {
            return Err(OrbitalError::PropagationFailed(
                "radial or zero velocity has no orbit plane".to_string(),
            ));
        }

        let dt_s = dt.num_milliseconds() as f64 / 1000.0;
        let rotation = Rotation3::from_axis_angle(&Unit::new_normalize(h), mean_motion(radius) * dt_s);

        Ok(StateVector {
            position: rotation * state.position,
            velocity: rotation * state.velocity,
            epoch: state.epoch + dt,
        })
    }
}

pub mod transforms {
    //! Both directions use the same non-rotating sphere of radius
    //! [`EARTH_RADIUS_M`], so they invert each other exactly.

    use super::*;

    pub fn eci_to_geodetic(position: &Vector3<f64>) -> Result<GeodeticPosition> {
        let (x, y, z) = (position.x, position.y, position.z);
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "non-finite position [{}, {}, {}]",
                x, y, z
            )));
        }

        let r = (x * x + y * y).sqrt();
        Ok(GeodeticPosition {
            latitude: z.atan2(r).to_degrees(),
            longitude: y.atan2(x).to_degrees(),
            altitude_km: altitude_m(position) / 1000.0,
        })
    }

    pub fn geodetic_to_eci(pos: &GeodeticPosition) -> Result<Vector3<f64>> {
        if !(-90.0..=90.0).contains(&pos.latitude) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "latitude {} out of range",
                pos.latitude
            )));
        }
        if !(pos.longitude.is_finite() && pos.altitude_km.is_finite()) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "non-finite longitude {} or altitude {}",
                pos.longitude, pos.altitude_km
            )));
        }

        let lat_rad = pos.latitude.to_radians();
        let lon_rad = pos.longitude.to_radians();
        let r = EARTH_RADIUS_M + pos.altitude_km * 1000.0;

        Ok(Vector3::new(
            r * lat_rad.cos() * lon_rad.cos(),
            r * lat_rad.cos() * lon_rad.sin(),
            r * lat_rad.sin(),
        ))
    }
}


#[cfg(test)]
mod proptests {
    use super::propagation::*;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn fuzz_advance_circular_keeps_orbit(
            altitude_km in 200.0f64..40_000.0,
            inclination in 0.0f64..180.0,
            raan in 0.0f64..360.0,
            phase in 0.0f64..360.0,
            dt_s in -86_400i64..86_400,
        ) {
            let start = circular_state(altitude_km * 1000.0, inclination, raan, phase, Utc::now());
            let next = advance_circular(&start, Duration::seconds(dt_s)).unwrap();

            prop_assert!((next.position.norm() - start.position.norm()).abs() < 1e-3);
            prop_assert!((next.speed() - start.speed()).abs() < 1e-6);
            prop_assert!((next.inclination_deg() - start.inclination_deg()).abs() < 1e-4);
        }

        #[test]
        fn fuzz_geodetic_round_trip(
            x in -5e7f64..5e7,
            y in -5e7f64..5e7,
            z in -5e7f64..5e7,
        ) {
            let pos = Vector3::new(x, y, z);
            prop_assume!(pos.norm() > EARTH_RADIUS_M);

            let geo = transforms::eci_to_geodetic(&pos).unwrap();
            let back = transforms::geodetic_to_eci(&geo).unwrap();
            prop_assert!((back - pos).norm() < 1.0, "drift {} m", (back - pos).norm());
        }
    }
}
