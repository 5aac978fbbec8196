//! Distance units and the algorithms used to compute a comparable distance.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::GeoPoint;
use crate::{Result, SortError};

/// Mean earth radius, in meters.
const EARTH_MEAN_RADIUS_METERS: f64 = 6_371_008.7714;

/// Meters covered by one degree of a great circle.
const METERS_PER_DEGREE: f64 = EARTH_MEAN_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Unit in which computed distances are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    /// Millimeters (`mm`).
    Millimeters,
    /// Centimeters (`cm`).
    Centimeters,
    /// Meters (`m`), the default.
    #[default]
    Meters,
    /// Kilometers (`km`).
    Kilometers,
    /// Miles (`mi`).
    Miles,
    /// Yards (`yd`).
    Yards,
    /// Feet (`ft`).
    Feet,
    /// Inches (`in`).
    Inches,
    /// Nautical miles (`nmi`).
    NauticalMiles,
}

impl DistanceUnit {
    /// Number of meters in one unit.
    pub fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Millimeters => 0.001,
            DistanceUnit::Centimeters => 0.01,
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1_000.0,
            DistanceUnit::Miles => 1_609.344,
            DistanceUnit::Yards => 0.9144,
            DistanceUnit::Feet => 0.3048,
            DistanceUnit::Inches => 0.0254,
            DistanceUnit::NauticalMiles => 1_852.0,
        }
    }

    /// Parses a unit from its request-surface name.
    pub fn from_str(text: &str) -> Result<DistanceUnit> {
        match text {
            "mm" | "millimeters" => Ok(DistanceUnit::Millimeters),
            "cm" | "centimeters" => Ok(DistanceUnit::Centimeters),
            "m" | "meters" => Ok(DistanceUnit::Meters),
            "km" | "kilometers" => Ok(DistanceUnit::Kilometers),
            "mi" | "miles" => Ok(DistanceUnit::Miles),
            "yd" | "yards" => Ok(DistanceUnit::Yards),
            "ft" | "feet" => Ok(DistanceUnit::Feet),
            "in" | "inch" => Ok(DistanceUnit::Inches),
            "nmi" | "nauticalmiles" => Ok(DistanceUnit::NauticalMiles),
            _ => Err(SortError::Validation(format!(
                "unknown distance unit [{text}]"
            ))),
        }
    }

    fn from_meters(self, meters: f64) -> f64 {
        meters / self.meters_per_unit()
    }
}

/// Algorithm used to turn two points into a comparable distance value.
///
/// All algorithms agree on the relative order of points within ordinary
/// operational distances; only `Arc` is numerically exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceAlgorithm {
    /// Exact great-circle distance.
    Arc,
    /// Cheaper haversine approximation with bounded relative error. The
    /// default.
    #[default]
    SloppyArc,
    /// Equirectangular approximation. Valid for bounded regions only, but
    /// fastest.
    Plane,
    /// Order-preserving uncorrected value (no unit conversion). Useful when
    /// the absolute distance is not needed.
    Factor,
}

impl DistanceAlgorithm {
    /// Parses an algorithm from its request-surface name.
    pub fn from_str(text: &str) -> Result<DistanceAlgorithm> {
        match text {
            "arc" => Ok(DistanceAlgorithm::Arc),
            "sloppy_arc" => Ok(DistanceAlgorithm::SloppyArc),
            "plane" => Ok(DistanceAlgorithm::Plane),
            "factor" => Ok(DistanceAlgorithm::Factor),
            _ => Err(SortError::Validation(format!(
                "unknown distance algorithm [{text}]"
            ))),
        }
    }

    /// Computes the distance between `from` and `to`, expressed in `unit`.
    ///
    /// `Factor` ignores the unit: its output is an unscaled monotone function
    /// of the central angle and is only meaningful for comparisons.
    pub fn distance(self, from: &GeoPoint, to: &GeoPoint, unit: DistanceUnit) -> f64 {
        match self {
            DistanceAlgorithm::Arc => unit.from_meters(arc_distance_meters(from, to)),
            DistanceAlgorithm::SloppyArc => unit.from_meters(haversine_meters(from, to)),
            DistanceAlgorithm::Plane => unit.from_meters(plane_meters(from, to)),
            DistanceAlgorithm::Factor => distance_factor(from, to),
        }
    }
}

impl fmt::Display for DistanceAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceAlgorithm::Arc => "arc",
            DistanceAlgorithm::SloppyArc => "sloppy_arc",
            DistanceAlgorithm::Plane => "plane",
            DistanceAlgorithm::Factor => "factor",
        };
        f.write_str(name)
    }
}

/// Exact great-circle distance, using the atan2 form which is numerically
/// stable for both small and antipodal distances.
fn arc_distance_meters(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let (lat1, lon1) = (from.lat.to_radians(), from.lon.to_radians());
    let (lat2, lon2) = (to.lat.to_radians(), to.lon.to_radians());
    let delta_lon = lon2 - lon1;
    let cos_lat2 = lat2.cos();
    let cos_lat1 = lat1.cos();
    let a = (cos_lat2 * delta_lon.sin()).powi(2)
        + (cos_lat1 * lat2.sin() - lat1.sin() * cos_lat2 * delta_lon.cos()).powi(2);
    let b = lat1.sin() * lat2.sin() + cos_lat1 * cos_lat2 * delta_lon.cos();
    a.sqrt().atan2(b) * EARTH_MEAN_RADIUS_METERS
}

/// Haversine distance. Slightly cheaper than the atan2 form and monotone with
/// it, with a bounded relative error from the clamped square root.
fn haversine_meters(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (to.lon.to_radians() - from.lon.to_radians()) / 2.0;
    let h = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);
    2.0 * EARTH_MEAN_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Equirectangular approximation: degrees of latitude/longitude treated as a
/// flat grid, longitude corrected by the cosine of the mean latitude.
fn plane_meters(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let dlat = to.lat - from.lat;
    let mean_lat = ((from.lat + to.lat) / 2.0).to_radians();
    let dlon = (to.lon - from.lon) * mean_lat.cos();
    (dlat * dlat + dlon * dlon).sqrt() * METERS_PER_DEGREE
}

/// Uncorrected order-preserving value: `1 - cos(central angle)`, increasing
/// with distance everywhere on the sphere.
fn distance_factor(from: &GeoPoint, to: &GeoPoint) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let delta_lon = to.lon.to_radians() - from.lon.to_radians();
    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * delta_lon.cos();
    1.0 - cos_angle
}

#[cfg(test)]
mod tests {
    use super::{DistanceAlgorithm, DistanceUnit, GeoPoint};

    const BERLIN: GeoPoint = GeoPoint {
        lat: 52.52,
        lon: 13.405,
    };
    const PARIS: GeoPoint = GeoPoint {
        lat: 48.8566,
        lon: 2.3522,
    };
    const MADRID: GeoPoint = GeoPoint {
        lat: 40.4168,
        lon: -3.7038,
    };

    #[test]
    fn test_arc_distance_berlin_paris() {
        let km = DistanceAlgorithm::Arc.distance(&BERLIN, &PARIS, DistanceUnit::Kilometers);
        assert!((km - 878.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn test_sloppy_arc_close_to_arc() {
        let arc = DistanceAlgorithm::Arc.distance(&BERLIN, &PARIS, DistanceUnit::Meters);
        let sloppy = DistanceAlgorithm::SloppyArc.distance(&BERLIN, &PARIS, DistanceUnit::Meters);
        assert!((arc - sloppy).abs() / arc < 0.01);
    }

    #[test]
    fn test_algorithms_agree_on_order() {
        for algorithm in [
            DistanceAlgorithm::Arc,
            DistanceAlgorithm::SloppyArc,
            DistanceAlgorithm::Plane,
            DistanceAlgorithm::Factor,
        ] {
            let to_paris = algorithm.distance(&BERLIN, &PARIS, DistanceUnit::Meters);
            let to_madrid = algorithm.distance(&BERLIN, &MADRID, DistanceUnit::Meters);
            assert!(
                to_paris < to_madrid,
                "{algorithm} disagrees on order: {to_paris} vs {to_madrid}"
            );
        }
    }

    #[test]
    fn test_zero_distance() {
        for algorithm in [
            DistanceAlgorithm::Arc,
            DistanceAlgorithm::SloppyArc,
            DistanceAlgorithm::Plane,
        ] {
            let d = algorithm.distance(&BERLIN, &BERLIN, DistanceUnit::Meters);
            assert!(d.abs() < 1e-6);
        }
    }

    #[test]
    fn test_unit_conversion() {
        let m = DistanceAlgorithm::Arc.distance(&BERLIN, &PARIS, DistanceUnit::Meters);
        let km = DistanceAlgorithm::Arc.distance(&BERLIN, &PARIS, DistanceUnit::Kilometers);
        let mi = DistanceAlgorithm::Arc.distance(&BERLIN, &PARIS, DistanceUnit::Miles);
        assert!((m / 1000.0 - km).abs() < 1e-9);
        assert!((m / 1609.344 - mi).abs() < 1e-9);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!(
            DistanceUnit::from_str("km").unwrap(),
            DistanceUnit::Kilometers
        );
        assert_eq!(DistanceUnit::from_str("mi").unwrap(), DistanceUnit::Miles);
        assert!(DistanceUnit::from_str("parsec").is_err());
    }
}
