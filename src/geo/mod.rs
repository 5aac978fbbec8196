//! Geo points and the distance computations used by geo-distance sorting.

mod distance;
mod geohash;

pub use self::distance::{DistanceAlgorithm, DistanceUnit};
pub(crate) use self::geohash::decode_geohash;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, SortError};

/// A latitude/longitude pair, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, in `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, in `[-180, 180]`.
    pub lon: f64,
}

impl GeoPoint {
    /// Creates a point without validating the coordinates.
    pub fn new(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint { lat, lon }
    }

    /// Creates a point, rejecting out-of-range coordinates.
    pub fn validated(lat: f64, lon: f64) -> Result<GeoPoint> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(SortError::Validation(format!(
                "illegal latitude value [{lat}] for geo distance sort"
            )));
        }
        if !(-180.0..=180.0).contains(&lon) {
            return Err(SortError::Validation(format!(
                "illegal longitude value [{lon}] for geo distance sort"
            )));
        }
        Ok(GeoPoint { lat, lon })
    }

    /// Parses a `"lat,lon"` string, falling back to geohash decoding when the
    /// string holds no comma.
    pub fn from_str_repr(text: &str) -> Result<GeoPoint> {
        if let Some((lat_str, lon_str)) = text.split_once(',') {
            let lat: f64 = lat_str.trim().parse().map_err(|_| {
                SortError::Validation(format!("invalid latitude in geo point [{text}]"))
            })?;
            let lon: f64 = lon_str.trim().parse().map_err(|_| {
                SortError::Validation(format!("invalid longitude in geo point [{text}]"))
            })?;
            Ok(GeoPoint::new(lat, lon))
        } else {
            decode_geohash(text)
        }
    }
}

/// Parses one or more geo points out of a JSON value.
///
/// Accepted shapes: a `{"lat": .., "lon": ..}` object, a `"lat,lon"` string, a
/// geohash string, a `[lon, lat]` array (GeoJSON order), or an array mixing
/// any of the previous forms. Every element of a mixed array is parsed
/// independently and all resulting points are unioned.
pub fn parse_points(value: &Value) -> Result<Vec<GeoPoint>> {
    let mut points = Vec::new();
    collect_points(value, &mut points)?;
    if points.is_empty() {
        return Err(SortError::Validation(
            "geo distance sorting needs at least one point".to_string(),
        ));
    }
    Ok(points)
}

fn collect_points(value: &Value, points: &mut Vec<GeoPoint>) -> Result<()> {
    match value {
        Value::Object(object) => {
            let lat = object.get("lat").and_then(Value::as_f64);
            let lon = object.get("lon").and_then(Value::as_f64);
            match (lat, lon) {
                (Some(lat), Some(lon)) => {
                    points.push(GeoPoint::new(lat, lon));
                    Ok(())
                }
                _ => Err(SortError::Validation(format!(
                    "expected [lat] and [lon] in geo point object, got {value}"
                ))),
            }
        }
        Value::String(text) => {
            points.push(GeoPoint::from_str_repr(text)?);
            Ok(())
        }
        Value::Array(elements) => {
            // A two-number array is a single [lon, lat] point in GeoJSON
            // order; anything else is a list of independently parsed forms.
            if elements.len() == 2 && elements.iter().all(Value::is_number) {
                let lon = elements[0].as_f64().unwrap();
                let lat = elements[1].as_f64().unwrap();
                points.push(GeoPoint::new(lat, lon));
                return Ok(());
            }
            for element in elements {
                collect_points(element, points)?;
            }
            Ok(())
        }
        other => Err(SortError::Validation(format!(
            "cannot parse geo point from {other}"
        ))),
    }
}
