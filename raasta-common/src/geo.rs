//! Coordinate sanitation
//!
//! Reports may carry a GeoJSON-style point `{ "type": "Point", "coordinates": [lng, lat] }`.
//! Clients often send `(0, 0)` when location services never produced a fix, so the origin
//! is treated as "no location" rather than a real position. Any point that fails the check
//! is dropped entirely; a partially populated or zeroed point is never produced.
//!
//! The same check runs before a client transmits a report and again before the server
//! persists one.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// A validated longitude/latitude pair
///
/// Serialized in GeoJSON point form so the persisted shape matches what clients send.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PointRepr", into = "PointRepr")]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// Why a raw coordinate value was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Not an object with a two-element `coordinates` array
    WrongShape,
    /// An element was not a JSON number
    NonNumeric,
    /// An element was NaN or infinite
    NotFinite,
    /// Both elements were zero
    OriginSentinel,
    /// Serialized input was not valid JSON
    Malformed,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Rejection::WrongShape => "expected a two-element coordinates array",
            Rejection::NonNumeric => "coordinate is not a number",
            Rejection::NotFinite => "coordinate is not finite",
            Rejection::OriginSentinel => "(0, 0) placeholder",
            Rejection::Malformed => "malformed JSON",
        };
        f.write_str(reason)
    }
}

impl GeoPoint {
    /// Build a point from longitude and latitude, rejecting non-finite values and the origin
    pub fn new(longitude: f64, latitude: f64) -> Option<Self> {
        check_pair(longitude, latitude).ok()
    }

    /// Whether this point still satisfies the sanitation rule
    ///
    /// Points deserialized from storage or hand-built by callers bypass [`GeoPoint::new`],
    /// so the persistence guard re-checks them.
    pub fn is_valid(&self) -> bool {
        check_pair(self.longitude, self.latitude).is_ok()
    }

    /// GeoJSON representation `{ "type": "Point", "coordinates": [lng, lat] }`
    pub fn to_geojson(&self) -> Value {
        serde_json::json!({
            "type": "Point",
            "coordinates": [self.longitude, self.latitude],
        })
    }
}

#[derive(Serialize, Deserialize)]
struct PointRepr {
    #[serde(rename = "type", default = "point_type")]
    kind: String,
    coordinates: [f64; 2],
}

fn point_type() -> String {
    "Point".to_string()
}

impl From<PointRepr> for GeoPoint {
    fn from(repr: PointRepr) -> Self {
        GeoPoint {
            longitude: repr.coordinates[0],
            latitude: repr.coordinates[1],
        }
    }
}

impl From<GeoPoint> for PointRepr {
    fn from(point: GeoPoint) -> Self {
        PointRepr {
            kind: point_type(),
            coordinates: [point.longitude, point.latitude],
        }
    }
}

fn check_pair(longitude: f64, latitude: f64) -> Result<GeoPoint, Rejection> {
    if !longitude.is_finite() || !latitude.is_finite() {
        return Err(Rejection::NotFinite);
    }
    if longitude == 0.0 && latitude == 0.0 {
        return Err(Rejection::OriginSentinel);
    }
    Ok(GeoPoint {
        longitude,
        latitude,
    })
}

/// Check a raw `{ coordinates: [lng, lat] }` value, reporting why it was refused
pub fn check(raw: &Value) -> Result<GeoPoint, Rejection> {
    let pair = raw
        .get("coordinates")
        .and_then(Value::as_array)
        .filter(|items| items.len() == 2)
        .ok_or(Rejection::WrongShape)?;

    let longitude = pair[0].as_f64().ok_or(Rejection::NonNumeric)?;
    let latitude = pair[1].as_f64().ok_or(Rejection::NonNumeric)?;

    check_pair(longitude, latitude)
}

/// Sanitize a raw coordinate structure
///
/// Returns `None` for anything that is not a usable point. Never panics or errors; the
/// drop is logged so it stays visible in diagnostics.
pub fn sanitize(raw: &Value) -> Option<GeoPoint> {
    match check(raw) {
        Ok(point) => Some(point),
        Err(reason) => {
            warn!(%reason, "Dropping invalid coordinates");
            None
        }
    }
}

/// Sanitize coordinates delivered as a serialized JSON string (e.g. a multipart text field)
pub fn sanitize_str(raw: &str) -> Option<GeoPoint> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => sanitize(&value),
        Err(e) => {
            warn!(reason = %Rejection::Malformed, error = %e, "Dropping invalid coordinates");
            None
        }
    }
}

/// Re-check an already typed point, dropping it if it no longer passes
pub fn sanitize_point(point: GeoPoint) -> Option<GeoPoint> {
    match check_pair(point.longitude, point.latitude) {
        Ok(point) => Some(point),
        Err(reason) => {
            warn!(%reason, "Dropping invalid coordinates");
            None
        }
    }
}
