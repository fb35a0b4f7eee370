//! Coordinates, bounding boxes and image requests.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, WaterwatchError};

/// Decimal places kept when a coordinate becomes a cache key (about 11 m at the equator)
pub const DEFAULT_COORDINATE_PRECISION: u32 = 4;

const MAX_COORDINATE_PRECISION: u32 = 9;

/// A validated WGS 84 coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = WaterwatchError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        Coordinate::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Create a coordinate, rejecting out-of-range or non-finite values
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        check_range("latitude", latitude, 90.0)?;
        check_range("longitude", longitude, 180.0)?;
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Round to a fixed number of decimal places for use in cache keys
    pub fn key(&self, precision: u32) -> CoordinateKey {
        CoordinateKey::new(self, precision)
    }

    /// Square bounding box around the coordinate, clipped to the valid range.
    /// The center stays the requested point even when the edges are clipped.
    pub fn bbox(&self, half_extent_deg: f64) -> BoundingBox {
        let half = half_extent_deg.abs();
        BoundingBox {
            min_lon: (self.longitude - half).max(-180.0),
            min_lat: (self.latitude - half).max(-90.0),
            max_lon: (self.longitude + half).min(180.0),
            max_lat: (self.latitude + half).min(90.0),
            center_lat: self.latitude,
            center_lon: self.longitude,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

fn check_range(field: &str, value: f64, limit: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(WaterwatchError::validation(field, format!("{} is not a finite number", value)));
    }
    if value < -limit || value > limit {
        return Err(WaterwatchError::validation(
            field,
            format!("{} is outside [-{}, {}]", value, limit, limit),
        ));
    }
    Ok(())
}

/// A coordinate rounded to a fixed precision.
///
/// Stored as scaled integers so that coordinates differing only in
/// floating-point noise compare and hash equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordinateKey {
    lat: i64,
    lon: i64,
    precision: u32,
}

impl CoordinateKey {
    pub fn new(coordinate: &Coordinate, precision: u32) -> Self {
        let precision = precision.min(MAX_COORDINATE_PRECISION);
        let scale = 10f64.powi(precision as i32);
        Self {
            lat: (coordinate.latitude * scale).round() as i64,
            lon: (coordinate.longitude * scale).round() as i64,
            precision,
        }
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn latitude_label(&self) -> String {
        format_scaled(self.lat, self.precision)
    }

    pub fn longitude_label(&self) -> String {
        format_scaled(self.lon, self.precision)
    }
}

impl fmt::Display for CoordinateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude_label(), self.longitude_label())
    }
}

// Integer formatting: no float round-trip, no "-0.0000".
fn format_scaled(value: i64, precision: u32) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.unsigned_abs();
    if precision == 0 {
        return format!("{}{}", sign, abs);
    }
    let scale = 10u64.pow(precision);
    format!("{}{}.{:0width$}", sign, abs / scale, abs % scale, width = precision as usize)
}

/// Bounding box in degrees: [min_lon, min_lat, max_lon, max_lat]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
    /// The point the box was built around
    pub center_lat: f64,
    pub center_lon: f64,
}

impl BoundingBox {
    pub fn to_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }

    /// Requested point as (latitude, longitude), unaffected by clipping
    pub fn center(&self) -> (f64, f64) {
        (self.center_lat, self.center_lon)
    }

    pub fn width_deg(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height_deg(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

/// Requested image size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl Default for ImageDimensions {
    fn default() -> Self {
        Self::square(512)
    }
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(WaterwatchError::validation(
                "dimensions",
                format!("{}x{} has a zero side", width, height),
            ));
        }
        Ok(Self { width, height })
    }

    pub fn square(side: u32) -> Self {
        Self {
            width: side.max(1),
            height: side.max(1),
        }
    }
}

impl fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// What the acquisition orchestrator is asked for. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageRequest {
    coordinate: Coordinate,
    date: NaiveDate,
    dimensions: ImageDimensions,
}

impl ImageRequest {
    pub fn new(coordinate: Coordinate, date: NaiveDate, dimensions: ImageDimensions) -> Self {
        Self {
            coordinate,
            date,
            dimensions,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn dimensions(&self) -> ImageDimensions {
        self.dimensions
    }

    pub fn bbox(&self, half_extent_deg: f64) -> BoundingBox {
        self.coordinate.bbox(half_extent_deg)
    }
}

/// Parse an ISO calendar date (`YYYY-MM-DD`)
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        WaterwatchError::validation("date", format!("'{}' is not a YYYY-MM-DD date: {}", value, e))
    })
}
