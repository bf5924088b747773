//! Geographic projection
//!
//! Maps raw GPS coordinates onto the map surface. Only points inside the
//! configured [`GeoBox`] are projected; anything else lands on the sentinel
//! origin.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors raised by the geographic projection
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// A minimum bound exceeds its maximum
    #[error(
        "inverted geographic box: lat {min_lat}..{max_lat}, lon {min_lon}..{max_lon}"
    )]
    InvertedBox {
        /// Configured southern edge
        min_lat: f64,
        /// Configured western edge
        min_lon: f64,
        /// Configured northern edge
        max_lat: f64,
        /// Configured eastern edge
        max_lon: f64,
    },

    /// A bound is NaN or infinite
    #[error("geographic box bounds must be finite")]
    NonFinite,

    /// The point lies outside the box
    #[error("position ({lat}, {lon}) is outside the geographic box")]
    OutOfBounds {
        /// Latitude of the rejected point
        lat: f64,
        /// Longitude of the rejected point
        lon: f64,
    },
}

/// A geographic coordinate in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude
    pub lat: f64,
    /// Longitude
    pub lon: f64,
}

impl GeoPoint {
    /// Create a point
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Rectangular lat/lon region in which positions are considered valid
///
/// Construction guarantees `min_lat <= max_lat` and `min_lon <= max_lon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoBox {
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
}

impl GeoBox {
    /// Validate and build a box
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Result<Self, GeoError> {
        if ![min_lat, min_lon, max_lat, max_lon].iter().all(|v| v.is_finite()) {
            return Err(GeoError::NonFinite);
        }
        if min_lat > max_lat || min_lon > max_lon {
            return Err(GeoError::InvertedBox {
                min_lat,
                min_lon,
                max_lat,
                max_lon,
            });
        }
        Ok(Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        })
    }

    /// South-west corner
    pub fn min(&self) -> GeoPoint {
        GeoPoint::new(self.min_lat, self.min_lon)
    }

    /// North-east corner
    pub fn max(&self) -> GeoPoint {
        GeoPoint::new(self.max_lat, self.max_lon)
    }

    /// Whether `point` lies inside the box (edges included)
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }
}

/// Current size of the rendering surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceDims {
    /// Width in pixels
    pub width: f64,
    /// Height in pixels
    pub height: f64,
}

impl SurfaceDims {
    /// Create surface dimensions
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A point on the rendering surface
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Horizontal pixel offset
    pub x: f64,
    /// Vertical pixel offset
    pub y: f64,
}

impl ScreenPoint {
    /// Sentinel used when no valid projection exists
    pub const ORIGIN: ScreenPoint = ScreenPoint { x: 0.0, y: 0.0 };
}

/// Project `point` onto a surface of size `dims`
///
/// Longitude maps to `x` and latitude to `y`. A zero-width axis of the box
/// projects to 0 on that axis.
pub fn project(point: GeoPoint, geo_box: &GeoBox, dims: SurfaceDims) -> Result<ScreenPoint, GeoError> {
    if !geo_box.contains(point) {
        return Err(GeoError::OutOfBounds {
            lat: point.lat,
            lon: point.lon,
        });
    }

    let fx = fraction(point.lon, geo_box.min_lon, geo_box.max_lon);
    let fy = fraction(point.lat, geo_box.min_lat, geo_box.max_lat);

    Ok(ScreenPoint {
        x: fx * dims.width,
        y: fy * dims.height,
    })
}

/// Like [`project`], but logs out-of-bounds points and returns the origin
pub fn project_or_origin(point: GeoPoint, geo_box: &GeoBox, dims: SurfaceDims) -> ScreenPoint {
    match project(point, geo_box, dims) {
        Ok(screen) => screen,
        Err(e) => {
            warn!("{e}");
            ScreenPoint::ORIGIN
        }
    }
}

fn fraction(value: f64, min: f64, max: f64) -> f64 {
    let span = max - min;
    if span == 0.0 {
        0.0
    } else {
        (value - min) / span
    }
}
