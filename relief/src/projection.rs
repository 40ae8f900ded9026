//! Reprojection from WGS84 geographic coordinates to Belgian Lambert 72.
//!
//! The elevation rasters are stored in EPSG:31370 (Belgian Lambert 72), while
//! user input is geographic EPSG:4326. Both CRS definitions come from the
//! `crs-definitions` database and are parsed into `proj4rs` projections once,
//! in [`Reprojector::new`]. The 31370 definition carries the BD72 datum shift
//! (`+towgs84`), so a single `transform` call covers datum and projection.

use std::fmt;

use proj4rs::proj::Proj;
use proj4rs::transform::transform;

use crate::dms::GeoPoint;
use crate::error::{ReliefError, Result};

/// EPSG code of the geographic input CRS.
pub const SOURCE_EPSG: u16 = 4326;

/// EPSG code of the projected raster CRS.
pub const TARGET_EPSG: u16 = 31370;

/// A point in the projected CRS, in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Look up an EPSG code and parse its PROJ.4 definition.
fn load_proj(epsg: u16) -> Result<Proj> {
    let def = crs_definitions::from_code(epsg).ok_or_else(|| ReliefError::UnsupportedCrs {
        epsg,
        reason: "not in the CRS definitions database".to_string(),
    })?;

    Proj::from_proj_string(def.proj4).map_err(|e| ReliefError::UnsupportedCrs {
        epsg,
        reason: format!("{e:?}"),
    })
}

/// Converts points between EPSG:4326 and EPSG:31370.
///
/// ```
/// use relief::{GeoPoint, Reprojector};
///
/// let reprojector = Reprojector::new().unwrap();
/// let p = reprojector.reproject(GeoPoint::new(51.2086, 3.2244)).unwrap();
/// assert!(p.x > 60_000.0 && p.x < 80_000.0);
/// ```
pub struct Reprojector {
    geographic: Proj,
    lambert: Proj,
}

impl fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojector")
            .field("source", &SOURCE_EPSG)
            .field("target", &TARGET_EPSG)
            .finish()
    }
}

impl Reprojector {
    /// Build the transformer for the fixed EPSG:4326 → EPSG:31370 pair.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::UnsupportedCrs`] if either definition is
    /// missing or cannot be parsed.
    pub fn new() -> Result<Self> {
        Ok(Self {
            geographic: load_proj(SOURCE_EPSG)?,
            lambert: load_proj(TARGET_EPSG)?,
        })
    }

    /// Source and target EPSG codes.
    pub fn epsg_pair(&self) -> (u16, u16) {
        (SOURCE_EPSG, TARGET_EPSG)
    }

    /// Transform a geographic point into projected metres.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::Reprojection`] for non-finite or out-of-range
    /// input, for the south pole, where the cone is singular, and for any
    /// failure reported by the transform.
    pub fn reproject(&self, point: GeoPoint) -> Result<ProjectedPoint> {
        let GeoPoint {
            latitude: lat,
            longitude: lon,
        } = point;
        let fail = |reason: String| ReliefError::Reprojection { lat, lon, reason };

        if !lat.is_finite() || !lon.is_finite() {
            return Err(fail("coordinates must be finite".to_string()));
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(fail("coordinates outside the geographic domain".to_string()));
        }
        if lat <= -90.0 + 1e-9 {
            return Err(fail("the south pole is singular for this projection".to_string()));
        }

        // Geographic coordinates go in as radians, (lon, lat) order.
        let mut xyz = (lon.to_radians(), lat.to_radians(), 0.0);
        transform(&self.geographic, &self.lambert, &mut xyz).map_err(|e| fail(format!("{e:?}")))?;

        let (x, y, _) = xyz;
        if !x.is_finite() || !y.is_finite() {
            return Err(fail("projection is undefined at this point".to_string()));
        }
        Ok(ProjectedPoint::new(x, y))
    }

    /// Transform a projected point back to geographic degrees.
    pub fn unproject(&self, point: ProjectedPoint) -> Result<GeoPoint> {
        let fail = |reason: String| ReliefError::Reprojection {
            lat: point.y,
            lon: point.x,
            reason,
        };
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(fail("projected coordinates must be finite".to_string()));
        }

        let mut xyz = (point.x, point.y, 0.0);
        transform(&self.lambert, &self.geographic, &mut xyz).map_err(|e| fail(format!("{e:?}")))?;

        let (lambda, phi, _) = xyz;
        Ok(GeoPoint::new(phi.to_degrees(), lambda.to_degrees()))
    }
}
