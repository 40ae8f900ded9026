//! The coordinate-to-surface pipeline with injected, shared collaborators.
//!
//! [`ReliefService`] owns one raster reader and one reprojector for the
//! lifetime of the process and turns a [`SurfaceRequest`] into a
//! [`Surface`]. Hover values go through the same service so the offset
//! configuration lives in one place.
//!
//! ```ignore
//! use relief::{ReliefServiceBuilder, SurfaceRequest};
//!
//! let service = ReliefServiceBuilder::new("/data/dhm_lambert72.tif")
//!     .chunk_cache_size(512)
//!     .build()?;
//!
//! let request = SurfaceRequest::from_fields(["51", "12", "31"], ["3", "13", "28"], 300.0)?;
//! let surface = service.surface(&request)?;
//! println!("{}x{} grid", surface.rows(), surface.cols());
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::dms::{Axis, Dms, GeoPoint};
use crate::error::{ReliefError, Result};
use crate::geotiff::{GeoTiffRaster, DEFAULT_CHUNK_CACHE_SIZE};
use crate::height::{HeightFieldBuilder, HeightGrid, PointHeightResolver, DEFAULT_VERTICAL_OFFSET};
use crate::projection::{ProjectedPoint, Reprojector, TARGET_EPSG};
use crate::raster::{CacheStats, RasterInfo, RasterSource, RasterWindowReader};
use crate::window::{Coverage, FittedWindow, SamplingWindow, WindowResolver};

/// Behaviour switches shared by every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Subtract `vertical_offset` from hovered heights.
    pub apply_vertical_offset: bool,
    /// Metres subtracted at point query time.
    pub vertical_offset: f64,
    /// Clip windows that overhang the raster instead of failing.
    pub clip_window_to_bounds: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            apply_vertical_offset: true,
            vertical_offset: DEFAULT_VERTICAL_OFFSET,
            clip_window_to_bounds: true,
        }
    }
}

/// A point and radius to sample around.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRequest {
    pub latitude: Dms,
    pub longitude: Dms,
    /// Half the side of the square window, in metres.
    pub radius: f64,
}

impl SurfaceRequest {
    pub fn new(latitude: Dms, longitude: Dms, radius: f64) -> Self {
        Self {
            latitude,
            longitude,
            radius,
        }
    }

    /// Build a request from the six text fields of a DMS form.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::InvalidCoordinateFormat`] if any field does not
    /// parse or is out of range.
    pub fn from_fields(latitude: [&str; 3], longitude: [&str; 3], radius: f64) -> Result<Self> {
        let [d, m, s] = latitude;
        let latitude = Dms::parse_fields(d, m, s, Axis::Latitude)?;
        let [d, m, s] = longitude;
        let longitude = Dms::parse_fields(d, m, s, Axis::Longitude)?;
        Ok(Self::new(latitude, longitude, radius))
    }

    /// Decimal-degree centre of the request.
    pub fn point(&self) -> Result<GeoPoint> {
        GeoPoint::from_dms(&self.latitude, &self.longitude)
    }
}

/// A sampled terrain surface ready for rendering.
#[derive(Debug, Clone)]
pub struct Surface {
    /// Elevations, row 0 = southernmost.
    pub grid: HeightGrid,
    pub center: GeoPoint,
    pub projected: ProjectedPoint,
    /// The square window that was asked for.
    pub requested: SamplingWindow,
    /// The pixels that were actually read.
    pub window: FittedWindow,
}

impl Surface {
    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn coverage(&self) -> Coverage {
        self.window.coverage
    }
}

/// Elevation surface service.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct ReliefService {
    reader: RasterWindowReader,
    reprojector: Reprojector,
    height_field: HeightFieldBuilder,
    heights: PointHeightResolver,
    options: PipelineOptions,
}

impl ReliefService {
    /// Create a builder for a GeoTIFF-backed service.
    pub fn builder<P: AsRef<Path>>(raster: P) -> ReliefServiceBuilder {
        ReliefServiceBuilder::new(raster)
    }

    /// Wire the pipeline around an already opened raster.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::UnsupportedCrs`] if the projection definitions
    /// cannot be loaded.
    pub fn with_source(source: Arc<dyn RasterSource>, options: PipelineOptions) -> Result<Self> {
        match source.info().epsg {
            Some(epsg) if epsg != TARGET_EPSG => tracing::warn!(
                raster_epsg = epsg,
                expected = TARGET_EPSG,
                "Raster CRS differs from the projection target; windows may be misplaced"
            ),
            None => tracing::warn!(
                expected = TARGET_EPSG,
                "Raster declares no CRS; assuming Belgian Lambert 72"
            ),
            _ => {}
        }

        Ok(Self {
            reader: RasterWindowReader::new(
                source,
                WindowResolver::new(options.clip_window_to_bounds),
            ),
            reprojector: Reprojector::new()?,
            height_field: HeightFieldBuilder,
            heights: PointHeightResolver::new(
                options.apply_vertical_offset,
                options.vertical_offset,
            ),
            options,
        })
    }

    /// Run the full pipeline for a DMS request.
    ///
    /// # Errors
    ///
    /// Any [`ReliefError`] raised by a stage; the service stays usable
    /// afterwards.
    pub fn surface(&self, request: &SurfaceRequest) -> Result<Surface> {
        let center = request.point()?;
        self.surface_at(center, request.radius)
    }

    /// Run the pipeline from a decimal-degree centre.
    pub fn surface_at(&self, center: GeoPoint, radius: f64) -> Result<Surface> {
        let projected = self.reprojector.reproject(center)?;
        let requested = self.reader.resolver().resolve(projected, radius)?;

        tracing::debug!(
            lat = center.latitude,
            lon = center.longitude,
            x = projected.x,
            y = projected.y,
            radius,
            "Resolved sampling window"
        );

        let raw = self.reader.read(&requested)?;
        let grid = self.height_field.build(raw.grid);

        Ok(Surface {
            grid,
            center,
            projected,
            requested,
            window: raw.fitted,
        })
    }

    /// Height string for a hovered value.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::NoPointSelected`] when nothing is hovered.
    pub fn resolve_height(&self, value: Option<f64>) -> Result<String> {
        self.heights.resolve_height(value)
    }

    /// Height string for a hovered value, or the placeholder.
    pub fn readout(&self, value: Option<f64>) -> String {
        self.heights.readout(value)
    }

    pub fn raster_info(&self) -> &RasterInfo {
        self.reader.info()
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn reprojector(&self) -> &Reprojector {
        &self.reprojector
    }

    /// Chunk cache statistics of the backing raster, if it caches.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.reader.cache_stats()
    }
}

/// Builder for [`ReliefService`].
///
/// # Example
///
/// ```ignore
/// use relief::ReliefServiceBuilder;
///
/// let service = ReliefServiceBuilder::from_env()?
///     .apply_vertical_offset(false)
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct ReliefServiceBuilder {
    raster: PathBuf,
    chunk_cache_size: u64,
    options: PipelineOptions,
}

impl ReliefServiceBuilder {
    /// Create a new builder for the GeoTIFF at `raster`.
    pub fn new<P: AsRef<Path>>(raster: P) -> Self {
        Self {
            raster: raster.as_ref().to_path_buf(),
            chunk_cache_size: DEFAULT_CHUNK_CACHE_SIZE,
            options: PipelineOptions::default(),
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `RELIEF_RASTER` | Path to the elevation GeoTIFF | Required |
    /// | `RELIEF_CHUNK_CACHE_SIZE` | Decoded chunks kept in memory | 256 |
    /// | `RELIEF_VERTICAL_OFFSET` | Metres subtracted at point query | 8.0 |
    /// | `RELIEF_APPLY_OFFSET` | Apply the vertical offset | true |
    /// | `RELIEF_CLIP_WINDOW` | Clip windows overhanging the raster | true |
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::Config`] if `RELIEF_RASTER` is not set or a
    /// variable holds an unparsable value.
    pub fn from_env() -> Result<Self> {
        let raster = std::env::var("RELIEF_RASTER").map_err(|_| {
            ReliefError::Config("RELIEF_RASTER environment variable not set".to_string())
        })?;

        let defaults = PipelineOptions::default();
        Ok(Self {
            raster: PathBuf::from(raster),
            chunk_cache_size: env_parse("RELIEF_CHUNK_CACHE_SIZE", DEFAULT_CHUNK_CACHE_SIZE)?,
            options: PipelineOptions {
                apply_vertical_offset: env_flag(
                    "RELIEF_APPLY_OFFSET",
                    defaults.apply_vertical_offset,
                )?,
                vertical_offset: env_parse("RELIEF_VERTICAL_OFFSET", defaults.vertical_offset)?,
                clip_window_to_bounds: env_flag(
                    "RELIEF_CLIP_WINDOW",
                    defaults.clip_window_to_bounds,
                )?,
            },
        })
    }

    /// Set the raster path.
    pub fn raster<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.raster = path.as_ref().to_path_buf();
        self
    }

    /// Set the maximum number of decoded chunks to keep in cache.
    ///
    /// Default is 256 chunks.
    pub fn chunk_cache_size(mut self, size: u64) -> Self {
        self.chunk_cache_size = size;
        self
    }

    pub fn vertical_offset(mut self, offset: f64) -> Self {
        self.options.vertical_offset = offset;
        self
    }

    pub fn apply_vertical_offset(mut self, apply: bool) -> Self {
        self.options.apply_vertical_offset = apply;
        self
    }

    pub fn clip_window_to_bounds(mut self, clip: bool) -> Self {
        self.options.clip_window_to_bounds = clip;
        self
    }

    pub fn raster_path(&self) -> &Path {
        &self.raster
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Open the raster and build the [`ReliefService`].
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::Config`] for a non-finite offset, and any error
    /// from [`GeoTiffRaster::open`].
    pub fn build(self) -> Result<ReliefService> {
        if !self.options.vertical_offset.is_finite() {
            return Err(ReliefError::Config(format!(
                "vertical offset must be finite, got {}",
                self.options.vertical_offset
            )));
        }

        let raster = GeoTiffRaster::open(&self.raster, self.chunk_cache_size)?;
        ReliefService::with_source(Arc::new(raster), self.options)
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> Result<T> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ReliefError::Config(format!("{name}: cannot parse '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str, default: bool) -> Result<bool> {
    match std::env::var(name) {
        Ok(raw) => parse_flag(&raw)
            .ok_or_else(|| ReliefError::Config(format!("{name}: expected true/false, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
