//! # relief - terrain surfaces around DMS coordinates
//!
//! Turns a point typed in degrees-minutes-seconds into a grid of elevations
//! sampled from a Belgian Lambert 72 (EPSG:31370) elevation raster, and
//! formats hovered heights for display.
//!
//! ## Pipeline
//!
//! 1. [`dms`]: DMS fields → decimal degrees ([`GeoPoint`])
//! 2. [`projection`]: WGS84 → Lambert 72 ([`Reprojector`])
//! 3. [`window`]: centre + radius → sampling window → pixel window
//! 4. [`raster`] / [`geotiff`]: read only the pixels inside the window
//! 5. [`height`]: flip rows so row 0 is south, format point heights
//!
//! [`ReliefService`] wires these together around one shared raster handle.
//!
//! ## Quick Start
//!
//! ```ignore
//! use relief::{ReliefServiceBuilder, SurfaceRequest};
//!
//! let service = ReliefServiceBuilder::new("/data/dhm_lambert72.tif").build()?;
//! let request = SurfaceRequest::from_fields(["51", "12", "31"], ["3", "13", "28"], 300.0)?;
//! let surface = service.surface(&request)?;
//!
//! assert_eq!((surface.rows(), surface.cols()), (600, 600));
//! println!("{}", service.readout(surface.grid.value_at(300, 300).map(f64::from)));
//! ```
//!
//! ## Raster Requirements
//!
//! - Single-band GeoTIFF (extra bands are ignored), any sample type
//! - Projected in EPSG:31370, north-up, no rotation
//! - Stripped or tiled; only the chunks a window touches are decoded

pub mod dms;
pub mod error;
#[cfg(feature = "geojson")]
pub mod geojson;
pub mod geotiff;
pub mod height;
pub mod projection;
pub mod raster;
pub mod service;
pub mod window;

// Re-export main types at crate root for convenience
pub use dms::{convert, parse_dms, Axis, Dms, GeoPoint};
pub use error::{OutOfBoundsKind, ReliefError, Result};
pub use geotiff::{write_geotiff, ChunkLayout, GeoTiffRaster, DEFAULT_CHUNK_CACHE_SIZE};
pub use height::{
    GridSummary, HeightFieldBuilder, HeightGrid, PointHeightResolver, RowOrder,
    DEFAULT_VERTICAL_OFFSET, HEIGHT_PLACEHOLDER,
};
pub use projection::{ProjectedPoint, Reprojector, SOURCE_EPSG, TARGET_EPSG};
pub use raster::{CacheStats, InMemoryRaster, RasterInfo, RasterSource, RasterWindowReader};
pub use service::{
    PipelineOptions, ReliefService, ReliefServiceBuilder, Surface, SurfaceRequest,
};
pub use window::{
    Bounds, Coverage, FittedWindow, GeoTransform, PixelWindow, SamplingWindow, WindowResolver,
};
