//! Raster access behind a small trait.
//!
//! [`RasterSource`] is the seam between the pipeline and the backing store.
//! [`crate::GeoTiffRaster`] implements it over a memory-mapped GeoTIFF,
//! [`InMemoryRaster`] over a plain vector, which keeps tests independent of
//! any file on disk.

use std::sync::Arc;

use crate::error::{ReliefError, Result};
use crate::height::{HeightGrid, RowOrder};
use crate::window::{
    Bounds, Coverage, FittedWindow, GeoTransform, PixelWindow, SamplingWindow, WindowResolver,
};

/// Statistics about chunk cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of decoded chunks currently in the cache.
    pub entry_count: u64,
    /// Number of cache hits (chunks served from memory).
    pub hit_count: u64,
    /// Number of cache misses (chunks decoded from the file).
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Static description of a single-band raster.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    pub transform: GeoTransform,
    /// Value marking cells without data, if the file declares one
    pub nodata: Option<f32>,
    /// EPSG code from the GeoTIFF keys, if present
    pub epsg: Option<u16>,
}

impl RasterInfo {
    pub fn new(width: usize, height: usize, transform: GeoTransform) -> Self {
        Self {
            width,
            height,
            transform,
            nodata: None,
            epsg: None,
        }
    }

    pub fn with_nodata(mut self, nodata: f32) -> Self {
        self.nodata = Some(nodata);
        self
    }

    pub fn with_epsg(mut self, epsg: u16) -> Self {
        self.epsg = Some(epsg);
        self
    }

    /// Projected extent of the whole raster.
    pub fn bounds(&self) -> Bounds {
        Bounds::from_corners(
            self.transform.pixel_to_world(0.0, 0.0),
            self.transform
                .pixel_to_world(self.width as f64, self.height as f64),
        )
    }
}

/// Read-only access to band 1 of an elevation raster.
///
/// Implementations must be safe to share between threads. A window read
/// returns `window.width × window.height` samples in row-major order, row 0
/// being the northernmost row of the window.
pub trait RasterSource: Send + Sync {
    /// Size, georeferencing and nodata value of the raster.
    fn info(&self) -> &RasterInfo;

    /// Read the samples inside `window`.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::WindowRead`] if the window is empty or not
    /// entirely inside the raster, or if the storage cannot service it.
    fn read_window(&self, window: &PixelWindow) -> Result<Vec<f32>>;

    /// Chunk cache statistics, for sources that cache.
    fn cache_stats(&self) -> Option<CacheStats> {
        None
    }
}

/// Reject windows a source cannot serve.
pub(crate) fn check_window(window: &PixelWindow, info: &RasterInfo) -> Result<()> {
    if window.is_empty() {
        return Err(ReliefError::WindowRead(format!(
            "pixel window {window:?} has zero extent"
        )));
    }
    if !window.fits(info.width, info.height) {
        return Err(ReliefError::WindowRead(format!(
            "pixel window {window:?} exceeds the {}x{} raster",
            info.width, info.height
        )));
    }
    Ok(())
}

/// A raster held entirely in memory.
#[derive(Debug, Clone)]
pub struct InMemoryRaster {
    info: RasterInfo,
    data: Vec<f32>,
}

impl InMemoryRaster {
    /// Wrap row-major samples (row 0 = north edge).
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::InvalidGeoTiff`] if `data` does not hold
    /// `width × height` samples.
    pub fn new(info: RasterInfo, data: Vec<f32>) -> Result<Self> {
        if data.len() != info.width * info.height {
            return Err(ReliefError::InvalidGeoTiff(format!(
                "expected {} samples for a {}x{} raster, got {}",
                info.width * info.height,
                info.width,
                info.height,
                data.len()
            )));
        }
        Ok(Self { info, data })
    }

    /// Build a raster whose value at each cell is `f(row, col)`.
    pub fn from_fn(info: RasterInfo, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(info.width * info.height);
        for row in 0..info.height {
            for col in 0..info.width {
                data.push(f(row, col));
            }
        }
        Self { info, data }
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

impl RasterSource for InMemoryRaster {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&self, window: &PixelWindow) -> Result<Vec<f32>> {
        check_window(window, &self.info)?;

        let mut out = Vec::with_capacity(window.len());
        for row in window.row_off..window.row_off + window.height {
            let start = row * self.info.width + window.col_off;
            out.extend_from_slice(&self.data[start..start + window.width]);
        }
        Ok(out)
    }
}

/// Samples read for one request, still in raster row order.
#[derive(Debug, Clone)]
pub struct RasterWindow {
    /// Raw samples, row 0 = north.
    pub grid: HeightGrid,
    /// Where the samples came from.
    pub fitted: FittedWindow,
}

/// Reads sampling windows from a shared raster.
///
/// Holds the only handle to the backing store; clones share it.
#[derive(Clone)]
pub struct RasterWindowReader {
    source: Arc<dyn RasterSource>,
    resolver: WindowResolver,
}

impl RasterWindowReader {
    pub fn new(source: Arc<dyn RasterSource>, resolver: WindowResolver) -> Self {
        Self { source, resolver }
    }

    pub fn info(&self) -> &RasterInfo {
        self.source.info()
    }

    pub fn resolver(&self) -> &WindowResolver {
        &self.resolver
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.source.cache_stats()
    }

    /// Fit `window` onto the raster and read the covered pixels.
    ///
    /// # Errors
    ///
    /// - [`ReliefError::WindowOutOfBounds`] when the window misses the
    ///   raster (or overhangs it with clipping disabled)
    /// - [`ReliefError::WindowRead`] for empty windows and storage failures
    pub fn read(&self, window: &SamplingWindow) -> Result<RasterWindow> {
        let fitted = self.resolver.fit(window, self.source.info())?;

        if fitted.coverage == Coverage::Partial {
            tracing::warn!(
                requested = ?window,
                served = ?fitted.bounds,
                "Window clipped to raster bounds"
            );
        }

        let values = self.source.read_window(&fitted.pixels)?;
        if values.len() != fitted.pixels.len() {
            return Err(ReliefError::WindowRead(format!(
                "source returned {} samples for a {}x{} window",
                values.len(),
                fitted.pixels.width,
                fitted.pixels.height
            )));
        }

        tracing::debug!(
            col_off = fitted.pixels.col_off,
            row_off = fitted.pixels.row_off,
            cols = fitted.pixels.width,
            rows = fitted.pixels.height,
            "Window read"
        );

        let grid = HeightGrid::new(
            fitted.pixels.height,
            fitted.pixels.width,
            values,
            RowOrder::NorthFirst,
        )?;
        Ok(RasterWindow { grid, fitted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutOfBoundsKind;

    fn gradient_raster() -> InMemoryRaster {
        // 10 columns × 6 rows, 1 m pixels; value = row * 100 + col.
        let info = RasterInfo::new(10, 6, GeoTransform::new(1000.0, 2000.0, 1.0, -1.0));
        InMemoryRaster::from_fn(info, |row, col| (row * 100 + col) as f32)
    }

    #[test]
    fn test_in_memory_read_window() {
        let raster = gradient_raster();
        let values = raster.read_window(&PixelWindow::new(2, 1, 3, 2)).unwrap();
        assert_eq!(values, vec![102.0, 103.0, 104.0, 202.0, 203.0, 204.0]);
    }

    #[test]
    fn test_in_memory_rejects_bad_windows() {
        let raster = gradient_raster();
        assert!(matches!(
            raster.read_window(&PixelWindow::new(0, 0, 0, 3)),
            Err(ReliefError::WindowRead(_))
        ));
        assert!(matches!(
            raster.read_window(&PixelWindow::new(8, 0, 3, 1)),
            Err(ReliefError::WindowRead(_))
        ));
    }

    #[test]
    fn test_in_memory_size_mismatch() {
        let info = RasterInfo::new(4, 4, GeoTransform::new(0.0, 0.0, 1.0, -1.0));
        assert!(InMemoryRaster::new(info, vec![0.0; 15]).is_err());
    }

    #[test]
    fn test_raster_bounds() {
        let raster = gradient_raster();
        assert_eq!(
            raster.info().bounds(),
            Bounds::new(1000.0, 1994.0, 1010.0, 2000.0)
        );
    }

    #[test]
    fn test_reader_reads_fitted_window() {
        let reader = RasterWindowReader::new(Arc::new(gradient_raster()), WindowResolver::default());
        // Center (1004, 1997), radius 1: cols 3..5, rows 2..4.
        let window = Bounds::new(1003.0, 1996.0, 1005.0, 1998.0);
        let read = reader.read(&window).unwrap();

        assert_eq!(read.fitted.pixels, PixelWindow::new(3, 2, 2, 2));
        assert_eq!(read.grid.shape(), (2, 2));
        assert_eq!(read.grid.values(), &[203.0, 204.0, 303.0, 304.0]);
        assert_eq!(read.grid.order(), RowOrder::NorthFirst);
    }

    #[test]
    fn test_reader_fully_outside() {
        let reader = RasterWindowReader::new(Arc::new(gradient_raster()), WindowResolver::default());
        let window = Bounds::new(5000.0, 5000.0, 5010.0, 5010.0);
        let err = reader.read(&window).unwrap_err();
        assert!(matches!(
            err,
            ReliefError::WindowOutOfBounds {
                kind: OutOfBoundsKind::FullyOutside
            }
        ));
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            entry_count: 3,
            hit_count: 3,
            miss_count: 1,
        };
        assert_eq!(stats.hit_rate(), 0.75);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
        assert!(gradient_raster().cache_stats().is_none());
    }
}
