//! Sampling windows in projected and pixel space.
//!
//! A request becomes a square [`SamplingWindow`] around the projected center
//! point, which is then fitted onto the raster grid through its affine
//! [`GeoTransform`] to give the [`PixelWindow`] that is actually read.

use crate::error::{OutOfBoundsKind, ReliefError, Result};
use crate::projection::ProjectedPoint;
use crate::raster::RasterInfo;

/// Affine mapping between pixel indices and projected coordinates.
///
/// Only north-up rasters without rotation terms are supported, which covers
/// every DEM produced by the usual GeoTIFF writers. `pixel_height` is
/// negative when row 0 is the northern edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// X coordinate of the outer corner of pixel (0, 0)
    pub origin_x: f64,
    /// Y coordinate of the outer corner of pixel (0, 0)
    pub origin_y: f64,
    /// Pixel size along X (metres per column)
    pub pixel_width: f64,
    /// Pixel size along Y (metres per row, usually negative)
    pub pixel_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            pixel_width,
            pixel_height,
        }
    }

    /// Projected coordinates of a (fractional) pixel position.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x + col * self.pixel_width,
            self.origin_y + row * self.pixel_height,
        )
    }

    /// Fractional pixel position of projected coordinates.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x - self.origin_x) / self.pixel_width,
            (y - self.origin_y) / self.pixel_height,
        )
    }

    /// Whether both pixel sizes are finite and non-zero.
    pub fn is_valid(&self) -> bool {
        self.origin_x.is_finite()
            && self.origin_y.is_finite()
            && self.pixel_width.is_finite()
            && self.pixel_height.is_finite()
            && self.pixel_width != 0.0
            && self.pixel_height != 0.0
    }

    /// Whether row 0 is the northern edge and columns grow eastwards.
    pub fn is_north_up(&self) -> bool {
        self.pixel_width > 0.0 && self.pixel_height < 0.0
    }
}

/// Axis-aligned rectangle in projected units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

/// The square region requested around a projected point.
pub type SamplingWindow = Bounds;

impl Bounds {
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
        Self {
            left,
            bottom,
            right,
            top,
        }
    }

    /// Rectangle spanned by two corners given in any order.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        Self {
            left: a.0.min(b.0),
            bottom: a.1.min(b.1),
            right: a.0.max(b.0),
            top: a.1.max(b.1),
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    pub fn center(&self) -> ProjectedPoint {
        ProjectedPoint::new(
            (self.left + self.right) / 2.0,
            (self.bottom + self.top) / 2.0,
        )
    }

    /// Whether the two rectangles share a non-empty area.
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.bottom < other.top
            && self.top > other.bottom
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Bounds) -> bool {
        other.left >= self.left
            && other.right <= self.right
            && other.bottom >= self.bottom
            && other.top <= self.top
    }
}

/// A rectangular block of raster pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    /// First column (0 = west edge)
    pub col_off: usize,
    /// First row (0 = north edge)
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether the window fits inside a raster of the given size.
    pub fn fits(&self, raster_width: usize, raster_height: usize) -> bool {
        self.col_off + self.width <= raster_width && self.row_off + self.height <= raster_height
    }
}

/// How much of the requested window the raster could serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coverage {
    /// The whole window lies inside the raster.
    Full,
    /// The window was clipped to the raster edge.
    Partial,
}

/// A sampling window fitted onto the raster grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FittedWindow {
    /// Pixels to read.
    pub pixels: PixelWindow,
    /// Projected bounds of exactly those pixels.
    pub bounds: Bounds,
    pub coverage: Coverage,
}

/// Computes sampling windows and maps them onto a raster.
#[derive(Debug, Clone, Copy)]
pub struct WindowResolver {
    clip_to_bounds: bool,
}

impl Default for WindowResolver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl WindowResolver {
    /// Create a resolver.
    ///
    /// With `clip_to_bounds` set, windows that extend past the raster edge
    /// are clipped and flagged [`Coverage::Partial`]; otherwise they fail with
    /// [`OutOfBoundsKind::Partial`].
    pub fn new(clip_to_bounds: bool) -> Self {
        Self { clip_to_bounds }
    }

    pub fn clips_to_bounds(&self) -> bool {
        self.clip_to_bounds
    }

    /// Square window of side `2 × radius` centred on `center`.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::InvalidRadius`] unless `radius` is finite and
    /// strictly positive.
    pub fn resolve(&self, center: ProjectedPoint, radius: f64) -> Result<SamplingWindow> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ReliefError::InvalidRadius { radius });
        }

        Ok(SamplingWindow::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        ))
    }

    /// Convert a projected window into the pixel window to read.
    ///
    /// Window edges are rounded to the nearest pixel boundary.
    ///
    /// # Errors
    ///
    /// - [`ReliefError::WindowRead`] if the window covers no whole pixel
    /// - [`ReliefError::WindowOutOfBounds`] if the window misses the raster
    ///   entirely, or extends past its edge while clipping is disabled
    pub fn fit(&self, window: &SamplingWindow, info: &RasterInfo) -> Result<FittedWindow> {
        let transform = &info.transform;
        if !transform.is_valid() {
            return Err(ReliefError::WindowRead(format!(
                "raster has an unusable geotransform: {transform:?}"
            )));
        }

        let (c0, r0) = transform.world_to_pixel(window.left, window.top);
        let (c1, r1) = transform.world_to_pixel(window.right, window.bottom);
        let col_start = c0.min(c1).round();
        let col_end = c0.max(c1).round();
        let row_start = r0.min(r1).round();
        let row_end = r0.max(r1).round();

        if ![col_start, col_end, row_start, row_end]
            .iter()
            .all(|v| v.is_finite())
            || col_end <= col_start
            || row_end <= row_start
        {
            return Err(ReliefError::WindowRead(format!(
                "window {window:?} covers no whole pixel"
            )));
        }

        let raster_cols = info.width as f64;
        let raster_rows = info.height as f64;

        let clipped_col_start = col_start.max(0.0);
        let clipped_col_end = col_end.min(raster_cols);
        let clipped_row_start = row_start.max(0.0);
        let clipped_row_end = row_end.min(raster_rows);

        if clipped_col_end <= clipped_col_start || clipped_row_end <= clipped_row_start {
            return Err(ReliefError::WindowOutOfBounds {
                kind: OutOfBoundsKind::FullyOutside,
            });
        }

        let partial = clipped_col_start != col_start
            || clipped_col_end != col_end
            || clipped_row_start != row_start
            || clipped_row_end != row_end;

        if partial && !self.clip_to_bounds {
            return Err(ReliefError::WindowOutOfBounds {
                kind: OutOfBoundsKind::Partial,
            });
        }

        let pixels = PixelWindow::new(
            clipped_col_start as usize,
            clipped_row_start as usize,
            (clipped_col_end - clipped_col_start) as usize,
            (clipped_row_end - clipped_row_start) as usize,
        );
        let bounds = Bounds::from_corners(
            transform.pixel_to_world(clipped_col_start, clipped_row_start),
            transform.pixel_to_world(clipped_col_end, clipped_row_end),
        );

        Ok(FittedWindow {
            pixels,
            bounds,
            coverage: if partial {
                Coverage::Partial
            } else {
                Coverage::Full
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 1000 × 800 raster at 1 m, north-up, top-left corner at (69_000, 212_000).
    fn test_info() -> RasterInfo {
        RasterInfo::new(1000, 800, GeoTransform::new(69_000.0, 212_000.0, 1.0, -1.0))
    }

    #[test]
    fn test_resolve_square() {
        let resolver = WindowResolver::default();
        let center = ProjectedPoint::new(70_034.438, 211_576.558);

        for radius in [0.001, 1.0, 10.0, 300.0, 400.0, 12_345.678] {
            let w = resolver.resolve(center, radius).unwrap();
            assert!((w.width() - 2.0 * radius).abs() < 1e-6);
            assert!((w.height() - 2.0 * radius).abs() < 1e-6);
            assert!(w.left < w.right && w.bottom < w.top);
        }
    }

    #[test]
    fn test_resolve_invalid_radius() {
        let resolver = WindowResolver::default();
        let center = ProjectedPoint::new(0.0, 0.0);

        for radius in [0.0, -1.0, -300.0, f64::NAN, f64::INFINITY] {
            let err = resolver.resolve(center, radius).unwrap_err();
            assert!(matches!(err, ReliefError::InvalidRadius { .. }));
        }
    }

    #[test]
    fn test_fit_inside() {
        let resolver = WindowResolver::default();
        let window = resolver
            .resolve(ProjectedPoint::new(69_500.0, 211_600.0), 300.0)
            .unwrap();
        let fitted = resolver.fit(&window, &test_info()).unwrap();

        assert_eq!(fitted.coverage, Coverage::Full);
        assert_eq!(fitted.pixels, PixelWindow::new(200, 100, 600, 600));
        assert_eq!(fitted.bounds, window);
    }

    #[test]
    fn test_fit_fractional_center() {
        let resolver = WindowResolver::default();
        let window = resolver
            .resolve(ProjectedPoint::new(69_500.438, 211_600.558), 300.0)
            .unwrap();
        let fitted = resolver.fit(&window, &test_info()).unwrap();
        assert_eq!(fitted.pixels.width, 600);
        assert_eq!(fitted.pixels.height, 600);
    }

    #[test]
    fn test_fit_partial_clipped() {
        let resolver = WindowResolver::new(true);
        // Sticks out 100 m past the west edge and 50 m past the north edge.
        let window = resolver
            .resolve(ProjectedPoint::new(69_200.0, 211_750.0), 300.0)
            .unwrap();
        let fitted = resolver.fit(&window, &test_info()).unwrap();

        assert_eq!(fitted.coverage, Coverage::Partial);
        assert_eq!(fitted.pixels, PixelWindow::new(0, 0, 500, 550));
        assert_eq!(fitted.bounds.left, 69_000.0);
        assert_eq!(fitted.bounds.top, 212_000.0);
        assert!(fitted.pixels.fits(1000, 800));
    }

    #[test]
    fn test_fit_partial_without_clipping() {
        let resolver = WindowResolver::new(false);
        let window = resolver
            .resolve(ProjectedPoint::new(69_200.0, 211_750.0), 300.0)
            .unwrap();
        let err = resolver.fit(&window, &test_info()).unwrap_err();
        assert!(matches!(
            err,
            ReliefError::WindowOutOfBounds {
                kind: OutOfBoundsKind::Partial
            }
        ));
    }

    #[test]
    fn test_fit_fully_outside() {
        for clip in [true, false] {
            let resolver = WindowResolver::new(clip);
            let window = resolver
                .resolve(ProjectedPoint::new(150_000.0, 170_000.0), 300.0)
                .unwrap();
            let err = resolver.fit(&window, &test_info()).unwrap_err();
            assert!(matches!(
                err,
                ReliefError::WindowOutOfBounds {
                    kind: OutOfBoundsKind::FullyOutside
                }
            ));
        }
    }

    #[test]
    fn test_fit_touching_edge_is_outside() {
        let resolver = WindowResolver::default();
        // Right edge of the window equals the left edge of the raster.
        let window = Bounds::new(68_000.0, 211_000.0, 69_000.0, 211_500.0);
        let err = resolver.fit(&window, &test_info()).unwrap_err();
        assert!(matches!(err, ReliefError::WindowOutOfBounds { .. }));
    }

    #[test]
    fn test_fit_zero_extent() {
        let resolver = WindowResolver::default();
        let window = resolver
            .resolve(ProjectedPoint::new(69_500.0, 211_600.0), 0.2)
            .unwrap();
        let err = resolver.fit(&window, &test_info()).unwrap_err();
        assert!(matches!(err, ReliefError::WindowRead(_)));
    }

    #[test]
    fn test_fit_coarse_pixels() {
        // 5 m pixels: a 600 m window covers 120 × 120 pixels.
        let info = RasterInfo::new(400, 400, GeoTransform::new(69_000.0, 212_000.0, 5.0, -5.0));
        let resolver = WindowResolver::default();
        let window = resolver
            .resolve(ProjectedPoint::new(70_000.0, 211_000.0), 300.0)
            .unwrap();
        let fitted = resolver.fit(&window, &info).unwrap();
        assert_eq!(fitted.pixels, PixelWindow::new(140, 140, 120, 120));
    }

    #[test]
    fn test_transform_round_trip() {
        let t = GeoTransform::new(22_000.0, 245_000.0, 1.0, -1.0);
        let (x, y) = t.pixel_to_world(123.0, 456.0);
        assert_eq!((x, y), (22_123.0, 244_544.0));
        assert_eq!(t.world_to_pixel(x, y), (123.0, 456.0));
        assert!(!GeoTransform::new(0.0, 0.0, 0.0, -1.0).is_valid());
        assert!(t.is_north_up());
        assert!(!GeoTransform::new(0.0, 0.0, 1.0, 1.0).is_north_up());
    }

    #[test]
    fn test_bounds_relations() {
        let a = Bounds::new(0.0, 0.0, 10.0, 10.0);
        let b = Bounds::new(5.0, 5.0, 15.0, 15.0);
        let c = Bounds::new(2.0, 2.0, 4.0, 4.0);
        assert!(a.intersects(&b));
        assert!(a.contains(&c));
        assert!(!a.contains(&b));
        assert_eq!(a.center(), ProjectedPoint::new(5.0, 5.0));
    }
}
