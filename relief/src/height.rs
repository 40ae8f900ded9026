//! Height grids and point height readouts.
//!
//! Rasters store row 0 at the northern edge, while surface renderers draw
//! row 0 at the bottom. [`HeightFieldBuilder`] flips the row order so the
//! rendered surface is not mirrored; values are passed through untouched.
//!
//! The readout shown under the cursor is produced by
//! [`PointHeightResolver`], which optionally subtracts a fixed vertical
//! offset. The grid itself never carries that offset.

use crate::error::{ReliefError, Result};

/// Offset subtracted from raw elevations when offset mode is enabled
/// (approximate height of Bruges above sea level).
pub const DEFAULT_VERTICAL_OFFSET: f64 = 8.0;

/// Readout shown before any point has been hovered.
pub const HEIGHT_PLACEHOLDER: &str = "0.00m";

/// Which geographic edge row 0 of a grid belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// Raster order: row 0 is the northern edge.
    NorthFirst,
    /// Renderer order: row 0 is the southern edge.
    SouthFirst,
}

impl RowOrder {
    fn flipped(self) -> Self {
        match self {
            RowOrder::NorthFirst => RowOrder::SouthFirst,
            RowOrder::SouthFirst => RowOrder::NorthFirst,
        }
    }
}

/// A rows × cols block of elevation samples in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct HeightGrid {
    rows: usize,
    cols: usize,
    values: Vec<f32>,
    order: RowOrder,
}

impl HeightGrid {
    /// # Errors
    ///
    /// Returns [`ReliefError::WindowRead`] if `values` does not hold exactly
    /// `rows × cols` samples.
    pub fn new(rows: usize, cols: usize, values: Vec<f32>, order: RowOrder) -> Result<Self> {
        if values.len() != rows * cols {
            return Err(ReliefError::WindowRead(format!(
                "{} samples do not form a {rows}x{cols} grid",
                values.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            values,
            order,
        })
    }

    /// Build a grid from nested rows, which must all have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>, order: RowOrder) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        if rows.iter().any(|r| r.len() != cols) {
            return Err(ReliefError::WindowRead("ragged rows".to_string()));
        }
        Self::new(n_rows, cols, rows.into_iter().flatten().collect(), order)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn order(&self) -> RowOrder {
        self.order
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        if row >= self.rows {
            return None;
        }
        Some(&self.values[row * self.cols..(row + 1) * self.cols])
    }

    /// Sample at a grid position, in this grid's own row order.
    pub fn value_at(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.values[row * self.cols + col])
    }

    /// Nested rows, the shape surface renderers expect for `z`.
    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        if self.cols == 0 {
            return vec![Vec::new(); self.rows];
        }
        self.values.chunks(self.cols).map(<[f32]>::to_vec).collect()
    }

    /// Min, max and mean over finite samples that are not `nodata`.
    pub fn summary(&self, nodata: Option<f32>) -> Option<GridSummary> {
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        let mut sum = 0.0f64;
        let mut valid = 0usize;

        for &v in &self.values {
            if !v.is_finite() || nodata == Some(v) {
                continue;
            }
            min = min.min(v);
            max = max.max(v);
            sum += v as f64;
            valid += 1;
        }

        if valid == 0 {
            return None;
        }

        Some(GridSummary {
            min,
            max,
            mean: sum / valid as f64,
            valid,
            void: self.values.len() - valid,
        })
    }
}

/// Summary statistics of a grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSummary {
    pub min: f32,
    pub max: f32,
    pub mean: f64,
    /// Number of samples that entered the statistics
    pub valid: usize,
    /// Number of nodata or non-finite samples
    pub void: usize,
}

/// Reorders raw raster rows for surface rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeightFieldBuilder;

impl HeightFieldBuilder {
    /// Reverse the row order: output row `i` is input row `rows - 1 - i`.
    ///
    /// No resampling, smoothing or offset is applied. Building twice yields
    /// the original grid.
    pub fn build(&self, raw: HeightGrid) -> HeightGrid {
        let HeightGrid {
            rows,
            cols,
            values,
            order,
        } = raw;

        let mut flipped = Vec::with_capacity(values.len());
        if cols > 0 {
            for row in values.chunks(cols).rev() {
                flipped.extend_from_slice(row);
            }
        }

        HeightGrid {
            rows,
            cols,
            values: flipped,
            order: order.flipped(),
        }
    }
}

/// Formats the height readout for a hovered point.
#[derive(Debug, Clone, Copy)]
pub struct PointHeightResolver {
    apply_offset: bool,
    offset: f64,
}

impl Default for PointHeightResolver {
    fn default() -> Self {
        Self::new(true, DEFAULT_VERTICAL_OFFSET)
    }
}

impl PointHeightResolver {
    pub fn new(apply_offset: bool, offset: f64) -> Self {
        Self {
            apply_offset,
            offset,
        }
    }

    pub fn applies_offset(&self) -> bool {
        self.apply_offset
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Height in metres with the offset applied, unrounded.
    pub fn height(&self, value: f64) -> f64 {
        if self.apply_offset {
            value - self.offset
        } else {
            value
        }
    }

    /// Readout string such as `"34.4m"`.
    ///
    /// # Errors
    ///
    /// Returns [`ReliefError::NoPointSelected`] when `value` is `None` or not
    /// finite. This is the normal state before the first hover.
    ///
    /// The value is rounded to one decimal on its exact binary value, ties to
    /// even, so `34.25` reads `34.2m`.
    ///
    /// # Examples
    ///
    /// ```
    /// use relief::PointHeightResolver;
    ///
    /// let with_offset = PointHeightResolver::new(true, 8.0);
    /// assert_eq!(with_offset.resolve_height(Some(42.37)).unwrap(), "34.4m");
    ///
    /// let raw = PointHeightResolver::new(false, 8.0);
    /// assert_eq!(raw.resolve_height(Some(42.37)).unwrap(), "42.4m");
    /// ```
    pub fn resolve_height(&self, value: Option<f64>) -> Result<String> {
        let value = value
            .filter(|v| v.is_finite())
            .ok_or(ReliefError::NoPointSelected)?;
        Ok(format!("{:.1}m", self.height(value)))
    }

    /// Like [`Self::resolve_height`], falling back to [`HEIGHT_PLACEHOLDER`].
    pub fn readout(&self, value: Option<f64>) -> String {
        self.resolve_height(value)
            .unwrap_or_else(|_| HEIGHT_PLACEHOLDER.to_string())
    }

    /// Readout for a hovered grid cell.
    pub fn resolve_at(&self, grid: &HeightGrid, row: usize, col: usize) -> Result<String> {
        self.resolve_height(grid.value_at(row, col).map(f64::from))
    }
}
