//! Error types for the relief library.

use std::fmt;

use thiserror::Error;

/// How a requested window relates to the raster extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfBoundsKind {
    /// The window overlaps the raster but extends past at least one edge.
    Partial,
    /// The window does not overlap the raster at all.
    FullyOutside,
}

impl fmt::Display for OutOfBoundsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutOfBoundsKind::Partial => f.write_str("partial"),
            OutOfBoundsKind::FullyOutside => f.write_str("fully-outside"),
        }
    }
}

/// Errors that can occur while turning a coordinate into a terrain surface.
#[derive(Error, Debug)]
pub enum ReliefError {
    /// A DMS field could not be parsed or is out of range.
    #[error("Invalid coordinate format '{input}': {reason}")]
    InvalidCoordinateFormat { input: String, reason: String },

    /// The point cannot be represented in the target projection.
    #[error("Cannot reproject lat={lat}, lon={lon}: {reason}")]
    Reprojection { lat: f64, lon: f64, reason: String },

    /// A CRS definition is missing or could not be parsed.
    #[error("Unsupported CRS EPSG:{epsg}: {reason}")]
    UnsupportedCrs { epsg: u16, reason: String },

    /// The sampling radius is zero, negative or not finite.
    #[error("Invalid radius: {radius} (must be a finite value > 0)")]
    InvalidRadius { radius: f64 },

    /// The sampling window is not (entirely) inside the raster.
    #[error("Window out of raster bounds ({kind})")]
    WindowOutOfBounds { kind: OutOfBoundsKind },

    /// The backing raster could not service the window read.
    #[error("Window read failed: {0}")]
    WindowRead(String),

    /// A point query was made without a hovered point.
    #[error("No point selected")]
    NoPointSelected,

    /// IO error when opening or mapping the raster.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// The file is a TIFF but lacks the georeferencing we need.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// The decoder lock was poisoned by a panicking reader.
    #[error("Raster decoder lock was poisoned")]
    CacheLockPoisoned,

    /// Missing or malformed configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReliefError {
    pub(crate) fn coordinate(input: impl Into<String>, reason: impl Into<String>) -> Self {
        ReliefError::InvalidCoordinateFormat {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Whether the failure is tied to the request rather than to the raster.
    ///
    /// Request-level failures (bad input, window outside the raster, nothing
    /// hovered) leave the service fully usable for the next request.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ReliefError::InvalidCoordinateFormat { .. }
                | ReliefError::Reprojection { .. }
                | ReliefError::InvalidRadius { .. }
                | ReliefError::WindowOutOfBounds { .. }
                | ReliefError::NoPointSelected
        )
    }
}

/// Result type alias using [`ReliefError`].
pub type Result<T> = std::result::Result<T, ReliefError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReliefError::InvalidRadius { radius: -5.0 };
        assert!(err.to_string().contains("-5"));

        let err = ReliefError::WindowOutOfBounds {
            kind: OutOfBoundsKind::FullyOutside,
        };
        assert!(err.to_string().contains("fully-outside"));

        let err = ReliefError::coordinate("51°61'", "minutes must be in [0, 60)");
        assert!(err.to_string().contains("51°61'"));
        assert!(err.to_string().contains("minutes"));
    }

    #[test]
    fn test_recoverable_split() {
        assert!(ReliefError::NoPointSelected.is_recoverable());
        assert!(ReliefError::WindowOutOfBounds {
            kind: OutOfBoundsKind::Partial
        }
        .is_recoverable());
        assert!(!ReliefError::WindowRead("corrupt strip".into()).is_recoverable());
        assert!(!ReliefError::CacheLockPoisoned.is_recoverable());
    }
}
