//! Degrees-minutes-seconds parsing and conversion.
//!
//! Coordinates are entered as DMS triples, either as separate text fields or
//! in the compact notation `51°12'31"N`. Conversion follows
//! `decimal = degrees + minutes / 60 + seconds / 3600`.
//!
//! # Hemisphere
//!
//! Only the northern and eastern hemispheres are supported. Negative degrees
//! and an explicit `S`/`W` marker are rejected instead of being mapped to a
//! negative decimal value.

use std::fmt;

use crate::error::{ReliefError, Result};

/// Characters accepted between the components of a compact DMS string.
const SEPARATORS: [char; 7] = ['°', '\'', '"', '′', '″', ':', 'º'];

/// Which axis a DMS value describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    /// Largest absolute decimal value valid on this axis.
    pub fn limit(&self) -> f64 {
        match self {
            Axis::Latitude => 90.0,
            Axis::Longitude => 180.0,
        }
    }

    /// The only hemisphere letter accepted for this axis.
    pub fn hemisphere(&self) -> char {
        match self {
            Axis::Latitude => 'N',
            Axis::Longitude => 'E',
        }
    }

    fn opposite_hemisphere(&self) -> char {
        match self {
            Axis::Latitude => 'S',
            Axis::Longitude => 'W',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Latitude => f.write_str("latitude"),
            Axis::Longitude => f.write_str("longitude"),
        }
    }
}

/// A coordinate in degrees, minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dms {
    pub degrees: i32,
    pub minutes: i32,
    pub seconds: f64,
    pub axis: Axis,
}

impl Dms {
    pub fn new(degrees: i32, minutes: i32, seconds: f64, axis: Axis) -> Self {
        Self {
            degrees,
            minutes,
            seconds,
            axis,
        }
    }

    /// Parse the three separate text fields a form collects.
    ///
    /// Degrees and minutes must be integers, seconds may carry a fraction.
    /// Surrounding whitespace is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use relief::dms::{Axis, Dms};
    ///
    /// let dms = Dms::parse_fields("51", "12", "31", Axis::Latitude).unwrap();
    /// assert_eq!(dms.degrees, 51);
    /// assert!(Dms::parse_fields("51", "x", "31", Axis::Latitude).is_err());
    /// ```
    pub fn parse_fields(degrees: &str, minutes: &str, seconds: &str, axis: Axis) -> Result<Self> {
        let dms = Self {
            degrees: parse_integer(degrees, "degrees")?,
            minutes: parse_integer(minutes, "minutes")?,
            seconds: parse_seconds(seconds)?,
            axis,
        };
        dms.validate()?;
        Ok(dms)
    }

    /// Convert to decimal degrees, validating every component.
    pub fn to_decimal(&self) -> Result<f64> {
        self.validate()?;
        Ok(self.degrees as f64 + self.minutes as f64 / 60.0 + self.seconds / 3600.0)
    }

    fn validate(&self) -> Result<()> {
        if self.degrees < 0 {
            return Err(ReliefError::coordinate(
                self.to_string(),
                format!(
                    "negative degrees are not supported, {} is fixed to {}",
                    self.axis,
                    self.axis.hemisphere()
                ),
            ));
        }
        if !(0..60).contains(&self.minutes) {
            return Err(ReliefError::coordinate(
                self.to_string(),
                "minutes must be in [0, 60)",
            ));
        }
        if !self.seconds.is_finite() || !(0.0..60.0).contains(&self.seconds) {
            return Err(ReliefError::coordinate(
                self.to_string(),
                "seconds must be in [0, 60)",
            ));
        }

        let decimal = self.degrees as f64 + self.minutes as f64 / 60.0 + self.seconds / 3600.0;
        if decimal > self.axis.limit() {
            return Err(ReliefError::coordinate(
                self.to_string(),
                format!("{} must be within ±{}°", self.axis, self.axis.limit()),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Dms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}°{}'{}\"{}",
            self.degrees,
            self.minutes,
            self.seconds,
            self.axis.hemisphere()
        )
    }
}

/// Convert a DMS triple to decimal degrees.
///
/// # Examples
///
/// ```
/// use relief::dms::{convert, Axis};
///
/// let lat = convert(51, 12, 31.0, Axis::Latitude).unwrap();
/// assert!((lat - 51.208_611_111).abs() < 1e-6);
/// ```
pub fn convert(degrees: i32, minutes: i32, seconds: f64, axis: Axis) -> Result<f64> {
    Dms::new(degrees, minutes, seconds, axis).to_decimal()
}

/// Parse a compact DMS string such as `51°12'31"N` or `3 13 28 E`.
///
/// Minutes and seconds may be omitted. The trailing hemisphere letter is
/// optional, but when present it must be `N` for latitude and `E` for
/// longitude.
pub fn parse_dms(input: &str, axis: Axis) -> Result<Dms> {
    let trimmed = input.trim();

    let (body, hemisphere) = match trimmed.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => (
            &trimmed[..trimmed.len() - c.len_utf8()],
            Some(c.to_ascii_uppercase()),
        ),
        _ => (trimmed, None),
    };

    if let Some(h) = hemisphere {
        if h == axis.opposite_hemisphere() {
            return Err(ReliefError::coordinate(
                input,
                format!("hemisphere {h} is not supported, {axis} is fixed to {}", axis.hemisphere()),
            ));
        }
        if h != axis.hemisphere() {
            return Err(ReliefError::coordinate(
                input,
                format!("'{h}' is not a {axis} hemisphere"),
            ));
        }
    }

    let parts: Vec<&str> = body
        .split(|c: char| SEPARATORS.contains(&c) || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();

    let (degrees, minutes, seconds) = match parts.as_slice() {
        [d] => (*d, "0", "0"),
        [d, m] => (*d, *m, "0"),
        [d, m, s] => (*d, *m, *s),
        _ => {
            return Err(ReliefError::coordinate(
                input,
                "expected degrees, minutes and seconds",
            ))
        }
    };

    Dms::parse_fields(degrees, minutes, seconds, axis)
        .map_err(|e| match e {
            ReliefError::InvalidCoordinateFormat { reason, .. } => {
                ReliefError::coordinate(input, reason)
            }
            other => other,
        })
}

/// A geographic point in decimal degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Build a point from a latitude and a longitude DMS value.
    pub fn from_dms(latitude: &Dms, longitude: &Dms) -> Result<Self> {
        if latitude.axis != Axis::Latitude || longitude.axis != Axis::Longitude {
            return Err(ReliefError::coordinate(
                format!("{latitude} {longitude}"),
                "expected a latitude followed by a longitude",
            ));
        }
        Ok(Self::new(latitude.to_decimal()?, longitude.to_decimal()?))
    }
}

fn parse_integer(field: &str, name: &str) -> Result<i32> {
    let trimmed = field.trim();
    trimmed
        .parse::<i32>()
        .map_err(|_| ReliefError::coordinate(trimmed, format!("{name} must be an integer")))
}

fn parse_seconds(field: &str) -> Result<f64> {
    let trimmed = field.trim();
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ReliefError::coordinate(trimmed, "seconds must be a number")),
    }
}
