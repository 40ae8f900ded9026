//! GeoJSON export of surface footprints.
//!
//! Enable the `geojson` feature to use this module.
//!
//! # Example
//!
//! ```ignore
//! use relief::geojson::surface_footprint;
//!
//! let surface = service.surface(&request)?;
//! let feature = surface_footprint(&surface, service.reprojector(), service.raster_info().nodata)?;
//! println!("{}", feature.to_string());
//! ```

use geojson::{Feature, Geometry, JsonObject, JsonValue, Value as GeoJsonValue};

use crate::error::Result;
use crate::projection::{ProjectedPoint, Reprojector};
use crate::service::Surface;
use crate::window::Coverage;

/// Describe a surface as a GeoJSON `Feature`.
///
/// The geometry is the polygon of the pixels actually read, converted back
/// to WGS84 `[longitude, latitude]` and closed counter-clockwise. Properties
/// carry the grid shape, coverage, centre and elevation summary.
///
/// # Errors
///
/// Returns an error if a corner cannot be converted back to WGS84.
pub fn surface_footprint(
    surface: &Surface,
    reprojector: &Reprojector,
    nodata: Option<f32>,
) -> Result<Feature> {
    let b = &surface.window.bounds;
    let corners = [
        (b.left, b.bottom),
        (b.right, b.bottom),
        (b.right, b.top),
        (b.left, b.top),
        (b.left, b.bottom),
    ];

    let ring = corners
        .iter()
        .map(|&(x, y)| {
            reprojector
                .unproject(ProjectedPoint::new(x, y))
                .map(|p| vec![p.longitude, p.latitude])
        })
        .collect::<Result<Vec<_>>>()?;

    let mut properties = JsonObject::new();
    properties.insert("rows".to_string(), JsonValue::from(surface.rows()));
    properties.insert("cols".to_string(), JsonValue::from(surface.cols()));
    properties.insert(
        "coverage".to_string(),
        JsonValue::from(match surface.coverage() {
            Coverage::Full => "full",
            Coverage::Partial => "partial",
        }),
    );
    properties.insert(
        "center".to_string(),
        JsonValue::from(vec![surface.center.longitude, surface.center.latitude]),
    );
    properties.insert(
        "center_lambert72".to_string(),
        JsonValue::from(vec![surface.projected.x, surface.projected.y]),
    );
    if let Some(summary) = surface.grid.summary(nodata) {
        properties.insert("min".to_string(), JsonValue::from(summary.min));
        properties.insert("max".to_string(), JsonValue::from(summary.max));
        properties.insert("mean".to_string(), JsonValue::from(summary.mean));
        properties.insert("void".to_string(), JsonValue::from(summary.void));
    }

    Ok(Feature {
        bbox: None,
        geometry: Some(Geometry::new(GeoJsonValue::Polygon(vec![ring]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dms::GeoPoint;
    use crate::raster::{InMemoryRaster, RasterInfo};
    use crate::service::{PipelineOptions, ReliefService};
    use crate::window::GeoTransform;
    use std::sync::Arc;

    fn service() -> ReliefService {
        let info = RasterInfo::new(1000, 800, GeoTransform::new(69_500.0, 212_000.0, 1.0, -1.0))
            .with_epsg(31370);
        let raster = InMemoryRaster::from_fn(info, |row, col| (row + col) as f32);
        ReliefService::with_source(Arc::new(raster), PipelineOptions::default()).unwrap()
    }

    #[test]
    fn test_footprint_polygon_surrounds_center() {
        let service = service();
        let center = GeoPoint::new(51.208_611, 3.224_444);
        let surface = service.surface_at(center, 100.0).unwrap();
        let feature = surface_footprint(&surface, service.reprojector(), None).unwrap();

        let Some(Geometry {
            value: GeoJsonValue::Polygon(rings),
            ..
        }) = feature.geometry
        else {
            panic!("expected a polygon");
        };
        let ring = &rings[0];
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);

        let (min_lon, max_lon) = (ring[0][0], ring[1][0]);
        let (min_lat, max_lat) = (ring[0][1], ring[2][1]);
        assert!(min_lon < center.longitude && center.longitude < max_lon);
        assert!(min_lat < center.latitude && center.latitude < max_lat);
    }

    #[test]
    fn test_footprint_properties() {
        let service = service();
        let surface = service
            .surface_at(GeoPoint::new(51.208_611, 3.224_444), 50.0)
            .unwrap();
        let feature = surface_footprint(&surface, service.reprojector(), None).unwrap();
        let props = feature.properties.unwrap();

        assert_eq!(props["rows"], JsonValue::from(100));
        assert_eq!(props["cols"], JsonValue::from(100));
        assert_eq!(props["coverage"], JsonValue::from("full"));
        assert!(props.contains_key("mean"));
    }
}
