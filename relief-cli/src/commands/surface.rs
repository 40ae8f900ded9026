use anyhow::{Context, Result};
use relief::{
    geojson::surface_footprint, parse_dms, write_geotiff, Axis, Coverage, GeoTransform,
    HeightFieldBuilder, RasterInfo, ReliefService, Surface, SurfaceRequest,
};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::PipelineArgs;

/// Where and how to emit the surface.
pub struct Outputs {
    pub json: bool,
    pub grid: bool,
    pub csv: Option<PathBuf>,
    pub geotiff: Option<PathBuf>,
    pub geojson: Option<PathBuf>,
}

#[derive(Serialize)]
struct SurfaceResponse {
    lat: f64,
    lon: f64,
    x: f64,
    y: f64,
    radius: f64,
    rows: usize,
    cols: usize,
    coverage: &'static str,
    /// [left, bottom, right, top] of the pixels read, Lambert 72 metres.
    window: [f64; 4],
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean: Option<f64>,
    center_height: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    z: Option<Vec<Vec<f32>>>,
}

pub fn run(
    pipeline: &PipelineArgs,
    lat: &str,
    lon: &str,
    radius: f64,
    outputs: Outputs,
) -> Result<()> {
    let latitude = parse_dms(lat, Axis::Latitude).context("Invalid latitude")?;
    let longitude = parse_dms(lon, Axis::Longitude).context("Invalid longitude")?;

    let service = super::build_service(pipeline)?;
    let surface = service
        .surface(&SurfaceRequest::new(latitude, longitude, radius))
        .context("Failed to build surface")?;

    if let Some(path) = &outputs.csv {
        write_csv(&surface, path)?;
        eprintln!("Grid written to: {}", path.display());
    }
    if let Some(path) = &outputs.geotiff {
        write_window(&service, &surface, path)?;
        eprintln!("Window written to: {}", path.display());
    }
    if let Some(path) = &outputs.geojson {
        let feature = surface_footprint(&surface, service.reprojector(), service.raster_info().nodata)
            .context("Failed to build footprint")?;
        let mut writer = BufWriter::new(File::create(path).context("Failed to create output file")?);
        serde_json::to_writer_pretty(&mut writer, &geojson::GeoJson::Feature(feature))?;
        writer.flush()?;
        eprintln!("Footprint written to: {}", path.display());
    }

    let summary = surface.grid.summary(service.raster_info().nodata);
    let center_height = service.readout(
        surface
            .grid
            .value_at(surface.rows() / 2, surface.cols() / 2)
            .map(f64::from),
    );

    if outputs.json {
        let b = surface.window.bounds;
        let response = SurfaceResponse {
            lat: surface.center.latitude,
            lon: surface.center.longitude,
            x: surface.projected.x,
            y: surface.projected.y,
            radius,
            rows: surface.rows(),
            cols: surface.cols(),
            coverage: coverage_name(surface.coverage()),
            window: [b.left, b.bottom, b.right, b.top],
            min: summary.as_ref().map(|s| s.min),
            max: summary.as_ref().map(|s| s.max),
            mean: summary.as_ref().map(|s| s.mean),
            center_height,
            z: outputs.grid.then(|| surface.grid.to_rows()),
        };
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    println!(
        "Point: {} {} ({:.6}, {:.6})",
        latitude, longitude, surface.center.latitude, surface.center.longitude
    );
    println!(
        "Lambert 72: x={:.2} y={:.2}",
        surface.projected.x, surface.projected.y
    );
    println!(
        "Grid: {}x{} ({} coverage, radius {}m)",
        surface.rows(),
        surface.cols(),
        coverage_name(surface.coverage()),
        radius
    );
    if let Some(s) = summary {
        println!("Elevation: min {:.2}m, max {:.2}m, mean {:.2}m", s.min, s.max, s.mean);
        if s.void > 0 {
            println!("Void samples: {}", s.void);
        }
    }
    println!("Height at centre: {center_height}");

    Ok(())
}

fn coverage_name(coverage: Coverage) -> &'static str {
    match coverage {
        Coverage::Full => "full",
        Coverage::Partial => "partial",
    }
}

fn write_csv(surface: &Surface, path: &Path) -> Result<()> {
    let file = File::create(path).context("Failed to create output file")?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    for row in 0..surface.rows() {
        if let Some(values) = surface.grid.row(row) {
            writer.write_record(values.iter().map(|v| v.to_string()))?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write the samples back out in raster orientation, georeferenced.
fn write_window(service: &ReliefService, surface: &Surface, path: &Path) -> Result<()> {
    let source = service.raster_info();
    let bounds = surface.window.bounds;
    let raw = HeightFieldBuilder.build(surface.grid.clone());

    let mut info = RasterInfo::new(
        raw.cols(),
        raw.rows(),
        GeoTransform::new(
            bounds.left,
            bounds.top,
            source.transform.pixel_width,
            source.transform.pixel_height,
        ),
    );
    info.nodata = source.nodata;
    info.epsg = source.epsg;

    write_geotiff(path, &info, raw.values(), 64).context("Failed to write GeoTIFF")
}
