use anyhow::{Context, Result};
use relief::{
    GeoTiffRaster, HeightGrid, PixelWindow, ProjectedPoint, RasterSource, Reprojector, RowOrder,
    TARGET_EPSG,
};

use crate::PipelineArgs;

pub fn run(pipeline: &PipelineArgs, stats: bool) -> Result<()> {
    let path = super::raster_path(pipeline)?;
    let raster = GeoTiffRaster::open(&path, pipeline.cache_size)
        .with_context(|| format!("Failed to open elevation raster {}", path.display()))?;
    let info = raster.info();
    let layout = raster.layout();
    let t = &info.transform;
    let bounds = info.bounds();

    let file_size = std::fs::metadata(&path)?.len();

    println!("Raster: {}", path.display());
    println!("File size: {}", super::format_size(file_size));
    println!();
    println!("Size: {}x{} pixels", info.width, info.height);
    println!("Pixel size: {}m x {}m", t.pixel_width, -t.pixel_height);
    println!("Origin: x={:.3} y={:.3}", t.origin_x, t.origin_y);
    println!(
        "Bounds (Lambert 72): left={:.3} bottom={:.3} right={:.3} top={:.3}",
        bounds.left, bounds.bottom, bounds.right, bounds.top
    );

    let reprojector = Reprojector::new()?;
    let sw = reprojector.unproject(ProjectedPoint::new(bounds.left, bounds.bottom));
    let ne = reprojector.unproject(ProjectedPoint::new(bounds.right, bounds.top));
    if let (Ok(sw), Ok(ne)) = (sw, ne) {
        println!(
            "Bounds (WGS84): {:.5}N {:.5}E to {:.5}N {:.5}E",
            sw.latitude, sw.longitude, ne.latitude, ne.longitude
        );
    }

    match info.epsg {
        Some(epsg) if epsg == TARGET_EPSG => println!("CRS: EPSG:{epsg}"),
        Some(epsg) => println!("CRS: EPSG:{epsg} (expected EPSG:{TARGET_EPSG})"),
        None => println!("CRS: not declared"),
    }
    match info.nodata {
        Some(nodata) => println!("Nodata: {nodata}"),
        None => println!("Nodata: none"),
    }
    println!(
        "Layout: {} of {}x{} ({} chunks)",
        if layout.tiled { "tiles" } else { "strips" },
        layout.chunk_width,
        layout.chunk_height,
        layout.chunk_count()
    );

    if stats {
        print_stats(&raster)?;
    }

    Ok(())
}

/// Scan the raster one chunk row at a time.
fn print_stats(raster: &GeoTiffRaster) -> Result<()> {
    let info = raster.info();
    let band = raster.layout().chunk_height;

    let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
    let (mut sum, mut valid, mut void) = (0.0f64, 0usize, 0usize);

    for row_off in (0..info.height).step_by(band) {
        let rows = band.min(info.height - row_off);
        let values = raster
            .read_window(&PixelWindow::new(0, row_off, info.width, rows))
            .with_context(|| format!("Failed to read rows {row_off}..{}", row_off + rows))?;
        let grid = HeightGrid::new(rows, info.width, values, RowOrder::NorthFirst)?;

        match grid.summary(info.nodata) {
            Some(s) => {
                min = min.min(s.min);
                max = max.max(s.max);
                sum += s.mean * s.valid as f64;
                valid += s.valid;
                void += s.void;
            }
            None => void += grid.values().len(),
        }
        // Each band is read once; keep the cache from filling with it.
        raster.clear_cache();
    }

    println!();
    if valid > 0 {
        println!("Min elevation: {min:.2}m");
        println!("Max elevation: {max:.2}m");
        println!("Mean elevation: {:.2}m", sum / valid as f64);
    }
    if void > 0 {
        let total = (info.width * info.height) as f64;
        println!("Void samples: {} ({:.1}%)", void, void as f64 / total * 100.0);
    }

    Ok(())
}
