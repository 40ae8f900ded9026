//! Basic example: sample the terrain around a few Flemish landmarks.
//!
//! Run with: cargo run --example basic -- /path/to/dhm_lambert72.tif

use relief::{ReliefError, ReliefService, SurfaceRequest};
use std::env;

fn main() -> Result<(), ReliefError> {
    // Get raster path from command line
    let raster = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example basic -- /path/to/dhm_lambert72.tif");
        std::process::exit(1);
    });

    // Keep up to 64 decoded chunks in memory
    let service = ReliefService::builder(&raster)
        .chunk_cache_size(64)
        .build()?;

    let locations = [
        ("Belfry of Bruges", ["51", "12", "31"], ["3", "13", "28"]),
        ("Kemmelberg", ["50", "46", "56"], ["2", "48", "46"]),
        ("Ghent Belfry", ["51", "3", "14"], ["3", "43", "31"]),
    ];

    println!("Surfaces (radius 300 m):");
    println!("{:-<60}", "");

    for (name, lat, lon) in locations {
        let request = SurfaceRequest::from_fields(lat, lon, 300.0)?;
        match service.surface(&request) {
            Ok(surface) => {
                let (rows, cols) = (surface.rows(), surface.cols());
                let center = surface.grid.value_at(rows / 2, cols / 2).map(f64::from);
                println!(
                    "{name}: {rows}x{cols} grid, centre height {}",
                    service.readout(center)
                );
                if let Some(summary) = surface.grid.summary(service.raster_info().nodata) {
                    println!(
                        "    min {:.1}m, max {:.1}m, mean {:.1}m",
                        summary.min, summary.max, summary.mean
                    );
                }
            }
            Err(e @ ReliefError::WindowOutOfBounds { .. }) => {
                println!("{name}: not covered by this raster ({e})");
            }
            Err(e) => {
                println!("{name}: error - {e}");
            }
        }
    }

    // Show cache statistics
    if let Some(stats) = service.cache_stats() {
        println!("\nChunk cache statistics:");
        println!("  Cached chunks: {}", stats.entry_count);
        println!("  Hits: {}", stats.hit_count);
        println!("  Misses: {}", stats.miss_count);
        println!("  Hit rate: {:.1}%", stats.hit_rate() * 100.0);
    }

    Ok(())
}
