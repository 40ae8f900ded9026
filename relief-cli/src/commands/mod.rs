pub mod batch;
pub mod height;
pub mod info;
pub mod surface;

use anyhow::{Context, Result};
use relief::{ReliefService, ReliefServiceBuilder};
use std::path::PathBuf;

use crate::PipelineArgs;

fn raster_path(args: &PipelineArgs) -> Result<PathBuf> {
    args.raster
        .clone()
        .context("No elevation raster given. Use --raster or set RELIEF_RASTER")
}

/// Open the raster and wire the pipeline from the shared CLI settings.
fn build_service(args: &PipelineArgs) -> Result<ReliefService> {
    let path = raster_path(args)?;
    let options = args.options();

    ReliefServiceBuilder::new(&path)
        .chunk_cache_size(args.cache_size)
        .vertical_offset(options.vertical_offset)
        .apply_vertical_offset(options.apply_vertical_offset)
        .clip_window_to_bounds(options.clip_window_to_bounds)
        .build()
        .with_context(|| format!("Failed to open elevation raster {}", path.display()))
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
