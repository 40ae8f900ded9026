use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use relief::{parse_dms, Axis, Coverage, ReliefService, SurfaceRequest};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::PipelineArgs;

const OUTPUT_COLUMNS: [&str; 8] = [
    "rows",
    "cols",
    "coverage",
    "min",
    "max",
    "mean",
    "center_height",
    "error",
];

pub fn run(
    pipeline: &PipelineArgs,
    input: PathBuf,
    output: Option<PathBuf>,
    lat_col: &str,
    lon_col: &str,
    radius_col: Option<&str>,
    radius: f64,
) -> Result<()> {
    let service = super::build_service(pipeline)?;

    let file = File::open(&input).context("Failed to open input file")?;
    let mut reader = csv::Reader::from_reader(BufReader::new(file));

    // Find column indices
    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("Column '{}' not found in CSV", name))
    };
    let lat_idx = column(lat_col)?;
    let lon_idx = column(lon_col)?;
    let radius_idx = radius_col.map(column).transpose()?;

    // Collect records for progress bar
    let records: Vec<_> = reader.records().collect::<Result<_, _>>()?;
    let total = records.len() as u64;

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let output_path = output.unwrap_or_else(|| default_output(&input));
    let output_file = File::create(&output_path).context("Failed to create output file")?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(output_file));

    // Write header
    let mut new_headers: Vec<&str> = headers.iter().collect();
    new_headers.extend(OUTPUT_COLUMNS);
    writer.write_record(&new_headers)?;

    let mut failed = 0u64;
    for record in records {
        let row_radius = match radius_idx.and_then(|i| record.get(i)) {
            Some(raw) if !raw.trim().is_empty() => raw.trim().parse().ok(),
            _ => Some(radius),
        };

        let columns = match row_radius {
            Some(r) => surface_columns(
                &service,
                record.get(lat_idx).unwrap_or(""),
                record.get(lon_idx).unwrap_or(""),
                r,
            ),
            None => error_columns("invalid radius".to_string()),
        };
        if !columns[7].is_empty() {
            failed += 1;
        }

        let mut new_record: Vec<&str> = record.iter().collect();
        new_record.extend(columns.iter().map(String::as_str));
        writer.write_record(&new_record)?;

        pb.inc(1);
    }

    pb.finish_with_message("done");
    writer.flush()?;

    if failed > 0 {
        eprintln!("{failed} of {total} points failed, see the 'error' column");
    }
    println!("Output written to: {}", output_path.display());
    Ok(())
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "points".to_string());
    input.with_file_name(format!("{}_surface.csv", stem))
}

/// Output columns for one point; failures fill only the `error` column.
fn surface_columns(service: &ReliefService, lat: &str, lon: &str, radius: f64) -> Vec<String> {
    let request = match (
        parse_dms(lat, Axis::Latitude),
        parse_dms(lon, Axis::Longitude),
    ) {
        (Ok(latitude), Ok(longitude)) => SurfaceRequest::new(latitude, longitude, radius),
        (Err(e), _) | (_, Err(e)) => return error_columns(e.to_string()),
    };

    let surface = match service.surface(&request) {
        Ok(surface) => surface,
        Err(e) => return error_columns(e.to_string()),
    };

    let summary = surface.grid.summary(service.raster_info().nodata);
    let fmt = |v: Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_default();
    let center = surface
        .grid
        .value_at(surface.rows() / 2, surface.cols() / 2)
        .map(f64::from);

    vec![
        surface.rows().to_string(),
        surface.cols().to_string(),
        match surface.coverage() {
            Coverage::Full => "full".to_string(),
            Coverage::Partial => "partial".to_string(),
        },
        fmt(summary.map(|s| s.min as f64)),
        fmt(summary.map(|s| s.max as f64)),
        fmt(summary.map(|s| s.mean)),
        service.readout(center),
        String::new(),
    ]
}

fn error_columns(error: String) -> Vec<String> {
    let mut columns = vec![String::new(); OUTPUT_COLUMNS.len() - 1];
    columns.push(error);
    columns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_name() {
        let out = default_output(Path::new("/data/points.csv"));
        assert_eq!(out, PathBuf::from("/data/points_surface.csv"));
    }

    #[test]
    fn test_error_columns_shape() {
        let columns = error_columns("boom".to_string());
        assert_eq!(columns.len(), OUTPUT_COLUMNS.len());
        assert_eq!(columns[7], "boom");
        assert!(columns[..7].iter().all(String::is_empty));
    }
}
