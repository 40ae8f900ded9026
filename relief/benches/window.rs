use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use relief::{
    write_geotiff, GeoPoint, GeoTiffRaster, GeoTransform, PipelineOptions, PixelWindow,
    RasterInfo, RasterSource, ReliefService,
};
use tempfile::TempDir;

const SIZE: usize = 2000;

/// Write a synthetic 1 m raster covering Bruges with a simple gradient.
fn create_raster(dir: &std::path::Path, rows_per_strip: u32) -> std::path::PathBuf {
    let info = RasterInfo::new(SIZE, SIZE, GeoTransform::new(69_000.0, 212_500.0, 1.0, -1.0))
        .with_epsg(31370);
    let data: Vec<f32> = (0..SIZE * SIZE)
        .map(|i| ((i / SIZE + i % SIZE) % 400) as f32 * 0.1)
        .collect();
    let path = dir.join(format!("dem_{rows_per_strip}.tif"));
    write_geotiff(&path, &info, &data, rows_per_strip).unwrap();
    path
}

fn bench_window_cold(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let path = create_raster(tmp.path(), 16);
    let raster = GeoTiffRaster::open(&path, 1024).unwrap();
    let window = PixelWindow::new(700, 700, 600, 600);

    c.bench_function("window_600_cold", |b| {
        b.iter(|| {
            raster.clear_cache();
            black_box(raster.read_window(black_box(&window)).unwrap());
        });
    });
}

fn bench_window_cached(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let path = create_raster(tmp.path(), 16);
    let raster = GeoTiffRaster::open(&path, 1024).unwrap();
    let window = PixelWindow::new(700, 700, 600, 600);

    // Warm the cache
    let _ = raster.read_window(&window);

    c.bench_function("window_600_cached", |b| {
        b.iter(|| {
            black_box(raster.read_window(black_box(&window)).unwrap());
        });
    });
}

fn bench_window_sizes(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let path = create_raster(tmp.path(), 16);
    let raster = GeoTiffRaster::open(&path, 1024).unwrap();

    let mut group = c.benchmark_group("window_radius");
    for radius in [10usize, 100, 400] {
        let side = radius * 2;
        let window = PixelWindow::new(SIZE / 2 - radius, SIZE / 2 - radius, side, side);
        group.bench_function(format!("r{radius}"), |b| {
            b.iter(|| {
                raster.clear_cache();
                black_box(raster.read_window(black_box(&window)).unwrap());
            });
        });
    }
    group.finish();
}

fn bench_full_pipeline(c: &mut Criterion) {
    let tmp = TempDir::new().unwrap();
    let path = create_raster(tmp.path(), 16);
    let raster = GeoTiffRaster::open(&path, 1024).unwrap();
    let service =
        ReliefService::with_source(Arc::new(raster), PipelineOptions::default()).unwrap();
    let bruges = GeoPoint::new(51.208_611, 3.224_444);

    // Warm the cache
    let _ = service.surface_at(bruges, 300.0);

    c.bench_function("surface_bruges_r300_cached", |b| {
        b.iter(|| {
            black_box(service.surface_at(black_box(bruges), black_box(300.0)).unwrap());
        });
    });
}

criterion_group!(
    benches,
    bench_window_cold,
    bench_window_cached,
    bench_window_sizes,
    bench_full_pipeline,
);
criterion_main!(benches);
