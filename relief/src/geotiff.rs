//! GeoTIFF-backed raster source.
//!
//! [`GeoTiffRaster`] memory-maps the file once and decodes it chunk by chunk
//! (strips or tiles), so a window read only touches the chunks it overlaps.
//! Decoded chunks are kept in an LRU cache shared by all readers.
//!
//! Georeferencing is taken from `ModelTransformation` when present, otherwise
//! from `ModelTiepoint` + `ModelPixelScale`. Rotated rasters are rejected.

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use memmap2::Mmap;
use moka::sync::Cache;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::{colortype, DirectoryEncoder, TiffEncoder, TiffKind};
use tiff::tags::Tag;

use crate::error::{ReliefError, Result};
use crate::raster::{check_window, CacheStats, RasterInfo, RasterSource};
use crate::window::{GeoTransform, PixelWindow};

/// Default number of decoded chunks kept in memory.
pub const DEFAULT_CHUNK_CACHE_SIZE: u64 = 256;

const MODEL_PIXEL_SCALE: u16 = 33550;
const MODEL_TIEPOINT: u16 = 33922;
const MODEL_TRANSFORMATION: u16 = 34264;
const GEO_KEY_DIRECTORY: u16 = 34735;
const GDAL_NODATA: u16 = 42113;

const GT_MODEL_TYPE_KEY: u16 = 1024;
const GT_RASTER_TYPE_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_KEY: u16 = 3072;
const MODEL_TYPE_PROJECTED: u16 = 1;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

const PLANAR_CONFIG_SEPARATE: u32 = 2;

fn geo_tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// How the file is cut into independently decodable pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    /// Nominal chunk width in pixels (the raster width for strips).
    pub chunk_width: usize,
    /// Nominal chunk height in pixels (rows per strip for strips).
    pub chunk_height: usize,
    /// Chunks per chunk row.
    pub chunks_across: usize,
    /// Chunk rows.
    pub chunks_down: usize,
    pub tiled: bool,
    samples_per_pixel: usize,
    planar: bool,
}

impl ChunkLayout {
    /// Total number of chunks covering band 1.
    pub fn chunk_count(&self) -> usize {
        self.chunks_across * self.chunks_down
    }
}

/// One decoded chunk, band 1 only.
#[derive(Debug)]
struct Chunk {
    values: Vec<f32>,
    /// Columns with data.
    width: usize,
    /// Rows with data.
    height: usize,
    /// Distance between row starts in `values`.
    stride: usize,
}

/// A single-band elevation raster stored as a GeoTIFF.
///
/// The file is opened and parsed once. Reads are thread-safe: the decoder
/// sits behind a mutex that is only held while one chunk is decoded, and
/// cached chunks are served without locking it.
///
/// # Example
///
/// ```ignore
/// use relief::{GeoTiffRaster, PixelWindow, RasterSource};
///
/// let raster = GeoTiffRaster::open("dhm_lambert72.tif", 256)?;
/// let values = raster.read_window(&PixelWindow::new(100, 200, 64, 64))?;
/// ```
pub struct GeoTiffRaster {
    path: PathBuf,
    info: RasterInfo,
    layout: ChunkLayout,
    decoder: Mutex<Decoder<Cursor<Mmap>>>,
    chunk_cache: Cache<u32, Arc<Chunk>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl GeoTiffRaster {
    /// Open a GeoTIFF and read its header and georeferencing.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the GeoTIFF
    /// * `chunk_cache_size` - Maximum number of decoded chunks kept in memory
    ///
    /// # Errors
    ///
    /// - [`ReliefError::Io`] if the file cannot be opened or mapped
    /// - [`ReliefError::Tiff`] if it is not a readable TIFF
    /// - [`ReliefError::InvalidGeoTiff`] if the georeferencing is missing,
    ///   rotated, degenerate or not north-up
    pub fn open<P: AsRef<Path>>(path: P, chunk_cache_size: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;

        // SAFETY: Memory mapping is safe as long as the file is not modified
        // while mapped. We open the file read-only and don't expose the mapping.
        let mmap = unsafe { Mmap::map(&file)? };

        let mut decoder = Decoder::new(Cursor::new(mmap))?;
        let (width, height) = decoder.dimensions()?;
        let transform = read_transform(&mut decoder)?;
        if !transform.is_valid() {
            return Err(ReliefError::InvalidGeoTiff(format!(
                "degenerate pixel size {}x{}",
                transform.pixel_width, transform.pixel_height
            )));
        }
        if !transform.is_north_up() {
            return Err(ReliefError::InvalidGeoTiff(format!(
                "only north-up rasters are supported, pixel size is {}x{}",
                transform.pixel_width, transform.pixel_height
            )));
        }

        let mut info = RasterInfo::new(width as usize, height as usize, transform);
        info.nodata = read_nodata(&mut decoder);
        info.epsg = read_epsg(&mut decoder);

        let layout = read_layout(&mut decoder, info.width, info.height)?;

        tracing::info!(
            path = %path.display(),
            width = info.width,
            height = info.height,
            epsg = ?info.epsg,
            nodata = ?info.nodata,
            chunks = layout.chunk_count(),
            tiled = layout.tiled,
            "Opened GeoTIFF"
        );

        Ok(Self {
            path,
            info,
            layout,
            decoder: Mutex::new(decoder),
            chunk_cache: Cache::builder().max_capacity(chunk_cache_size).build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &ChunkLayout {
        &self.layout
    }

    /// Get the maximum number of cached chunks.
    pub fn cache_capacity(&self) -> u64 {
        self.chunk_cache.policy().max_capacity().unwrap_or(0)
    }

    /// Drop every cached chunk.
    pub fn clear_cache(&self) {
        self.chunk_cache.invalidate_all();
    }

    /// Load a chunk from cache, or decode it.
    fn chunk(&self, index: u32) -> Result<Arc<Chunk>> {
        if let Some(chunk) = self.chunk_cache.get(&index) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(chunk);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let chunk = Arc::new(self.decode_chunk(index)?);
        self.chunk_cache.insert(index, chunk.clone());
        Ok(chunk)
    }

    fn decode_chunk(&self, index: u32) -> Result<Chunk> {
        let (decoded, data_width, data_height) = {
            let mut decoder = self
                .decoder
                .lock()
                .map_err(|_| ReliefError::CacheLockPoisoned)?;
            let (w, h) = decoder.chunk_data_dimensions(index);
            (decoder.read_chunk(index)?, w as usize, h as usize)
        };

        let samples = to_f32(decoded);
        let spp = self.layout.samples_per_pixel;
        let values: Vec<f32> = if spp > 1 && !self.layout.planar {
            samples.into_iter().step_by(spp).collect()
        } else {
            samples
        };

        // Edge tiles may come back padded to the nominal tile size.
        let full = self.layout.chunk_width * self.layout.chunk_height;
        let stride = if self.layout.tiled && values.len() >= full {
            self.layout.chunk_width
        } else {
            data_width
        };

        if data_height == 0 || values.len() < stride * (data_height - 1) + data_width {
            return Err(ReliefError::WindowRead(format!(
                "chunk {index} decoded to {} samples, expected {data_width}x{data_height}",
                values.len()
            )));
        }

        tracing::debug!(chunk = index, cols = data_width, rows = data_height, "Decoded chunk");

        Ok(Chunk {
            values,
            width: data_width,
            height: data_height,
            stride,
        })
    }
}

impl RasterSource for GeoTiffRaster {
    fn info(&self) -> &RasterInfo {
        &self.info
    }

    fn read_window(&self, window: &PixelWindow) -> Result<Vec<f32>> {
        check_window(window, &self.info)?;

        let ChunkLayout {
            chunk_width,
            chunk_height,
            chunks_across,
            ..
        } = self.layout;

        let col_end = window.col_off + window.width;
        let row_end = window.row_off + window.height;
        let mut out = vec![0.0f32; window.len()];

        for chunk_row in window.row_off / chunk_height..=(row_end - 1) / chunk_height {
            for chunk_col in window.col_off / chunk_width..=(col_end - 1) / chunk_width {
                let index = (chunk_row * chunks_across + chunk_col) as u32;
                let chunk = self.chunk(index)?;

                let x0 = chunk_col * chunk_width;
                let y0 = chunk_row * chunk_height;
                let cols = window.col_off.max(x0)..col_end.min(x0 + chunk.width);
                let rows = window.row_off.max(y0)..row_end.min(y0 + chunk.height);
                if cols.is_empty() {
                    continue;
                }
                let n = cols.len();

                for row in rows {
                    let src = (row - y0) * chunk.stride + (cols.start - x0);
                    let dst = (row - window.row_off) * window.width + (cols.start - window.col_off);
                    out[dst..dst + n].copy_from_slice(&chunk.values[src..src + n]);
                }
            }
        }

        Ok(out)
    }

    fn cache_stats(&self) -> Option<CacheStats> {
        Some(CacheStats {
            entry_count: self.chunk_cache.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        })
    }
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTransform> {
    if let Ok(m) = decoder.get_tag_f64_vec(geo_tag(MODEL_TRANSFORMATION)) {
        if m.len() >= 8 {
            if m[1] != 0.0 || m[4] != 0.0 {
                return Err(ReliefError::InvalidGeoTiff(
                    "rotated rasters are not supported".to_string(),
                ));
            }
            return Ok(GeoTransform::new(m[3], m[7], m[0], m[5]));
        }
    }

    let tiepoint = decoder.get_tag_f64_vec(geo_tag(MODEL_TIEPOINT));
    let scale = decoder.get_tag_f64_vec(geo_tag(MODEL_PIXEL_SCALE));
    match (tiepoint, scale) {
        (Ok(tp), Ok(sc)) if tp.len() >= 6 && sc.len() >= 2 => {
            // Tiepoint maps raster (i, j) to model (x, y).
            let (i, j, x, y) = (tp[0], tp[1], tp[3], tp[4]);
            Ok(GeoTransform::new(
                x - i * sc[0],
                y + j * sc[1],
                sc[0],
                -sc[1],
            ))
        }
        _ => Err(ReliefError::InvalidGeoTiff(
            "missing ModelTiepoint/ModelPixelScale or ModelTransformation".to_string(),
        )),
    }
}

fn read_nodata<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(geo_tag(GDAL_NODATA))
        .ok()
        .and_then(|s| s.trim_matches(|c: char| c == '\0' || c.is_whitespace()).parse().ok())
}

/// Projected CRS code, falling back to the geographic one.
fn read_epsg<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<u16> {
    let keys = decoder.get_tag_u16_vec(geo_tag(GEO_KEY_DIRECTORY)).ok()?;
    let entries = keys.get(4..)?;

    let lookup = |wanted: u16| {
        entries
            .chunks_exact(4)
            .find(|e| e[0] == wanted && e[1] == 0)
            .map(|e| e[3])
            .filter(|&code| code != 0 && code != USER_DEFINED)
    };
    lookup(PROJECTED_CS_TYPE_KEY).or_else(|| lookup(GEOGRAPHIC_TYPE_KEY))
}

fn read_layout<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> Result<ChunkLayout> {
    let (cw, ch) = decoder.chunk_dimensions();
    let (chunk_width, chunk_height) = (cw as usize, ch as usize);
    if chunk_width == 0 || chunk_height == 0 {
        return Err(ReliefError::InvalidGeoTiff(format!(
            "zero chunk size {chunk_width}x{chunk_height}"
        )));
    }

    let tiled = decoder.find_tag(Tag::TileWidth)?.is_some();
    let samples_per_pixel = decoder.get_tag_u32(Tag::SamplesPerPixel).unwrap_or(1) as usize;
    let planar = decoder
        .get_tag_u32(Tag::PlanarConfiguration)
        .map(|v| v == PLANAR_CONFIG_SEPARATE)
        .unwrap_or(false);

    Ok(ChunkLayout {
        chunk_width,
        chunk_height,
        chunks_across: width.div_ceil(chunk_width),
        chunks_down: height.div_ceil(chunk_height),
        tiled,
        samples_per_pixel: samples_per_pixel.max(1),
        planar,
    })
}

fn to_f32(decoded: DecodingResult) -> Vec<f32> {
    match decoded {
        DecodingResult::F32(data) => data,
        DecodingResult::F64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U16(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U32(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I8(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f32).collect(),
    }
}

fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<W, K>,
    info: &RasterInfo,
) -> Result<()> {
    let t = &info.transform;
    dir.write_tag(
        geo_tag(MODEL_PIXEL_SCALE),
        [t.pixel_width, -t.pixel_height, 0.0].as_slice(),
    )?;
    dir.write_tag(
        geo_tag(MODEL_TIEPOINT),
        [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0].as_slice(),
    )?;

    let mut keys: Vec<u16> = vec![1, 1, 0, 2];
    keys.extend_from_slice(&[GT_MODEL_TYPE_KEY, 0, 1, MODEL_TYPE_PROJECTED]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);
    if let Some(epsg) = info.epsg {
        keys.extend_from_slice(&[PROJECTED_CS_TYPE_KEY, 0, 1, epsg]);
        keys[3] = 3;
    }
    dir.write_tag(geo_tag(GEO_KEY_DIRECTORY), keys.as_slice())?;

    if let Some(nodata) = info.nodata {
        dir.write_tag(geo_tag(GDAL_NODATA), nodata.to_string().as_str())?;
    }
    Ok(())
}

/// Write a single-band float32 GeoTIFF, stripped `rows_per_strip` rows at
/// a time.
///
/// `data` is row-major with row 0 at the north edge, as returned by
/// [`RasterSource::read_window`].
///
/// # Errors
///
/// Returns [`ReliefError::InvalidGeoTiff`] if `data` does not hold
/// `info.width × info.height` samples, and I/O or TIFF errors from writing.
pub fn write_geotiff<P: AsRef<Path>>(
    path: P,
    info: &RasterInfo,
    data: &[f32],
    rows_per_strip: u32,
) -> Result<()> {
    if data.len() != info.width * info.height {
        return Err(ReliefError::InvalidGeoTiff(format!(
            "expected {} samples for a {}x{} raster, got {}",
            info.width * info.height,
            info.width,
            info.height,
            data.len()
        )));
    }

    let file = File::create(path.as_ref())?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))?;
    let mut image =
        encoder.new_image::<colortype::Gray32Float>(info.width as u32, info.height as u32)?;
    image.rows_per_strip(rows_per_strip.max(1))?;
    write_geo_tags(image.encoder(), info)?;
    image.write_data(data)?;

    tracing::debug!(path = %path.as_ref().display(), "Wrote GeoTIFF");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture_info() -> RasterInfo {
        RasterInfo::new(40, 30, GeoTransform::new(69_000.0, 212_000.0, 1.0, -1.0))
            .with_epsg(31370)
            .with_nodata(-9999.0)
    }

    fn fixture_data(info: &RasterInfo) -> Vec<f32> {
        (0..info.height)
            .flat_map(|row| (0..info.width).map(move |col| (row * 100 + col) as f32))
            .collect()
    }

    fn push_entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: usize, value: u32) {
        buf.extend_from_slice(&tag.to_le_bytes());
        buf.extend_from_slice(&kind.to_le_bytes());
        buf.extend_from_slice(&(count as u32).to_le_bytes());
        buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Uncompressed little-endian tiled float32 GeoTIFF. The encoder only
    /// writes strips, so this one is laid out by hand.
    fn write_tiled(path: &Path, info: &RasterInfo, tile: usize, data: &[f32]) {
        const SHORT: u16 = 3;
        const LONG: u16 = 4;
        const DOUBLE: u16 = 12;
        const ENTRIES: usize = 14;

        let across = info.width.div_ceil(tile);
        let down = info.height.div_ceil(tile);
        let tiles = across * down;
        let tile_bytes = tile * tile * 4;

        let offsets_at = 8 + 2 + ENTRIES * 12 + 4;
        let counts_at = offsets_at + tiles * 4;
        let scale_at = counts_at + tiles * 4;
        let tiepoint_at = scale_at + 3 * 8;
        let data_at = tiepoint_at + 6 * 8;

        let mut buf = Vec::new();
        buf.extend_from_slice(b"II");
        buf.extend_from_slice(&42u16.to_le_bytes());
        buf.extend_from_slice(&8u32.to_le_bytes());

        buf.extend_from_slice(&(ENTRIES as u16).to_le_bytes());
        for (tag, kind, count, value) in [
            (256, SHORT, 1, info.width),
            (257, SHORT, 1, info.height),
            (258, SHORT, 1, 32),
            (259, SHORT, 1, 1),
            (262, SHORT, 1, 1),
            (277, SHORT, 1, 1),
            (284, SHORT, 1, 1),
            (322, SHORT, 1, tile),
            (323, SHORT, 1, tile),
            (324, LONG, tiles, offsets_at),
            (325, LONG, tiles, counts_at),
            (339, SHORT, 1, 3),
            (MODEL_PIXEL_SCALE, DOUBLE, 3, scale_at),
            (MODEL_TIEPOINT, DOUBLE, 6, tiepoint_at),
        ] {
            push_entry(&mut buf, tag, kind, count, value as u32);
        }
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert_eq!(buf.len(), offsets_at);

        for i in 0..tiles {
            buf.extend_from_slice(&((data_at + i * tile_bytes) as u32).to_le_bytes());
        }
        for _ in 0..tiles {
            buf.extend_from_slice(&(tile_bytes as u32).to_le_bytes());
        }
        let t = &info.transform;
        for v in [t.pixel_width, -t.pixel_height, 0.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in [0.0, 0.0, 0.0, t.origin_x, t.origin_y, 0.0] {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(buf.len(), data_at);

        // Edge tiles are padded to the full tile size.
        for ty in 0..down {
            for tx in 0..across {
                for r in 0..tile {
                    for c in 0..tile {
                        let (row, col) = (ty * tile + r, tx * tile + c);
                        let v = if row < info.height && col < info.width {
                            data[row * info.width + col]
                        } else {
                            0.0
                        };
                        buf.extend_from_slice(&v.to_le_bytes());
                    }
                }
            }
        }

        std::fs::write(path, buf).unwrap();
    }

    fn write_fixture(dir: &TempDir, rows_per_strip: u32) -> PathBuf {
        let info = fixture_info();
        let path = dir.path().join("dem.tif");
        write_geotiff(&path, &info, &fixture_data(&info), rows_per_strip).unwrap();
        path
    }

    #[test]
    fn test_open_reads_georeferencing() {
        let dir = TempDir::new().unwrap();
        let raster = GeoTiffRaster::open(write_fixture(&dir, 4), 16).unwrap();

        assert_eq!(raster.info(), &fixture_info());
        assert_eq!(raster.layout().chunk_width, 40);
        assert_eq!(raster.layout().chunk_height, 4);
        assert_eq!(raster.layout().chunk_count(), 8);
        assert!(!raster.layout().tiled);
        assert_eq!(raster.cache_capacity(), 16);
    }

    #[test]
    fn test_read_window_matches_source() {
        let dir = TempDir::new().unwrap();
        let raster = GeoTiffRaster::open(write_fixture(&dir, 4), 16).unwrap();

        let values = raster.read_window(&PixelWindow::new(3, 5, 4, 4)).unwrap();
        let expected: Vec<f32> = (5..9)
            .flat_map(|row| (3..7).map(move |col| (row * 100 + col) as f32))
            .collect();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_read_only_decodes_overlapping_strips() {
        let dir = TempDir::new().unwrap();
        let raster = GeoTiffRaster::open(write_fixture(&dir, 4), 16).unwrap();

        // Rows 5..9 span strips 1 and 2.
        raster.read_window(&PixelWindow::new(0, 5, 10, 4)).unwrap();
        let stats = raster.cache_stats().unwrap();
        assert_eq!(stats.miss_count, 2);
        assert_eq!(stats.hit_count, 0);

        raster.read_window(&PixelWindow::new(20, 6, 5, 2)).unwrap();
        let stats = raster.cache_stats().unwrap();
        assert_eq!(stats.miss_count, 2);
        assert_eq!(stats.hit_count, 2);
    }

    #[test]
    fn test_read_last_short_strip() {
        let dir = TempDir::new().unwrap();
        // 30 rows in strips of 4: the last strip holds 2 rows.
        let raster = GeoTiffRaster::open(write_fixture(&dir, 4), 16).unwrap();

        let values = raster.read_window(&PixelWindow::new(38, 27, 2, 3)).unwrap();
        assert_eq!(values, vec![2738.0, 2739.0, 2838.0, 2839.0, 2938.0, 2939.0]);
    }

    #[test]
    fn test_read_window_rejects_overhang() {
        let dir = TempDir::new().unwrap();
        let raster = GeoTiffRaster::open(write_fixture(&dir, 4), 16).unwrap();

        let err = raster.read_window(&PixelWindow::new(35, 0, 10, 1)).unwrap_err();
        assert!(matches!(err, ReliefError::WindowRead(_)));
        assert_eq!(raster.cache_stats().unwrap().miss_count, 0);
    }

    #[test]
    fn test_clear_cache_forces_decode() {
        let dir = TempDir::new().unwrap();
        let raster = GeoTiffRaster::open(write_fixture(&dir, 8), 16).unwrap();

        let window = PixelWindow::new(0, 0, 5, 5);
        raster.read_window(&window).unwrap();
        raster.clear_cache();
        raster.read_window(&window).unwrap();
        assert_eq!(raster.cache_stats().unwrap().miss_count, 2);
    }

    #[test]
    fn test_missing_georeferencing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.tif");
        let file = File::create(&path).unwrap();
        let mut encoder = TiffEncoder::new(BufWriter::new(file)).unwrap();
        encoder
            .write_image::<colortype::Gray32Float>(4, 4, &[0.0; 16])
            .unwrap();
        drop(encoder);

        let err = GeoTiffRaster::open(&path, 4).err().unwrap();
        assert!(matches!(err, ReliefError::InvalidGeoTiff(_)));
    }

    #[test]
    fn test_multi_sample_reads_first_band() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rgb.tif");
        let info = RasterInfo::new(3, 2, GeoTransform::new(0.0, 2.0, 1.0, -1.0));

        let data: Vec<f32> = (0..6)
            .flat_map(|i| [i as f32, -1.0, -2.0])
            .collect();
        {
            let file = File::create(&path).unwrap();
            let mut encoder = TiffEncoder::new(BufWriter::new(file)).unwrap();
            let mut image = encoder
                .new_image::<colortype::RGB32Float>(3, 2)
                .unwrap();
            write_geo_tags(image.encoder(), &info).unwrap();
            image.write_data(&data).unwrap();
        }

        let raster = GeoTiffRaster::open(&path, 4).unwrap();
        let values = raster.read_window(&PixelWindow::new(0, 0, 3, 2)).unwrap();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_tiled_reads_across_tiles() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tiled.tif");
        // 5 x 3 in 2 x 2 tiles: the right tile column is 1 wide, the bottom
        // tile row 1 high.
        let info = RasterInfo::new(5, 3, GeoTransform::new(69_000.0, 212_000.0, 1.0, -1.0));
        let data = fixture_data(&info);
        write_tiled(&path, &info, 2, &data);

        let raster = GeoTiffRaster::open(&path, 16).unwrap();
        assert_eq!(raster.info(), &info);
        let layout = *raster.layout();
        assert!(layout.tiled);
        assert_eq!((layout.chunk_width, layout.chunk_height), (2, 2));
        assert_eq!((layout.chunks_across, layout.chunks_down), (3, 2));

        let all = raster.read_window(&PixelWindow::new(0, 0, 5, 3)).unwrap();
        assert_eq!(all, data);
        assert_eq!(raster.cache_stats().unwrap().miss_count, 6);

        // Cols 1..5, rows 1..3: every tile, including both edge tiles.
        let values = raster.read_window(&PixelWindow::new(1, 1, 4, 2)).unwrap();
        assert_eq!(
            values,
            vec![101.0, 102.0, 103.0, 104.0, 201.0, 202.0, 203.0, 204.0]
        );

        let right_edge = raster.read_window(&PixelWindow::new(4, 0, 1, 3)).unwrap();
        assert_eq!(right_edge, vec![4.0, 104.0, 204.0]);

        let stats = raster.cache_stats().unwrap();
        assert_eq!(stats.miss_count, 6);
        assert_eq!(stats.hit_count, 8);
    }

    #[test]
    fn test_rejects_south_up_raster() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("south_up.tif");
        let info = RasterInfo::new(4, 4, GeoTransform::new(69_000.0, 211_996.0, 1.0, 1.0));
        write_geotiff(&path, &info, &[0.0; 16], 4).unwrap();

        let err = GeoTiffRaster::open(&path, 4).err().unwrap();
        assert!(matches!(err, ReliefError::InvalidGeoTiff(ref m) if m.contains("north-up")));
    }

    #[test]
    fn test_write_rejects_wrong_length() {
        let dir = TempDir::new().unwrap();
        let err = write_geotiff(dir.path().join("x.tif"), &fixture_info(), &[0.0; 3], 4)
            .unwrap_err();
        assert!(matches!(err, ReliefError::InvalidGeoTiff(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = GeoTiffRaster::open("/nonexistent/dem.tif", 4).err().unwrap();
        assert!(matches!(err, ReliefError::Io(_)));
    }
}
