use anyhow::Result;
use clap::{builder::BoolishValueParser, Args, Parser, Subcommand};
use relief::{PipelineOptions, DEFAULT_CHUNK_CACHE_SIZE};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

/// Terrain surfaces around DMS coordinates
#[derive(Parser)]
#[command(name = "relief")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Log pipeline details to stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every command that runs the pipeline.
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
    /// Elevation GeoTIFF in Belgian Lambert 72 (EPSG:31370)
    #[arg(short, long, env = "RELIEF_RASTER", global = true)]
    pub raster: Option<PathBuf>,

    /// Maximum decoded raster chunks in cache
    #[arg(
        short,
        long,
        env = "RELIEF_CHUNK_CACHE_SIZE",
        default_value_t = DEFAULT_CHUNK_CACHE_SIZE,
        global = true
    )]
    pub cache_size: u64,

    /// Metres subtracted from point heights
    #[arg(
        long,
        env = "RELIEF_VERTICAL_OFFSET",
        default_value_t = relief::DEFAULT_VERTICAL_OFFSET,
        allow_negative_numbers = true,
        global = true
    )]
    pub offset: f64,

    /// Apply the vertical offset to point heights
    #[arg(
        long,
        env = "RELIEF_APPLY_OFFSET",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set,
        global = true
    )]
    pub apply_offset: bool,

    /// Clip windows that overhang the raster instead of failing
    #[arg(
        long,
        env = "RELIEF_CLIP_WINDOW",
        default_value = "true",
        value_parser = BoolishValueParser::new(),
        action = clap::ArgAction::Set,
        global = true
    )]
    pub clip_window: bool,
}

impl PipelineArgs {
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            apply_vertical_offset: self.apply_offset,
            vertical_offset: self.offset,
            clip_window_to_bounds: self.clip_window,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Sample the terrain surface around a DMS coordinate
    Surface {
        /// Latitude as DMS, e.g. "51 12 31" or 51°12'31"N
        #[arg(long, default_value = "51 12 31")]
        lat: String,

        /// Longitude as DMS, e.g. "3 13 28" or 3°13'28"E
        #[arg(long, default_value = "3 13 28")]
        lon: String,

        /// Half the side of the square window, in metres
        #[arg(long, default_value_t = 300.0)]
        radius: f64,

        /// Print the result as JSON
        #[arg(short, long)]
        json: bool,

        /// Include the full height grid in the JSON output
        #[arg(long, requires = "json")]
        grid: bool,

        /// Write the height grid (row 0 = south) to a CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the raw window to a GeoTIFF file
        #[arg(long)]
        geotiff: Option<PathBuf>,

        /// Write the window footprint to a GeoJSON file
        #[arg(long)]
        geojson: Option<PathBuf>,
    },

    /// Format a point height as shown under the cursor
    Height {
        /// Hovered elevation in metres; omit for the placeholder
        #[arg(long, allow_negative_numbers = true)]
        value: Option<f64>,

        /// Print the result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Display information about the elevation raster
    Info {
        /// Also scan the whole raster for min/max/mean
        #[arg(long)]
        stats: bool,
    },

    /// Build surfaces for every DMS point of a CSV file
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Output file (defaults to <input>_surface.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Column holding the DMS latitude
        #[arg(long, default_value = "lat")]
        lat_col: String,

        /// Column holding the DMS longitude
        #[arg(long, default_value = "lon")]
        lon_col: String,

        /// Optional column holding a per-row radius
        #[arg(long)]
        radius_col: Option<String>,

        /// Radius for rows without one, in metres
        #[arg(long, default_value_t = 300.0)]
        radius: f64,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "relief=warn",
        1 => "relief=debug",
        _ => "relief=trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Surface {
            lat,
            lon,
            radius,
            json,
            grid,
            csv,
            geotiff,
            geojson,
        } => commands::surface::run(
            &cli.pipeline,
            &lat,
            &lon,
            radius,
            commands::surface::Outputs {
                json,
                grid,
                csv,
                geotiff,
                geojson,
            },
        ),
        Commands::Height { value, json } => commands::height::run(&cli.pipeline, value, json),
        Commands::Info { stats } => commands::info::run(&cli.pipeline, stats),
        Commands::Batch {
            input,
            output,
            lat_col,
            lon_col,
            radius_col,
            radius,
        } => commands::batch::run(
            &cli.pipeline,
            input,
            output,
            &lat_col,
            &lon_col,
            radius_col.as_deref(),
            radius,
        ),
    }
}
