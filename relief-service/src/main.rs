//! Relief Service - HTTP microservice for terrain surfaces.
//!
//! Serves height grids around DMS coordinates from one elevation raster
//! that is opened at startup and shared by every request.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `RELIEF_RASTER` | Elevation GeoTIFF (EPSG:31370) | Required |
//! | `RELIEF_CHUNK_CACHE_SIZE` | Decoded chunks kept in memory | 256 |
//! | `RELIEF_VERTICAL_OFFSET` | Metres subtracted at point query | 8.0 |
//! | `RELIEF_APPLY_OFFSET` | Apply the vertical offset | true |
//! | `RELIEF_CLIP_WINDOW` | Clip windows overhanging the raster | true |
//! | `RELIEF_PORT` | HTTP server port | 8080 |
//! | `RUST_LOG` | Log filter | "relief=info,relief_service=info,tower_http=info" |
//!
//! ## Endpoints
//!
//! - `GET /surface?lat_deg&lat_min&lat_sec&lon_deg&lon_min&lon_sec&radius` - Height grid
//! - `GET /height?value=X` - Height readout for a hovered value
//! - `GET /health` - Health check
//! - `GET /stats` - Chunk cache statistics
//! - `GET /docs` - OpenAPI documentation (Swagger UI)

use std::net::SocketAddr;
use std::sync::Arc;

use relief::ReliefServiceBuilder;
use relief_service::{app, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "relief=info,relief_service=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load port from environment (service-specific config)
    let port: u16 = match std::env::var("RELIEF_PORT") {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("RELIEF_PORT: cannot parse '{raw}'"))?,
        Err(_) => 8080,
    };

    // The library handles RELIEF_RASTER, RELIEF_CHUNK_CACHE_SIZE and the
    // pipeline switches; the raster is opened exactly once here.
    let builder = ReliefServiceBuilder::from_env()?;
    let raster = builder.raster_path().to_path_buf();
    let relief = builder.build()?;

    let info = relief.raster_info();
    tracing::info!(
        raster = %raster.display(),
        width = info.width,
        height = info.height,
        epsg = ?info.epsg,
        apply_offset = relief.options().apply_vertical_offset,
        clip_window = relief.options().clip_window_to_bounds,
        port = port,
        "Starting relief service"
    );

    let state = Arc::new(AppState { relief });

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app(state)).await?;

    Ok(())
}
