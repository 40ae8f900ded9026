//! HTTP request handlers for the surface service.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relief::{Coverage, ReliefError, Surface, SurfaceRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::AppState;

fn default_radius() -> f64 {
    300.0
}

/// Query parameters for the surface endpoint.
///
/// Fields are taken as text, the way a form submits them, so malformed
/// values are reported as coordinate errors.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SurfaceQuery {
    /// Latitude degrees (north).
    pub lat_deg: String,
    /// Latitude minutes.
    pub lat_min: String,
    /// Latitude seconds, may be fractional.
    pub lat_sec: String,
    /// Longitude degrees (east).
    pub lon_deg: String,
    /// Longitude minutes.
    pub lon_min: String,
    /// Longitude seconds, may be fractional.
    pub lon_sec: String,
    /// Half the side of the square window in metres. Default 300.
    #[serde(default = "default_radius")]
    pub radius: f64,
}

/// Centre of a surface in both coordinate systems.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CenterResponse {
    pub lat: f64,
    pub lon: f64,
    /// Lambert 72 easting.
    pub x: f64,
    /// Lambert 72 northing.
    pub y: f64,
}

/// Extent of the pixels that were read, Lambert 72 metres.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WindowResponse {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

/// Successful surface response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SurfaceResponse {
    pub rows: usize,
    pub cols: usize,
    /// `full`, or `partial` when the window was clipped to the raster.
    pub coverage: String,
    pub center: CenterResponse,
    pub window: WindowResponse,
    /// Elevations in metres, row 0 = southernmost.
    pub z: Vec<Vec<f32>>,
}

impl From<Surface> for SurfaceResponse {
    fn from(surface: Surface) -> Self {
        let b = surface.window.bounds;
        Self {
            rows: surface.rows(),
            cols: surface.cols(),
            coverage: match surface.coverage() {
                Coverage::Full => "full".to_string(),
                Coverage::Partial => "partial".to_string(),
            },
            center: CenterResponse {
                lat: surface.center.latitude,
                lon: surface.center.longitude,
                x: surface.projected.x,
                y: surface.projected.y,
            },
            window: WindowResponse {
                left: b.left,
                bottom: b.bottom,
                right: b.right,
                top: b.top,
            },
            z: surface.grid.to_rows(),
        }
    }
}

/// Query parameters for the height endpoint.
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HeightQuery {
    /// Hovered elevation in metres; absent when nothing is hovered.
    pub value: Option<f64>,
}

/// Height readout.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HeightResponse {
    /// Display string such as `34.4m`, or `0.00m` when nothing is selected.
    pub height: String,
    pub selected: bool,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
    /// Machine-readable error category.
    pub kind: String,
    /// For out-of-bounds windows: `partial` or `fully-outside`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<String>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service version.
    pub version: String,
}

/// Chunk cache statistics response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    /// Number of decoded chunks in cache.
    pub cached_chunks: u64,
    /// Cache hit count.
    pub cache_hits: u64,
    /// Cache miss count.
    pub cache_misses: u64,
    /// Cache hit rate (0.0 to 1.0).
    pub hit_rate: f64,
}

/// Sample the terrain surface around a DMS coordinate.
///
/// # Returns
///
/// - `200 OK` with the height grid
/// - `400 Bad Request` for malformed coordinates or radius
/// - `404 Not Found` if the window is outside the raster
/// - `500 Internal Server Error` if the raster cannot be read
#[utoipa::path(
    get,
    path = "/surface",
    params(SurfaceQuery),
    responses(
        (status = 200, description = "Height grid around the point", body = SurfaceResponse),
        (status = 400, description = "Invalid coordinate or radius", body = ErrorResponse),
        (status = 404, description = "Window outside the raster", body = ErrorResponse),
        (status = 500, description = "Raster read failure", body = ErrorResponse)
    ),
    tag = "surface"
)]
pub async fn get_surface(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SurfaceQuery>,
) -> Response {
    tracing::debug!(?query, "Surface query");

    let request = match SurfaceRequest::from_fields(
        [&query.lat_deg, &query.lat_min, &query.lat_sec].map(String::as_str),
        [&query.lon_deg, &query.lon_min, &query.lon_sec].map(String::as_str),
        query.radius,
    ) {
        Ok(request) => request,
        Err(e) => return error_response(e),
    };

    let result = tokio::task::spawn_blocking(move || state.relief.surface(&request)).await;

    match result {
        Ok(Ok(surface)) => {
            tracing::info!(
                lat = surface.center.latitude,
                lon = surface.center.longitude,
                rows = surface.rows(),
                cols = surface.cols(),
                "Surface built"
            );
            (StatusCode::OK, Json(SurfaceResponse::from(surface))).into_response()
        }
        Ok(Err(e)) => error_response(e),
        Err(e) => {
            tracing::error!(error = %e, "Surface task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "surface task failed".to_string(),
                    kind: "internal".to_string(),
                    bounds: None,
                }),
            )
                .into_response()
        }
    }
}

/// Format the height under the cursor.
///
/// Always succeeds; without a (finite) value the placeholder is returned.
#[utoipa::path(
    get,
    path = "/height",
    params(HeightQuery),
    responses(
        (status = 200, description = "Height readout", body = HeightResponse)
    ),
    tag = "surface"
)]
pub async fn get_height(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HeightQuery>,
) -> Json<HeightResponse> {
    let value = query.value.filter(|v| v.is_finite());
    Json(HeightResponse {
        height: state.relief.readout(value),
        selected: value.is_some(),
    })
}

/// Map a pipeline error onto a status code.
fn error_response(e: ReliefError) -> Response {
    let (status, kind, bounds) = match &e {
        ReliefError::InvalidCoordinateFormat { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_coordinate", None)
        }
        ReliefError::Reprojection { .. } => (StatusCode::BAD_REQUEST, "reprojection", None),
        ReliefError::InvalidRadius { .. } => (StatusCode::BAD_REQUEST, "invalid_radius", None),
        ReliefError::NoPointSelected => (StatusCode::BAD_REQUEST, "no_point_selected", None),
        ReliefError::WindowOutOfBounds { kind } => (
            StatusCode::NOT_FOUND,
            "window_out_of_bounds",
            Some(kind.to_string()),
        ),
        ReliefError::UnsupportedCrs { .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, "unsupported_crs", None)
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "raster_read", None),
    };

    if status.is_server_error() {
        tracing::error!(error = %e, "Surface query failed");
    } else {
        tracing::warn!(error = %e, "Surface query rejected");
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            kind: kind.to_string(),
            bounds,
        }),
    )
        .into_response()
}

/// Health check endpoint.
///
/// Returns service status and version.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse)),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Get chunk cache statistics.
#[utoipa::path(
    get,
    path = "/stats",
    responses((status = 200, description = "Chunk cache statistics", body = StatsResponse)),
    tag = "system"
)]
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let stats = state.relief.cache_stats().unwrap_or_default();

    Json(StatsResponse {
        cached_chunks: stats.entry_count,
        cache_hits: stats.hit_count,
        cache_misses: stats.miss_count,
        hit_rate: stats.hit_rate(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relief::OutOfBoundsKind;

    #[test]
    fn test_surface_query_default_radius() {
        let json = r#"{"lat_deg": "51", "lat_min": "12", "lat_sec": "31",
                       "lon_deg": "3", "lon_min": "13", "lon_sec": "28"}"#;
        let query: SurfaceQuery = serde_json::from_str(json).unwrap();
        assert_eq!(query.lat_deg, "51");
        assert_eq!(query.radius, 300.0);
    }

    #[test]
    fn test_error_response_status() {
        let cases = [
            (
                ReliefError::InvalidRadius { radius: 0.0 },
                StatusCode::BAD_REQUEST,
            ),
            (
                ReliefError::WindowOutOfBounds {
                    kind: OutOfBoundsKind::FullyOutside,
                },
                StatusCode::NOT_FOUND,
            ),
            (
                ReliefError::WindowRead("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error_response(error).status(), status);
        }
    }

    #[test]
    fn test_error_response_serialize() {
        let response = ErrorResponse {
            error: "Invalid radius: 0".to_string(),
            kind: "invalid_radius".to_string(),
            bounds: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("invalid_radius"));
        assert!(!json.contains("bounds"));
    }

    #[test]
    fn test_health_response_serialize() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("0.1.0"));
    }
}
