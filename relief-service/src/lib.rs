//! Relief Service Library
//!
//! HTTP handlers, router and OpenAPI document for the terrain surface
//! service. This library is used by both the relief-service binary and
//! integration tests.

pub mod handlers;

use std::sync::Arc;

use axum::{routing::get, Router};
use relief::ReliefService;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across handlers.
pub struct AppState {
    /// Surface pipeline around the one open raster.
    pub relief: ReliefService,
}

/// OpenAPI documentation for the relief service.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Relief Surface Service",
        version = "0.1.0",
        description = "Terrain surfaces around DMS coordinates from a Belgian Lambert 72 elevation raster.",
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    paths(
        handlers::get_surface,
        handlers::get_height,
        handlers::health_check,
        handlers::get_stats,
    ),
    components(
        schemas(
            handlers::SurfaceQuery,
            handlers::SurfaceResponse,
            handlers::CenterResponse,
            handlers::WindowResponse,
            handlers::HeightQuery,
            handlers::HeightResponse,
            handlers::ErrorResponse,
            handlers::HealthResponse,
            handlers::StatsResponse,
        )
    ),
    tags(
        (name = "surface", description = "Surface and height endpoints"),
        (name = "system", description = "System and health endpoints")
    )
)]
pub struct ApiDoc;

/// Build the router with tracing, CORS and Swagger UI.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/surface", get(handlers::get_surface))
        .route("/height", get(handlers::get_height))
        .route("/health", get(handlers::health_check))
        .route("/stats", get(handlers::get_stats))
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

// Re-export commonly used types for convenience
pub use handlers::{
    ErrorResponse, HealthResponse, HeightQuery, HeightResponse, StatsResponse, SurfaceQuery,
    SurfaceResponse,
};
