//! Defines routes for the upload form, viewer and document API.
//!
//! ## Structure
//! - **Pages**
//!   - `GET    /`                 — redirect to the upload form
//!   - `GET    /upload`           — upload form
//!   - `POST   /upload`           — multipart upload (new document or new version)
//!   - `GET    /view/{id}`        — Swagger UI viewer
//!   - `DELETE /view/{id}`        — delete document
//!   - `GET    /share/{slug}`     — share link (feature-gated)
//!
//! - **Document API** (`/api/document/{id}/...`)
//!   - `GET    content`, `GET versions`
//!   - `DELETE version/{version}`, `GET version/{version}/download` (feature-gated)
//!   - `POST   share` (feature-gated), `POST generate/{generator}`
//!
//! - **Generator proxy**: `GET /api/generator/languages`, `GET /api/generator/download`
//! - **Health**: `GET /health`, `GET /readyz`

use crate::{
    config::{AppConfig, CorsConfig},
    handlers::{
        api_handlers::{
            delete_document_version, download_document_version, get_document_content,
            get_document_versions, set_share_link,
        },
        generator_handlers::{download_sdk, generate_sdk, list_languages},
        health_handlers::{health, readyz},
        upload_handlers::{handle_upload, show_upload_page},
        viewer_handlers::{delete_document, open_share_link, view_document},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, HeaderValue, Method},
    response::Redirect,
    routing::{delete, get, post},
};
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

/// Multipart framing allowance on top of the document size limit.
const FORM_OVERHEAD: usize = 1024 * 1024;

/// Build the application router. Feature-gated routes are only mounted when
/// their switch is on, so disabled features answer 404.
pub fn routes(config: &AppConfig) -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(|| async { Redirect::to("/upload") }))
        .route(
            "/upload",
            get(show_upload_page)
                .post(handle_upload)
                .layer(DefaultBodyLimit::max(
                    config.max_file_size.saturating_add(FORM_OVERHEAD),
                )),
        )
        .route("/view/{id}", get(view_document).delete(delete_document))
        .route("/api/document/{id}/content", get(get_document_content))
        .route("/api/document/{id}/versions", get(get_document_versions))
        .route(
            "/api/document/{id}/generate/{generator}",
            post(generate_sdk),
        )
        .route("/api/generator/languages", get(list_languages))
        .route("/api/generator/download", get(download_sdk))
        .route("/health", get(health))
        .route("/readyz", get(readyz));

    if config.allow_version_deletion {
        router = router.route(
            "/api/document/{id}/version/{version}",
            delete(delete_document_version),
        );
    }
    if config.allow_version_download {
        router = router.route(
            "/api/document/{id}/version/{version}/download",
            get(download_document_version),
        );
    }
    if config.allow_custom_share_link {
        router = router
            .route("/api/document/{id}/share", post(set_share_link))
            .route("/share/{slug}", get(open_share_link));
    }

    router
        .layer(cors_layer(&config.cors))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    let headers: Vec<HeaderName> = parse_header_names(&cors.allowed_headers);
    let exposed: Vec<HeaderName> = parse_header_names(&cors.expose_headers);

    let layer = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(exposed)
        .max_age(Duration::from_secs(cors.max_age_secs));

    if cors.allowed_origins.iter().any(|o| o == "*") {
        if cors.allow_credentials {
            warn!("CORS credentials are ignored while allowed origins is `*`");
        }
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(cors.allow_credentials)
}

fn parse_header_names(names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}
