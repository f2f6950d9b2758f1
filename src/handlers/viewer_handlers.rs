//! HTML viewer, document deletion and share-link resolution.

use crate::{
    errors::AppError,
    handlers::{pages, upload_handlers::BannerQuery},
    models::document::Version,
    services::document_service::DocumentError,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

#[derive(Debug, Deserialize, Default)]
pub struct ViewQuery {
    pub version: Option<String>,
    #[serde(flatten)]
    pub banner: BannerQuery,
}

/// `GET /view/{id}`: render the selected (or latest) version.
pub async fn view_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ViewQuery>,
) -> Response {
    let doc = match state.documents.get_document_by_id(&id).await {
        Ok(doc) => doc,
        Err(DocumentError::DocumentNotFound(_)) => {
            return pages::error_page(
                StatusCode::NOT_FOUND,
                "Document Not Found",
                "Document not found or expired",
            );
        }
        Err(err) => {
            warn!("failed to load document {}: {}", id, err);
            return pages::error_page(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error",
                &err.to_string(),
            );
        }
    };
    debug!("viewing document {} with {} versions", doc.id, doc.versions.len());

    let mut message = q.banner.message.clone();
    let mut message_type = q
        .banner
        .message_type
        .clone()
        .unwrap_or_else(|| "info".to_string());

    let requested = q.version.as_deref().filter(|v| !v.is_empty());
    let selected: Option<Version> = match requested {
        Some(label) => match doc.find_version(label) {
            Some(version) => Some(version.clone()),
            None => {
                message = format!("Version '{}' not found, showing latest version", label);
                message_type = "info".to_string();
                doc.latest_version().cloned()
            }
        },
        None => doc.latest_version().cloned(),
    };

    let Some(selected) = selected else {
        return pages::error_page(
            StatusCode::NOT_FOUND,
            "No Versions Found",
            "No versions found for this document",
        );
    };

    let mut versions = doc.versions.clone();
    versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let options = pages::ViewerOptions {
        allow_version_deletion: state.config.allow_version_deletion,
        allow_version_download: state.config.allow_version_download,
        allow_custom_share_link: state.config.allow_custom_share_link,
        generator_enabled: state.generator.is_enabled(),
    };
    Html(pages::viewer_page(
        &doc,
        &versions,
        &selected,
        &message,
        &message_type,
        &options,
    ))
    .into_response()
}

/// `DELETE /view/{id}`: soft-delete the document and drop its files.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.documents.delete_document(&id).await?;
    if let Err(err) = state.storage.delete_document_tree(&id).await {
        warn!("document {} deleted but files remain: {}", id, err);
    }
    Ok(Json(json!({
        "success": true,
        "message": "Document deleted successfully",
    })))
}

/// `GET /share/{slug}`: resolve a share slug to its viewer page.
pub async fn open_share_link(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    match state.documents.get_document_by_slug(&slug).await {
        Ok(doc) => Redirect::to(&format!("/view/{}", doc.id)).into_response(),
        Err(DocumentError::DocumentNotFound(_)) => pages::error_page(
            StatusCode::NOT_FOUND,
            "Link Not Found",
            "This share link does not exist or has expired",
        ),
        Err(err) => AppError::from(err).into_response(),
    }
}
