//! JSON / raw-content API over hosted documents.

use crate::{
    errors::AppError,
    models::document::{Document, Version},
    services::{document_service::DocumentError, slug},
    state::AppState,
};
use axum::{
    Json,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::warn;

#[derive(Debug, Deserialize, Default)]
pub struct VersionQuery {
    pub version: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ShareRequest {
    #[serde(default)]
    pub slug: String,
}

#[derive(Serialize)]
struct VersionSummary<'a> {
    id: &'a str,
    version: &'a str,
    created_at: DateTime<Utc>,
    is_latest: bool,
}

/// Pick the requested version, or the latest one when none was asked for.
pub(crate) fn select_version<'a>(
    doc: &'a Document,
    requested: Option<&str>,
) -> Result<&'a Version, AppError> {
    match requested.filter(|v| !v.is_empty()) {
        Some(label) => doc
            .find_version(label)
            .ok_or_else(|| AppError::not_found(format!("Version not found: {}", label))),
        None => doc
            .latest_version()
            .ok_or_else(|| AppError::not_found("No versions found")),
    }
}

/// Scheme + host the client used to reach us.
pub(crate) fn base_url(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{}://{}", scheme, host)
}

/// `GET /api/document/{id}/content?version=`
pub async fn get_document_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<VersionQuery>,
) -> Result<Response, AppError> {
    let doc = state.documents.get_document_by_id(&id).await?;
    let version = select_version(&doc, q.version.as_deref())?;
    let content = state.documents.read_version(version).await?;

    let etag = format!("\"{:x}\"", md5::compute(&content));
    let mut response = Response::new(Body::from(content));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/yaml"),
    );
    if let Ok(value) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, value);
    }
    Ok(response)
}

/// `GET /api/document/{id}/versions`
pub async fn get_document_versions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let doc = state.documents.get_document_by_id(&id).await?;
    let versions: Vec<VersionSummary> = doc
        .versions
        .iter()
        .map(|v| VersionSummary {
            id: &v.id,
            version: &v.version,
            created_at: v.created_at,
            is_latest: v.is_latest,
        })
        .collect();
    Ok(Json(json!({
        "document_id": doc.id,
        "versions": versions,
    })))
}

/// `GET /api/document/{id}/version/{version}/download`: stream the stored file.
pub async fn download_document_version(
    State(state): State<AppState>,
    Path((id, label)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let doc = state.documents.get_document_by_id(&id).await?;
    let version = select_version(&doc, Some(&label))?;
    let file = state.storage.open(&version.file_path).await?;

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/x-yaml"),
    );
    let disposition = format!(
        "attachment; filename=\"{}-{}.yaml\"",
        doc.id,
        version.version.replace('"', "")
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// `DELETE /api/document/{id}/version/{version}`
pub async fn delete_document_version(
    State(state): State<AppState>,
    Path((id, label)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let removed = state.documents.delete_version(&id, &label).await?;
    if let Err(err) = state.storage.delete_file(&removed.file_path).await {
        warn!(
            "version {} of {} deleted but file {} remains: {}",
            label,
            id,
            removed.file_path.display(),
            err
        );
    }
    Ok(Json(json!({"success": true, "message": "version deleted"})))
}

/// `POST /api/document/{id}/share` body: `{"slug": "optional-custom"}`
///
/// An empty or missing body generates a random slug.
pub async fn set_share_link(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let doc = state.documents.get_document_by_id(&id).await?;
    if doc.share_slug.is_some() {
        return Err(DocumentError::SlugAlreadySet(doc.id).into());
    }

    // Undecodable bodies count as "no slug requested".
    let request: ShareRequest = serde_json::from_slice(&body).unwrap_or_default();
    let slug = if request.slug.trim().is_empty() {
        slug::generate()
    } else {
        let (sanitized, valid) = slug::sanitize(&request.slug);
        if !valid {
            return Err(AppError::bad_request(
                "invalid slug format (3-40 chars, a-z, 0-9, dashes)",
            ));
        }
        sanitized
    };

    let shared = state.documents.set_share_slug(&doc, &slug).await?;
    let url = format!("{}/share/{}", base_url(&headers), slug);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "share_slug": shared.share_slug,
            "url": url,
        })),
    )
        .into_response())
}
