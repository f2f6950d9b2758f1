//! Proxy endpoints for the external SDK generator.

use crate::{
    errors::AppError,
    handlers::api_handlers::{VersionQuery, base_url, select_version},
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Debug, Deserialize, Default)]
pub struct DownloadQuery {
    pub url: Option<String>,
}

/// `GET /api/generator/languages`
pub async fn list_languages(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let languages = state.generator.list_languages().await?;
    Ok(Json(json!({ "languages": languages })))
}

/// `POST /api/document/{id}/generate/{generator}?version=`
///
/// The generator fetches the document itself, so it is handed the public
/// content URL of the selected version.
pub async fn generate_sdk(
    State(state): State<AppState>,
    Path((id, generator)): Path<(String, String)>,
    Query(q): Query<VersionQuery>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let doc = state.documents.get_document_by_id(&id).await?;
    let version = select_version(&doc, q.version.as_deref())?;

    let openapi_url = format!(
        "{}/api/document/{}/content?version={}",
        base_url(&headers),
        urlencoding::encode(&doc.id),
        urlencoding::encode(&version.version)
    );
    let generated = state
        .generator
        .generate_sdk(&generator, &openapi_url, None)
        .await?;
    info!(
        "generated {} SDK for {} {}: {}",
        generator, doc.id, version.version, generated.code
    );
    Ok(Json(generated))
}

/// `GET /api/generator/download?url=`
pub async fn download_sdk(
    State(state): State<AppState>,
    Query(q): Query<DownloadQuery>,
) -> Result<Response, AppError> {
    let Some(url) = q.url.filter(|u| !u.is_empty()) else {
        return Err(AppError::bad_request("Download URL is required"));
    };
    let archive = state.generator.download_sdk(&url).await?;

    let mut response = archive.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_static("attachment; filename=\"sdk.zip\""),
    );
    Ok(response)
}
