//! Upload form and multipart upload handling.

use crate::{
    errors::AppError,
    handlers::pages,
    services::validator,
    state::AppState,
};
use axum::{
    Json,
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

const UNTITLED: &str = "Untitled API";

/// Banner parameters accepted by the HTML pages.
#[derive(Debug, Deserialize, Default)]
pub struct BannerQuery {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UploadQuery {
    pub ajax: Option<String>,
}

/// Fields collected from the multipart form.
#[derive(Debug, Default)]
struct UploadForm {
    name: String,
    description: String,
    version: String,
    document_id: String,
    yaml_content: String,
    file: Option<Vec<u8>>,
}

/// `GET /upload`
pub async fn show_upload_page(
    State(state): State<AppState>,
    Query(q): Query<BannerQuery>,
) -> Html<String> {
    let message_type = q.message_type.as_deref().unwrap_or("info");
    Html(pages::upload_page(
        &q.message,
        message_type,
        state.config.max_file_size,
    ))
}

/// `POST /upload`: create a document or add a version to an existing one.
pub async fn handle_upload(
    State(state): State<AppState>,
    Query(q): Query<UploadQuery>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let max_file_size = state.config.max_file_size;
    let form = read_form(multipart, max_file_size).await?;
    debug!(
        "upload request name={:?} version={:?} document_id={:?} pasted={} file={}",
        form.name,
        form.version,
        form.document_id,
        form.yaml_content.len(),
        form.file.as_ref().map(Vec::len).unwrap_or(0)
    );

    let content = if !form.yaml_content.trim().is_empty() {
        form.yaml_content.into_bytes()
    } else {
        match form.file {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => {
                return Err(AppError::bad_request(
                    "Please provide either a file or YAML content",
                ));
            }
        }
    };
    if content.len() > max_file_size {
        return Err(too_large(max_file_size));
    }

    validator::validate(&content)?;

    let custom_label = form.version.trim();
    if !custom_label.is_empty() {
        state.storage.check_label(custom_label)?;
    }

    let document_id = form.document_id.trim();
    let created = document_id.is_empty();
    let doc = if !created {
        state.documents.get_document_by_id(document_id).await?
    } else {
        let name = match form.name.trim() {
            "" => validator::document_info(&content)
                .map(|(title, _)| title)
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            name => name.to_string(),
        };
        state
            .documents
            .create_document(&name, form.description.trim())
            .await?
    };

    let version = match state
        .documents
        .upload_version(&doc.id, custom_label, &content)
        .await
    {
        Ok(version) => version,
        Err(err) => {
            if created {
                if let Err(cleanup) = state.documents.delete_document(&doc.id).await {
                    warn!("could not remove empty document {}: {}", doc.id, cleanup);
                }
            }
            return Err(err.into());
        }
    };
    info!(
        "uploaded {} bytes as {} of document {}",
        content.len(),
        version.version,
        doc.id
    );

    let view_url = format!("/view/{}", doc.id);
    if wants_json(&headers, &q) {
        let body = json!({
            "success": true,
            "document_id": doc.id,
            "version_id": version.id,
            "version": version.version,
            "message": "Document uploaded successfully",
            "view_url": view_url,
        });
        Ok((StatusCode::CREATED, Json(body)).into_response())
    } else {
        Ok(Redirect::to(&view_url).into_response())
    }
}

async fn read_form(mut multipart: Multipart, max_file_size: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                let bytes = field.bytes().await?;
                if bytes.len() > max_file_size {
                    return Err(too_large(max_file_size));
                }
                form.file = Some(bytes.to_vec());
            }
            "name" => form.name = field.text().await?,
            "description" => form.description = field.text().await?,
            "version" => form.version = field.text().await?,
            "document_id" => form.document_id = field.text().await?,
            "yaml_content" => form.yaml_content = field.text().await?,
            other => debug!("ignoring unknown form field {}", other),
        }
    }
    Ok(form)
}

fn wants_json(headers: &HeaderMap, q: &UploadQuery) -> bool {
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));
    accepts_json || q.ajax.as_deref() == Some("1")
}

fn too_large(max_file_size: usize) -> AppError {
    AppError::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        "file_too_large",
        format!(
            "File too large. Maximum size: {}MB",
            max_file_size / (1024 * 1024)
        ),
    )
}
