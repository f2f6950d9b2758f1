//! OpenAPI / Swagger document validation.
//!
//! Uploaded bytes are parsed as YAML first and JSON second. Checks run in a
//! fixed order and the first failure is reported:
//! 1. parseable as YAML or JSON mapping
//! 2. `openapi` or `swagger` version field present
//! 3. `openapi` starts with `3.` / `swagger` starts with `2.`
//! 4. `info.title` and `info.version` present
//! 5. `paths` or `components` present and non-empty

use serde_yaml::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid YAML or JSON format")]
    FormatInvalid,
    #[error("not a valid OpenAPI/Swagger document: missing `openapi` or `swagger` field")]
    VersionFieldMissing,
    #[error("unsupported specification version `{0}` (only OpenAPI 3.x and Swagger 2.x are supported)")]
    UnsupportedVersion(String),
    #[error("missing required fields: info.title or info.version")]
    RequiredFieldsMissing,
    #[error("document must define at least one of `paths` or `components`")]
    StructureInvalid,
}

impl ValidationError {
    /// Stable machine-readable kind, surfaced in API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FormatInvalid => "format_invalid",
            Self::VersionFieldMissing => "version_field_missing",
            Self::UnsupportedVersion(_) => "unsupported_version",
            Self::RequiredFieldsMissing => "required_fields_missing",
            Self::StructureInvalid => "structure_invalid",
        }
    }
}

/// Validate raw upload bytes as an OpenAPI 3.x or Swagger 2.x document.
pub fn validate(content: &[u8]) -> Result<(), ValidationError> {
    let root = parse_mapping(content).ok_or(ValidationError::FormatInvalid)?;

    let openapi = scalar_field(&root, "openapi");
    let swagger = scalar_field(&root, "swagger");
    if openapi.is_none() && swagger.is_none() {
        return Err(ValidationError::VersionFieldMissing);
    }

    if let Some(version) = &openapi {
        if !version.starts_with("3.") {
            return Err(ValidationError::UnsupportedVersion(version.clone()));
        }
    }
    if let Some(version) = &swagger {
        if !version.starts_with("2.") {
            return Err(ValidationError::UnsupportedVersion(version.clone()));
        }
    }

    let info = root.get("info");
    let title = info.and_then(|i| scalar_field(i, "title"));
    let version = info.and_then(|i| scalar_field(i, "version"));
    if title.is_none() || version.is_none() {
        return Err(ValidationError::RequiredFieldsMissing);
    }

    if !has_entries(&root, "paths") && !has_entries(&root, "components") {
        return Err(ValidationError::StructureInvalid);
    }

    Ok(())
}

/// Best-effort extraction of `(info.title, info.version)`.
///
/// Never fails on structural problems; missing fields come back as empty
/// strings. Returns `None` only when the bytes are not a YAML/JSON mapping.
pub fn document_info(content: &[u8]) -> Option<(String, String)> {
    let root = parse_mapping(content)?;
    let info = root.get("info");
    let title = info.and_then(|i| scalar_field(i, "title")).unwrap_or_default();
    let version = info
        .and_then(|i| scalar_field(i, "version"))
        .unwrap_or_default();
    Some((title, version))
}

fn parse_mapping(content: &[u8]) -> Option<Value> {
    let parsed = serde_yaml::from_slice::<Value>(content)
        .ok()
        .filter(Value::is_mapping)
        .or_else(|| {
            serde_json::from_slice::<serde_json::Value>(content)
                .ok()
                .filter(serde_json::Value::is_object)
                .and_then(|json| serde_yaml::to_value(json).ok())
        })?;
    parsed.is_mapping().then_some(parsed)
}

/// Read a scalar field as a trimmed, non-empty string. Numbers and booleans
/// are stringified (`openapi: 3.0` is a float in YAML).
fn scalar_field(value: &Value, key: &str) -> Option<String> {
    let text = match value.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn has_entries(root: &Value, key: &str) -> bool {
    match root.get(key) {
        Some(Value::Mapping(map)) => !map.is_empty(),
        Some(Value::Sequence(seq)) => !seq.is_empty(),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Null) | None => false,
        Some(_) => true,
    }
}
